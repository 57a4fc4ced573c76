use drive_physics::assets::ProceduralCarLoader;
use drive_physics::config::SimConfig;
use drive_physics::frame_loop::{self, CancelFlag};
use drive_physics::input;
use drive_physics::render::RecordingBackend;
use drive_physics::state::Simulation;

use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("starting headless driving session");

    let mut config = SimConfig::hatchback();
    config.scene.boxes = 10;
    config.scene.prop_seed = Some(7);

    let mut backend = RecordingBackend::new();
    let mut sim = Simulation::new(config);

    if let Err(err) = sim.bootstrap(&mut backend) {
        error!("scene setup failed: {err}");
        return;
    }

    let mut loader = ProceduralCarLoader::for_vehicle(&sim.config.vehicle);
    if sim.attach_vehicle(&mut loader, &mut backend).is_err() {
        warn!("driving without a vehicle");
    }

    let (tx, mut source) = input::channel();
    let cancel = CancelFlag::new();

    // Scripted driver: accelerate, turn left, brake
    let driver_cancel = cancel.clone();
    tokio::spawn(async move {
        sleep(Duration::from_millis(500)).await;
        tx.key_down("ArrowUp");
        sleep(Duration::from_secs(2)).await;
        tx.key_down("ArrowLeft");
        sleep(Duration::from_secs(1)).await;
        tx.key_up("ArrowLeft");
        tx.key_up("ArrowUp");
        tx.key_down("b");
        sleep(Duration::from_secs(1)).await;
        tx.key_up("b");
        sleep(Duration::from_millis(500)).await;
        driver_cancel.cancel();
    });

    // Fixed timestep: ~60 Hz
    let frames = frame_loop::run(&mut sim, &mut source, &mut backend, &cancel, Duration::from_millis(16)).await;

    match sim.chassis().and_then(|h| sim.world.body(h)) {
        Some(body) => {
            let t = body.translation();
            info!("{frames} frames, chassis at ({:.2}, {:.2}, {:.2})", t.x, t.y, t.z);
        }
        None => info!("{frames} frames, no vehicle"),
    }
    info!("backend rendered {} frames of {} visuals", backend.frames, backend.visuals.len());
}
