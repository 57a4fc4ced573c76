use drive_physics::config::SimConfig;
use drive_physics::frame_loop::{self, CancelFlag};
use drive_physics::input::{self, ControlKey};
use drive_physics::physics::ShapeDesc;
use drive_physics::render::{CameraPose, MaterialDesc, RecordingBackend, RenderBackend, SceneHandle, VisualHandle};
use drive_physics::Simulation;
use nalgebra::UnitQuaternion;
use rapier3d::prelude::{Point, Real};
use tokio::time::Duration;

/// Raises the cancel flag once `limit` frames were rendered.
struct StopAfter {
    inner: RecordingBackend,
    cancel: CancelFlag,
    limit: u64,
}

impl RenderBackend for StopAfter {
    fn create_visual_object(&mut self, shape: &ShapeDesc, material: &MaterialDesc) -> VisualHandle {
        self.inner.create_visual_object(shape, material)
    }

    fn set_transform(&mut self, visual: VisualHandle, position: Point<Real>, orientation: UnitQuaternion<Real>) {
        self.inner.set_transform(visual, position, orientation);
    }

    fn render_frame(&mut self, scene: SceneHandle, camera: &CameraPose) {
        self.inner.render_frame(scene, camera);
        if self.inner.frames >= self.limit {
            self.cancel.cancel();
        }
    }
}

fn scene() -> Simulation {
    let mut config = SimConfig::hatchback();
    config.scene.prop_seed = Some(5);
    Simulation::new(config)
}

#[tokio::test]
async fn loop_stops_on_the_frame_after_cancel() {
    let cancel = CancelFlag::new();
    let mut backend = StopAfter { inner: RecordingBackend::new(), cancel: cancel.clone(), limit: 5 };
    let mut sim = scene();
    sim.bootstrap(&mut backend).unwrap();

    let (tx, mut source) = input::channel();
    assert!(tx.key_down("ArrowLeft"));

    let frames = frame_loop::run(&mut sim, &mut source, &mut backend, &cancel, Duration::from_millis(1)).await;

    assert_eq!(frames, 5);
    assert_eq!(backend.inner.frames, 5);
    assert_eq!(sim.frame_count(), 5);
    assert!(sim.tracker.is_held(ControlKey::Left));
}

#[tokio::test]
async fn cancelled_before_start_runs_no_frames() {
    let cancel = CancelFlag::new();
    cancel.cancel();

    let mut backend = RecordingBackend::new();
    let mut sim = scene();
    let (_tx, mut source) = input::channel();

    let frames = frame_loop::run(&mut sim, &mut source, &mut backend, &cancel, Duration::from_millis(1)).await;

    assert_eq!(frames, 0);
    assert_eq!(backend.frames, 0);
}

#[tokio::test]
async fn dropped_senders_do_not_stop_the_loop() {
    let cancel = CancelFlag::new();
    let mut backend = StopAfter { inner: RecordingBackend::new(), cancel: cancel.clone(), limit: 3 };
    let mut sim = scene();

    let (tx, mut source) = input::channel();
    drop(tx);

    let frames = frame_loop::run(&mut sim, &mut source, &mut backend, &cancel, Duration::from_millis(1)).await;
    assert_eq!(frames, 3);
}
