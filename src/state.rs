use rand::rngs::StdRng;
use rand::SeedableRng;
use rapier3d::prelude::{Real, RigidBodyHandle};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::assets::{ModelLoader, VehicleParts};
use crate::camera::ChaseCamera;
use crate::config::{SimConfig, TimestepMode, TuningPatch};
use crate::controls::ControlMapper;
use crate::error::SimError;
use crate::input::{InputEvent, InputTracker, KeyChange, PointerEvent};
use crate::physics::World;
use crate::render::{MaterialDesc, RenderBackend, RenderSync, SceneHandle};
use crate::spawn::{self, SpawnedProp};
use crate::vehicle::{VehicleModel, WheelConfig, WheelPosition};
use crate::watchdog::StabilityWatchdog;

// ---------------------------------------------
// PER-FRAME TELEMETRY
// ---------------------------------------------
#[derive(Debug, Clone, Serialize)]
pub struct WheelSnapshot {
    pub position: WheelPosition,
    pub in_contact: bool,
    pub sliding: bool,
    pub suspension_force: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct FrameSnapshot {
    pub frame: u64,
    pub sub_steps: usize,
    pub speed_kmh: Option<f32>,
    pub chassis_position: Option<[f32; 3]>,
    pub wheels: Vec<WheelSnapshot>,
    pub watchdog_reset: bool,
}

// ---------------------------------------------
// SIMULATION CONTEXT
// ---------------------------------------------

/// Everything one driving session owns. A single caller drives it, one
/// `frame()` per display frame.
pub struct Simulation {
    pub config: SimConfig,          // as built, tuning is not written back
    pub world: World,
    pub vehicle: Option<VehicleModel>,
    pub tracker: InputTracker,
    pub controls: ControlMapper,
    pub render_sync: RenderSync,
    pub camera: ChaseCamera,
    pub watchdog: StabilityWatchdog,
    pub scene: SceneHandle,
    pub props: Vec<SpawnedProp>,
    rng: StdRng,
    frame: u64,
}

impl Simulation {
    pub fn new(config: SimConfig) -> Self {
        let rng = match config.scene.prop_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            world: World::new(&config.world),
            vehicle: None,
            tracker: InputTracker::new(),
            controls: ControlMapper::new(config.controls),
            render_sync: RenderSync::new(),
            camera: ChaseCamera::new(config.camera),
            watchdog: StabilityWatchdog::new(config.watchdog).with_upright(spawn::spawn_rotation(&config.vehicle)),
            scene: SceneHandle::default(),
            props: Vec::new(),
            rng,
            frame: 0,
            config,
        }
    }

    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    pub fn chassis(&self) -> Option<RigidBodyHandle> {
        self.vehicle.as_ref().map(|v| v.chassis)
    }

    // ---------------------------------------------------------
    // Scene: ground + props, each paired with a visual
    // ---------------------------------------------------------
    pub fn bootstrap(&mut self, backend: &mut dyn RenderBackend) -> Result<(), SimError> {
        let props = spawn::spawn_scene(&mut self.world, &self.config.scene, &mut self.rng);
        for prop in props {
            self.add_prop(prop, backend)?;
        }

        info!("scene ready: {} props, {} bodies", self.props.len(), self.world.bodies.len());
        Ok(())
    }

    fn add_prop(&mut self, prop: SpawnedProp, backend: &mut dyn RenderBackend) -> Result<(), SimError> {
        let visual = backend.create_visual_object(&prop.shape, &MaterialDesc::solid(prop.kind.color()));
        self.render_sync.register(visual, prop.body)?;
        self.props.push(prop);
        Ok(())
    }

    // ---------------------------------------------------------
    // Vehicle: model parts first, bodies only once they exist
    // ---------------------------------------------------------

    /// On failure the error is logged and returned; the simulation keeps
    /// running without a vehicle.
    pub fn attach_vehicle(
        &mut self,
        loader: &mut dyn ModelLoader,
        backend: &mut dyn RenderBackend,
    ) -> Result<(), SimError> {
        match self.try_attach_vehicle(loader, backend) {
            Ok(vehicle) => {
                info!("vehicle attached, chassis {:?}", vehicle.chassis);
                self.vehicle = Some(vehicle);
                Ok(())
            }
            Err(err) => {
                error!("vehicle not attached: {err}");
                Err(err)
            }
        }
    }

    fn try_attach_vehicle(
        &mut self,
        loader: &mut dyn ModelLoader,
        backend: &mut dyn RenderBackend,
    ) -> Result<VehicleModel, SimError> {
        let model = loader.load(backend)?;
        let parts = VehicleParts::from_model(&model)?;
        if let Some(visual) = parts.all().into_iter().find(|v| self.render_sync.is_paired(*v)) {
            return Err(SimError::AlreadyPaired(visual));
        }

        // parts are settled, bodies come last
        let chassis = spawn::spawn_chassis(&mut self.world, &self.config.vehicle);
        let mut vehicle = match VehicleModel::new(chassis, WheelConfig::for_vehicle(&self.config.vehicle), &mut self.world) {
            Ok(vehicle) => vehicle,
            Err(err) => {
                let _ = self.world.remove_body(chassis);
                return Err(err.into());
            }
        };
        vehicle.set_forward_sign(self.controls.config.forward_sign);

        self.render_sync.register(parts.chassis, chassis)?;
        for pos in WheelPosition::ALL {
            self.render_sync.register(parts.wheel(pos), vehicle.wheel(pos).body)?;
        }

        Ok(vehicle)
    }

    // ---------------------------------------------------------
    // Input
    // ---------------------------------------------------------
    pub fn handle_event(&mut self, event: &InputEvent, backend: &mut dyn RenderBackend) {
        match event {
            InputEvent::Key { key, transition } => match self.tracker.handle_key(key, *transition) {
                Some(KeyChange::Released(control)) => {
                    if let Some(vehicle) = self.vehicle.as_mut() {
                        if let Err(err) = self.controls.release(control, vehicle) {
                            warn!("release of {control:?} failed: {err}");
                        }
                    }
                }
                Some(KeyChange::Pressed(control)) => debug!("{control:?} held"),
                None => {}
            },
            InputEvent::Pointer(pointer) => {
                self.camera.handle_pointer(pointer);
                if *pointer == PointerEvent::Click {
                    let prop = spawn::drop_box(&mut self.world, &mut self.rng);
                    if let Err(err) = self.add_prop(prop, backend) {
                        warn!("dropped box not rendered: {err}");
                    }
                }
            }
        }
    }

    // ---------------------------------------------------------
    // One display frame
    // ---------------------------------------------------------
    pub fn frame(
        &mut self,
        events: &[InputEvent],
        real_delta: Real,
        backend: &mut dyn RenderBackend,
    ) -> FrameSnapshot {
        // 1) Input events → held keys (+ immediate release actions)
        for event in events {
            self.handle_event(event, backend);
        }

        // 2) Held keys → vehicle inputs
        if let Some(vehicle) = self.vehicle.as_mut() {
            if let Err(err) = self.controls.apply(self.tracker.held(), vehicle) {
                warn!("control mapping failed: {err}");
            }
        }

        // 3) Physics, vehicle hooks run inside every sub-step
        let fixed = self.config.world.fixed_delta;
        let sub_steps = match self.config.world.timestep {
            TimestepMode::PerFrame => {
                self.world.step_once(fixed, &mut self.vehicle);
                1
            }
            TimestepMode::Accumulated { max_sub_steps } => {
                self.world.step(fixed, real_delta, max_sub_steps, &mut self.vehicle)
            }
        };

        // 4) Bodies → visuals
        self.render_sync.sync(&self.world.bodies, backend);

        // 5) Camera follows the chassis, 6) watchdog
        let mut watchdog_reset = false;
        if let Some(chassis) = self.chassis() {
            if let Some(body) = self.world.body_mut(chassis) {
                self.camera.update(body.position());
                watchdog_reset = self.watchdog.check(body);
            }
        }

        // 7) Draw
        backend.render_frame(self.scene, &self.camera.pose());

        self.frame += 1;
        let snapshot = self.snapshot(sub_steps, watchdog_reset);
        debug!(?snapshot, "frame");
        snapshot
    }

    fn snapshot(&self, sub_steps: usize, watchdog_reset: bool) -> FrameSnapshot {
        let chassis_position = self
            .chassis()
            .and_then(|h| self.world.body(h))
            .map(|b| {
                let t = b.translation();
                [t.x, t.y, t.z]
            });

        let wheels = self
            .vehicle
            .iter()
            .flat_map(|v| v.wheels().iter())
            .map(|w| WheelSnapshot {
                position: w.position(),
                in_contact: w.raycast.in_contact,
                sliding: w.sliding,
                suspension_force: w.suspension_force,
            })
            .collect();

        FrameSnapshot {
            frame: self.frame,
            sub_steps,
            speed_kmh: self.vehicle.as_ref().map(|v| v.current_speed_kmh()),
            chassis_position,
            wheels,
            watchdog_reset,
        }
    }

    // ---------------------------------------------------------
    // Debug panel
    // ---------------------------------------------------------
    pub fn apply_tuning(&mut self, payload: &str) -> Result<(), SimError> {
        let patch = TuningPatch::from_json(payload)?;

        patch.apply_to(&mut self.controls.config, &mut self.camera.config);
        if let Some(vehicle) = self.vehicle.as_mut() {
            vehicle.apply_tuning(&patch.wheels);
        }

        debug!(?patch, "tuning applied");
        Ok(())
    }
}
