// ==============================================================================
// config.rs — SIMULATION PARAMETERS + PRESETS
// ------------------------------------------------------------------------------
// Every tunable value of the simulation lives here. Two complete presets are
// provided:
// - SimConfig::hatchback(): glb hatchback on a large flat ground (default)
// - SimConfig::box_car():   box chassis, -Z forward, instant steering,
//                           launching pads scattered over a 500 m ground
//
// TuningPatch is the runtime surface of the debug panel: every field is
// optional and only the present ones are written.
// ==============================================================================

use serde::{Deserialize, Serialize};
use std::f32::consts::FRAC_PI_2;

use crate::materials::{ContactProperties, ContactRule, MaterialId};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub world: WorldConfig,
    pub vehicle: VehicleConfig,
    pub controls: ControlConfig,
    pub camera: CameraConfig,
    pub watchdog: WatchdogConfig,
    pub scene: SceneConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self::hatchback()
    }
}

// ---------------------------------------------
// WORLD
// ---------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TimestepMode {
    /// Exactly one fixed step per frame, real elapsed time ignored.
    PerFrame,
    /// Accumulate real elapsed time and catch up in fixed sub-steps.
    Accumulated { max_sub_steps: usize },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub gravity: [f32; 3],          // m/s²
    pub fixed_delta: f32,           // s
    pub timestep: TimestepMode,
    pub allow_sleep: bool,
    pub solver_iterations: usize,
    pub default_contact: ContactProperties,
    pub contact_materials: Vec<ContactRule>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            gravity: [0.0, -10.0, 0.0],
            fixed_delta: 1.0 / 60.0,
            timestep: TimestepMode::Accumulated { max_sub_steps: 10 },
            allow_sleep: true,
            solver_iterations: 10,
            default_contact: ContactProperties { friction: 1.0, restitution: 0.2 },
            contact_materials: vec![ContactRule {
                first: MaterialId::CHASSIS,
                second: MaterialId::GROUND,
                properties: ContactProperties { friction: 1.0, restitution: 0.2 },
            }],
        }
    }
}

// ---------------------------------------------
// VEHICLE
// ---------------------------------------------

/// One box of the chassis compound shape, in chassis space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChassisBox {
    pub half_extents: [f32; 3],
    pub offset: [f32; 3],
}

/// Wheel parameters shared by the four wheels of a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WheelSettings {
    pub radius: f32,                    // m
    pub direction_local: [f32; 3],      // suspension direction, chassis space
    pub axle_local: [f32; 3],           // axle direction, chassis space
    pub suspension_stiffness: f32,      // per unit chassis mass
    pub suspension_rest_length: f32,    // m
    pub damping_compression: f32,
    pub damping_relaxation: f32,
    pub max_suspension_travel: f32,     // m
    pub max_suspension_force: f32,      // N
    pub friction_slip: f32,
    pub roll_influence: f32,            // 0 = no roll torque from side friction
    pub custom_sliding_rotational_speed: Option<f32>, // rad/s while spinning out
}

impl Default for WheelSettings {
    fn default() -> Self {
        Self {
            radius: 0.315,
            direction_local: [0.0, -1.0, 0.0],
            axle_local: [0.0, 0.0, 1.0],
            suspension_stiffness: 14.0,
            suspension_rest_length: 0.3,
            damping_compression: 4.4,
            damping_relaxation: 0.0001,
            max_suspension_travel: 0.3,
            max_suspension_force: 100_000.0,
            friction_slip: 2.0,
            roll_influence: 0.05,
            custom_sliding_rotational_speed: Some(-30.0),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleConfig {
    pub mass: f32,                      // kg
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub chassis: Vec<ChassisBox>,
    pub spawn_position: [f32; 3],
    /// Initial orientation as `[axis_x, axis_y, axis_z, angle]`.
    pub spawn_axis_angle: [f32; 4],
    pub wheel: WheelSettings,
    /// Added to the suspension stiffness of both front wheels.
    pub front_stiffness_offset: f32,
    /// Chassis-space connection points: FL, FR, RL, RR.
    pub connection_points: [[f32; 3]; 4],
}

impl Default for VehicleConfig {
    fn default() -> Self {
        let (x_front, x_rear, y, z) = (0.8775, -1.134, -0.26, 0.756);
        Self {
            mass: 150.0,
            linear_damping: 0.01,
            angular_damping: 0.01,
            chassis: vec![
                ChassisBox { half_extents: [1.755, 0.2925, 0.8775], offset: [0.0, 0.0, 0.0] },
                ChassisBox { half_extents: [0.81, 0.2835, 0.8775], offset: [-0.495, 0.585, 0.0] },
            ],
            spawn_position: [0.0, 4.0, -2.2],
            spawn_axis_angle: [0.0, 1.0, 0.0, 0.0],
            wheel: WheelSettings::default(),
            front_stiffness_offset: 3.0,
            connection_points: [
                [x_front, y, z],
                [x_front, y, -z],
                [x_rear, y, z],
                [x_rear, y, -z],
            ],
        }
    }
}

// ---------------------------------------------
// CONTROLS / CAMERA / WATCHDOG
// ---------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    pub max_force: f32,         // N per driven wheel
    pub brake_force: f32,
    pub handbrake_force: f32,
    pub max_steer: f32,         // rad
    pub steer_increment: f32,   // rad per frame while held
    /// Sign that turns "forward" into engine force along the wheel rolling axis.
    pub forward_sign: f32,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            max_force: 270.0,
            brake_force: 5.9,
            handbrake_force: 100.0,
            max_steer: 0.5,
            steer_increment: 0.0125,
            forward_sign: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Vehicle-space offset subtracted from the vehicle position.
    pub offset: [f32; 3],
    pub track_vehicle_rotation: bool,
    /// Added to the vehicle heading when tracking its rotation.
    pub yaw_offset: f32,
    /// Pixels of pointer motion per radian of camera rotation.
    pub drag_divisor: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            offset: [8.0, -4.0, 0.0],
            track_vehicle_rotation: true,
            yaw_offset: 0.0,
            drag_divisor: 100.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchdogConfig {
    pub speed_threshold: f32,   // m/s
    pub flip_angle: f32,        // rad
    pub frame_threshold: u32,
    pub safe_drop_height: f32,  // m
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            speed_threshold: 1.0,
            flip_angle: 1.5,
            frame_threshold: 100,
            safe_drop_height: 5.0,
        }
    }
}

// ---------------------------------------------
// SCENE
// ---------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GroundConfig {
    /// Static box whose top face sits at `top`.
    Box { half_extents: [f32; 3], top: f32 },
    /// Static heightfield of `rows x cols` samples spaced `element_size`.
    Heightfield { rows: usize, cols: usize, element_size: f32, amplitude: f32, base: f32 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub ground: GroundConfig,
    pub boxes: usize,
    pub launching_pads: usize,
    pub spheres: usize,
    /// Side length of the square area props are scattered over.
    pub scatter_extent: f32,
    pub prop_seed: Option<u64>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            ground: GroundConfig::Box { half_extents: [10_000.0, 10.0, 10_000.0], top: 0.0 },
            boxes: 0,
            launching_pads: 0,
            spheres: 0,
            scatter_extent: 500.0,
            prop_seed: None,
        }
    }
}

// ---------------------------------------------
// PRESETS
// ---------------------------------------------
impl SimConfig {
    pub fn hatchback() -> Self {
        Self {
            world: WorldConfig::default(),
            vehicle: VehicleConfig::default(),
            controls: ControlConfig::default(),
            camera: CameraConfig::default(),
            watchdog: WatchdogConfig::default(),
            scene: SceneConfig::default(),
        }
    }

    pub fn box_car() -> Self {
        Self {
            world: WorldConfig {
                timestep: TimestepMode::PerFrame,
                allow_sleep: false,
                default_contact: ContactProperties { friction: 0.3, restitution: 0.0 },
                contact_materials: vec![ContactRule {
                    first: MaterialId::CHASSIS,
                    second: MaterialId::GROUND,
                    properties: ContactProperties { friction: 0.3, restitution: 0.0 },
                }],
                ..WorldConfig::default()
            },
            vehicle: VehicleConfig {
                mass: 18.0,
                chassis: vec![ChassisBox { half_extents: [2.0, 1.0, 0.5], offset: [0.0, 0.0, 0.0] }],
                spawn_position: [0.0, 1.0, 0.0],
                spawn_axis_angle: [-1.0, 0.0, 0.0, FRAC_PI_2],
                wheel: WheelSettings {
                    radius: 1.0,
                    direction_local: [0.0, 0.0, -1.0],
                    axle_local: [0.0, 1.0, 0.0],
                    suspension_stiffness: 30.0,
                    suspension_rest_length: 0.3,
                    damping_compression: 4.4,
                    damping_relaxation: 2.3,
                    max_suspension_travel: 0.3,
                    max_suspension_force: 100_000.0,
                    friction_slip: 5.0,
                    roll_influence: 0.01,
                    custom_sliding_rotational_speed: Some(-30.0),
                },
                front_stiffness_offset: 0.0,
                connection_points: [
                    [1.0, 1.0, 0.2],
                    [1.0, -1.0, 0.2],
                    [-1.0, 1.0, 0.2],
                    [-1.0, -1.0, 0.2],
                ],
                ..VehicleConfig::default()
            },
            controls: ControlConfig {
                max_force: 60.0,
                brake_force: 1_000_000.0,
                handbrake_force: 1_000_000.0,
                max_steer: 0.5,
                steer_increment: 0.5, // snaps to full lock in one frame
                forward_sign: -1.0,
            },
            camera: CameraConfig {
                offset: [0.0, -6.0, 20.0],
                yaw_offset: FRAC_PI_2,
                ..CameraConfig::default()
            },
            watchdog: WatchdogConfig::default(),
            scene: SceneConfig {
                ground: GroundConfig::Box { half_extents: [250.0, 10.0, 250.0], top: 0.0 },
                launching_pads: 20,
                scatter_extent: 500.0,
                ..SceneConfig::default()
            },
        }
    }
}

// ---------------------------------------------
// RUNTIME TUNING (debug panel)
// ---------------------------------------------

/// Partial update of wheel parameters, written to all four wheels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WheelTuningPatch {
    pub suspension_stiffness: Option<f32>,
    pub suspension_rest_length: Option<f32>,
    pub damping_compression: Option<f32>,
    pub damping_relaxation: Option<f32>,
    pub max_suspension_travel: Option<f32>,
    pub friction_slip: Option<f32>,
    pub roll_influence: Option<f32>,
    pub custom_sliding_rotational_speed: Option<f32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TuningPatch {
    #[serde(flatten)]
    pub wheels: WheelTuningPatch,
    pub max_force: Option<f32>,
    pub brake_force: Option<f32>,
    pub handbrake_force: Option<f32>,
    pub max_steer: Option<f32>,
    pub steer_increment: Option<f32>,
    pub track_vehicle_rotation: Option<bool>,
}

impl TuningPatch {
    pub fn from_json(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }

    /// Writes the control and camera parts of the patch.
    pub fn apply_to(&self, controls: &mut ControlConfig, camera: &mut CameraConfig) {
        if let Some(v) = self.max_force { controls.max_force = v; }
        if let Some(v) = self.brake_force { controls.brake_force = v; }
        if let Some(v) = self.handbrake_force { controls.handbrake_force = v; }
        if let Some(v) = self.max_steer { controls.max_steer = v; }
        if let Some(v) = self.steer_increment { controls.steer_increment = v; }
        if let Some(v) = self.track_vehicle_rotation { camera.track_vehicle_rotation = v; }
    }
}
