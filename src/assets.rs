// ==============================================================================
// assets.rs — VEHICLE MODEL PARTS
// ------------------------------------------------------------------------------
// A loaded model is a set of named visual objects. The vehicle needs five of
// them: the chassis ("car") and the four wheels. Anything else in the model is
// ignored.
// ==============================================================================

use std::collections::HashMap;

use crate::config::VehicleConfig;
use crate::error::AssetError;
use crate::physics::ShapeDesc;
use crate::render::{MaterialDesc, RenderBackend, VisualHandle};
use crate::vehicle::WheelPosition;

pub const CHASSIS_PART: &str = "car";

/// Part name per wheel, FL / FR / RL / RR.
pub const WHEEL_PARTS: [&str; 4] = [
    "front_left_wheel",
    "front_right_wheel",
    "back_left_wheel",
    "back_right_wheel",
];

#[derive(Debug, Clone, Default)]
pub struct LoadedModel {
    pub parts: HashMap<String, VisualHandle>,
}

impl LoadedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, visual: VisualHandle) {
        self.parts.insert(name.into(), visual);
    }

    pub fn part(&self, name: &str) -> Result<VisualHandle, AssetError> {
        self.parts
            .get(name)
            .copied()
            .ok_or_else(|| AssetError::MissingPart(name.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleParts {
    pub chassis: VisualHandle,
    pub wheels: [VisualHandle; 4],
}

impl VehicleParts {
    pub fn from_model(model: &LoadedModel) -> Result<Self, AssetError> {
        let chassis = model.part(CHASSIS_PART)?;
        let wheels = [
            model.part(WHEEL_PARTS[0])?,
            model.part(WHEEL_PARTS[1])?,
            model.part(WHEEL_PARTS[2])?,
            model.part(WHEEL_PARTS[3])?,
        ];

        let parts = Self { chassis, wheels };

        // each part drives its own body
        let [fl, fr, rl, rr] = WHEEL_PARTS;
        let names = [CHASSIS_PART, fl, fr, rl, rr];
        let handles = parts.all();
        for (i, visual) in handles.iter().enumerate() {
            if let Some(j) = handles[..i].iter().position(|v| v == visual) {
                return Err(AssetError::SharedPart {
                    first: names[j].to_string(),
                    second: names[i].to_string(),
                    visual: *visual,
                });
            }
        }

        Ok(parts)
    }

    /// Chassis first, then the wheels in FL / FR / RL / RR order.
    pub fn all(&self) -> [VisualHandle; 5] {
        let [fl, fr, rl, rr] = self.wheels;
        [self.chassis, fl, fr, rl, rr]
    }

    pub fn wheel(&self, pos: WheelPosition) -> VisualHandle {
        self.wheels[pos.index()]
    }
}

/// Loads (or builds) the vehicle model and registers its visuals.
pub trait ModelLoader {
    fn load(&mut self, backend: &mut dyn RenderBackend) -> Result<LoadedModel, AssetError>;
}

/// Stand-in model made of primitives: a box body and four cylinder wheels.
#[derive(Debug, Clone)]
pub struct ProceduralCarLoader {
    pub chassis_half_extents: [f32; 3],
    pub wheel_radius: f32,
    pub body_color: [f32; 3],
    pub wheel_color: [f32; 3],
}

impl ProceduralCarLoader {
    pub fn for_vehicle(config: &VehicleConfig) -> Self {
        let chassis_half_extents = config.chassis.first().map_or([1.0, 0.5, 0.5], |b| b.half_extents);
        Self {
            chassis_half_extents,
            wheel_radius: config.wheel.radius,
            body_color: [0.8, 0.1, 0.1],
            wheel_color: [0.1, 0.1, 0.1],
        }
    }
}

impl ModelLoader for ProceduralCarLoader {
    fn load(&mut self, backend: &mut dyn RenderBackend) -> Result<LoadedModel, AssetError> {
        let [hx, hy, hz] = self.chassis_half_extents;
        if !(hx > 0.0 && hy > 0.0 && hz > 0.0 && self.wheel_radius > 0.0) {
            return Err(AssetError::LoadFailed(format!(
                "degenerate procedural car: half extents {:?}, wheel radius {}",
                self.chassis_half_extents, self.wheel_radius
            )));
        }

        let mut model = LoadedModel::new();
        model.insert(
            CHASSIS_PART,
            backend.create_visual_object(&ShapeDesc::cuboid(hx, hy, hz), &MaterialDesc::solid(self.body_color)),
        );

        let wheel = ShapeDesc::Cylinder { half_height: self.wheel_radius * 0.85 / 2.0, radius: self.wheel_radius };
        for name in WHEEL_PARTS {
            model.insert(name, backend.create_visual_object(&wheel, &MaterialDesc::solid(self.wheel_color)));
        }

        Ok(model)
    }
}
