// ==============================================================================
// camera.rs — CHASE CAMERA
// ------------------------------------------------------------------------------
// position = vehicle - R_y(yaw) · R_x(pitch) · offset
//
// yaw follows the vehicle heading (+ yaw_offset) while tracking is on; a
// pointer drag with a button held adjusts yaw/pitch otherwise (and pitch in
// both modes). The camera always looks at the vehicle, -Z toward the target.
// ==============================================================================

use nalgebra::{UnitQuaternion, Vector3};
use rapier3d::prelude::*;

use crate::config::CameraConfig;
use crate::input::PointerEvent;
use crate::orientation::heading;
use crate::render::CameraPose;

#[derive(Debug, Clone)]
pub struct ChaseCamera {
    pub config: CameraConfig,
    pitch: Real,
    yaw: Real,
    button_held: bool,
    pose: CameraPose,
}

impl ChaseCamera {
    pub fn new(config: CameraConfig) -> Self {
        Self { config, pitch: 0.0, yaw: config.yaw_offset, button_held: false, pose: CameraPose::default() }
    }

    pub fn pose(&self) -> CameraPose {
        self.pose
    }

    /// (pitch, yaw) accumulators, rad.
    pub fn angles(&self) -> (Real, Real) {
        (self.pitch, self.yaw)
    }

    pub fn handle_pointer(&mut self, event: &PointerEvent) {
        match *event {
            PointerEvent::ButtonDown => self.button_held = true,
            PointerEvent::ButtonUp => self.button_held = false,
            PointerEvent::Move { dx, dy } if self.button_held => {
                let d = self.config.drag_divisor;
                self.yaw -= dx / d;
                self.pitch += dy / d;
            }
            PointerEvent::Move { .. } | PointerEvent::Click => {}
        }
    }

    pub fn update(&mut self, vehicle: &Isometry<Real>) -> CameraPose {
        if self.config.track_vehicle_rotation {
            self.yaw = heading(&vehicle.rotation) + self.config.yaw_offset;
        }

        let [ox, oy, oz] = self.config.offset;
        let rot = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), self.yaw)
            * UnitQuaternion::from_axis_angle(&Vector3::x_axis(), self.pitch);
        let offset = rot * vector![ox, oy, oz];

        let target = Point::from(vehicle.translation.vector);
        let position = target - offset;

        // keep the last orientation when looking straight up/down
        let dir = target - position;
        let up = Vector::y();
        let orientation = if dir.norm() > 1e-6 && dir.cross(&up).norm() > 1e-6 {
            UnitQuaternion::look_at_rh(&dir, &up).inverse()
        } else {
            self.pose.orientation
        };

        self.pose = CameraPose { position, orientation };
        self.pose
    }
}
