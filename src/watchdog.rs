use nalgebra::UnitQuaternion;
use rapier3d::prelude::*;
use tracing::info;

use crate::config::WatchdogConfig;
use crate::orientation::to_euler;

/// Puts a flipped, stationary vehicle back on its wheels.
///
/// Angles are measured against `upright`, the chassis orientation of a car
/// standing on its wheels (identity unless the chassis model is built on its
/// side), and a reset restores that orientation.
#[derive(Debug, Clone)]
pub struct StabilityWatchdog {
    pub config: WatchdogConfig,
    upright: UnitQuaternion<Real>,
    flipped_frames: u32,
}

impl StabilityWatchdog {
    pub fn new(config: WatchdogConfig) -> Self {
        Self { config, upright: UnitQuaternion::identity(), flipped_frames: 0 }
    }

    pub fn with_upright(mut self, upright: UnitQuaternion<Real>) -> Self {
        self.upright = upright;
        self
    }

    pub fn flipped_frames(&self) -> u32 {
        self.flipped_frames
    }

    /// Slow and rolled/pitched past the flip angle.
    pub fn is_flipped_at_rest(&self, chassis: &RigidBody) -> bool {
        let e = to_euler(&(chassis.rotation() * self.upright.inverse()));
        chassis.linvel().norm() < self.config.speed_threshold
            && (e.bank.abs() > self.config.flip_angle || e.attitude.abs() > self.config.flip_angle)
    }

    /// Once per frame. Returns true when the chassis was reset.
    pub fn check(&mut self, chassis: &mut RigidBody) -> bool {
        if !self.is_flipped_at_rest(chassis) {
            self.flipped_frames = 0;
            return false;
        }

        self.flipped_frames += 1;
        if self.flipped_frames <= self.config.frame_threshold {
            return false;
        }

        let mut t = *chassis.translation();
        t.y = self.config.safe_drop_height;

        chassis.set_linvel(Vector::zeros(), true);
        chassis.set_angvel(Vector::zeros(), true);
        chassis.set_rotation(self.upright, true);
        chassis.set_translation(t, true);

        info!(
            "vehicle flipped for {} frames, reset at ({:.1}, {:.1}, {:.1})",
            self.flipped_frames, t.x, t.y, t.z
        );
        self.flipped_frames = 0;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;
    use std::f32::consts::{FRAC_PI_2, PI};

    fn body(rotation: UnitQuaternion<Real>, linvel: Vector<Real>) -> RigidBody {
        RigidBodyBuilder::dynamic()
            .position(Isometry::from_parts(vector![3.0, 0.4, -1.0].into(), rotation))
            .linvel(linvel)
            .build()
    }

    fn watchdog() -> StabilityWatchdog {
        StabilityWatchdog::new(WatchdogConfig::default())
    }

    fn upside_down() -> UnitQuaternion<Real> {
        UnitQuaternion::from_axis_angle(&Vector3::x_axis(), PI)
    }

    #[test]
    fn flipped_at_rest_resets_after_threshold() {
        let mut dog = watchdog();
        let mut chassis = body(upside_down(), Vector::zeros());

        for _ in 0..100 {
            assert!(!dog.check(&mut chassis));
        }
        assert!(dog.check(&mut chassis));

        assert_eq!(*chassis.rotation(), UnitQuaternion::identity());
        assert_eq!(chassis.translation().y, 5.0);
        assert_eq!(chassis.translation().x, 3.0);
        assert_eq!(*chassis.linvel(), Vector::zeros());
        assert_eq!(*chassis.angvel(), Vector::zeros());
        assert_eq!(dog.flipped_frames(), 0);
    }

    #[test]
    fn exactly_threshold_frames_do_not_reset() {
        let mut dog = watchdog();
        let mut chassis = body(upside_down(), Vector::zeros());

        let resets = (0..100).filter(|_| dog.check(&mut chassis)).count();
        assert_eq!(resets, 0);
        assert_eq!(dog.flipped_frames(), 100);
    }

    #[test]
    fn a_single_upright_frame_clears_the_count() {
        let mut dog = watchdog();
        let mut flipped = body(upside_down(), Vector::zeros());
        let mut upright = body(UnitQuaternion::identity(), Vector::zeros());

        for _ in 0..99 {
            dog.check(&mut flipped);
        }
        dog.check(&mut upright);
        assert_eq!(dog.flipped_frames(), 0);

        for _ in 0..100 {
            assert!(!dog.check(&mut flipped));
        }
    }

    #[test]
    fn moving_vehicles_are_left_alone() {
        let mut dog = watchdog();
        let mut tumbling = body(upside_down(), vector![0.0, 0.0, 3.0]);

        for _ in 0..300 {
            assert!(!dog.check(&mut tumbling));
        }
    }

    #[test]
    fn turning_is_not_flipping() {
        let mut dog = watchdog();
        let mut turned = body(UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 3.0), Vector::zeros());

        for _ in 0..300 {
            assert!(!dog.check(&mut turned));
        }
    }

    #[test]
    fn side_built_chassis_is_judged_against_its_upright_pose() {
        let upright = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), -FRAC_PI_2);
        let mut dog = watchdog().with_upright(upright);

        let mut standing = body(UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 0.8) * upright, Vector::zeros());
        for _ in 0..300 {
            assert!(!dog.check(&mut standing));
        }

        let mut rolled = body(UnitQuaternion::from_axis_angle(&Vector3::x_axis(), PI) * upright, Vector::zeros());
        let resets = (0..101).filter(|_| dog.check(&mut rolled)).count();
        assert_eq!(resets, 1);
        assert_eq!(*rolled.rotation(), upright);
    }

    #[test]
    fn steep_pitch_counts_as_flipped() {
        let dog = watchdog();
        let nose_down = body(UnitQuaternion::from_axis_angle(&Vector3::z_axis(), -1.55), Vector::zeros());
        assert!(dog.is_flipped_at_rest(&nose_down));
    }
}
