//! Euler decomposition in heading / attitude / bank order (Y, Z, X).
//!
//! Heading is the rotation about world up, so a car that only turned never
//! shows attitude or bank.

use nalgebra::UnitQuaternion;
use rapier3d::prelude::Real;
use std::f32::consts::FRAC_PI_2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EulerAngles {
    pub heading: Real,  // about Y
    pub attitude: Real, // about Z
    pub bank: Real,     // about X
}

pub fn to_euler(q: &UnitQuaternion<Real>) -> EulerAngles {
    let (x, y, z, w) = (q.i, q.j, q.k, q.w);
    let test = x * y + z * w;

    // gimbal poles
    if test > 0.499 {
        return EulerAngles { heading: 2.0 * x.atan2(w), attitude: FRAC_PI_2, bank: 0.0 };
    }
    if test < -0.499 {
        return EulerAngles { heading: -2.0 * x.atan2(w), attitude: -FRAC_PI_2, bank: 0.0 };
    }

    let (sqx, sqy, sqz) = (x * x, y * y, z * z);
    EulerAngles {
        heading: (2.0 * y * w - 2.0 * x * z).atan2(1.0 - 2.0 * sqy - 2.0 * sqz),
        attitude: (2.0 * test).clamp(-1.0, 1.0).asin(),
        bank: (2.0 * x * w - 2.0 * y * z).atan2(1.0 - 2.0 * sqx - 2.0 * sqz),
    }
}

pub fn heading(q: &UnitQuaternion<Real>) -> Real {
    to_euler(q).heading
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;
    use std::f32::consts::PI;

    #[test]
    fn identity_has_no_angles() {
        let e = to_euler(&UnitQuaternion::identity());
        assert_eq!(e, EulerAngles { heading: 0.0, attitude: 0.0, bank: 0.0 });
    }

    #[test]
    fn pure_yaw_is_heading_only() {
        let q = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 2.0);
        let e = to_euler(&q);
        assert_relative_eq!(e.heading, 2.0, epsilon = 1e-5);
        assert_relative_eq!(e.attitude, 0.0, epsilon = 1e-5);
        assert_relative_eq!(e.bank, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn upside_down_is_full_bank() {
        let q = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), PI);
        assert_relative_eq!(to_euler(&q).bank.abs(), PI, epsilon = 1e-5);
    }

    #[test]
    fn nose_up_is_attitude() {
        let q = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 0.7);
        let e = to_euler(&q);
        assert_relative_eq!(e.attitude, 0.7, epsilon = 1e-5);
        assert_relative_eq!(e.bank, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn yawed_then_rolled_keeps_heading() {
        let q = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 1.0)
            * UnitQuaternion::from_axis_angle(&Vector3::x_axis(), -FRAC_PI_2);
        let e = to_euler(&q);
        assert_relative_eq!(e.heading, 1.0, epsilon = 1e-4);
        assert_relative_eq!(e.bank, -FRAC_PI_2, epsilon = 1e-4);
    }
}
