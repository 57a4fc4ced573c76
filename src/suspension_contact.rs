// ==============================================================================
// suspension_contact.rs — RAYCAST SUSPENSION
// ------------------------------------------------------------------------------
// Per wheel and sub-step:
// - cast_wheel_ray(...)
//     Casts from the hard point along the suspension direction, up to
//     rest_length + max_suspension_travel + radius. Fills the RayCastInfo
//     (contact point/normal, ground body, suspension length clamped to
//     rest ± travel) and the suspension relative velocity.
// - compute_suspension_force(...)
//     Spring + damper on the measured length, scaled by chassis mass.
//
// Notes:
// - This file does NOT apply impulses. vehicle.rs turns the force into an
//   impulse along the contact normal, capped by max_suspension_force.
// - A near-tangential hit (normal·direction >= -0.1) gets no relative velocity
//   and a fixed 1/0.1 clip factor.
// ==============================================================================

use rapier3d::prelude::*;

use crate::physics::World;
use crate::vehicle::{WheelConfig, WheelInfo};

const MIN_CONTACT_DOT: Real = -0.1;

pub(crate) fn compute_suspension_force(
    config: &WheelConfig,
    suspension_length: Real,
    relative_velocity: Real,
    clipped_inv_contact_dot: Real,
    chassis_mass: Real,
) -> Real {
    let spring = config.suspension_stiffness
        * (config.suspension_rest_length - suspension_length)
        * clipped_inv_contact_dot;

    // compressing when the contact approaches
    let damping = if relative_velocity < 0.0 {
        config.damping_compression
    } else {
        config.damping_relaxation
    };

    ((spring - damping * relative_velocity) * chassis_mass).max(0.0)
}

/// Fills `wheel.raycast`; an airborne wheel hangs at its rest length.
pub fn cast_wheel_ray(
    wheel: &mut WheelInfo,
    chassis_handle: RigidBodyHandle,
    chassis: &RigidBody,
    world: &World,
) {
    let cfg = wheel.config;
    let origin = wheel.raycast.hard_point;
    let dir = wheel.raycast.direction;

    let ray = Ray::new(origin, dir);
    let max_dist = cfg.suspension_rest_length + cfg.max_suspension_travel + cfg.radius;
    let filter = QueryFilter::default().exclude_rigid_body(chassis_handle);

    let hit = world
        .query_pipeline
        .cast_ray_and_get_normal(&world.bodies, &world.colliders, &ray, max_dist, true, filter);

    let Some((collider, intersection)) = hit else {
        // airborne
        wheel.raycast.in_contact = false;
        wheel.raycast.ground = None;
        wheel.raycast.suspension_length = cfg.suspension_rest_length;
        wheel.raycast.contact_normal = -dir;
        wheel.raycast.contact_point = ray.point_at(max_dist);
        wheel.suspension_relative_velocity = 0.0;
        wheel.clipped_inv_contact_dot_suspension = 1.0;
        return;
    };

    let toi = intersection.time_of_impact;
    // starting inside the ground leaves the normal undefined
    let normal = if intersection.normal == Vector::zeros() { -dir } else { intersection.normal };

    let min_len = cfg.suspension_rest_length - cfg.max_suspension_travel;
    let max_len = cfg.suspension_rest_length + cfg.max_suspension_travel;

    wheel.raycast.in_contact = true;
    wheel.raycast.ground = world.colliders.get(collider).and_then(|c| c.parent());
    wheel.raycast.contact_point = ray.point_at(toi);
    wheel.raycast.contact_normal = normal;
    wheel.raycast.suspension_length = (toi - cfg.radius).max(min_len).min(max_len);

    let denominator = normal.dot(&dir);
    let point_vel = chassis.velocity_at_point(&wheel.raycast.contact_point);
    let projected = normal.dot(&point_vel);

    if denominator >= MIN_CONTACT_DOT {
        wheel.suspension_relative_velocity = 0.0;
        wheel.clipped_inv_contact_dot_suspension = 1.0 / -MIN_CONTACT_DOT;
    } else {
        let inv = -1.0 / denominator;
        wheel.suspension_relative_velocity = projected * inv;
        wheel.clipped_inv_contact_dot_suspension = inv;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{WheelSettings, WorldConfig};
    use crate::physics::{BodyDesc, ShapeDesc, ShapePart};
    use crate::vehicle::WheelPosition;
    use approx::assert_relative_eq;

    fn config() -> WheelConfig {
        WheelConfig::from_settings(&WheelSettings::default(), [0.0, 0.0, 0.0], 0.0)
    }

    #[test]
    fn extended_suspension_pushes_nothing() {
        let cfg = config();
        let f = compute_suspension_force(&cfg, cfg.suspension_rest_length + 0.1, 0.0, 1.0, 150.0);
        assert_eq!(f, 0.0);
    }

    #[test]
    fn spring_force_scales_with_compression_and_mass() {
        let cfg = config();
        let f = compute_suspension_force(&cfg, cfg.suspension_rest_length - 0.1, 0.0, 1.0, 150.0);
        assert_relative_eq!(f, 14.0 * 0.1 * 150.0, epsilon = 1e-3);
    }

    #[test]
    fn compression_damping_is_used_while_compressing() {
        let cfg = config();
        let len = cfg.suspension_rest_length - 0.1;

        let at_rest = compute_suspension_force(&cfg, len, 0.0, 1.0, 1.0);
        let compressing = compute_suspension_force(&cfg, len, -0.5, 1.0, 1.0);
        let extending = compute_suspension_force(&cfg, len, 0.5, 1.0, 1.0);

        assert_relative_eq!(compressing - at_rest, 4.4 * 0.5, epsilon = 1e-4);
        assert_relative_eq!(at_rest - extending, 0.0001 * 0.5, epsilon = 1e-5);
    }

    /// Ground top at y = 0 and a collider-less chassis hovering at `height`.
    fn hovering_wheel(height: Real) -> (World, RigidBodyHandle, RigidBodyHandle, WheelInfo) {
        let mut world = World::new(&WorldConfig::default());
        let ground = world.add_body(&BodyDesc {
            shapes: vec![ShapePart::centered(ShapeDesc::cuboid(10.0, 0.5, 10.0))],
            position: Isometry::translation(0.0, -0.5, 0.0),
            ..BodyDesc::default()
        });
        let chassis = world.add_body(&BodyDesc {
            mass: 150.0,
            position: Isometry::translation(0.0, height, 0.0),
            ..BodyDesc::default()
        });
        world.query_pipeline.update(&world.colliders);

        let mut wheel = WheelInfo::new(WheelPosition::RearLeft, config(), chassis);
        wheel.update_transform(world.body(chassis).unwrap().position());
        (world, ground, chassis, wheel)
    }

    #[test]
    fn grounded_wheel_measures_length_and_normal() {
        let (world, ground, chassis, mut wheel) = hovering_wheel(0.8);
        cast_wheel_ray(&mut wheel, chassis, world.body(chassis).unwrap(), &world);

        assert!(wheel.raycast.in_contact);
        assert_eq!(wheel.raycast.ground, Some(ground));
        assert_relative_eq!(wheel.raycast.contact_point.y, 0.0, epsilon = 1e-4);
        assert_relative_eq!(wheel.raycast.contact_normal, Vector::y(), epsilon = 1e-4);
        assert_relative_eq!(wheel.raycast.suspension_length, 0.8 - 0.315, epsilon = 1e-4);
        assert_relative_eq!(wheel.clipped_inv_contact_dot_suspension, 1.0, epsilon = 1e-4);
    }

    #[test]
    fn wheel_out_of_reach_is_airborne() {
        let (world, _ground, chassis, mut wheel) = hovering_wheel(2.0);
        cast_wheel_ray(&mut wheel, chassis, world.body(chassis).unwrap(), &world);

        assert!(!wheel.raycast.in_contact);
        assert_eq!(wheel.raycast.ground, None);
        assert_eq!(wheel.raycast.suspension_length, 0.3);
    }
}
