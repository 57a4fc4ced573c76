// ==============================================================================
// solve.rs — TIRE SOLVER (COMBINED SIDE + ROLLING FRICTION)
// ==============================================================================
// ------------------------------------------------------------------------------
// For every grounded wheel:
// - side impulse from lateral.rs along the ground-projected steered axle
// - forward impulse = rolling friction (longitudinal.rs) + engine_force · dt
// - combined bound in impulse space:
//
//     max = suspension_force · dt · friction_slip
//     (forward · FORWARD_FACTOR)² + (side · SIDE_FACTOR)² > max²
//         → wheel.sliding = true, skid_info = max / |combined|
//
// If any wheel slides, every wheel with a side impulse and skid_info < 1 has
// both impulses scaled by its skid_info.
//
// Outputs a list of Impulse actions consumed by vehicle.rs:
// - forward impulse at the contact point
// - side impulse at the contact point pulled toward the chassis COM height by
//   roll_influence (0 = no roll torque)
// - the opposite side impulse on a dynamic ground body
// ==============================================================================

use rapier3d::prelude::*;

use crate::tire::lateral::resolve_single_bilateral;
use crate::tire::longitudinal::{forward_impulse, rolling_friction};
use crate::tire::types::{FrictionFrame, Impulse, FORWARD_FACTOR, SIDE_FACTOR};
use crate::vehicle::WheelInfo;

/// Skid factor when the combined impulse exceeds `max_impulse`, else None.
pub fn combined_skid(forward: Real, side: Real, max_impulse: Real) -> Option<Real> {
    let x = forward * FORWARD_FACTOR;
    let y = side * SIDE_FACTOR;
    let squared = x * x + y * y;

    if squared > max_impulse * max_impulse {
        Some(max_impulse / squared.sqrt())
    } else {
        None
    }
}

pub fn solve_friction(
    wheels: &mut [WheelInfo],
    chassis_handle: RigidBodyHandle,
    bodies: &RigidBodySet,
    dt: Real,
) -> Vec<Impulse> {
    let mut impulses = Vec::new();

    let Some(chassis) = bodies.get(chassis_handle) else {
        return impulses;
    };

    let wheels_on_ground = wheels.iter().filter(|w| w.raycast.in_contact).count();
    let mut frames: Vec<Option<FrictionFrame>> = Vec::with_capacity(wheels.len());
    let mut any_sliding = false;

    // --------------------------------------------------
    // Per-wheel demand
    // --------------------------------------------------
    for wheel in wheels.iter_mut() {
        wheel.side_impulse = 0.0;
        wheel.forward_impulse = 0.0;
        wheel.skid_info = 1.0;
        wheel.sliding = false;

        let frame = if wheel.raycast.in_contact {
            FrictionFrame::new(wheel.steered_axle(), wheel.raycast.contact_normal)
        } else {
            None
        };
        frames.push(frame);

        let Some(frame) = frame else { continue };

        let ground = wheel.raycast.ground.and_then(|h| bodies.get(h));
        let contact = wheel.raycast.contact_point;

        wheel.side_impulse = resolve_single_bilateral(chassis, ground, &contact, &frame.axle);

        let rolling = rolling_friction(chassis, ground, &contact, &frame.forward, wheel.brake(), wheels_on_ground);
        wheel.forward_impulse = forward_impulse(rolling, wheel.engine_force(), dt);

        let max_impulse = wheel.suspension_force * dt * wheel.config.friction_slip;
        if let Some(skid) = combined_skid(wheel.forward_impulse, wheel.side_impulse, max_impulse) {
            wheel.sliding = true;
            wheel.skid_info = skid;
            any_sliding = true;
        }
    }

    if any_sliding {
        for wheel in wheels.iter_mut() {
            if wheel.side_impulse != 0.0 && wheel.skid_info < 1.0 {
                wheel.forward_impulse *= wheel.skid_info;
                wheel.side_impulse *= wheel.skid_info;
            }
        }
    }

    // --------------------------------------------------
    // Impulse actions
    // --------------------------------------------------
    let rot = chassis.position().rotation;
    let com = *chassis.center_of_mass();

    for (wheel, frame) in wheels.iter().zip(frames) {
        let Some(frame) = frame else { continue };
        let contact = wheel.raycast.contact_point;

        if wheel.forward_impulse != 0.0 {
            impulses.push(Impulse {
                body: chassis_handle,
                impulse: frame.forward * wheel.forward_impulse,
                at_point: contact,
            });
        }

        if wheel.side_impulse != 0.0 {
            let side = frame.axle * wheel.side_impulse;

            // pull the application point toward the COM along chassis up
            let up = wheel.config.up();
            let mut rel = rot.inverse() * (contact - com);
            rel -= up * (rel.dot(&up) * (1.0 - wheel.config.roll_influence));
            let roll_point = com + rot * rel;

            impulses.push(Impulse { body: chassis_handle, impulse: side, at_point: roll_point });

            if let Some(ground) = wheel.raycast.ground {
                if bodies.get(ground).is_some_and(|b| b.is_dynamic()) {
                    impulses.push(Impulse { body: ground, impulse: -side, at_point: contact });
                }
            }
        }
    }

    impulses
}
