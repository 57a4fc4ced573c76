// ==============================================================================
// longitudinal.rs — ROLLING FRICTION (brake) + ENGINE IMPULSE
// ==============================================================================
// Rolling friction is the impulse that would bring the relative forward
// velocity at the contact to zero, shared across the grounded wheels and
// bounded by the wheel brake value. With no brake the bound is zero, so a
// free-rolling wheel only carries engine impulse.
// ===============================================================================

use rapier3d::prelude::*;

use crate::tire::types::{inv_mass, relative_velocity};

pub fn rolling_friction(
    chassis: &RigidBody,
    ground: Option<&RigidBody>,
    contact: &Point<Real>,
    forward: &Vector<Real>,
    max_impulse: Real,
    wheels_on_ground: usize,
) -> Real {
    let denom = inv_mass(chassis) + ground.map(inv_mass).unwrap_or(0.0);
    if denom <= 0.0 {
        return 0.0;
    }

    let vrel = forward.dot(&relative_velocity(chassis, ground, contact));
    let j = -vrel / denom / wheels_on_ground.max(1) as Real;

    let bound = max_impulse.abs();
    j.min(bound).max(-bound)
}

/// Forward impulse of one wheel for one sub-step.
#[inline]
pub fn forward_impulse(rolling: Real, engine_force: Real, dt: Real) -> Real {
    rolling + engine_force * dt
}
