// ==============================================================================
// lateral.rs — SIDE FRICTION (single bilateral constraint)
// ==============================================================================
// Finds the impulse along the ground-projected axle that removes a fixed share
// (CONTACT_DAMPING) of the relative side velocity between chassis and ground.
// Both bodies are treated as point masses at the contact.
// ==============================================================================

use rapier3d::prelude::*;

use crate::tire::types::{inv_mass, relative_velocity};

pub const CONTACT_DAMPING: Real = 0.2;

pub fn resolve_single_bilateral(
    chassis: &RigidBody,
    ground: Option<&RigidBody>,
    contact: &Point<Real>,
    axle: &Vector<Real>,
) -> Real {
    if axle.norm_squared() > 1.1 {
        return 0.0;
    }

    let denom = inv_mass(chassis) + ground.map(inv_mass).unwrap_or(0.0);
    if denom <= 0.0 {
        return 0.0;
    }

    let rel_vel = axle.dot(&relative_velocity(chassis, ground, contact));
    -CONTACT_DAMPING * rel_vel / denom
}
