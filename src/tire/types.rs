//! Shared types + rigid-body helpers for the tire solver.
// tire/types.rs
use rapier3d::prelude::*;

/// Forward (rolling) share of the combined friction bound.
pub const FORWARD_FACTOR: Real = 0.5;
/// Side share of the combined friction bound.
pub const SIDE_FACTOR: Real = 1.0;

// ============================================
// ----- impulses -----
// ============================================
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Impulse {
    pub body: RigidBodyHandle,

    /// Linear impulse in world space (N*s).
    pub impulse: Vector<Real>,

    /// World-space application point.
    pub at_point: Point<Real>,
}

/// Friction frame of one grounded wheel, world space.
#[derive(Clone, Copy, Debug)]
pub struct FrictionFrame {
    pub axle: Vector<Real>,     // steered axle projected on the ground plane
    pub forward: Vector<Real>,  // normal × axle
}

impl FrictionFrame {
    /// None when the axle is (nearly) parallel to the contact normal.
    pub fn new(steered_axle: Vector<Real>, normal: Vector<Real>) -> Option<Self> {
        let projected = steered_axle - normal * steered_axle.dot(&normal);
        let axle = projected.try_normalize(1e-6)?;
        let forward = normal.cross(&axle).try_normalize(1e-6)?;
        Some(Self { axle, forward })
    }
}

// ============================================
// ----- body helpers -----
// ============================================

/// Point-mass inverse mass; fixed and kinematic bodies are infinitely heavy.
#[inline]
pub fn inv_mass(body: &RigidBody) -> Real {
    let m = body.mass();
    if body.is_dynamic() && m > 0.0 { 1.0 / m } else { 0.0 }
}

/// Velocity of `chassis` relative to `ground` at a world point.
#[inline]
pub fn relative_velocity(chassis: &RigidBody, ground: Option<&RigidBody>, at: &Point<Real>) -> Vector<Real> {
    let v1 = chassis.velocity_at_point(at);
    let v2 = ground.map(|g| g.velocity_at_point(at)).unwrap_or_else(Vector::zeros);
    v1 - v2
}
