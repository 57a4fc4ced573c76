use nalgebra::{DMatrix, Translation3, Unit, UnitQuaternion, Vector3};
use rand::Rng;
use rapier3d::prelude::*;
use std::f32::consts::FRAC_PI_2;

use crate::config::{GroundConfig, SceneConfig, VehicleConfig};
use crate::materials::MaterialId;
use crate::physics::{BodyDesc, ShapeDesc, ShapePart, World};

pub const PROP_MASS: Real = 70.0;          // kg, boxes + spheres
pub const LAUNCHING_PAD_MASS: Real = 200.0; // kg
pub const SPHERE_RADIUS: Real = 3.0;       // m
pub const DROP_HEIGHT: Real = 50.0;        // m, clicked boxes + spheres

// ---------------------------------------------
// PROP KIND
// ---------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropKind {
    Ground,
    Box,
    LaunchingPad,
    Sphere,
}

impl PropKind {
    pub fn color(&self) -> [f32; 3] {
        match self {
            PropKind::Ground => [0.45, 0.42, 0.35],
            PropKind::Box => [0.2, 0.4, 0.8],
            PropKind::LaunchingPad => [0.9, 0.6, 0.1],
            PropKind::Sphere => [0.3, 0.7, 0.3],
        }
    }
}

// ---------------------------------------------
// SPAWNED BODY, RETURNED TO STATE FOR PAIRING
// ---------------------------------------------
#[derive(Debug, Clone)]
pub struct SpawnedProp {
    pub kind: PropKind,
    pub body: RigidBodyHandle,
    pub shape: ShapeDesc,
}

// ---------------------------------------------------------
// Ground: static box (top face at `top`) or heightfield
// ---------------------------------------------------------
pub fn spawn_ground(world: &mut World, ground: &GroundConfig, rng: &mut impl Rng) -> SpawnedProp {
    let (shape, position) = match *ground {
        GroundConfig::Box { half_extents: [hx, hy, hz], top } => {
            (ShapeDesc::cuboid(hx, hy, hz), Isometry::translation(0.0, top - hy, 0.0))
        }
        GroundConfig::Heightfield { rows, cols, element_size, amplitude, base } => {
            let (rows, cols) = (rows.max(2), cols.max(2));
            let heights = DMatrix::from_fn(rows, cols, |_, _| rng.gen_range(0.0..=1.0) * amplitude);

            // rows run along Z, columns along X
            let scale = vector![(cols - 1) as Real * element_size, 1.0, (rows - 1) as Real * element_size];
            (ShapeDesc::Heightfield { heights, scale }, Isometry::translation(0.0, base, 0.0))
        }
    };

    let body = world.add_body(&BodyDesc {
        shapes: vec![ShapePart::centered(shape.clone())],
        position,
        material: MaterialId::GROUND,
        ..BodyDesc::default()
    });

    SpawnedProp { kind: PropKind::Ground, body, shape }
}

// ---------------------------------------------------------
// Boxes: random edge length 1–5 m
// ---------------------------------------------------------
fn box_shape(rng: &mut impl Rng) -> (ShapeDesc, Real) {
    let half = rng.gen_range(1.0..=5.0) / 2.0;
    (ShapeDesc::cuboid(half, half, half), half)
}

fn add_dynamic(world: &mut World, shape: &ShapeDesc, mass: Real, position: Isometry<Real>) -> RigidBodyHandle {
    world.add_body(&BodyDesc {
        mass,
        shapes: vec![ShapePart::centered(shape.clone())],
        position,
        ..BodyDesc::default()
    })
}

fn scatter(rng: &mut impl Rng, extent: Real) -> (Real, Real) {
    let half = (extent / 2.0).max(0.0);
    if half == 0.0 {
        return (0.0, 0.0);
    }
    (rng.gen_range(-half..=half), rng.gen_range(-half..=half))
}

/// A box resting on the ground at a random spot.
pub fn spawn_box(world: &mut World, rng: &mut impl Rng, extent: Real) -> SpawnedProp {
    let (shape, half) = box_shape(rng);
    let (x, z) = scatter(rng, extent);
    let body = add_dynamic(world, &shape, PROP_MASS, Isometry::translation(x, half, z));
    SpawnedProp { kind: PropKind::Box, body, shape }
}

/// A box dropped over the origin (pointer click).
pub fn drop_box(world: &mut World, rng: &mut impl Rng) -> SpawnedProp {
    let (shape, _) = box_shape(rng);
    let body = add_dynamic(world, &shape, PROP_MASS, Isometry::translation(0.0, DROP_HEIGHT, 0.0));
    SpawnedProp { kind: PropKind::Box, body, shape }
}

// ---------------------------------------------------------
// Launching pads: 6 m × 12 m wedge, 2 m high at the back
// ---------------------------------------------------------
pub fn launching_pad_shape() -> ShapeDesc {
    ShapeDesc::ConvexHull {
        points: vec![
            point![-3.0, -1.0, 6.0],
            point![3.0, -1.0, 6.0],
            point![3.0, -1.0, -6.0],
            point![-3.0, -1.0, -6.0],
            point![-3.0, 1.0, -6.0],
            point![3.0, 1.0, -6.0],
        ],
    }
}

pub fn spawn_launching_pad(world: &mut World, rng: &mut impl Rng, extent: Real) -> SpawnedProp {
    let shape = launching_pad_shape();
    let (x, z) = scatter(rng, extent);
    let rotation = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), -FRAC_PI_2);
    let position = Isometry::from_parts(Translation3::new(x, 1.0, z), rotation);
    let body = add_dynamic(world, &shape, LAUNCHING_PAD_MASS, position);
    SpawnedProp { kind: PropKind::LaunchingPad, body, shape }
}

pub fn spawn_sphere(world: &mut World) -> SpawnedProp {
    let shape = ShapeDesc::Ball { radius: SPHERE_RADIUS };
    let body = add_dynamic(world, &shape, PROP_MASS, Isometry::translation(0.0, DROP_HEIGHT, 0.0));
    SpawnedProp { kind: PropKind::Sphere, body, shape }
}

/// Ground first, then boxes, launching pads and spheres.
pub fn spawn_scene(world: &mut World, scene: &SceneConfig, rng: &mut impl Rng) -> Vec<SpawnedProp> {
    let mut props = Vec::with_capacity(1 + scene.boxes + scene.launching_pads + scene.spheres);

    props.push(spawn_ground(world, &scene.ground, rng));
    for _ in 0..scene.boxes {
        props.push(spawn_box(world, rng, scene.scatter_extent));
    }
    for _ in 0..scene.launching_pads {
        props.push(spawn_launching_pad(world, rng, scene.scatter_extent));
    }
    for _ in 0..scene.spheres {
        props.push(spawn_sphere(world));
    }

    props
}

// ---------------------------------------------------------
// Chassis: compound of boxes, spawned with its axis-angle pose
// ---------------------------------------------------------

/// Chassis orientation at spawn, which is also its upright orientation.
pub fn spawn_rotation(vehicle: &VehicleConfig) -> UnitQuaternion<Real> {
    let [ax, ay, az, angle] = vehicle.spawn_axis_angle;
    let axis = vector![ax, ay, az];
    if axis.norm() > 0.0 {
        UnitQuaternion::from_axis_angle(&Unit::new_normalize(axis), angle)
    } else {
        UnitQuaternion::identity()
    }
}

pub fn spawn_chassis(world: &mut World, vehicle: &VehicleConfig) -> RigidBodyHandle {
    let shapes = vehicle
        .chassis
        .iter()
        .map(|b| {
            let [hx, hy, hz] = b.half_extents;
            let [ox, oy, oz] = b.offset;
            ShapePart { shape: ShapeDesc::cuboid(hx, hy, hz), offset: Isometry::translation(ox, oy, oz) }
        })
        .collect();

    let [px, py, pz] = vehicle.spawn_position;

    world.add_body(&BodyDesc {
        mass: vehicle.mass,
        shapes,
        position: Isometry::from_parts(Translation3::new(px, py, pz), spawn_rotation(vehicle)),
        linear_damping: vehicle.linear_damping,
        angular_damping: vehicle.angular_damping,
        material: MaterialId::CHASSIS,
        can_sleep: false,
        ..BodyDesc::default()
    })
}
