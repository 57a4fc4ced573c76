// src/physics.rs

use nalgebra::DMatrix;
use rapier3d::prelude::*;
use std::num::NonZeroUsize;
use tracing::{debug, warn};

use crate::config::WorldConfig;
use crate::error::SimError;
use crate::materials::{ContactMaterials, MaterialId};

// --------------------------------------------------
// Shape + body descriptions
// --------------------------------------------------

/// Collision (and visual) shape. Shared with the render backend so a prop is
/// described once.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeDesc {
    Cuboid { half_extents: Vector<Real> },
    Ball { radius: Real },
    Cylinder { half_height: Real, radius: Real },
    ConvexHull { points: Vec<Point<Real>> },
    Heightfield { heights: DMatrix<Real>, scale: Vector<Real> },
}

impl ShapeDesc {
    pub fn cuboid(hx: Real, hy: Real, hz: Real) -> Self {
        ShapeDesc::Cuboid { half_extents: vector![hx, hy, hz] }
    }

    /// None when the hull is degenerate (fewer than 4 non-coplanar points).
    fn builder(&self) -> Option<ColliderBuilder> {
        match self {
            ShapeDesc::Cuboid { half_extents: h } => Some(ColliderBuilder::cuboid(h.x, h.y, h.z)),
            ShapeDesc::Ball { radius } => Some(ColliderBuilder::ball(*radius)),
            ShapeDesc::Cylinder { half_height, radius } => {
                Some(ColliderBuilder::cylinder(*half_height, *radius))
            }
            ShapeDesc::ConvexHull { points } => ColliderBuilder::convex_hull(points),
            ShapeDesc::Heightfield { heights, scale } => {
                Some(ColliderBuilder::heightfield(heights.clone(), *scale))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShapePart {
    pub shape: ShapeDesc,
    pub offset: Isometry<Real>, // relative to the body origin
}

impl ShapePart {
    pub fn centered(shape: ShapeDesc) -> Self {
        Self { shape, offset: Isometry::identity() }
    }
}

#[derive(Debug, Clone)]
pub struct BodyDesc {
    pub mass: Real,                 // 0 = fixed, > 0 = dynamic
    pub kinematic: bool,            // position-driven, ignores mass
    pub shapes: Vec<ShapePart>,
    pub position: Isometry<Real>,
    pub linear_damping: Real,
    pub angular_damping: Real,
    pub material: MaterialId,
    pub groups: InteractionGroups,
    pub can_sleep: bool,
}

impl Default for BodyDesc {
    fn default() -> Self {
        Self {
            mass: 0.0,
            kinematic: false,
            shapes: Vec::new(),
            position: Isometry::identity(),
            linear_damping: 0.01,
            angular_damping: 0.01,
            material: MaterialId::DEFAULT,
            groups: InteractionGroups::all(),
            can_sleep: true,
        }
    }
}

// --------------------------------------------------
// Sub-step hooks
// --------------------------------------------------

/// Runs inside every sub-step, around the solver.
pub trait StepListener {
    /// After the query pipeline refresh, before the solver.
    fn pre_step(&mut self, _world: &mut World, _dt: Real) {}
    /// After the solver moved the bodies.
    fn post_step(&mut self, _world: &mut World, _dt: Real) {}
}

impl StepListener for () {}

impl<T: StepListener> StepListener for Option<T> {
    fn pre_step(&mut self, world: &mut World, dt: Real) {
        if let Some(inner) = self {
            inner.pre_step(world, dt);
        }
    }

    fn post_step(&mut self, world: &mut World, dt: Real) {
        if let Some(inner) = self {
            inner.post_step(world, dt);
        }
    }
}

// --------------------------------------------------
// World
// --------------------------------------------------
pub struct World {
    pub gravity: Vector<Real>,              // gravity vector
    pub pipeline: PhysicsPipeline,          // physics pipeline
    pub island_manager: IslandManager,      // manages islands of bodies
    pub broad_phase: DefaultBroadPhase,     // multi-SAP broad-phase
    pub narrow_phase: NarrowPhase,          // collision detection
    pub bodies: RigidBodySet,               // for rigid bodies
    pub colliders: ColliderSet,             // for collision shapes
    pub joints: ImpulseJointSet,            // for constraints
    pub multibody_joints: MultibodyJointSet,// for articulated bodies
    pub ccd: CCDSolver,                     // continuous collision detection
    pub query_pipeline: QueryPipeline,      // for raycasting
    pub materials: ContactMaterials,        // pair → friction/restitution
    pub solver_iterations: usize,
    pub allow_sleep: bool,
    accumulator: Real,
    warned_non_finite: bool,
}

impl World {
    pub fn new(config: &WorldConfig) -> Self {
        let [gx, gy, gz] = config.gravity;

        Self {
            gravity: vector![gx, gy, gz],
            pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            materials: ContactMaterials::from_rules(config.default_contact, &config.contact_materials),
            solver_iterations: config.solver_iterations.max(1),
            allow_sleep: config.allow_sleep,
            accumulator: 0.0,
            warned_non_finite: false,
        }
    }

    /// Inserts a body with its colliders. Collider density is the body mass
    /// spread over the total shape volume (ρ = m / V).
    pub fn add_body(&mut self, desc: &BodyDesc) -> RigidBodyHandle {
        let builder = if desc.kinematic {
            RigidBodyBuilder::kinematic_position_based()
        } else if desc.mass > 0.0 {
            RigidBodyBuilder::dynamic()
        } else {
            RigidBodyBuilder::fixed()
        };

        let rb = builder
            .position(desc.position)
            .linear_damping(desc.linear_damping)
            .angular_damping(desc.angular_damping)
            .can_sleep(self.allow_sleep && desc.can_sleep)
            .build();

        let handle = self.bodies.insert(rb);

        let builders: Vec<(ColliderBuilder, Isometry<Real>)> = desc
            .shapes
            .iter()
            .filter_map(|part| match part.shape.builder() {
                Some(b) => Some((b, part.offset)),
                None => {
                    warn!("skipping degenerate convex hull on body {:?}", handle);
                    None
                }
            })
            .collect();

        let volume: Real = builders
            .iter()
            .map(|(b, _)| b.shape.mass_properties(1.0).mass())
            .sum();

        let density = if desc.mass > 0.0 && volume > 0.0 { desc.mass / volume } else { 0.0 };

        for (builder, offset) in builders {
            let collider = builder
                .position(offset)
                .density(density)
                .collision_groups(desc.groups)
                .user_data(desc.material.to_user_data())
                .active_hooks(ActiveHooks::MODIFY_SOLVER_CONTACTS)
                .build();

            self.colliders.insert_with_parent(collider, handle, &mut self.bodies);
        }

        debug!(
            "inserted body {:?} (mass {}, {} shapes). Bodies = {}, Colliders = {}",
            handle,
            desc.mass,
            desc.shapes.len(),
            self.bodies.len(),
            self.colliders.len()
        );

        handle
    }

    pub fn remove_body(&mut self, handle: RigidBodyHandle) -> Result<RigidBody, SimError> {
        self.bodies
            .remove(
                handle,
                &mut self.island_manager,
                &mut self.colliders,
                &mut self.joints,
                &mut self.multibody_joints,
                true,
            )
            .ok_or(SimError::UnknownBody(handle))
    }

    pub fn body(&self, handle: RigidBodyHandle) -> Option<&RigidBody> {
        self.bodies.get(handle)
    }

    pub fn body_mut(&mut self, handle: RigidBodyHandle) -> Option<&mut RigidBody> {
        self.bodies.get_mut(handle)
    }

    /// Advances by `real_delta` seconds of wall time in fixed sub-steps of
    /// `fixed_delta`, at most `max_sub_steps` of them. Leftover time stays in
    /// the accumulator (modulo one sub-step). Returns the sub-step count.
    pub fn step(
        &mut self,
        fixed_delta: Real,
        real_delta: Real,
        max_sub_steps: usize,
        listener: &mut impl StepListener,
    ) -> usize {
        if fixed_delta <= 0.0 {
            return 0;
        }

        self.accumulator += real_delta.max(0.0);

        let mut sub_steps = 0;
        while self.accumulator >= fixed_delta && sub_steps < max_sub_steps {
            self.step_once(fixed_delta, listener);
            self.accumulator -= fixed_delta;
            sub_steps += 1;
        }

        self.accumulator %= fixed_delta;
        sub_steps
    }

    /// Exactly one sub-step of `dt`.
    pub fn step_once(&mut self, dt: Real, listener: &mut impl StepListener) {
        // 1) Refresh ray-cast acceleration structure
        self.query_pipeline.update(&self.colliders);

        // 2) Vehicle raycasts + impulses
        listener.pre_step(self, dt);

        // 3) Step physics.
        let params = IntegrationParameters {
            dt,
            num_solver_iterations: NonZeroUsize::new(self.solver_iterations).unwrap_or(NonZeroUsize::MIN),
            ..IntegrationParameters::default()
        };

        self.pipeline.step(
            &self.gravity,
            &params,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.joints,
            &mut self.multibody_joints,
            &mut self.ccd,
            Some(&mut self.query_pipeline),
            &self.materials,
            &(),
        );

        // 4) Wheel transforms follow the moved chassis
        listener.post_step(self, dt);

        self.observe_non_finite();
    }

    pub fn accumulated_time(&self) -> Real {
        self.accumulator
    }

    // Non-finite state is left alone; it is only reported once.
    fn observe_non_finite(&mut self) {
        if self.warned_non_finite {
            return;
        }

        for (handle, body) in self.bodies.iter() {
            let pos = body.translation();
            if !pos.x.is_finite() || !pos.y.is_finite() || !pos.z.is_finite() {
                warn!("body {:?} has a non-finite translation {:?}", handle, pos);
                self.warned_non_finite = true;
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materials::{ContactProperties, ContactRule};
    use approx::assert_relative_eq;

    #[derive(Default)]
    struct CountingListener {
        pre: usize,
        post: usize,
    }

    impl StepListener for CountingListener {
        fn pre_step(&mut self, _world: &mut World, _dt: Real) {
            assert_eq!(self.pre, self.post, "pre_step must precede post_step");
            self.pre += 1;
        }

        fn post_step(&mut self, _world: &mut World, _dt: Real) {
            self.post += 1;
        }
    }

    fn falling_box(world: &mut World) -> RigidBodyHandle {
        world.add_body(&BodyDesc {
            mass: 8.0,
            shapes: vec![ShapePart::centered(ShapeDesc::cuboid(1.0, 1.0, 1.0))],
            position: Isometry::translation(0.0, 10.0, 0.0),
            linear_damping: 0.0,
            can_sleep: false,
            ..BodyDesc::default()
        })
    }

    #[test]
    fn accumulator_runs_whole_sub_steps_only() {
        let mut world = World::new(&WorldConfig::default());
        let mut listener = CountingListener::default();
        let dt = 1.0 / 60.0;

        assert_eq!(world.step(dt, dt * 0.5, 10, &mut listener), 0);
        assert_eq!(world.step(dt, dt * 0.6, 10, &mut listener), 1);
        assert_eq!(listener.pre, 1);
        assert_eq!(listener.post, 1);
        assert_relative_eq!(world.accumulated_time(), dt * 0.1, epsilon = 1e-5);
    }

    #[test]
    fn sub_steps_are_bounded() {
        let mut world = World::new(&WorldConfig::default());
        let mut listener = CountingListener::default();
        let dt = 1.0 / 60.0;

        let n = world.step(dt, 1.0, 3, &mut listener);

        assert_eq!(n, 3);
        assert_eq!(listener.post, 3);
        assert!(world.accumulated_time() < dt);
    }

    #[test]
    fn density_is_derived_from_mass() {
        let mut world = World::new(&WorldConfig::default());
        let handle = falling_box(&mut world);
        world.step_once(1.0 / 60.0, &mut ());

        let body = world.body(handle).unwrap();
        assert_relative_eq!(body.mass(), 8.0, epsilon = 1e-3);
    }

    #[test]
    fn free_body_falls_under_gravity() {
        let mut world = World::new(&WorldConfig::default());
        let handle = falling_box(&mut world);

        for _ in 0..60 {
            world.step_once(1.0 / 60.0, &mut ());
        }

        let body = world.body(handle).unwrap();
        assert_relative_eq!(body.linvel().y, -10.0, epsilon = 0.05);
    }

    #[test]
    fn zero_mass_bodies_are_fixed() {
        let mut world = World::new(&WorldConfig::default());
        let handle = world.add_body(&BodyDesc {
            shapes: vec![ShapePart::centered(ShapeDesc::cuboid(5.0, 1.0, 5.0))],
            ..BodyDesc::default()
        });

        world.step_once(1.0 / 60.0, &mut ());
        assert!(world.body(handle).unwrap().is_fixed());
    }

    #[test]
    fn removing_twice_reports_unknown_body() {
        let mut world = World::new(&WorldConfig::default());
        let handle = falling_box(&mut world);

        assert!(world.remove_body(handle).is_ok());
        assert!(matches!(world.remove_body(handle), Err(SimError::UnknownBody(h)) if h == handle));
        assert_eq!(world.colliders.len(), 0);
    }

    const RUBBER: MaterialId = MaterialId(7);

    /// Drops a rubber ball onto ground and returns its fastest upward speed.
    fn peak_rebound(config: &WorldConfig) -> Real {
        let mut world = World::new(config);
        world.add_body(&BodyDesc {
            shapes: vec![ShapePart::centered(ShapeDesc::cuboid(10.0, 0.5, 10.0))],
            material: MaterialId::GROUND,
            ..BodyDesc::default()
        });
        let ball = world.add_body(&BodyDesc {
            mass: 1.0,
            shapes: vec![ShapePart::centered(ShapeDesc::Ball { radius: 0.5 })],
            position: Isometry::translation(0.0, 5.0, 0.0),
            material: RUBBER,
            linear_damping: 0.0,
            can_sleep: false,
            ..BodyDesc::default()
        });

        let mut peak: Real = 0.0;
        for _ in 0..120 {
            world.step_once(1.0 / 60.0, &mut ());
            peak = peak.max(world.body(ball).unwrap().linvel().y);
        }
        peak
    }

    #[test]
    fn contact_rules_reach_the_solver() {
        let dead = ContactProperties { friction: 0.5, restitution: 0.0 };
        let plain = WorldConfig { default_contact: dead, contact_materials: Vec::new(), ..WorldConfig::default() };
        let bouncy = WorldConfig {
            default_contact: dead,
            contact_materials: vec![ContactRule {
                first: MaterialId::GROUND,
                second: RUBBER,
                properties: ContactProperties { friction: 0.5, restitution: 0.9 },
            }],
            ..WorldConfig::default()
        };

        let without = peak_rebound(&plain);
        let with = peak_rebound(&bouncy);

        assert!(without < 0.5, "dead ball bounced at {without}");
        assert!(with > 5.0, "rubber ball bounced at {with}");
    }
}
