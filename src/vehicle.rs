// ==============================================================================
// vehicle.rs — RAYCAST VEHICLE
// ------------------------------------------------------------------------------
// A dynamic chassis plus exactly four wheels that never collide: each wheel is
// a ray cast along its suspension direction every sub-step.
//
// Sub-step hooks (see physics::StepListener):
// - pre_step  → update_vehicle(): wheel frames, ray casts, suspension impulses,
//               tire friction (tire::solve_friction), wheel spin
// - post_step → update_wheel_transforms(): wheel poses follow the moved chassis
//               and are written to one kinematic, collider-less body per wheel
//               so the render side can treat wheels like any other body.
//
// Wheel roles are fixed by position: front wheels steer, rear wheels drive.
// ==============================================================================

use nalgebra::{Translation3, Unit, UnitQuaternion};
use rapier3d::prelude::*;
use serde::Serialize;
use std::fmt;
use tracing::warn;

use crate::config::{VehicleConfig, WheelSettings, WheelTuningPatch};
use crate::error::VehicleError;
use crate::physics::{BodyDesc, StepListener, World};
use crate::suspension_contact::{cast_wheel_ray, compute_suspension_force};
use crate::tire::{self, Impulse};

// ============================================
// Wheel identification
// ============================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum WheelPosition {
    FrontLeft,
    FrontRight,
    RearLeft,
    RearRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WheelRole {
    Steerable,
    Driven,
}

impl WheelPosition {
    /// Storage order of the wheel array.
    pub const ALL: [WheelPosition; 4] = [
        WheelPosition::FrontLeft,
        WheelPosition::FrontRight,
        WheelPosition::RearLeft,
        WheelPosition::RearRight,
    ];
    pub const STEERABLE: [WheelPosition; 2] = [WheelPosition::FrontLeft, WheelPosition::FrontRight];
    pub const DRIVEN: [WheelPosition; 2] = [WheelPosition::RearLeft, WheelPosition::RearRight];

    pub fn index(self) -> usize {
        match self {
            WheelPosition::FrontLeft => 0,
            WheelPosition::FrontRight => 1,
            WheelPosition::RearLeft => 2,
            WheelPosition::RearRight => 3,
        }
    }

    pub fn role(self) -> WheelRole {
        if self.is_front() { WheelRole::Steerable } else { WheelRole::Driven }
    }

    pub fn is_front(self) -> bool {
        matches!(self, WheelPosition::FrontLeft | WheelPosition::FrontRight)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WheelPosition::FrontLeft => "FL",
            WheelPosition::FrontRight => "FR",
            WheelPosition::RearLeft => "RL",
            WheelPosition::RearRight => "RR",
        }
    }
}

impl fmt::Display for WheelPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================
// Per-wheel configuration + state
// ============================================
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelConfig {
    pub radius: Real,
    pub connection_point: Point<Real>,  // chassis space
    pub direction: Vector<Real>,        // suspension direction, chassis space
    pub axle: Vector<Real>,             // chassis space
    pub suspension_stiffness: Real,
    pub suspension_rest_length: Real,
    pub damping_compression: Real,
    pub damping_relaxation: Real,
    pub max_suspension_travel: Real,
    pub max_suspension_force: Real,
    pub friction_slip: Real,
    pub roll_influence: Real,
    pub custom_sliding_rotational_speed: Option<Real>,
}

impl WheelConfig {
    pub fn from_settings(settings: &WheelSettings, connection: [f32; 3], stiffness_offset: Real) -> Self {
        let [dx, dy, dz] = settings.direction_local;
        let [ax, ay, az] = settings.axle_local;
        let [cx, cy, cz] = connection;

        Self {
            radius: settings.radius,
            connection_point: point![cx, cy, cz],
            direction: vector![dx, dy, dz],
            axle: vector![ax, ay, az],
            suspension_stiffness: settings.suspension_stiffness + stiffness_offset,
            suspension_rest_length: settings.suspension_rest_length,
            damping_compression: settings.damping_compression,
            damping_relaxation: settings.damping_relaxation,
            max_suspension_travel: settings.max_suspension_travel,
            max_suspension_force: settings.max_suspension_force,
            friction_slip: settings.friction_slip,
            roll_influence: settings.roll_influence,
            custom_sliding_rotational_speed: settings.custom_sliding_rotational_speed,
        }
    }

    /// The four wheel configurations of a vehicle, in storage order.
    pub fn for_vehicle(config: &VehicleConfig) -> [WheelConfig; 4] {
        WheelPosition::ALL.map(|pos| {
            let offset = if pos.is_front() { config.front_stiffness_offset } else { 0.0 };
            WheelConfig::from_settings(&config.wheel, config.connection_points[pos.index()], offset)
        })
    }

    /// Chassis-space axis the suspension pushes along.
    pub fn up(&self) -> Vector<Real> {
        -self.direction
    }
}

/// Result of the suspension ray cast of one wheel, world space.
#[derive(Debug, Clone, Copy)]
pub struct RayCastInfo {
    pub hard_point: Point<Real>,
    pub direction: Vector<Real>,
    pub axle: Vector<Real>,
    pub contact_point: Point<Real>,
    pub contact_normal: Vector<Real>,
    pub suspension_length: Real,
    pub in_contact: bool,
    pub ground: Option<RigidBodyHandle>,
}

impl RayCastInfo {
    fn at_rest(config: &WheelConfig) -> Self {
        Self {
            hard_point: config.connection_point,
            direction: config.direction,
            axle: config.axle,
            contact_point: config.connection_point,
            contact_normal: config.up(),
            suspension_length: config.suspension_rest_length,
            in_contact: false,
            ground: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WheelInfo {
    position: WheelPosition,
    pub config: WheelConfig,
    pub body: RigidBodyHandle,          // kinematic mirror of the wheel pose

    steering: Real,                     // rad
    engine_force: Real,                 // N
    brake: Real,

    pub rotation: Real,                 // spin about the axle, rad
    pub delta_rotation: Real,
    pub raycast: RayCastInfo,
    pub suspension_relative_velocity: Real,
    pub clipped_inv_contact_dot_suspension: Real,
    pub suspension_force: Real,         // N
    pub side_impulse: Real,
    pub forward_impulse: Real,
    pub skid_info: Real,                // 1 = full grip
    pub sliding: bool,
    pub world_transform: Isometry<Real>,
}

impl WheelInfo {
    pub(crate) fn new(position: WheelPosition, config: WheelConfig, body: RigidBodyHandle) -> Self {
        Self {
            position,
            config,
            body,
            steering: 0.0,
            engine_force: 0.0,
            brake: 0.0,
            rotation: 0.0,
            delta_rotation: 0.0,
            raycast: RayCastInfo::at_rest(&config),
            suspension_relative_velocity: 0.0,
            clipped_inv_contact_dot_suspension: 1.0,
            suspension_force: 0.0,
            side_impulse: 0.0,
            forward_impulse: 0.0,
            skid_info: 1.0,
            sliding: false,
            world_transform: Isometry::identity(),
        }
    }

    pub fn position(&self) -> WheelPosition {
        self.position
    }

    pub fn role(&self) -> WheelRole {
        self.position.role()
    }

    pub fn steering(&self) -> Real {
        self.steering
    }

    pub fn engine_force(&self) -> Real {
        self.engine_force
    }

    pub fn brake(&self) -> Real {
        self.brake
    }

    /// Steered axle in world space.
    pub fn steered_axle(&self) -> Vector<Real> {
        self.world_transform.rotation * self.config.axle
    }

    /// Recomputes hard point, directions and the wheel pose from the chassis
    /// pose and the current suspension length.
    pub(crate) fn update_transform(&mut self, chassis: &Isometry<Real>) {
        let c = &self.config;

        self.raycast.hard_point = chassis * c.connection_point;
        self.raycast.direction = chassis.rotation * c.direction;
        self.raycast.axle = chassis.rotation * c.axle;

        let steer = UnitQuaternion::from_axis_angle(&Unit::new_normalize(c.up()), self.steering);
        let spin = UnitQuaternion::from_axis_angle(&Unit::new_normalize(c.axle), self.rotation);

        let center = self.raycast.hard_point + self.raycast.direction * self.raycast.suspension_length;

        self.world_transform = Isometry::from_parts(
            Translation3::from(center.coords),
            chassis.rotation * steer * spin,
        );
    }
}

// ============================================
// Vehicle
// ============================================
pub struct VehicleModel {
    pub chassis: RigidBodyHandle,
    wheels: [WheelInfo; 4],
    forward_local: Vector<Real>,        // up × axle
    forward_sign: Real,                 // which way along forward_local "forward" is
    current_speed_kmh: Real,            // ground-plane speed, + when driving forward
}

impl VehicleModel {
    /// Creates the four kinematic wheel bodies next to an existing chassis.
    pub fn new(chassis: RigidBodyHandle, configs: [WheelConfig; 4], world: &mut World) -> Result<Self, VehicleError> {
        let chassis_pose = *world
            .body(chassis)
            .ok_or(VehicleError::MissingChassis(chassis))?
            .position();

        let mut wheels = WheelPosition::ALL.map(|pos| {
            let body = world.add_body(&BodyDesc {
                kinematic: true,
                position: chassis_pose,
                ..BodyDesc::default()
            });
            WheelInfo::new(pos, configs[pos.index()], body)
        });

        for wheel in wheels.iter_mut() {
            wheel.update_transform(&chassis_pose);
        }

        let front = &configs[WheelPosition::FrontLeft.index()];
        let forward_local = front.up().cross(&front.axle);

        Ok(Self { chassis, wheels, forward_local, forward_sign: 1.0, current_speed_kmh: 0.0 })
    }

    /// Same sign as `ControlConfig::forward_sign`, so forward key = positive speed.
    pub fn set_forward_sign(&mut self, sign: Real) {
        self.forward_sign = if sign < 0.0 { -1.0 } else { 1.0 };
    }

    pub fn wheels(&self) -> &[WheelInfo; 4] {
        &self.wheels
    }

    pub fn wheel(&self, pos: WheelPosition) -> &WheelInfo {
        &self.wheels[pos.index()]
    }

    pub fn current_speed_kmh(&self) -> Real {
        self.current_speed_kmh
    }

    fn require(&self, pos: WheelPosition, required: WheelRole) -> Result<(), VehicleError> {
        let actual = pos.role();
        if actual == required {
            Ok(())
        } else {
            Err(VehicleError::RoleMismatch { wheel: pos, actual, required })
        }
    }

    /// Sets (does not accumulate) the engine force of a driven wheel.
    pub fn apply_engine_force(&mut self, force: Real, pos: WheelPosition) -> Result<(), VehicleError> {
        self.require(pos, WheelRole::Driven)?;
        self.wheels[pos.index()].engine_force = force;
        Ok(())
    }

    pub fn set_steering_value(&mut self, angle: Real, pos: WheelPosition) -> Result<(), VehicleError> {
        self.require(pos, WheelRole::Steerable)?;
        self.wheels[pos.index()].steering = angle;
        Ok(())
    }

    pub fn set_brake(&mut self, force: Real, pos: WheelPosition) {
        self.wheels[pos.index()].brake = force;
    }

    pub fn apply_tuning(&mut self, patch: &WheelTuningPatch) {
        for wheel in self.wheels.iter_mut() {
            let c = &mut wheel.config;
            if let Some(v) = patch.suspension_stiffness { c.suspension_stiffness = v; }
            if let Some(v) = patch.suspension_rest_length { c.suspension_rest_length = v; }
            if let Some(v) = patch.damping_compression { c.damping_compression = v; }
            if let Some(v) = patch.damping_relaxation { c.damping_relaxation = v; }
            if let Some(v) = patch.max_suspension_travel { c.max_suspension_travel = v; }
            if let Some(v) = patch.friction_slip { c.friction_slip = v; }
            if let Some(v) = patch.roll_influence { c.roll_influence = v; }
            if let Some(v) = patch.custom_sliding_rotational_speed {
                c.custom_sliding_rotational_speed = Some(v);
            }
        }
    }

    /// Pre-solver part of a sub-step.
    pub fn update_vehicle(&mut self, world: &mut World, dt: Real) -> Result<(), VehicleError> {
        let chassis = world.body(self.chassis).ok_or(VehicleError::MissingChassis(self.chassis))?;
        let pose = *chassis.position();
        let chassis_mass = chassis.mass();

        let forward_world = pose.rotation * self.forward_local;
        self.current_speed_kmh = signed_speed_kmh(chassis.linvel(), &forward_world, self.forward_sign);

        // ----------------------------------------------------------------------------
        // 1) Raycast + suspension
        // ----------------------------------------------------------------------------
        for wheel in self.wheels.iter_mut() {
            wheel.update_transform(&pose);
            cast_wheel_ray(wheel, self.chassis, chassis, world);

            wheel.suspension_force = if wheel.raycast.in_contact {
                compute_suspension_force(
                    &wheel.config,
                    wheel.raycast.suspension_length,
                    wheel.suspension_relative_velocity,
                    wheel.clipped_inv_contact_dot_suspension,
                    chassis_mass,
                )
            } else {
                0.0
            };
        }

        // collect impulses here, apply later
        let suspension: Vec<Impulse> = self
            .wheels
            .iter()
            .filter(|w| w.raycast.in_contact)
            .map(|w| Impulse {
                body: self.chassis,
                impulse: w.raycast.contact_normal * (w.suspension_force.min(w.config.max_suspension_force) * dt),
                at_point: w.raycast.contact_point,
            })
            .collect();
        apply_impulses(world, &suspension);

        // ----------------------------------------------------------------------------
        // 2) Tire friction (sees the velocities after suspension)
        // ----------------------------------------------------------------------------
        let friction = tire::solve_friction(&mut self.wheels, self.chassis, &world.bodies, dt);
        apply_impulses(world, &friction);

        // ----------------------------------------------------------------------------
        // 3) Wheel spin
        // ----------------------------------------------------------------------------
        let chassis = world.body(self.chassis).ok_or(VehicleError::MissingChassis(self.chassis))?;
        for wheel in self.wheels.iter_mut() {
            let vel = chassis.velocity_at_point(&wheel.raycast.hard_point);

            if wheel.raycast.in_contact {
                let n = wheel.raycast.contact_normal;
                let fwd = forward_world - n * forward_world.dot(&n);
                wheel.delta_rotation = -fwd.dot(&vel) * dt / wheel.config.radius;
            }

            if let Some(speed) = wheel.config.custom_sliding_rotational_speed {
                if (wheel.sliding || !wheel.raycast.in_contact) && wheel.engine_force != 0.0 {
                    wheel.delta_rotation = wheel.engine_force.signum() * speed * dt;
                }
            }

            // locked
            if wheel.brake.abs() > wheel.engine_force.abs() {
                wheel.delta_rotation = 0.0;
            }

            wheel.rotation += wheel.delta_rotation;
            wheel.delta_rotation *= 0.99;
        }

        Ok(())
    }

    /// Post-solver part of a sub-step.
    pub fn update_wheel_transforms(&mut self, world: &mut World) -> Result<(), VehicleError> {
        let pose = *world
            .body(self.chassis)
            .ok_or(VehicleError::MissingChassis(self.chassis))?
            .position();

        for wheel in self.wheels.iter_mut() {
            wheel.update_transform(&pose);
            if let Some(body) = world.body_mut(wheel.body) {
                body.set_position(wheel.world_transform, true);
            }
        }

        Ok(())
    }
}

impl StepListener for VehicleModel {
    fn pre_step(&mut self, world: &mut World, dt: Real) {
        if let Err(err) = self.update_vehicle(world, dt) {
            warn!("vehicle pre-step skipped: {err}");
        }
    }

    fn post_step(&mut self, world: &mut World, _dt: Real) {
        if let Err(err) = self.update_wheel_transforms(world) {
            warn!("wheel transforms not updated: {err}");
        }
    }
}

fn apply_impulses(world: &mut World, impulses: &[Impulse]) {
    for imp in impulses {
        if let Some(body) = world.body_mut(imp.body) {
            body.apply_impulse_at_point(imp.impulse, imp.at_point, true);
        }
    }
}

/// Horizontal speed in km/h, negative when moving against the drive direction.
pub(crate) fn signed_speed_kmh(linvel: &Vector<Real>, forward_world: &Vector<Real>, forward_sign: Real) -> Real {
    let planar = vector![linvel.x, 0.0, linvel.z];
    let speed = 3.6 * planar.norm();
    if planar.dot(forward_world) * forward_sign < 0.0 { -speed } else { speed }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SimConfig, WorldConfig};
    use crate::physics::{ShapeDesc, ShapePart};
    use approx::assert_relative_eq;

    fn chassis(world: &mut World) -> RigidBodyHandle {
        world.add_body(&BodyDesc {
            mass: 150.0,
            shapes: vec![ShapePart::centered(ShapeDesc::cuboid(1.755, 0.2925, 0.8775))],
            position: Isometry::translation(0.0, 4.0, 0.0),
            can_sleep: false,
            ..BodyDesc::default()
        })
    }

    fn vehicle(world: &mut World) -> VehicleModel {
        let handle = chassis(world);
        let configs = WheelConfig::for_vehicle(&SimConfig::hatchback().vehicle);
        VehicleModel::new(handle, configs, world).unwrap()
    }

    #[test]
    fn roles_follow_positions() {
        assert_eq!(WheelPosition::STEERABLE.map(WheelPosition::role), [WheelRole::Steerable; 2]);
        assert_eq!(WheelPosition::DRIVEN.map(WheelPosition::role), [WheelRole::Driven; 2]);
        for (i, pos) in WheelPosition::ALL.iter().enumerate() {
            assert_eq!(pos.index(), i);
        }
    }

    #[test]
    fn engine_force_is_refused_on_steerable_wheels() {
        let mut world = World::new(&WorldConfig::default());
        let mut v = vehicle(&mut world);

        let err = v.apply_engine_force(100.0, WheelPosition::FrontLeft).unwrap_err();
        assert!(matches!(
            err,
            VehicleError::RoleMismatch { wheel: WheelPosition::FrontLeft, required: WheelRole::Driven, .. }
        ));
        assert_eq!(v.wheel(WheelPosition::FrontLeft).engine_force(), 0.0);
    }

    #[test]
    fn steering_is_refused_on_driven_wheels() {
        let mut world = World::new(&WorldConfig::default());
        let mut v = vehicle(&mut world);

        assert!(v.set_steering_value(0.3, WheelPosition::RearRight).is_err());
        assert!(v.set_steering_value(0.3, WheelPosition::FrontRight).is_ok());
        assert_eq!(v.wheel(WheelPosition::FrontRight).steering(), 0.3);
        assert_eq!(v.wheel(WheelPosition::RearRight).steering(), 0.0);
    }

    #[test]
    fn engine_force_is_set_not_accumulated() {
        let mut world = World::new(&WorldConfig::default());
        let mut v = vehicle(&mut world);

        for _ in 0..10 {
            v.apply_engine_force(270.0, WheelPosition::RearLeft).unwrap();
        }
        assert_eq!(v.wheel(WheelPosition::RearLeft).engine_force(), 270.0);
    }

    #[test]
    fn front_wheels_get_the_stiffness_offset() {
        let configs = WheelConfig::for_vehicle(&SimConfig::hatchback().vehicle);
        assert_relative_eq!(configs[0].suspension_stiffness, 17.0);
        assert_relative_eq!(configs[1].suspension_stiffness, 17.0);
        assert_relative_eq!(configs[2].suspension_stiffness, 14.0);
    }

    #[test]
    fn missing_chassis_is_reported() {
        let mut world = World::new(&WorldConfig::default());
        let handle = chassis(&mut world);
        world.remove_body(handle).unwrap();

        let configs = WheelConfig::for_vehicle(&SimConfig::hatchback().vehicle);
        assert!(matches!(
            VehicleModel::new(handle, configs, &mut world),
            Err(VehicleError::MissingChassis(_))
        ));
    }

    #[test]
    fn wheel_pose_hangs_below_the_hard_point() {
        let mut world = World::new(&WorldConfig::default());
        let v = vehicle(&mut world);

        let fl = v.wheel(WheelPosition::FrontLeft);
        let t = fl.world_transform.translation.vector;
        // airborne: rest length below the connection point
        assert_relative_eq!(t.x, 0.8775, epsilon = 1e-5);
        assert_relative_eq!(t.y, 4.0 - 0.26 - 0.3, epsilon = 1e-5);
        assert_relative_eq!(t.z, 0.756, epsilon = 1e-5);
    }

    #[test]
    fn tuning_reaches_every_wheel() {
        let mut world = World::new(&WorldConfig::default());
        let mut v = vehicle(&mut world);

        v.apply_tuning(&WheelTuningPatch { friction_slip: Some(4.0), ..Default::default() });
        assert!(v.wheels().iter().all(|w| w.config.friction_slip == 4.0));
        assert!(v.wheels().iter().all(|w| w.config.roll_influence == 0.05));
    }

    #[test]
    fn speed_ignores_vertical_motion() {
        let falling = vector![0.0, -3.0, 0.0];
        assert_eq!(signed_speed_kmh(&falling, &Vector::x(), 1.0), 0.0);

        let settling = vector![2.0, 0.5, 0.0];
        assert_relative_eq!(signed_speed_kmh(&settling, &Vector::x(), 1.0), 7.2, epsilon = 1e-4);
    }

    #[test]
    fn forward_sign_decides_the_speed_sign() {
        // local forward is -X, the drive direction is +X
        let linvel = vector![5.0, 0.0, 0.0];
        assert_relative_eq!(signed_speed_kmh(&linvel, &-Vector::x(), -1.0), 18.0, epsilon = 1e-4);
        assert_relative_eq!(signed_speed_kmh(&linvel, &-Vector::x(), 1.0), -18.0, epsilon = 1e-4);
    }

    #[test]
    fn steering_turns_the_wheel_about_its_up_axis() {
        let mut world = World::new(&WorldConfig::default());
        let mut v = vehicle(&mut world);

        v.set_steering_value(0.5, WheelPosition::FrontLeft).unwrap();
        v.update_wheel_transforms(&mut world).unwrap();

        let axle = v.wheel(WheelPosition::FrontLeft).steered_axle();
        assert_relative_eq!(axle.y, 0.0, epsilon = 1e-5);
        assert_relative_eq!(axle.z, 0.5_f32.cos(), epsilon = 1e-5);
        assert_relative_eq!(axle.x, 0.5_f32.sin(), epsilon = 1e-5);
    }
}
