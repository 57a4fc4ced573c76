// ==============================================================================
// controls.rs — HELD KEYS → VEHICLE INPUTS
// ------------------------------------------------------------------------------
// apply() runs once per frame before the physics step and re-writes the vehicle
// inputs of every held key (set semantics, so re-applying is harmless):
// - Forward/Backward → ±max_force · forward_sign on the driven wheels
// - Left/Right       → steering accumulator ± steer_increment, clamped to
//                      ±max_steer, written to the steerable wheels
// - Brake            → brake_force on all four wheels
// - Handbrake        → handbrake_force on the driven (rear) wheels
//
// release() is the immediate action of a key-up, so a released key never
// leaves force behind even if no frame runs in between.
// ==============================================================================

use rapier3d::prelude::Real;
use std::collections::BTreeSet;

use crate::config::ControlConfig;
use crate::error::VehicleError;
use crate::input::ControlKey;
use crate::vehicle::{VehicleModel, WheelPosition};

#[derive(Debug, Clone)]
pub struct ControlMapper {
    pub config: ControlConfig,
    steer_value: Real,
}

impl ControlMapper {
    pub fn new(config: ControlConfig) -> Self {
        Self { config, steer_value: 0.0 }
    }

    pub fn steer_value(&self) -> Real {
        self.steer_value
    }

    pub fn apply(&mut self, held: &BTreeSet<ControlKey>, vehicle: &mut VehicleModel) -> Result<(), VehicleError> {
        let c = self.config;

        for key in held {
            match key {
                ControlKey::Forward => drive(vehicle, c.max_force * c.forward_sign)?,
                ControlKey::Backward => drive(vehicle, -c.max_force * c.forward_sign)?,
                ControlKey::Left => {
                    self.steer_value = (self.steer_value + c.steer_increment).min(c.max_steer);
                    steer(vehicle, self.steer_value)?;
                }
                ControlKey::Right => {
                    self.steer_value = (self.steer_value - c.steer_increment).max(-c.max_steer);
                    steer(vehicle, self.steer_value)?;
                }
                ControlKey::Brake => {
                    for pos in WheelPosition::ALL {
                        vehicle.set_brake(c.brake_force, pos);
                    }
                }
                ControlKey::Handbrake => {
                    for pos in WheelPosition::DRIVEN {
                        vehicle.set_brake(c.handbrake_force, pos);
                    }
                }
            }
        }

        Ok(())
    }

    pub fn release(&mut self, key: ControlKey, vehicle: &mut VehicleModel) -> Result<(), VehicleError> {
        match key {
            ControlKey::Forward | ControlKey::Backward => drive(vehicle, 0.0)?,
            ControlKey::Left | ControlKey::Right => {
                self.steer_value = 0.0;
                steer(vehicle, 0.0)?;
            }
            ControlKey::Brake => {
                for pos in WheelPosition::ALL {
                    vehicle.set_brake(0.0, pos);
                }
            }
            ControlKey::Handbrake => {
                for pos in WheelPosition::DRIVEN {
                    vehicle.set_brake(0.0, pos);
                }
            }
        }

        Ok(())
    }
}

fn drive(vehicle: &mut VehicleModel, force: Real) -> Result<(), VehicleError> {
    for pos in WheelPosition::DRIVEN {
        vehicle.apply_engine_force(force, pos)?;
    }
    Ok(())
}

fn steer(vehicle: &mut VehicleModel, angle: Real) -> Result<(), VehicleError> {
    for pos in WheelPosition::STEERABLE {
        vehicle.set_steering_value(angle, pos)?;
    }
    Ok(())
}
