//! Error types for the driving simulation.

use rapier3d::prelude::RigidBodyHandle;
use thiserror::Error;

use crate::render::VisualHandle;
use crate::vehicle::{WheelPosition, WheelRole};

/// Failures while obtaining the vehicle model from the asset collaborator.
#[derive(Debug, Error)]
pub enum AssetError {
    /// The loaded scene graph lacks one of the required named parts.
    #[error("loaded model has no part named `{0}`")]
    MissingPart(String),

    /// Two of the required parts share one visual object.
    #[error("parts `{first}` and `{second}` share visual object {visual:?}")]
    SharedPart {
        first: String,
        second: String,
        visual: VisualHandle,
    },

    /// The loader itself reported a failure.
    #[error("model load failed: {0}")]
    LoadFailed(String),
}

/// Misuse of the raycast vehicle operations.
#[derive(Debug, Error)]
pub enum VehicleError {
    /// An operation reserved for one wheel role was aimed at another.
    #[error("wheel {wheel} is {actual:?}, operation requires a {required:?} wheel")]
    RoleMismatch {
        wheel: WheelPosition,
        actual: WheelRole,
        required: WheelRole,
    },

    /// The chassis body is no longer part of the world.
    #[error("chassis body {0:?} is not in the world")]
    MissingChassis(RigidBodyHandle),
}

/// Top-level simulation error.
#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error(transparent)]
    Vehicle(#[from] VehicleError),

    /// A body handle that the world does not know about.
    #[error("rigid body {0:?} is not registered with the world")]
    UnknownBody(RigidBodyHandle),

    /// A visual object can only ever be paired with one body.
    #[error("visual object {0:?} is already paired with a body")]
    AlreadyPaired(VisualHandle),

    /// Malformed tuning payload from the debug panel.
    #[error("invalid tuning payload: {0}")]
    Tuning(#[from] serde_json::Error),
}
