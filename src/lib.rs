pub mod assets;
pub mod camera;
pub mod config;
pub mod controls;
pub mod error;
pub mod frame_loop;
pub mod input;
pub mod materials;
pub mod orientation;
pub mod physics;
pub mod render;
pub mod spawn;
pub mod state;
pub mod suspension_contact;
pub mod tire;
pub mod vehicle;
pub mod watchdog;

pub use error::{AssetError, SimError, VehicleError};
pub use state::{FrameSnapshot, Simulation};
