//! tire - wheel/ground friction for the raycast vehicle (impulse domain)

pub mod types;
pub mod lateral;
pub mod longitudinal;
pub mod solve;

pub use types::*;
pub use solve::solve_friction;
