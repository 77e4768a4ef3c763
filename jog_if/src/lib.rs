//! # Jogging Interface Library
//!
//! This crate defines the messages exchanged between the jogging calculation
//! core and the producers which feed it: joint telemetry, teleoperation jog
//! commands, and the outgoing joint trajectory setpoints.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod jog;
pub mod joint_state;
pub mod traj;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use jog::*;
pub use joint_state::*;
pub use traj::*;
