//! # Arm Jogging Library
//!
//! This library contains the jogging calculation core and its supporting
//! modules:
//!
//! - `jog_calcs`: the periodic calculation loop turning teleoperation
//!   commands into joint trajectory setpoints
//! - `model`: the kinematic model capability trait and a serial-chain
//!   implementation of it
//! - `shared`: the shared-state rendezvous between the calculation loop and
//!   the command/telemetry producers
//! - `script`: timed jog command scripts
//! - `sim`: a stand-in producer loop used by the executable to demonstrate
//!   the core without an external transport

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod jog_calcs;
pub mod model;
pub mod script;
pub mod shared;
pub mod sim;
