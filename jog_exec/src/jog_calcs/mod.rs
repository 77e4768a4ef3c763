//! Jogging calculation module
//!
//! The heart of the arm jogging software: a periodic loop which converts
//! streaming teleoperation commands, either a 6-DOF spatial velocity or a
//! per-joint velocity vector, into joint trajectory setpoints for a
//! servo-level follower. The loop performs inverse differential kinematics
//! through an SVD pseudo-inverse, slows down near kinematic singularities
//! and obstacles, enforces joint bounds, low-pass filters positions, and
//! degrades to a sudden halt when commands go stale or hit a safety
//! envelope.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod calc_cartesian;
mod calc_joint;
mod filter;
mod limits;
mod params;
mod singularity;
mod state;

#[cfg(test)]
pub(crate) mod test_utils;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use filter::LowPassFilter;
pub use params::Params;
pub use state::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// The number of Cartesian dimensions in a spatial jog command: three
/// linear, three angular.
pub const NUM_CARTESIAN_DIMS: usize = 6;

/// Combined collision/singularity velocity scale below which the arm is
/// considered stuck and a sudden halt is synthesised.
const STUCK_VELOCITY_SCALE: f64 = 0.1;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur when constructing the JogCalcs module.
#[derive(Debug, thiserror::Error)]
pub enum JogCalcsError {
    #[error("Could not load parameters: {0}")]
    ParamLoadError(util::params::LoadError),
}
