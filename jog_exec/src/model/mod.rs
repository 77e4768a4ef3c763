//! Kinematic model abstraction
//!
//! The jogging core only needs a small capability set from the robot model:
//! the canonical joint ordering, forward kinematics for named links, the
//! geometric Jacobian, and per-joint bounds. Putting a trait at this seam
//! keeps the solver independent of where the model comes from and lets the
//! tests drive it with synthetic models.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod chain;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::{DMatrix, DVector, Isometry3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Internal
pub use chain::{ChainJointParams, ChainParams, SerialChainModel};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Position and velocity bounds for a single joint.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct JointBounds {
    /// Lowest admissible position.
    ///
    /// Units: radians
    pub min_position_rad: f64,

    /// Highest admissible position.
    ///
    /// Units: radians
    pub max_position_rad: f64,

    /// Largest admissible absolute velocity.
    ///
    /// Units: radians/second
    pub max_velocity_rads: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors raised by a kinematic model.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("The model has no link named {0:?}")]
    UnknownLink(String),

    #[error("Expected {expected} joint positions, got {actual}")]
    WrongJointCount { expected: usize, actual: usize },

    #[error("Joint {0:?} has a zero-length rotation axis")]
    InvalidAxis(String),
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// The capability set the jogging core requires of a robot model.
///
/// A model holds the current joint configuration; kinematic queries are
/// answered at that configuration.
pub trait KinematicModel: Send {
    /// The names of the move-group joints, in canonical order.
    fn variable_names(&self) -> &[String];

    /// The number of move-group joints.
    fn num_joints(&self) -> usize {
        self.variable_names().len()
    }

    /// The current joint configuration.
    fn joint_positions(&self) -> DVector<f64>;

    /// Replace the current joint configuration.
    fn set_joint_positions(&mut self, positions_rad: &DVector<f64>) -> Result<(), ModelError>;

    /// The 6xN geometric Jacobian at the current configuration, expressed in
    /// the model's base frame. Rows are ordered linear (x, y, z) then
    /// angular (x, y, z).
    fn jacobian(&self) -> DMatrix<f64>;

    /// The transform from the base frame to the named link at the current
    /// configuration.
    fn link_transform(&self, link_name: &str) -> Result<Isometry3<f64>, ModelError>;

    /// Per-joint bounds, aligned with `variable_names`. `None` means the
    /// joint has no defined limits and must be skipped by enforcement.
    fn joint_bounds(&self) -> &[Option<JointBounds>];
}
