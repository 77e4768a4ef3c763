//! Shared fixtures for the jog_calcs unit tests

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::{DMatrix, DVector, Isometry3};

// Internal
use super::Params;
use crate::model::{JointBounds, KinematicModel, ModelError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A synthetic kinematic model with a fixed Jacobian, identity link
/// transforms and settable bounds.
pub(crate) struct MockModel {
    pub names: Vec<String>,
    pub positions: DVector<f64>,
    pub jacobian: DMatrix<f64>,
    pub bounds: Vec<Option<JointBounds>>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl MockModel {
    /// A model whose Jacobian is the 6xN identity.
    pub fn identity(num_joints: usize) -> Self {
        Self {
            names: joint_names(num_joints),
            positions: DVector::zeros(num_joints),
            jacobian: DMatrix::identity(6, num_joints),
            bounds: vec![None; num_joints],
        }
    }
}

impl KinematicModel for MockModel {
    fn variable_names(&self) -> &[String] {
        &self.names
    }

    fn joint_positions(&self) -> DVector<f64> {
        self.positions.clone()
    }

    fn set_joint_positions(&mut self, positions_rad: &DVector<f64>) -> Result<(), ModelError> {
        if positions_rad.len() != self.names.len() {
            return Err(ModelError::WrongJointCount {
                expected: self.names.len(),
                actual: positions_rad.len(),
            });
        }

        self.positions.copy_from(positions_rad);
        Ok(())
    }

    fn jacobian(&self) -> DMatrix<f64> {
        self.jacobian.clone()
    }

    fn link_transform(&self, _link_name: &str) -> Result<Isometry3<f64>, ModelError> {
        Ok(Isometry3::identity())
    }

    fn joint_bounds(&self) -> &[Option<JointBounds>] {
        &self.bounds
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Canonical test joint names: joint_0 .. joint_{n-1}.
pub(crate) fn joint_names(num_joints: usize) -> Vec<String> {
    (0..num_joints).map(|i| format!("joint_{}", i)).collect()
}

/// A parameter set for tests: unitless commands, 100 Hz, no filtering.
pub(crate) fn test_params() -> Params {
    Params {
        move_group_name: "arm".into(),
        planning_frame: "base".into(),
        robot_link_command_frame: "tool".into(),
        joint_topic: "joint_states".into(),
        warning_topic: "jog_warning".into(),
        publish_period_s: 0.01,
        low_pass_filter_coeff: 1.0,
        command_in_type: "unitless".into(),
        linear_scale: 0.5,
        rotational_scale: 0.5,
        joint_scale: 0.5,
        lower_singularity_threshold: 30.0,
        hard_stop_singularity_threshold: 45.0,
        joint_limit_margin_rad: 0.1,
        num_outgoing_halt_msgs_to_publish: 4,
        publish_joint_positions: true,
        publish_joint_velocities: true,
        publish_joint_accelerations: false,
        use_gazebo: false,
        gazebo_redundant_message_count: 30,
    }
}
