//! # Joint telemetry messages

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The state of a set of joints, as reported by the servo layer.
///
/// The vectors are aligned: entry `i` of each vector refers to `names[i]`.
/// Telemetry may contain a superset of the joints in the jogged move group,
/// in any order.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct JointStateMsg {
    /// The names of the joints in this message.
    pub names: Vec<String>,

    /// Joint positions.
    ///
    /// Units: radians
    pub positions_rad: Vec<f64>,

    /// Joint velocities.
    ///
    /// Units: radians/second
    pub velocities_rads: Vec<f64>,

    /// Joint efforts (torques for revolute joints).
    ///
    /// Units: newton metres
    pub efforts: Vec<f64>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl JointStateMsg {
    /// Build a zeroed state for the given set of joints.
    pub fn zeroed(names: Vec<String>) -> Self {
        let num_joints = names.len();

        Self {
            names,
            positions_rad: vec![0.0; num_joints],
            velocities_rads: vec![0.0; num_joints],
            efforts: vec![0.0; num_joints],
        }
    }

    /// The number of joints described by this message.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// True if the message describes no joints.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_zeroed() {
        let state = JointStateMsg::zeroed(vec!["a".into(), "b".into()]);

        assert_eq!(state.len(), 2);
        assert_eq!(state.positions_rad, vec![0.0, 0.0]);
        assert_eq!(state.velocities_rads, vec![0.0, 0.0]);
        assert_eq!(state.efforts, vec![0.0, 0.0]);
    }
}
