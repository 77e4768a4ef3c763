//! # Teleoperation jog commands
//!
//! Two command forms are accepted by the jogging core: a spatial command
//! giving a 6-DOF end-effector velocity, and a joint command giving
//! per-joint velocities. Commands carry a stamp; a command whose stamp is
//! the Unix epoch has never been populated by a producer.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{DateTime, TimeZone, Utc};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A 6-DOF spatial velocity command for the end-effector.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SpatialJogCmd {
    /// The frame the command is expressed in.
    pub frame_id: String,

    /// The time at which the command was issued.
    pub stamp: DateTime<Utc>,

    /// Linear velocity demand.
    ///
    /// Units: meters/second (or unitless in [-1, +1], depending on the
    ///        configured command input type)
    pub linear_ms: Vector3<f64>,

    /// Angular velocity demand.
    ///
    /// Units: radians/second (or unitless in [-1, +1])
    pub angular_rads: Vector3<f64>,
}

/// A per-joint velocity command.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JointJogCmd {
    /// The time at which the command was issued.
    pub stamp: DateTime<Utc>,

    /// The joints being commanded. Aligned with `velocities`.
    pub joint_names: Vec<String>,

    /// Velocity demand for each named joint.
    ///
    /// Units: radians/second (or unitless in [-1, +1])
    pub velocities: Vec<f64>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SpatialJogCmd {
    /// True if the command has been stamped by a producer.
    pub fn has_stamp(&self) -> bool {
        self.stamp != epoch()
    }

    /// True if any of the six velocity components is NaN.
    pub fn has_nan(&self) -> bool {
        self.linear_ms.iter().any(|v| v.is_nan()) || self.angular_rads.iter().any(|v| v.is_nan())
    }

    /// The largest absolute value over the six velocity components.
    pub fn max_abs_component(&self) -> f64 {
        self.linear_ms
            .iter()
            .chain(self.angular_rads.iter())
            .fold(0.0, |max, v| v.abs().max(max))
    }

    /// True if all six velocity components are exactly zero.
    pub fn is_zero(&self) -> bool {
        self.linear_ms == Vector3::zeros() && self.angular_rads == Vector3::zeros()
    }
}

impl Default for SpatialJogCmd {
    fn default() -> Self {
        Self {
            frame_id: String::new(),
            stamp: epoch(),
            linear_ms: Vector3::zeros(),
            angular_rads: Vector3::zeros(),
        }
    }
}

impl JointJogCmd {
    /// True if the command has been stamped by a producer.
    pub fn has_stamp(&self) -> bool {
        self.stamp != epoch()
    }

    /// True if all commanded velocities are exactly zero.
    pub fn is_zero(&self) -> bool {
        self.velocities.iter().all(|v| *v == 0.0)
    }
}

impl Default for JointJogCmd {
    fn default() -> Self {
        Self {
            stamp: epoch(),
            joint_names: Vec::new(),
            velocities: Vec::new(),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// The Unix epoch, used as the "never stamped" sentinel.
pub fn epoch() -> DateTime<Utc> {
    match Utc.timestamp_opt(0, 0) {
        chrono::LocalResult::Single(t) => t,
        // Zero is always a valid Unix timestamp
        _ => unreachable!(),
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_stamp_sentinel() {
        let mut cmd = SpatialJogCmd::default();
        assert!(!cmd.has_stamp());

        cmd.stamp = Utc::now();
        assert!(cmd.has_stamp());
    }

    #[test]
    fn test_has_nan() {
        let mut cmd = SpatialJogCmd::default();
        assert!(!cmd.has_nan());

        cmd.angular_rads.y = f64::NAN;
        assert!(cmd.has_nan());
    }

    #[test]
    fn test_max_abs_component() {
        let mut cmd = SpatialJogCmd::default();
        cmd.linear_ms = Vector3::new(0.1, -0.7, 0.2);
        cmd.angular_rads = Vector3::new(0.0, 0.3, -0.5);

        assert_eq!(cmd.max_abs_component(), 0.7);
    }

    #[test]
    fn test_is_zero() {
        let mut cmd = SpatialJogCmd::default();
        assert!(cmd.is_zero());

        cmd.linear_ms.x = 1e-9;
        assert!(!cmd.is_zero());

        let mut joint_cmd = JointJogCmd::default();
        assert!(joint_cmd.is_zero());

        joint_cmd.joint_names.push("a".into());
        joint_cmd.velocities.push(0.5);
        assert!(!joint_cmd.is_zero());
    }
}
