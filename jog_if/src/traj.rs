//! # Outgoing joint trajectory messages

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::jog::epoch;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A single setpoint within a joint trajectory.
///
/// Which of the vectors are populated depends on the publish flags of the
/// producing module; unpopulated vectors are left empty.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct JointTrajectoryPoint {
    /// Time offset of this point from the start of the trajectory.
    ///
    /// Units: seconds
    pub time_from_start_s: f64,

    /// Joint position setpoints.
    ///
    /// Units: radians
    pub positions_rad: Vec<f64>,

    /// Joint velocity setpoints.
    ///
    /// Units: radians/second
    pub velocities_rads: Vec<f64>,

    /// Joint acceleration setpoints.
    ///
    /// Units: radians/second^2
    pub accelerations_radss: Vec<f64>,
}

/// A joint-space trajectory to be executed by a servo-level follower.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JointTrajectory {
    /// The frame the trajectory is expressed in.
    pub frame_id: String,

    /// The time at which the trajectory was composed.
    pub stamp: DateTime<Utc>,

    /// The joints addressed by each point, in canonical move-group order.
    pub joint_names: Vec<String>,

    /// The setpoints of the trajectory.
    pub points: Vec<JointTrajectoryPoint>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for JointTrajectory {
    fn default() -> Self {
        Self {
            frame_id: String::new(),
            stamp: epoch(),
            joint_names: Vec::new(),
            points: Vec::new(),
        }
    }
}
