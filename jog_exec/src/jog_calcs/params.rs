//! Parameters structure for JogCalcs

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the jogging calculation loop.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    // ---- KINEMATIC IDENTIFIERS ----
    /// The name of the jogged move group.
    pub move_group_name: String,

    /// The frame all calculations and outgoing trajectories are expressed
    /// in.
    pub planning_frame: String,

    /// The robot link whose frame incoming spatial commands may be
    /// expressed in.
    pub robot_link_command_frame: String,

    // ---- TRANSPORT ENDPOINTS ----
    /// Topic joint telemetry arrives on. Retained for operators wiring an
    /// external transport to the shared state.
    pub joint_topic: String,

    /// Topic safety warnings are published on. Retained for operators
    /// wiring an external transport to the shared state.
    pub warning_topic: String,

    // ---- LOOP TIMING ----
    /// Period of one calculation cycle, which is also the time from start
    /// of each outgoing trajectory point.
    ///
    /// Units: seconds
    pub publish_period_s: f64,

    /// Coefficient of the per-joint position low-pass filters, in (0, 1].
    /// 1 disables filtering.
    pub low_pass_filter_coeff: f64,

    // ---- COMMAND SCALING ----
    /// How incoming commands are interpreted: "unitless" commands are in
    /// [-1, +1] and scaled by the *_scale parameters, "speed_units"
    /// commands are in m/s and rad/s.
    pub command_in_type: String,

    /// Max linear velocity demanded by a unitless command component of 1.
    ///
    /// Units: meters/second
    pub linear_scale: f64,

    /// Max rotational velocity demanded by a unitless command component
    /// of 1.
    ///
    /// Units: radians/second
    pub rotational_scale: f64,

    /// Max joint velocity demanded by a unitless joint command component
    /// of 1.
    ///
    /// Units: radians/second
    pub joint_scale: f64,

    // ---- SAFETY ENVELOPES ----
    /// Jacobian condition number above which velocities start ramping
    /// down when moving toward a singularity.
    pub lower_singularity_threshold: f64,

    /// Jacobian condition number at which motion toward a singularity is
    /// halted outright.
    pub hard_stop_singularity_threshold: f64,

    /// Margin subtracted from each joint's position bounds when deciding
    /// whether to halt.
    ///
    /// Units: radians
    pub joint_limit_margin_rad: f64,

    // ---- PUBLICATION POLICY ----
    /// How many halt messages to keep publishing once all commands are
    /// zero. 0 means keep publishing forever.
    pub num_outgoing_halt_msgs_to_publish: i32,

    /// Populate positions in outgoing trajectory points.
    pub publish_joint_positions: bool,

    /// Populate velocities in outgoing trajectory points.
    pub publish_joint_velocities: bool,

    /// Populate (all-zero) accelerations in outgoing trajectory points,
    /// for controllers which reject empty acceleration arrays.
    pub publish_joint_accelerations: bool,

    // ---- GAZEBO WORKAROUND ----
    /// Duplicate each outgoing point for simulated robots whose clients
    /// discard points with timestamps already in the past.
    pub use_gazebo: bool,

    /// Total number of points per outgoing trajectory when `use_gazebo` is
    /// set.
    pub gazebo_redundant_message_count: i32,
}
