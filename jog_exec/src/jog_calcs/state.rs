//! Implementations for the JogCalcs state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use chrono::Utc;
use log::{error, info, warn};
use nalgebra::{DVector, Isometry3};
use serde::Serialize;
use std::collections::HashMap;
use std::thread;
use std::time::{Duration, Instant};

// Internal
use super::{JogCalcsError, LowPassFilter, Params};
use crate::model::KinematicModel;
use crate::shared::{JogControl, SharedHandle};
use jog_if::{JointStateMsg, JointTrajectory, JointTrajectoryPoint};
use util::logger::Throttle;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// How long to sleep between polls while waiting for adequate telemetry.
const DEFAULT_SLEEP_PERIOD_S: f64 = 0.001;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Jogging calculation module state.
pub struct JogCalcs {
    pub(crate) params: Params,

    /// The kinematic model of the jogged arm. Owned by the loop; producers
    /// never touch it.
    pub(crate) model: Box<dyn KinematicModel>,

    pub(crate) mode: JogMode,

    /// The working joint state: telemetry positions with command deltas and
    /// filtering applied.
    pub(crate) joint_state: JointStateMsg,

    /// Snapshot of the joint state as last reported by telemetry, before
    /// any deltas. Sudden halts revert to these positions.
    pub(crate) original_joint_state: JointStateMsg,

    /// Map from joint name to index in the canonical move-group order.
    pub(crate) joint_index: HashMap<String, usize>,

    /// One position filter per joint.
    pub(crate) position_filters: Vec<LowPassFilter>,

    /// The joint-space increment computed this cycle.
    pub(crate) delta_theta: DVector<f64>,

    /// The outgoing trajectory staged this cycle.
    pub(crate) outgoing_command: JointTrajectory,

    /// Cached planning frame to command frame transform.
    pub(crate) tf_planning_to_cmd: Isometry3<f64>,

    /// Snapshot of the drift mask for the cycle being calculated.
    pub(crate) drift_dimensions: [bool; 6],

    /// Number of consecutive cycles with all-zero commands. Saturates
    /// rather than wrapping.
    pub(crate) zero_velocity_count: i32,

    /// True if a safety scaling or bound enforcement tripped this cycle.
    pub(crate) has_warning: bool,

    pub(crate) report: CycleReport,

    pub(crate) num_joints: usize,

    // Warning gates, one per recurring message
    pub(crate) cmd_warn_throttle: Throttle,
    pub(crate) joint_warn_throttle: Throttle,
    pub(crate) singularity_warn_throttle: Throttle,
    pub(crate) limit_warn_throttle: Throttle,
    pub(crate) frame_warn_throttle: Throttle,
}

/// Status report for one calculation cycle.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct CycleReport {
    /// True if an outgoing trajectory was offered for publication.
    pub published: bool,

    /// True if a sudden halt was synthesised.
    pub sudden_halt: bool,

    /// True if safety scaling or bound enforcement tripped.
    pub warning: bool,

    /// True if the cycle was skipped because of an invalid command.
    pub cycle_skipped: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The phases of the calculation loop. Each mode is handled by a `mode_xyz`
/// function.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub enum JogMode {
    /// Waiting for the first consistent joint telemetry.
    WaitingForTelemetry,

    /// Telemetry received, waiting for the first stamped jog command.
    WaitingForFirstCommand,

    /// Calculating and publishing setpoints every period.
    Running,

    /// Stop requested. Terminal.
    Stopped,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl JogCalcs {
    /// Initialise the JogCalcs module.
    ///
    /// Expected init data is the path to the parameter file and the
    /// kinematic model to jog.
    pub fn init(
        params_path: &str,
        model: Box<dyn KinematicModel>,
    ) -> Result<Self, JogCalcsError> {
        let params = util::params::load(params_path).map_err(JogCalcsError::ParamLoadError)?;

        Ok(Self::new(params, model))
    }

    /// The loop's parameters.
    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn new(params: Params, model: Box<dyn KinematicModel>) -> Self {
        let names = model.variable_names().to_vec();
        let num_joints = names.len();

        // A map for the indices of incoming joint telemetry and commands
        let mut joint_index = HashMap::new();
        for (i, name) in names.iter().enumerate() {
            joint_index.insert(name.clone(), i);
        }

        // One position filter per joint
        let mut position_filters = Vec::with_capacity(num_joints);
        for _ in 0..num_joints {
            position_filters.push(LowPassFilter::new(params.low_pass_filter_coeff));
        }

        let joint_state = JointStateMsg::zeroed(names);

        Self {
            original_joint_state: joint_state.clone(),
            joint_state,
            joint_index,
            position_filters,
            delta_theta: DVector::zeros(num_joints),
            outgoing_command: JointTrajectory::default(),
            tf_planning_to_cmd: Isometry3::identity(),
            drift_dimensions: [false; 6],
            zero_velocity_count: 0,
            has_warning: false,
            mode: JogMode::WaitingForTelemetry,
            report: CycleReport::default(),
            num_joints,
            cmd_warn_throttle: Throttle::new(2.0),
            joint_warn_throttle: Throttle::new(5.0),
            singularity_warn_throttle: Throttle::new(2.0),
            limit_warn_throttle: Throttle::new(2.0),
            frame_warn_throttle: Throttle::new(2.0),
            params,
            model,
        }
    }

    /// Run the calculation loop until a stop is requested.
    ///
    /// This function blocks and is intended to run on its own thread. The
    /// loop owns all of its internal state; `shared` is the only medium
    /// between it and the command/telemetry producers.
    pub fn main_loop(&mut self, shared: &SharedHandle, control: &JogControl) {
        info!("JogCalcs: waiting for first joint telemetry");

        loop {
            if control.stop_requested() {
                self.mode = JogMode::Stopped;
            }

            match self.mode {
                JogMode::WaitingForTelemetry => self.mode_waiting_for_telemetry(shared, control),
                JogMode::WaitingForFirstCommand => self.mode_waiting_for_first_command(shared),
                JogMode::Running => self.mode_running(shared, control),
                JogMode::Stopped => break,
            }
        }

        info!("JogCalcs: main loop stopped");
    }

    /// Mode waiting for telemetry.
    ///
    /// Poll until the first consistent joint telemetry arrives, then seed
    /// the filters from it.
    fn mode_waiting_for_telemetry(&mut self, shared: &SharedHandle, control: &JogControl) {
        if self.update_joints(shared) {
            self.reset_filters_to_positions();
            control.set_initialized();

            self.mode = JogMode::WaitingForFirstCommand;
            info!("JogCalcs: initialised, waiting for first jog command");
        } else {
            thread::sleep(Duration::from_secs_f64(DEFAULT_SLEEP_PERIOD_S));
        }
    }

    /// Mode waiting for the first command.
    ///
    /// Keep the filter bank and the published command-frame transform fresh
    /// so the first running cycle starts from current reality.
    fn mode_waiting_for_first_command(&mut self, shared: &SharedHandle) {
        thread::sleep(Duration::from_secs_f64(DEFAULT_SLEEP_PERIOD_S));

        self.update_joints(shared);
        self.reset_filters_to_positions();
        self.sync_model_positions();
        self.refresh_command_frame_transform(shared);

        let (spatial_stamped, joint_stamped) = {
            let s = shared.lock();
            (s.spatial_cmd.has_stamp(), s.joint_cmd.has_stamp())
        };

        if spatial_stamped || joint_stamped {
            self.mode = JogMode::Running;
            info!("JogCalcs: first jog command received, running");
        }
    }

    /// Mode running: one calculation cycle, then sleep out the period.
    fn mode_running(&mut self, shared: &SharedHandle, control: &JogControl) {
        let cycle_start = Instant::now();

        self.proc_cycle(shared, control);

        if self.mode == JogMode::Stopped {
            return;
        }

        let cycle_dur = Instant::now() - cycle_start;
        match Duration::from_secs_f64(self.params.publish_period_s).checked_sub(cycle_dur) {
            Some(remaining) => thread::sleep(remaining),
            None => warn!(
                "Jog cycle overran by {:.6} s",
                cycle_dur.as_secs_f64() - self.params.publish_period_s
            ),
        }
    }

    /// Perform one calculation cycle.
    pub fn proc_cycle(&mut self, shared: &SharedHandle, control: &JogControl) -> CycleReport {
        self.report = CycleReport::default();

        // Refresh the joints, blocking until telemetry is adequate
        while !self.update_joints(shared) {
            if control.stop_requested() {
                self.mode = JogMode::Stopped;
                return self.report;
            }
            thread::sleep(Duration::from_secs_f64(DEFAULT_SLEEP_PERIOD_S));
        }
        self.sync_model_positions();

        // Refresh the planning to command frame transform so other
        // consumers always see one matching the current joint state
        self.refresh_command_frame_transform(shared);

        // If paused, just keep the filters up to date with the current
        // joints so a jump doesn't occur when restarting
        if control.halt_outgoing() {
            self.reset_filters_to_positions();
            return self.report;
        }

        // Snapshot the command inputs for this cycle
        let (mut zero_spatial, mut zero_joint, stale, spatial_cmd, joint_cmd) = {
            let s = shared.lock();
            self.drift_dimensions = s.drift_dimensions;
            (
                s.zero_spatial_cmd_flag,
                s.zero_joint_cmd_flag,
                s.command_is_stale,
                s.spatial_cmd.clone(),
                s.joint_cmd.clone(),
            )
        };

        // Prioritise spatial jogging over joint jogging
        if !zero_spatial {
            if !self.cartesian_jog_calcs(spatial_cmd, shared) {
                self.skip_cycle();
                return self.report;
            }
        } else if !zero_joint {
            if !self.joint_jog_calcs(joint_cmd, shared) {
                self.skip_cycle();
                return self.report;
            }
        } else {
            // No command: stage a stand-still setpoint at the current state
            self.outgoing_command = self.compose_joint_traj_message(&self.joint_state);
        }

        // Halt if the command went stale or all inputs are zero
        if stale || (zero_spatial && zero_joint) {
            self.sudden_halt();
            self.report.sudden_halt = true;
            zero_spatial = true;
            zero_joint = true;
        }

        let valid_nonzero_command = !zero_spatial || !zero_joint;

        // Offer the newest target joints for publication
        {
            let mut s = shared.lock();

            if valid_nonzero_command {
                s.outgoing_command = self.outgoing_command.clone();
                s.ok_to_publish = true;
            }
            // Stop republishing halts once all inputs have been zero for
            // several cycles. A limit of 0 means republish forever.
            else if self.params.num_outgoing_halt_msgs_to_publish != 0
                && self.zero_velocity_count > self.params.num_outgoing_halt_msgs_to_publish
            {
                s.ok_to_publish = false;
            } else {
                s.outgoing_command = self.outgoing_command.clone();
                s.ok_to_publish = true;
            }

            self.report.published = s.ok_to_publish;
        }

        // Track consecutive all-zero cycles, saturating rather than
        // wrapping
        if zero_spatial && zero_joint {
            self.zero_velocity_count = self.zero_velocity_count.saturating_add(1);
        } else {
            self.zero_velocity_count = 0;
        }

        self.report
    }

    /// Record an invalid-command cycle: nothing is published and the cycle
    /// counts as zero motion.
    fn skip_cycle(&mut self) {
        self.report.cycle_skipped = true;
        self.zero_velocity_count = self.zero_velocity_count.saturating_add(1);
    }

    /// Parse the latest joint telemetry for the joints of our move group.
    ///
    /// Returns false if the telemetry does not yet describe enough joints.
    pub(crate) fn update_joints(&mut self, shared: &SharedHandle) -> bool {
        let incoming = { shared.lock().joints.clone() };

        // Check that the message contains enough joints
        if incoming.names.len() < self.num_joints {
            return false;
        }

        // Store the incoming positions against our canonical ordering
        for (m, name) in incoming.names.iter().enumerate() {
            let c = match self.joint_index.get(name) {
                Some(c) => *c,
                None => {
                    if self.joint_warn_throttle.ready() {
                        warn!("Ignoring joint {}", name);
                    }
                    continue;
                }
            };

            match incoming.positions_rad.get(m) {
                Some(position) => self.joint_state.positions_rad[c] = *position,
                None => continue,
            }
        }

        // Cache the original joints in case they need to be reset
        self.original_joint_state = self.joint_state.clone();

        true
    }

    /// Push the working joint positions into the kinematic model.
    pub(crate) fn sync_model_positions(&mut self) {
        let positions = DVector::from_column_slice(&self.joint_state.positions_rad);

        if let Err(e) = self.model.set_joint_positions(&positions) {
            error!("Could not update the kinematic model joint positions: {}", e);
        }
    }

    /// Recompute the planning frame to command frame transform and publish
    /// it to the shared state.
    ///
    /// We solve (planning -> base -> command frame) by computing
    /// (base -> planning)^-1 * (base -> command frame).
    pub(crate) fn refresh_command_frame_transform(&mut self, shared: &SharedHandle) {
        let planning = self.model.link_transform(&self.params.planning_frame);
        let command = self.model.link_transform(&self.params.robot_link_command_frame);

        match (planning, command) {
            (Ok(planning), Ok(command)) => {
                self.tf_planning_to_cmd = planning.inverse() * command;
                shared.lock().tf_planning_to_cmd = self.tf_planning_to_cmd;
            }
            (Err(e), _) | (_, Err(e)) => {
                if self.frame_warn_throttle.ready() {
                    error!(
                        "Could not compute the planning to command frame transform: {}",
                        e
                    );
                }
            }
        }
    }

    /// Reset every position filter to the current joint state.
    pub(crate) fn reset_filters_to_positions(&mut self) {
        for (filter, position) in self
            .position_filters
            .iter_mut()
            .zip(&self.joint_state.positions_rad)
        {
            filter.reset(*position);
        }
    }

    /// Turn the staged joint deltas into an outgoing trajectory: update and
    /// filter positions, derive velocities, enforce bounds.
    pub(crate) fn convert_deltas_to_outgoing_cmd(&mut self, shared: &SharedHandle) -> bool {
        if !self.add_joint_increments() {
            return false;
        }

        self.low_pass_filter_positions();

        // Velocities are derived after filtering so that bound enforcement
        // sees what will actually be published
        self.calculate_joint_velocities();

        self.outgoing_command = self.compose_joint_traj_message(&self.joint_state);

        if !self.enforce_joint_bounds() {
            self.sudden_halt();
            self.report.sudden_halt = true;
            self.has_warning = true;
        }

        self.publish_warning(shared);
        self.has_warning = false;

        if self.params.use_gazebo {
            self.insert_redundant_points(self.params.gazebo_redundant_message_count);
        }

        true
    }

    /// Add the staged deltas to each joint position.
    fn add_joint_increments(&mut self) -> bool {
        if self.delta_theta.len() != self.joint_state.positions_rad.len() {
            error!("Lengths of joint state and increments do not match, skipping this cycle");
            return false;
        }

        for (i, delta) in self.delta_theta.iter().enumerate() {
            self.joint_state.positions_rad[i] += delta;
        }

        true
    }

    fn low_pass_filter_positions(&mut self) {
        for (i, filter) in self.position_filters.iter_mut().enumerate() {
            self.joint_state.positions_rad[i] = filter.filter(self.joint_state.positions_rad[i]);
        }
    }

    fn calculate_joint_velocities(&mut self) {
        for i in 0..self.delta_theta.len() {
            self.joint_state.velocities_rads[i] = self.delta_theta[i] / self.params.publish_period_s;
        }
    }

    /// Compose an outgoing trajectory with a single point one period from
    /// start, populated according to the publish flags.
    pub(crate) fn compose_joint_traj_message(&self, joint_state: &JointStateMsg) -> JointTrajectory {
        let mut point = JointTrajectoryPoint {
            time_from_start_s: self.params.publish_period_s,
            ..Default::default()
        };

        if self.params.publish_joint_positions {
            point.positions_rad = joint_state.positions_rad.clone();
        }
        if self.params.publish_joint_velocities {
            point.velocities_rads = joint_state.velocities_rads.clone();
        }
        if self.params.publish_joint_accelerations {
            // No robot is known to take acceleration commands, but some
            // controllers check that the field is non-empty
            point.accelerations_radss = vec![0.0; self.num_joints];
        }

        JointTrajectory {
            frame_id: self.params.planning_frame.clone(),
            stamp: Utc::now(),
            joint_names: joint_state.names.clone(),
            points: vec![point],
        }
    }

    /// Suddenly halt for a joint limit or other critical issue.
    ///
    /// Position-controlled robots are reset to the last known good state,
    /// velocity-controlled robots are stopped.
    pub(crate) fn sudden_halt(&mut self) {
        let point = match self.outgoing_command.points.get_mut(0) {
            Some(p) => p,
            None => return,
        };

        for i in 0..self.num_joints {
            if self.params.publish_joint_positions {
                if let Some(position) = point.positions_rad.get_mut(i) {
                    *position = self.original_joint_state.positions_rad[i];
                }
            }

            if self.params.publish_joint_velocities {
                if let Some(velocity) = point.velocities_rads.get_mut(i) {
                    *velocity = 0.0;
                }
            }
        }
    }

    /// Duplicate the first trajectory point for clients which discard
    /// points whose timestamps are already in the past.
    ///
    /// The first point covers one period, so duplicates start at two.
    fn insert_redundant_points(&mut self, count: i32) {
        let point = match self.outgoing_command.points.first() {
            Some(p) => p.clone(),
            None => return,
        };

        for i in 2..=count {
            let mut extra = point.clone();
            extra.time_from_start_s = f64::from(i) * self.params.publish_period_s;
            self.outgoing_command.points.push(extra);
        }
    }

    /// Publish this cycle's safety-warning flag.
    fn publish_warning(&mut self, shared: &SharedHandle) {
        shared.lock().warning = self.has_warning;

        if self.has_warning {
            self.report.warning = true;
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
