//! Joint-space jogging calculations
//!
//! The simpler of the two command paths: per-joint velocity demands map
//! straight onto joint deltas, no Jacobian required.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{error, warn};
use nalgebra::DVector;

// Internal
use super::state::JogCalcs;
use crate::shared::SharedHandle;
use jog_if::JointJogCmd;

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl JogCalcs {
    /// Perform the joint jogging calculations for one cycle.
    ///
    /// Returns false if the command is invalid and the cycle must be
    /// skipped without publishing.
    pub(super) fn joint_jog_calcs(&mut self, cmd: JointJogCmd, shared: &SharedHandle) -> bool {
        // Reject commands containing NaN or out-of-range velocities
        for velocity in &cmd.velocities {
            if velocity.is_nan() || velocity.abs() > 1.0 {
                if self.cmd_warn_throttle.ready() {
                    warn!("NaN or out-of-range value in incoming joint jog command, skipping this datapoint");
                }
                return false;
            }
        }

        self.delta_theta = self.scale_joint_cmd(&cmd);

        self.sync_model_positions();

        self.convert_deltas_to_outgoing_cmd(shared)
    }

    /// Scale the incoming joint command into per-cycle joint deltas.
    ///
    /// Joints not named by the command get a zero delta; names not in the
    /// move group are ignored.
    pub(super) fn scale_joint_cmd(&mut self, cmd: &JointJogCmd) -> DVector<f64> {
        let period = self.params.publish_period_s;
        let mut result = DVector::zeros(self.num_joints);

        for (m, name) in cmd.joint_names.iter().enumerate() {
            let c = match self.joint_index.get(name) {
                Some(c) => *c,
                None => {
                    if self.joint_warn_throttle.ready() {
                        warn!("Ignoring joint {}", name);
                    }
                    continue;
                }
            };

            let velocity = match cmd.velocities.get(m) {
                Some(v) => *v,
                None => continue,
            };

            result[c] = match self.params.command_in_type.as_str() {
                // Unitless inputs in [-1, +1] take the user-defined scaling
                "unitless" => velocity * self.params.joint_scale * period,
                // Otherwise commands are in rad/s
                "speed_units" => velocity * period,
                other => {
                    error!(
                        "Unexpected command_in_type {:?}, treating the command as speed units",
                        other
                    );
                    velocity * period
                }
            };
        }

        result
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::super::test_utils::{test_params, MockModel};
    use super::super::JogCalcs;
    use super::*;
    use crate::shared::SharedHandle;
    use chrono::Utc;

    const EPS: f64 = 1e-9;

    fn test_cmd(names: Vec<&str>, velocities: Vec<f64>) -> JointJogCmd {
        JointJogCmd {
            stamp: Utc::now(),
            joint_names: names.into_iter().map(String::from).collect(),
            velocities,
        }
    }

    #[test]
    fn test_scale_joint_cmd() {
        let mut calcs = JogCalcs::new(test_params(), Box::new(MockModel::identity(6)));

        let delta = calcs.scale_joint_cmd(&test_cmd(vec!["joint_1", "joint_4"], vec![1.0, -0.5]));

        // v * joint_scale * period under unitless scaling
        assert!((delta[1] - 0.005).abs() < EPS);
        assert!((delta[4] + 0.0025).abs() < EPS);
        assert!(delta[0].abs() < EPS);
    }

    #[test]
    fn test_unknown_joint_is_ignored() {
        let mut calcs = JogCalcs::new(test_params(), Box::new(MockModel::identity(6)));

        let delta = calcs.scale_joint_cmd(&test_cmd(vec!["bogus", "joint_0"], vec![1.0, 1.0]));

        assert!((delta[0] - 0.005).abs() < EPS);
        assert_eq!(delta.iter().filter(|d| d.abs() > EPS).count(), 1);
    }

    #[test]
    fn test_nan_velocity_rejected() {
        let mut calcs = JogCalcs::new(test_params(), Box::new(MockModel::identity(6)));
        let shared = SharedHandle::new();

        let cmd = test_cmd(vec!["joint_0"], vec![f64::NAN]);
        assert!(!calcs.joint_jog_calcs(cmd, &shared));
    }

    #[test]
    fn test_over_range_velocity_rejected() {
        let mut calcs = JogCalcs::new(test_params(), Box::new(MockModel::identity(6)));
        let shared = SharedHandle::new();

        let cmd = test_cmd(vec!["joint_0"], vec![1.5]);
        assert!(!calcs.joint_jog_calcs(cmd, &shared));
    }
}
