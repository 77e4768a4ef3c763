//! Cartesian jogging calculations
//!
//! Converts a validated spatial command into joint deltas through the
//! pseudo-inverse of the move group's Jacobian, with drift dimensions
//! pruned and velocity scaled down near collisions and singularities.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{error, warn};
use nalgebra::{DMatrix, DVector, Dyn, SVD};

// Internal
use super::state::JogCalcs;
use super::{NUM_CARTESIAN_DIMS, STUCK_VELOCITY_SCALE};
use crate::shared::SharedHandle;
use jog_if::SpatialJogCmd;

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl JogCalcs {
    /// Perform the Cartesian jogging calculations for one cycle.
    ///
    /// Returns false if the command is invalid and the cycle must be
    /// skipped without publishing.
    pub(super) fn cartesian_jog_calcs(
        &mut self,
        mut cmd: SpatialJogCmd,
        shared: &SharedHandle,
    ) -> bool {
        // Reject commands containing NaN
        if cmd.has_nan() {
            if self.cmd_warn_throttle.ready() {
                warn!("NaN in incoming jog command, skipping this datapoint");
            }
            return false;
        }

        // Unitless commands must be within [-1, +1]
        if self.params.command_in_type == "unitless" && cmd.max_abs_component() > 1.0 {
            if self.cmd_warn_throttle.ready() {
                warn!("Component of incoming command is > 1, skipping this datapoint");
            }
            return false;
        }

        // Rotate the command into the planning frame. Velocities are free
        // vectors, so the translation of the transform does not apply.
        if cmd.frame_id != self.params.planning_frame {
            let rotation = self.tf_planning_to_cmd.rotation;
            cmd.linear_ms = rotation * cmd.linear_ms;
            cmd.angular_rads = rotation * cmd.angular_rads;
            cmd.frame_id = self.params.planning_frame.clone();
        }

        let delta_x = self.scale_spatial_cmd(&cmd);

        // Convert from Cartesian deltas to joint deltas through the
        // pruned Jacobian's pseudo-inverse
        let jacobian = self.model.jacobian();
        let (jacobian, delta_x) =
            prune_drift_dimensions(jacobian, delta_x, &self.drift_dimensions);

        let svd = jacobian.clone().svd(true, true);
        let pseudo_inverse = match pseudo_inverse_from_svd(&svd) {
            Some(p) => p,
            None => {
                error!("Jacobian SVD did not produce its factors, skipping this cycle");
                return false;
            }
        };

        self.delta_theta = &pseudo_inverse * &delta_x;

        let singularity_scale =
            self.velocity_scaling_factor_for_singularity(&delta_x, &svd, &jacobian, &pseudo_inverse);

        // If close to a collision or a singularity, decelerate
        if !self.apply_velocity_scaling(shared, singularity_scale) {
            self.has_warning = true;
            self.sudden_halt();
        }

        self.convert_deltas_to_outgoing_cmd(shared)
    }

    /// Scale the incoming spatial command into a per-cycle Cartesian delta.
    pub(super) fn scale_spatial_cmd(&self, cmd: &SpatialJogCmd) -> DVector<f64> {
        let period = self.params.publish_period_s;
        let mut result = DVector::zeros(NUM_CARTESIAN_DIMS);

        match self.params.command_in_type.as_str() {
            // Unitless inputs in [-1, +1] take the user-defined scaling
            "unitless" => {
                for i in 0..3 {
                    result[i] = self.params.linear_scale * period * cmd.linear_ms[i];
                    result[i + 3] = self.params.rotational_scale * period * cmd.angular_rads[i];
                }
            }
            // Otherwise commands are in m/s and rad/s
            "speed_units" => {
                for i in 0..3 {
                    result[i] = period * cmd.linear_ms[i];
                    result[i + 3] = period * cmd.angular_rads[i];
                }
            }
            other => {
                error!(
                    "Unexpected command_in_type {:?}, treating the command as speed units",
                    other
                );
                for i in 0..3 {
                    result[i] = period * cmd.linear_ms[i];
                    result[i + 3] = period * cmd.angular_rads[i];
                }
            }
        }

        result
    }

    /// Apply velocity scaling for proximity of collisions and
    /// singularities. The collision scale is read from the shared state.
    ///
    /// Returns false if the combined scale flags the arm as stuck.
    pub(super) fn apply_velocity_scaling(
        &mut self,
        shared: &SharedHandle,
        singularity_scale: f64,
    ) -> bool {
        let collision_scale = { shared.lock().collision_velocity_scale };

        self.delta_theta *= collision_scale * singularity_scale;

        collision_scale * singularity_scale >= STUCK_VELOCITY_SCALE
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Remove the Jacobian rows (and matching command entries) of dimensions
/// marked free to drift, exploiting task redundancy.
///
/// Dimensions are visited from the highest index down so that a removal
/// never disturbs the indices still to be visited. The last remaining row
/// is never removed.
pub(super) fn prune_drift_dimensions(
    mut jacobian: DMatrix<f64>,
    mut delta_x: DVector<f64>,
    drift_dimensions: &[bool; 6],
) -> (DMatrix<f64>, DVector<f64>) {
    for dimension in (0..jacobian.nrows()).rev() {
        if drift_dimensions[dimension] && jacobian.nrows() > 1 {
            jacobian = jacobian.remove_row(dimension);
            delta_x = delta_x.remove_row(dimension);
        }
    }

    (jacobian, delta_x)
}

/// The Moore-Penrose pseudo-inverse `V * S^-1 * U^T` from a thin SVD.
///
/// No damping is applied: robustness near singularities comes from the
/// singularity velocity scaling instead.
pub(super) fn pseudo_inverse_from_svd(svd: &SVD<f64, Dyn, Dyn>) -> Option<DMatrix<f64>> {
    let u = svd.u.as_ref()?;
    let v_t = svd.v_t.as_ref()?;

    let sigma_inverse = DMatrix::from_diagonal(&svd.singular_values.map(|s| 1.0 / s));

    Some(v_t.transpose() * sigma_inverse * u.transpose())
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
