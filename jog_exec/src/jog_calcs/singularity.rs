//! Singularity-proximity velocity scaling
//!
//! The Jacobian's condition number grows without bound as the arm
//! approaches a kinematic singularity, and the pseudo-inverse solution
//! blows up with it. Rather than damping the inverse, the jog loop slows
//! commanded motion down as the condition number climbs, and only when the
//! motion actually points toward the singularity.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{error, warn};
use nalgebra::{DMatrix, DVector, Dyn, SVD};

// Internal
use super::calc_cartesian::prune_drift_dimensions;
use super::state::JogCalcs;
use util::maths;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Divisor applied to the singular vector when forming the look-ahead
/// probe step.
const LOOKAHEAD_PROBE_SCALE: f64 = 100.0;

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl JogCalcs {
    /// Compute a velocity scaling factor in [0, 1] from the proximity of
    /// the nearest singularity and the direction of the commanded motion.
    ///
    /// The last column of U from the Jacobian's SVD points directly toward
    /// or away from the nearest singularity, but its sign is arbitrary and
    /// tends to flip between decompositions (R. Bro, "Resolving the Sign
    /// Ambiguity in the Singular Value Decomposition"). The sign is
    /// resolved by probing a small step along the vector and checking
    /// whether the condition number grows. The probe never commits: the
    /// kinematic state is restored before returning.
    pub(super) fn velocity_scaling_factor_for_singularity(
        &mut self,
        commanded_velocity: &DVector<f64>,
        svd: &SVD<f64, Dyn, Dyn>,
        jacobian: &DMatrix<f64>,
        pseudo_inverse: &DMatrix<f64>,
    ) -> f64 {
        let mut velocity_scale = 1.0;
        let num_dimensions = jacobian.nrows();

        let u = match &svd.u {
            Some(u) => u,
            None => return velocity_scale,
        };

        let mut vector_toward_singularity: DVector<f64> =
            u.column(num_dimensions - 1).into_owned();

        let singular_values = &svd.singular_values;
        let ini_condition = singular_values[0] / singular_values[singular_values.len() - 1];

        // Look ahead along the singular vector: a small Cartesian step,
        // mapped through the pseudo-inverse into a joint-space probe
        let probe_delta_x = &vector_toward_singularity / LOOKAHEAD_PROBE_SCALE;
        let theta = self.model.joint_positions();
        let probe_theta = &theta + pseudo_inverse * probe_delta_x;

        let new_condition = match self.model.set_joint_positions(&probe_theta) {
            Ok(()) => {
                let probe_jacobian = self.model.jacobian();
                let probe_rows = probe_jacobian.nrows();

                // Prune the same drift dimensions so the two condition
                // numbers describe the same matrix shape
                let (probe_jacobian, _) = prune_drift_dimensions(
                    probe_jacobian,
                    DVector::zeros(probe_rows),
                    &self.drift_dimensions,
                );

                let probe_singular_values = probe_jacobian.svd(false, false).singular_values;
                probe_singular_values[0] / probe_singular_values[probe_singular_values.len() - 1]
            }
            Err(e) => {
                error!("Could not probe the kinematic model: {}", e);
                ini_condition
            }
        };

        // The probe must not commit to kinematic state
        if let Err(e) = self.model.set_joint_positions(&theta) {
            error!("Could not restore the kinematic model after probing: {}", e);
        }

        // If the condition number does not grow along the probe, the
        // vector points away from the singularity: flip it
        if ini_condition >= new_condition {
            vector_toward_singularity *= -1.0;
        }

        // A positive dot product means the command moves toward the
        // singularity, so decelerate
        let dot = vector_toward_singularity.dot(commanded_velocity);
        if dot > 0.0 {
            let lower = self.params.lower_singularity_threshold;
            let hard_stop = self.params.hard_stop_singularity_threshold;

            if ini_condition > lower && ini_condition < hard_stop {
                // Ramp down linearly between the two thresholds
                velocity_scale = 1.0 - maths::lin_map((lower, hard_stop), (0.0, 1.0), ini_condition);
            } else if ini_condition >= hard_stop {
                velocity_scale = 0.0;
                if self.singularity_warn_throttle.ready() {
                    warn!("Close to a singularity, halting");
                }
            }
        }

        velocity_scale
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
    use crate::jog_calcs::calc_cartesian::pseudo_inverse_from_svd;

    const EPS: f64 = 1e-9;

    /// Scaling factors for a command along +/- the last singular direction
    /// of a diagonal Jacobian with the given entries.
    ///
    /// With a mock model the Jacobian is constant, so the look-ahead never
    /// sees the condition number grow and always flips the singular
    /// vector; which of the two directions counts as "toward" is therefore
    /// an implementation detail of the decomposition's sign choice. The
    /// caller gets both factors and sorts out toward/away itself.
    fn scales_for_diagonal(diagonal: &[f64; 6]) -> (f64, f64) {
        let jacobian = DMatrix::from_diagonal(&DVector::from_row_slice(diagonal));

        let mut model = MockModel::identity(6);
        model.jacobian = jacobian.clone();
        let mut calcs = JogCalcs::new(test_params(), Box::new(model));

        let svd = jacobian.clone().svd(true, true);
        let pseudo_inverse = pseudo_inverse_from_svd(&svd).unwrap();

        let u_last: DVector<f64> = svd.u.as_ref().unwrap().column(5).into_owned();

        let scale_along = calcs.velocity_scaling_factor_for_singularity(
            &u_last,
            &svd,
            &jacobian,
            &pseudo_inverse,
        );
        let scale_against = calcs.velocity_scaling_factor_for_singularity(
            &(-&u_last),
            &svd,
            &jacobian,
            &pseudo_inverse,
        );

        (scale_along, scale_against)
    }

    fn toward_and_away(scales: (f64, f64)) -> (f64, f64) {
        // The smaller factor belongs to the toward-singularity direction
        (scales.0.min(scales.1), scales.0.max(scales.1))
    }

    #[test]
    fn test_well_conditioned_never_scales() {
        // Condition number 3, well under the lower threshold of 30
        let (along, against) = scales_for_diagonal(&[6.0, 5.5, 5.0, 4.0, 3.0, 2.0]);

        assert_eq!(along, 1.0);
        assert_eq!(against, 1.0);
    }

    #[test]
    fn test_ramp_between_thresholds() {
        // Condition number 36, between thresholds 30 and 45: the ramp
        // gives 1 - (36 - 30) / 15 = 0.6 toward the singularity
        let (toward, away) = toward_and_away(scales_for_diagonal(&[72.0, 10.0, 8.0, 6.0, 4.0, 2.0]));

        assert!((toward - 0.6).abs() < EPS);
        assert_eq!(away, 1.0);
    }

    #[test]
    fn test_ramp_is_monotonic() {
        // Condition numbers 33 and 39: closer to singular scales harder
        let (toward_far, _) = toward_and_away(scales_for_diagonal(&[66.0, 10.0, 8.0, 6.0, 4.0, 2.0]));
        let (toward_near, _) =
            toward_and_away(scales_for_diagonal(&[78.0, 10.0, 8.0, 6.0, 4.0, 2.0]));

        assert!((toward_far - 0.8).abs() < EPS);
        assert!((toward_near - 0.4).abs() < EPS);
        assert!(toward_near < toward_far);
    }

    #[test]
    fn test_hard_stop_at_threshold() {
        // Condition number exactly at the hard stop of 45: motion toward
        // the singularity halts outright
        let (toward, away) = toward_and_away(scales_for_diagonal(&[90.0, 10.0, 8.0, 6.0, 4.0, 2.0]));

        assert_eq!(toward, 0.0);
        assert_eq!(away, 1.0);
    }

    #[test]
    fn test_probe_does_not_commit_kinematic_state() {
        let jacobian = DMatrix::from_diagonal(&DVector::from_row_slice(&[
            72.0, 10.0, 8.0, 6.0, 4.0, 2.0,
        ]));

        let mut model = MockModel::identity(6);
        model.jacobian = jacobian.clone();
        let mut calcs = JogCalcs::new(test_params(), Box::new(model));

        let before = calcs.model.joint_positions();

        let svd = jacobian.clone().svd(true, true);
        let pseudo_inverse = pseudo_inverse_from_svd(&svd).unwrap();
        let command = DVector::from_element(6, 0.1);

        calcs.velocity_scaling_factor_for_singularity(&command, &svd, &jacobian, &pseudo_inverse);

        assert_eq!(calcs.model.joint_positions(), before);
    }
}
