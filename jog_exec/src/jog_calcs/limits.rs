//! Joint bound enforcement
//!
//! After deltas are applied and filtered, the outgoing setpoint is checked
//! against the model's per-joint bounds. Velocity violations are clamped in
//! place; position violations inside the configured margin, with the joint
//! still moving toward the bound, halt the arm for the cycle.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::warn;

// Internal
use super::state::JogCalcs;
use util::maths;

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl JogCalcs {
    /// Enforce velocity and position bounds on the staged outgoing
    /// trajectory.
    ///
    /// Returns false if the arm must halt this cycle. Joints without
    /// defined bounds are skipped.
    pub(super) fn enforce_joint_bounds(&mut self) -> bool {
        let mut halting = false;

        if self.outgoing_command.points.is_empty() {
            // An empty trajectory is still within bounds
            if self.limit_warn_throttle.ready() {
                warn!("Empty trajectory passed into joint bound enforcement");
            }
            return true;
        }

        let bounds = self.model.joint_bounds().to_vec();
        let margin = self.params.joint_limit_margin_rad;

        for c in 0..self.num_joints {
            let bound = match bounds.get(c) {
                Some(Some(b)) => *b,
                _ => continue,
            };

            // Clamp velocities to their bound and write the clamped value
            // into the outgoing trajectory
            let velocity = self.joint_state.velocities_rads[c];
            if velocity.abs() > bound.max_velocity_rads {
                if self.limit_warn_throttle.ready() {
                    warn!(
                        "Joint {} close to a velocity limit, enforcing limit",
                        self.joint_state.names[c]
                    );
                }

                let clamped = maths::clamp(
                    &velocity,
                    &-bound.max_velocity_rads,
                    &bound.max_velocity_rads,
                );
                self.joint_state.velocities_rads[c] = clamped;

                let point = &mut self.outgoing_command.points[0];
                if point.velocities_rads.len() > c + 1 {
                    point.velocities_rads[c] = clamped;
                }
            }

            // Halt if past a position margin and the joint is moving even
            // farther past. The angle checked against the margin is the
            // original telemetry value, before this cycle's delta.
            let velocity = self.joint_state.velocities_rads[c];
            let new_position = self.joint_state.positions_rad[c];
            let original_angle = self.original_joint_state.positions_rad[c];

            let outside_margin = new_position < bound.min_position_rad + margin
                || new_position > bound.max_position_rad - margin;

            if outside_margin
                && ((velocity < 0.0 && original_angle < bound.min_position_rad + margin)
                    || (velocity > 0.0 && original_angle > bound.max_position_rad - margin))
            {
                if self.limit_warn_throttle.ready() {
                    warn!(
                        "Joint {} close to a position limit, halting",
                        self.joint_state.names[c]
                    );
                }
                halting = true;
            }
        }

        !halting
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
