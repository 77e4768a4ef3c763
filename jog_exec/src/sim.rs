//! Stand-in producers for the jogging loop
//!
//! The jogging core only ever meets its producers at the shared state, so
//! the executable can demonstrate the whole loop without an external
//! transport: a scripted command source plays the teleoperator, a
//! staleness watchdog plays the command collector, and a perfect-tracking
//! echo of the published setpoints plays the servo layer.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use chrono::Utc;
use log::info;
use nalgebra::Vector3;
use std::thread;
use std::time::{Duration, Instant};

// Internal
use crate::jog_calcs::Params;
use crate::script::{JogScript, PendingCmds};
use crate::shared::{JogControl, SharedHandle};
use jog_if::{JointJogCmd, JointStateMsg, SpatialJogCmd};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// How long to keep producing after the last scripted command and its
/// staleness window have passed, so the loop's halt behaviour is visible.
const END_OF_SCRIPT_GRACE_S: f64 = 0.5;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Run the stand-in producers until the script has played out or a stop is
/// requested. Blocks the calling thread.
pub fn run_producers(
    shared: &SharedHandle,
    control: &JogControl,
    mut script: JogScript,
    params: &Params,
    joint_names: Vec<String>,
    initial_positions_rad: Vec<f64>,
) {
    let num_joints = joint_names.len();

    // Seed telemetry with the arm's starting pose
    {
        let mut s = shared.lock();
        s.joints = JointStateMsg {
            names: joint_names.clone(),
            positions_rad: initial_positions_rad,
            velocities_rads: vec![0.0; num_joints],
            efforts: vec![0.0; num_joints],
        };
    }

    let epoch = Instant::now();
    let period = Duration::from_secs_f64(params.publish_period_s);
    let mut last_cmd_instant: Option<Instant> = None;

    loop {
        if control.stop_requested() {
            break;
        }

        // Issue any scripted commands which have come due
        match script.get_pending(epoch.elapsed().as_secs_f64()) {
            PendingCmds::Some(entries) => {
                let mut s = shared.lock();

                for entry in entries {
                    if let Some(spatial) = entry.spatial {
                        s.spatial_cmd = SpatialJogCmd {
                            frame_id: spatial.frame_id,
                            stamp: Utc::now(),
                            linear_ms: Vector3::from(spatial.linear_ms),
                            angular_rads: Vector3::from(spatial.angular_rads),
                        };
                        s.zero_spatial_cmd_flag = s.spatial_cmd.is_zero();
                        info!("Sim: issued spatial jog command at {:.02} s", entry.time_s);
                    }

                    if let Some(joint) = entry.joint {
                        s.joint_cmd = JointJogCmd {
                            stamp: Utc::now(),
                            joint_names: joint.joint_names,
                            velocities: joint.velocities,
                        };
                        s.zero_joint_cmd_flag = s.joint_cmd.is_zero();
                        info!("Sim: issued joint jog command at {:.02} s", entry.time_s);
                    }

                    s.command_is_stale = false;
                }

                last_cmd_instant = Some(Instant::now());
            }
            PendingCmds::None => (),
            PendingCmds::EndOfScript => {
                // Give the loop time to show its staleness halt before
                // shutting down
                let end_s = script.duration_s() + script.stale_after_s + END_OF_SCRIPT_GRACE_S;
                if epoch.elapsed().as_secs_f64() > end_s {
                    info!("Sim: end of jog script reached, stopping");
                    control.request_stop();
                    break;
                }
            }
        }

        // Staleness watchdog
        if let Some(instant) = last_cmd_instant {
            if instant.elapsed().as_secs_f64() > script.stale_after_s {
                shared.lock().command_is_stale = true;
            }
        }

        // Perfect-tracking servo stand-in: echo the published setpoint back
        // as joint telemetry
        let echo = {
            let s = shared.lock();
            if s.ok_to_publish {
                s.outgoing_command
                    .points
                    .first()
                    .map(|p| p.positions_rad.clone())
            } else {
                None
            }
        };

        if let Some(positions) = echo {
            if positions.len() == num_joints {
                let mut s = shared.lock();
                s.joints.names = joint_names.clone();
                s.joints.positions_rad = positions;
            }
        }

        thread::sleep(period);
    }
}
