//! End-to-end tests of the jogging loop thread
//!
//! These drive the real loop (telemetry wait, first-command wait, running,
//! staleness halt, stop) over the shared state, against the serial-chain
//! model.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use chrono::Utc;
use nalgebra::Vector3;
use std::thread;
use std::time::{Duration, Instant};

use jog_exec::jog_calcs::{JogCalcs, Params};
use jog_exec::model::{ChainJointParams, ChainParams, KinematicModel, SerialChainModel};
use jog_exec::shared::{JogControl, SharedHandle};
use jog_if::JointStateMsg;

// ---------------------------------------------------------------------------
// HELPERS
// ---------------------------------------------------------------------------

/// An elbow-bent six-revolute arm, well away from singular configurations.
fn home_position() -> Vec<f64> {
    vec![0.0, 0.5, -1.1, 0.6, 1.57, 0.0]
}

fn six_r_model() -> SerialChainModel {
    let joint = |name: &str, child: &str, xyz: [f64; 3], axis: [f64; 3]| ChainJointParams {
        name: name.into(),
        child_link: child.into(),
        origin_xyz_m: xyz,
        origin_rpy_rad: [0.0, 0.0, 0.0],
        axis,
        limits: None,
    };

    let params = ChainParams {
        base_link: "base_link".into(),
        tip_link: "tool0".into(),
        tip_origin_xyz_m: [0.05, 0.0, 0.0],
        tip_origin_rpy_rad: [0.0, 0.0, 0.0],
        home_position_rad: home_position(),
        joints: vec![
            joint("shoulder_pan", "shoulder", [0.0, 0.0, 0.10], [0.0, 0.0, 1.0]),
            joint("shoulder_lift", "upper_arm", [0.0, 0.0, 0.05], [0.0, 1.0, 0.0]),
            joint("elbow", "forearm", [0.35, 0.0, 0.0], [0.0, 1.0, 0.0]),
            joint("wrist_1", "wrist_1_link", [0.30, 0.0, 0.0], [0.0, 1.0, 0.0]),
            joint("wrist_2", "wrist_2_link", [0.08, 0.0, 0.0], [0.0, 0.0, 1.0]),
            joint("wrist_3", "wrist_3_link", [0.0, 0.0, 0.06], [0.0, 1.0, 0.0]),
        ],
    };

    SerialChainModel::from_params(&params).expect("valid chain")
}

fn loop_params() -> Params {
    Params {
        move_group_name: "manipulator".into(),
        planning_frame: "base_link".into(),
        robot_link_command_frame: "tool0".into(),
        joint_topic: "joint_states".into(),
        warning_topic: "jog_arm_warning".into(),
        publish_period_s: 0.005,
        low_pass_filter_coeff: 1.0,
        command_in_type: "unitless".into(),
        linear_scale: 0.5,
        rotational_scale: 0.5,
        joint_scale: 0.5,
        // Far above any condition number this arm reaches, so the test
        // never trips the singularity ramp
        lower_singularity_threshold: 1.0e6,
        hard_stop_singularity_threshold: 2.0e6,
        joint_limit_margin_rad: 0.1,
        num_outgoing_halt_msgs_to_publish: 4,
        publish_joint_positions: true,
        publish_joint_velocities: true,
        publish_joint_accelerations: false,
        use_gazebo: false,
        gazebo_redundant_message_count: 30,
    }
}

fn wait_for<F: Fn() -> bool>(condition: F, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    false
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[test]
fn loop_initialises_runs_and_halts() {
    let model = six_r_model();
    let names = model.variable_names().to_vec();
    let home = home_position();

    let shared = SharedHandle::new();
    let control = JogControl::new();
    let mut calcs = JogCalcs::new(loop_params(), Box::new(model));

    let handle = {
        let shared = shared.clone();
        let control = control.clone();
        thread::spawn(move || calcs.main_loop(&shared, &control))
    };

    // No telemetry yet: the loop must not report itself initialised
    thread::sleep(Duration::from_millis(30));
    assert!(!control.is_initialized());

    // Feed the first telemetry
    {
        let mut s = shared.lock();
        s.joints = JointStateMsg {
            names: names.clone(),
            positions_rad: home.clone(),
            velocities_rads: vec![0.0; 6],
            efforts: vec![0.0; 6],
        };
    }
    assert!(wait_for(|| control.is_initialized(), Duration::from_secs(2)));

    // Still no command: nothing may be offered for publication
    thread::sleep(Duration::from_millis(50));
    assert!(!shared.lock().ok_to_publish);

    // Issue a spatial command in the planning frame
    {
        let mut s = shared.lock();
        s.spatial_cmd.stamp = Utc::now();
        s.spatial_cmd.frame_id = "base_link".into();
        s.spatial_cmd.linear_ms = Vector3::new(1.0, 0.0, 0.0);
        s.zero_spatial_cmd_flag = false;
    }

    // The loop publishes setpoints which move away from the telemetry pose
    let moved = wait_for(
        || {
            let s = shared.lock();
            s.ok_to_publish
                && s.outgoing_command
                    .points
                    .first()
                    .map(|p| {
                        p.positions_rad
                            .iter()
                            .zip(&home)
                            .any(|(p, h)| (p - h).abs() > 1e-6)
                    })
                    .unwrap_or(false)
        },
        Duration::from_secs(2),
    );
    assert!(moved, "loop never published a moving setpoint");

    // The command-frame transform is republished against current state
    assert!(shared.lock().tf_planning_to_cmd.translation.vector.norm() > 1e-3);

    // The producer flags the command stale: positions revert to the
    // telemetry snapshot and velocities are zeroed
    shared.lock().command_is_stale = true;

    let halted = wait_for(
        || {
            let s = shared.lock();
            s.outgoing_command
                .points
                .first()
                .map(|p| {
                    p.velocities_rads.iter().all(|v| *v == 0.0)
                        && p.positions_rad
                            .iter()
                            .zip(&home)
                            .all(|(p, h)| (p - h).abs() < 1e-12)
                })
                .unwrap_or(false)
        },
        Duration::from_secs(2),
    );
    assert!(halted, "loop never synthesised the staleness halt");

    // Stop request is terminal
    control.request_stop();
    assert!(handle.join().is_ok());
}

#[test]
fn stop_before_telemetry_exits_cleanly() {
    let model = six_r_model();

    let shared = SharedHandle::new();
    let control = JogControl::new();
    let mut calcs = JogCalcs::new(loop_params(), Box::new(model));

    let handle = {
        let shared = shared.clone();
        let control = control.clone();
        thread::spawn(move || calcs.main_loop(&shared, &control))
    };

    thread::sleep(Duration::from_millis(20));
    control.request_stop();

    assert!(handle.join().is_ok());
    assert!(!control.is_initialized());
}
