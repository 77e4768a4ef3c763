//! Main arm jogging executable entry point.
//!
//! # Architecture
//!
//! The executable wires the jogging calculation core up to its producers
//! and runs until the jog script has played out:
//!
//!     - Initialise the session and logging
//!     - Load the jog parameters, the arm model and the jog script
//!     - Spawn the calculation loop on its own thread
//!     - Run the stand-in producers (scripted commands, staleness
//!       watchdog, servo echo) on the main thread
//!     - Stop the loop and join it
//!
//! The calculation loop and the producers only ever meet at the shared
//! state; in a deployment the producer side is replaced by whatever
//! transport feeds the robot.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Result,
};
use log::{error, info};
use std::env;
use std::thread;

// Internal
use jog_exec::{
    jog_calcs::{JogCalcs, Params},
    model::{ChainParams, KinematicModel, SerialChainModel},
    script::JogScript,
    shared::{JogControl, SharedHandle},
    sim,
};
use util::{
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<()> {
    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("jog_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Trace, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Arm Jogging Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    // Collect all arguments
    let args: Vec<String> = env::args().collect();

    let (params_path, model_path, script_path) = match args.len() {
        1 => (
            "params/jog_calcs.toml".to_string(),
            "params/arm_model.toml".to_string(),
            "scripts/demo_jog.toml".to_string(),
        ),
        4 => (args[1].clone(), args[2].clone(), args[3].clone()),
        _ => {
            return Err(eyre!(
                "Expected either zero or three arguments (jog params, arm model, jog script), \
                 found {}",
                args.len() - 1
            ))
        }
    };

    let chain_params: ChainParams =
        util::params::load(&model_path).wrap_err("Could not load the arm model parameters")?;
    let model =
        SerialChainModel::from_params(&chain_params).wrap_err("Could not build the arm model")?;

    let joint_names = model.variable_names().to_vec();
    let initial_positions = if chain_params.home_position_rad.len() == joint_names.len() {
        chain_params.home_position_rad.clone()
    } else {
        vec![0.0; joint_names.len()]
    };

    let script = JogScript::from_file(&script_path).wrap_err("Could not load the jog script")?;
    info!(
        "Jog script loaded: {} commands over {:.02} s\n",
        script.num_cmds(),
        script.duration_s()
    );

    // ---- INITIALISE THE CALCULATION MODULE ----

    let mut calcs = JogCalcs::init(&params_path, Box::new(model))
        .wrap_err("Failed to initialise JogCalcs")?;
    let params: Params = calcs.params().clone();
    info!(
        "JogCalcs initialised: move group {:?} with {} joints at {:.0} Hz",
        params.move_group_name,
        joint_names.len(),
        1.0 / params.publish_period_s
    );

    // ---- START THE CALCULATION LOOP ----

    let shared = SharedHandle::new();
    let control = JogControl::new();

    let calc_thread = {
        let shared = shared.clone();
        let control = control.clone();
        thread::spawn(move || calcs.main_loop(&shared, &control))
    };

    // ---- RUN THE PRODUCERS ----

    sim::run_producers(
        &shared,
        &control,
        script,
        &params,
        joint_names,
        initial_positions,
    );

    // ---- SHUTDOWN ----

    control.request_stop();
    if calc_thread.join().is_err() {
        error!("The calculation thread panicked");
    }

    info!("End of execution");

    Ok(())
}
