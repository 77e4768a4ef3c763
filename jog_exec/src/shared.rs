//! Shared state between the calculation loop and its producers
//!
//! The calculation loop, the command/telemetry producers, and the
//! collision-proximity producer run in separate threads and meet at a single
//! structure of plain fields behind one mutex. Every access snapshots into
//! thread-local copies under the lock and releases it before any numeric
//! work or I/O.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Isometry3;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

// Internal
use jog_if::{JointJogCmd, JointStateMsg, JointTrajectory, SpatialJogCmd};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The producer/consumer rendezvous for the jogging loop.
pub struct JogShared {
    /// Latest joint telemetry from the servo layer.
    pub joints: JointStateMsg,

    /// Latest spatial jog command.
    pub spatial_cmd: SpatialJogCmd,

    /// True if the latest spatial command demands zero velocity.
    pub zero_spatial_cmd_flag: bool,

    /// Latest joint jog command.
    pub joint_cmd: JointJogCmd,

    /// True if the latest joint command demands zero velocity.
    pub zero_joint_cmd_flag: bool,

    /// True if the most recent command has aged beyond the staleness window.
    /// Maintained by the command producer.
    pub command_is_stale: bool,

    /// Cartesian dimensions the user permits to drift, in the order
    /// (x, y, z, roll, pitch, yaw). A true entry removes that row from the
    /// Jacobian so the solver may exploit task redundancy.
    pub drift_dimensions: [bool; 6],

    /// Velocity scale in [0, 1] published by the collision-proximity
    /// producer. 1 means no obstacle nearby.
    pub collision_velocity_scale: f64,

    /// The transform from the planning frame to the command frame, published
    /// by the calculation loop each cycle.
    pub tf_planning_to_cmd: Isometry3<f64>,

    /// The outgoing trajectory staged by the calculation loop.
    pub outgoing_command: JointTrajectory,

    /// True if `outgoing_command` should be forwarded to the servo layer.
    pub ok_to_publish: bool,

    /// True if singularity/collision/limit scaling tripped on the latest
    /// calculation cycle.
    pub warning: bool,
}

/// A cloneable handle to the shared state.
#[derive(Clone)]
pub struct SharedHandle(Arc<Mutex<JogShared>>);

/// Control flags for the calculation loop, shared between threads.
///
/// These sit outside the mutex so that a stop request can never be delayed
/// by a held lock.
#[derive(Clone)]
pub struct JogControl {
    inner: Arc<JogControlInner>,
}

struct JogControlInner {
    stop: AtomicBool,
    halt_outgoing: AtomicBool,
    initialized: AtomicBool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for JogShared {
    fn default() -> Self {
        Self {
            joints: JointStateMsg::default(),
            spatial_cmd: SpatialJogCmd::default(),
            zero_spatial_cmd_flag: true,
            joint_cmd: JointJogCmd::default(),
            zero_joint_cmd_flag: true,
            command_is_stale: false,
            drift_dimensions: [false; 6],
            collision_velocity_scale: 1.0,
            tf_planning_to_cmd: Isometry3::identity(),
            outgoing_command: JointTrajectory::default(),
            ok_to_publish: false,
            warning: false,
        }
    }
}

impl SharedHandle {
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(JogShared::default())))
    }

    /// Acquire the shared state lock.
    ///
    /// A poisoned lock still yields the inner state: the fields are plain
    /// values and remain usable after a panic in another thread.
    pub fn lock(&self) -> MutexGuard<JogShared> {
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for SharedHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl JogControl {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(JogControlInner {
                stop: AtomicBool::new(false),
                halt_outgoing: AtomicBool::new(false),
                initialized: AtomicBool::new(false),
            }),
        }
    }

    /// Request that the calculation loop exits at its next polling point.
    /// Terminal: a stopped loop cannot be restarted.
    pub fn request_stop(&self) {
        self.inner.stop.store(true, Ordering::SeqCst);
    }

    pub fn stop_requested(&self) -> bool {
        self.inner.stop.load(Ordering::SeqCst)
    }

    /// Pause or resume outgoing jog calculations. While paused the loop
    /// keeps its filters matched to telemetry so resuming causes no step.
    pub fn set_halt_outgoing(&self, halt: bool) {
        self.inner.halt_outgoing.store(halt, Ordering::SeqCst);
    }

    pub fn halt_outgoing(&self) -> bool {
        self.inner.halt_outgoing.load(Ordering::SeqCst)
    }

    pub(crate) fn set_initialized(&self) {
        self.inner.initialized.store(true, Ordering::SeqCst);
    }

    /// True once the loop has received consistent joint telemetry.
    pub fn is_initialized(&self) -> bool {
        self.inner.initialized.load(Ordering::SeqCst)
    }
}

impl Default for JogControl {
    fn default() -> Self {
        Self::new()
    }
}
