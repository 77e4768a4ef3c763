//! Jog command scripts
//!
//! A jog script is a TOML file holding timed teleoperation commands plus
//! the staleness window the producer should enforce. Scripts drive the
//! executable's demo harness in place of a live teleoperation source.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;
use std::cmp::Ordering;
use std::collections::VecDeque;
use std::path::Path;

// Internal
use util::params;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The on-disk form of a jog script.
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptFile {
    /// Commands older than this are flagged stale by the producer.
    ///
    /// Units: seconds
    pub stale_after_s: f64,

    /// The scripted commands, in any order.
    #[serde(default)]
    pub entries: Vec<ScriptEntry>,
}

/// A command scheduled to be issued at a specific time.
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptEntry {
    /// The time the command is issued at, from the start of the script.
    ///
    /// Units: seconds
    pub time_s: f64,

    /// A spatial command to issue, if any.
    #[serde(default)]
    pub spatial: Option<SpatialEntry>,

    /// A joint command to issue, if any.
    #[serde(default)]
    pub joint: Option<JointEntry>,
}

/// The spatial command payload of a script entry.
#[derive(Debug, Clone, Deserialize)]
pub struct SpatialEntry {
    /// The frame the command is expressed in.
    pub frame_id: String,

    /// Linear velocity demand.
    pub linear_ms: [f64; 3],

    /// Angular velocity demand.
    pub angular_rads: [f64; 3],
}

/// The joint command payload of a script entry.
#[derive(Debug, Clone, Deserialize)]
pub struct JointEntry {
    /// The joints being commanded. Aligned with `velocities`.
    pub joint_names: Vec<String>,

    /// Velocity demand for each named joint.
    pub velocities: Vec<f64>,
}

/// A loaded script, drained by elapsed time.
pub struct JogScript {
    cmds: VecDeque<ScriptEntry>,
    duration_s: f64,

    /// Commands older than this are flagged stale by the producer.
    ///
    /// Units: seconds
    pub stale_after_s: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The commands due at a given time.
pub enum PendingCmds {
    /// No commands due yet.
    None,

    /// The commands which have come due, in schedule order.
    Some(Vec<ScriptEntry>),

    /// Every command has been issued.
    EndOfScript,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl JogScript {
    /// Load a script from the given path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, params::LoadError> {
        let file: ScriptFile = params::load(path)?;

        Ok(Self::new(file))
    }

    /// Build a script from its on-disk form, ordering the entries by time.
    pub fn new(file: ScriptFile) -> Self {
        let mut entries = file.entries;
        entries.sort_by(|a, b| a.time_s.partial_cmp(&b.time_s).unwrap_or(Ordering::Equal));

        let duration_s = entries.last().map(|e| e.time_s).unwrap_or(0.0);

        Self {
            cmds: entries.into(),
            duration_s,
            stale_after_s: file.stale_after_s,
        }
    }

    /// Take every command due at the given elapsed time.
    pub fn get_pending(&mut self, elapsed_s: f64) -> PendingCmds {
        if self.cmds.is_empty() {
            return PendingCmds::EndOfScript;
        }

        let mut due = Vec::new();
        loop {
            match self.cmds.front() {
                Some(entry) if entry.time_s <= elapsed_s => {
                    if let Some(entry) = self.cmds.pop_front() {
                        due.push(entry);
                    }
                }
                _ => break,
            }
        }

        if due.is_empty() {
            PendingCmds::None
        } else {
            PendingCmds::Some(due)
        }
    }

    /// The schedule time of the script's last command.
    pub fn duration_s(&self) -> f64 {
        self.duration_s
    }

    /// The number of commands not yet issued.
    pub fn num_cmds(&self) -> usize {
        self.cmds.len()
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
