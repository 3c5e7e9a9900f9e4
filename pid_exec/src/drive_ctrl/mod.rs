//! # Drive control module
//!
//! Drive control turns telemetry from the simulator into steering and throttle demands. It does
//! this using a pair of independent PID controllers, one per actuation channel:
//!
//! - Steering is driven by the cross track error. The controller output is negated, since a
//!   positive cross track error needs a turn in the negative direction, then limited to [-1, 1].
//! - Throttle is driven by the speed error (target speed minus current speed). The controller
//!   output is used as is, it is not limited.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use params::*;
pub use state::*;

use util::{archive::ArchiveError, maths};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Minimum normalised steering demand.
pub const MIN_STEER: f64 = -1.0;

/// Maximum normalised steering demand.
pub const MAX_STEER: f64 = 1.0;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The actuation channels driven by DriveCtrl.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Steering,
    Throttle
}

/// Possible errors that can occur during DriveCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum DriveCtrlError {
    #[error("Could not set up the DriveCtrl archive: {0}")]
    ArchiveInitError(ArchiveError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Channel {
    /// Turn the raw controller output into the demand sent to the actuator.
    pub fn post_process(&self, raw: f64) -> f64 {
        match self {
            Channel::Steering => steer_output(raw),
            Channel::Throttle => throttle_output(raw)
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Steering demand for a raw steering controller output.
///
/// The result is always in `[MIN_STEER, MAX_STEER]`, a NaN raw output gives `MAX_STEER`.
pub fn steer_output(raw: f64) -> f64 {
    maths::clamp(-raw, MIN_STEER, MAX_STEER)
}

/// Throttle demand for a raw throttle controller output.
///
/// The throttle is deliberately left unlimited, unlike steering.
pub fn throttle_output(raw: f64) -> f64 {
    raw
}
