//! Parameters structure for DriveCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::pid::PidGains;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for drive control.
///
/// Any field missing from the parameter file takes its default value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Params {

    /// Gains of the steering controller, driven by the cross track error.
    pub steer: PidGains,

    /// Gains of the throttle controller, driven by the speed error.
    pub throttle: PidGains,

    /// The speed the throttle controller tries to hold.
    ///
    /// Units: the simulator's speed units.
    pub target_speed: f64
}

impl Default for Params {
    fn default() -> Self {
        Self {
            steer: PidGains::new(0.08, 0.0003, 6.0),
            throttle: PidGains::new(0.3, 0.002, 0.5),
            target_speed: 20.0
        }
    }
}
