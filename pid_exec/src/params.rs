//! # PID Executable Parameters
//!
//! This module provides parameters for the PID drive executable.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::net::NetParams;
use serde::Deserialize;

use crate::drive_ctrl;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters of the executable, as found in `params/pid_exec.toml`.
///
/// Missing tables take their default values, so an empty file is valid.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PidExecParams {

    /// Network endpoints
    pub net: NetParams,

    /// Controller gains and target speed
    pub drive_ctrl: drive_ctrl::Params
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::pid::PidGains;

    #[test]
    fn test_parse_params() {
        let params: PidExecParams = util::params::from_str(r#"
            [net]
            tlm_endpoint = "tcp://*:5555"

            [drive_ctrl]
            target_speed = 30.0

            [drive_ctrl.steer]
            k_p = 0.1
            k_i = 0.0
            k_d = 3.0
        "#).unwrap();

        assert_eq!(params.net.tlm_endpoint, "tcp://*:5555");
        assert_eq!(params.drive_ctrl.target_speed, 30.0);
        assert_eq!(params.drive_ctrl.steer, PidGains::new(0.1, 0.0, 3.0));

        // Throttle table is missing so the defaults are used
        assert_eq!(params.drive_ctrl.throttle, PidGains::new(0.3, 0.002, 0.5));
    }

    #[test]
    fn test_empty_params() {
        let params: PidExecParams = util::params::from_str("").unwrap();

        assert_eq!(params.net.tlm_endpoint, "tcp://*:4567");
        assert_eq!(params.drive_ctrl, drive_ctrl::Params::default());
    }
}
