//! # Frame dispatch
//!
//! Routes each decoded frame from the simulator to drive control and builds the reply.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::tlm::{self, Frame, SteerCmd, TlmParseError};
use log::{debug, trace};
use util::module::State;

use crate::{
    drive_ctrl::{DriveCtrl, InputData},
    tlm_server::Reply,
};

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Handle a single frame from the simulator, running a control tick if it carries telemetry.
///
/// Drive control is only borrowed for the duration of the tick.
pub fn handle_frame(drive_ctrl: &mut DriveCtrl, frame: &str) -> Result<Reply, TlmParseError> {
    let tlm = match tlm::decode(frame)? {
        Frame::Telemetry(t) => t,
        Frame::NoData => return Ok(Reply::Manual),
        Frame::Other(name) => {
            trace!("Ignoring {:?} event", name);
            return Ok(Reply::None)
        },
        Frame::NotEvent => return Ok(Reply::None)
    };

    let (output, _) = match drive_ctrl.proc(&InputData {
        cte: tlm.cte,
        speed: tlm.speed
    }) {
        Ok(o) => o,
        Err(e) => match e {}
    };

    debug!(
        "CTE: {} Steering: {} Throttle: {}",
        tlm.cte, output.steering_angle, output.throttle
    );

    Ok(Reply::Steer(SteerCmd {
        steering_angle: output.steering_angle,
        throttle: output.throttle
    }))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{drive_ctrl::Params, pid::PidGains};

    fn tlm_frame(cte: f64, speed: f64) -> String {
        format!(
            "42[\"telemetry\",{{\"cte\":\"{}\",\"speed\":\"{}\",\"steering_angle\":\"0\"}}]",
            cte, speed
        )
    }

    #[test]
    fn test_steering_sequence() {
        let mut dc = DriveCtrl::new(Params {
            steer: PidGains::new(1.0, 0.0, 0.0),
            throttle: PidGains::new(0.0, 0.0, 0.0),
            target_speed: 20.0
        });

        for _ in 0..3 {
            match handle_frame(&mut dc, &tlm_frame(0.5, 10.0)).unwrap() {
                Reply::Steer(cmd) => {
                    assert_eq!(cmd.steering_angle, -0.5);
                    assert_eq!(cmd.throttle, 0.0);
                },
                r => panic!("Expected a steer reply, got {:?}", r)
            }
        }
    }

    #[test]
    fn test_non_telemetry_frames() {
        let mut dc = DriveCtrl::default();

        assert_eq!(handle_frame(&mut dc, "42[\"telemetry\",null]").unwrap(), Reply::Manual);
        assert_eq!(handle_frame(&mut dc, "2").unwrap(), Reply::None);
        assert_eq!(handle_frame(&mut dc, "42[\"reset\",{}]").unwrap(), Reply::None);

        // None of these tick the controllers
        assert_eq!(dc.steer_ctrl().total_error(), 0.0);
        assert_eq!(dc.throttle_ctrl().total_error(), 0.0);
    }

    #[test]
    fn test_invalid_frame_does_not_tick() {
        let mut dc = DriveCtrl::default();

        assert!(handle_frame(&mut dc, "42[\"telemetry\",{\"cte\":\"nan\",\"speed\":\"1\"}]").is_err());
        assert!(handle_frame(&mut dc, "42[\"telemetry\",{\"cte\":\"0.1\"}]").is_err());

        assert_eq!(dc.steer_ctrl().i_error(), 0.0);
        assert_eq!(dc.throttle_ctrl().i_error(), 0.0);
    }
}
