//! Implementations for the DriveCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use serde::Serialize;
use std::convert::Infallible;

// Internal
use super::{Channel, DriveCtrlError, Params};
use crate::pid::PidController;
use util::{
    archive::{ArchiveError, Archived, Archiver},
    module::State,
    session::{self, Session},
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Drive control module state
///
/// Owns exactly one controller per actuation channel. The controllers are only mutated from
/// [`DriveCtrl::proc`], one tick at a time.
pub struct DriveCtrl {

    pub(crate) params: Params,

    steer_ctrl: PidController,

    throttle_ctrl: PidController,

    pub(crate) last_input: Option<InputData>,

    pub(crate) output: Option<OutputData>,

    pub(crate) report: StatusReport,

    arch_tick: Archiver
}

/// Data required for DriveCtrl initialisation.
#[derive(Default)]
pub struct InitData {
    /// Controller gains and target speed.
    pub params: Params,

    /// The session to archive into, or `None` to disable archiving.
    pub session: Option<Session>
}

/// Input data to drive control, one telemetry observation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct InputData {
    /// Cross track error.
    pub cte: f64,

    /// Current speed.
    pub speed: f64
}

/// Output demands from DriveCtrl that are sent back to the simulator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct OutputData {
    /// Normalised steering demand, in the range [-1, 1].
    pub steering_angle: f64,

    /// Throttle demand, unlimited.
    pub throttle: f64
}

/// Status report for DriveCtrl processing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StatusReport {
    /// Raw output of the steering controller, before negation and limiting.
    pub steer_raw: f64,

    /// True if the steering demand was limited on this tick.
    pub steer_limited: bool,

    /// Speed error fed into the throttle controller.
    pub speed_error: f64
}

/// One row of the tick archive.
#[derive(Serialize)]
struct TickRecord {
    time_s: f64,
    cte: f64,
    speed: f64,
    steer_p_error: f64,
    steer_i_error: f64,
    steer_d_error: f64,
    steer_raw: f64,
    steering_angle: f64,
    steer_limited: bool,
    throttle_p_error: f64,
    throttle_i_error: f64,
    throttle_d_error: f64,
    throttle: f64
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl DriveCtrl {
    /// Create a new instance with fresh controllers built from the parameters.
    ///
    /// Archiving is disabled until the module is initialised with a session.
    pub fn new(params: Params) -> Self {
        Self {
            params,
            steer_ctrl: PidController::new(params.steer),
            throttle_ctrl: PidController::new(params.throttle),
            last_input: None,
            output: None,
            report: StatusReport::default(),
            arch_tick: Archiver::default()
        }
    }

    /// The steering controller.
    pub fn steer_ctrl(&self) -> &PidController {
        &self.steer_ctrl
    }

    /// The throttle controller.
    pub fn throttle_ctrl(&self) -> &PidController {
        &self.throttle_ctrl
    }

    /// The parameters the controllers were built from.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Run one control tick on a single channel, returning the raw output and the demand.
    fn channel_tick(&mut self, channel: Channel, error: f64) -> (f64, f64) {
        let ctrl = match channel {
            Channel::Steering => &mut self.steer_ctrl,
            Channel::Throttle => &mut self.throttle_ctrl
        };

        let raw = ctrl.tick(error);

        (raw, channel.post_process(raw))
    }
}

impl Default for DriveCtrl {
    fn default() -> Self {
        Self::new(Params::default())
    }
}

impl State for DriveCtrl {
    type InitData = InitData;
    type InitError = DriveCtrlError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = Infallible;

    /// Initialise the DriveCtrl module.
    ///
    /// Both controllers are rebuilt, discarding any accumulated error.
    fn init(&mut self, init_data: Self::InitData) -> Result<(), Self::InitError> {
        let arch_tick = match init_data.session {
            Some(ref s) => Archiver::from_path(s, "drive_ctrl/tick.csv")
                .map_err(DriveCtrlError::ArchiveInitError)?,
            None => Archiver::default()
        };

        *self = Self::new(init_data.params);
        self.arch_tick = arch_tick;

        Ok(())
    }

    /// Perform one control tick for both channels.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        let speed_error = self.params.target_speed - input_data.speed;

        let (steer_raw, steering_angle) = self.channel_tick(Channel::Steering, input_data.cte);
        let (_, throttle) = self.channel_tick(Channel::Throttle, speed_error);

        let output = OutputData {
            steering_angle,
            throttle
        };

        self.report = StatusReport {
            steer_raw,
            steer_limited: steering_angle != -steer_raw,
            speed_error
        };

        trace!("DriveCtrl output: {:?}, report: {:?}", output, self.report);

        self.last_input = Some(*input_data);
        self.output = Some(output);

        Ok((output, self.report))
    }
}

impl Archived for DriveCtrl {
    /// Write the latest tick to the archive, if there has been one.
    fn write(&mut self) -> Result<(), ArchiveError> {
        let (input, output) = match (self.last_input, self.output) {
            (Some(i), Some(o)) => (i, o),
            _ => return Ok(())
        };

        let record = TickRecord {
            time_s: session::get_elapsed_seconds(),
            cte: input.cte,
            speed: input.speed,
            steer_p_error: self.steer_ctrl.p_error(),
            steer_i_error: self.steer_ctrl.i_error(),
            steer_d_error: self.steer_ctrl.d_error(),
            steer_raw: self.report.steer_raw,
            steering_angle: output.steering_angle,
            steer_limited: self.report.steer_limited,
            throttle_p_error: self.throttle_ctrl.p_error(),
            throttle_i_error: self.throttle_ctrl.i_error(),
            throttle_d_error: self.throttle_ctrl.d_error(),
            throttle: output.throttle
        };

        self.arch_tick.serialise(&record)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::pid::PidGains;

    fn params(steer: PidGains, throttle: PidGains, target_speed: f64) -> Params {
        Params {
            steer,
            throttle,
            target_speed
        }
    }

    #[test]
    fn test_init_zeroes_state() {
        let mut dc = DriveCtrl::default();
        dc.proc(&InputData { cte: 1.0, speed: 3.0 }).unwrap();
        assert!(dc.steer_ctrl().i_error() != 0.0);

        let p = params(PidGains::new(1.0, 2.0, 3.0), PidGains::new(4.0, 5.0, 6.0), 7.0);
        dc.init(InitData { params: p, session: None }).unwrap();

        assert_eq!(*dc.params(), p);
        assert_eq!(dc.steer_ctrl().total_error(), 0.0);
        assert_eq!(dc.throttle_ctrl().total_error(), 0.0);
        assert_eq!(dc.steer_ctrl().gains(), p.steer);
        assert_eq!(dc.throttle_ctrl().gains(), p.throttle);
    }

    #[test]
    fn test_steering_scenario() {
        let mut dc = DriveCtrl::new(params(
            PidGains::new(1.0, 0.0, 0.0),
            PidGains::new(0.0, 0.0, 0.0),
            20.0
        ));

        for _ in 0..3 {
            let (out, rpt) = dc.proc(&InputData { cte: 0.5, speed: 20.0 }).unwrap();
            assert_eq!(out.steering_angle, -0.5);
            assert_eq!(rpt.steer_raw, 0.5);
            assert!(!rpt.steer_limited);
        }
    }

    #[test]
    fn test_steering_is_limited() {
        let mut dc = DriveCtrl::new(params(
            PidGains::new(1.0, 0.0, 0.0),
            PidGains::new(0.0, 0.0, 0.0),
            20.0
        ));

        let (out, rpt) = dc.proc(&InputData { cte: 3.0, speed: 0.0 }).unwrap();
        assert_eq!(out.steering_angle, -1.0);
        assert_eq!(rpt.steer_raw, 3.0);
        assert!(rpt.steer_limited);

        let (out, _) = dc.proc(&InputData { cte: -3.0, speed: 0.0 }).unwrap();
        assert_eq!(out.steering_angle, 1.0);
    }

    #[test]
    fn test_steering_stays_in_range_when_raw_is_nan() {
        // Finite observations which overflow the integral to inf - inf
        let mut dc = DriveCtrl::new(params(
            PidGains::new(1.0, 1.0, 1.0),
            PidGains::new(0.0, 0.0, 0.0),
            20.0
        ));

        let mut last = None;
        for cte in [1e308, 1e308, -1e308].iter() {
            last = Some(dc.proc(&InputData { cte: *cte, speed: 20.0 }).unwrap());
        }
        let (out, rpt) = last.unwrap();
        assert!(rpt.steer_raw.is_nan());
        assert_eq!(out.steering_angle, 1.0);
        assert!(rpt.steer_limited);

        // Infinite gain with zero error
        let mut dc = DriveCtrl::new(params(
            PidGains::new(f64::INFINITY, 0.0, 0.0),
            PidGains::new(0.0, 0.0, 0.0),
            20.0
        ));
        let (out, rpt) = dc.proc(&InputData { cte: 0.0, speed: 20.0 }).unwrap();
        assert!(rpt.steer_raw.is_nan());
        assert_eq!(out.steering_angle, 1.0);
    }

    #[test]
    fn test_throttle_is_not_limited() {
        let mut dc = DriveCtrl::new(params(
            PidGains::new(0.0, 0.0, 0.0),
            PidGains::new(1.0, 0.0, 0.0),
            20.0
        ));

        // Speed error is target minus current
        let (out, rpt) = dc.proc(&InputData { cte: 0.0, speed: 5.0 }).unwrap();
        assert_eq!(rpt.speed_error, 15.0);
        assert_eq!(out.throttle, 15.0);

        let (out, _) = dc.proc(&InputData { cte: 0.0, speed: 50.0 }).unwrap();
        assert_eq!(out.throttle, -30.0);
    }

    #[test]
    fn test_default_gains_first_tick() {
        let mut dc = DriveCtrl::default();

        let (out, _) = dc.proc(&InputData { cte: 0.1, speed: 0.0 }).unwrap();

        // Steering: -(0.08*0.1 + 0.0003*0.1 + 6.0*0.1) = -0.60803
        assert!((out.steering_angle - -0.60803).abs() < 1e-12);

        // Throttle: 0.3*20 + 0.002*20 + 0.5*20 = 16.04
        assert!((out.throttle - 16.04).abs() < 1e-12);
    }

    #[test]
    fn test_channel_independence() {
        let mut dc = DriveCtrl::new(params(
            PidGains::new(1.0, 1.0, 1.0),
            PidGains::new(1.0, 1.0, 1.0),
            10.0
        ));

        // Hold the cross track error constant and vary the speed
        dc.proc(&InputData { cte: 2.0, speed: 0.0 }).unwrap();
        let steer_before = dc.steer_ctrl().clone();
        let throttle_before = dc.throttle_ctrl().clone();

        dc.channel_tick(Channel::Throttle, 7.0);
        assert_eq!(dc.steer_ctrl().p_error(), steer_before.p_error());
        assert_eq!(dc.steer_ctrl().i_error(), steer_before.i_error());
        assert_eq!(dc.steer_ctrl().d_error(), steer_before.d_error());

        // And the other way around
        let throttle_mid = dc.throttle_ctrl().clone();
        dc.channel_tick(Channel::Steering, -4.0);
        assert_eq!(dc.throttle_ctrl().p_error(), throttle_mid.p_error());
        assert_eq!(dc.throttle_ctrl().i_error(), throttle_mid.i_error());
        assert_eq!(dc.throttle_ctrl().d_error(), throttle_mid.d_error());

        assert!(throttle_mid.i_error() != throttle_before.i_error());
    }

    #[test]
    fn test_write_without_session() {
        let mut dc = DriveCtrl::default();

        // Nothing to write yet, and no archive attached
        assert!(!dc.arch_tick.is_active());
        assert!(dc.write().is_ok());
        dc.proc(&InputData { cte: 0.2, speed: 1.0 }).unwrap();
        assert!(dc.write().is_ok());
    }
}
