//! # Command line interface
//!
//! Gains can be given on the command line in the order
//! `s_Kp s_Ki s_Kd t_Kp t_Ki t_Kd target_speed`, where `s_` is the steering controller and `t_` is
//! the throttle controller. Command line gains override the parameter file.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use structopt::StructOpt;
use util::logger::LevelFilter;

use crate::{drive_ctrl, pid::PidGains};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of positional values needed to override the parameter file.
pub const NUM_GAIN_ARGS: usize = 7;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Command line options for the PID drive executable.
#[derive(Debug, StructOpt)]
#[structopt(
    name = "pid_exec",
    about = "Steers and throttles a simulated car using a pair of PID controllers",
    setting = structopt::clap::AppSettings::AllowNegativeNumbers
)]
pub struct Opts {
    /// Parameter file, relative to `$PID_SW_ROOT/params`. Defaults are used if not given.
    #[structopt(short, long)]
    pub params: Option<String>,

    /// Directory in which the session directory is created, relative to `$PID_SW_ROOT`.
    #[structopt(long, default_value = "sessions")]
    pub sessions_dir: String,

    /// Minimum log level, must be `info` or more verbose.
    #[structopt(long, default_value = "debug")]
    pub log_level: LevelFilter,

    /// s_Kp s_Ki s_Kd t_Kp t_Ki t_Kd target_speed
    #[structopt(name = "GAINS", allow_hyphen_values = true)]
    pub gains: Vec<f64>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Expected either 0 or {} gain arguments, found {0}", NUM_GAIN_ARGS)]
    WrongGainCount(usize),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Opts {
    /// Override the drive control parameters with any gains given on the command line.
    ///
    /// Returns `true` if the parameters were overridden.
    pub fn apply_gains(&self, params: &mut drive_ctrl::Params) -> Result<bool, CliError> {
        match self.gains.as_slice() {
            [] => Ok(false),
            [s_kp, s_ki, s_kd, t_kp, t_ki, t_kd, target_speed] => {
                params.steer = PidGains::new(*s_kp, *s_ki, *s_kd);
                params.throttle = PidGains::new(*t_kp, *t_ki, *t_kd);
                params.target_speed = *target_speed;
                Ok(true)
            },
            g => Err(CliError::WrongGainCount(g.len()))
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_no_args() {
        let opts = Opts::from_iter_safe(&["pid_exec"]).unwrap();
        assert_eq!(opts.params, None);
        assert_eq!(opts.sessions_dir, "sessions");
        assert_eq!(opts.log_level, LevelFilter::Debug);

        let mut params = drive_ctrl::Params::default();
        assert!(!opts.apply_gains(&mut params).unwrap());
        assert_eq!(params, drive_ctrl::Params::default());
    }

    #[test]
    fn test_gain_args() {
        let opts = Opts::from_iter_safe(&[
            "pid_exec", "--params", "tuned.toml",
            "0.1", "0.0", "3.0", "0.2", "-0.001", "0.4", "35"
        ]).unwrap();
        assert_eq!(opts.params.as_deref(), Some("tuned.toml"));

        let mut params = drive_ctrl::Params::default();
        assert!(opts.apply_gains(&mut params).unwrap());
        assert_eq!(params.steer, PidGains::new(0.1, 0.0, 3.0));
        assert_eq!(params.throttle, PidGains::new(0.2, -0.001, 0.4));
        assert_eq!(params.target_speed, 35.0);
    }

    #[test]
    fn test_negative_gains() {
        // Leading negative value
        let opts = Opts::from_iter_safe(&[
            "pid_exec", "-0.08", "0.0003", "6.0", "0.3", "0.002", "0.5", "20"
        ]).unwrap();
        let mut params = drive_ctrl::Params::default();
        assert!(opts.apply_gains(&mut params).unwrap());
        assert_eq!(params.steer, PidGains::new(-0.08, 0.0003, 6.0));

        // Negative values in the middle and at the end, after an option
        let opts = Opts::from_iter_safe(&[
            "pid_exec", "--log-level", "info",
            "0.08", "0.0003", "6.0", "-0.3", "0.002", "-0.5", "-20"
        ]).unwrap();
        assert_eq!(opts.log_level, LevelFilter::Info);
        let mut params = drive_ctrl::Params::default();
        assert!(opts.apply_gains(&mut params).unwrap());
        assert_eq!(params.throttle, PidGains::new(-0.3, 0.002, -0.5));
        assert_eq!(params.target_speed, -20.0);
    }

    #[test]
    fn test_wrong_gain_count() {
        let opts = Opts::from_iter_safe(&["pid_exec", "0.1", "0.0", "3.0"]).unwrap();

        let mut params = drive_ctrl::Params::default();
        assert!(matches!(
            opts.apply_gains(&mut params),
            Err(CliError::WrongGainCount(3))
        ));
        assert_eq!(params, drive_ctrl::Params::default());
    }

    #[test]
    fn test_bad_gain() {
        assert!(Opts::from_iter_safe(&["pid_exec", "fast"]).is_err());
    }
}
