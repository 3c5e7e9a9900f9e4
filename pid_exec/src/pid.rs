//! # PID controller module
//!
//! A discrete PID controller which is stepped once per control tick. There is no notion of time
//! inside the controller: every call to [`PidController::update_error`] counts as exactly one tick,
//! however long it has been since the previous one.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Gains of a PID controller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidGains {
    /// Proportional gain
    pub k_p: f64,

    /// Integral gain
    pub k_i: f64,

    /// Derivative gain
    pub k_d: f64
}

/// A PID controller
///
/// The gains are fixed when the controller is created. To change them build a new controller,
/// which also clears the error terms.
#[derive(Debug, Clone, Serialize)]
pub struct PidController {
    /// Controller gains
    gains: PidGains,

    /// Last observed error
    p_error: f64,

    /// Sum of all observed errors
    i_error: f64,

    /// Difference between the last two observed errors
    d_error: f64
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidGains {
    /// Create a new set of gains.
    pub fn new(k_p: f64, k_i: f64, k_d: f64) -> Self {
        Self { k_p, k_i, k_d }
    }
}

impl PidController {

    /// Create a new controller with the given gains and all error terms zeroed.
    ///
    /// The gains are not validated, any sign or magnitude is accepted.
    pub fn new(gains: PidGains) -> Self {
        Self {
            gains,
            p_error: 0f64,
            i_error: 0f64,
            d_error: 0f64
        }
    }

    /// Feed a new error observation into the controller.
    ///
    /// The derivative term is taken against the previous proportional error, so it must be
    /// computed before that error is overwritten. The integral accumulates without bound.
    ///
    /// Non-finite errors are not rejected. A NaN will poison the integral term until the
    /// controller is rebuilt.
    pub fn update_error(&mut self, error: f64) {
        self.d_error = error - self.p_error;
        self.p_error = error;
        self.i_error += self.p_error;
    }

    /// Get the weighted sum of the error terms.
    pub fn total_error(&self) -> f64 {
        self.gains.k_p * self.p_error
            + self.gains.k_i * self.i_error
            + self.gains.k_d * self.d_error
    }

    /// Run a full control tick: update with the error and return the new output.
    pub fn tick(&mut self, error: f64) -> f64 {
        self.update_error(error);
        self.total_error()
    }

    pub fn gains(&self) -> PidGains {
        self.gains
    }

    pub fn p_error(&self) -> f64 {
        self.p_error
    }

    pub fn i_error(&self) -> f64 {
        self.i_error
    }

    pub fn d_error(&self) -> f64 {
        self.d_error
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_new_is_zeroed() {
        for gains in [
            PidGains::new(1.0, 1.0, 1.0),
            PidGains::new(0.08, 0.0003, 6.0),
            PidGains::new(-3.0, 1e6, -0.5),
        ].iter() {
            let pid = PidController::new(*gains);
            assert_eq!(pid.total_error(), 0.0);
            assert_eq!(pid.p_error(), 0.0);
            assert_eq!(pid.i_error(), 0.0);
            assert_eq!(pid.d_error(), 0.0);
            assert_eq!(pid.gains(), *gains);
        }
    }

    #[test]
    fn test_single_step() {
        let mut pid = PidController::new(PidGains::new(1.0, 1.0, 1.0));
        pid.update_error(5.0);

        assert_eq!(pid.p_error(), 5.0);
        assert_eq!(pid.i_error(), 5.0);
        assert_eq!(pid.d_error(), 5.0);
        assert_eq!(pid.total_error(), 15.0);
    }

    #[test]
    fn test_integral_accumulation() {
        let mut pid = PidController::new(PidGains::new(0.0, 1.0, 0.0));
        pid.update_error(2.0);
        pid.update_error(3.0);
        pid.update_error(-1.0);

        assert_eq!(pid.i_error(), 4.0);
        assert_eq!(pid.total_error(), 4.0);
    }

    #[test]
    fn test_derivative_uses_previous_error() {
        let mut pid = PidController::new(PidGains::new(0.0, 0.0, 1.0));
        pid.update_error(10.0);
        pid.update_error(4.0);

        assert_eq!(pid.d_error(), -6.0);
        assert_eq!(pid.total_error(), -6.0);
    }

    #[test]
    fn test_total_error_is_pure() {
        let mut pid = PidController::new(PidGains::new(0.3, 0.002, 0.5));
        pid.update_error(20.0);

        let first = pid.total_error();
        assert_eq!(pid.total_error(), first);
        assert_eq!(pid.total_error(), first);
    }

    #[test]
    fn test_tick() {
        let mut a = PidController::new(PidGains::new(0.08, 0.0003, 6.0));
        let mut b = a.clone();

        for e in [0.76, 0.74, 0.7, 0.71, 0.5].iter() {
            a.update_error(*e);
            assert_eq!(b.tick(*e), a.total_error());
        }
    }

    #[test]
    fn test_nan_poisons_integral() {
        let mut pid = PidController::new(PidGains::new(1.0, 1.0, 1.0));
        pid.update_error(f64::NAN);
        pid.update_error(1.0);
        pid.update_error(1.0);

        assert_eq!(pid.p_error(), 1.0);
        assert_eq!(pid.d_error(), 0.0);
        assert!(pid.i_error().is_nan());
        assert!(pid.total_error().is_nan());
    }
}
