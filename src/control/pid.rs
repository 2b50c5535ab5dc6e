use crate::config::Tuning;

/// PID gains for one wheel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

impl From<&Tuning> for Gains {
    fn from(tuning: &Tuning) -> Self {
        Self {
            kp: tuning.kp,
            ki: tuning.ki,
            kd: tuning.kd,
        }
    }
}

/// Per-wheel PID regulator.
///
/// Integral and derivative accumulate in units-per-tick: there is no dt
/// term, so the gains assume a constant loop period and need retuning if
/// the period changes. The output is unclamped; the scheduler clamps it to
/// the duty range before it reaches the motor driver.
///
/// When a wheel is commanded to stop, the scheduler discards its regulator
/// and builds a fresh one so accumulated windup dies with the old instance.
#[derive(Debug, Clone)]
pub struct Pid {
    gains: Gains,
    integral: f64,
    previous_error: f64,
}

impl Pid {
    pub fn new(gains: Gains) -> Self {
        Self {
            gains,
            integral: 0.0,
            previous_error: 0.0,
        }
    }

    /// One regulator step. Call exactly once per wheel per tick.
    pub fn compute(&mut self, setpoint: f64, measured: f64) -> f64 {
        let error = setpoint - measured;
        self.integral += error;
        let derivative = error - self.previous_error;
        self.previous_error = error;
        self.gains.kp * error + self.gains.ki * self.integral + self.gains.kd * derivative
    }
}
