use crate::config::MOTOR_COUNT;

/// Converts raw encoder deltas into unsigned wheel speeds.
///
/// Owns the previous-position shadow for each wheel. The reported speed is
/// a magnitude; direction of rotation is not sensed, it is whatever the
/// setpoint commands.
#[derive(Debug, Clone)]
pub struct VelocityEstimator {
    previous_positions: [i32; MOTOR_COUNT],
    ticks_per_unit: f64,
}

impl VelocityEstimator {
    pub fn new(ticks_per_unit: f64) -> Self {
        Self {
            previous_positions: [0; MOTOR_COUNT],
            ticks_per_unit,
        }
    }

    /// Speed magnitude for one wheel since the previous call.
    ///
    /// A degenerate `dt` (first tick, clock hiccup) yields 0.0 and leaves
    /// the shadow position untouched, so the next healthy tick sees the
    /// whole delta instead of a division blow-up.
    pub fn estimate(&mut self, wheel: usize, position: i32, dt: f64) -> f64 {
        if dt <= 0.0 {
            return 0.0;
        }
        let delta = i64::from(position) - i64::from(self.previous_positions[wheel]);
        self.previous_positions[wheel] = position;
        (delta as f64 / dt / self.ticks_per_unit).abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TICKS_PER_UNIT: f64 = 150.0;

    #[test]
    fn reference_calibration_case() {
        let mut est = VelocityEstimator::new(TICKS_PER_UNIT);
        // 300 ticks over 2 seconds at 150 ticks/unit = 1.0 unit/s
        assert_eq!(est.estimate(0, 300, 2.0), 1.0);
    }

    #[test]
    fn speed_is_unsigned_magnitude() {
        let mut est = VelocityEstimator::new(TICKS_PER_UNIT);
        // Wheel spinning backwards: position counts down.
        assert_eq!(est.estimate(1, -300, 2.0), 1.0);
    }

    #[test]
    fn degenerate_dt_reports_zero_and_keeps_shadow_position() {
        let mut est = VelocityEstimator::new(TICKS_PER_UNIT);

        assert_eq!(est.estimate(0, 300, 0.0), 0.0);
        assert_eq!(est.estimate(0, 300, -0.5), 0.0);

        // Shadow was not advanced: the next healthy tick still sees the
        // full 300-tick delta.
        assert_eq!(est.estimate(0, 300, 2.0), 1.0);
    }

    #[test]
    fn stationary_wheel_reads_zero() {
        let mut est = VelocityEstimator::new(TICKS_PER_UNIT);
        est.estimate(2, 5000, 0.02);
        assert_eq!(est.estimate(2, 5000, 0.02), 0.0);
    }

    #[test]
    fn wheels_are_tracked_independently() {
        let mut est = VelocityEstimator::new(TICKS_PER_UNIT);
        est.estimate(0, 300, 1.0);
        // Wheel 1's shadow is still at 0.
        assert_eq!(est.estimate(1, 150, 1.0), 1.0);
    }
}
