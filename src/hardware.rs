// Hardware collaborator seams
//
// The control core reaches the drive train through these traits. Real
// peripherals (PWM pairs, quadrature counters, ranging sensors) live in the
// board support layer and implement them there; the `bench` module provides
// in-memory stand-ins for tests and socket-only bring-up.

/// Two independently settable drive-strength outputs per wheel.
pub trait DriveChannels {
    fn set_duty(&mut self, wheel: usize, in1: u16, in2: u16);
}

/// Signed tick position per wheel, maintained by the counting hardware.
pub trait EncoderBank {
    /// `None` when the encoder is absent or not yet counting.
    fn position(&self, wheel: usize) -> Option<i32>;
}

/// Instantaneous distance sample per sensor slot.
pub trait RangeSensors {
    /// `None` when the slot is absent or has no sample this instant.
    fn sample(&self, slot: usize) -> Option<u8>;
}

pub mod bench {
    //! In-memory collaborators. Cloned handles share state, so a test can
    //! keep one clone and hand the other to the runtime.

    use std::sync::{Arc, Mutex, MutexGuard};

    use super::{DriveChannels, EncoderBank, RangeSensors};
    use crate::config::{DIST_SENSOR_COUNT, MOTOR_COUNT};

    fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
        mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Records the most recent duty pair written to each wheel.
    #[derive(Debug, Clone, Default)]
    pub struct RecordingChannels {
        duties: Arc<Mutex<[(u16, u16); MOTOR_COUNT]>>,
    }

    impl RecordingChannels {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn duty(&self, wheel: usize) -> (u16, u16) {
            locked(&self.duties)[wheel]
        }
    }

    impl DriveChannels for RecordingChannels {
        fn set_duty(&mut self, wheel: usize, in1: u16, in2: u16) {
            locked(&self.duties)[wheel] = (in1, in2);
        }
    }

    /// Encoder bank whose positions the bench moves by hand.
    #[derive(Debug, Clone)]
    pub struct ScriptedEncoders {
        positions: Arc<Mutex<[Option<i32>; MOTOR_COUNT]>>,
    }

    impl Default for ScriptedEncoders {
        fn default() -> Self {
            Self {
                positions: Arc::new(Mutex::new([Some(0); MOTOR_COUNT])),
            }
        }
    }

    impl ScriptedEncoders {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_position(&self, wheel: usize, position: i32) {
            locked(&self.positions)[wheel] = Some(position);
        }

        pub fn advance(&self, wheel: usize, ticks: i32) {
            let mut positions = locked(&self.positions);
            positions[wheel] = positions[wheel].map(|p| p + ticks);
        }

        /// Simulate a dead or disconnected encoder.
        pub fn disconnect(&self, wheel: usize) {
            locked(&self.positions)[wheel] = None;
        }
    }

    impl EncoderBank for ScriptedEncoders {
        fn position(&self, wheel: usize) -> Option<i32> {
            locked(&self.positions)[wheel]
        }
    }

    /// Fixed ranging returns. `None` slots exercise the no-target sentinel.
    #[derive(Debug, Clone)]
    pub struct FixedRangers {
        pub samples: [Option<u8>; DIST_SENSOR_COUNT],
    }

    impl Default for FixedRangers {
        fn default() -> Self {
            // Bench pattern: a mix of close targets, touching targets, and
            // empty slots, matching the bring-up placeholder readings.
            Self {
                samples: [
                    Some(13),
                    None,
                    Some(13),
                    Some(0),
                    Some(0),
                    Some(13),
                    Some(13),
                    None,
                ],
            }
        }
    }

    impl FixedRangers {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl RangeSensors for FixedRangers {
        fn sample(&self, slot: usize) -> Option<u8> {
            self.samples[slot]
        }
    }

}
