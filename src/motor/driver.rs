// High-level motor driver for the three-wheel base
//
// Combines the IN/IN duty mapping with the DriveChannels hardware seam to
// provide a simple per-wheel drive API.

use tracing::{debug, info};

use super::mapper::{map_drive, MotorError};
use crate::config::{MAX_DUTY, MOTOR_COUNT, MOTORS_ENABLED};
use crate::hardware::DriveChannels;
use crate::protocol::Direction;

/// High-level driver for the three wheel motors.
///
/// Disabled wheels (see the enable mask) accept commands and do nothing, so
/// bring-up with a wheel unplugged never drives a floating channel pair.
pub struct MotorDriver<C: DriveChannels> {
    channels: C,
    enabled: [bool; MOTOR_COUNT],
}

impl<C: DriveChannels> MotorDriver<C> {
    pub fn new(channels: C) -> Self {
        Self::with_enable_mask(channels, MOTORS_ENABLED)
    }

    /// Create with a custom per-wheel enable mask.
    pub fn with_enable_mask(channels: C, enabled: [bool; MOTOR_COUNT]) -> Self {
        info!("Motor driver ready, enabled wheels: {:?}", enabled);
        Self { channels, enabled }
    }

    /// Apply one wheel's drive command.
    ///
    /// `magnitude` must already be clamped to `[0, MAX_DUTY]`; an
    /// out-of-range value is rejected by the mapper and propagated as a
    /// fault rather than sent to the hardware.
    pub fn drive(
        &mut self,
        wheel: usize,
        magnitude: u16,
        direction: Direction,
        coast: bool,
    ) -> Result<(), MotorError> {
        if !self.enabled[wheel] {
            return Ok(());
        }
        let (in1, in2) = map_drive(magnitude, direction, coast)?;
        debug!("wheel {}: duty=({}, {})", wheel, in1, in2);
        self.channels.set_duty(wheel, in1, in2);
        Ok(())
    }

    /// Hard-stop every enabled wheel (both channels at full duty).
    pub fn brake_all(&mut self) {
        for wheel in 0..MOTOR_COUNT {
            if self.enabled[wheel] {
                self.channels.set_duty(wheel, MAX_DUTY, MAX_DUTY);
            }
        }
    }

    /// De-energize every enabled wheel, letting them free-wheel.
    pub fn coast_all(&mut self) {
        for wheel in 0..MOTOR_COUNT {
            if self.enabled[wheel] {
                self.channels.set_duty(wheel, 0, 0);
            }
        }
    }

    pub fn enabled(&self) -> [bool; MOTOR_COUNT] {
        self.enabled
    }
}

impl<C: DriveChannels> Drop for MotorDriver<C> {
    fn drop(&mut self) {
        // Leave the base braked when the driver goes away (safety measure)
        self.brake_all();
    }
}
