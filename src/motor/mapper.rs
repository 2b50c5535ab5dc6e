// IN/IN duty mapping for a dual-channel H-bridge wheel driver.
// Converts a signed drive command (magnitude + direction) into the two
// channel duties, with distinct brake and coast states.

use thiserror::Error;

use crate::config::MAX_DUTY;
use crate::protocol::Direction;

/// Duty pair for one wheel's (IN1, IN2) driver inputs.
pub type DutyPair = (u16, u16);

#[derive(Debug, Error)]
pub enum MotorError {
    #[error("duty {magnitude} exceeds the {max} hardware limit")]
    DutyOutOfRange { magnitude: u16, max: u16 },
}

/// Map a drive command to channel duties.
///
/// Truth table (both channels low-side IN/IN control):
///   coast            -> (0, 0)                free-wheel
///   magnitude == 0   -> (MAX_DUTY, MAX_DUTY)  active brake
///   forward          -> (magnitude, 0)
///   reverse          -> (0, magnitude)
///
/// `magnitude` must already be clamped to `[0, MAX_DUTY]` by the caller.
/// A larger value here means a bug upstream, and this is the last stage
/// before the hardware, so it is rejected rather than silently truncated.
pub fn map_drive(
    magnitude: u16,
    direction: Direction,
    coast: bool,
) -> Result<DutyPair, MotorError> {
    if magnitude > MAX_DUTY {
        return Err(MotorError::DutyOutOfRange {
            magnitude,
            max: MAX_DUTY,
        });
    }

    let duties = if coast {
        (0, 0)
    } else if magnitude == 0 {
        (MAX_DUTY, MAX_DUTY)
    } else {
        match direction {
            Direction::Forward => (magnitude, 0),
            Direction::Reverse => (0, magnitude),
        }
    };

    Ok(duties)
}
