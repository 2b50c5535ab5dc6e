// Wire frames exchanged with the driver station over UDP.
//
// Command frame (station -> robot), 7 bytes:
//   [0]      reserved
//   [1..=3]  per-wheel speed bytes, 0-255, full scale = max_wheel_speed
//   [4..=6]  per-wheel direction codes, 2 = forward, anything else = reverse
//
// Telemetry frame (robot -> station), 20 bytes, sent in reply to every
// well-formed command frame:
//   [0..8]   one distance byte per sensor slot, 255 = no target
//   [8..20]  three little-endian i32 encoder positions

use thiserror::Error;

use crate::config::{DIST_SENSOR_COUNT, MOTOR_COUNT};

pub const COMMAND_FRAME_LEN: usize = 7;
pub const TELEMETRY_FRAME_LEN: usize = DIST_SENSOR_COUNT + 4 * MOTOR_COUNT;

/// Distance byte reported when a sensor slot has no sample.
pub const DIST_NO_TARGET: u8 = 255;

/// Wire code for forward rotation.
const DIR_FORWARD: u8 = 2;

/// Wire code used when encoding reverse. Decoding accepts any non-forward
/// code as reverse.
const DIR_REVERSE: u8 = 0;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("expected {expected}-byte frame, got {got}")]
    Length { expected: usize, got: usize },
}

/// Commanded rotation direction for one wheel.
///
/// The protocol has room for a third code (the hardware can coast), but the
/// station only ever sends forward or reverse, so every non-forward code
/// decodes as reverse. If a coast code is ever assigned, the decode here and
/// the station encoder both need to learn it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Reverse,
}

impl Direction {
    fn decode(code: u8) -> Self {
        if code == DIR_FORWARD {
            Direction::Forward
        } else {
            Direction::Reverse
        }
    }

    fn encode(self) -> u8 {
        match self {
            Direction::Forward => DIR_FORWARD,
            Direction::Reverse => DIR_REVERSE,
        }
    }
}

/// A validated 7-byte command frame.
///
/// Keeps the raw bytes so the runtime can compare a newly received frame
/// against the last applied one without re-decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandFrame {
    bytes: [u8; COMMAND_FRAME_LEN],
}

impl CommandFrame {
    /// Validate an incoming datagram. Anything but exactly 7 bytes is a
    /// framing error and the caller drops the packet.
    pub fn parse(buf: &[u8]) -> Result<Self, FrameError> {
        let bytes: [u8; COMMAND_FRAME_LEN] = buf.try_into().map_err(|_| FrameError::Length {
            expected: COMMAND_FRAME_LEN,
            got: buf.len(),
        })?;
        Ok(Self { bytes })
    }

    /// Build a frame from per-wheel speed bytes and directions (station side).
    pub fn new(speeds: [u8; MOTOR_COUNT], directions: [Direction; MOTOR_COUNT]) -> Self {
        let mut bytes = [0u8; COMMAND_FRAME_LEN];
        for wheel in 0..MOTOR_COUNT {
            bytes[1 + wheel] = speeds[wheel];
            bytes[4 + wheel] = directions[wheel].encode();
        }
        Self { bytes }
    }

    /// Speed setpoint for one wheel, linearly scaled so a full-scale byte
    /// maps to `max_wheel_speed`.
    pub fn setpoint(&self, wheel: usize, max_wheel_speed: f64) -> f64 {
        (f64::from(self.bytes[1 + wheel]) / 255.0) * max_wheel_speed
    }

    pub fn direction(&self, wheel: usize) -> Direction {
        Direction::decode(self.bytes[4 + wheel])
    }

    pub fn as_bytes(&self) -> &[u8; COMMAND_FRAME_LEN] {
        &self.bytes
    }
}

/// Telemetry snapshot: ranging samples plus raw encoder positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryFrame {
    pub distances: [u8; DIST_SENSOR_COUNT],
    pub encoder_positions: [i32; MOTOR_COUNT],
}

impl TelemetryFrame {
    /// Encode into the fixed 20-byte wire layout. Never fails; unavailable
    /// inputs are already substituted with sentinels by the caller.
    pub fn encode(&self) -> [u8; TELEMETRY_FRAME_LEN] {
        let mut out = [0u8; TELEMETRY_FRAME_LEN];
        out[..DIST_SENSOR_COUNT].copy_from_slice(&self.distances);
        for (wheel, position) in self.encoder_positions.iter().enumerate() {
            let at = DIST_SENSOR_COUNT + 4 * wheel;
            out[at..at + 4].copy_from_slice(&position.to_le_bytes());
        }
        out
    }

    /// Decode a telemetry frame (station side).
    pub fn parse(buf: &[u8]) -> Result<Self, FrameError> {
        if buf.len() != TELEMETRY_FRAME_LEN {
            return Err(FrameError::Length {
                expected: TELEMETRY_FRAME_LEN,
                got: buf.len(),
            });
        }

        let mut distances = [0u8; DIST_SENSOR_COUNT];
        distances.copy_from_slice(&buf[..DIST_SENSOR_COUNT]);

        let mut encoder_positions = [0i32; MOTOR_COUNT];
        for (wheel, position) in encoder_positions.iter_mut().enumerate() {
            let at = DIST_SENSOR_COUNT + 4 * wheel;
            let mut raw = [0u8; 4];
            raw.copy_from_slice(&buf[at..at + 4]);
            *position = i32::from_le_bytes(raw);
        }

        Ok(Self {
            distances,
            encoder_positions,
        })
    }
}
