// Timeouts, ports, and drive-train calibration
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

// Runtime loop frequency
pub const LOOP_HZ: u64 = 50;

// Command staleness threshold for the watchdog warning
pub const CMD_TIMEOUT: Duration = Duration::from_millis(250);

// UDP port the command socket listens on
pub const UDP_PORT: u16 = 20001;

pub const MOTOR_COUNT: usize = 3;
pub const DIST_SENSOR_COUNT: usize = 8;

// Largest duty the H-bridge channels accept. Anything above this reaching
// the mapper is a bug, not a value to clamp.
pub const MAX_DUTY: u16 = 65534;

// Enable hardware drive per wheel (set entries to false for bench testing)
pub const MOTORS_ENABLED: [bool; MOTOR_COUNT] = [true, true, true];

/// Drive-train tuning, overridable from a JSON file at startup.
///
/// The defaults match the tuned hardware: gains assume the loop runs at a
/// constant period, so changing `LOOP_HZ` means retuning them.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Tuning {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    /// Wheel speed a full-scale (255) command byte maps to, in speed units.
    pub max_wheel_speed: f64,
    /// Encoder ticks per speed unit (hardware calibration constant).
    pub ticks_per_unit: f64,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            kp: 3000.0,
            ki: 100.0,
            kd: 0.1,
            max_wheel_speed: 11.6,
            ticks_per_unit: 150.0,
        }
    }
}

#[derive(Debug, Error)]
pub enum TuningError {
    #[error("failed to read tuning file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse tuning file: {0}")]
    Parse(#[from] serde_json::Error),
}

impl Tuning {
    /// Load overrides from a JSON file. Absent fields keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, TuningError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}
