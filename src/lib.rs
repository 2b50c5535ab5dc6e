// Velocity runtime for a three-wheel drive base: decodes command frames
// arriving over UDP, closes a per-wheel PID speed loop on encoder feedback,
// and replies with ranging/encoder telemetry.

pub mod config;
pub mod control;
pub mod hardware;
pub mod motor;
pub mod protocol;
pub mod runtime;
