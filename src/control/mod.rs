// Closed-loop wheel speed control
//
// Provides:
// - Per-wheel PID regulation (fixed-timestep form, tuned gains)
// - Encoder-delta velocity estimation

mod estimator;
mod pid;

pub use estimator::VelocityEstimator;
pub use pid::{Gains, Pid};
