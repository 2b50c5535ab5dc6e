// 50 Hz control loop with a staleness watchdog
//
// The loop cadence comes from a wall-clock interval, not from inbound
// traffic: a tick with no datagrams re-drives the motors with the last
// applied setpoints. The watchdog only raises the health flag and warns;
// stale setpoints stay in force.

use std::io;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::config::{CMD_TIMEOUT, DIST_SENSOR_COUNT, LOOP_HZ, MAX_DUTY, MOTOR_COUNT, Tuning};
use crate::control::{Gains, Pid, VelocityEstimator};
use crate::hardware::{DriveChannels, EncoderBank, RangeSensors};
use crate::motor::{MotorDriver, MotorError};
use crate::protocol::{CommandFrame, Direction, TelemetryFrame, DIST_NO_TARGET};

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("socket error: {0}")]
    Socket(#[from] io::Error),

    #[error("motor fault: {0}")]
    Motor(#[from] MotorError),
}

/// Health status of the command link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeHealth {
    Ok,
    CmdStale,
}

/// Last applied target for one wheel.
#[derive(Debug, Clone, Copy)]
struct Setpoint {
    speed: f64,
    direction: Direction,
}

impl Default for Setpoint {
    fn default() -> Self {
        // Zero speed brakes the wheel, so the direction is inert until the
        // first command arrives.
        Self {
            speed: 0.0,
            direction: Direction::Forward,
        }
    }
}

/// The whole control state: regulators, setpoints, estimator shadows, and
/// the change-detection / watchdog bookkeeping. Owned by the loop, passed
/// through explicit methods, never ambient.
pub struct Runtime<C, E, R>
where
    C: DriveChannels,
    E: EncoderBank,
    R: RangeSensors,
{
    driver: MotorDriver<C>,
    encoders: E,
    rangers: R,
    tuning: Tuning,
    pids: [Pid; MOTOR_COUNT],
    setpoints: [Setpoint; MOTOR_COUNT],
    estimator: VelocityEstimator,
    last_applied: Option<CommandFrame>,
    cmd_received_at: Instant,
    health: RuntimeHealth,
}

impl<C, E, R> Runtime<C, E, R>
where
    C: DriveChannels,
    E: EncoderBank,
    R: RangeSensors,
{
    pub fn new(driver: MotorDriver<C>, encoders: E, rangers: R, tuning: Tuning) -> Self {
        let gains = Gains::from(&tuning);
        let estimator = VelocityEstimator::new(tuning.ticks_per_unit);
        Self {
            driver,
            encoders,
            rangers,
            tuning,
            pids: [(); MOTOR_COUNT].map(|_| Pid::new(gains)),
            setpoints: [Setpoint::default(); MOTOR_COUNT],
            estimator,
            last_applied: None,
            cmd_received_at: Instant::now(),
            health: RuntimeHealth::CmdStale, // Start stale until first cmd
        }
    }

    pub fn health(&self) -> RuntimeHealth {
        self.health
    }

    /// Process an incoming, already validated command frame.
    ///
    /// Identical to the last applied frame means nothing to do beyond
    /// refreshing the watchdog. A changed frame rewrites every setpoint,
    /// and each wheel commanded to exactly zero gets a fresh regulator so
    /// accumulated windup cannot leak into the next motion.
    pub fn on_command(&mut self, frame: CommandFrame) {
        self.cmd_received_at = Instant::now();
        self.health = RuntimeHealth::Ok;

        if self.last_applied == Some(frame) {
            return;
        }
        info!("New drive command: {:?}", frame.as_bytes());
        self.last_applied = Some(frame);

        let gains = Gains::from(&self.tuning);
        for wheel in 0..MOTOR_COUNT {
            let speed = frame.setpoint(wheel, self.tuning.max_wheel_speed);
            self.setpoints[wheel] = Setpoint {
                speed,
                direction: frame.direction(wheel),
            };
            if speed == 0.0 {
                self.pids[wheel] = Pid::new(gains);
            }
        }
    }

    /// Snapshot sensors and encoders for a telemetry reply. Missing data
    /// becomes a sentinel (255 distance, 0 position); the frame size never
    /// varies.
    pub fn telemetry(&self) -> TelemetryFrame {
        let mut distances = [DIST_NO_TARGET; DIST_SENSOR_COUNT];
        for (slot, distance) in distances.iter_mut().enumerate() {
            if let Some(sample) = self.rangers.sample(slot) {
                *distance = sample;
            }
        }

        let mut encoder_positions = [0i32; MOTOR_COUNT];
        for (wheel, position) in encoder_positions.iter_mut().enumerate() {
            if let Some(ticks) = self.encoders.position(wheel) {
                *position = ticks;
            }
        }

        TelemetryFrame {
            distances,
            encoder_positions,
        }
    }

    /// One control tick: estimate each wheel's speed, regulate, clamp to
    /// the duty range, and drive. Runs whether or not a command arrived
    /// this tick.
    pub fn tick(&mut self, dt: f64) -> Result<(), MotorError> {
        if self.health == RuntimeHealth::Ok && self.cmd_received_at.elapsed() > CMD_TIMEOUT {
            warn!(
                "Command stale ({:?} old), re-driving last setpoints",
                self.cmd_received_at.elapsed()
            );
            self.health = RuntimeHealth::CmdStale;
        }

        for wheel in 0..MOTOR_COUNT {
            let measured = match self.encoders.position(wheel) {
                Some(position) => self.estimator.estimate(wheel, position, dt),
                None => 0.0,
            };

            let setpoint = self.setpoints[wheel];
            let output = self.pids[wheel].compute(setpoint.speed, measured);
            let magnitude = output.clamp(0.0, f64::from(MAX_DUTY)) as u16;
            self.driver
                .drive(wheel, magnitude, setpoint.direction, false)?;
        }
        Ok(())
    }
}

/// Run the control loop on an already bound command socket.
///
/// Socket bring-up (bind address, port) belongs to the caller; everything
/// after that, including replies to each well-formed command frame, happens
/// here. Returns only on a socket failure or a motor fault.
pub async fn run<C, E, R>(
    socket: UdpSocket,
    mut runtime: Runtime<C, E, R>,
) -> Result<(), RuntimeError>
where
    C: DriveChannels,
    E: EncoderBank,
    R: RangeSensors,
{
    info!(
        "Runtime started: {}Hz loop on {}, {}ms staleness warning",
        LOOP_HZ,
        socket.local_addr()?,
        CMD_TIMEOUT.as_millis()
    );

    let mut tick = interval(Duration::from_millis(1000 / LOOP_HZ));
    let mut previous = Instant::now();
    let mut buf = [0u8; 64];

    loop {
        tick.tick().await;

        let now = Instant::now();
        let dt = now.duration_since(previous).as_secs_f64();
        previous = now;

        // 1. Drain every datagram queued since the last tick (non-blocking)
        loop {
            let (len, peer) = match socket.try_recv_from(&mut buf) {
                Ok(received) => received,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => return Err(RuntimeError::Socket(e)),
            };

            let frame = match CommandFrame::parse(&buf[..len]) {
                Ok(frame) => frame,
                Err(e) => {
                    // Framing guard: drop the packet, no reply, no state change
                    debug!("Dropping datagram from {}: {}", peer, e);
                    continue;
                }
            };

            // Reply first so telemetry reflects the pre-command state,
            // then apply. A failed send is logged and forgotten.
            let reply = runtime.telemetry().encode();
            if let Err(e) = socket.send_to(&reply, peer).await {
                warn!("Failed to send telemetry to {}: {}", peer, e);
            }

            runtime.on_command(frame);
        }

        // 2. Estimate, regulate, drive (also when no command arrived)
        runtime.tick(dt)?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::bench::{FixedRangers, RecordingChannels, ScriptedEncoders};

    const DT: f64 = 0.02; // 50 Hz

    struct Bench {
        runtime: Runtime<RecordingChannels, ScriptedEncoders, FixedRangers>,
        channels: RecordingChannels,
        encoders: ScriptedEncoders,
    }

    fn bench() -> Bench {
        let channels = RecordingChannels::new();
        let encoders = ScriptedEncoders::new();
        let driver = MotorDriver::new(channels.clone());
        let runtime = Runtime::new(
            driver,
            encoders.clone(),
            FixedRangers::new(),
            Tuning::default(),
        );
        Bench {
            runtime,
            channels,
            encoders,
        }
    }

    fn frame(speeds: [u8; 3]) -> CommandFrame {
        CommandFrame::new(
            speeds,
            [Direction::Forward, Direction::Reverse, Direction::Forward],
        )
    }

    #[test]
    fn idle_runtime_brakes_all_wheels() {
        let mut b = bench();
        b.runtime.tick(DT).unwrap();
        for wheel in 0..MOTOR_COUNT {
            assert_eq!(b.channels.duty(wheel), (MAX_DUTY, MAX_DUTY));
        }
    }

    #[test]
    fn command_drives_wheels_in_commanded_directions() {
        let mut b = bench();
        b.runtime.on_command(frame([100, 100, 0]));
        b.runtime.tick(DT).unwrap();

        let (in1, in2) = b.channels.duty(0);
        assert!(in1 > 0 && in2 == 0, "wheel 0 should drive forward");
        let (in1, in2) = b.channels.duty(1);
        assert!(in1 == 0 && in2 > 0, "wheel 1 should drive reverse");
        assert_eq!(b.channels.duty(2), (MAX_DUTY, MAX_DUTY), "wheel 2 braked");
    }

    #[test]
    fn duplicate_command_does_not_reset_regulators() {
        let mut b = bench();
        b.runtime.on_command(frame([100, 100, 100]));

        // Wheels stationary: error is constant, so the integral grows
        // every tick and so does the duty.
        b.runtime.tick(DT).unwrap();
        let first = b.channels.duty(0).0;

        b.runtime.on_command(frame([100, 100, 100]));
        b.runtime.tick(DT).unwrap();
        let second = b.channels.duty(0).0;

        assert!(
            second > first,
            "integral should keep accumulating across a duplicate command ({first} -> {second})"
        );
    }

    #[test]
    fn changed_command_with_zero_speed_resets_that_regulator() {
        let mut b = bench();
        b.runtime.on_command(frame([100, 100, 100]));
        for _ in 0..10 {
            b.runtime.tick(DT).unwrap();
        }

        // All-stop: every wheel gets a fresh regulator and a zero setpoint,
        // so the next tick computes zero output -> hard brake.
        b.runtime.on_command(frame([0, 0, 0]));
        b.runtime.tick(DT).unwrap();
        for wheel in 0..MOTOR_COUNT {
            assert_eq!(b.channels.duty(wheel), (MAX_DUTY, MAX_DUTY));
        }

        // And the regulators really are fresh: commanding motion again
        // produces the same duty as the very first tick did.
        let mut reference = bench();
        reference.runtime.on_command(frame([100, 100, 100]));
        reference.runtime.tick(DT).unwrap();

        b.runtime.on_command(frame([100, 100, 100]));
        b.runtime.tick(DT).unwrap();
        assert_eq!(b.channels.duty(0), reference.channels.duty(0));
    }

    #[test]
    fn tick_without_traffic_redrives_last_setpoints() {
        let mut b = bench();
        b.runtime.on_command(frame([100, 0, 0]));
        b.runtime.tick(DT).unwrap();

        // Hardware write from the first tick, then poke the channels to
        // prove the next silent tick writes them again.
        let mut channels = b.channels.clone();
        channels.set_duty(0, 1, 1);

        b.runtime.tick(DT).unwrap();
        let (in1, in2) = b.channels.duty(0);
        assert!(in1 > 0 && in2 == 0, "silent tick must re-drive the wheel");
    }

    #[test]
    fn measured_speed_feeds_back_into_the_loop() {
        let mut b = bench();
        b.runtime.on_command(frame([100, 100, 100]));
        b.runtime.tick(DT).unwrap();
        let stalled = b.channels.duty(0).0;

        // Spin the wheel past the setpoint: error goes negative, output
        // clamps at zero, and zero magnitude means hard brake.
        b.encoders.advance(0, 100_000);
        b.runtime.tick(DT).unwrap();
        assert_eq!(b.channels.duty(0), (MAX_DUTY, MAX_DUTY));
        assert!(stalled > 0);
    }

    #[test]
    fn disconnected_encoder_reads_as_stationary() {
        let mut b = bench();
        b.encoders.disconnect(1);
        b.runtime.on_command(frame([0, 100, 0]));
        b.runtime.tick(DT).unwrap();
        // Wheel 1 still gets driven from a zero measurement.
        let (in1, in2) = b.channels.duty(1);
        assert!(in1 == 0 && in2 > 0);
    }

    #[test]
    fn health_goes_stale_without_traffic_but_setpoints_hold() {
        let mut b = bench();
        b.runtime.on_command(frame([100, 0, 0]));
        assert_eq!(b.runtime.health(), RuntimeHealth::Ok);

        // Pretend the last command is older than the watchdog threshold.
        b.runtime.cmd_received_at = Instant::now() - (CMD_TIMEOUT + Duration::from_millis(50));
        b.runtime.tick(DT).unwrap();
        assert_eq!(b.runtime.health(), RuntimeHealth::CmdStale);

        let (in1, _) = b.channels.duty(0);
        assert!(in1 > 0, "stale link must not stop the wheel");

        b.runtime.on_command(frame([100, 0, 0]));
        assert_eq!(b.runtime.health(), RuntimeHealth::Ok);
    }

    #[test]
    fn telemetry_substitutes_sentinels() {
        let b = bench();
        b.encoders.set_position(0, 1000);
        b.encoders.set_position(1, -500);
        b.encoders.disconnect(2);

        let telemetry = b.runtime.telemetry();
        // FixedRangers leaves slots 1 and 7 empty -> 255 sentinel.
        assert_eq!(telemetry.distances, [13, 255, 13, 0, 0, 13, 13, 255]);
        assert_eq!(telemetry.encoder_positions, [1000, -500, 0]);
    }

    #[tokio::test]
    async fn replies_telemetry_to_well_formed_frames_only() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let server_addr = server.local_addr().unwrap();

        let b = bench();
        b.encoders.set_position(0, 42);
        let loop_task = tokio::spawn(run(server, b.runtime));

        let station = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        station.connect(server_addr).await.unwrap();

        // Malformed (6 bytes): must be dropped without a reply.
        station.send(&[0u8; 6]).await.unwrap();
        // Well-formed: must be answered with telemetry.
        station
            .send(frame([0, 0, 0]).as_bytes())
            .await
            .unwrap();

        let mut buf = [0u8; 64];
        let len = tokio::time::timeout(Duration::from_secs(2), station.recv(&mut buf))
            .await
            .expect("expected a telemetry reply")
            .unwrap();

        let telemetry = TelemetryFrame::parse(&buf[..len]).unwrap();
        assert_eq!(telemetry.encoder_positions[0], 42);

        // No second reply queued: the malformed datagram went unanswered.
        let extra =
            tokio::time::timeout(Duration::from_millis(200), station.recv(&mut buf)).await;
        assert!(extra.is_err(), "malformed datagram must not be answered");

        loop_task.abort();
    }
}
