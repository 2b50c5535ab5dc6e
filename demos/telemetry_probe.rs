// Telemetry probe: MOVEMENT-SAFE check that the runtime is up and replying
//
// Sends a single all-stop command frame (every speed byte zero) and
// pretty-prints the telemetry reply. The only side effect on a live robot
// is braking wheels that were already commanded to move.
//
// Usage: cargo run --example telemetry_probe -- [addr]
// Example: cargo run --example telemetry_probe -- 192.168.4.1:20001

use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::timeout;

use triwheel_udp_runtime::config::{DIST_SENSOR_COUNT, MOTOR_COUNT};
use triwheel_udp_runtime::protocol::{CommandFrame, Direction, TelemetryFrame, DIST_NO_TARGET};

const WHEEL_NAMES: [&str; MOTOR_COUNT] = ["A", "B", "C"];
const REPLY_TIMEOUT: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Setup logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("debug".parse().unwrap()),
        )
        .init();

    // Get target from args or use default
    let target = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:20001".to_string());

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║            Base Telemetry Probe (all-stop frame)             ║");
    println!("╠══════════════════════════════════════════════════════════════╣");
    println!("║  Sends one zero-speed command - wheels brake, nothing moves  ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
    println!("Target: {}", target);
    println!();

    println!("Step 1: Opening socket...");
    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    socket.connect(&target).await?;
    println!("  ✓ Socket ready");
    println!();

    println!("Step 2: Sending all-stop command frame...");
    let frame = CommandFrame::new([0; MOTOR_COUNT], [Direction::Forward; MOTOR_COUNT]);
    socket.send(frame.as_bytes()).await?;
    println!("  ✓ Sent {} bytes", frame.as_bytes().len());
    println!();

    println!("Step 3: Waiting for telemetry reply...");
    let mut buf = [0u8; 64];
    let len = match timeout(REPLY_TIMEOUT, socket.recv(&mut buf)).await {
        Ok(Ok(len)) => len,
        Ok(Err(e)) => {
            println!("  ✗ Receive failed: {}", e);
            return Err(e.into());
        }
        Err(_) => {
            println!("  ✗ No reply within {:?}", REPLY_TIMEOUT);
            println!();
            println!("Troubleshooting:");
            println!("  - Is the runtime running on the target address?");
            println!("  - Check the robot is reachable (ping it)");
            println!("  - A firewall may be dropping UDP datagrams");
            return Ok(());
        }
    };
    println!("  ✓ Received {} bytes", len);
    println!();

    let telemetry = TelemetryFrame::parse(&buf[..len])?;

    println!("  === Ranging sensors ===");
    for slot in 0..DIST_SENSOR_COUNT {
        let value = telemetry.distances[slot];
        if value == DIST_NO_TARGET {
            println!("    Slot {}: no target", slot);
        } else {
            println!("    Slot {}: {}", slot, value);
        }
    }
    println!();

    println!("  === Encoders ===");
    for wheel in 0..MOTOR_COUNT {
        println!(
            "    Wheel {}: {} ticks",
            WHEEL_NAMES[wheel], telemetry.encoder_positions[wheel]
        );
    }
    println!();

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                      Probe Complete                          ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
    println!("If the distances and tick counts look sane:");
    println!("  1. Encoder ticks should be stable while the wheels are still");
    println!("  2. Covered sensors should read low, open slots 'no target'");
    println!();
    println!("Next step: drive it with 'cargo run --example teleop'");

    Ok(())
}
