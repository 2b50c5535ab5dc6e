// Keyboard teleop: W/S drive all wheels forward/reverse, R/F speed, Q quit
//
// Sends 7-byte command frames to the runtime at ~50 Hz; releasing the keys
// (no input for INPUT_TIMEOUT_MS) falls back to an all-stop frame.
//
// Usage: cargo run --example teleop -- [addr]
// Example: cargo run --example teleop -- 192.168.4.1:20001

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tracing::info;

use triwheel_udp_runtime::protocol::{CommandFrame, Direction};

const SPEED_BYTES: [u8; 3] = [40, 120, 255]; // LOW, MED, HIGH
const INPUT_TIMEOUT_MS: u64 = 100; // All-stop after this much time with no input

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let target = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:20001".to_string());

    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    socket.connect(&target).await?;
    info!("Sending command frames to {}", target);

    info!("Controls: W/S=forward/reverse, R/F=speed, Q=quit");
    info!("Speed: LOW");

    enable_raw_mode()?;
    let result = run_teleop(&socket).await;
    disable_raw_mode()?;

    result
}

async fn run_teleop(socket: &UdpSocket) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut speed_idx: usize = 0;

    // Persistent drive state
    let mut speed: u8 = 0;
    let mut direction = Direction::Forward;
    let mut last_movement_input = Instant::now();

    loop {
        // Poll for key with 20ms timeout (50Hz effective rate)
        if event::poll(Duration::from_millis(20))? {
            if let Event::Key(KeyEvent { code, kind, .. }) = event::read()? {
                let pressed = kind == KeyEventKind::Press || kind == KeyEventKind::Repeat;

                match code {
                    // Movement - update drive state and refresh timestamp
                    KeyCode::Char('w') if pressed => {
                        speed = SPEED_BYTES[speed_idx];
                        direction = Direction::Forward;
                        last_movement_input = Instant::now();
                    }
                    KeyCode::Char('s') if pressed => {
                        speed = SPEED_BYTES[speed_idx];
                        direction = Direction::Reverse;
                        last_movement_input = Instant::now();
                    }

                    // Speed control
                    KeyCode::Char('r') if pressed => {
                        speed_idx = (speed_idx + 1).min(2);
                        print_speed(speed_idx);
                    }
                    KeyCode::Char('f') if pressed => {
                        speed_idx = speed_idx.saturating_sub(1);
                        print_speed(speed_idx);
                    }

                    // Quit
                    KeyCode::Char('q') | KeyCode::Esc if pressed => break,

                    _ => {}
                }
            }
        }

        // All-stop if no movement input for INPUT_TIMEOUT_MS
        if last_movement_input.elapsed() > Duration::from_millis(INPUT_TIMEOUT_MS) {
            speed = 0;
        }

        // Always publish at ~50Hz; the runtime's change detection makes
        // repeated identical frames cheap.
        let frame = CommandFrame::new([speed; 3], [direction; 3]);
        socket.send(frame.as_bytes()).await?;

        // Telemetry replies land on this socket too; drain without blocking
        // so the receive buffer stays empty.
        let mut scratch = [0u8; 64];
        while socket.try_recv(&mut scratch).is_ok() {}
    }

    // Leave the base stopped
    let stop = CommandFrame::new([0; 3], [Direction::Forward; 3]);
    socket.send(stop.as_bytes()).await?;

    Ok(())
}

fn print_speed(idx: usize) {
    let label = ["LOW", "MED", "HIGH"][idx];
    info!("Speed: {}", label);
}
