use std::net::IpAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::UdpSocket;
use tracing::info;
use tracing_subscriber::EnvFilter;

use triwheel_udp_runtime::config::{Tuning, UDP_PORT};
use triwheel_udp_runtime::hardware::bench::{FixedRangers, RecordingChannels, ScriptedEncoders};
use triwheel_udp_runtime::motor::MotorDriver;
use triwheel_udp_runtime::runtime::{run, Runtime};

/// Velocity runtime for the three-wheel base: UDP command frames in,
/// telemetry replies out, PID wheel-speed regulation in between.
#[derive(Parser)]
struct Args {
    /// Address to bind the command socket on
    #[arg(long, default_value = "0.0.0.0")]
    bind: IpAddr,

    /// UDP port to listen on
    #[arg(long, default_value_t = UDP_PORT)]
    port: u16,

    /// JSON file overriding the default drive-train tuning
    #[arg(long)]
    tuning: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init(); // installs the subscriber globally

    let args = Args::parse();

    let tuning = match &args.tuning {
        Some(path) => match Tuning::from_json_file(path) {
            Ok(tuning) => {
                info!("Loaded tuning overrides from {}", path.display());
                tuning
            }
            Err(e) => {
                eprintln!("Bad tuning file {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => Tuning::default(),
    };

    // The board support layer supplies the real DriveChannels / EncoderBank /
    // RangeSensors implementations; this binary wires up the bench set so the
    // wire protocol and the loop can be exercised without hardware.
    let driver = MotorDriver::new(RecordingChannels::new());
    let runtime = Runtime::new(
        driver,
        ScriptedEncoders::new(),
        FixedRangers::new(),
        tuning,
    );

    let socket = match UdpSocket::bind((args.bind, args.port)).await {
        Ok(socket) => socket,
        Err(e) => {
            eprintln!("Failed to bind {}:{}: {}", args.bind, args.port, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(socket, runtime).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
