use std::path::PathBuf;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use micromouse_runtime::config::{MOTOR_PORT, MotionConfig};
use micromouse_runtime::motion::MotionController;
use micromouse_runtime::motor::{MotorDriver, SerialMotorDriver, SimMotorDriver};

#[derive(Parser)]
#[command(version, about = "Motion runtime for the micromouse base")]
struct Args {
    /// JSON calibration file (any subset of fields)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Serial port of the motor controller board
    #[arg(long, default_value = MOTOR_PORT)]
    port: String,

    /// Run without hardware, logging motor writes instead
    #[arg(long)]
    simulate: bool,
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init(); // installs the subscriber globally

    let args = Args::parse();

    if let Err(e) = start(args).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}

async fn start(args: Args) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = match &args.config {
        Some(path) => {
            info!("Loading motion config from {}", path.display());
            MotionConfig::from_file(path)?
        }
        None => MotionConfig::default(),
    };

    let driver: Box<dyn MotorDriver> = if args.simulate {
        warn!("Simulation mode: no motor hardware attached");
        Box::new(SimMotorDriver::new())
    } else {
        Box::new(SerialMotorDriver::open(&args.port)?)
    };

    let controller = MotionController::new(config, driver)?;
    micromouse_runtime::runtime::run(controller).await
}
