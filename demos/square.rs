// Drive a closed square on the simulated driver and print every motor write.
//
// Usage: cargo run --example square -- [cell_ms]

use std::time::{Duration, Instant};

use micromouse_runtime::config::MotionConfig;
use micromouse_runtime::motion::{Maneuver, MotionController};
use micromouse_runtime::motor::SimMotorDriver;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cell_ms: u64 = match std::env::args().nth(1) {
        Some(arg) => arg.parse()?,
        None => 300,
    };

    let mut ctrl = MotionController::new(MotionConfig::default(), SimMotorDriver::new())?;
    let start = ctrl.heading();

    for side in 1..=4 {
        ctrl.advance(Instant::now())?;
        tokio::time::sleep(Duration::from_millis(cell_ms)).await;
        ctrl.stop(Instant::now())?;

        let outcome = ctrl.execute(Maneuver::TurnRight90).await?;
        info!("Side {} done, now facing {:?}", side, outcome.heading);
    }

    println!("Start heading {:?}, end heading {:?}", start, ctrl.heading());
    println!("{} motor writes:", ctrl.driver().writes().len());
    for write in ctrl.driver().writes() {
        println!("  {:?} {:?} @ {}", write.side, write.state, write.speed);
    }
    Ok(())
}
