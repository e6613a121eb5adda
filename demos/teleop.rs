// Keyboard teleop: W advance, A/D turn left/right, S turn 180, Space stop,
// H halt, T toggle sprint, [/] left drift bias, Q quit
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use std::time::{Duration, Instant};
use tracing::info;

use micromouse_runtime::config::TOPIC_CMD_MOTION;
use micromouse_runtime::messages::MotionCommand;
use micromouse_runtime::motor::WheelSide;

const KEEPALIVE_MS: u64 = 200; // Re-send advance so the runtime watchdog stays fed
const BIAS_STEP: i16 = 5;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;
    let publisher = session.declare_publisher(TOPIC_CMD_MOTION).await?;

    info!("Controls: W=advance, A/D=turn, S=180, Space=stop, H=halt, T=sprint, [/]=bias, Q=quit");

    enable_raw_mode()?;
    let result = run_teleop(&publisher).await;
    disable_raw_mode()?;

    result
}

async fn run_teleop(
    publisher: &zenoh::pubsub::Publisher<'_>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut sprint = false;
    let mut left_bias: i16 = 0;
    let mut advancing = false;
    let mut last_sent = Instant::now();

    loop {
        let mut cmd = None;

        // Poll for key with 20ms timeout
        if event::poll(Duration::from_millis(20))? {
            if let Event::Key(KeyEvent { code, kind, .. }) = event::read()? {
                if kind != KeyEventKind::Press {
                    continue;
                }

                cmd = match code {
                    KeyCode::Char('w') => {
                        advancing = true;
                        Some(MotionCommand::Advance)
                    }
                    KeyCode::Char('a') => {
                        advancing = false;
                        Some(MotionCommand::TurnLeft90)
                    }
                    KeyCode::Char('d') => {
                        advancing = false;
                        Some(MotionCommand::TurnRight90)
                    }
                    KeyCode::Char('s') => {
                        advancing = false;
                        Some(MotionCommand::Turn180)
                    }
                    KeyCode::Char(' ') => {
                        advancing = false;
                        Some(MotionCommand::Stop)
                    }
                    KeyCode::Char('h') => {
                        advancing = false;
                        Some(MotionCommand::Halt)
                    }
                    KeyCode::Char('t') => {
                        sprint = !sprint;
                        info!("Sprint: {}", if sprint { "ON" } else { "OFF" });
                        Some(MotionCommand::SetSprint { enabled: sprint })
                    }
                    KeyCode::Char('[') | KeyCode::Char(']') => {
                        left_bias = step_bias(left_bias, code == KeyCode::Char(']'));
                        info!("Left bias: {:+}", left_bias);
                        Some(MotionCommand::SetCorrection {
                            side: WheelSide::Left,
                            bias: left_bias,
                        })
                    }

                    // Quit
                    KeyCode::Char('q') | KeyCode::Esc => {
                        publisher
                            .put(serde_json::to_string(&MotionCommand::Halt)?)
                            .await?;
                        break;
                    }

                    _ => None,
                };
            }
        }

        if cmd.is_none() && advancing && last_sent.elapsed() > Duration::from_millis(KEEPALIVE_MS) {
            cmd = Some(MotionCommand::Advance);
        }

        if let Some(cmd) = cmd {
            publisher.put(serde_json::to_string(&cmd)?).await?;
            last_sent = Instant::now();
        }
    }

    Ok(())
}

/// Nudge the drift bias by one step, saturating at the i16 range
fn step_bias(bias: i16, up: bool) -> i16 {
    if up {
        bias.saturating_add(BIAS_STEP)
    } else {
        bias.saturating_sub(BIAS_STEP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_bias_saturates() {
        assert_eq!(step_bias(0, true), BIAS_STEP);
        assert_eq!(step_bias(0, false), -BIAS_STEP);
        assert_eq!(step_bias(i16::MAX - 1, true), i16::MAX);
        assert_eq!(step_bias(i16::MIN + 1, false), i16::MIN);
    }
}
