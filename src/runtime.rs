// Fixed-rate loop: poll maneuvers, apply commands, watchdog, publish state
// Note: the watchdog only halts straight-line runs; turns end on their own timer

use std::time::{Duration, Instant};
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::config::{CMD_TIMEOUT, LOOP_HZ, TOPIC_CMD_MOTION, TOPIC_HEALTH, TOPIC_STATE_MOTION};
use crate::messages::{MotionCommand, MotionReport, RuntimeHealth};
use crate::motion::{Maneuver, MotionController, MotionError};
use crate::motor::{MotorDriver, MotorState, WheelSide};

pub struct Runtime<D: MotorDriver> {
    controller: MotionController<D>,
    cmd_received_at: Option<Instant>,
    health: RuntimeHealth,
}

impl<D: MotorDriver> Runtime<D> {
    pub fn new(controller: MotionController<D>) -> Self {
        Self {
            controller,
            cmd_received_at: None,
            health: RuntimeHealth::CmdStale, // Start stale until first cmd
        }
    }

    pub fn controller(&self) -> &MotionController<D> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut MotionController<D> {
        &mut self.controller
    }

    pub fn health(&self) -> RuntimeHealth {
        self.health
    }

    /// Apply one incoming command
    pub fn on_command(&mut self, cmd: MotionCommand, now: Instant) -> Result<(), MotionError> {
        info!("Received command: {:?}", &cmd);
        self.cmd_received_at = Some(now);

        let ctrl = &mut self.controller;
        match cmd {
            MotionCommand::Init => ctrl.init(),
            MotionCommand::Advance => ctrl.advance(now).map(|_| ()),
            MotionCommand::Stop => ctrl.stop(now),
            MotionCommand::Halt => ctrl.halt().map(|_| ()),
            MotionCommand::TurnRight90 => ctrl.begin(Maneuver::TurnRight90, now).map(|_| ()),
            MotionCommand::TurnLeft90 => ctrl.begin(Maneuver::TurnLeft90, now).map(|_| ()),
            MotionCommand::Turn180 => ctrl.begin(Maneuver::Turn180, now).map(|_| ()),
            MotionCommand::SetSprint { enabled } => {
                ctrl.set_sprint_mode(enabled);
                Ok(())
            }
            MotionCommand::SetCorrection { side, bias } => {
                ctrl.set_correction(side, bias);
                Ok(())
            }
            MotionCommand::ClearFault => {
                ctrl.clear_fault();
                Ok(())
            }
        }
    }

    /// One loop iteration after commands were drained
    pub fn step(&mut self, now: Instant) -> MotionReport {
        if let Err(e) = self.controller.poll(now) {
            warn!("Maneuver completion failed: {}", e);
        }

        let cmd_age = self
            .cmd_received_at
            .map(|at| now.saturating_duration_since(at));
        let stale = cmd_age.is_none_or(|age| age > CMD_TIMEOUT);

        if stale && self.is_advancing() {
            // Watchdog triggered - stop the robot
            warn!("Command stale ({:?} old), halting robot", cmd_age.unwrap_or_default());
            if let Err(e) = self.controller.halt() {
                warn!("Watchdog halt failed: {}", e);
            }
        }

        self.health = if self.controller.fault().is_some() {
            RuntimeHealth::Fault
        } else if stale {
            RuntimeHealth::CmdStale
        } else {
            RuntimeHealth::Ok
        };

        self.controller.report(now)
    }

    /// Brake and leave the loop
    pub fn shutdown(&mut self) {
        if let Err(e) = self.controller.halt() {
            warn!("Failed to halt on shutdown: {}", e);
        }
    }

    fn is_advancing(&self) -> bool {
        self.controller.active_maneuver().is_none()
            && WheelSide::BOTH
                .iter()
                .all(|&side| self.controller.motor(side).state() == MotorState::Advancing)
    }
}

pub async fn run<D: MotorDriver>(
    controller: MotionController<D>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;

    info!("Setting up publishers and subscribers...");
    let subscriber = session.declare_subscriber(TOPIC_CMD_MOTION).await?;
    let pub_state = session.declare_publisher(TOPIC_STATE_MOTION).await?;
    let pub_health = session.declare_publisher(TOPIC_HEALTH).await?;

    let mut runtime = Runtime::new(controller);
    let mut tick = interval(Duration::from_millis(1000 / LOOP_HZ));

    info!(
        "Runtime started: {}Hz loop, {}ms watchdog timeout",
        LOOP_HZ,
        CMD_TIMEOUT.as_millis()
    );
    info!("Subscribed to: {}", TOPIC_CMD_MOTION);
    info!("Publishing to: {}, {}", TOPIC_STATE_MOTION, TOPIC_HEALTH);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = tick.tick() => {}
            _ = &mut shutdown => {
                info!("Shutdown requested, halting");
                runtime.shutdown();
                return Ok(());
            }
        }
        let now = Instant::now();

        // 1. Drain all pending commands (non-blocking), in arrival order.
        // A turn that is already due completes before the next command runs.
        while let Ok(Some(sample)) = subscriber.try_recv() {
            let payload = sample.payload().to_bytes();
            match serde_json::from_slice::<MotionCommand>(&payload) {
                Ok(cmd) => {
                    if let Err(e) = runtime.on_command(cmd, now) {
                        warn!("Command refused: {}", e);
                    }
                }
                Err(e) => {
                    warn!("Failed to parse command: {}", e);
                }
            }
        }

        // 2. Finish due turns, watchdog and health
        let report = runtime.step(now);
        debug!("{:?}", report);

        // 3. Publish state
        let report_json = serde_json::to_string(&report)?;
        pub_state.put(report_json).await?;

        // 4. Publish health
        let health_json = serde_json::to_string(&runtime.health())?;
        pub_health.put(health_json).await?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MotionConfig;
    use crate::motion::Heading;
    use crate::motor::SimMotorDriver;

    fn runtime() -> Runtime<SimMotorDriver> {
        let controller =
            MotionController::new(MotionConfig::default(), SimMotorDriver::new()).unwrap();
        Runtime::new(controller)
    }

    #[test]
    fn test_starts_stale() {
        let mut rt = runtime();
        rt.step(Instant::now());
        assert_eq!(rt.health(), RuntimeHealth::CmdStale);
    }

    #[test]
    fn test_watchdog_halts_stale_advance() {
        let mut rt = runtime();
        let t0 = Instant::now();
        rt.on_command(MotionCommand::Advance, t0).unwrap();
        rt.step(t0 + Duration::from_millis(100));
        assert_eq!(rt.health(), RuntimeHealth::Ok);
        assert_eq!(rt.controller().motor(WheelSide::Left).state(), MotorState::Advancing);

        rt.step(t0 + CMD_TIMEOUT + Duration::from_millis(1));
        assert_eq!(rt.health(), RuntimeHealth::CmdStale);
        for side in WheelSide::BOTH {
            assert_eq!(rt.controller().motor(side).state(), MotorState::Braking);
        }
    }

    #[test]
    fn test_watchdog_lets_turn_finish() {
        let mut rt = runtime();
        let t0 = Instant::now();
        rt.on_command(MotionCommand::Turn180, t0).unwrap();

        // Turn outlives the command timeout; it must complete, not be halted
        let report = rt.step(t0 + CMD_TIMEOUT + Duration::from_millis(1));
        assert_eq!(report.maneuver, Some(Maneuver::Turn180));

        let config = MotionConfig::default();
        let report = rt.step(t0 + config.turn_duration_180());
        assert_eq!(report.heading, Heading::South);
        assert_eq!(report.maneuver, None);
    }

    #[test]
    fn test_busy_command_refused() {
        let mut rt = runtime();
        let t0 = Instant::now();
        rt.on_command(MotionCommand::TurnRight90, t0).unwrap();
        let result = rt.on_command(MotionCommand::Advance, t0);
        assert!(matches!(result, Err(MotionError::Busy { .. })));

        rt.on_command(MotionCommand::Halt, t0).unwrap();
        assert_eq!(rt.controller().heading(), Heading::North);
    }

    #[test]
    fn test_command_uses_loop_clock() {
        let mut rt = runtime();
        let t0 = Instant::now() + Duration::from_secs(3600);
        rt.on_command(MotionCommand::TurnRight90, t0).unwrap();

        let due = t0 + MotionConfig::default().turn_duration_right90();
        rt.on_command(MotionCommand::Advance, due).unwrap();
        assert_eq!(rt.controller().heading(), Heading::East);
        assert_eq!(rt.controller().motor(WheelSide::Right).state(), MotorState::Advancing);
    }

    #[test]
    fn test_fault_health() {
        let mut rt = runtime();
        let t0 = Instant::now();
        rt.controller_mut().driver_mut().fail_side(WheelSide::Left);
        assert!(rt.on_command(MotionCommand::Advance, t0).is_err());
        let report = rt.step(t0);
        assert_eq!(rt.health(), RuntimeHealth::Fault);
        assert!(report.fault.is_some());

        rt.controller_mut().driver_mut().repair();
        rt.on_command(MotionCommand::ClearFault, t0).unwrap();
        rt.step(t0);
        assert_eq!(rt.health(), RuntimeHealth::Ok);
    }
}
