//! Simulated robot behind the `DeviceGateway` seam
//!
//! The gateway half is owned by the session runtime; the console keeps a
//! [`RobotLink`] onto the same state to decide whether the robot would emit a
//! frame, to print what the robot received and to render `status`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use glowglobe_core::gateway::{
    DeviceGateway, Rgb, RobotCommand, RobotId, Subscription, TransportError,
};
use glowglobe_core::motion::Heading;
use glowglobe_core::repl::status::{RobotStatusProvider, RobotView};
use glowglobe_core::telemetry::TelemetryFrame;
use parking_lot::Mutex;

#[derive(Debug, Clone, Copy)]
struct Roll {
    heading: Heading,
    started: Instant,
    /// `None` rolls until stopped
    duration: Option<Duration>,
}

impl Roll {
    fn is_active(&self, now: Instant) -> bool {
        self.duration
            .is_none_or(|duration| now.saturating_duration_since(self.started) < duration)
    }
}

/// Robot state shared between the gateway and the console
#[derive(Debug)]
struct LinkState {
    robot: RobotId,
    connected: bool,
    subscription: Option<Subscription>,
    next_subscription: u32,
    light: Rgb,
    detection_enabled: bool,
    calibration: Heading,
    roll: Option<Roll>,
    /// Commands accepted since the console last looked
    outbox: Vec<RobotCommand>,
}

impl LinkState {
    fn apply(&mut self, command: RobotCommand) {
        match command {
            RobotCommand::SetLight(color) => self.light = color,
            RobotCommand::Roll {
                heading,
                duration_ms,
                ..
            } => {
                let absolute = self.calibration.degrees() + heading.degrees();
                self.roll = Some(Roll {
                    heading: Heading::from_degrees(absolute),
                    started: Instant::now(),
                    duration: (duration_ms > 0)
                        .then(|| Duration::from_millis(u64::from(duration_ms))),
                });
            }
            RobotCommand::Calibrate { heading, .. } => {
                self.calibration = heading;
                self.roll = None;
            }
            RobotCommand::Stop => self.roll = None,
            RobotCommand::ConfigureCollisionDetection(config) => {
                self.detection_enabled = config.is_enabled();
            }
            RobotCommand::DisableCollisionDetection => self.detection_enabled = false,
        }
        self.outbox.push(command);
    }
}

/// Gateway implementation driving the simulated robot
pub struct SimulatedRobot {
    state: Arc<Mutex<LinkState>>,
}

/// Console-side handle onto the simulated robot
#[derive(Clone)]
pub struct RobotLink {
    state: Arc<Mutex<LinkState>>,
}

impl SimulatedRobot {
    /// Creates a connected robot and the console's handle onto it
    pub fn connect(robot: RobotId) -> (Self, RobotLink) {
        log::info!("{robot} connected");
        let state = Arc::new(Mutex::new(LinkState {
            robot,
            connected: true,
            subscription: None,
            next_subscription: 0,
            light: Rgb::OFF,
            detection_enabled: false,
            calibration: Heading::ZERO,
            roll: None,
            outbox: Vec::new(),
        }));
        (
            Self {
                state: Arc::clone(&state),
            },
            RobotLink { state },
        )
    }
}

impl DeviceGateway for SimulatedRobot {
    fn send(&mut self, robot: RobotId, command: RobotCommand) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        if !state.connected {
            log::warn!("{robot} <- {command} refused: disconnected");
            return Err(TransportError::Disconnected);
        }
        if robot != state.robot {
            log::warn!("{robot} <- {command} refused: unknown robot");
            return Err(TransportError::Rejected);
        }

        log::info!("{robot} <- {command}");
        state.apply(command);
        Ok(())
    }

    fn subscribe(&mut self, robot: RobotId) -> Result<Subscription, TransportError> {
        let mut state = self.state.lock();
        if !state.connected {
            return Err(TransportError::Disconnected);
        }
        if robot != state.robot {
            return Err(TransportError::Rejected);
        }

        state.next_subscription += 1;
        let subscription = Subscription::new(robot, state.next_subscription);
        state.subscription = Some(subscription);
        log::debug!("{robot} subscription {} opened", subscription.id());
        Ok(subscription)
    }

    fn unsubscribe(&mut self, subscription: Subscription) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        if state.subscription != Some(subscription) {
            return Err(TransportError::Rejected);
        }
        state.subscription = None;
        log::debug!(
            "{} subscription {} closed",
            subscription.robot(),
            subscription.id()
        );
        Ok(())
    }

    fn disconnect(&mut self, robot: RobotId) {
        let mut state = self.state.lock();
        if robot == state.robot && state.connected {
            state.connected = false;
            state.subscription = None;
            state.roll = None;
            log::info!("{robot} disconnected");
        }
    }
}

impl RobotLink {
    /// Whether the robot would currently deliver `frame` to the controller
    pub fn emits(&self, frame: &TelemetryFrame) -> bool {
        let state = self.state.lock();
        let streaming = state.connected && state.subscription.is_some();
        match frame {
            TelemetryFrame::CollisionDetected(_) => streaming && state.detection_enabled,
            _ => streaming,
        }
    }

    /// Commands the robot accepted since the previous call
    pub fn take_outbox(&self) -> Vec<RobotCommand> {
        std::mem::take(&mut self.state.lock().outbox)
    }
}

impl RobotStatusProvider for RobotLink {
    fn robot_view(&self) -> Option<RobotView> {
        let state = self.state.lock();
        let now = Instant::now();
        Some(RobotView {
            robot: state.robot,
            connected: state.connected,
            subscribed: state.subscription.is_some(),
            light: state.light,
            detection_enabled: state.detection_enabled,
            rolling: state
                .roll
                .filter(|roll| roll.is_active(now))
                .map(|roll| roll.heading),
            calibration: state.calibration,
        })
    }
}
