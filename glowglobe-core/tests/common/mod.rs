#![allow(dead_code)]

use glowglobe_core::gateway::{DeviceGateway, RobotCommand, RobotId, Subscription, TransportError};
use glowglobe_core::session::{SessionConfig, SessionController};

pub const ROBOT: RobotId = RobotId::new(1);

/// Everything a session asked of the gateway, in order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Call {
    Send(RobotId, RobotCommand),
    Subscribe(RobotId),
    Unsubscribe(Subscription),
    Disconnect(RobotId),
}

#[derive(Default)]
pub struct RecordingGateway {
    pub calls: Vec<Call>,
    /// Commands matching this predicate are rejected.
    pub reject: Option<fn(&RobotCommand) -> bool>,
    pub next_subscription: u32,
}

impl RecordingGateway {
    pub fn commands(&self) -> Vec<RobotCommand> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::Send(_, command) => Some(*command),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, command: &RobotCommand) -> usize {
        self.commands().iter().filter(|sent| *sent == command).count()
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }
}

impl DeviceGateway for RecordingGateway {
    fn send(&mut self, robot: RobotId, command: RobotCommand) -> Result<(), TransportError> {
        if self.reject.is_some_and(|reject| reject(&command)) {
            return Err(TransportError::Rejected);
        }
        self.calls.push(Call::Send(robot, command));
        Ok(())
    }

    fn subscribe(&mut self, robot: RobotId) -> Result<Subscription, TransportError> {
        self.calls.push(Call::Subscribe(robot));
        self.next_subscription += 1;
        Ok(Subscription::new(robot, self.next_subscription))
    }

    fn unsubscribe(&mut self, subscription: Subscription) -> Result<(), TransportError> {
        self.calls.push(Call::Unsubscribe(subscription));
        Ok(())
    }

    fn disconnect(&mut self, robot: RobotId) {
        self.calls.push(Call::Disconnect(robot));
    }
}

pub fn bound_session() -> SessionController<RecordingGateway> {
    let mut session = SessionController::new(RecordingGateway::default(), SessionConfig::DEFAULT);
    session.bind(ROBOT);
    session
}

/// Asserts that `command` calibrates towards `degrees`, within float noise.
pub fn assert_calibrates_to(command: Option<&RobotCommand>, degrees: f32) {
    match command {
        Some(RobotCommand::Calibrate { heading, speed }) => {
            assert!(
                (heading.degrees() - degrees).abs() < 1e-3,
                "calibrated to {heading}, expected {degrees}"
            );
            assert!(speed.abs() < f32::EPSILON);
        }
        other => panic!("expected calibrate, got {other:?}"),
    }
}
