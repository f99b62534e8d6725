//! Session controller: arming, collision handling and teardown.
//!
//! The controller owns every piece of mutable session state (phase, light,
//! motion state, subscription handle and the command sequencer) together with
//! the caller-supplied gateway. State is committed only after the gateway
//! accepted the corresponding request, so a failed call leaves the session in
//! its last consistent state.

use core::fmt;

use heapless::{HistoryBuf, OldestOrdered};
use log::{debug, info, warn};

use crate::gateway::{
    CollisionDetectionConfig, DeviceGateway, Rgb, RobotId, Subscription, TransportError,
};
use crate::motion::{self, Action, COLLISION_THRESHOLD, DecisionPath, Heading, MotionState};
use crate::sequencer::CommandSequencer;
use crate::sequences::{RollProfile, roll_script};
use crate::telemetry::{self, AsyncFrameKind, TelemetryFrame};

/// Number of session events retained for status rendering.
pub const JOURNAL_CAPACITY: usize = 16;

/// Tunables applied when a session is armed.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SessionConfig {
    /// Impact power magnitude above which a rolling robot is stopped.
    pub threshold: f32,
    pub roll: RollProfile,
    pub detection: CollisionDetectionConfig,
    pub light_on: Rgb,
    pub light_off: Rgb,
}

impl SessionConfig {
    pub const DEFAULT: Self = Self {
        threshold: COLLISION_THRESHOLD,
        roll: RollProfile::DEFAULT,
        detection: CollisionDetectionConfig::DEFAULT,
        light_on: Rgb::WHITE,
        light_off: Rgb::OFF,
    };
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum LightState {
    On,
    #[default]
    Off,
}

impl fmt::Display for LightState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LightState::On => f.write_str("on"),
            LightState::Off => f.write_str("off"),
        }
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum SessionPhase {
    #[default]
    Idle,
    Armed,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionPhase::Idle => f.write_str("idle"),
            SessionPhase::Armed => f.write_str("armed"),
        }
    }
}

/// Errors surfaced by session operations.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SessionError {
    /// No robot is bound to the session.
    NotConnected,
    /// The gateway refused a request.
    Transport(TransportError),
}

impl From<TransportError> for SessionError {
    fn from(err: TransportError) -> Self {
        SessionError::Transport(err)
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::NotConnected => f.write_str("no robot connected"),
            SessionError::Transport(err) => write!(f, "transport failure: {err}"),
        }
    }
}

/// What [`SessionController::handle_frame`] did with a frame.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum FrameOutcome {
    /// The frame carried no collision.
    Skipped(AsyncFrameKind),
    /// A collision arrived while the session was not armed.
    Ignored,
    /// A roll script was staged along `heading`.
    Rolled { heading: Heading, path: DecisionPath },
    /// The robot was stopped after a hard impact.
    Stopped { magnitude: f32 },
}

/// Entry kinds kept in the session journal.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum SessionEvent {
    Started(RobotId),
    Stopped,
    Rolled { heading: Heading, path: DecisionPath },
    Aborted { magnitude: f32 },
    FrameSkipped(AsyncFrameKind),
    CollisionIgnored,
    Failed(SessionError),
    Released(RobotId),
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionEvent::Started(robot) => write!(f, "started on {robot}"),
            SessionEvent::Stopped => f.write_str("stopped"),
            SessionEvent::Rolled { heading, path } => match path {
                DecisionPath::FellThrough => write!(f, "re-rolled {heading} (sub-threshold impact)"),
                _ => write!(f, "rolled {heading}"),
            },
            SessionEvent::Aborted { magnitude } => write!(f, "aborted at power {magnitude:.1}"),
            SessionEvent::FrameSkipped(kind) => write!(f, "skipped {kind} frame"),
            SessionEvent::CollisionIgnored => f.write_str("collision ignored while idle"),
            SessionEvent::Failed(err) => write!(f, "failed: {err}"),
            SessionEvent::Released(robot) => write!(f, "released {robot}"),
        }
    }
}

/// Journal entry stamped with a monotonically increasing sequence number.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct JournalEntry {
    pub seq: u32,
    pub event: SessionEvent,
}

pub type SessionJournal = HistoryBuf<JournalEntry, JOURNAL_CAPACITY>;

/// Point-in-time view of the session.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub armed: bool,
    pub state: MotionState,
    pub light: LightState,
    pub heading: Option<Heading>,
    pub robot: Option<RobotId>,
    pub subscribed: bool,
    pub detection_enabled: bool,
    pub pending_steps: usize,
}

/// Drives one robot from user requests and collision telemetry.
pub struct SessionController<G> {
    gateway: G,
    config: SessionConfig,
    robot: Option<RobotId>,
    subscription: Option<Subscription>,
    detection_enabled: bool,
    armed: bool,
    state: MotionState,
    light: LightState,
    heading: Option<Heading>,
    sequencer: CommandSequencer,
    /// Motion state and heading before the oldest undispatched roll.
    staged_from: Option<(MotionState, Option<Heading>)>,
    journal: SessionJournal,
    next_seq: u32,
}

impl<G> SessionController<G>
where
    G: DeviceGateway,
{
    #[must_use]
    pub fn new(gateway: G, config: SessionConfig) -> Self {
        Self {
            gateway,
            config,
            robot: None,
            subscription: None,
            detection_enabled: false,
            armed: false,
            state: MotionState::Waiting,
            light: LightState::Off,
            heading: None,
            sequencer: CommandSequencer::new(),
            staged_from: None,
            journal: HistoryBuf::new(),
            next_seq: 0,
        }
    }

    /// Binds `robot` to an idle session, returning the robot it replaced.
    ///
    /// Rebinding while armed is refused: the binding is left unchanged and
    /// the robot still bound is returned. Stop the session first.
    pub fn bind(&mut self, robot: RobotId) -> Option<RobotId> {
        if self.armed {
            warn!("ignoring bind to {robot}: session is armed");
            return self.robot;
        }
        info!("bound to {robot}");
        self.robot.replace(robot)
    }

    /// Stops the session and releases the robot's subscription, keeping the
    /// connection open.
    pub fn unbind(&mut self) -> Result<Option<RobotId>, SessionError> {
        self.release(false)
    }

    #[must_use]
    pub fn robot(&self) -> Option<RobotId> {
        self.robot
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        if self.armed {
            SessionPhase::Armed
        } else {
            SessionPhase::Idle
        }
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    #[must_use]
    pub fn state(&self) -> MotionState {
        self.state
    }

    #[must_use]
    pub fn light(&self) -> LightState {
        self.light
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    #[must_use]
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn gateway_mut(&mut self) -> &mut G {
        &mut self.gateway
    }

    /// Arms the session: subscribe, enable collision detection, light on.
    pub fn start(&mut self) -> Result<(), SessionError> {
        if self.armed {
            debug!("start ignored: already armed");
            return Ok(());
        }
        let robot = self.bound_robot()?;

        let result = self.arm(robot);
        match result {
            Ok(()) => {
                info!("session armed on {robot}");
                self.record(SessionEvent::Started(robot));
            }
            Err(err) => {
                warn!("failed to arm {robot}: {err}");
                self.record(SessionEvent::Failed(err));
            }
        }
        result
    }

    /// Disarms the session: stop the robot, disable detection, light off.
    pub fn stop(&mut self) -> Result<(), SessionError> {
        if !self.armed {
            debug!("stop ignored: session idle");
            return Ok(());
        }
        let robot = self.bound_robot()?;

        let result = self.disarm(robot);
        match result {
            Ok(()) => {
                info!("session stopped on {robot}");
                self.record(SessionEvent::Stopped);
            }
            Err(err) => {
                warn!("failed to stop {robot}: {err}");
                self.record(SessionEvent::Failed(err));
            }
        }
        result
    }

    /// Starts an idle session or stops an armed one.
    pub fn toggle(&mut self) -> Result<SessionPhase, SessionError> {
        if self.armed {
            self.stop()?;
        } else {
            self.start()?;
        }
        Ok(self.phase())
    }

    /// Stops the session, releases the subscription and disconnects.
    ///
    /// Safe to call repeatedly; later calls find nothing left to release.
    pub fn teardown(&mut self) -> Result<(), SessionError> {
        self.release(true).map(|_| ())
    }

    /// Feeds one asynchronous frame through the motion state machine.
    pub fn handle_frame(&mut self, frame: &TelemetryFrame) -> Result<FrameOutcome, SessionError> {
        let Some(event) = telemetry::decode(frame) else {
            let kind = frame.kind();
            debug!("skipping {kind} frame");
            self.record(SessionEvent::FrameSkipped(kind));
            return Ok(FrameOutcome::Skipped(kind));
        };

        if !self.armed {
            debug!("collision ignored while idle");
            self.record(SessionEvent::CollisionIgnored);
            return Ok(FrameOutcome::Ignored);
        }
        let robot = self.bound_robot()?;

        let transition = motion::on_collision(self.state, &event, self.config.threshold);
        debug!(
            "impact power {:.1} vs threshold {:.1} while {}",
            transition.magnitude, self.config.threshold, transition.from
        );

        match transition.action {
            Action::Roll { heading } => {
                if transition.path == DecisionPath::FellThrough {
                    info!("sub-threshold impact while moving, rolling again");
                }
                let ticket = self
                    .sequencer
                    .submit(roll_script(robot, heading, self.config.roll));
                debug!("{ticket} staged towards {heading}");

                if self.staged_from.is_none() {
                    self.staged_from = Some((transition.from, self.heading));
                }
                self.state = transition.to;
                self.heading = Some(heading);
                self.record(SessionEvent::Rolled {
                    heading,
                    path: transition.path,
                });
                Ok(FrameOutcome::Rolled {
                    heading,
                    path: transition.path,
                })
            }
            Action::Stop => {
                if let Err(err) = self.sequencer.cancel(&mut self.gateway, robot) {
                    warn!("stop after impact failed: {err}");
                    self.record(SessionEvent::Failed(err.into()));
                    return Err(err.into());
                }
                info!("impact power {:.1} stopped {robot}", transition.magnitude);
                self.staged_from = None;
                self.state = transition.to;
                self.record(SessionEvent::Aborted {
                    magnitude: transition.magnitude,
                });
                Ok(FrameOutcome::Stopped {
                    magnitude: transition.magnitude,
                })
            }
        }
    }

    /// Dispatches the staged roll script, returning the number of commands sent.
    pub fn flush(&mut self) -> Result<usize, SessionError> {
        match self.sequencer.flush(&mut self.gateway) {
            Ok(sent) => {
                self.staged_from = None;
                Ok(sent)
            }
            Err(err) => {
                // The roll never reached the robot; the previous one, if any,
                // is still running.
                if let Some((state, heading)) = self.staged_from.take() {
                    warn!("roll dispatch failed, back to {state}");
                    self.state = state;
                    self.heading = heading;
                }
                self.record(SessionEvent::Failed(err.into()));
                Err(err.into())
            }
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase(),
            armed: self.armed,
            state: self.state,
            light: self.light,
            heading: self.heading,
            robot: self.robot,
            subscribed: self.subscription.is_some(),
            detection_enabled: self.detection_enabled,
            pending_steps: self.sequencer.pending_steps(),
        }
    }

    /// Recent session events, oldest first.
    #[must_use]
    pub fn journal(&self) -> OldestOrdered<'_, JournalEntry> {
        self.journal.oldest_ordered()
    }

    #[must_use]
    pub fn last_event(&self) -> Option<&JournalEntry> {
        self.journal.recent()
    }

    fn bound_robot(&self) -> Result<RobotId, SessionError> {
        self.robot.ok_or(SessionError::NotConnected)
    }

    fn arm(&mut self, robot: RobotId) -> Result<(), SessionError> {
        // Left over from a robot bound earlier.
        if let Some(stale) = self.subscription.filter(|sub| sub.robot() != robot) {
            self.gateway.unsubscribe(stale)?;
            self.subscription = None;
        }
        if self.subscription.is_none() {
            self.subscription = Some(self.gateway.subscribe(robot)?);
        }

        self.gateway
            .configure_collision_detection(robot, self.config.detection)?;
        self.detection_enabled = self.config.detection.is_enabled();

        let Rgb { r, g, b } = self.config.light_on;
        if let Err(err) = self.gateway.set_light(robot, r, g, b) {
            // Idle sessions must not leave the robot reporting collisions.
            if self.detection_enabled {
                self.detection_enabled =
                    self.gateway.disable_collision_detection(robot).is_err();
            }
            return Err(err.into());
        }

        self.light = LightState::On;
        self.state = MotionState::Waiting;
        self.heading = None;
        self.staged_from = None;
        self.armed = true;
        Ok(())
    }

    fn disarm(&mut self, robot: RobotId) -> Result<(), SessionError> {
        self.sequencer.cancel(&mut self.gateway, robot)?;

        self.gateway.disable_collision_detection(robot)?;
        self.detection_enabled = false;

        let Rgb { r, g, b } = self.config.light_off;
        self.gateway.set_light(robot, r, g, b)?;

        self.clear_armed();
        Ok(())
    }

    fn clear_armed(&mut self) {
        self.light = LightState::Off;
        self.state = MotionState::Waiting;
        self.staged_from = None;
        self.armed = false;
    }

    /// Releases the bound robot even when the link refuses the stop,
    /// returning the first failure once everything local is cleared.
    fn release(&mut self, disconnect: bool) -> Result<Option<RobotId>, SessionError> {
        let Some(robot) = self.robot else {
            return Ok(None);
        };

        let mut failure = self.stop().err();
        if self.armed {
            warn!("forcing {robot} idle after a refused stop");
            self.clear_armed();
        }

        if self.detection_enabled {
            self.detection_enabled = false;
            if let Err(err) = self.gateway.disable_collision_detection(robot) {
                warn!("disabling collision detection on {robot} failed: {err}");
                self.record(SessionEvent::Failed(err.into()));
                failure = failure.or(Some(err.into()));
            }
        }

        let unsubscribed = self
            .subscription
            .take()
            .map(|subscription| self.gateway.unsubscribe(subscription));
        if let Some(Err(err)) = unsubscribed {
            warn!("unsubscribing from {robot} failed: {err}");
            self.record(SessionEvent::Failed(err.into()));
            failure = failure.or(Some(err.into()));
        }

        if disconnect {
            self.gateway.disconnect(robot);
        }

        self.robot = None;
        info!("released {robot}");
        self.record(SessionEvent::Released(robot));
        match failure {
            Some(err) => Err(err),
            None => Ok(Some(robot)),
        }
    }

    fn record(&mut self, event: SessionEvent) {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        self.journal.write(JournalEntry { seq, event });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::RobotCommand;
    use crate::telemetry::Axes;
    use heapless::Vec;

    #[derive(Default)]
    struct MockGateway {
        sent: Vec<RobotCommand, 32>,
        subscribes: u8,
        unsubscribes: u8,
        disconnects: u8,
        reject_lights: bool,
    }

    impl DeviceGateway for MockGateway {
        fn send(&mut self, _: RobotId, command: RobotCommand) -> Result<(), TransportError> {
            if self.reject_lights && matches!(command, RobotCommand::SetLight(_)) {
                return Err(TransportError::Rejected);
            }
            self.sent.push(command).map_err(|_| TransportError::QueueFull)
        }

        fn subscribe(&mut self, robot: RobotId) -> Result<Subscription, TransportError> {
            self.subscribes += 1;
            Ok(Subscription::new(robot, u32::from(self.subscribes)))
        }

        fn unsubscribe(&mut self, _: Subscription) -> Result<(), TransportError> {
            self.unsubscribes += 1;
            Ok(())
        }

        fn disconnect(&mut self, _: RobotId) {
            self.disconnects += 1;
        }
    }

    fn armed_session() -> SessionController<MockGateway> {
        let mut session = SessionController::new(MockGateway::default(), SessionConfig::DEFAULT);
        session.bind(RobotId::new(1));
        session.start().expect("start succeeds");
        session.gateway_mut().sent.clear();
        session
    }

    fn stops(session: &SessionController<MockGateway>) -> usize {
        session
            .gateway()
            .sent
            .iter()
            .filter(|command| **command == RobotCommand::Stop)
            .count()
    }

    #[test]
    fn start_subscribes_enables_detection_and_lights_up() {
        let mut session = SessionController::new(MockGateway::default(), SessionConfig::DEFAULT);
        session.bind(RobotId::new(1));
        session.start().expect("start succeeds");

        let snapshot = session.snapshot();
        assert!(snapshot.armed);
        assert!(snapshot.subscribed);
        assert!(snapshot.detection_enabled);
        assert_eq!(snapshot.light, LightState::On);
        assert_eq!(
            session.gateway().sent.as_slice(),
            &[
                RobotCommand::ConfigureCollisionDetection(CollisionDetectionConfig::DEFAULT),
                RobotCommand::SetLight(Rgb::WHITE),
            ]
        );
    }

    #[test]
    fn start_twice_subscribes_once() {
        let mut session = armed_session();
        session.start().expect("second start is a no-op");

        assert_eq!(session.gateway().subscribes, 1);
        assert!(session.gateway().sent.is_empty());
    }

    #[test]
    fn start_without_robot_reports_not_connected() {
        let mut session = SessionController::new(MockGateway::default(), SessionConfig::DEFAULT);

        assert_eq!(session.start(), Err(SessionError::NotConnected));
        assert_eq!(session.gateway().subscribes, 0);
        assert!(session.gateway().sent.is_empty());
    }

    #[test]
    fn failed_light_leaves_session_idle_and_dark() {
        let gateway = MockGateway {
            reject_lights: true,
            ..MockGateway::default()
        };
        let mut session = SessionController::new(gateway, SessionConfig::DEFAULT);
        session.bind(RobotId::new(1));

        assert_eq!(
            session.start(),
            Err(SessionError::Transport(TransportError::Rejected))
        );
        assert_eq!(session.phase(), SessionPhase::Idle);
        assert_eq!(session.light(), LightState::Off);
        assert!(!session.snapshot().detection_enabled);
        assert_eq!(
            session.gateway().sent.last(),
            Some(&RobotCommand::DisableCollisionDetection)
        );
    }

    #[test]
    fn bind_while_armed_keeps_current_robot() {
        let mut session = armed_session();

        assert_eq!(session.bind(RobotId::new(2)), Some(RobotId::new(1)));
        assert_eq!(session.robot(), Some(RobotId::new(1)));

        session.stop().expect("stop succeeds");
        assert_eq!(session.bind(RobotId::new(2)), Some(RobotId::new(1)));
        assert_eq!(session.robot(), Some(RobotId::new(2)));
    }

    #[test]
    fn stop_twice_sends_single_stop() {
        let mut session = armed_session();

        session.stop().expect("stop succeeds");
        session.stop().expect("second stop is a no-op");

        assert_eq!(stops(&session), 1);
        assert_eq!(session.light(), LightState::Off);
        assert!(session
            .gateway()
            .sent
            .contains(&RobotCommand::DisableCollisionDetection));
    }

    #[test]
    fn toggle_alternates_phases() {
        let mut session = SessionController::new(MockGateway::default(), SessionConfig::DEFAULT);
        session.bind(RobotId::new(1));

        assert_eq!(session.toggle(), Ok(SessionPhase::Armed));
        assert_eq!(session.light(), LightState::On);
        assert_eq!(session.toggle(), Ok(SessionPhase::Idle));
        assert_eq!(session.light(), LightState::Off);
    }

    #[test]
    fn collision_stages_roll_until_flushed() {
        let mut session = armed_session();

        let outcome = session
            .handle_frame(&TelemetryFrame::collision(Axes::new(1.0, 0.0), Axes::ZERO))
            .expect("frame handled");
        assert!(matches!(
            outcome,
            FrameOutcome::Rolled {
                path: DecisionPath::Launched,
                ..
            }
        ));
        assert_eq!(session.state(), MotionState::Moving);
        assert!(session.gateway().sent.is_empty());
        assert_eq!(session.snapshot().pending_steps, 2);

        assert_eq!(session.flush(), Ok(2));
        assert_eq!(session.snapshot().pending_steps, 0);
    }

    #[test]
    fn non_collision_frames_are_skipped() {
        let mut session = armed_session();

        assert_eq!(
            session.handle_frame(&TelemetryFrame::SensorData),
            Ok(FrameOutcome::Skipped(AsyncFrameKind::SensorData))
        );
        assert_eq!(session.state(), MotionState::Waiting);
    }

    #[test]
    fn teardown_releases_once() {
        let mut session = armed_session();

        session.teardown().expect("teardown succeeds");
        session.teardown().expect("second teardown is harmless");

        assert_eq!(session.gateway().unsubscribes, 1);
        assert_eq!(session.gateway().disconnects, 1);
        assert_eq!(session.robot(), None);
        assert!(!session.snapshot().subscribed);
    }

    #[test]
    fn unbind_keeps_connection_open() {
        let mut session = armed_session();

        assert_eq!(session.unbind(), Ok(Some(RobotId::new(1))));
        assert_eq!(session.gateway().unsubscribes, 1);
        assert_eq!(session.gateway().disconnects, 0);
        assert!(!session.is_armed());
    }

    #[test]
    fn journal_keeps_events_in_order() {
        let mut session = armed_session();
        session.stop().expect("stop succeeds");

        let events: Vec<SessionEvent, JOURNAL_CAPACITY> =
            session.journal().map(|entry| entry.event).collect();
        assert_eq!(
            events.as_slice(),
            &[SessionEvent::Started(RobotId::new(1)), SessionEvent::Stopped]
        );
    }
}
