mod common;

use common::{Call, ROBOT, RecordingGateway, bound_session};
use glowglobe_core::gateway::{RobotCommand, TransportError};
use glowglobe_core::motion::MotionState;
use glowglobe_core::session::{
    FrameOutcome, LightState, SessionConfig, SessionController, SessionError, SessionPhase,
};
use glowglobe_core::telemetry::{Axes, TelemetryFrame};

fn hard_impact() -> TelemetryFrame {
    TelemetryFrame::collision(Axes::new(0.0, 1.0), Axes::new(100.0, 100.0))
}

fn assert_light_follows_armed(session: &SessionController<RecordingGateway>) {
    assert_eq!(
        session.light() == LightState::On,
        session.is_armed(),
        "light {} while {}",
        session.light(),
        session.phase()
    );
}

#[test]
fn stop_twice_is_same_as_once() {
    let mut session = bound_session();
    session.start().expect("start succeeds");

    session.stop().expect("stop succeeds");
    let after_first = session.gateway().calls.clone();
    session.stop().expect("second stop is a no-op");

    assert_eq!(session.gateway().calls, after_first);
    assert_eq!(session.gateway().count(&RobotCommand::Stop), 1);
}

#[test]
fn light_tracks_armed_through_every_transition() {
    let mut session = bound_session();
    assert_light_follows_armed(&session);

    for _ in 0..3 {
        session.toggle().expect("toggle succeeds");
        assert_light_follows_armed(&session);
        session.handle_frame(&hard_impact()).expect("frame handled");
        session.flush().expect("flush succeeds");
        assert_light_follows_armed(&session);
    }

    session.teardown().expect("teardown succeeds");
    assert_light_follows_armed(&session);
}

#[test]
fn collisions_while_unarmed_change_nothing() {
    let mut session = bound_session();

    assert_eq!(session.handle_frame(&hard_impact()), Ok(FrameOutcome::Ignored));
    assert_eq!(session.flush(), Ok(0));
    assert_eq!(session.state(), MotionState::Waiting);
    assert!(session.gateway().calls.is_empty());

    session.start().expect("start succeeds");
    session.stop().expect("stop succeeds");
    session.gateway_mut().clear();

    assert_eq!(session.handle_frame(&hard_impact()), Ok(FrameOutcome::Ignored));
    assert_eq!(session.state(), MotionState::Waiting);
    assert!(session.gateway().calls.is_empty());
}

#[test]
fn failed_start_leaves_session_idle_and_dark() {
    let gateway = RecordingGateway {
        reject: Some(|command| matches!(command, RobotCommand::ConfigureCollisionDetection(_))),
        ..RecordingGateway::default()
    };
    let mut session = SessionController::new(gateway, SessionConfig::DEFAULT);
    session.bind(ROBOT);

    assert_eq!(
        session.start(),
        Err(SessionError::Transport(TransportError::Rejected))
    );
    assert_eq!(session.phase(), SessionPhase::Idle);
    assert_eq!(session.light(), LightState::Off);
    assert_eq!(session.handle_frame(&hard_impact()), Ok(FrameOutcome::Ignored));
}

#[test]
fn not_connected_is_reported_before_any_gateway_call() {
    let mut session = SessionController::new(RecordingGateway::default(), SessionConfig::DEFAULT);

    assert_eq!(session.start(), Err(SessionError::NotConnected));
    assert_eq!(session.toggle(), Err(SessionError::NotConnected));
    assert_eq!(session.stop(), Ok(()));
    assert_eq!(session.teardown(), Ok(()));
    assert!(session.gateway().calls.is_empty());
}

#[test]
fn teardown_twice_is_harmless() {
    let mut session = bound_session();
    session.start().expect("start succeeds");

    session.teardown().expect("teardown succeeds");
    let after_first = session.gateway().calls.clone();
    session.teardown().expect("second teardown succeeds");

    assert_eq!(session.gateway().calls, after_first);
    assert!(matches!(after_first.last(), Some(Call::Disconnect(robot)) if *robot == ROBOT));
    assert_eq!(
        after_first
            .iter()
            .filter(|call| matches!(call, Call::Unsubscribe(_)))
            .count(),
        1
    );
    assert_eq!(session.robot(), None);
}

#[test]
fn restart_reuses_subscription() {
    let mut session = bound_session();

    session.start().expect("start succeeds");
    session.stop().expect("stop succeeds");
    session.start().expect("restart succeeds");

    assert_eq!(
        session
            .gateway()
            .calls
            .iter()
            .filter(|call| matches!(call, Call::Subscribe(_)))
            .count(),
        1
    );
    assert!(session.snapshot().subscribed);
}

#[test]
fn refused_stop_keeps_session_armed_but_drops_staged_roll() {
    let mut session = bound_session();
    session.start().expect("start succeeds");
    session
        .handle_frame(&TelemetryFrame::collision(Axes::new(1.0, 0.0), Axes::ZERO))
        .expect("collision handled");

    session.gateway_mut().reject = Some(|command| matches!(command, RobotCommand::Stop));
    session.gateway_mut().clear();

    assert_eq!(
        session.stop(),
        Err(SessionError::Transport(TransportError::Rejected))
    );
    assert!(session.is_armed());
    assert_light_follows_armed(&session);
    assert_eq!(session.flush(), Ok(0));
    assert!(session.gateway().calls.is_empty());
}

#[test]
fn teardown_releases_link_even_when_every_command_fails() {
    let mut session = bound_session();
    session.start().expect("start succeeds");
    session.gateway_mut().reject = Some(|_| true);
    session.gateway_mut().clear();

    assert_eq!(
        session.teardown(),
        Err(SessionError::Transport(TransportError::Rejected))
    );

    let calls = &session.gateway().calls;
    assert_eq!(
        calls
            .iter()
            .filter(|call| matches!(call, Call::Unsubscribe(_)))
            .count(),
        1
    );
    assert_eq!(
        calls
            .iter()
            .filter(|call| matches!(call, Call::Disconnect(_)))
            .count(),
        1
    );
    assert_eq!(session.robot(), None);
    assert!(!session.is_armed());
    assert_light_follows_armed(&session);
    assert!(!session.snapshot().subscribed);
    assert!(!session.snapshot().detection_enabled);

    assert_eq!(session.teardown(), Ok(()));
}
