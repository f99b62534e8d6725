//! Collision-driven motion state machine.
//!
//! Each decoded collision runs through a two-step decision table:
//!
//! 1. *Abort check* (only while [`MotionState::Moving`]): an impact whose
//!    power magnitude exceeds the threshold stops the robot.
//! 2. *Launch* (while [`MotionState::Waiting`], or when the abort check did
//!    not fire): a new roll is started along the heading derived from the
//!    impact acceleration.
//!
//! A sub-threshold impact while moving therefore re-launches within the same
//! invocation. [`DecisionPath::FellThrough`] marks that case so callers can
//! report it; whether the re-launch is intended is still unconfirmed.

use core::fmt;

use crate::telemetry::{Axes, CollisionEvent};

/// Impact power magnitude above which a moving robot is stopped.
pub const COLLISION_THRESHOLD: f32 = 50.0;

/// Scale applied to both acceleration components before computing the heading.
const HEADING_SCALE: f32 = 100.0;

const FULL_TURN_DEGREES: f32 = 360.0;

/// Motion phase of the robot as seen by the controller.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum MotionState {
    #[default]
    Waiting,
    Moving,
}

impl fmt::Display for MotionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MotionState::Waiting => f.write_str("waiting"),
            MotionState::Moving => f.write_str("moving"),
        }
    }
}

/// Roll direction in degrees, normalized to `[0, 360)`.
#[derive(Copy, Clone, Debug, Default, PartialEq, PartialOrd)]
pub struct Heading(f32);

impl Heading {
    pub const ZERO: Self = Self(0.0);

    /// Wraps an arbitrary angle in degrees into `[0, 360)`.
    #[must_use]
    pub fn from_degrees(degrees: f32) -> Self {
        let mut wrapped = libm::fmodf(degrees, FULL_TURN_DEGREES);
        if wrapped < 0.0 {
            wrapped += FULL_TURN_DEGREES;
        }
        if wrapped >= FULL_TURN_DEGREES {
            wrapped = 0.0;
        }
        Self(wrapped)
    }

    #[must_use]
    pub fn from_radians(radians: f32) -> Self {
        Self::from_degrees(radians.to_degrees())
    }

    #[must_use]
    pub const fn degrees(self) -> f32 {
        self.0
    }
}

impl fmt::Display for Heading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}deg", self.0)
    }
}

/// Command decided for a collision.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Action {
    Roll { heading: Heading },
    Stop,
}

/// Which rows of the decision table produced a [`Transition`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DecisionPath {
    /// Waiting robot launched a new roll.
    Launched,
    /// Moving robot took a sub-threshold impact and re-launched.
    FellThrough,
    /// Moving robot exceeded the threshold and was stopped.
    Aborted,
}

/// Result of feeding one collision to the state machine.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Transition {
    pub from: MotionState,
    pub to: MotionState,
    pub action: Action,
    pub path: DecisionPath,
    pub magnitude: f32,
}

/// Sum of absolute impact power components.
#[must_use]
pub fn impact_magnitude(power: Axes) -> f32 {
    libm::fabsf(power.x) + libm::fabsf(power.y)
}

/// Heading derived from the lateral acceleration of an impact.
#[must_use]
pub fn heading_from_acceleration(acceleration: Axes) -> Heading {
    Heading::from_radians(libm::atan2f(
        acceleration.x * HEADING_SCALE,
        acceleration.y * HEADING_SCALE,
    ))
}

/// Decides the next state and action for a collision observed in `state`.
#[must_use]
pub fn on_collision(state: MotionState, event: &CollisionEvent, threshold: f32) -> Transition {
    let magnitude = impact_magnitude(event.power);

    let path = match state {
        MotionState::Moving if magnitude > threshold => {
            return Transition {
                from: state,
                to: MotionState::Waiting,
                action: Action::Stop,
                path: DecisionPath::Aborted,
                magnitude,
            };
        }
        MotionState::Moving => DecisionPath::FellThrough,
        MotionState::Waiting => DecisionPath::Launched,
    };

    Transition {
        from: state,
        to: MotionState::Moving,
        action: Action::Roll {
            heading: heading_from_acceleration(event.acceleration),
        },
        path,
        magnitude,
    }
}

/// [`on_collision`] with [`COLLISION_THRESHOLD`].
#[must_use]
pub fn on_collision_default(state: MotionState, event: &CollisionEvent) -> Transition {
    on_collision(state, event, COLLISION_THRESHOLD)
}
