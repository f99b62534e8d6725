//! Command scripts submitted to the robot as a single cancellable unit.
//!
//! A roll script aligns the robot's heading with the impact direction and then
//! rolls forward relative to that calibrated heading. Scripts capture the
//! target robot when they are built so a script can never be redirected to a
//! robot bound later.

use heapless::Vec;

use crate::gateway::{RobotCommand, RobotId};
use crate::motion::Heading;

/// Longest script we build (calibrate, then roll).
pub const MAX_SCRIPT_STEPS: usize = 2;

/// Roll speed used by the reference roll script, as a fraction of full speed.
pub const DEFAULT_ROLL_SPEED: f32 = 0.3;

/// Roll duration used by the reference roll script.
pub const DEFAULT_ROLL_DURATION_MS: u32 = 1_000;

/// Speed and duration of the roll step.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RollProfile {
    pub speed: f32,
    /// Roll duration in milliseconds, `0` rolls until stopped.
    pub duration_ms: u32,
}

impl RollProfile {
    pub const DEFAULT: Self = Self {
        speed: DEFAULT_ROLL_SPEED,
        duration_ms: DEFAULT_ROLL_DURATION_MS,
    };

    /// Creates a profile, clamping `speed` into `0.0..=1.0`.
    #[must_use]
    pub fn new(speed: f32, duration_ms: u32) -> Self {
        Self {
            speed: speed.clamp(0.0, 1.0),
            duration_ms,
        }
    }
}

impl Default for RollProfile {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Single step of a [`CommandScript`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ScriptStep {
    /// Re-zero the robot's heading so that `heading` becomes forward.
    Calibrate { heading: Heading },
    /// Roll relative to the calibrated heading.
    Roll {
        speed: f32,
        heading: Heading,
        duration_ms: u32,
    },
}

impl ScriptStep {
    /// Converts the step into the gateway command that executes it.
    ///
    /// Roll speed is clamped into `0.0..=1.0`.
    #[must_use]
    pub fn command(&self) -> RobotCommand {
        match *self {
            ScriptStep::Calibrate { heading } => RobotCommand::Calibrate {
                heading,
                speed: 0.0,
            },
            ScriptStep::Roll {
                speed,
                heading,
                duration_ms,
            } => RobotCommand::Roll {
                heading,
                speed: speed.clamp(0.0, 1.0),
                duration_ms,
            },
        }
    }
}

/// Error returned when a script has no room for another step.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ScriptFull;

/// Ordered steps bound to one robot.
#[derive(Clone, Debug, PartialEq)]
pub struct CommandScript {
    robot: RobotId,
    steps: Vec<ScriptStep, MAX_SCRIPT_STEPS>,
}

impl CommandScript {
    /// Creates an empty script targeting `robot`.
    #[must_use]
    pub const fn new(robot: RobotId) -> Self {
        Self {
            robot,
            steps: Vec::new(),
        }
    }

    /// Appends a step to the script.
    pub fn push(&mut self, step: ScriptStep) -> Result<(), ScriptFull> {
        self.steps.push(step).map_err(|_| ScriptFull)
    }

    /// Robot captured when the script was built.
    #[must_use]
    pub const fn robot(&self) -> RobotId {
        self.robot
    }

    /// Returns the ordered steps.
    #[must_use]
    pub fn steps(&self) -> &[ScriptStep] {
        &self.steps
    }

    /// Returns the number of steps.
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Builds the calibrate-then-roll script for a collision heading.
#[must_use]
pub fn roll_script(robot: RobotId, heading: Heading, profile: RollProfile) -> CommandScript {
    let steps = Vec::from_array([
        ScriptStep::Calibrate { heading },
        ScriptStep::Roll {
            speed: profile.speed,
            heading: Heading::ZERO,
            duration_ms: profile.duration_ms,
        },
    ]);
    CommandScript { robot, steps }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roll_script_calibrates_then_rolls_forward() {
        let robot = RobotId::new(7);
        let script = roll_script(robot, Heading::from_degrees(90.0), RollProfile::DEFAULT);

        assert_eq!(script.robot(), robot);
        assert_eq!(script.step_count(), 2);
        assert_eq!(
            script.steps()[0],
            ScriptStep::Calibrate {
                heading: Heading::from_degrees(90.0)
            }
        );
        assert_eq!(
            script.steps()[1],
            ScriptStep::Roll {
                speed: DEFAULT_ROLL_SPEED,
                heading: Heading::ZERO,
                duration_ms: DEFAULT_ROLL_DURATION_MS,
            }
        );
    }

    #[test]
    fn script_rejects_third_step() {
        let mut script = roll_script(RobotId::new(1), Heading::ZERO, RollProfile::DEFAULT);

        assert_eq!(
            script.push(ScriptStep::Calibrate {
                heading: Heading::ZERO
            }),
            Err(ScriptFull)
        );
        assert_eq!(script.step_count(), MAX_SCRIPT_STEPS);
    }

    #[test]
    fn roll_profile_clamps_speed() {
        assert!((RollProfile::new(1.5, 0).speed - 1.0).abs() < f32::EPSILON);
        assert!(RollProfile::new(-0.2, 0).speed.abs() < f32::EPSILON);
    }

    #[test]
    fn steps_map_to_gateway_commands() {
        let step = ScriptStep::Roll {
            speed: 0.3,
            heading: Heading::ZERO,
            duration_ms: 1_000,
        };
        assert_eq!(
            step.command(),
            RobotCommand::Roll {
                heading: Heading::ZERO,
                speed: 0.3,
                duration_ms: 1_000,
            }
        );
    }

    #[test]
    fn literal_profile_speed_is_clamped_on_dispatch() {
        let profile = RollProfile {
            speed: 2.5,
            duration_ms: 0,
        };
        let script = roll_script(RobotId::new(1), Heading::ZERO, profile);

        assert!(matches!(
            script.steps()[1].command(),
            RobotCommand::Roll { speed, .. } if (speed - 1.0).abs() < f32::EPSILON
        ));
    }
}
