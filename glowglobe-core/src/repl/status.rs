//! Shared status surface for the console.
//!
//! Front-ends implement [`RobotStatusProvider`] to expose what the robot
//! itself reports; [`StatusFormatter`] renders that next to the controller's
//! [`SessionSnapshot`] so every front-end prints the same block.

use core::fmt;

use crate::gateway::{Rgb, RobotId};
use crate::motion::Heading;
use crate::session::{JournalEntry, SessionSnapshot};

/// Robot-side state as observed by the gateway.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RobotView {
    pub robot: RobotId,
    pub connected: bool,
    pub subscribed: bool,
    pub light: Rgb,
    pub detection_enabled: bool,
    /// Heading of the roll in progress, `None` when stationary.
    pub rolling: Option<Heading>,
    /// Heading offset applied by the last calibration.
    pub calibration: Heading,
}

/// Platform hook that supplies robot-side state.
pub trait RobotStatusProvider {
    fn robot_view(&self) -> Option<RobotView>;
}

/// Provider for front-ends without a robot model.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoRobotStatus;

impl RobotStatusProvider for NoRobotStatus {
    fn robot_view(&self) -> Option<RobotView> {
        None
    }
}

/// Renders session and robot state into human-readable lines.
#[derive(Clone, Copy, Debug)]
pub struct StatusFormatter<'a> {
    session: &'a SessionSnapshot,
    robot: Option<&'a RobotView>,
}

impl<'a> StatusFormatter<'a> {
    #[must_use]
    pub const fn new(session: &'a SessionSnapshot, robot: Option<&'a RobotView>) -> Self {
        Self { session, robot }
    }

    /// Writes the session line (e.g. `session phase=armed light=on robot=robot-1 subscribed=yes`).
    pub fn write_session_line<W: fmt::Write>(&self, writer: &mut W) -> fmt::Result {
        write!(
            writer,
            "session phase={} light={} robot=",
            self.session.phase, self.session.light
        )?;
        match self.session.robot {
            Some(robot) => write!(writer, "{robot}")?,
            None => writer.write_str("none")?,
        }
        write!(
            writer,
            " subscribed={} detection={}",
            yes_no(self.session.subscribed),
            on_off(self.session.detection_enabled)
        )
    }

    /// Writes the motion line (e.g. `motion state=moving heading=90.0deg pending=0`).
    pub fn write_motion_line<W: fmt::Write>(&self, writer: &mut W) -> fmt::Result {
        write!(writer, "motion state={} heading=", self.session.state)?;
        match self.session.heading {
            Some(heading) => write!(writer, "{heading}")?,
            None => writer.write_str("n/a")?,
        }
        write!(writer, " pending={}", self.session.pending_steps)
    }

    /// Writes the robot line, or `robot n/a` when no view is available.
    pub fn write_robot_line<W: fmt::Write>(&self, writer: &mut W) -> fmt::Result {
        let Some(view) = self.robot else {
            return writer.write_str("robot n/a");
        };

        write!(
            writer,
            "robot {} link={} light={} detection={} calibration={} rolling=",
            view.robot,
            if view.connected { "up" } else { "down" },
            view.light,
            on_off(view.detection_enabled),
            view.calibration
        )?;
        match view.rolling {
            Some(heading) => write!(writer, "{heading}"),
            None => writer.write_str("no"),
        }
    }

    /// Writes every status line separated by newlines.
    pub fn write_all<W: fmt::Write>(&self, writer: &mut W) -> fmt::Result {
        self.write_session_line(writer)?;
        writer.write_char('\n')?;
        self.write_motion_line(writer)?;
        writer.write_char('\n')?;
        self.write_robot_line(writer)
    }
}

/// Writes one journal entry (e.g. `#3 rolled 90.0deg`).
pub fn write_journal_entry<W: fmt::Write>(writer: &mut W, entry: &JournalEntry) -> fmt::Result {
    write!(writer, "#{} {}", entry.seq, entry.event)
}

const fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

const fn on_off(value: bool) -> &'static str {
    if value { "on" } else { "off" }
}
