use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::{Duration, Instant as HostInstant};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::TrySendError;
use glowglobe_core::repl::commands::{self, ReplAction};
use glowglobe_core::repl::grammar;
use glowglobe_core::repl::status::{RobotStatusProvider, StatusFormatter, write_journal_entry};
use glowglobe_core::runtime::{
    InputQueue, InputSender, SessionInput, SessionRuntime, TelemetryForwarder,
};
use glowglobe_core::session::SessionController;

use crate::config::EmulatorConfig;
use crate::error::Result;
use crate::robot::{RobotLink, SimulatedRobot};

pub type ConsoleMutex = CriticalSectionRawMutex;
pub type ConsoleQueue = InputQueue<ConsoleMutex>;

/// Operator console wired to a simulated robot.
///
/// Each line is parsed, turned into a session input and applied by draining
/// the runtime before the reply is produced, so replies always reflect the
/// state after the command.
pub struct Console<'a> {
    runtime: SessionRuntime<'a, ConsoleMutex, SimulatedRobot>,
    inputs: InputSender<'a, ConsoleMutex>,
    forwarder: TelemetryForwarder<'a, ConsoleMutex>,
    link: RobotLink,
    transcript: Option<TranscriptLogger>,
    started_at: HostInstant,
    last_journal_seq: Option<u32>,
    closed: bool,
}

impl<'a> Console<'a> {
    pub fn new(queue: &'a ConsoleQueue, config: &EmulatorConfig) -> Result<Self> {
        let transcript = match &config.transcript.path {
            Some(path) => Some(TranscriptLogger::create(path, "glowglobe emulator session")?),
            None => None,
        };
        Self::with_transcript(queue, config, transcript)
    }

    pub fn with_transcript(
        queue: &'a ConsoleQueue,
        config: &EmulatorConfig,
        transcript: Option<TranscriptLogger>,
    ) -> Result<Self> {
        let robot = config.robot_id();
        let (gateway, link) = SimulatedRobot::connect(robot);
        let mut controller = SessionController::new(gateway, config.session_config());
        controller.bind(robot);

        Ok(Self {
            runtime: SessionRuntime::new(controller, queue.receiver()),
            inputs: queue.sender(),
            forwarder: TelemetryForwarder::new(queue.sender()),
            link,
            transcript,
            started_at: HostInstant::now(),
            last_journal_seq: None,
            closed: false,
        })
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Handles one console line and returns the reply lines.
    pub fn handle_line(&mut self, line: &str) -> Result<Vec<String>> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        let elapsed = self.started_at.elapsed();
        self.record(elapsed, TranscriptRole::Host, trimmed)?;

        let lines = if self.closed {
            vec!["Session already closed.".to_string()]
        } else {
            self.dispatch(trimmed)
        };

        for reply in &lines {
            self.record(elapsed, TranscriptRole::Emulator, reply)?;
        }
        Ok(lines)
    }

    /// Tears the session down if the operator never typed `exit`.
    pub fn close(&mut self) -> Result<Vec<String>> {
        if self.closed {
            return Ok(Vec::new());
        }
        self.handle_line("exit")
    }

    fn dispatch(&mut self, line: &str) -> Vec<String> {
        let command = match grammar::parse(line) {
            Ok(command) => command,
            Err(err) => return vec![err.to_string()],
        };
        let action = match commands::interpret(command) {
            Ok(action) => action,
            Err(err) => return vec![err.to_string()],
        };

        match action {
            ReplAction::Session(input) => self.apply(input),
            ReplAction::Status => self.status_lines(),
            ReplAction::Help(topic) => help_lines(topic),
            ReplAction::Exit => self.shutdown(),
        }
    }

    fn apply(&mut self, input: SessionInput) -> Vec<String> {
        let mut lines = Vec::new();

        let queued = match input {
            SessionInput::Telemetry(frame) => {
                if self.link.emits(&frame) {
                    self.forwarder.deliver(frame)
                } else {
                    lines.push(format!(
                        "robot is not streaming {} frames; nothing delivered",
                        frame.kind()
                    ));
                    return lines;
                }
            }
            other => self.enqueue(other),
        };
        if !queued {
            lines.push("input queue full; command dropped".to_string());
        }

        self.runtime.drain();
        self.collect_activity(&mut lines);
        lines
    }

    fn shutdown(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        // Make room for the teardown request.
        self.runtime.drain();
        if self.enqueue(SessionInput::Teardown) {
            embassy_futures::block_on(self.runtime.run());
        } else {
            log::warn!("teardown could not be queued; tearing down directly");
            if let Err(err) = self.runtime.controller_mut().teardown() {
                lines.push(format!("teardown incomplete: {err}"));
            }
        }
        self.closed = true;

        self.collect_activity(&mut lines);
        lines.push("Session closed.".to_string());
        lines
    }

    fn enqueue(&self, input: SessionInput) -> bool {
        match self.inputs.try_send(input) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => false,
        }
    }

    /// Reports commands the robot received and new journal entries.
    fn collect_activity(&mut self, lines: &mut Vec<String>) {
        for command in self.link.take_outbox() {
            lines.push(format!("robot <- {command}"));
        }

        let last = self.last_journal_seq;
        for entry in self
            .runtime
            .controller()
            .journal()
            .filter(|entry| last.is_none_or(|seq| entry.seq > seq))
        {
            let mut line = String::new();
            if write_journal_entry(&mut line, entry).is_ok() {
                lines.push(line);
            }
            self.last_journal_seq = Some(entry.seq);
        }
    }

    fn status_lines(&self) -> Vec<String> {
        let snapshot = self.runtime.controller().snapshot();
        let view = self.link.robot_view();
        let mut text = String::new();
        if StatusFormatter::new(&snapshot, view.as_ref())
            .write_all(&mut text)
            .is_err()
        {
            return vec!["status unavailable".to_string()];
        }
        text.lines().map(str::to_string).collect()
    }

    fn record(&mut self, elapsed: Duration, role: TranscriptRole, line: &str) -> Result<()> {
        match self.transcript.as_mut() {
            Some(transcript) => transcript.append_line(elapsed, role, line),
            None => Ok(()),
        }
    }
}

fn help_lines(topic: Option<&str>) -> Vec<String> {
    let mut text = String::new();
    match commands::write_help(&mut text, topic) {
        Ok(true) => {
            let mut lines: Vec<String> = text.lines().map(str::to_string).collect();
            if topic.is_none() {
                lines.push(
                    "Type `help <topic>` for a specific command, `help frames` for frame codes."
                        .to_string(),
                );
            }
            lines
        }
        Ok(false) => vec![
            format!("No help available for `{}`.", topic.unwrap_or_default()),
            "Type `help` for the command list.".to_string(),
        ],
        Err(_) => vec!["help unavailable".to_string()],
    }
}

pub struct TranscriptLogger {
    writer: BufWriter<std::fs::File>,
}

impl TranscriptLogger {
    pub fn create<P: AsRef<Path>>(path: P, header: &str) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut logger = Self {
            writer: BufWriter::new(file),
        };
        logger.write_header(header)?;
        Ok(logger)
    }

    fn write_header(&mut self, header: &str) -> Result<()> {
        writeln!(self.writer, "# {header}")?;
        writeln!(self.writer, "# Timestamps are milliseconds since session start")?;
        writeln!(self.writer)?;
        self.writer.flush()?;
        Ok(())
    }

    fn append_line(&mut self, elapsed: Duration, role: TranscriptRole, line: &str) -> Result<()> {
        writeln!(
            self.writer,
            "[+{:>6} ms] {} {}",
            elapsed.as_millis(),
            role.prefix(),
            line
        )?;
        self.writer.flush()?;
        Ok(())
    }
}

#[derive(Clone, Copy)]
enum TranscriptRole {
    Host,
    Emulator,
}

impl TranscriptRole {
    fn prefix(self) -> &'static str {
        match self {
            TranscriptRole::Host => "HOST>",
            TranscriptRole::Emulator => "EMU <",
        }
    }
}
