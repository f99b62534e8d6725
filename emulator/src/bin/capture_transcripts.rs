#[allow(dead_code)]
#[path = "../config.rs"]
mod config;
#[allow(dead_code)]
#[path = "../error.rs"]
mod error;
#[allow(dead_code)]
#[path = "../robot.rs"]
mod robot;
#[allow(dead_code)]
#[path = "../session.rs"]
mod session;

use std::path::PathBuf;

use config::EmulatorConfig;
use error::Result;
use session::{Console, ConsoleQueue, TranscriptLogger};

const TRANSCRIPT_DIR: &str = "transcripts";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Scenario {
    /// Start, roll on a soft impact, abort on a hard one, stop.
    RollAndAbort,
    /// Sub-threshold impact while rolling launches a fresh roll.
    FallThrough,
    /// Idle session, non-collision frames and console errors.
    IdleAndFrames,
}

impl Scenario {
    const ALL: [Scenario; 3] = [
        Scenario::RollAndAbort,
        Scenario::FallThrough,
        Scenario::IdleAndFrames,
    ];

    fn file_name(self) -> &'static str {
        match self {
            Scenario::RollAndAbort => "roll-and-abort.log",
            Scenario::FallThrough => "fall-through.log",
            Scenario::IdleAndFrames => "idle-and-frames.log",
        }
    }

    fn header(self) -> &'static str {
        match self {
            Scenario::RollAndAbort => "Glowglobe emulator roll/abort transcript",
            Scenario::FallThrough => "Glowglobe emulator sub-threshold impact transcript",
            Scenario::IdleAndFrames => "Glowglobe emulator idle session transcript",
        }
    }

    fn script(self) -> &'static [&'static str] {
        match self {
            Scenario::RollAndAbort => &[
                "status",
                "start",
                "collide accel=0,1 power=0,0",
                "status",
                "collide accel=0,1 power=60,0",
                "stop",
                "stop",
                "exit",
            ],
            Scenario::FallThrough => &[
                "toggle",
                "collide accel=1,0 power=10,10",
                "collide accel=-1,0 power=25,25",
                "collide accel=0,1 power=25,26",
                "toggle",
                "exit",
            ],
            Scenario::IdleAndFrames => &[
                "help",
                "help collide",
                "collide accel=1,0 power=10,10",
                "start",
                "frame 3",
                "frame 0x01",
                "frame 7",
                "collide accel=1 power=1,1",
                "teleport",
                "quit",
            ],
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    for scenario in Scenario::ALL {
        record(scenario)?;
    }
    Ok(())
}

fn record(scenario: Scenario) -> Result<()> {
    let path = PathBuf::from(TRANSCRIPT_DIR).join(scenario.file_name());
    let transcript = TranscriptLogger::create(&path, scenario.header())?;

    let queue = ConsoleQueue::new();
    let mut console =
        Console::with_transcript(&queue, &EmulatorConfig::default(), Some(transcript))?;
    for line in scenario.script() {
        let _ = console.handle_line(line)?;
    }
    let _ = console.close()?;

    log::info!("{scenario:?} transcript written to {}", path.display());
    Ok(())
}
