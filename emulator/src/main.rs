mod config;
mod error;
mod robot;
mod session;

use std::env;
use std::io::{self, BufRead, Write};

use config::EmulatorConfig;
use error::{Error, Result};
use session::{Console, ConsoleQueue};

/// Parse the optional config path
///
/// Supports:
/// - `glowglobe-emulator --config <path>`
/// - `glowglobe-emulator -c <path>`
/// - `glowglobe-emulator <path>` (positional)
fn parse_config_path() -> Result<Option<String>> {
    let mut args = env::args().skip(1);
    match args.next() {
        None => Ok(None),
        Some(flag) if flag == "--config" || flag == "-c" => args
            .next()
            .map(Some)
            .ok_or_else(|| Error::Usage(format!("expected a path after {flag}"))),
        Some(value) => match value.strip_prefix("--config=") {
            Some(path) => Ok(Some(path.to_string())),
            None if !value.starts_with('-') => Ok(Some(value)),
            None => Err(Error::Usage(format!(
                "unknown option `{value}`\nUsage: glowglobe-emulator [--config <path>]"
            ))),
        },
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match parse_config_path()? {
        Some(path) => {
            log::info!("Using config: {path}");
            EmulatorConfig::from_file(&path)?
        }
        None => EmulatorConfig::default(),
    };

    let queue = ConsoleQueue::new();
    let mut console = Console::new(&queue, &config)?;

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let stdout = io::stdout();
    let mut writer = stdout.lock();
    let mut line = String::new();

    writeln!(
        writer,
        "Glowglobe emulator ready on {}. Type `help` for commands or `exit` to quit.",
        config.robot_id()
    )?;

    while !console.is_closed() {
        line.clear();
        write!(writer, "> ")?;
        writer.flush()?;

        if reader.read_line(&mut line)? == 0 {
            writeln!(writer)?;
            break;
        }

        for response in console.handle_line(&line)? {
            writeln!(writer, "{response}")?;
        }
    }

    for response in console.close()? {
        writeln!(writer, "{response}")?;
    }
    Ok(())
}
