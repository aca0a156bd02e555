use anyhow::{Context, Result};
use colored::*;
use env_logger::fmt::Formatter;
use env_logger::{Builder, Env, Target};
use log::{Level, Record};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// Sets up the global logger. `RUST_LOG` wins over the default level;
/// with a `log_file` the output is appended there without colors.
pub fn init_logger(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let mut builder = Builder::from_env(Env::default().default_filter_or(default_level));

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?;
            builder.target(Target::Pipe(Box::new(file))).format(plain_format);
        }
        None => {
            builder.format(colored_format);
        }
    }

    builder.try_init().context("Logger was already initialized")
}

fn plain_format(buf: &mut Formatter, record: &Record) -> std::io::Result<()> {
    let timestamp = buf.timestamp().to_string();
    writeln!(buf, "{}", format_line(&timestamp, &record.level().to_string(), record))
}

fn colored_format(buf: &mut Formatter, record: &Record) -> std::io::Result<()> {
    let timestamp = buf.timestamp().to_string();
    let level = colored_level(record.level()).to_string();
    writeln!(buf, "{}", format_line(&timestamp, &level, record))
}

fn colored_level(level: Level) -> ColoredString {
    match level {
        Level::Error => level.to_string().red(),
        Level::Warn => level.to_string().yellow(),
        Level::Info => level.to_string().green(),
        Level::Debug => level.to_string().blue(),
        Level::Trace => level.to_string().white(),
    }
}

fn format_line(timestamp: &str, level: &str, record: &Record) -> String {
    format!("[{}] [{}] {}", timestamp, level, record.args())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_format() {
        let line = format_line(
            "2024-05-01T10:00:00Z",
            "INFO",
            &Record::builder()
                .args(format_args!("Server listening on 0.0.0.0:9090"))
                .level(Level::Info)
                .build(),
        );
        assert_eq!(line, "[2024-05-01T10:00:00Z] [INFO] Server listening on 0.0.0.0:9090");
    }

    #[test]
    fn test_levels_keep_their_name_when_colored() {
        colored::control::set_override(false);
        assert_eq!(colored_level(Level::Warn).to_string(), "WARN");
        colored::control::unset_override();
    }
}
