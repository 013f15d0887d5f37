//! Initialisation of the program logger.
//!
//! Messages go to the terminal (coloured if it supports it) and, during a run, to log files in the
//! output folder. Warnings and errors are kept apart from everything else in both places.
use anyhow::{Context, Result, bail};
use chrono::Local;
use fern::colors::{Color, ColoredLevelConfig};
use fern::{Dispatch, FormatCallback};
use log::{LevelFilter, Metadata, Record};
use std::env;
use std::fmt::{Arguments, Display};
use std::fs::File;
use std::io::{self, IsTerminal};
use std::path::Path;
use std::sync::OnceLock;

/// A flag indicating whether the logger has been initialised
static LOGGER_INIT: OnceLock<()> = OnceLock::new();

/// The default log level for the program.
///
/// Used as a fallback if the user hasn't specified something else with the `BLOBS_LOG_LEVEL`
/// environment variable or the settings.toml file.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// The environment variable which overrides the log level
const LOG_LEVEL_ENV_VAR: &str = "BLOBS_LOG_LEVEL";

/// Progress messages from a run
const LOG_INFO_FILE_NAME: &str = "blobs_info.log";

/// Warnings and errors from a run
const LOG_ERROR_FILE_NAME: &str = "blobs_error.log";

/// Whether the program logger has been initialised
pub fn is_logger_initialised() -> bool {
    LOGGER_INIT.get().is_some()
}

/// Initialise the program logger.
///
/// The log level is taken from the `BLOBS_LOG_LEVEL` environment variable if set, otherwise from
/// `settings.toml`. Possible values are `off`, `error`, `warn`, `info`, `debug` and `trace`.
///
/// The logger can only be initialised once per process; later calls return an error.
///
/// # Arguments
///
/// * `log_level_from_settings`: The log level specified in `settings.toml`
/// * `log_file_path`: The folder to save log files in (if `None`, only the terminal is used)
pub fn init(log_level_from_settings: &str, log_file_path: Option<&Path>) -> Result<()> {
    let log_level = env::var(LOG_LEVEL_ENV_VAR)
        .map_or_else(|_| parse_log_level(log_level_from_settings), |env| parse_log_level(&env))?;

    let colours = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue)
        .trace(Color::Magenta);

    let mut dispatch = Dispatch::new()
        .chain(
            terminal_dispatch(io::stdout().is_terminal(), colours)
                .filter(is_progress)
                .level(log_level)
                .chain(io::stdout()),
        )
        .chain(
            terminal_dispatch(io::stderr().is_terminal(), colours)
                .level(log_level.min(LevelFilter::Warn))
                .chain(io::stderr()),
        );

    if let Some(log_file_path) = log_file_path {
        // Files always get progress messages, even if the terminal is quieter
        dispatch = dispatch
            .chain(
                Dispatch::new()
                    .filter(is_progress)
                    .format(write_log_plain)
                    .level(log_level.max(LevelFilter::Info))
                    .chain(create_log_file(log_file_path, LOG_INFO_FILE_NAME)?),
            )
            .chain(
                Dispatch::new()
                    .format(write_log_plain)
                    .level(LevelFilter::Warn)
                    .chain(create_log_file(log_file_path, LOG_ERROR_FILE_NAME)?),
            );
    }

    dispatch.apply().context("Logger already initialised")?;
    LOGGER_INIT.get_or_init(|| ());

    Ok(())
}

/// Convert a log level name to a [`LevelFilter`]
fn parse_log_level(log_level: &str) -> Result<LevelFilter> {
    Ok(match log_level.to_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        unknown => bail!("Unknown log level: {unknown}"),
    })
}

/// Whether a message is below warning level
fn is_progress(metadata: &Metadata) -> bool {
    metadata.level() > LevelFilter::Warn
}

/// Create (or truncate) a log file in the given folder
fn create_log_file(folder: &Path, file_name: &str) -> Result<File> {
    let file_path = folder.join(file_name);
    File::create(&file_path)
        .with_context(|| format!("Could not create log file {}", file_path.display()))
}

/// A dispatcher which formats messages for the terminal, with colours if `use_colour` is set
fn terminal_dispatch(use_colour: bool, colours: ColoredLevelConfig) -> Dispatch {
    Dispatch::new().format(move |out, message, record| {
        if use_colour {
            write_log(out, colours.color(record.level()), record.target(), message);
        } else {
            write_log_plain(out, message, record);
        }
    })
}

/// Write a log line as `[time level target] message`
fn write_log<T: Display>(out: FormatCallback, level: T, target: &str, message: &Arguments) {
    let timestamp = Local::now().format("%H:%M:%S");

    out.finish(format_args!("[{timestamp} {level} {target}] {message}"));
}

/// Write to the log with no colours
fn write_log_plain(out: FormatCallback, message: &Arguments, record: &Record) {
    write_log(out, record.level(), record.target(), message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::tempdir;

    #[rstest]
    #[case("off", LevelFilter::Off)]
    #[case("warn", LevelFilter::Warn)]
    #[case("INFO", LevelFilter::Info)]
    #[case("trace", LevelFilter::Trace)]
    fn test_parse_log_level(#[case] name: &str, #[case] expected: LevelFilter) {
        assert_eq!(parse_log_level(name).unwrap(), expected);
    }

    #[test]
    fn test_parse_log_level_unknown() {
        assert_eq!(
            parse_log_level("loud").unwrap_err().to_string(),
            "Unknown log level: loud"
        );
    }

    #[test]
    fn test_create_log_file() {
        let dir = tempdir().unwrap();
        create_log_file(dir.path(), LOG_INFO_FILE_NAME).unwrap();
        assert!(dir.path().join(LOG_INFO_FILE_NAME).is_file());

        assert!(create_log_file(&dir.path().join("missing"), LOG_INFO_FILE_NAME).is_err());
    }
}
