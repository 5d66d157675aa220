//! Logger setup shared by the command line programs.
use std::path::Path;

use log4rs::{
    append::{console::{ConsoleAppender, Target}, file::FileAppender},
    config::{Appender, Root},
    encode::pattern::PatternEncoder,
    Config,
};

const CONSOLE_PATTERN: &str = "{h({d(%Y-%m-%d %H:%M:%S)} [{l}] {M})} - {m}{n}";
const FILE_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S)} [{l}] {M}:{L} - {m}{n}";

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Could not open log file {0}: {1}")]
    LogFile(String, String),
    #[error("Invalid logging configuration: {0}")]
    Config(String),
    #[error("A logger was already initialized")]
    AlreadyInitialized,
}

/// Build the logging configuration: messages at `level` and above go to stderr and,
/// if `log_file` is given, are also appended to that file.
pub fn logging_config(level: log::LevelFilter, log_file: Option<&Path>) -> Result<Config, LoggingError> {
    let stderr = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(CONSOLE_PATTERN)))
        .target(Target::Stderr)
        .build();

    let mut builder = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)));
    let mut root = Root::builder().appender("stderr");

    if let Some(path) = log_file {
        let file = FileAppender::builder()
            .encoder(Box::new(PatternEncoder::new(FILE_PATTERN)))
            .build(path)
            .map_err(|e| LoggingError::LogFile(path.display().to_string(), e.to_string()))?;
        builder = builder.appender(Appender::builder().build("file", Box::new(file)));
        root = root.appender("file");
    }

    builder.build(root.build(level))
        .map_err(|e| LoggingError::Config(e.to_string()))
}

/// Initialize the global logger. Can only succeed once per process.
pub fn init_logging(level: log::LevelFilter, log_file: Option<&Path>) -> Result<(), LoggingError> {
    let config = logging_config(level, log_file)?;
    log4rs::init_config(config).map_err(|_| LoggingError::AlreadyInitialized)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::scratch_dir;

    #[test]
    fn test_config_with_file() {
        let dir = scratch_dir("logging");
        let log_file = dir.join("run.log");
        let config = logging_config(log::LevelFilter::Debug, Some(&log_file)).unwrap();
        assert_eq!(config.appenders().len(), 2);
        assert_eq!(config.root().level(), log::LevelFilter::Debug);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_console_only() {
        let config = logging_config(log::LevelFilter::Warn, None).unwrap();
        assert_eq!(config.appenders().len(), 1);
        assert_eq!(config.root().appenders(), &["stderr".to_string()]);
    }
}
