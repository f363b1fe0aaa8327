/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/
use std::env;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

static INIT: Once = Once::new();

/// Sets up the global logger, reading the level from the `LOGLEVEL`
/// environment variable (`DEBUG`, `INFO`, `WARN`, `ERROR`, `TRACE`).
/// Defaults to `INFO`. Calling it more than once has no effect.
pub fn setup_logger() {
    let level = env::var("LOGLEVEL")
        .map(|value| parse_level(&value))
        .unwrap_or(Level::INFO);
    setup_logger_with_level(level);
}

/// Sets up the global logger with an explicit level.
/// Calling it more than once has no effect.
pub fn setup_logger_with_level(level: Level) {
    INIT.call_once(|| {
        let subscriber = FmtSubscriber::builder().with_max_level(level).finish();

        if tracing::subscriber::set_global_default(subscriber).is_ok() {
            tracing::debug!("Log level set to: {}", level);
        }
    });
}

fn parse_level(value: &str) -> Level {
    match value.to_uppercase().as_str() {
        "TRACE" => Level::TRACE,
        "DEBUG" => Level::DEBUG,
        "WARN" => Level::WARN,
        "ERROR" => Level::ERROR,
        _ => Level::INFO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug"), Level::DEBUG);
        assert_eq!(parse_level("WARN"), Level::WARN);
        assert_eq!(parse_level("Trace"), Level::TRACE);
        assert_eq!(parse_level("error"), Level::ERROR);
        assert_eq!(parse_level("verbose"), Level::INFO);
    }

    #[test]
    fn test_setup_logger_is_idempotent() {
        setup_logger_with_level(Level::DEBUG);
        setup_logger();
        assert!(INIT.is_completed());
    }
}
