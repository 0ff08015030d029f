pub mod actions;
pub mod commands;
pub mod dispatch;
pub mod telemetry;

use anyhow::Result;
use tracing::Level;

/// Parse the command line, initialise logging and resolve the action to run.
///
/// # Errors
///
/// Returns an error if telemetry cannot be initialised or the arguments are
/// invalid.
pub fn start() -> Result<actions::Action> {
    let matches = commands::new().get_matches();

    telemetry::init(verbosity(matches.get_count("verbosity")))?;

    dispatch::handler(&matches)
}

/// `-v` count to log level.
#[must_use]
pub const fn verbosity(count: u8) -> Level {
    match count {
        0 => Level::ERROR,
        1 => Level::WARN,
        2 => Level::INFO,
        3 => Level::DEBUG,
        _ => Level::TRACE,
    }
}
