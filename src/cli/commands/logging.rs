use clap::{Arg, ArgAction, ArgMatches, Command};

pub const ARG_VERBOSITY: &str = "verbosity";
pub const ARG_LOG_LEVEL: &str = "log-level";

/// Map a level name or number (0 = ERROR .. 4 = TRACE) to a verbosity count.
///
/// # Errors
/// Returns an error string for anything else.
pub fn parse_log_level(level: &str) -> Result<u8, String> {
    if let Ok(parsed) = level.parse::<u8>() {
        if parsed <= 4 {
            return Ok(parsed);
        }
    }

    match level.to_lowercase().as_str() {
        "error" => Ok(0),
        "warn" => Ok(1),
        "info" => Ok(2),
        "debug" => Ok(3),
        "trace" => Ok(4),
        _ => Err(format!("invalid log level: {level}")),
    }
}

/// Effective verbosity: the louder of `-v` repetitions and `--log-level`.
#[must_use]
pub fn verbosity(matches: &ArgMatches) -> u8 {
    let count = matches.get_count(ARG_VERBOSITY);
    let level = matches.get_one::<u8>(ARG_LOG_LEVEL).copied().unwrap_or(0);
    count.max(level)
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_VERBOSITY)
                .short('v')
                .long("verbose")
                .help("Increase verbosity (-v WARN, -vv INFO, -vvv DEBUG, -vvvv TRACE)")
                .global(true)
                .action(ArgAction::Count),
        )
        .arg(
            Arg::new(ARG_LOG_LEVEL)
                .long(ARG_LOG_LEVEL)
                .help("Log level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("CONFGATE_LOG_LEVEL")
                .global(true)
                .value_parser(parse_log_level),
        )
}
