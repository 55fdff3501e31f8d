//! Command-line interface for dir-tunnel.
//!
//! Uses lexopt for minimal binary size overhead (~34KB).

use std::ffi::OsString;
use std::path::PathBuf;

/// Command-line arguments.
///
/// Unset options fall through to the environment, the config file and
/// finally the built-in defaults.
#[derive(Debug, Clone, Default)]
pub struct Args {
    /// Path of the Unix socket to listen on.
    pub socket: Option<PathBuf>,
    /// Session time-to-live in minutes.
    pub ttl_minutes: Option<u64>,
    /// Seconds between sweeps of expired sessions.
    pub sweep_interval_secs: Option<u64>,
    /// Path to configuration file.
    pub config: Option<PathBuf>,
    /// Log level (error, warn, info, debug, trace).
    pub log_level: Option<String>,
    /// Show version and exit.
    pub version: bool,
    /// Show help and exit.
    pub help: bool,
}

/// Parse command-line arguments.
pub fn parse_args() -> Result<Args, ArgsError> {
    parse_args_from(std::env::args_os())
}

/// Parse arguments from an iterator (for testing).
pub fn parse_args_from<I>(args: I) -> Result<Args, ArgsError>
where
    I: IntoIterator<Item = OsString>,
{
    use lexopt::prelude::*;

    let mut result = Args::default();
    let mut parser = lexopt::Parser::from_iter(args);

    while let Some(arg) = parser.next()? {
        match arg {
            Short('h') | Long("help") => {
                result.help = true;
            }
            Short('V') | Long("version") => {
                result.version = true;
            }
            Short('s') | Long("socket") => {
                result.socket = Some(parser.value()?.parse()?);
            }
            Short('t') | Long("ttl") => {
                let value: String = parser.value()?.parse()?;
                result.ttl_minutes = Some(
                    value
                        .parse()
                        .map_err(|_| ArgsError::InvalidValue("ttl", value))?,
                );
            }
            Short('i') | Long("sweep-interval") => {
                let value: String = parser.value()?.parse()?;
                result.sweep_interval_secs = Some(
                    value
                        .parse()
                        .map_err(|_| ArgsError::InvalidValue("sweep-interval", value))?,
                );
            }
            Short('c') | Long("config") => {
                result.config = Some(parser.value()?.parse()?);
            }
            Short('l') | Long("log-level") => {
                result.log_level = Some(parser.value()?.parse()?);
            }
            Value(val) => {
                return Err(ArgsError::UnexpectedArgument(val.to_string_lossy().into()));
            }
            _ => return Err(arg.unexpected().into()),
        }
    }

    Ok(result)
}

/// Print help message.
pub fn print_help() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        r#"dir-tunnel {version}
Session-based remote directory browsing over a Unix socket

USAGE:
    dir-tunnel [OPTIONS]

OPTIONS:
    -s, --socket <PATH>          Unix socket path [default: /tmp/dir-tunnel.sock]
    -t, --ttl <MINUTES>          Session time-to-live, 10-30 [default: 10]
    -i, --sweep-interval <SECS>  Seconds between expiry sweeps, 10-300 [default: 45]
    -c, --config <FILE>          Path to configuration file (JSON)
    -l, --log-level <LVL>        Log level (error, warn, info, debug, trace)
    -h, --help                   Print help
    -V, --version                Print version

ENVIRONMENT VARIABLES:
    DIR_TUNNEL_SOCKET            Socket path (overrides config)
    DIR_TUNNEL_TTL               Session time-to-live (overrides config)
    DIR_TUNNEL_SWEEP_INTERVAL    Sweep interval (overrides config)
    DIR_TUNNEL_LOG_LEVEL         Log level (overrides config)
    RUST_LOG                     Alternative log level setting

EXAMPLES:
    # Start with defaults
    dir-tunnel

    # Custom socket, 30 minute sessions
    dir-tunnel -s /run/dir-tunnel.sock -t 30

    # Talk to it
    printf 'PTDP v1 INIT_STATE /srv/data' | nc -U /tmp/dir-tunnel.sock
"#
    );
}

/// Print version.
pub fn print_version() {
    println!("dir-tunnel {}", env!("CARGO_PKG_VERSION"));
}

/// Argument parsing errors.
#[derive(Debug)]
pub enum ArgsError {
    /// Lexopt parsing error.
    Lexopt(lexopt::Error),
    /// Invalid argument value.
    InvalidValue(&'static str, String),
    /// Unexpected positional argument.
    UnexpectedArgument(String),
}

impl std::fmt::Display for ArgsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lexopt(e) => write!(f, "{}", e),
            Self::InvalidValue(name, value) => {
                write!(f, "invalid value for --{}: '{}'", name, value)
            }
            Self::UnexpectedArgument(arg) => {
                write!(f, "unexpected argument: '{}'", arg)
            }
        }
    }
}

impl std::error::Error for ArgsError {}

impl From<lexopt::Error> for ArgsError {
    fn from(e: lexopt::Error) -> Self {
        Self::Lexopt(e)
    }
}
