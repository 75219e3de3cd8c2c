//! Command-line argument scanning.
//!
//! The scanner is forgiving: it walks the arguments left to
//! right, ignores anything it does not recognize, and always takes the token
//! after a recognized value flag as that flag's value, even if it looks like
//! another flag. A value flag in last position is ignored.
//!
//! Arguments are scanned as `OsString`, so an output path that is not
//! valid UTF-8 is passed through untouched.

use std::ffi::OsString;
use std::path::PathBuf;

use crate::config::ExportConfig;
use crate::error::{ExportError, ExportResult};

pub const USAGE: &str = "\
Export upcoming Google Calendar events to CSV.

Usage: calexport [OPTIONS]

Options:
      --calendar-id <ID>    Calendar to export [default: primary]
      --output <PATH>       CSV file to write [default: calendar_events.csv]
      --max-results <N>     Maximum number of events [default: 2500]
  -v, --debug               Enable debug logging on stderr
  -h, --help                Print help
  -V, --version             Print version

Reads OAuth client credentials from credentials.json in the working directory.";

/// Parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    pub calendar_id: Option<String>,
    pub output: Option<PathBuf>,
    /// Already validated as an integer; may be zero or negative.
    pub max_results: Option<i32>,
    pub debug: bool,
    pub help: bool,
    pub version: bool,
}

impl Args {
    /// Parses the process arguments, skipping the program name.
    pub fn from_env() -> ExportResult<Self> {
        Self::parse_from(std::env::args_os().skip(1))
    }

    /// Parses arguments, not including the program name.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::InvalidMaxResults`] when the value after
    /// `--max-results` is not an integer.
    pub fn parse_from<I, S>(args: I) -> ExportResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let mut parsed = Self {
            calendar_id: None,
            output: None,
            max_results: None,
            debug: false,
            help: false,
            version: false,
        };

        let mut tokens = args.into_iter().map(Into::<OsString>::into);
        while let Some(token) = tokens.next() {
            // non-UTF-8 tokens are never flags
            let Some(flag) = token.to_str() else {
                continue;
            };
            match flag {
                "--calendar-id" | "--output" | "--max-results" => {
                    let Some(value) = tokens.next() else {
                        break;
                    };
                    match flag {
                        "--calendar-id" => {
                            parsed.calendar_id = Some(value.to_string_lossy().into_owned());
                        }
                        "--output" => parsed.output = Some(PathBuf::from(value)),
                        _ => parsed.max_results = Some(parse_max_results(&value)?),
                    }
                }
                "--debug" | "-v" => parsed.debug = true,
                "--help" | "-h" => parsed.help = true,
                "--version" | "-V" => parsed.version = true,
                _ => {}
            }
        }

        Ok(parsed)
    }

    /// Applies the parsed flags on top of the defaults.
    pub fn into_config(self) -> ExportConfig {
        let mut config = ExportConfig::default();
        if let Some(id) = self.calendar_id {
            config = config.with_calendar_id(id);
        }
        if let Some(path) = self.output {
            config = config.with_output(path);
        }
        if let Some(n) = self.max_results {
            config = config.with_max_results(n);
        }
        config
    }
}

fn parse_max_results(value: &OsString) -> ExportResult<i32> {
    value
        .to_str()
        .and_then(|v| v.parse::<i32>().ok())
        .ok_or_else(|| ExportError::InvalidMaxResults(value.to_string_lossy().into_owned()))
}
