//! Export error types.

use std::path::PathBuf;
use std::process::ExitCode;

use calexport_providers::ProviderError;
use thiserror::Error;

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

/// Everything that can end a run early.
///
/// The `Display` text is what the user sees on stderr.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Invalid value for --max-results: '{0}'. Expected an integer.")]
    InvalidMaxResults(String),

    #[error(
        "{} not found in the working directory. Download OAuth 2.0 client credentials from the Google Cloud Console and place the file here.",
        .0.display()
    )]
    MissingCredentials(PathBuf),

    #[error("{} is not a usable OAuth client secret file: {source}", .path.display())]
    InvalidCredentials {
        path: PathBuf,
        #[source]
        source: ProviderError,
    },

    #[error(
        "Calendar '{0}' was not found. Please check the calendar ID and ensure the calendar is shared with your account."
    )]
    CalendarNotFound(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("failed to write CSV to {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ExportError {
    /// Every failure exits with status 1.
    pub fn exit_code(&self) -> ExitCode {
        ExitCode::FAILURE
    }
}
