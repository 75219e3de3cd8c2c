//! Run configuration.

use std::path::PathBuf;

pub const DEFAULT_CALENDAR_ID: &str = "primary";
pub const DEFAULT_OUTPUT: &str = "calendar_events.csv";
pub const DEFAULT_MAX_RESULTS: i32 = 2500;
pub const CREDENTIALS_FILE: &str = "credentials.json";

/// Settings for one export run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportConfig {
    pub calendar_id: String,
    pub output: PathBuf,
    /// Upper bound on exported events; zero or negative exports nothing.
    pub max_results: i32,
    /// OAuth client secret file, relative to the working directory.
    pub credentials_path: PathBuf,
    /// Token cache location; `None` uses the provider default.
    pub token_path: Option<PathBuf>,
    /// Events API root; `None` uses the public Google endpoint.
    pub api_base_url: Option<String>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            calendar_id: DEFAULT_CALENDAR_ID.to_string(),
            output: PathBuf::from(DEFAULT_OUTPUT),
            max_results: DEFAULT_MAX_RESULTS,
            credentials_path: PathBuf::from(CREDENTIALS_FILE),
            token_path: None,
            api_base_url: None,
        }
    }
}

impl ExportConfig {
    pub fn with_calendar_id(mut self, id: impl Into<String>) -> Self {
        self.calendar_id = id.into();
        self
    }

    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = path.into();
        self
    }

    pub fn with_max_results(mut self, n: i32) -> Self {
        self.max_results = n;
        self
    }

    pub fn with_credentials_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.credentials_path = path.into();
        self
    }

    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = Some(path.into());
        self
    }

    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = Some(url.into());
        self
    }

    /// The cap as an event count.
    pub fn cap(&self) -> usize {
        usize::try_from(self.max_results).unwrap_or(0)
    }
}
