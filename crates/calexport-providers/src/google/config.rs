//! Google Calendar client configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ProviderError, ProviderResult};

/// OAuth 2.0 client credentials from the Google Cloud Console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Layout of a downloaded client-secret file.
///
/// The Console nests the pair under `installed` (desktop apps) or `web`;
/// some tools write it flat at the root.
#[derive(Debug, Deserialize)]
struct ClientSecretFile {
    installed: Option<ClientSection>,
    web: Option<ClientSection>,
    client_id: Option<String>,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClientSection {
    client_id: String,
    client_secret: String,
}

impl OAuthCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Reads a client-secret JSON file.
    ///
    /// A missing file is reported as `NotFound` so callers can tell it
    /// apart from a file that exists but cannot be used.
    pub fn from_file(path: impl AsRef<Path>) -> ProviderResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            let err = if e.kind() == std::io::ErrorKind::NotFound {
                ProviderError::not_found(format!("{} does not exist", path.display()))
            } else {
                ProviderError::configuration(format!("failed to read {}", path.display()))
            };
            err.with_source(e)
        })?;
        Self::from_json(&content)
    }

    /// Parses a client-secret JSON document.
    pub fn from_json(json: &str) -> ProviderResult<Self> {
        let file: ClientSecretFile = serde_json::from_str(json).map_err(|e| {
            ProviderError::configuration("failed to parse client secret JSON").with_source(e)
        })?;

        if let Some(section) = file.installed.or(file.web) {
            return Ok(Self::new(section.client_id, section.client_secret));
        }

        match (file.client_id, file.client_secret) {
            (Some(id), Some(secret)) => Ok(Self::new(id, secret)),
            _ => Err(ProviderError::configuration(
                "client secret JSON has no 'installed' or 'web' section and no root client_id/client_secret",
            )),
        }
    }

    /// Rejects obviously unusable credentials.
    pub fn validate(&self) -> ProviderResult<()> {
        if self.client_id.trim().is_empty() {
            return Err(ProviderError::configuration("client_id is empty"));
        }
        if self.client_secret.trim().is_empty() {
            return Err(ProviderError::configuration("client_secret is empty"));
        }
        Ok(())
    }
}

/// Settings for the Google authenticator and events client.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub credentials: OAuthCredentials,
    /// Where the OAuth token cache lives.
    pub token_path: PathBuf,
    pub scopes: Vec<String>,
    /// Inclusive port range tried for the loopback redirect listener.
    pub loopback_port_range: (u16, u16),
    pub timeout: Duration,
    pub user_agent: String,
    /// Root of the Calendar v3 API; overridden in tests.
    pub api_base_url: String,
}

impl GoogleConfig {
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    pub const READONLY_SCOPE: &'static str = "https://www.googleapis.com/auth/calendar.readonly";

    pub const API_BASE_URL: &'static str = "https://www.googleapis.com/calendar/v3";

    pub fn new(credentials: OAuthCredentials) -> Self {
        Self {
            credentials,
            token_path: Self::default_token_path(),
            scopes: vec![Self::READONLY_SCOPE.to_string()],
            loopback_port_range: (8080, 8090),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            user_agent: format!("calexport/{}", env!("CARGO_PKG_VERSION")),
            api_base_url: Self::API_BASE_URL.to_string(),
        }
    }

    /// `~/.credentials/calexport/tokens-user.json`, or a relative path when
    /// there is no home directory.
    pub fn default_token_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".credentials")
            .join("calexport")
            .join("tokens-user.json")
    }

    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = path.into();
        self
    }

    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    pub fn with_loopback_port_range(mut self, start: u16, end: u16) -> Self {
        self.loopback_port_range = (start, end);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    pub fn validate(&self) -> ProviderResult<()> {
        self.credentials.validate()?;
        if self.scopes.is_empty() {
            return Err(ProviderError::configuration("no OAuth scope configured"));
        }
        let (start, end) = self.loopback_port_range;
        if start > end {
            return Err(ProviderError::configuration(format!(
                "loopback port range {start}-{end} is empty"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorCode;

    fn creds() -> OAuthCredentials {
        OAuthCredentials::new("id.apps.googleusercontent.com", "secret")
    }

    #[test]
    fn parses_installed_section() {
        let json = r#"{"installed": {"client_id": "a.apps.googleusercontent.com", "client_secret": "s", "project_id": "p", "redirect_uris": ["http://localhost"]}}"#;
        let parsed = OAuthCredentials::from_json(json).unwrap();
        assert_eq!(parsed, OAuthCredentials::new("a.apps.googleusercontent.com", "s"));
    }

    #[test]
    fn parses_web_section() {
        let json = r#"{"web": {"client_id": "w", "client_secret": "ws"}}"#;
        let parsed = OAuthCredentials::from_json(json).unwrap();
        assert_eq!(parsed.client_id, "w");
        assert_eq!(parsed.client_secret, "ws");
    }

    #[test]
    fn parses_flat_layout() {
        let json = r#"{"client_id": "f", "client_secret": "fs", "refresh_token": "ignored"}"#;
        let parsed = OAuthCredentials::from_json(json).unwrap();
        assert_eq!(parsed.client_id, "f");
    }

    #[test]
    fn rejects_unknown_layout() {
        let err = OAuthCredentials::from_json(r#"{"other": {}}"#).unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::ConfigurationError);
    }

    #[test]
    fn rejects_malformed_json() {
        let err = OAuthCredentials::from_json("{not json").unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::ConfigurationError);
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = OAuthCredentials::from_file(dir.path().join("credentials.json")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn reads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, r#"{"installed": {"client_id": "d", "client_secret": "ds"}}"#)
            .unwrap();
        assert_eq!(OAuthCredentials::from_file(&path).unwrap().client_id, "d");
    }

    #[test]
    fn empty_secret_fails_validation() {
        assert!(creds().validate().is_ok());
        assert!(OAuthCredentials::new("id", " ").validate().is_err());
        assert!(OAuthCredentials::new("", "s").validate().is_err());
    }

    #[test]
    fn defaults() {
        let config = GoogleConfig::new(creds());
        assert_eq!(config.scopes, vec![GoogleConfig::READONLY_SCOPE.to_string()]);
        assert_eq!(config.loopback_port_range, (8080, 8090));
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.api_base_url, GoogleConfig::API_BASE_URL);
        assert!(config.user_agent.starts_with("calexport/"));
        assert!(config.token_path.ends_with(".credentials/calexport/tokens-user.json"));
    }

    #[test]
    fn validation_rejects_bad_settings() {
        assert!(GoogleConfig::new(creds()).validate().is_ok());
        assert!(GoogleConfig::new(creds()).with_scopes(vec![]).validate().is_err());
        assert!(
            GoogleConfig::new(creds())
                .with_loopback_port_range(9000, 8000)
                .validate()
                .is_err()
        );
    }
}
