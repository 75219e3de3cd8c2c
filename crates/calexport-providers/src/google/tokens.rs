//! OAuth token cache.
//!
//! The cache is a single JSON file. The in-memory copy lives in the
//! authenticator; this module only knows how to read and replace the file.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};

/// Seconds shaved off the reported lifetime so a token is refreshed before
/// Google starts rejecting it.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// A cached OAuth grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Already includes the safety margin. `None` means no known expiry.
    pub expires_at: Option<DateTime<Utc>>,
    /// Scopes granted with this token.
    #[serde(default)]
    pub scopes: Vec<String>,
    pub last_refresh: DateTime<Utc>,
}

fn expiry_from(expires_in_secs: Option<i64>, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    expires_in_secs.map(|secs| now + Duration::seconds(secs - EXPIRY_MARGIN_SECS))
}

impl TokenInfo {
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
        scopes: Vec<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at: expiry_from(expires_in_secs, now),
            scopes,
            last_refresh: now,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Utc::now() >= at)
    }

    /// Returns true if every scope in `required` was granted.
    pub fn has_scopes(&self, required: &[String]) -> bool {
        required.iter().all(|s| self.scopes.contains(s))
    }

    /// Applies the result of a refresh grant.
    ///
    /// Google only sometimes rotates the refresh token; the old one is kept
    /// when none is returned.
    pub fn apply_refresh(
        &mut self,
        access_token: impl Into<String>,
        expires_in_secs: Option<i64>,
        refresh_token: Option<String>,
    ) {
        let now = Utc::now();
        self.access_token = access_token.into();
        self.expires_at = expiry_from(expires_in_secs, now);
        if refresh_token.is_some() {
            self.refresh_token = refresh_token;
        }
        self.last_refresh = now;
    }
}

/// File-backed token cache.
#[derive(Debug, Clone)]
pub struct TokenStorage {
    path: PathBuf,
}

impl TokenStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the cache, returning `None` when there is no file yet.
    pub fn load(&self) -> ProviderResult<Option<TokenInfo>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no token cache at {}", self.path.display());
                return Ok(None);
            }
            Err(e) => {
                return Err(ProviderError::configuration(format!(
                    "failed to read token cache {}",
                    self.path.display()
                ))
                .with_source(e));
            }
        };

        let tokens = serde_json::from_str(&content).map_err(|e| {
            ProviderError::configuration(format!(
                "token cache {} is corrupt",
                self.path.display()
            ))
            .with_source(e)
        })?;

        debug!("loaded token cache from {}", self.path.display());
        Ok(Some(tokens))
    }

    /// Replaces the cache file.
    ///
    /// The file is written next to its final location and renamed over it,
    /// then restricted to the owner on Unix.
    pub fn save(&self, tokens: &TokenInfo) -> ProviderResult<()> {
        let io_err = |what: &str, e: std::io::Error| {
            ProviderError::configuration(format!("failed to {what} {}", self.path.display()))
                .with_source(e)
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| io_err("create the directory for", e))?;
        }

        let content = serde_json::to_string_pretty(tokens).map_err(|e| {
            ProviderError::internal("failed to serialize tokens").with_source(e)
        })?;

        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, content).map_err(|e| io_err("write", e))?;
        fs::rename(&staging, &self.path).map_err(|e| io_err("replace", e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))
                .map_err(|e| io_err("restrict permissions on", e))?;
        }

        debug!("saved token cache to {}", self.path.display());
        Ok(())
    }

    /// Deletes the cache file if present.
    pub fn clear(&self) -> ProviderResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ProviderError::configuration(format!(
                "failed to remove {}",
                self.path.display()
            ))
            .with_source(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCOPE: &str = "https://www.googleapis.com/auth/calendar.readonly";

    fn sample() -> TokenInfo {
        TokenInfo::new(
            "ya29.access",
            Some("1//refresh".to_string()),
            Some(3600),
            vec![SCOPE.to_string()],
        )
    }

    #[test]
    fn expiry_includes_margin() {
        let token = sample();
        let remaining = token.expires_at.unwrap() - Utc::now();
        assert!(remaining <= Duration::seconds(3540));
        assert!(remaining > Duration::seconds(3500));
        assert!(!token.is_expired());
    }

    #[test]
    fn short_lived_token_is_already_expired() {
        let token = TokenInfo::new("a", None, Some(30), vec![]);
        assert!(token.is_expired());
    }

    #[test]
    fn no_expiry_never_expires() {
        assert!(!TokenInfo::new("a", None, None, vec![]).is_expired());
    }

    #[test]
    fn scope_check() {
        let token = sample();
        assert!(token.has_scopes(&[SCOPE.to_string()]));
        assert!(!token.has_scopes(&["https://www.googleapis.com/auth/calendar".to_string()]));
        assert!(token.has_scopes(&[]));
    }

    #[test]
    fn refresh_keeps_old_refresh_token() {
        let mut token = sample();
        token.expires_at = Some(Utc::now() - Duration::hours(1));
        assert!(token.is_expired());

        token.apply_refresh("ya29.new", Some(3600), None);
        assert_eq!(token.access_token, "ya29.new");
        assert_eq!(token.refresh_token.as_deref(), Some("1//refresh"));
        assert!(!token.is_expired());

        token.apply_refresh("ya29.newer", Some(3600), Some("1//rotated".to_string()));
        assert_eq!(token.refresh_token.as_deref(), Some("1//rotated"));
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let storage = TokenStorage::new(dir.path().join("nested").join("tokens-user.json"));

        storage.save(&sample()).unwrap();
        let loaded = storage.load().unwrap().unwrap();
        assert_eq!(loaded, sample_with_times(&loaded));
        assert!(!storage.path().with_extension("json.tmp").exists());
    }

    fn sample_with_times(loaded: &TokenInfo) -> TokenInfo {
        TokenInfo {
            expires_at: loaded.expires_at,
            last_refresh: loaded.last_refresh,
            ..sample()
        }
    }

    #[cfg(unix)]
    #[test]
    fn saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let storage = TokenStorage::new(dir.path().join("tokens-user.json"));
        storage.save(&sample()).unwrap();

        let mode = fs::metadata(storage.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn missing_file_loads_none() {
        let dir = tempfile::tempdir().unwrap();
        let storage = TokenStorage::new(dir.path().join("tokens-user.json"));
        assert!(storage.load().unwrap().is_none());
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens-user.json");
        fs::write(&path, "{").unwrap();
        assert!(TokenStorage::new(path).load().is_err());
    }

    #[test]
    fn clear_removes_file_and_tolerates_absence() {
        let dir = tempfile::tempdir().unwrap();
        let storage = TokenStorage::new(dir.path().join("tokens-user.json"));
        storage.save(&sample()).unwrap();

        storage.clear().unwrap();
        assert!(!storage.path().exists());
        storage.clear().unwrap();
    }
}
