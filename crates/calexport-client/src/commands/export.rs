//! The export command.
//!
//! All records are collected before the output file is opened, so a failure
//! anywhere in pagination leaves no file behind.

use std::path::Path;

use calexport_core::FlatRecord;
use calexport_providers::{EventSource, fetch_records};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::config::ExportConfig;
use crate::error::{ExportError, ExportResult};
use crate::output::write_csv_file;

/// Authenticates against Google and exports the configured calendar.
///
/// Returns the number of events written.
#[cfg(feature = "google")]
pub async fn run(config: &ExportConfig) -> ExportResult<usize> {
    use std::sync::Arc;

    use calexport_providers::google::{GoogleAuthenticator, GoogleCalendarClient, GoogleConfig};

    let started = Utc::now();
    let credentials = load_credentials(&config.credentials_path)?;

    let mut google = GoogleConfig::new(credentials);
    if let Some(path) = &config.token_path {
        google = google.with_token_path(path);
    }
    if let Some(url) = &config.api_base_url {
        google = google.with_api_base_url(url);
    }

    let authenticator = Arc::new(GoogleAuthenticator::new(google.clone())?);
    let client = GoogleCalendarClient::from_config(&google, authenticator)?;
    export_from(&client, config, started).await
}

#[cfg(feature = "google")]
fn load_credentials(
    path: &Path,
) -> ExportResult<calexport_providers::google::OAuthCredentials> {
    use calexport_providers::google::OAuthCredentials;

    let credentials = OAuthCredentials::from_file(path).map_err(|e| {
        if e.is_not_found() {
            ExportError::MissingCredentials(path.to_path_buf())
        } else {
            ExportError::InvalidCredentials {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;
    credentials
        .validate()
        .map_err(|source| ExportError::InvalidCredentials {
            path: path.to_path_buf(),
            source,
        })?;
    debug!("loaded OAuth client credentials from {}", path.display());
    Ok(credentials)
}

/// Exports from any event source: every event starting at or after
/// `time_min`, up to the configured cap.
pub async fn export_from(
    source: &dyn EventSource,
    config: &ExportConfig,
    time_min: DateTime<Utc>,
) -> ExportResult<usize> {
    let records = collect_records(source, &config.calendar_id, time_min, config.cap()).await?;
    write(&config.output, &records)?;
    Ok(records.len())
}

/// Pages through the calendar, turning a missing calendar into a
/// dedicated error.
pub async fn collect_records(
    source: &dyn EventSource,
    calendar_id: &str,
    time_min: DateTime<Utc>,
    cap: usize,
) -> ExportResult<Vec<FlatRecord>> {
    info!("exporting up to {cap} events from calendar {calendar_id}");
    fetch_records(source, calendar_id, time_min, cap)
        .await
        .map_err(|e| {
            if e.is_not_found() {
                ExportError::CalendarNotFound(calendar_id.to_string())
            } else {
                ExportError::Provider(e)
            }
        })
}

fn write(path: &Path, records: &[FlatRecord]) -> ExportResult<()> {
    write_csv_file(path, records)?;
    info!("wrote {} records to {}", records.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use calexport_providers::{
        BoxFuture, EventPage, PageRequest, ProviderError, ProviderResult, RawEvent,
    };

    /// Two pages of two events each; fails with `error` on call `fail_on`.
    struct TwoPages {
        calls: AtomicUsize,
        fail_on: Option<(usize, fn() -> ProviderError)>,
    }

    impl TwoPages {
        fn ok() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_on: None,
            }
        }

        fn failing(call: usize, error: fn() -> ProviderError) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_on: Some((call, error)),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl EventSource for TwoPages {
        fn name(&self) -> &str {
            "two-pages"
        }

        fn list_page(&self, request: PageRequest) -> BoxFuture<'_, ProviderResult<EventPage>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            let result = match self.fail_on {
                Some((n, error)) if n == call => Err(error()),
                _ => {
                    let first = request.page_token.is_none();
                    let base = if first { 0 } else { 2 };
                    let events = (base..base + 2)
                        .map(|i| RawEvent::new(format!("evt-{i}")))
                        .collect();
                    let next = first.then(|| "p2".to_string());
                    Ok(EventPage::new(events, next))
                }
            };
            Box::pin(async move { result })
        }
    }

    fn config(dir: &tempfile::TempDir) -> ExportConfig {
        ExportConfig::default().with_output(dir.path().join("events.csv"))
    }

    #[tokio::test]
    async fn writes_every_page() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);
        let source = TwoPages::ok();

        let written = export_from(&source, &config, Utc::now()).await.unwrap();
        assert_eq!(written, 4);
        assert_eq!(source.calls(), 2);

        let text = std::fs::read_to_string(&config.output).unwrap();
        assert_eq!(text.lines().count(), 5);
        assert!(text.lines().nth(4).unwrap().starts_with("evt-3,"));
    }

    #[tokio::test]
    async fn cap_stops_early() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir).with_max_results(1);
        let source = TwoPages::ok();

        assert_eq!(export_from(&source, &config, Utc::now()).await.unwrap(), 1);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn non_positive_cap_writes_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir).with_max_results(-1);
        let source = TwoPages::ok();

        assert_eq!(export_from(&source, &config, Utc::now()).await.unwrap(), 0);
        assert_eq!(source.calls(), 0);
        let text = std::fs::read_to_string(&config.output).unwrap();
        assert_eq!(text.lines().count(), 1);
    }

    #[tokio::test]
    async fn missing_calendar_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir).with_calendar_id("nobody@example.com");
        let source = TwoPages::failing(1, || ProviderError::not_found("404"));

        let err = export_from(&source, &config, Utc::now()).await.unwrap_err();
        assert!(matches!(err, ExportError::CalendarNotFound(ref id) if id == "nobody@example.com"));
        assert!(!config.output.exists());
    }

    #[tokio::test]
    async fn failure_on_later_page_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);
        let source = TwoPages::failing(2, || ProviderError::server("backend unavailable"));

        let err = export_from(&source, &config, Utc::now()).await.unwrap_err();
        assert!(matches!(err, ExportError::Provider(_)));
        assert!(err.to_string().contains("backend unavailable"));
        assert!(!config.output.exists());
    }

    #[cfg(feature = "google")]
    #[tokio::test]
    async fn missing_credentials_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir).with_credentials_path(dir.path().join("credentials.json"));

        let err = run(&config).await.unwrap_err();
        assert!(matches!(err, ExportError::MissingCredentials(_)));
        assert!(!config.output.exists());
    }

    #[cfg(feature = "google")]
    #[tokio::test]
    async fn unusable_credentials_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, r#"{"type": "service_account"}"#).unwrap();
        let config = config(&dir).with_credentials_path(&path);

        let err = run(&config).await.unwrap_err();
        assert!(matches!(err, ExportError::InvalidCredentials { .. }));
    }

    #[cfg(feature = "google")]
    #[tokio::test]
    async fn exports_from_google_with_cached_token() {
        use calexport_providers::google::{GoogleConfig, TokenInfo, TokenStorage};

        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/calendars/primary/events")
            .match_query(mockito::Matcher::Any)
            .match_header("authorization", "Bearer ya29.cached")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"items": [{"id": "e1", "summary": "Review", "start": {"dateTime": "2030-01-02T15:00:00+01:00"}, "end": {"dateTime": "2030-01-02T16:00:00+01:00"}}]}"#,
            )
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let credentials = dir.path().join("credentials.json");
        std::fs::write(
            &credentials,
            r#"{"installed": {"client_id": "id.apps.googleusercontent.com", "client_secret": "s"}}"#,
        )
        .unwrap();
        let token_path = dir.path().join("tokens-user.json");
        TokenStorage::new(&token_path)
            .save(&TokenInfo::new(
                "ya29.cached",
                Some("1//r".to_string()),
                Some(3600),
                vec![GoogleConfig::READONLY_SCOPE.to_string()],
            ))
            .unwrap();

        let config = config(&dir)
            .with_credentials_path(&credentials)
            .with_token_path(&token_path)
            .with_api_base_url(server.url());

        assert_eq!(run(&config).await.unwrap(), 1);
        mock.assert_async().await;

        let text = std::fs::read_to_string(&config.output).unwrap();
        assert!(text.contains("e1,Review,,,2030-01-02 15:00:00,2030-01-02 16:00:00,False,"));
    }
}
