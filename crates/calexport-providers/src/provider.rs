//! Event source and token source traits.
//!
//! These are the two seams between the export logic and the outside world:
//!
//! - [`TokenSource`] hands out a currently valid bearer token, refreshing or
//!   re-authorizing behind the scenes.
//! - [`EventSource`] returns one page of upcoming events per call.
//!
//! Both are object-safe so the paginator can be driven by stubs in tests.

use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Utc};

use crate::error::ProviderResult;
use crate::raw_event::RawEvent;

/// A boxed future for async trait methods.
///
/// Boxed futures keep the traits object-safe.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Largest page the Google Calendar events endpoint will return.
pub const MAX_PAGE_SIZE: usize = 2500;

/// Parameters for a single page request.
///
/// The filters that never vary for this tool (expanded instances, deleted
/// events hidden, ordered by start time) are implied by the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// The calendar identifier (e.g. "primary").
    pub calendar_id: String,
    /// Lower time bound; sent as `timeMin`.
    pub time_min: DateTime<Utc>,
    /// Upper bound on the number of events in this page.
    pub max_results: usize,
    /// Cursor returned by the previous page, if any.
    pub page_token: Option<String>,
}

impl PageRequest {
    pub fn new(calendar_id: impl Into<String>, time_min: DateTime<Utc>) -> Self {
        Self {
            calendar_id: calendar_id.into(),
            time_min,
            max_results: MAX_PAGE_SIZE,
            page_token: None,
        }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_page_token(mut self, page_token: Option<String>) -> Self {
        self.page_token = page_token;
        self
    }
}

/// One page of events.
#[derive(Debug, Clone, Default)]
pub struct EventPage {
    pub events: Vec<RawEvent>,
    /// Cursor for the next page; `None` when this was the last one.
    pub next_page_token: Option<String>,
}

impl EventPage {
    pub fn new(events: Vec<RawEvent>, next_page_token: Option<String>) -> Self {
        Self {
            events,
            next_page_token,
        }
    }
}

/// Supplies bearer tokens for API requests.
pub trait TokenSource: Send + Sync {
    /// Returns an access token that is valid right now.
    fn access_token(&self) -> BoxFuture<'_, ProviderResult<String>>;
}

/// A paged list endpoint of upcoming events.
///
/// Implementations must return future events only, expand recurring events
/// into single instances, exclude deleted events, and order by start time.
pub trait EventSource: Send + Sync {
    /// Returns the name of this source (e.g. "google").
    fn name(&self) -> &str;

    /// Fetches one page of events.
    ///
    /// # Errors
    ///
    /// Returns a `ProviderError` with code `NotFound` when the calendar does
    /// not exist, and other codes for network or API failures.
    fn list_page(&self, request: PageRequest) -> BoxFuture<'_, ProviderResult<EventPage>>;
}

/// A token source that always returns the same token.
#[derive(Debug, Clone)]
pub struct StaticTokenSource {
    token: String,
}

impl StaticTokenSource {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl TokenSource for StaticTokenSource {
    fn access_token(&self) -> BoxFuture<'_, ProviderResult<String>> {
        let token = self.token.clone();
        Box::pin(async move { Ok(token) })
    }
}
