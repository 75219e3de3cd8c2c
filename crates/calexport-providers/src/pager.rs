//! Pagination over an [`EventSource`].
//!
//! [`EventPager`] walks the pages of one calendar until the source runs out
//! of cursors or the configured cap is reached. It can be driven page by
//! page, or turned into a lazy stream of [`FlatRecord`]s with
//! [`EventPager::into_records`] so callers that only need the first few
//! events never fetch the rest.

use calexport_core::FlatRecord;
use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt, TryStreamExt, stream};
use tracing::debug;

use crate::error::ProviderResult;
use crate::flatten::flatten_event;
use crate::provider::{EventSource, MAX_PAGE_SIZE, PageRequest};
use crate::raw_event::RawEvent;

/// Cursor-driven walk over the upcoming events of one calendar.
pub struct EventPager<'a> {
    source: &'a dyn EventSource,
    calendar_id: String,
    time_min: DateTime<Utc>,
    cap: usize,
    fetched: usize,
    cursor: Option<String>,
    exhausted: bool,
}

impl<'a> EventPager<'a> {
    /// Creates a pager that yields at most `cap` events starting from `time_min`.
    pub fn new(
        source: &'a dyn EventSource,
        calendar_id: impl Into<String>,
        time_min: DateTime<Utc>,
        cap: usize,
    ) -> Self {
        Self {
            source,
            calendar_id: calendar_id.into(),
            time_min,
            cap,
            fetched: 0,
            cursor: None,
            exhausted: cap == 0,
        }
    }

    /// Number of events handed out so far.
    pub fn fetched(&self) -> usize {
        self.fetched
    }

    /// Returns true once no further page will be requested.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Rewinds to the first page.
    pub fn reset(&mut self) {
        self.fetched = 0;
        self.cursor = None;
        self.exhausted = self.cap == 0;
    }

    /// Fetches the next page, or `None` when the walk is over.
    ///
    /// A page that would overshoot the cap is truncated to it.
    pub async fn next_page(&mut self) -> ProviderResult<Option<Vec<RawEvent>>> {
        if self.exhausted {
            return Ok(None);
        }

        let remaining = self.cap - self.fetched;
        let request = PageRequest::new(&self.calendar_id, self.time_min)
            .with_max_results(remaining.min(MAX_PAGE_SIZE))
            .with_page_token(self.cursor.take());

        debug!(
            "requesting up to {} events from {} calendar {}",
            request.max_results,
            self.source.name(),
            self.calendar_id
        );

        let page = self.source.list_page(request).await?;

        let mut events = page.events;
        events.truncate(remaining);
        self.fetched += events.len();
        self.cursor = page.next_page_token;

        if self.cursor.is_none() || self.fetched >= self.cap {
            self.exhausted = true;
        }

        debug!(
            "received {} events ({} total, more pages: {})",
            events.len(),
            self.fetched,
            !self.exhausted
        );

        Ok(Some(events))
    }

    /// Fetches every remaining page and returns the raw events in order.
    pub async fn collect_all(mut self) -> ProviderResult<Vec<RawEvent>> {
        let mut all_events = Vec::new();
        while let Some(events) = self.next_page().await? {
            all_events.extend(events);
        }
        Ok(all_events)
    }

    /// Turns the pager into a lazy stream of flat records.
    ///
    /// Pages are fetched only as the stream is polled. The stream ends after
    /// the first error.
    pub fn into_records(self) -> impl Stream<Item = ProviderResult<FlatRecord>> + 'a {
        stream::try_unfold(self, |mut pager| async move {
            Ok(pager.next_page().await?.map(|events| (events, pager)))
        })
        .map_ok(|events| stream::iter(events.into_iter().map(|e| Ok(flatten_event(&e)))))
        .try_flatten()
    }
}

/// Collects the flat records of every upcoming event, up to `cap`.
pub async fn fetch_records(
    source: &dyn EventSource,
    calendar_id: &str,
    time_min: DateTime<Utc>,
    cap: usize,
) -> ProviderResult<Vec<FlatRecord>> {
    EventPager::new(source, calendar_id, time_min, cap)
        .into_records()
        .try_collect()
        .await
}

/// Takes the first `n` records without fetching pages beyond them.
pub async fn first_records(
    source: &dyn EventSource,
    calendar_id: &str,
    time_min: DateTime<Utc>,
    n: usize,
) -> ProviderResult<Vec<FlatRecord>> {
    EventPager::new(source, calendar_id, time_min, usize::MAX)
        .into_records()
        .take(n)
        .try_collect()
        .await
}
