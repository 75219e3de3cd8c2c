//! Calendar event sources for calexport.
//!
//! ```text
//!  Google Calendar API
//!          │  GET /calendars/{id}/events
//!          ▼
//!  GoogleCalendarClient ──▶ TokenSource (GoogleAuthenticator)
//!          │  EventSource::list_page
//!          ▼
//!     EventPager ── flatten_event ──▶ Stream<FlatRecord>
//! ```
//!
//! The pager and mapper only see the [`EventSource`] trait, so they can be
//! driven by any backend or by a stub in tests.

pub mod error;
pub mod flatten;
#[cfg(feature = "google")]
pub mod google;
pub mod pager;
pub mod provider;
pub mod raw_event;

pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use flatten::{flatten_event, flatten_events};
pub use pager::{EventPager, fetch_records, first_records};
pub use provider::{
    BoxFuture, EventPage, EventSource, MAX_PAGE_SIZE, PageRequest, StaticTokenSource, TokenSource,
};
pub use raw_event::{RawAttendee, RawEvent, RawEventTime};
