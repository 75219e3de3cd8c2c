//! Raw event type from calendar providers.
//!
//! A [`RawEvent`] is the provider's view of an event, with every field
//! optional. It is read-only to the rest of the program: the mapper in
//! [`crate::flatten`] turns it into a [`calexport_core::FlatRecord`].

use chrono::{DateTime, FixedOffset, NaiveDate};

/// The start or end of a raw event.
///
/// Providers send either a timestamp with an offset, or a bare date for
/// all-day events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawEventTime {
    /// A specific instant, kept in the offset the provider reported.
    DateTime(DateTime<FixedOffset>),
    /// An all-day event date (no time-of-day component).
    Date(NaiveDate),
}

impl RawEventTime {
    pub fn from_datetime(dt: DateTime<FixedOffset>) -> Self {
        Self::DateTime(dt)
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self::Date(date)
    }

    /// Returns true if this is a date-only value.
    pub fn is_all_day(&self) -> bool {
        matches!(self, Self::Date(_))
    }
}

/// An attendee of a calendar event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawAttendee {
    /// Google omits the email for some resources (rooms, groups).
    pub email: Option<String>,
}

impl RawAttendee {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
        }
    }
}

/// A raw calendar event from a provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEvent {
    pub id: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start: Option<RawEventTime>,
    pub end: Option<RawEventTime>,
    /// The event status ("confirmed", "tentative", "cancelled").
    pub status: Option<String>,
    pub organizer_email: Option<String>,
    pub creator_email: Option<String>,
    /// `None` when the provider sent no attendee list at all.
    pub attendees: Option<Vec<RawAttendee>>,
    /// A direct link to view this event in the calendar UI.
    pub html_link: Option<String>,
    pub created: Option<DateTime<FixedOffset>>,
    pub updated: Option<DateTime<FixedOffset>>,
    /// The ID of the recurring series this instance belongs to.
    pub recurring_event_id: Option<String>,
}

impl RawEvent {
    /// Creates an event with only an identifier set.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    /// An event is all-day iff its start is a bare date.
    pub fn is_all_day(&self) -> bool {
        self.start.as_ref().is_some_and(RawEventTime::is_all_day)
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_start(mut self, start: RawEventTime) -> Self {
        self.start = Some(start);
        self
    }

    pub fn with_end(mut self, end: RawEventTime) -> Self {
        self.end = Some(end);
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_html_link(mut self, html_link: impl Into<String>) -> Self {
        self.html_link = Some(html_link.into());
        self
    }

    pub fn with_recurring(mut self, recurring_event_id: impl Into<String>) -> Self {
        self.recurring_event_id = Some(recurring_event_id.into());
        self
    }

    /// Builder method to add an attendee, creating the list if needed.
    pub fn with_attendee(mut self, attendee: RawAttendee) -> Self {
        self.attendees.get_or_insert_with(Vec::new).push(attendee);
        self
    }
}
