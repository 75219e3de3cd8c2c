//! RawEvent to FlatRecord conversion.
//!
//! The all-day classification comes from the start value alone and then
//! decides how *both* start and end are rendered:
//!
//! - all-day: bare `YYYY-MM-DD`
//! - timed: `YYYY-MM-DD HH:MM:SS` in the value's own offset
//!
//! A value that is missing, or whose kind disagrees with the classification,
//! renders as an empty string.

use calexport_core::{ATTENDEE_SEPARATOR, FlatRecord, format_date, format_timestamp};

use crate::raw_event::{RawAttendee, RawEvent, RawEventTime};

/// Converts a [`RawEvent`] to a [`FlatRecord`].
pub fn flatten_event(raw: &RawEvent) -> FlatRecord {
    let is_all_day = raw.is_all_day();

    FlatRecord {
        event_id: raw.id.clone(),
        summary: raw.summary.clone(),
        description: raw.description.clone(),
        location: raw.location.clone(),
        start_date_time: format_event_time(raw.start.as_ref(), is_all_day),
        end_date_time: format_event_time(raw.end.as_ref(), is_all_day),
        is_all_day,
        status: raw.status.clone(),
        organizer: raw.organizer_email.clone(),
        creator: raw.creator_email.clone(),
        attendees: raw.attendees.as_deref().map(join_attendees),
        html_link: raw.html_link.clone(),
        created: raw.created.as_ref().map(format_timestamp),
        updated: raw.updated.as_ref().map(format_timestamp),
        recurrence: raw.recurring_event_id.clone(),
    }
}

/// Converts a batch of raw events, preserving order.
pub fn flatten_events(raws: &[RawEvent]) -> Vec<FlatRecord> {
    raws.iter().map(flatten_event).collect()
}

fn format_event_time(time: Option<&RawEventTime>, is_all_day: bool) -> String {
    match (time, is_all_day) {
        (Some(RawEventTime::Date(date)), true) => format_date(date),
        (Some(RawEventTime::DateTime(dt)), false) => format_timestamp(dt),
        _ => String::new(),
    }
}

/// Joins attendee emails in source order; a missing email leaves an empty slot.
fn join_attendees(attendees: &[RawAttendee]) -> String {
    attendees
        .iter()
        .map(|a| a.email.as_deref().unwrap_or_default())
        .collect::<Vec<_>>()
        .join(ATTENDEE_SEPARATOR)
}
