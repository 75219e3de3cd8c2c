//! Flat event records.
//!
//! A [`FlatRecord`] is the denormalized, fifteen-column row that ends up in
//! the CSV export. Every field is already formatted as text (apart from the
//! all-day flag), so the sink never has to know about dates or offsets.

use std::fmt::Display;

use chrono::{DateTime, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};

/// Format used for timed values (`2024-03-15 10:00:00`).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format used for all-day values (`2024-03-15`).
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Column names, in the order they are written.
pub const FLAT_RECORD_HEADERS: [&str; 15] = [
    "EventId",
    "Summary",
    "Description",
    "Location",
    "StartDateTime",
    "EndDateTime",
    "IsAllDay",
    "Status",
    "Organizer",
    "Creator",
    "Attendees",
    "HtmlLink",
    "Created",
    "Updated",
    "Recurrence",
];

/// Separator placed between attendee emails.
pub const ATTENDEE_SEPARATOR: &str = ";";

/// Formats a timestamp in its own offset, without the offset suffix.
pub fn format_timestamp<Tz>(dt: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    dt.format(TIMESTAMP_FORMAT).to_string()
}

/// Formats a bare calendar date.
pub fn format_date(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// One exported calendar event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FlatRecord {
    pub event_id: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    /// Formatted start; empty when the event has no usable start.
    pub start_date_time: String,
    /// Formatted end; empty when the event has no usable end.
    pub end_date_time: String,
    #[serde(with = "title_case_bool")]
    pub is_all_day: bool,
    pub status: Option<String>,
    /// Organizer email.
    pub organizer: Option<String>,
    /// Creator email.
    pub creator: Option<String>,
    /// Attendee emails joined with [`ATTENDEE_SEPARATOR`].
    pub attendees: Option<String>,
    pub html_link: Option<String>,
    pub created: Option<String>,
    pub updated: Option<String>,
    /// Identifier of the recurring series this instance belongs to.
    pub recurrence: Option<String>,
}

/// Writes booleans as `True`/`False`, reads them case-insensitively.
mod title_case_bool {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(if *value { "True" } else { "False" })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw.eq_ignore_ascii_case("true") {
            Ok(true)
        } else if raw.eq_ignore_ascii_case("false") {
            Ok(false)
        } else {
            Err(D::Error::custom(format!("invalid boolean: {raw:?}")))
        }
    }
}
