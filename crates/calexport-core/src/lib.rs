//! Core types: flat event records, timestamp formatting, tracing setup

pub mod record;
pub mod tracing;

pub use record::{
    ATTENDEE_SEPARATOR, DATE_FORMAT, FLAT_RECORD_HEADERS, FlatRecord, TIMESTAMP_FORMAT,
    format_date, format_timestamp,
};
pub use self::tracing::{TracingConfig, TracingError, init_tracing};
