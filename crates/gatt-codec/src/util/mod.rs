//! Utility modules.

pub mod datetime;

pub use datetime::{
    add_minutes, format_datetime_iso8601, parse_datetime_iso8601, validate_datetime,
    DateTimeParseError,
};
