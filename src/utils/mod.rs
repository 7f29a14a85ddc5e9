//! Shared helpers

pub mod date;
pub mod string;

pub use date::{date_to_journal_format, journal_format_to_date, journal_name_candidates};
pub use string::{preview, truncate_chars};
