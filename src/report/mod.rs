//! Session report export

pub mod json;

pub use json::{recording_id, write_report, ReportMetadata, SessionReport};
