//! Rendering of reconciled lease records.
//!
//! This module defines the `LeaseReporter` trait and a plain-text table
//! implementation. Sorting and filtering happen here, never in the parsers.

mod table_reporter;

pub use table_reporter::{Origin, RecordFilter, SortKey, TableReporter};

use crate::LeaseReport;

/// Trait for presenting one address family's report.
pub trait LeaseReporter {
    /// Present the records and warnings of a pass.
    fn report(&self, report: &LeaseReport);
}
