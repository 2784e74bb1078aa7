//! Report aggregation - grouped trees, chart axes, owed amounts
//!
//! Reports are derived entirely from stored time logs at read time, so
//! re-reading after conflict resolution always reflects the adjusted
//! timeline.

pub mod grouping;
pub mod service;

pub use service::ReportService;
