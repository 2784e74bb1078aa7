//! Time log lifecycle: manual entries, timers, and conflict resolution

pub mod conflicts;
pub mod ports;
pub mod service;

pub use service::TimeLogService;
