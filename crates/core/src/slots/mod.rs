//! Slot generation and merge-upsert aggregation

pub mod generator;
pub mod ports;
pub mod service;

pub use service::SlotService;
