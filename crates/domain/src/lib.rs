//! # TimeForge Domain
//!
//! Business domain types and models for the TimeForge timesheet engine.
//!
//! This crate contains:
//! - Domain data types (TimeLog, TimeSlot, Activity, reports)
//! - Domain error types and Result definitions
//! - Configuration structures
//! - Domain constants and time-grid utilities
//!
//! ## Architecture
//! - No dependencies on other TimeForge crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;
pub mod utils;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
