//! # TimeForge Infrastructure
//!
//! Infrastructure layer - SQLite persistence and configuration loading.
//!
//! This crate contains:
//! - Database manager and schema migrations
//! - Repository implementations for the core port traits
//! - Configuration loader (environment first, file fallback)
//! - Error conversions from infrastructure crates into domain errors
//!
//! ## Architecture
//! - Implements the port traits defined in `timeforge-core`
//! - All blocking database work runs on the tokio blocking pool

pub mod config;
pub mod database;
pub mod errors;

pub use database::{
    DbManager, SqliteActivityRepository, SqliteEmployeeRepository, SqliteTimeLogRepository,
    SqliteTimeSlotRepository,
};
pub use errors::InfraError;
