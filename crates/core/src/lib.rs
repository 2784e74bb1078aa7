//! # TimeForge Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Slot generation over the 10-minute accounting grid
//! - Conflict detection/resolution keeping per-employee logs overlap-free
//! - Slot merge-upsert aggregation
//! - Report aggregation (grouped trees, charts, owed amounts)
//! - Port/adapter interfaces (traits)
//!
//! ## Architecture Principles
//! - Only depends on `timeforge-domain`
//! - No database or platform code
//! - All external dependencies via traits
//! - Pure, testable business logic

pub mod reports;
pub mod slots;
pub mod timelog;

// Re-export specific items to avoid ambiguity
pub use reports::ReportService;
pub use slots::generator::{generate_slots, GeneratedSlot};
pub use slots::ports::{ActivityRepository, TimeSlotRepository};
pub use slots::SlotService;
pub use timelog::conflicts::{resolve, resolve_all, ConflictAdjustment};
pub use timelog::ports::{EmployeeRepository, TimeLogRepository};
pub use timelog::TimeLogService;
