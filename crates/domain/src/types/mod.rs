//! Domain entity types

pub mod activity;
pub mod employee;
pub mod report;
pub mod time_log;
pub mod time_slot;

pub use activity::*;
pub use employee::*;
pub use report::*;
pub use time_log::*;
pub use time_slot::*;
