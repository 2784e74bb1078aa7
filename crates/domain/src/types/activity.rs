//! Activity events - append-only observations attributed to a slot

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::errors::{Result, TimeForgeError};

/// What kind of thing the observed event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityKind {
    App,
    Url,
}

impl ActivityKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::App => "APP",
            Self::Url => "URL",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "APP" => Ok(Self::App),
            "URL" => Ok(Self::Url),
            other => Err(TimeForgeError::Database(format!("unknown activity kind: {other}"))),
        }
    }
}

/// A single observed application/window/URL event.
///
/// Activities are append-only: they are bulk inserted and never merged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub id: String,
    pub employee_id: String,
    pub time_slot_id: Option<String>,
    pub project_id: Option<String>,
    pub task_id: Option<String>,
    pub title: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub duration_seconds: i64,
    pub kind: ActivityKind,
}
