//! Time log entities - contiguous spans of attributed work

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{Result, TimeForgeError};

/// How a time log entry came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeLogType {
    Tracked,
    Manual,
    Idle,
    Resumed,
}

impl TimeLogType {
    /// Stable storage representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tracked => "TRACKED",
            Self::Manual => "MANUAL",
            Self::Idle => "IDLE",
            Self::Resumed => "RESUMED",
        }
    }

    /// Parse the storage representation back into the closed enum.
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "TRACKED" => Ok(Self::Tracked),
            "MANUAL" => Ok(Self::Manual),
            "IDLE" => Ok(Self::Idle),
            "RESUMED" => Ok(Self::Resumed),
            other => Err(TimeForgeError::Database(format!("unknown time log type: {other}"))),
        }
    }
}

/// Which capture surface delivered the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeLogSource {
    Browser,
    Desktop,
    Mobile,
    BrowserExtension,
}

impl TimeLogSource {
    /// Stable storage representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Browser => "BROWSER",
            Self::Desktop => "DESKTOP",
            Self::Mobile => "MOBILE",
            Self::BrowserExtension => "BROWSER_EXTENSION",
        }
    }

    /// Parse the storage representation back into the closed enum.
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "BROWSER" => Ok(Self::Browser),
            "DESKTOP" => Ok(Self::Desktop),
            "MOBILE" => Ok(Self::Mobile),
            "BROWSER_EXTENSION" => Ok(Self::BrowserExtension),
            other => Err(TimeForgeError::Database(format!("unknown time log source: {other}"))),
        }
    }
}

/// Half-open `[start, end)` interval in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSpan {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeSpan {
    pub const fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Whether the span covers any positive amount of time.
    pub fn is_valid(&self) -> bool {
        self.start < self.end
    }

    /// Open overlap test: touching endpoints do not overlap.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && self.end > other.start
    }

    /// Span length in whole seconds, never negative.
    pub fn duration_seconds(&self) -> i64 {
        (self.end - self.start).num_seconds().max(0)
    }
}

/// A contiguous span of attributed work for one employee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeLog {
    pub id: String,
    pub employee_id: String,
    pub organization_id: String,
    pub tenant_id: String,
    pub started_at: DateTime<Utc>,
    /// `None` while the timer is still running.
    pub stopped_at: Option<DateTime<Utc>>,
    pub duration_seconds: i64,
    pub log_type: TimeLogType,
    pub source: TimeLogSource,
    pub project_id: Option<String>,
    pub task_id: Option<String>,
    pub organization_contact_id: Option<String>,
    pub description: Option<String>,
    pub is_billable: bool,
    pub is_running: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub edited_at: Option<DateTime<Utc>>,
}

impl TimeLog {
    /// The log's `[started_at, stopped_at)` interval, if it has stopped.
    pub fn span(&self) -> Option<TimeSpan> {
        self.stopped_at.map(|stopped_at| TimeSpan::new(self.started_at, stopped_at))
    }

    pub const fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Input for creating or editing a manual time entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualTimeInput {
    pub employee_id: String,
    pub organization_id: String,
    pub tenant_id: String,
    pub started_at: DateTime<Utc>,
    pub stopped_at: DateTime<Utc>,
    pub project_id: Option<String>,
    pub task_id: Option<String>,
    pub organization_contact_id: Option<String>,
    pub description: Option<String>,
    pub is_billable: bool,
    pub source: TimeLogSource,
}

/// Input for starting a tracked timer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartTimerInput {
    pub employee_id: String,
    pub organization_id: String,
    pub tenant_id: String,
    /// Defaults to now when absent.
    pub started_at: Option<DateTime<Utc>>,
    pub project_id: Option<String>,
    pub task_id: Option<String>,
    pub organization_contact_id: Option<String>,
    pub description: Option<String>,
    pub is_billable: bool,
    pub source: TimeLogSource,
}

impl ManualTimeInput {
    /// Build a persistable manual log from this input.
    pub fn into_time_log(self) -> TimeLog {
        let duration_seconds = TimeSpan::new(self.started_at, self.stopped_at).duration_seconds();
        TimeLog {
            id: Uuid::new_v4().to_string(),
            employee_id: self.employee_id,
            organization_id: self.organization_id,
            tenant_id: self.tenant_id,
            started_at: self.started_at,
            stopped_at: Some(self.stopped_at),
            duration_seconds,
            log_type: TimeLogType::Manual,
            source: self.source,
            project_id: self.project_id,
            task_id: self.task_id,
            organization_contact_id: self.organization_contact_id,
            description: self.description,
            is_billable: self.is_billable,
            is_running: false,
            deleted_at: None,
            edited_at: None,
        }
    }
}
