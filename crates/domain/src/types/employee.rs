//! Employee and organization policy types

use serde::{Deserialize, Serialize};

/// Employee record as the engine sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    pub id: String,
    pub organization_id: String,
    pub tenant_id: String,
    pub full_name: String,
    /// Hourly billing rate. `None` means the rate is unknown, which is
    /// distinct from a zero rate in owed-amount reports.
    pub bill_rate: Option<f64>,
}

/// Per-organization policy gating manual entries.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct OrganizationPolicy {
    pub allow_future_dates: bool,
}
