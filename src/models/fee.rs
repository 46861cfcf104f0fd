use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeeRole {
    Driver,
    Rep,
}

impl FeeRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeeRole::Driver => "driver",
            FeeRole::Rep => "rep",
        }
    }
}

/// Payable amount owed to one role identity for one job. At most one entry
/// may exist per (identity, job) pair; the store is keyed on that pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeEntry {
    pub id: Uuid,
    pub role: FeeRole,
    pub identity_id: Uuid,
    pub job_id: Uuid,
    pub amount: f64,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}
