use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriverStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
}

impl DriverStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriverStatus::Pending => "Pending",
            DriverStatus::InProgress => "InProgress",
            DriverStatus::Completed => "Completed",
            DriverStatus::Cancelled => "Cancelled",
            DriverStatus::NoShow => "NoShow",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepStatus {
    Pending,
    Completed,
    Cancelled,
    NoShow,
}

impl RepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepStatus::Pending => "Pending",
            RepStatus::Completed => "Completed",
            RepStatus::Cancelled => "Cancelled",
            RepStatus::NoShow => "NoShow",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SupplierStatus {
    Pending,
    InProgress,
    Completed,
}

impl SupplierStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SupplierStatus::Pending => "Pending",
            SupplierStatus::InProgress => "InProgress",
            SupplierStatus::Completed => "Completed",
        }
    }
}

/// Resource binding for one job. Assignments are never edited in place:
/// reassignment and cancellation stamp `replaced_at` and leave the row,
/// so the full binding history stays queryable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub id: Uuid,
    pub job_id: Uuid,
    pub vehicle_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub rep_id: Option<Uuid>,
    pub supplier_id: Uuid,
    pub driver_status: DriverStatus,
    pub rep_status: RepStatus,
    pub supplier_status: SupplierStatus,
    pub supplier_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub replaced_at: Option<DateTime<Utc>>,
}

impl Assignment {
    pub fn is_active(&self) -> bool {
        self.replaced_at.is_none()
    }
}
