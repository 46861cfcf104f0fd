use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceType {
    Arrival,
    Departure,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Pending,
    Assigned,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "Pending",
            JobStatus::Assigned => "Assigned",
            JobStatus::InProgress => "InProgress",
            JobStatus::Completed => "Completed",
            JobStatus::Cancelled => "Cancelled",
            JobStatus::NoShow => "NoShow",
        }
    }
}

/// Set by an admin to bypass the edit window for one field role on one job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RoleUnlock {
    pub at: DateTime<Utc>,
    pub by: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    /// Booking reference code, immutable once created.
    pub reference: String,
    pub service_date: DateTime<Utc>,
    pub service_type: ServiceType,
    pub pax_adults: u32,
    pub pax_children: u32,
    pub origin: String,
    pub destination: String,
    pub flight_number: Option<String>,
    pub agent_name: Option<String>,
    pub customer_name: Option<String>,
    pub status: JobStatus,
    pub collection_required: bool,
    pub collection_collected: bool,
    pub driver_unlock: Option<RoleUnlock>,
    pub rep_unlock: Option<RoleUnlock>,
    pub supplier_unlock: Option<RoleUnlock>,
    pub assignment_id: Option<Uuid>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The three roles whose edit window can be unlocked per job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldRole {
    Driver,
    Rep,
    Supplier,
}

impl FieldRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldRole::Driver => "driver",
            FieldRole::Rep => "rep",
            FieldRole::Supplier => "supplier",
        }
    }
}

impl Job {
    pub fn unlock_for(&self, role: FieldRole) -> Option<&RoleUnlock> {
        match role {
            FieldRole::Driver => self.driver_unlock.as_ref(),
            FieldRole::Rep => self.rep_unlock.as_ref(),
            FieldRole::Supplier => self.supplier_unlock.as_ref(),
        }
    }

    pub fn set_unlock(&mut self, role: FieldRole, unlock: Option<RoleUnlock>) {
        match role {
            FieldRole::Driver => self.driver_unlock = unlock,
            FieldRole::Rep => self.rep_unlock = unlock,
            FieldRole::Supplier => self.supplier_unlock = unlock,
        }
    }
}
