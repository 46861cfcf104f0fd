use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::job::GeoPoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorRole {
    Dispatcher,
    Driver,
    Rep,
    Supplier,
}

impl ActorRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorRole::Dispatcher => "dispatcher",
            ActorRole::Driver => "driver",
            ActorRole::Rep => "rep",
            ActorRole::Supplier => "supplier",
        }
    }
}

/// One accepted status transition. Entries are append-only; `seq` gives a
/// total order across the whole log regardless of clock resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChangeLog {
    pub id: Uuid,
    pub seq: u64,
    pub job_id: Uuid,
    pub assignment_id: Option<Uuid>,
    pub role: ActorRole,
    pub actor_user_id: Uuid,
    pub previous: String,
    pub new: String,
    pub position: Option<GeoPoint>,
    pub map_link: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// Two-photo proof captured when a field role records a no-show.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoShowEvidence {
    pub id: Uuid,
    pub job_id: Uuid,
    pub assignment_id: Uuid,
    pub role: ActorRole,
    pub actor_user_id: Uuid,
    pub photo1: String,
    pub photo2: String,
    pub position: GeoPoint,
    pub recorded_at: DateTime<Utc>,
}
