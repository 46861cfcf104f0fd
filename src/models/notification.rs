use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// In-app record created once per recipient user on a job update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub job_id: Uuid,
    pub job_reference: String,
    pub changed_fields: Vec<String>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// One queued outbound delivery. Derived state; safe to drop on the floor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}
