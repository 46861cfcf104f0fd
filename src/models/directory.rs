use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Portal user. Role links tie the account to the driver/rep/supplier
/// record it acts for; dispatcher accounts carry none.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub active: bool,
    pub deleted: bool,
    pub is_admin: bool,
    pub notify_on_job_updates: bool,
    pub driver_id: Option<Uuid>,
    pub rep_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Driver {
    pub id: Uuid,
    pub name: String,
    pub flat_fee: Option<f64>,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rep {
    pub id: Uuid,
    pub name: String,
    pub flat_fee: f64,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Supplier {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: Uuid,
    pub name: String,
    pub supplier_id: Uuid,
    pub created_at: DateTime<Utc>,
}
