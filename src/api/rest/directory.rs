use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::directory::{Driver, Rep, Supplier, UserAccount, Vehicle};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/drivers", post(create_driver))
        .route("/reps", post(create_rep))
        .route("/suppliers", post(create_supplier))
        .route("/vehicles", post(create_vehicle))
        .route("/users", post(create_user))
}

fn default_currency() -> String {
    "EUR".to_string()
}

#[derive(Deserialize)]
pub struct CreateDriverRequest {
    pub name: String,
    pub flat_fee: Option<f64>,
    #[serde(default = "default_currency")]
    pub currency: String,
}

async fn create_driver(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateDriverRequest>,
) -> Result<Json<Driver>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name cannot be empty".to_string()));
    }

    let driver = Driver {
        id: Uuid::new_v4(),
        name: payload.name,
        flat_fee: payload.flat_fee,
        currency: payload.currency,
        created_at: Utc::now(),
    };

    state.drivers.insert(driver.id, driver.clone());
    Ok(Json(driver))
}

#[derive(Deserialize)]
pub struct CreateRepRequest {
    pub name: String,
    pub flat_fee: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
}

async fn create_rep(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateRepRequest>,
) -> Result<Json<Rep>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name cannot be empty".to_string()));
    }

    if payload.flat_fee < 0.0 {
        return Err(AppError::BadRequest("flat_fee cannot be negative".to_string()));
    }

    let rep = Rep {
        id: Uuid::new_v4(),
        name: payload.name,
        flat_fee: payload.flat_fee,
        currency: payload.currency,
        created_at: Utc::now(),
    };

    state.reps.insert(rep.id, rep.clone());
    Ok(Json(rep))
}

#[derive(Deserialize)]
pub struct CreateSupplierRequest {
    pub name: String,
}

async fn create_supplier(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateSupplierRequest>,
) -> Result<Json<Supplier>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name cannot be empty".to_string()));
    }

    let supplier = Supplier {
        id: Uuid::new_v4(),
        name: payload.name,
        created_at: Utc::now(),
    };

    state.suppliers.insert(supplier.id, supplier.clone());
    Ok(Json(supplier))
}

#[derive(Deserialize)]
pub struct CreateVehicleRequest {
    pub name: String,
    pub supplier_id: Uuid,
}

async fn create_vehicle(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateVehicleRequest>,
) -> Result<Json<Vehicle>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name cannot be empty".to_string()));
    }

    if !state.suppliers.contains_key(&payload.supplier_id) {
        return Err(AppError::NotFound(format!(
            "supplier {} not found",
            payload.supplier_id
        )));
    }

    let vehicle = Vehicle {
        id: Uuid::new_v4(),
        name: payload.name,
        supplier_id: payload.supplier_id,
        created_at: Utc::now(),
    };

    state.vehicles.insert(vehicle.id, vehicle.clone());
    Ok(Json(vehicle))
}

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub notify_on_job_updates: bool,
    pub driver_id: Option<Uuid>,
    pub rep_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
}

async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<Json<UserAccount>, AppError> {
    if payload.email.trim().is_empty() {
        return Err(AppError::BadRequest("email cannot be empty".to_string()));
    }

    if let Some(id) = payload.driver_id {
        if !state.drivers.contains_key(&id) {
            return Err(AppError::NotFound(format!("driver {id} not found")));
        }
    }
    if let Some(id) = payload.rep_id {
        if !state.reps.contains_key(&id) {
            return Err(AppError::NotFound(format!("rep {id} not found")));
        }
    }
    if let Some(id) = payload.supplier_id {
        if !state.suppliers.contains_key(&id) {
            return Err(AppError::NotFound(format!("supplier {id} not found")));
        }
    }

    let user = UserAccount {
        id: Uuid::new_v4(),
        name: payload.name,
        email: payload.email,
        active: true,
        deleted: false,
        is_admin: payload.is_admin,
        notify_on_job_updates: payload.notify_on_job_updates,
        driver_id: payload.driver_id,
        rep_id: payload.rep_id,
        supplier_id: payload.supplier_id,
        created_at: Utc::now(),
    };

    state.users.insert(user.id, user.clone());
    Ok(Json(user))
}
