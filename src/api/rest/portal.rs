use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::post;
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::lifecycle::{field, supplier};
use crate::models::assignment::{Assignment, DriverStatus, RepStatus, SupplierStatus};
use crate::models::job::Job;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/portal/driver/jobs/:id/status", post(update_driver_status))
        .route("/portal/driver/jobs/:id/no-show", post(driver_no_show))
        .route("/portal/rep/jobs/:id/status", post(update_rep_status))
        .route("/portal/rep/jobs/:id/no-show", post(rep_no_show))
        .route("/portal/supplier/jobs/:id/status", post(update_supplier_status))
}

#[derive(Serialize)]
pub struct PortalStatusResponse {
    pub job: Job,
    pub assignment: Assignment,
}

#[derive(Deserialize)]
pub struct DriverStatusRequest {
    pub actor_user_id: Uuid,
    pub status: DriverStatus,
    pub lat: f64,
    pub lng: f64,
}

async fn update_driver_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<DriverStatusRequest>,
) -> Result<Json<PortalStatusResponse>, AppError> {
    let (job, assignment) = field::update_driver_status(
        &state,
        payload.actor_user_id,
        id,
        payload.status,
        payload.lat,
        payload.lng,
    )
    .await?;

    Ok(Json(PortalStatusResponse { job, assignment }))
}

#[derive(Deserialize)]
pub struct RepStatusRequest {
    pub actor_user_id: Uuid,
    pub status: RepStatus,
    pub lat: f64,
    pub lng: f64,
}

async fn update_rep_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RepStatusRequest>,
) -> Result<Json<PortalStatusResponse>, AppError> {
    let (job, assignment) = field::update_rep_status(
        &state,
        payload.actor_user_id,
        id,
        payload.status,
        payload.lat,
        payload.lng,
    )
    .await?;

    Ok(Json(PortalStatusResponse { job, assignment }))
}

#[derive(Deserialize)]
pub struct NoShowRequest {
    pub actor_user_id: Uuid,
    pub photo1: Option<String>,
    pub photo2: Option<String>,
    pub lat: f64,
    pub lng: f64,
}

async fn driver_no_show(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<NoShowRequest>,
) -> Result<Json<PortalStatusResponse>, AppError> {
    let (job, assignment) = field::submit_driver_no_show(
        &state,
        payload.actor_user_id,
        id,
        payload.photo1,
        payload.photo2,
        payload.lat,
        payload.lng,
    )
    .await?;

    Ok(Json(PortalStatusResponse { job, assignment }))
}

async fn rep_no_show(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<NoShowRequest>,
) -> Result<Json<PortalStatusResponse>, AppError> {
    let (job, assignment) = field::submit_rep_no_show(
        &state,
        payload.actor_user_id,
        id,
        payload.photo1,
        payload.photo2,
        payload.lat,
        payload.lng,
    )
    .await?;

    Ok(Json(PortalStatusResponse { job, assignment }))
}

#[derive(Deserialize)]
pub struct SupplierStatusRequest {
    pub actor_user_id: Uuid,
    pub status: SupplierStatus,
    pub notes: Option<String>,
}

async fn update_supplier_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SupplierStatusRequest>,
) -> Result<Json<PortalStatusResponse>, AppError> {
    let (job, assignment) = supplier::update_supplier_status(
        &state,
        payload.actor_user_id,
        id,
        payload.status,
        payload.notes,
    )
    .await?;

    Ok(Json(PortalStatusResponse { job, assignment }))
}
