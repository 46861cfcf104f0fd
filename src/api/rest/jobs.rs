use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::lifecycle::dispatcher::{self, JobDetailsUpdate};
use crate::models::assignment::Assignment;
use crate::models::audit::StatusChangeLog;
use crate::models::fee::FeeEntry;
use crate::models::job::{FieldRole, Job, JobStatus, ServiceType};
use crate::notify;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/jobs", post(create_job).get(list_jobs))
        .route(
            "/jobs/:id",
            get(get_job).patch(update_job).post(update_job).delete(delete_job),
        )
        .route("/jobs/:id/status", patch(set_job_status).post(set_job_status))
        .route("/jobs/:id/assignment", post(assign_resources))
        .route("/jobs/:id/lock", post(lock_job))
        .route("/jobs/:id/unlock", post(unlock_job))
        .route("/jobs/:id/log", get(get_job_log))
        .route("/jobs/:id/fees", get(get_job_fees))
}

#[derive(Deserialize)]
pub struct CreateJobRequest {
    pub reference: String,
    pub service_date: DateTime<Utc>,
    pub service_type: ServiceType,
    pub pax_adults: u32,
    #[serde(default)]
    pub pax_children: u32,
    pub origin: String,
    pub destination: String,
    pub flight_number: Option<String>,
    pub agent_name: Option<String>,
    pub customer_name: Option<String>,
    #[serde(default)]
    pub collection_required: bool,
}

async fn create_job(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateJobRequest>,
) -> Result<Json<Job>, AppError> {
    if payload.reference.trim().is_empty() {
        return Err(AppError::BadRequest("reference cannot be empty".to_string()));
    }

    if state
        .jobs
        .iter()
        .any(|entry| entry.value().reference == payload.reference)
    {
        return Err(AppError::BadRequest(format!(
            "reference {} already exists",
            payload.reference
        )));
    }

    let now = Utc::now();
    let job = Job {
        id: Uuid::new_v4(),
        reference: payload.reference,
        service_date: payload.service_date,
        service_type: payload.service_type,
        pax_adults: payload.pax_adults,
        pax_children: payload.pax_children,
        origin: payload.origin,
        destination: payload.destination,
        flight_number: payload.flight_number,
        agent_name: payload.agent_name,
        customer_name: payload.customer_name,
        status: JobStatus::Pending,
        collection_required: payload.collection_required,
        collection_collected: false,
        driver_unlock: None,
        rep_unlock: None,
        supplier_unlock: None,
        assignment_id: None,
        deleted_at: None,
        created_at: now,
        updated_at: now,
    };

    state.jobs.insert(job.id, job.clone());
    Ok(Json(job))
}

async fn list_jobs(State(state): State<Arc<AppState>>) -> Json<Vec<Job>> {
    let mut jobs: Vec<Job> = state
        .jobs
        .iter()
        .filter(|entry| entry.value().deleted_at.is_none())
        .map(|entry| entry.value().clone())
        .collect();
    jobs.sort_by_key(|job| job.created_at);
    Json(jobs)
}

async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Job>, AppError> {
    let job = state
        .jobs
        .get(&id)
        .filter(|job| job.deleted_at.is_none())
        .ok_or_else(|| AppError::NotFound(format!("job {} not found", id)))?;

    Ok(Json(job.value().clone()))
}

#[derive(Deserialize)]
pub struct UpdateJobRequest {
    pub actor_user_id: Uuid,
    #[serde(flatten)]
    pub update: JobDetailsUpdate,
}

async fn update_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateJobRequest>,
) -> Result<Json<Job>, AppError> {
    let (job, changed) = dispatcher::update_job_details(&state, id, payload.update).await?;

    // Fan-out happens strictly after the mutation has committed.
    if !changed.is_empty() {
        notify::notify_job_update(&state, job.id, payload.actor_user_id, &changed).await;
    }

    Ok(Json(job))
}

#[derive(Deserialize)]
pub struct SetStatusRequest {
    pub actor_user_id: Uuid,
    pub status: JobStatus,
}

async fn set_job_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetStatusRequest>,
) -> Result<Json<Job>, AppError> {
    let job = dispatcher::set_job_status(&state, id, payload.status, payload.actor_user_id).await?;

    let changed = vec!["status".to_string()];
    notify::notify_job_update(&state, job.id, payload.actor_user_id, &changed).await;

    Ok(Json(job))
}

#[derive(Deserialize)]
pub struct AssignRequest {
    pub actor_user_id: Uuid,
    pub vehicle_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub rep_id: Option<Uuid>,
}

async fn assign_resources(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignRequest>,
) -> Result<Json<Assignment>, AppError> {
    let assignment = dispatcher::assign_resources(
        &state,
        id,
        payload.vehicle_id,
        payload.driver_id,
        payload.rep_id,
        payload.actor_user_id,
    )
    .await?;

    Ok(Json(assignment))
}

#[derive(Deserialize)]
pub struct LockRequest {
    pub role: FieldRole,
}

async fn lock_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<LockRequest>,
) -> Result<Json<Job>, AppError> {
    let job = dispatcher::lock_job(&state, id, payload.role).await?;
    Ok(Json(job))
}

#[derive(Deserialize)]
pub struct UnlockRequest {
    pub role: FieldRole,
    pub admin_user_id: Uuid,
}

async fn unlock_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UnlockRequest>,
) -> Result<Json<Job>, AppError> {
    let job = dispatcher::unlock_job(&state, id, payload.role, payload.admin_user_id).await?;
    Ok(Json(job))
}

async fn delete_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Job>, AppError> {
    let job = dispatcher::soft_delete_job(&state, id).await?;
    Ok(Json(job))
}

async fn get_job_log(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<StatusChangeLog>>, AppError> {
    if !state.jobs.contains_key(&id) {
        return Err(AppError::NotFound(format!("job {} not found", id)));
    }
    Ok(Json(state.job_log(id)))
}

async fn get_job_fees(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<FeeEntry>>, AppError> {
    if !state.jobs.contains_key(&id) {
        return Err(AppError::NotFound(format!("job {} not found", id)));
    }

    let mut fees: Vec<FeeEntry> = state
        .fees
        .iter()
        .filter(|entry| entry.value().job_id == id)
        .map(|entry| entry.value().clone())
        .collect();
    fees.sort_by_key(|fee| fee.created_at);
    Ok(Json(fees))
}
