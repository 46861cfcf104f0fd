use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::lifecycle::{count_rejection, fees, load_job, record_transition, transitions};
use crate::models::assignment::{Assignment, DriverStatus, RepStatus, SupplierStatus};
use crate::models::audit::ActorRole;
use crate::models::fee::FeeRole;
use crate::models::job::{FieldRole, Job, JobStatus, RoleUnlock, ServiceType};
use crate::state::AppState;

/// Dispatcher status machine. On completion of an arrival job with a rep on
/// the assignment, the rep's flat fee is posted under the same lock; on
/// cancellation the active assignment is retired.
pub async fn set_job_status(
    state: &AppState,
    job_id: Uuid,
    new_status: JobStatus,
    actor_user_id: Uuid,
) -> Result<Job, AppError> {
    let lock = state.job_lock(job_id);
    let _guard = lock.lock().await;

    let mut job = load_job(state, job_id)?;

    if let Err(err) = transitions::ensure_job(job.status, new_status) {
        count_rejection(state, ActorRole::Dispatcher);
        return Err(err);
    }

    let previous = job.status;
    let assignment = state.active_assignment(&job);
    let now = Utc::now();

    job.status = new_status;
    job.updated_at = now;

    if new_status == JobStatus::Completed && job.service_type == ServiceType::Arrival {
        if let Some(assignment) = &assignment {
            if let Some(rep_id) = assignment.rep_id {
                match state.reps.get(&rep_id) {
                    Some(rep) => {
                        fees::post_fee(state, FeeRole::Rep, rep_id, job.id, rep.flat_fee, &rep.currency);
                    }
                    None => warn!(job_id = %job.id, rep_id = %rep_id, "assigned rep missing from directory; no fee posted"),
                }
            }
        }
    }

    if new_status == JobStatus::Cancelled {
        if let Some(assignment) = &assignment {
            if let Some(mut stored) = state.assignments.get_mut(&assignment.id) {
                stored.replaced_at = Some(now);
            }
            job.assignment_id = None;
        }
    }

    state.jobs.insert(job.id, job.clone());
    record_transition(
        state,
        &job,
        assignment.as_ref().map(|a| a.id),
        ActorRole::Dispatcher,
        actor_user_id,
        previous.as_str(),
        new_status.as_str(),
        None,
    );

    info!(
        job_id = %job.id,
        reference = %job.reference,
        from = previous.as_str(),
        to = new_status.as_str(),
        "job status updated"
    );

    Ok(job)
}

/// Bind vehicle/driver/rep to a job. The predecessor assignment, if any, is
/// retired rather than edited; a pending job moves to Assigned.
pub async fn assign_resources(
    state: &AppState,
    job_id: Uuid,
    vehicle_id: Uuid,
    driver_id: Option<Uuid>,
    rep_id: Option<Uuid>,
    actor_user_id: Uuid,
) -> Result<Assignment, AppError> {
    let lock = state.job_lock(job_id);
    let _guard = lock.lock().await;

    let mut job = load_job(state, job_id)?;

    if matches!(
        job.status,
        JobStatus::Completed | JobStatus::Cancelled | JobStatus::NoShow
    ) {
        return Err(AppError::InvalidState(format!(
            "cannot assign resources to a {} job",
            job.status.as_str()
        )));
    }

    let vehicle = state
        .vehicles
        .get(&vehicle_id)
        .map(|vehicle| vehicle.clone())
        .ok_or_else(|| AppError::NotFound(format!("vehicle {vehicle_id} not found")))?;

    if let Some(id) = driver_id {
        if !state.drivers.contains_key(&id) {
            return Err(AppError::NotFound(format!("driver {id} not found")));
        }
    }
    if let Some(id) = rep_id {
        if !state.reps.contains_key(&id) {
            return Err(AppError::NotFound(format!("rep {id} not found")));
        }
    }

    let now = Utc::now();

    if let Some(previous) = state.active_assignment(&job) {
        if let Some(mut stored) = state.assignments.get_mut(&previous.id) {
            stored.replaced_at = Some(now);
        }
    }

    let assignment = Assignment {
        id: Uuid::new_v4(),
        job_id: job.id,
        vehicle_id,
        driver_id,
        rep_id,
        supplier_id: vehicle.supplier_id,
        driver_status: DriverStatus::Pending,
        rep_status: RepStatus::Pending,
        supplier_status: SupplierStatus::Pending,
        supplier_notes: None,
        created_at: now,
        replaced_at: None,
    };

    state.assignments.insert(assignment.id, assignment.clone());
    job.assignment_id = Some(assignment.id);

    let previous_status = job.status;
    if job.status == JobStatus::Pending {
        job.status = JobStatus::Assigned;
    }
    job.updated_at = now;
    state.jobs.insert(job.id, job.clone());

    if previous_status == JobStatus::Pending {
        record_transition(
            state,
            &job,
            Some(assignment.id),
            ActorRole::Dispatcher,
            actor_user_id,
            previous_status.as_str(),
            job.status.as_str(),
            None,
        );
    }

    info!(
        job_id = %job.id,
        assignment_id = %assignment.id,
        vehicle_id = %vehicle_id,
        "resources assigned"
    );

    Ok(assignment)
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct JobDetailsUpdate {
    pub service_date: Option<DateTime<Utc>>,
    pub pax_adults: Option<u32>,
    pub pax_children: Option<u32>,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub flight_number: Option<String>,
    pub agent_name: Option<String>,
    pub customer_name: Option<String>,
    pub collection_required: Option<bool>,
    pub collection_collected: Option<bool>,
}

/// Dispatcher-level field update. Returns the set of field names that
/// actually changed; the caller fans notifications out from it once the
/// mutation has committed.
pub async fn update_job_details(
    state: &AppState,
    job_id: Uuid,
    update: JobDetailsUpdate,
) -> Result<(Job, Vec<String>), AppError> {
    let lock = state.job_lock(job_id);
    let _guard = lock.lock().await;

    let mut job = load_job(state, job_id)?;
    let mut changed = Vec::new();

    if let Some(service_date) = update.service_date {
        if job.service_date != service_date {
            job.service_date = service_date;
            changed.push("service_date".to_string());
        }
    }
    if let Some(pax_adults) = update.pax_adults {
        if job.pax_adults != pax_adults {
            job.pax_adults = pax_adults;
            changed.push("pax_adults".to_string());
        }
    }
    if let Some(pax_children) = update.pax_children {
        if job.pax_children != pax_children {
            job.pax_children = pax_children;
            changed.push("pax_children".to_string());
        }
    }
    if let Some(origin) = update.origin {
        if job.origin != origin {
            job.origin = origin;
            changed.push("origin".to_string());
        }
    }
    if let Some(destination) = update.destination {
        if job.destination != destination {
            job.destination = destination;
            changed.push("destination".to_string());
        }
    }
    if let Some(flight_number) = update.flight_number {
        if job.flight_number.as_deref() != Some(flight_number.as_str()) {
            job.flight_number = Some(flight_number);
            changed.push("flight_number".to_string());
        }
    }
    if let Some(agent_name) = update.agent_name {
        if job.agent_name.as_deref() != Some(agent_name.as_str()) {
            job.agent_name = Some(agent_name);
            changed.push("agent_name".to_string());
        }
    }
    if let Some(customer_name) = update.customer_name {
        if job.customer_name.as_deref() != Some(customer_name.as_str()) {
            job.customer_name = Some(customer_name);
            changed.push("customer_name".to_string());
        }
    }
    if let Some(collection_required) = update.collection_required {
        if job.collection_required != collection_required {
            job.collection_required = collection_required;
            changed.push("collection_required".to_string());
        }
    }
    if let Some(collection_collected) = update.collection_collected {
        if job.collection_collected != collection_collected {
            job.collection_collected = collection_collected;
            changed.push("collection_collected".to_string());
        }
    }

    if !changed.is_empty() {
        job.updated_at = Utc::now();
        state.jobs.insert(job.id, job.clone());
        info!(job_id = %job.id, fields = ?changed, "job details updated");
    }

    Ok((job, changed))
}

/// Restore the default edit window for one role by clearing its marker.
pub async fn lock_job(state: &AppState, job_id: Uuid, role: FieldRole) -> Result<Job, AppError> {
    let lock = state.job_lock(job_id);
    let _guard = lock.lock().await;

    let mut job = load_job(state, job_id)?;
    job.set_unlock(role, None);
    job.updated_at = Utc::now();
    state.jobs.insert(job.id, job.clone());

    info!(job_id = %job.id, role = role.as_str(), "job locked");
    Ok(job)
}

/// Permanently bypass the edit window for one role on this job, recording
/// which admin opened it.
pub async fn unlock_job(
    state: &AppState,
    job_id: Uuid,
    role: FieldRole,
    admin_user_id: Uuid,
) -> Result<Job, AppError> {
    let lock = state.job_lock(job_id);
    let _guard = lock.lock().await;

    let mut job = load_job(state, job_id)?;
    job.set_unlock(
        role,
        Some(RoleUnlock {
            at: Utc::now(),
            by: admin_user_id,
        }),
    );
    job.updated_at = Utc::now();
    state.jobs.insert(job.id, job.clone());

    info!(job_id = %job.id, role = role.as_str(), admin = %admin_user_id, "job unlocked");
    Ok(job)
}

pub async fn soft_delete_job(state: &AppState, job_id: Uuid) -> Result<Job, AppError> {
    let lock = state.job_lock(job_id);
    let _guard = lock.lock().await;

    let mut job = load_job(state, job_id)?;
    job.deleted_at = Some(Utc::now());
    state.jobs.insert(job.id, job.clone());

    info!(job_id = %job.id, reference = %job.reference, "job soft-deleted");
    Ok(job)
}
