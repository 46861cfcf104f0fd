use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::geo;
use crate::lifecycle::{count_rejection, fees, load_job, record_transition, timelock, transitions};
use crate::models::assignment::{Assignment, DriverStatus, RepStatus};
use crate::models::audit::{ActorRole, NoShowEvidence};
use crate::models::fee::FeeRole;
use crate::models::job::{FieldRole, Job};
use crate::state::AppState;

fn resolve_driver(state: &AppState, actor_user_id: Uuid) -> Result<Uuid, AppError> {
    let user = state
        .users
        .get(&actor_user_id)
        .filter(|user| user.active && !user.deleted)
        .ok_or_else(|| AppError::Forbidden(format!("user {actor_user_id} has no portal access")))?;

    user.driver_id
        .ok_or_else(|| AppError::Forbidden(format!("user {actor_user_id} is not linked to a driver")))
}

fn resolve_rep(state: &AppState, actor_user_id: Uuid) -> Result<Uuid, AppError> {
    let user = state
        .users
        .get(&actor_user_id)
        .filter(|user| user.active && !user.deleted)
        .ok_or_else(|| AppError::Forbidden(format!("user {actor_user_id} has no portal access")))?;

    user.rep_id
        .ok_or_else(|| AppError::Forbidden(format!("user {actor_user_id} is not linked to a rep")))
}

fn driver_assignment(state: &AppState, job: &Job, driver_id: Uuid) -> Result<Assignment, AppError> {
    state
        .active_assignment(job)
        .filter(|assignment| assignment.driver_id == Some(driver_id))
        .ok_or_else(|| {
            AppError::NotFound(format!("job {} is not assigned to this driver", job.reference))
        })
}

fn rep_assignment(state: &AppState, job: &Job, rep_id: Uuid) -> Result<Assignment, AppError> {
    state
        .active_assignment(job)
        .filter(|assignment| assignment.rep_id == Some(rep_id))
        .ok_or_else(|| {
            AppError::NotFound(format!("job {} is not assigned to this rep", job.reference))
        })
}

/// Driver status update. Check order matters: actor, assignment, edit
/// window, collection guard, then the transition table, so every rejection
/// names the real reason. Writes happen only after the last check.
pub async fn update_driver_status(
    state: &AppState,
    actor_user_id: Uuid,
    job_id: Uuid,
    new_status: DriverStatus,
    lat: f64,
    lng: f64,
) -> Result<(Job, Assignment), AppError> {
    let position = geo::validated(lat, lng)?;
    let driver_id = resolve_driver(state, actor_user_id)?;

    let lock = state.job_lock(job_id);
    let _guard = lock.lock().await;

    let job = load_job(state, job_id)?;
    let mut assignment = driver_assignment(state, &job, driver_id)?;

    timelock::ensure_editable(&job, FieldRole::Driver, state.edit_window_hours, Utc::now())?;

    if new_status == DriverStatus::Completed
        && job.collection_required
        && !job.collection_collected
    {
        return Err(AppError::InvalidState(format!(
            "job {} has an uncollected collection",
            job.reference
        )));
    }

    if let Err(err) = transitions::ensure_driver(assignment.driver_status, new_status) {
        count_rejection(state, ActorRole::Driver);
        return Err(err);
    }

    let previous = assignment.driver_status;
    assignment.driver_status = new_status;
    state.assignments.insert(assignment.id, assignment.clone());

    if new_status == DriverStatus::Completed {
        if let Some(driver) = state.drivers.get(&driver_id) {
            if let Some(flat_fee) = driver.flat_fee {
                let currency = driver.currency.clone();
                drop(driver);
                fees::post_fee(state, FeeRole::Driver, driver_id, job.id, flat_fee, &currency);
            }
        }
    }

    record_transition(
        state,
        &job,
        Some(assignment.id),
        ActorRole::Driver,
        actor_user_id,
        previous.as_str(),
        new_status.as_str(),
        Some(position),
    );

    info!(
        job_id = %job.id,
        driver_id = %driver_id,
        from = previous.as_str(),
        to = new_status.as_str(),
        "driver status updated"
    );

    Ok((job, assignment))
}

/// Rep status update; same contract as the driver flow without the
/// collection guard.
pub async fn update_rep_status(
    state: &AppState,
    actor_user_id: Uuid,
    job_id: Uuid,
    new_status: RepStatus,
    lat: f64,
    lng: f64,
) -> Result<(Job, Assignment), AppError> {
    let position = geo::validated(lat, lng)?;
    let rep_id = resolve_rep(state, actor_user_id)?;

    let lock = state.job_lock(job_id);
    let _guard = lock.lock().await;

    let job = load_job(state, job_id)?;
    let mut assignment = rep_assignment(state, &job, rep_id)?;

    timelock::ensure_editable(&job, FieldRole::Rep, state.edit_window_hours, Utc::now())?;

    if let Err(err) = transitions::ensure_rep(assignment.rep_status, new_status) {
        count_rejection(state, ActorRole::Rep);
        return Err(err);
    }

    let previous = assignment.rep_status;
    assignment.rep_status = new_status;
    state.assignments.insert(assignment.id, assignment.clone());

    record_transition(
        state,
        &job,
        Some(assignment.id),
        ActorRole::Rep,
        actor_user_id,
        previous.as_str(),
        new_status.as_str(),
        Some(position),
    );

    info!(
        job_id = %job.id,
        rep_id = %rep_id,
        from = previous.as_str(),
        to = new_status.as_str(),
        "rep status updated"
    );

    Ok((job, assignment))
}

fn required_photo(photo: Option<String>, which: &str) -> Result<String, AppError> {
    photo
        .filter(|reference| !reference.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest(format!("{which} is required: a no-show needs two photos")))
}

/// Driver no-show: two photos and a GPS fix are mandatory, and the driver
/// must still be in a pre-terminal state.
pub async fn submit_driver_no_show(
    state: &AppState,
    actor_user_id: Uuid,
    job_id: Uuid,
    photo1: Option<String>,
    photo2: Option<String>,
    lat: f64,
    lng: f64,
) -> Result<(Job, Assignment), AppError> {
    let photo1 = required_photo(photo1, "photo1")?;
    let photo2 = required_photo(photo2, "photo2")?;
    let position = geo::validated(lat, lng)?;
    let driver_id = resolve_driver(state, actor_user_id)?;

    let lock = state.job_lock(job_id);
    let _guard = lock.lock().await;

    let job = load_job(state, job_id)?;
    let mut assignment = driver_assignment(state, &job, driver_id)?;

    timelock::ensure_editable(&job, FieldRole::Driver, state.edit_window_hours, Utc::now())?;

    if !transitions::driver_no_show_eligible(assignment.driver_status) {
        return Err(AppError::InvalidState(format!(
            "no-show cannot be recorded from {}",
            assignment.driver_status.as_str()
        )));
    }

    let previous = assignment.driver_status;
    assignment.driver_status = DriverStatus::NoShow;
    state.assignments.insert(assignment.id, assignment.clone());

    let evidence = NoShowEvidence {
        id: Uuid::new_v4(),
        job_id: job.id,
        assignment_id: assignment.id,
        role: ActorRole::Driver,
        actor_user_id,
        photo1,
        photo2,
        position,
        recorded_at: Utc::now(),
    };
    state.no_show_evidence.insert(evidence.id, evidence);

    record_transition(
        state,
        &job,
        Some(assignment.id),
        ActorRole::Driver,
        actor_user_id,
        previous.as_str(),
        DriverStatus::NoShow.as_str(),
        Some(position),
    );

    info!(job_id = %job.id, driver_id = %driver_id, "driver recorded no-show");
    Ok((job, assignment))
}

/// Rep no-show; reps may only record one before acting on the job at all.
pub async fn submit_rep_no_show(
    state: &AppState,
    actor_user_id: Uuid,
    job_id: Uuid,
    photo1: Option<String>,
    photo2: Option<String>,
    lat: f64,
    lng: f64,
) -> Result<(Job, Assignment), AppError> {
    let photo1 = required_photo(photo1, "photo1")?;
    let photo2 = required_photo(photo2, "photo2")?;
    let position = geo::validated(lat, lng)?;
    let rep_id = resolve_rep(state, actor_user_id)?;

    let lock = state.job_lock(job_id);
    let _guard = lock.lock().await;

    let job = load_job(state, job_id)?;
    let mut assignment = rep_assignment(state, &job, rep_id)?;

    timelock::ensure_editable(&job, FieldRole::Rep, state.edit_window_hours, Utc::now())?;

    if !transitions::rep_no_show_eligible(assignment.rep_status) {
        return Err(AppError::InvalidState(format!(
            "no-show cannot be recorded from {}",
            assignment.rep_status.as_str()
        )));
    }

    let previous = assignment.rep_status;
    assignment.rep_status = RepStatus::NoShow;
    state.assignments.insert(assignment.id, assignment.clone());

    let evidence = NoShowEvidence {
        id: Uuid::new_v4(),
        job_id: job.id,
        assignment_id: assignment.id,
        role: ActorRole::Rep,
        actor_user_id,
        photo1,
        photo2,
        position,
        recorded_at: Utc::now(),
    };
    state.no_show_evidence.insert(evidence.id, evidence);

    record_transition(
        state,
        &job,
        Some(assignment.id),
        ActorRole::Rep,
        actor_user_id,
        previous.as_str(),
        RepStatus::NoShow.as_str(),
        Some(position),
    );

    info!(job_id = %job.id, rep_id = %rep_id, "rep recorded no-show");
    Ok((job, assignment))
}
