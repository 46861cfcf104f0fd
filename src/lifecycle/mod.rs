pub mod dispatcher;
pub mod fees;
pub mod field;
pub mod supplier;
pub mod timelock;
pub mod transitions;

use chrono::Utc;
use uuid::Uuid;

use crate::error::AppError;
use crate::geo;
use crate::models::audit::{ActorRole, StatusChangeLog};
use crate::models::job::{GeoPoint, Job};
use crate::state::AppState;

/// Load a job for mutation; soft-deleted jobs are gone as far as the
/// lifecycle is concerned.
pub(crate) fn load_job(state: &AppState, job_id: Uuid) -> Result<Job, AppError> {
    state
        .jobs
        .get(&job_id)
        .filter(|job| job.deleted_at.is_none())
        .map(|job| job.clone())
        .ok_or_else(|| AppError::NotFound(format!("job {job_id} not found")))
}

/// Append the audit entry for an accepted transition, publish it on the live
/// feed and bump the transition counter. Callers invoke this only after all
/// validation has passed, inside their job-lock section.
pub(crate) fn record_transition(
    state: &AppState,
    job: &Job,
    assignment_id: Option<Uuid>,
    role: ActorRole,
    actor_user_id: Uuid,
    previous: &str,
    new: &str,
    position: Option<GeoPoint>,
) {
    let entry = StatusChangeLog {
        id: Uuid::new_v4(),
        seq: state.next_log_seq(),
        job_id: job.id,
        assignment_id,
        role,
        actor_user_id,
        previous: previous.to_string(),
        new: new.to_string(),
        position,
        map_link: position.as_ref().map(geo::map_link),
        recorded_at: Utc::now(),
    };

    state.status_log.insert(entry.id, entry.clone());
    let _ = state.transition_events_tx.send(entry);

    state
        .metrics
        .status_transitions_total
        .with_label_values(&[role.as_str(), "accepted"])
        .inc();
}

pub(crate) fn count_rejection(state: &AppState, role: ActorRole) {
    state
        .metrics
        .status_transitions_total
        .with_label_values(&[role.as_str(), "rejected"])
        .inc();
}
