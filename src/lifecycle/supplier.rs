use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::lifecycle::{count_rejection, load_job, record_transition, timelock, transitions};
use crate::models::assignment::{Assignment, SupplierStatus};
use crate::models::audit::ActorRole;
use crate::models::job::{FieldRole, Job};
use crate::state::AppState;

fn resolve_supplier(state: &AppState, actor_user_id: Uuid) -> Result<Uuid, AppError> {
    let user = state
        .users
        .get(&actor_user_id)
        .filter(|user| user.active && !user.deleted)
        .ok_or_else(|| AppError::Forbidden(format!("user {actor_user_id} has no portal access")))?;

    user.supplier_id.ok_or_else(|| {
        AppError::Forbidden(format!("user {actor_user_id} is not linked to a supplier"))
    })
}

/// Supplier flow: a two-stop march to Completed with free-text notes and no
/// GPS requirement, still behind the per-role edit window.
pub async fn update_supplier_status(
    state: &AppState,
    actor_user_id: Uuid,
    job_id: Uuid,
    new_status: SupplierStatus,
    notes: Option<String>,
) -> Result<(Job, Assignment), AppError> {
    let supplier_id = resolve_supplier(state, actor_user_id)?;

    let lock = state.job_lock(job_id);
    let _guard = lock.lock().await;

    let job = load_job(state, job_id)?;
    let mut assignment = state
        .active_assignment(&job)
        .filter(|assignment| assignment.supplier_id == supplier_id)
        .ok_or_else(|| {
            AppError::NotFound(format!("job {} is not assigned to this supplier", job.reference))
        })?;

    timelock::ensure_editable(&job, FieldRole::Supplier, state.edit_window_hours, Utc::now())?;

    if let Err(err) = transitions::ensure_supplier(assignment.supplier_status, new_status) {
        count_rejection(state, ActorRole::Supplier);
        return Err(err);
    }

    let previous = assignment.supplier_status;
    assignment.supplier_status = new_status;
    if let Some(notes) = notes {
        assignment.supplier_notes = Some(notes);
    }
    state.assignments.insert(assignment.id, assignment.clone());

    record_transition(
        state,
        &job,
        Some(assignment.id),
        ActorRole::Supplier,
        actor_user_id,
        previous.as_str(),
        new_status.as_str(),
        None,
    );

    info!(
        job_id = %job.id,
        supplier_id = %supplier_id,
        from = previous.as_str(),
        to = new_status.as_str(),
        "supplier status updated"
    );

    Ok((job, assignment))
}
