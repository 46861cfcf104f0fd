//! Per-role transition tables. Each role evolves independently against its
//! own table; the shared job row only serializes the writes.

use crate::error::AppError;
use crate::models::assignment::{DriverStatus, RepStatus, SupplierStatus};
use crate::models::job::JobStatus;

pub fn job_allowed_next(status: JobStatus) -> &'static [JobStatus] {
    match status {
        JobStatus::Pending => &[JobStatus::Assigned, JobStatus::Cancelled],
        JobStatus::Assigned => &[JobStatus::InProgress],
        JobStatus::InProgress => &[
            JobStatus::Completed,
            JobStatus::Cancelled,
            JobStatus::NoShow,
        ],
        JobStatus::Completed | JobStatus::Cancelled | JobStatus::NoShow => &[],
    }
}

pub fn driver_allowed_next(status: DriverStatus) -> &'static [DriverStatus] {
    match status {
        DriverStatus::Pending => &[
            DriverStatus::InProgress,
            DriverStatus::Completed,
            DriverStatus::Cancelled,
        ],
        DriverStatus::InProgress => &[DriverStatus::Completed, DriverStatus::Cancelled],
        DriverStatus::Completed | DriverStatus::Cancelled | DriverStatus::NoShow => &[],
    }
}

pub fn rep_allowed_next(status: RepStatus) -> &'static [RepStatus] {
    match status {
        RepStatus::Pending => &[RepStatus::Completed, RepStatus::Cancelled],
        RepStatus::Completed | RepStatus::Cancelled | RepStatus::NoShow => &[],
    }
}

pub fn supplier_allowed_next(status: SupplierStatus) -> &'static [SupplierStatus] {
    match status {
        SupplierStatus::Pending => &[SupplierStatus::InProgress, SupplierStatus::Completed],
        SupplierStatus::InProgress => &[SupplierStatus::Completed],
        SupplierStatus::Completed => &[],
    }
}

/// No-show may only be recorded from a pre-terminal state.
pub fn driver_no_show_eligible(status: DriverStatus) -> bool {
    matches!(status, DriverStatus::Pending | DriverStatus::InProgress)
}

pub fn rep_no_show_eligible(status: RepStatus) -> bool {
    matches!(status, RepStatus::Pending)
}

pub fn ensure_job(current: JobStatus, new: JobStatus) -> Result<(), AppError> {
    let allowed = job_allowed_next(current);
    if allowed.contains(&new) {
        return Ok(());
    }
    Err(rejection(
        current.as_str(),
        new.as_str(),
        &allowed.iter().map(|s| s.as_str()).collect::<Vec<_>>(),
    ))
}

pub fn ensure_driver(current: DriverStatus, new: DriverStatus) -> Result<(), AppError> {
    let allowed = driver_allowed_next(current);
    if allowed.contains(&new) {
        return Ok(());
    }
    Err(rejection(
        current.as_str(),
        new.as_str(),
        &allowed.iter().map(|s| s.as_str()).collect::<Vec<_>>(),
    ))
}

pub fn ensure_rep(current: RepStatus, new: RepStatus) -> Result<(), AppError> {
    let allowed = rep_allowed_next(current);
    if allowed.contains(&new) {
        return Ok(());
    }
    Err(rejection(
        current.as_str(),
        new.as_str(),
        &allowed.iter().map(|s| s.as_str()).collect::<Vec<_>>(),
    ))
}

pub fn ensure_supplier(current: SupplierStatus, new: SupplierStatus) -> Result<(), AppError> {
    let allowed = supplier_allowed_next(current);
    if allowed.contains(&new) {
        return Ok(());
    }
    Err(rejection(
        current.as_str(),
        new.as_str(),
        &allowed.iter().map(|s| s.as_str()).collect::<Vec<_>>(),
    ))
}

/// Rejection text names both statuses and enumerates the allowed set so the
/// caller can reconcile ("none" when the current status is terminal).
fn rejection(current: &str, attempted: &str, allowed: &[&str]) -> AppError {
    let allowed = if allowed.is_empty() {
        "none".to_string()
    } else {
        allowed.join(", ")
    };
    AppError::InvalidTransition(format!(
        "cannot move from {current} to {attempted} (allowed: {allowed})"
    ))
}
