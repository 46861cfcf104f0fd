use chrono::{DateTime, Duration, Utc};

use crate::error::AppError;
use crate::models::job::{FieldRole, Job};

/// Edit-window check for field-role mutations. Pure read: a role may write
/// while `now <= service_date + window`, or whenever the job carries that
/// role's unlock marker. Runs after actor/assignment resolution and before
/// transition validation so a closed window is reported as such, not as a
/// bad sequence.
pub fn ensure_editable(
    job: &Job,
    role: FieldRole,
    window_hours: i64,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    if job.unlock_for(role).is_some() {
        return Ok(());
    }

    let deadline = job.service_date + Duration::hours(window_hours);
    if now <= deadline {
        return Ok(());
    }

    Err(AppError::Forbidden(format!(
        "edit window closed for {} on job {}: ended {}",
        role.as_str(),
        job.reference,
        deadline.to_rfc3339()
    )))
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use super::ensure_editable;
    use crate::models::job::{FieldRole, Job, JobStatus, RoleUnlock, ServiceType};

    fn job_with_service_date(hours_ago: i64) -> Job {
        let now = Utc::now();
        Job {
            id: Uuid::new_v4(),
            reference: "TRF-1001".to_string(),
            service_date: now - Duration::hours(hours_ago),
            service_type: ServiceType::Arrival,
            pax_adults: 2,
            pax_children: 0,
            origin: "Airport".to_string(),
            destination: "Hotel".to_string(),
            flight_number: None,
            agent_name: None,
            customer_name: None,
            status: JobStatus::Pending,
            collection_required: false,
            collection_collected: false,
            driver_unlock: None,
            rep_unlock: None,
            supplier_unlock: None,
            assignment_id: None,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn open_window_allows_edits() {
        let job = job_with_service_date(10);
        assert!(ensure_editable(&job, FieldRole::Driver, 48, Utc::now()).is_ok());
    }

    #[test]
    fn closed_window_is_forbidden() {
        let job = job_with_service_date(72);
        let err = ensure_editable(&job, FieldRole::Driver, 48, Utc::now()).unwrap_err();
        assert!(err.to_string().contains("edit window closed"));
    }

    #[test]
    fn unlock_marker_bypasses_the_window() {
        let mut job = job_with_service_date(72);
        job.driver_unlock = Some(RoleUnlock {
            at: Utc::now(),
            by: Uuid::new_v4(),
        });
        assert!(ensure_editable(&job, FieldRole::Driver, 48, Utc::now()).is_ok());
    }

    #[test]
    fn unlock_is_scoped_to_its_role() {
        let mut job = job_with_service_date(72);
        job.driver_unlock = Some(RoleUnlock {
            at: Utc::now(),
            by: Uuid::new_v4(),
        });
        assert!(ensure_editable(&job, FieldRole::Rep, 48, Utc::now()).is_err());
    }
}
