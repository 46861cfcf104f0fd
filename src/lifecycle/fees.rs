use chrono::Utc;
use dashmap::mapref::entry::Entry;
use tracing::info;
use uuid::Uuid;

use crate::models::fee::{FeeEntry, FeeRole};
use crate::state::AppState;

/// Check-then-insert under the caller's job lock. The (identity, job) store
/// key is the uniqueness constraint: a retried or repeated transition finds
/// the existing entry and does nothing. Returns whether an entry was created.
pub fn post_fee(
    state: &AppState,
    role: FeeRole,
    identity_id: Uuid,
    job_id: Uuid,
    amount: f64,
    currency: &str,
) -> bool {
    match state.fees.entry((identity_id, job_id)) {
        Entry::Occupied(_) => false,
        Entry::Vacant(slot) => {
            slot.insert(FeeEntry {
                id: Uuid::new_v4(),
                role,
                identity_id,
                job_id,
                amount,
                currency: currency.to_string(),
                created_at: Utc::now(),
            });

            state
                .metrics
                .fees_posted_total
                .with_label_values(&[role.as_str()])
                .inc();

            info!(
                job_id = %job_id,
                identity_id = %identity_id,
                role = role.as_str(),
                amount,
                "fee posted"
            );
            true
        }
    }
}
