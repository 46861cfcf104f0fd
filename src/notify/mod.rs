pub mod message;
pub mod sender;

use std::collections::HashSet;

use chrono::Utc;
use tracing::warn;
use uuid::Uuid;

use crate::models::directory::UserAccount;
use crate::models::notification::{Notification, OutboundMessage};
use crate::state::AppState;

/// Fan a dispatcher-level job update out: one in-app notification per
/// eligible user, one outbound message per unique address. Runs after the
/// triggering mutation has committed and never reports failure to the
/// caller; an undeliverable queue slot is logged and dropped.
pub async fn notify_job_update(
    state: &AppState,
    job_id: Uuid,
    actor_user_id: Uuid,
    changed_fields: &[String],
) {
    let Some(job) = state.jobs.get(&job_id).map(|job| job.clone()) else {
        warn!(job_id = %job_id, "job missing at fan-out time; nothing sent");
        return;
    };

    // Active, non-deleted users with the job-update grant, minus the author.
    // Legacy admin accounts are always in, whatever their granular grants.
    let recipients: Vec<UserAccount> = state
        .users
        .iter()
        .filter(|entry| {
            let user = entry.value();
            user.active
                && !user.deleted
                && user.id != actor_user_id
                && (user.is_admin || user.notify_on_job_updates)
        })
        .map(|entry| entry.value().clone())
        .collect();

    if recipients.is_empty() && state.department_mailboxes.is_empty() {
        return;
    }

    let now = Utc::now();
    for user in &recipients {
        let notification = Notification {
            id: Uuid::new_v4(),
            user_id: user.id,
            job_id: job.id,
            job_reference: job.reference.clone(),
            changed_fields: changed_fields.to_vec(),
            read: false,
            created_at: now,
        };
        state.notifications.insert(notification.id, notification);
    }

    let subject = format!("Job {} updated", job.reference);
    let body = message::render_update_body(&job, changed_fields);

    let mut seen = HashSet::new();
    let addresses = recipients
        .iter()
        .map(|user| user.email.as_str())
        .chain(state.department_mailboxes.iter().map(|addr| addr.as_str()))
        .filter_map(|address| {
            let key = address.trim().to_ascii_lowercase();
            if key.is_empty() || !seen.insert(key) {
                return None;
            }
            Some(address.to_string())
        })
        .collect::<Vec<_>>();

    for to in addresses {
        let outbound = OutboundMessage {
            to,
            subject: subject.clone(),
            body: body.clone(),
        };

        state.metrics.messages_in_queue.inc();
        if let Err(err) = state.message_tx.try_send(outbound) {
            state.metrics.messages_in_queue.dec();
            state
                .metrics
                .outbound_messages_total
                .with_label_values(&["dropped"])
                .inc();
            warn!(job_id = %job.id, error = %err, "failed to queue update message");
        }
    }
}
