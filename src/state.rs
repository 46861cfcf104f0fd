use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{broadcast, mpsc, Mutex};
use uuid::Uuid;

use crate::models::assignment::Assignment;
use crate::models::audit::{NoShowEvidence, StatusChangeLog};
use crate::models::directory::{Driver, Rep, Supplier, UserAccount, Vehicle};
use crate::models::fee::FeeEntry;
use crate::models::job::Job;
use crate::models::notification::{Notification, OutboundMessage};
use crate::observability::metrics::Metrics;

pub struct AppState {
    pub jobs: DashMap<Uuid, Job>,
    pub assignments: DashMap<Uuid, Assignment>,
    pub status_log: DashMap<Uuid, StatusChangeLog>,
    pub no_show_evidence: DashMap<Uuid, NoShowEvidence>,
    /// Keyed on (role identity, job): the uniqueness constraint that makes
    /// fee posting idempotent.
    pub fees: DashMap<(Uuid, Uuid), FeeEntry>,
    pub notifications: DashMap<Uuid, Notification>,
    pub users: DashMap<Uuid, UserAccount>,
    pub drivers: DashMap<Uuid, Driver>,
    pub reps: DashMap<Uuid, Rep>,
    pub suppliers: DashMap<Uuid, Supplier>,
    pub vehicles: DashMap<Uuid, Vehicle>,
    job_locks: DashMap<Uuid, Arc<Mutex<()>>>,
    log_seq: AtomicU64,
    pub message_tx: mpsc::Sender<OutboundMessage>,
    pub transition_events_tx: broadcast::Sender<StatusChangeLog>,
    pub metrics: Metrics,
    pub edit_window_hours: i64,
    pub department_mailboxes: Vec<String>,
}

impl AppState {
    pub fn new(
        edit_window_hours: i64,
        department_mailboxes: Vec<String>,
        message_queue_size: usize,
        event_buffer_size: usize,
    ) -> (Self, mpsc::Receiver<OutboundMessage>) {
        let (message_tx, message_rx) = mpsc::channel(message_queue_size);
        let (transition_events_tx, _unused_rx) = broadcast::channel(event_buffer_size);

        (
            Self {
                jobs: DashMap::new(),
                assignments: DashMap::new(),
                status_log: DashMap::new(),
                no_show_evidence: DashMap::new(),
                fees: DashMap::new(),
                notifications: DashMap::new(),
                users: DashMap::new(),
                drivers: DashMap::new(),
                reps: DashMap::new(),
                suppliers: DashMap::new(),
                vehicles: DashMap::new(),
                job_locks: DashMap::new(),
                log_seq: AtomicU64::new(0),
                message_tx,
                transition_events_tx,
                metrics: Metrics::new(),
                edit_window_hours,
                department_mailboxes,
            },
            message_rx,
        )
    }

    /// Row-level write lock for one job. Every mutating lifecycle operation
    /// holds this across its validate-then-write section, so concurrent
    /// role updates serialize and a rejected call leaves no writes behind.
    pub fn job_lock(&self, job_id: Uuid) -> Arc<Mutex<()>> {
        self.job_locks
            .entry(job_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    pub fn next_log_seq(&self) -> u64 {
        self.log_seq.fetch_add(1, Ordering::Relaxed)
    }

    pub fn active_assignment(&self, job: &Job) -> Option<Assignment> {
        let id = job.assignment_id?;
        self.assignments
            .get(&id)
            .filter(|assignment| assignment.is_active())
            .map(|assignment| assignment.clone())
    }

    /// Log entries for one job in append order.
    pub fn job_log(&self, job_id: Uuid) -> Vec<StatusChangeLog> {
        let mut entries: Vec<StatusChangeLog> = self
            .status_log
            .iter()
            .filter(|entry| entry.value().job_id == job_id)
            .map(|entry| entry.value().clone())
            .collect();
        entries.sort_by_key(|entry| entry.seq);
        entries
    }
}
