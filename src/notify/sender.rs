use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::models::notification::OutboundMessage;
use crate::state::AppState;

/// Detached consumer of the outbound queue. Delivery errors are logged per
/// recipient and swallowed: the mutation that produced the message has long
/// since committed, so nothing here may surface to a caller.
pub async fn run_message_sender(state: Arc<AppState>, mut message_rx: mpsc::Receiver<OutboundMessage>) {
    info!("message sender started");

    while let Some(message) = message_rx.recv().await {
        state.metrics.messages_in_queue.dec();

        match deliver(&message) {
            Ok(()) => {
                state
                    .metrics
                    .outbound_messages_total
                    .with_label_values(&["delivered"])
                    .inc();
            }
            Err(err) => {
                state
                    .metrics
                    .outbound_messages_total
                    .with_label_values(&["failed"])
                    .inc();
                warn!(to = %message.to, error = %err, "update message delivery failed");
            }
        }
    }

    warn!("message sender stopped: queue channel closed");
}

/// Outbound transport boundary. The real channel lives outside this core;
/// here delivery is a structured log line.
fn deliver(message: &OutboundMessage) -> Result<(), String> {
    info!(to = %message.to, subject = %message.subject, "update message delivered");
    Ok(())
}
