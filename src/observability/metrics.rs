use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub status_transitions_total: IntCounterVec,
    pub fees_posted_total: IntCounterVec,
    pub outbound_messages_total: IntCounterVec,
    pub messages_in_queue: IntGauge,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let status_transitions_total = IntCounterVec::new(
            Opts::new(
                "status_transitions_total",
                "Status transitions by role and outcome",
            ),
            &["role", "outcome"],
        )
        .expect("valid status_transitions_total metric");

        let fees_posted_total = IntCounterVec::new(
            Opts::new("fees_posted_total", "Fee entries created by role"),
            &["role"],
        )
        .expect("valid fees_posted_total metric");

        let outbound_messages_total = IntCounterVec::new(
            Opts::new(
                "outbound_messages_total",
                "Outbound update messages by outcome",
            ),
            &["outcome"],
        )
        .expect("valid outbound_messages_total metric");

        let messages_in_queue =
            IntGauge::new("messages_in_queue", "Current number of queued outbound messages")
                .expect("valid messages_in_queue metric");

        registry
            .register(Box::new(status_transitions_total.clone()))
            .expect("register status_transitions_total");
        registry
            .register(Box::new(fees_posted_total.clone()))
            .expect("register fees_posted_total");
        registry
            .register(Box::new(outbound_messages_total.clone()))
            .expect("register outbound_messages_total");
        registry
            .register(Box::new(messages_in_queue.clone()))
            .expect("register messages_in_queue");

        Self {
            registry,
            status_transitions_total,
            fees_posted_total,
            outbound_messages_total,
            messages_in_queue,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}
