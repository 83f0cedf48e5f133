use prometheus::{IntCounter, Opts, Registry};

/// Delivery pipeline prometheus metrics.
pub struct DeliveryMetrics {
    /// Messages returned to callers.
    pub delivered: IntCounter,
    /// Unread documents skipped because their text was missing or malformed.
    pub skipped: IntCounter,
    /// Read-state writes committed by the acknowledger.
    pub acknowledged: IntCounter,
    /// Read-state writes that failed or timed out.
    pub ack_failures: IntCounter,
    /// Documents given a read flag by reconciliation.
    pub backfilled: IntCounter,
}

impl DeliveryMetrics {
    /// Create metrics and register them with the given prometheus registry.
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let delivered = IntCounter::with_opts(Opts::new(
            "chat_messages_delivered_total",
            "Messages returned to callers",
        ))?;
        let skipped = IntCounter::with_opts(Opts::new(
            "chat_messages_skipped_total",
            "Unread messages skipped for a missing or malformed text field",
        ))?;
        let acknowledged = IntCounter::with_opts(Opts::new(
            "chat_messages_acknowledged_total",
            "Read-state writes committed",
        ))?;
        let ack_failures = IntCounter::with_opts(Opts::new(
            "chat_ack_failures_total",
            "Read-state writes that failed",
        ))?;
        let backfilled = IntCounter::with_opts(Opts::new(
            "chat_messages_backfilled_total",
            "Messages given a read flag by reconciliation",
        ))?;

        registry.register(Box::new(delivered.clone()))?;
        registry.register(Box::new(skipped.clone()))?;
        registry.register(Box::new(acknowledged.clone()))?;
        registry.register(Box::new(ack_failures.clone()))?;
        registry.register(Box::new(backfilled.clone()))?;

        Ok(Self {
            delivered,
            skipped,
            acknowledged,
            ack_failures,
            backfilled,
        })
    }

    /// Create metrics without registering (for testing).
    pub fn unregistered() -> Self {
        Self {
            delivered: IntCounter::new("chat_messages_delivered_total", "delivered")
                .expect("valid metric name"),
            skipped: IntCounter::new("chat_messages_skipped_total", "skipped")
                .expect("valid metric name"),
            acknowledged: IntCounter::new("chat_messages_acknowledged_total", "acknowledged")
                .expect("valid metric name"),
            ack_failures: IntCounter::new("chat_ack_failures_total", "ack failures")
                .expect("valid metric name"),
            backfilled: IntCounter::new("chat_messages_backfilled_total", "backfilled")
                .expect("valid metric name"),
        }
    }
}
