
use lazy_static::lazy_static;
use prometheus::Encoder;
use prometheus::IntCounter;
use prometheus::Opts;
use prometheus::Registry;
use tracing::error;

lazy_static! {
    pub static ref EVENTS_OBSERVED: IntCounter = IntCounter::with_opts(Opts::new(
        "events_observed_total",
        "Child-added events received from the logs collection"
    ))
    .expect("metric can not be created");

    pub static ref MISSING_TOKEN: IntCounter = IntCounter::with_opts(Opts::new(
        "missing_token_total",
        "Events dropped because the user has no registered device"
    ))
    .expect("metric can not be created");

    pub static ref RESOLUTION_FAILURES: IntCounter = IntCounter::with_opts(Opts::new(
        "resolution_failures_total",
        "Device token reads that failed"
    ))
    .expect("metric can not be created");

    pub static ref NOTIFICATIONS_SENT: IntCounter = IntCounter::with_opts(Opts::new(
        "notifications_sent_total",
        "Messages acknowledged by the push gateway"
    ))
    .expect("metric can not be created");

    pub static ref DELIVERY_FAILURES: IntCounter = IntCounter::with_opts(Opts::new(
        "delivery_failures_total",
        "Messages the push gateway rejected or could not be sent"
    ))
    .expect("metric can not be created");

    pub static ref FEED_RECONNECTS: IntCounter = IntCounter::with_opts(Opts::new(
        "feed_reconnects_total",
        "Change stream reconnect attempts"
    ))
    .expect("metric can not be created");

    pub static ref REGISTRY: Registry = {
        let registry = Registry::new_custom(Some("relay".to_string()), None)
            .expect("registry can be created");
        register_custom_metrics(&registry);
        registry
    };
}

pub(crate) fn register_custom_metrics(registry: &Registry) {
    for counter in [
        &*EVENTS_OBSERVED,
        &*MISSING_TOKEN,
        &*RESOLUTION_FAILURES,
        &*NOTIFICATIONS_SENT,
        &*DELIVERY_FAILURES,
        &*FEED_RECONNECTS,
    ] {
        registry
            .register(Box::new(counter.clone()))
            .expect("collector can be registered");
    }
}

/// Prometheus text exposition of the relay counters
pub fn metrics_text() -> String {
    let encoder = prometheus::TextEncoder::new();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        error!("could not encode custom metrics: {}", e);
    };
    match String::from_utf8(buffer) {
        Ok(v) => v,
        Err(e) => {
            error!("custom metrics could not be from_utf8'd: {}", e);
            String::default()
        }
    }
}
