use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use tracing::info;
use std::sync::Arc;
use tokio::sync::OnceCell;

pub const OUTCOME_HIT: &str = "hit";
pub const OUTCOME_QUEUED: &str = "queued";
pub const OUTCOME_ACQUIRE: &str = "acquire";

// Declare the static OnceCell to hold the Metrics.
static METRICS_INSTANCE: OnceCell<Arc<Metrics>> = OnceCell::const_new();

/// Asynchronously initializes and gets a reference to the static `Metrics`.
pub async fn get_metrics() -> &'static Arc<Metrics> {
    METRICS_INSTANCE.get_or_init(|| async {
        info!("Initializing Metrics ...");
        Metrics::new()}
    ).await
}

/// Text exposition of every registered metric.
pub async fn render() -> anyhow::Result<String> {
    let metrics = get_metrics().await;
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&metrics.registry.gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Request routing
    pub requests: IntCounterVec,

    // Acquisition
    pub acquisitions: IntCounter,
    pub acquisition_failures: IntCounterVec,
    pub acquisition_duration: HistogramVec,

    // Cache
    pub slots: IntGauge,
    pub cache_clears: IntCounter,
}

impl Metrics {
    fn new() -> Arc<Self> {
        let registry = Registry::new_custom(Some("tokencache".into()), None).unwrap();

        let metrics: Arc<Metrics> = Arc::new(Self {
            requests: IntCounterVec::new(Opts::new("requests_total", "Token requests by how they were served"),&["outcome"],).unwrap(),

            acquisitions: IntCounter::new("acquisitions_total", "Upstream token acquisitions started").unwrap(),
            acquisition_failures: IntCounterVec::new(Opts::new("acquisition_failures_total", "Acquisition failures by reason"),&["reason"],).unwrap(),
            acquisition_duration: HistogramVec::new(HistogramOpts::new("acquisition_duration_seconds", "Acquisition duration seconds").buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),&["result"],).unwrap(),

            slots: IntGauge::new("slots", "Slots held by caches").unwrap(),
            cache_clears: IntCounter::new("cache_clears_total", "Full cache invalidations").unwrap(),

            registry,
        });

        // Register all metrics in the registry
        let reg = &metrics.registry;
        reg.register(Box::new(metrics.requests.clone())).unwrap();
        reg.register(Box::new(metrics.acquisitions.clone())).unwrap();
        reg.register(Box::new(metrics.acquisition_failures.clone())).unwrap();
        reg.register(Box::new(metrics.acquisition_duration.clone())).unwrap();
        reg.register(Box::new(metrics.slots.clone())).unwrap();
        reg.register(Box::new(metrics.cache_clears.clone())).unwrap();

        metrics
    }
}
