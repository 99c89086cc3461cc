use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;

pub const METRICS_PREFIX: &str = "sqs_statsd";

/// Counters describing the relay itself. Clones share the same values, so
/// one copy can live in the relay and another in the registry.
#[derive(Clone, Debug, Default)]
pub struct RelayMetrics {
    pub ticks: Counter,
    pub fetch_errors: Counter,
    pub datapoints_forwarded: Counter,
    pub catalog_metrics: Gauge,
}

impl RelayMetrics {
    pub fn register(&self, registry: &mut Registry) {
        registry.register("ticks", "Number of polling ticks run", self.ticks.clone());
        registry.register(
            "fetch_errors",
            "Number of failed GetMetricStatistics calls",
            self.fetch_errors.clone(),
        );
        registry.register(
            "datapoints_forwarded",
            "Number of datapoints sent to statsd",
            self.datapoints_forwarded.clone(),
        );
        registry.register(
            "catalog_metrics",
            "Number of metric series being relayed",
            self.catalog_metrics.clone(),
        );
    }

    pub fn set_catalog_size(&self, len: usize) {
        self.catalog_metrics.set(len.try_into().unwrap_or(i64::MAX));
    }
}

/// Builds a registry holding `metrics` under the crate prefix.
pub fn registry_for(metrics: &RelayMetrics) -> Registry {
    let mut registry = Registry::with_prefix(METRICS_PREFIX);
    metrics.register(&mut registry);
    registry
}

pub fn encode_to_text(registry: &Registry) -> Result<String, std::fmt::Error> {
    let mut buffer = String::new();
    encode(&mut buffer, registry).and(Ok(buffer))
}
