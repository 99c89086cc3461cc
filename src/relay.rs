use std::time::{Duration, SystemTime};

use log::{debug, info, warn};
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::catalog::{build_catalog, MetricDescriptor};
use crate::cloudwatch::{Datapoint, MonitoringClient};
use crate::prometheus::RelayMetrics;
use crate::statsd::MetricSink;
use crate::Result;

/// Source of the wall-clock time stamped on each tick.
pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Forwards the sums in `datapoints` for one descriptor. Returns how many
/// points were sent.
pub fn forward<S>(descriptor: &MetricDescriptor, datapoints: &[Datapoint], sink: &mut S) -> u64
where
    S: MetricSink + ?Sized,
{
    if datapoints.is_empty() {
        return 0;
    }
    let Some(name) = descriptor.statsd_name() else {
        warn!(
            "metric has no dimension to name it after, skipping: metric={}",
            descriptor
        );
        return 0;
    };
    let mut sent = 0;
    for sum in datapoints.iter().filter_map(|dp| dp.sum) {
        sink.absolute(&name, crate::sum_to_value(sum));
        sent += 1;
    }
    sent
}

/// Polls CloudWatch for a fixed catalog of SQS metrics and relays the sums
/// to a sink.
pub struct Relay<C, S> {
    client: C,
    sink: S,
    catalog: Vec<MetricDescriptor>,
    metrics: RelayMetrics,
}

impl<C, S> Relay<C, S>
where
    C: MonitoringClient,
    S: MetricSink,
{
    /// Builds the catalog. A failure here means there is nothing to relay,
    /// so it is returned as is and no relay exists.
    pub async fn start(client: C, sink: S, metrics: RelayMetrics) -> Result<Self> {
        let catalog = build_catalog(&client).await?;
        metrics.set_catalog_size(catalog.len());
        Ok(Self {
            client,
            sink,
            catalog,
            metrics,
        })
    }

    pub fn catalog(&self) -> &[MetricDescriptor] {
        &self.catalog
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Runs one polling round for a tick at `now`: one statistics call per
    /// descriptor, in catalog order, then a sink flush. A failed call only
    /// loses that descriptor's data for this tick.
    pub async fn tick(&mut self, now: SystemTime) {
        debug!("tick: now={}", humantime::format_rfc3339_seconds(now));
        self.metrics.ticks.inc();
        for descriptor in &self.catalog {
            let query = descriptor.query(now);
            let datapoints = match self.client.get_statistics(&query).await {
                Ok(datapoints) => datapoints,
                Err(e) => {
                    warn!(
                        "could not retrieve metric from cloudwatch: metric={} error={}",
                        descriptor, e
                    );
                    self.metrics.fetch_errors.inc();
                    continue;
                }
            };
            let sent = forward(descriptor, &datapoints, &mut self.sink);
            self.metrics.datapoints_forwarded.inc_by(sent);
        }
        self.sink.flush().await;
    }

    /// Ticks every `period`, forever. The first tick happens one full period
    /// after the call. When a round overruns, one catch-up round starts as
    /// soon as it ends; any further ticks missed meanwhile are dropped.
    pub async fn run<K: Clock>(mut self, clock: K, period: Duration) {
        info!(
            "relaying metrics: num_metrics={} interval={:?}",
            self.catalog.len(),
            period
        );
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            self.tick(clock.now()).await;
        }
    }
}
