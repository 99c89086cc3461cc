//! In-memory stand-ins for CloudWatch, StatsD and the wall clock.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;

use crate::catalog::{StatQuery, Statistic};
use crate::cloudwatch::{Datapoint, Dimension, MonitoringClient, Series};
use crate::relay::Clock;
use crate::statsd::MetricSink;
use crate::{Error, Result, NAMESPACE};

pub fn series(queue: &str, metric: &str) -> Series {
    Series {
        namespace: NAMESPACE.to_string(),
        metric_name: metric.to_string(),
        dimensions: vec![Dimension::new("QueueName", queue)],
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RecordedQuery {
    pub metric_name: String,
    pub dimensions: Vec<Dimension>,
    pub period: Duration,
    pub statistic: Statistic,
    pub start: SystemTime,
    pub end: SystemTime,
}

/// Answers from canned sums keyed by metric name, and records every query.
#[derive(Clone, Default)]
pub struct FakeCloudWatch {
    series: Vec<Series>,
    sums: HashMap<String, Vec<f64>>,
    failing: HashSet<String>,
    list_fails: bool,
    delay: Option<Duration>,
    started: Arc<Mutex<Vec<tokio::time::Instant>>>,
    namespaces: Arc<Mutex<Vec<String>>>,
    queries: Arc<Mutex<Vec<RecordedQuery>>>,
}

impl FakeCloudWatch {
    pub fn new(series: Vec<Series>) -> Self {
        Self {
            series,
            ..Default::default()
        }
    }

    pub fn with_sums(mut self, metric: &str, sums: &[f64]) -> Self {
        self.sums.insert(metric.to_string(), sums.to_vec());
        self
    }

    pub fn failing_for(mut self, metric: &str) -> Self {
        self.failing.insert(metric.to_string());
        self
    }

    /// Makes every statistics call take `delay` of (tokio) time.
    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Instants at which statistics calls began.
    pub fn call_starts(&self) -> Arc<Mutex<Vec<tokio::time::Instant>>> {
        Arc::clone(&self.started)
    }

    pub fn fail_listing(mut self) -> Self {
        self.list_fails = true;
        self
    }

    pub fn listed_namespaces(&self) -> Vec<String> {
        self.namespaces.lock().unwrap().clone()
    }

    pub fn queries(&self) -> Arc<Mutex<Vec<RecordedQuery>>> {
        Arc::clone(&self.queries)
    }
}

#[async_trait]
impl MonitoringClient for FakeCloudWatch {
    async fn list_metrics(&self, namespace: &str) -> Result<Vec<Series>> {
        self.namespaces.lock().unwrap().push(namespace.to_string());
        if self.list_fails {
            return Err(Error::Catalog("access denied".to_string()));
        }
        Ok(self.series.clone())
    }

    async fn get_statistics(&self, query: &StatQuery<'_>) -> Result<Vec<Datapoint>> {
        let d = query.descriptor;
        self.started.lock().unwrap().push(tokio::time::Instant::now());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.queries.lock().unwrap().push(RecordedQuery {
            metric_name: d.metric_name.clone(),
            dimensions: d.dimensions.clone(),
            period: d.period,
            statistic: d.statistic,
            start: query.start,
            end: query.end,
        });
        if self.failing.contains(&d.metric_name) {
            return Err(Error::Fetch("throttled".to_string()));
        }
        Ok(self
            .sums
            .get(&d.metric_name)
            .map(|sums| sums.iter().map(|s| Datapoint { sum: Some(*s) }).collect())
            .unwrap_or_default())
    }
}

/// Records every absolute value and counts flushes.
#[derive(Clone, Default)]
pub struct RecordingSink {
    pub points: Arc<Mutex<Vec<(String, i64)>>>,
    pub flushes: Arc<Mutex<usize>>,
}

impl RecordingSink {
    pub fn take(&self) -> Vec<(String, i64)> {
        std::mem::take(&mut *self.points.lock().unwrap())
    }
}

#[async_trait]
impl MetricSink for RecordingSink {
    fn absolute(&mut self, name: &str, value: i64) {
        self.points.lock().unwrap().push((name.to_string(), value));
    }

    async fn flush(&mut self) {
        *self.flushes.lock().unwrap() += 1;
    }
}

/// Starts at `base` and moves forward one minute per reading.
pub struct SteppingClock {
    base: SystemTime,
    readings: AtomicU64,
}

impl SteppingClock {
    pub fn new(base_secs: u64) -> Self {
        Self {
            base: UNIX_EPOCH + Duration::from_secs(base_secs),
            readings: AtomicU64::new(0),
        }
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> SystemTime {
        let n = self.readings.fetch_add(1, Ordering::SeqCst);
        self.base + Duration::from_secs(60 * n)
    }
}
