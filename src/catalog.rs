use std::fmt;
use std::time::{Duration, SystemTime};

use log::info;

use crate::cloudwatch::{Dimension, MonitoringClient, Series};
use crate::{Result, NAMESPACE, PERIOD};

/// Statistic requested from CloudWatch. Only sums are relayed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Statistic {
    Sum,
}

impl Statistic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Statistic::Sum => "Sum",
        }
    }
}

/// Everything needed to fetch one metric series, minus the time window.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MetricDescriptor {
    pub namespace: String,
    pub metric_name: String,
    pub dimensions: Vec<Dimension>,
    pub period: Duration,
    pub statistic: Statistic,
}

/// A descriptor bound to a concrete `[start, end)` window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatQuery<'a> {
    pub descriptor: &'a MetricDescriptor,
    pub start: SystemTime,
    pub end: SystemTime,
}

impl MetricDescriptor {
    pub fn from_series(series: Series) -> Self {
        Self {
            namespace: series.namespace,
            metric_name: series.metric_name,
            dimensions: series.dimensions,
            period: PERIOD,
            statistic: Statistic::Sum,
        }
    }

    /// Builds the query for a tick happening at `now`.
    pub fn query(&self, now: SystemTime) -> StatQuery<'_> {
        let (start, end) = crate::query_window(now);
        StatQuery {
            descriptor: self,
            start,
            end,
        }
    }

    /// Name under which this series is reported, or `None` if the series
    /// has no dimension to take the queue name from.
    pub fn statsd_name(&self) -> Option<String> {
        let first = self.dimensions.first()?;
        Some(crate::metric_name(&first.value, &self.metric_name))
    }
}

impl fmt::Display for MetricDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.metric_name)?;
        let dims: Vec<String> = self
            .dimensions
            .iter()
            .map(|d| format!("{}={}", d.name, d.value))
            .collect();
        write!(f, "{{{}}}", dims.join(","))
    }
}

/// Lists all SQS metric series once and turns them into descriptors, in
/// the order CloudWatch returned them.
pub async fn build_catalog<C>(client: &C) -> Result<Vec<MetricDescriptor>>
where
    C: MonitoringClient + ?Sized,
{
    let series = client.list_metrics(NAMESPACE).await?;
    let catalog: Vec<MetricDescriptor> = series
        .into_iter()
        .map(MetricDescriptor::from_series)
        .collect();
    info!("built stats requests: num_metrics={}", catalog.len());
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, UNIX_EPOCH};

    use speculoos::prelude::*;

    use super::*;
    use crate::fakes::{series, FakeCloudWatch};
    use crate::Error;

    #[tokio::test]
    async fn builds_one_descriptor_per_series_in_order() {
        let client = FakeCloudWatch::new(vec![
            series("orders", "NumberOfMessagesSent"),
            series("orders", "ApproximateNumberOfMessagesVisible"),
            series("billing", "NumberOfMessagesSent"),
        ]);
        let catalog = build_catalog(&client).await.expect("catalog");
        let names: Vec<String> = catalog.iter().filter_map(|d| d.statsd_name()).collect();
        assert_that!(names).is_equal_to(vec![
            "orders.numberofmessagessent".to_string(),
            "orders.approximatenumberofmessagesvisible".to_string(),
            "billing.numberofmessagessent".to_string(),
        ]);
        assert_that!(client.listed_namespaces()).is_equal_to(vec![NAMESPACE.to_string()]);
    }

    #[tokio::test]
    async fn descriptors_copy_series_and_fix_aggregation() {
        let mut s = series("MyQueue", "SentMessageSize");
        s.dimensions.push(Dimension::new("Extra", "Other"));
        let client = FakeCloudWatch::new(vec![s.clone()]);
        let catalog = build_catalog(&client).await.expect("catalog");
        assert_that!(catalog).has_length(1);
        let d = &catalog[0];
        assert_that!(d.namespace).is_equal_to(s.namespace);
        assert_that!(d.metric_name).is_equal_to(s.metric_name);
        assert_that!(d.dimensions).is_equal_to(s.dimensions);
        assert_that!(d.period).is_equal_to(Duration::from_secs(60));
        assert_that!(d.statistic).is_equal_to(Statistic::Sum);
    }

    #[tokio::test]
    async fn empty_namespace_gives_empty_catalog() {
        let client = FakeCloudWatch::new(vec![]);
        let catalog = build_catalog(&client).await.expect("catalog");
        assert_that!(catalog).is_empty();
    }

    #[tokio::test]
    async fn listing_failure_is_an_error() {
        let client = FakeCloudWatch::new(vec![series("q", "m")]).fail_listing();
        let result = build_catalog(&client).await;
        assert!(matches!(result, Err(Error::Catalog(_))));
    }

    #[test]
    fn query_window_ends_at_tick() {
        let d = MetricDescriptor::from_series(series("q", "m"));
        let now = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let q = d.query(now);
        assert_that!(q.end).is_equal_to(now);
        assert_that!(q.end.duration_since(q.start).unwrap()).is_equal_to(Duration::from_secs(60));
        assert!(std::ptr::eq(q.descriptor, &d));
    }

    #[test]
    fn no_dimension_has_no_name() {
        let mut s = series("q", "m");
        s.dimensions.clear();
        let d = MetricDescriptor::from_series(s);
        assert_that!(d.statsd_name()).is_none();
    }

    #[test]
    fn display_includes_dimensions() {
        let d = MetricDescriptor::from_series(series("MyQueue", "NumberOfMessagesSent"));
        assert_that!(d.to_string())
            .is_equal_to("AWS/SQS/NumberOfMessagesSent{QueueName=MyQueue}".to_string());
    }
}
