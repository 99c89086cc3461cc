use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_cloudwatch::error::DisplayErrorContext;
use aws_sdk_cloudwatch::primitives::DateTime;
use aws_sdk_cloudwatch::types;
use log::debug;

use crate::catalog::StatQuery;
use crate::cli::Config;
use crate::{Error, Result};

/// One name/value pair qualifying a metric series, e.g. `QueueName=orders`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dimension {
    pub name: String,
    pub value: String,
}

impl Dimension {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A metric series as returned by `ListMetrics`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Series {
    pub namespace: String,
    pub metric_name: String,
    pub dimensions: Vec<Dimension>,
}

/// One aggregated value returned by `GetMetricStatistics`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Datapoint {
    pub sum: Option<f64>,
}

/// The subset of the CloudWatch API the relay needs.
#[async_trait]
pub trait MonitoringClient: Send + Sync {
    /// Lists every metric series in `namespace`. Failures are
    /// reported as [`Error::Catalog`].
    async fn list_metrics(&self, namespace: &str) -> Result<Vec<Series>>;

    /// Fetches the datapoints of one series over the query window.
    /// Failures are reported as [`Error::Fetch`].
    async fn get_statistics(&self, query: &StatQuery<'_>) -> Result<Vec<Datapoint>>;
}

/// CloudWatch client authenticated with a static access key pair.
#[derive(Clone, Debug)]
pub struct CloudWatch {
    client: aws_sdk_cloudwatch::Client,
}

impl CloudWatch {
    pub async fn connect(config: &Config) -> Self {
        let credentials = Credentials::from_keys(&config.aws_access, &config.aws_secret, None);
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.aws_region.clone()))
            .credentials_provider(credentials)
            .load()
            .await;
        debug!("cloudwatch client ready: region={}", config.aws_region);
        Self {
            client: aws_sdk_cloudwatch::Client::new(&sdk_config),
        }
    }
}

fn series_from_metric(namespace: &str, metric: &types::Metric) -> Series {
    Series {
        namespace: metric.namespace().unwrap_or(namespace).to_string(),
        metric_name: metric.metric_name().unwrap_or_default().to_string(),
        dimensions: metric
            .dimensions()
            .iter()
            .map(|d| Dimension::new(d.name().unwrap_or_default(), d.value().unwrap_or_default()))
            .collect(),
    }
}

#[async_trait]
impl MonitoringClient for CloudWatch {
    async fn list_metrics(&self, namespace: &str) -> Result<Vec<Series>> {
        let mut series = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let output = self
                .client
                .list_metrics()
                .namespace(namespace)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| Error::Catalog(DisplayErrorContext(&e).to_string()))?;
            series.extend(
                output
                    .metrics()
                    .iter()
                    .map(|m| series_from_metric(namespace, m)),
            );
            match output.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => break,
            }
        }
        Ok(series)
    }

    async fn get_statistics(&self, query: &StatQuery<'_>) -> Result<Vec<Datapoint>> {
        let descriptor = query.descriptor;
        let period = i32::try_from(descriptor.period.as_secs())
            .map_err(|_| Error::Fetch(format!("period {:?} out of range", descriptor.period)))?;
        let dimensions = descriptor
            .dimensions
            .iter()
            .map(|d| {
                types::Dimension::builder()
                    .name(&d.name)
                    .value(&d.value)
                    .build()
            })
            .collect();
        let output = self
            .client
            .get_metric_statistics()
            .namespace(&descriptor.namespace)
            .metric_name(&descriptor.metric_name)
            .set_dimensions(Some(dimensions))
            .period(period)
            .statistics(types::Statistic::from(descriptor.statistic.as_str()))
            .start_time(DateTime::from(query.start))
            .end_time(DateTime::from(query.end))
            .send()
            .await
            .map_err(|e| Error::Fetch(DisplayErrorContext(&e).to_string()))?;
        Ok(output
            .datapoints()
            .iter()
            .map(|p| Datapoint { sum: p.sum() })
            .collect())
    }
}
