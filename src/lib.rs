use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub mod catalog;
pub mod cli;
pub mod cloudwatch;
pub mod daemon;
pub mod error;
pub mod prometheus;
pub mod relay;
pub mod statsd;

#[cfg(test)]
mod fakes;

pub use error::{Error, Result};

/// CloudWatch namespace holding the SQS queue metrics.
pub const NAMESPACE: &str = "AWS/SQS";

/// Prefix prepended to every metric line sent to StatsD.
pub const STATSD_PREFIX: &str = "aws.sqs.";

/// Aggregation period requested from CloudWatch, and the length of each
/// query window.
pub const PERIOD: Duration = Duration::from_secs(60);

/// Interval between two polls of CloudWatch.
pub const TICK_INTERVAL: Duration = Duration::from_secs(60);

/// Builds the StatsD metric name for a queue metric.
/// Example:
/// ```
/// assert_eq!(sqs_statsd::metric_name("MyQueue", "NumberOfMessagesSent"),
///   "myqueue.numberofmessagessent");
/// assert_eq!(sqs_statsd::metric_name("", "X"), ".x");
/// ```
pub fn metric_name(queue: &str, metric: &str) -> String {
    format!("{}.{}", queue.to_lowercase(), metric.to_lowercase())
}

/// Converts a CloudWatch sum into the integer sent to StatsD, truncating
/// toward zero. Out of range values saturate, NaN becomes zero.
/// Example:
/// ```
/// assert_eq!(sqs_statsd::sum_to_value(42.0), 42);
/// assert_eq!(sqs_statsd::sum_to_value(42.9), 42);
/// assert_eq!(sqs_statsd::sum_to_value(-1.5), -1);
/// assert_eq!(sqs_statsd::sum_to_value(f64::NAN), 0);
/// ```
pub fn sum_to_value(sum: f64) -> i64 {
    sum as i64
}

/// Returns the `[start, end)` window queried for a tick at `now`.
/// Example:
/// ```
/// use std::time::{Duration, UNIX_EPOCH};
/// let now = UNIX_EPOCH + Duration::from_secs(3600);
/// assert_eq!(sqs_statsd::query_window(now),
///   (UNIX_EPOCH + Duration::from_secs(3540), now));
/// ```
pub fn query_window(now: SystemTime) -> (SystemTime, SystemTime) {
    let start = now.checked_sub(PERIOD).unwrap_or(UNIX_EPOCH);
    (start, now)
}

/// Interprets a boolean flag coming from the environment.
/// Example:
/// ```
/// assert!(sqs_statsd::parse_flag("true"));
/// assert!(sqs_statsd::parse_flag("1"));
/// assert!(sqs_statsd::parse_flag(" Yes "));
/// assert!(!sqs_statsd::parse_flag("false"));
/// assert!(!sqs_statsd::parse_flag(""));
/// ```
pub fn parse_flag(s: &str) -> bool {
    matches!(
        s.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
