use std::time::SystemTime;

use log::{error, info};

use sqs_statsd::cloudwatch::CloudWatch;
use sqs_statsd::prometheus::RelayMetrics;
use sqs_statsd::relay::Relay;
use sqs_statsd::statsd::StatsdBuffer;
use sqs_statsd::{cli, STATSD_PREFIX};

/// Runs a single polling round right away and prints the statsd lines that
/// would have been sent, instead of sending them.
#[tokio::main]
async fn main() -> Result<(), String> {
    let config = match cli::init_binary()? {
        None => return Ok(()),
        Some(config) => config,
    };

    let client = CloudWatch::connect(&config).await;
    let sink = StatsdBuffer::new(STATSD_PREFIX);
    let mut relay = Relay::start(client, sink, RelayMetrics::default())
        .await
        .map_err(|e| {
            error!(
                "could not build requests: region={} error={}",
                config.aws_region, e
            );
            e.to_string()
        })?;

    info!("polling once: num_metrics={}", relay.catalog().len());
    relay.tick(SystemTime::now()).await;
    for line in relay.sink_mut().take_lines() {
        println!("{}", line);
    }
    Ok(())
}
