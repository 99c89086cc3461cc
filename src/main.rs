use sqs_statsd::{cli, daemon};

#[tokio::main]
async fn main() -> Result<(), String> {
    let config = match cli::init_binary()? {
        None => return Ok(()),
        Some(config) => config,
    };

    daemon::run(config).await
}
