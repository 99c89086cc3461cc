use std::net::SocketAddr;
use std::sync::Arc;

use axum::{routing::get, Router};
use log::{error, info};
use prometheus_client::{encoding::text::encode, registry::Registry};
use tokio::net::TcpListener;

use crate::cli::Config;
use crate::cloudwatch::CloudWatch;
use crate::prometheus::{registry_for, RelayMetrics};
use crate::relay::{Relay, SystemClock};
use crate::statsd::StatsdClient;
use crate::{STATSD_PREFIX, TICK_INTERVAL};

pub fn build_app(registry: Registry) -> Router {
    let r2 = Arc::new(registry);

    Router::new().route(
        "/metrics",
        get({
            let req_registry = Arc::clone(&r2);
            move || metrics(req_registry)
        }),
    )
}

pub async fn bind(addr: SocketAddr) -> Result<TcpListener, String> {
    TcpListener::bind(&addr)
        .await
        .map_err(|e| format!("Failed to bind to {}: {}", addr, e))
}

pub async fn run_daemon(listener: TcpListener, app: Router) -> Result<(), String> {
    axum::serve(listener, app)
        .await
        .map_err(|e| format!("Server error: {}", e))
}

// metrics handler
async fn metrics(registry: Arc<Registry>) -> String {
    let mut buffer = String::new();
    if let Err(e) = encode(&mut buffer, &registry) {
        error!("could not encode relay metrics: error={}", e);
    }
    buffer
}

/// Opens the statsd socket and the CloudWatch client, builds the catalog and
/// relays forever. Only returns on a startup failure.
pub async fn run(config: Config) -> Result<(), String> {
    let sink = StatsdClient::connect(&config.statsd_host, STATSD_PREFIX)
        .await
        .map_err(|e| {
            error!(
                "could not initialize statsd client: host={} error={}",
                config.statsd_host, e
            );
            format!("could not initialize statsd client: {}", e)
        })?;
    if let Ok(peer) = sink.peer_addr() {
        info!("sending to statsd: addr={}", peer);
    }

    let client = CloudWatch::connect(&config).await;
    let metrics = RelayMetrics::default();

    if let Some(addr) = config.metrics_addr {
        let listener = bind(addr).await?;
        let app = build_app(registry_for(&metrics));
        info!("serving relay metrics: addr={}", addr);
        tokio::spawn(async move {
            if let Err(e) = run_daemon(listener, app).await {
                error!("metrics endpoint stopped: error={}", e);
            }
        });
    }

    let relay = Relay::start(client, sink, metrics).await.map_err(|e| {
        error!(
            "could not build requests: region={} error={}",
            config.aws_region, e
        );
        format!("could not build requests: {}", e)
    })?;

    relay.run(SystemClock, TICK_INTERVAL).await;
    Ok(())
}
