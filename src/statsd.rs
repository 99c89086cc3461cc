use std::collections::HashMap;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use async_trait::async_trait;
use log::debug;
use tokio::net::{lookup_host, UdpSocket};

use crate::{Error, Result};

pub const DEFAULT_HOST: &str = "localhost:8125";

/// Largest datagram payload sent in one go; fits any sane MTU.
pub const MAX_PACKET_SIZE: usize = 512;

/// Destination for relayed metric points.
#[async_trait]
pub trait MetricSink: Send {
    /// Records an absolute (gauge-like) value for `name`.
    fn absolute(&mut self, name: &str, value: i64);

    /// Sends whatever has been recorded since the last flush. Delivery is
    /// best-effort, failures are not reported.
    async fn flush(&mut self);
}

/// Accumulates absolute values until flushed. Values for the same name are
/// kept in the order they were recorded.
#[derive(Debug, Default)]
pub struct StatsdBuffer {
    prefix: String,
    order: Vec<String>,
    values: HashMap<String, Vec<i64>>,
}

impl StatsdBuffer {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Drains the buffer into protocol lines, `<prefix><name>:<value>|a`.
    pub fn take_lines(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        for name in self.order.drain(..) {
            for value in self.values.remove(&name).unwrap_or_default() {
                lines.push(format!("{}{}:{}|a", self.prefix, name, value));
            }
        }
        lines
    }
}

#[async_trait]
impl MetricSink for StatsdBuffer {
    fn absolute(&mut self, name: &str, value: i64) {
        match self.values.get_mut(name) {
            Some(values) => values.push(value),
            None => {
                self.order.push(name.to_string());
                self.values.insert(name.to_string(), vec![value]);
            }
        }
    }

    // Nothing to send, lines stay until taken.
    async fn flush(&mut self) {}
}

/// Joins lines with newlines into payloads of at most `max` bytes. A line
/// longer than `max` is sent on its own.
/// Example:
/// ```
/// let lines = vec!["a:1|a".to_string(), "b:2|a".to_string(), "c:3|a".to_string()];
/// assert_eq!(sqs_statsd::statsd::pack_lines(&lines, 11), vec!["a:1|a\nb:2|a", "c:3|a"]);
/// assert_eq!(sqs_statsd::statsd::pack_lines(&lines, 4), vec!["a:1|a", "b:2|a", "c:3|a"]);
/// assert!(sqs_statsd::statsd::pack_lines(&[], 512).is_empty());
/// ```
pub fn pack_lines(lines: &[String], max: usize) -> Vec<String> {
    let mut packets = Vec::new();
    let mut current = String::new();
    for line in lines {
        if !current.is_empty() && current.len() + 1 + line.len() > max {
            packets.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(line);
    }
    if !current.is_empty() {
        packets.push(current);
    }
    packets
}

/// StatsD client sending buffered points over UDP on every flush.
#[derive(Debug)]
pub struct StatsdClient {
    socket: UdpSocket,
    buffer: StatsdBuffer,
}

impl StatsdClient {
    /// Resolves `host` (a `host:port` string) and opens a UDP socket
    /// towards it.
    pub async fn connect(host: &str, prefix: &str) -> Result<Self> {
        let target = lookup_host(host)
            .await?
            .next()
            .ok_or_else(|| Error::Config(format!("statsd host '{}' did not resolve", host)))?;
        let local: SocketAddr = if target.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local).await?;
        socket.connect(target).await?;
        debug!("statsd socket open: local={} remote={}", local, target);
        Ok(Self {
            socket,
            buffer: StatsdBuffer::new(prefix),
        })
    }

    pub fn peer_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.peer_addr()?)
    }
}

#[async_trait]
impl MetricSink for StatsdClient {
    fn absolute(&mut self, name: &str, value: i64) {
        self.buffer.absolute(name, value);
    }

    async fn flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let lines = self.buffer.take_lines();
        for packet in pack_lines(&lines, MAX_PACKET_SIZE) {
            if let Err(e) = self.socket.send(packet.as_bytes()).await {
                debug!("dropping statsd packet: error={}", e);
            }
        }
    }
}
