//! Prometheus metrics for the creation worker

use crate::config::MetricsSettings;
use prometheus::{Encoder, Gauge, IntCounter, IntGauge, Registry, TextEncoder};
use std::io::Write;
use std::net::SocketAddr;
use std::sync::Arc;

/// Instruments updated by the creation worker
pub struct CreationMetrics {
    registry: Registry,
    pub events_created: IntCounter,
    pub cycles_denied: IntCounter,
    pub cycles_no_progress: IntCounter,
    pub commands_processed: IntCounter,
    pub max_bully_score: IntGauge,
    pub score_ratio: Gauge,
    pub command_queue_depth: IntGauge,
}

impl CreationMetrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let events_created =
            IntCounter::new("braid_events_created_total", "Events created by this node")?;
        let cycles_denied = IntCounter::new(
            "braid_creation_cycles_denied_total",
            "Creation cycles refused by the permission gate",
        )?;
        let cycles_no_progress = IntCounter::new(
            "braid_creation_cycles_no_progress_total",
            "Creation cycles skipped because no candidate advanced consensus",
        )?;
        let commands_processed = IntCounter::new(
            "braid_creator_commands_total",
            "Commands processed by the creation worker",
        )?;
        let max_bully_score = IntGauge::new(
            "braid_max_bully_score",
            "Highest per-peer bully score observed",
        )?;
        let score_ratio = Gauge::new(
            "braid_score_ratio",
            "Unconfirmed advancement score as a fraction of the maximum",
        )?;
        let command_queue_depth = IntGauge::new(
            "braid_command_queue_depth",
            "Commands waiting in the worker queue",
        )?;

        registry.register(Box::new(events_created.clone()))?;
        registry.register(Box::new(cycles_denied.clone()))?;
        registry.register(Box::new(cycles_no_progress.clone()))?;
        registry.register(Box::new(commands_processed.clone()))?;
        registry.register(Box::new(max_bully_score.clone()))?;
        registry.register(Box::new(score_ratio.clone()))?;
        registry.register(Box::new(command_queue_depth.clone()))?;

        Ok(Self {
            registry,
            events_created,
            cycles_denied,
            cycles_no_progress,
            commands_processed,
            max_bully_score,
            score_ratio,
            command_queue_depth,
        })
    }

    /// Render all metrics in the Prometheus text exposition format
    pub fn render(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Minimal HTTP endpoint exposing /metrics and /health
pub struct MetricsServer {
    settings: MetricsSettings,
    metrics: Arc<CreationMetrics>,
}

impl MetricsServer {
    pub fn new(settings: MetricsSettings, metrics: Arc<CreationMetrics>) -> Self {
        Self { settings, metrics }
    }

    pub async fn run(&self) -> anyhow::Result<()> {
        let addr: SocketAddr = self.settings.prometheus_addr.parse()?;
        tracing::info!(%addr, "starting metrics server");

        let listener = std::net::TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;

        loop {
            match listener.accept() {
                Ok((mut stream, _)) => {
                    let body = match self.metrics.render() {
                        Ok(body) => Some(body),
                        Err(error) => {
                            tracing::error!(%error, "failed to render metrics");
                            None
                        }
                    };
                    tokio::task::spawn_blocking(move || {
                        let mut buf = [0u8; 1024];
                        if let Ok(n) = std::io::Read::read(&mut stream, &mut buf) {
                            let request = String::from_utf8_lossy(&buf[..n]);
                            let response = build_response(&request, body);
                            let _ = stream.write_all(response.as_bytes());
                        }
                    });
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
                }
                Err(e) => {
                    tracing::error!("metrics accept error: {}", e);
                    tokio::time::sleep(tokio::time::Duration::from_secs(1)).await;
                }
            }
        }
    }
}

/// Builds the HTTP response for one request. `body` is the rendered
/// metrics text, or `None` if rendering failed.
fn build_response(request: &str, body: Option<String>) -> String {
    if request.contains("GET /metrics") {
        match body {
            Some(body) => format!(
                "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\n\r\n{}",
                body.len(),
                body
            ),
            None => "HTTP/1.1 500 Internal Server Error\r\n\r\n".to_string(),
        }
    } else if request.contains("GET /health") {
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\r\n{\"status\":\"healthy\"}"
            .to_string()
    } else {
        "HTTP/1.1 404 Not Found\r\n\r\n".to_string()
    }
}
