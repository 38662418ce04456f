use anyhow::Result;
use axum::{routing::get, Router};
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tokio::net::TcpListener;
use tracing::info;

use crate::config::MetricsConfig;
use crate::error::{RedirectError, Result as RedirectResult};
use crate::rewrite::Outcome;

/// Metrics collector that handles all application metrics
pub struct MetricsCollector {
    config: MetricsConfig,
    prometheus_handle: Option<PrometheusHandle>,
}

impl MetricsCollector {
    pub fn new(config: &MetricsConfig) -> Result<Self> {
        let prometheus_handle = if config.enabled {
            let builder = PrometheusBuilder::new();
            let handle = builder
                .install_recorder()
                .map_err(|e| anyhow::anyhow!("Failed to install Prometheus recorder: {}", e))?;

            Self::register_metrics();

            Some(handle)
        } else {
            None
        };

        Ok(Self {
            config: config.clone(),
            prometheus_handle,
        })
    }

    fn register_metrics() {
        describe_counter!(
            "redirect_requests_total",
            "Total number of requests the redirect handler decided on"
        );
        describe_counter!(
            "redirects_issued_total",
            "Total number of stale version references redirected"
        );
        describe_counter!(
            "not_found_total",
            "Total number of requests that fell through to the not-found page"
        );
        describe_histogram!(
            "redirect_decision_duration_seconds",
            "Time spent deciding between redirect and not-found"
        );
    }

    /// Start the metrics server
    pub async fn start_server(&self, config: &MetricsConfig) -> RedirectResult<()> {
        if !config.enabled {
            return Ok(());
        }

        let handle = match &self.prometheus_handle {
            Some(handle) => handle.clone(),
            None => {
                return Err(RedirectError::Internal(
                    "Prometheus handle not available".to_string(),
                ))
            }
        };

        let app = Router::new()
            .route(&config.path, get(move || async move { handle.render() }))
            .route("/health", get(|| async { "OK" }));

        let addr = format!("0.0.0.0:{}", config.port);
        let listener = TcpListener::bind(&addr).await.map_err(|e| {
            RedirectError::Internal(format!("Failed to bind metrics server: {}", e))
        })?;

        info!("Metrics server listening on {}{}", addr, config.path);

        axum::serve(listener, app)
            .await
            .map_err(|e| RedirectError::Internal(format!("Metrics server error: {}", e)))?;

        Ok(())
    }

    /// Record a decided request
    pub fn record_decision(&self, method: &str, outcome: &Outcome, duration: f64) {
        if !self.config.enabled {
            return;
        }

        histogram!("redirect_decision_duration_seconds").record(duration);

        match outcome {
            Outcome::Redirect { .. } => {
                counter!("redirect_requests_total", "method" => method.to_string(), "outcome" => "redirect").increment(1);
                counter!("redirects_issued_total").increment(1);
            }
            Outcome::NotFound { reason } => {
                counter!("redirect_requests_total", "method" => method.to_string(), "outcome" => "not_found").increment(1);
                counter!("not_found_total", "reason" => reason.as_str()).increment(1);
            }
        }
    }
}
