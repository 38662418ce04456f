use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{error, info};

use crate::config::Config;
use crate::error::{RedirectError, Result as RedirectResult};
use crate::observability::{AccessLogger, MetricsCollector};
use crate::page::{HtmlNotFoundRenderer, NotFoundContext, NotFoundRenderer};
use crate::rewrite::{Outcome, RewriteEngine};

/// HTTP front end for the rewrite engine.
///
/// Every request lands in the fallback handler; there is no routing table.
/// The handler re-validates the versioned-path shape itself, so it behaves
/// correctly even when the upstream rewrite layer forwards ordinary traffic.
pub struct RedirectServer {
    config: Arc<Config>,
    engine: Arc<RewriteEngine>,
    renderer: Arc<dyn NotFoundRenderer>,
    metrics: Arc<MetricsCollector>,
    logger: Arc<AccessLogger>,
}

#[derive(Clone)]
struct AppState {
    server: Arc<RedirectServer>,
}

impl RedirectServer {
    pub fn new(
        config: Config,
        metrics: Arc<MetricsCollector>,
        logger: Arc<AccessLogger>,
    ) -> anyhow::Result<Self> {
        let engine = RewriteEngine::new(&config.redirect)?;
        Ok(Self::with_engine(config, engine, metrics, logger))
    }

    /// Construct with a pre-built engine. Tests use this with a canned probe.
    pub fn with_engine(
        config: Config,
        engine: RewriteEngine,
        metrics: Arc<MetricsCollector>,
        logger: Arc<AccessLogger>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            engine: Arc::new(engine),
            renderer: Arc::new(HtmlNotFoundRenderer),
            metrics,
            logger,
        }
    }

    /// Build the router with the middleware stack.
    pub fn router(self: &Arc<Self>) -> Router {
        Router::new()
            .fallback(handle_request)
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(TimeoutLayer::new(self.config.server.request_timeout))
                    .into_inner(),
            )
            .with_state(AppState {
                server: self.clone(),
            })
    }

    /// Start the redirect server
    pub async fn start(self: Arc<Self>) -> RedirectResult<()> {
        let addr = format!("{}:{}", self.config.server.host, self.config.server.port);
        let app = self.router();

        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| RedirectError::Internal(format!("Failed to bind to {}: {}", addr, e)))?;

        info!("Redirect server listening on {}", addr);

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .map_err(|e| RedirectError::Internal(format!("Server error: {}", e)))?;

        Ok(())
    }

    /// Decide and answer a single request.
    async fn handle(&self, req: Request) -> Response {
        let start = Instant::now();
        let method = req.method().to_string();
        let uri = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/")
            .to_string();
        let client_ip = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|info| info.0.ip())
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

        let outcome = self.engine.decide(&uri);
        let duration = start.elapsed();

        self.metrics
            .record_decision(&method, &outcome, duration.as_secs_f64());

        let (status, outcome_label, location, response) = match &outcome {
            Outcome::Redirect { location } => {
                let response =
                    (StatusCode::FOUND, [(header::LOCATION, location.clone())]).into_response();
                (StatusCode::FOUND, "redirect", Some(location.as_str()), response)
            }
            Outcome::NotFound { reason } => {
                let full_url = self.offending_url(req.headers(), &uri);
                let body = self.renderer.render(&NotFoundContext {
                    full_url: &full_url,
                    contact_email: &self.config.redirect.contact_email,
                    home_url: &self.config.redirect.home_url,
                });
                let response = (StatusCode::NOT_FOUND, Html(body)).into_response();
                (StatusCode::NOT_FOUND, reason.as_str(), None, response)
            }
        };

        if let Err(e) = self
            .logger
            .log_request(
                &method,
                &uri,
                status.as_u16(),
                duration,
                &client_ip,
                outcome_label,
                location,
            )
            .await
        {
            error!("Failed to write access log entry: {}", e);
        }

        response
    }

    /// Full offending URL shown on the not-found page.
    fn offending_url(&self, headers: &HeaderMap, uri: &str) -> String {
        let scheme = detect_scheme(headers, self.config.server.tls_terminated);
        let host = headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(&self.config.server.host);
        format!("{}://{}{}", scheme, host, uri)
    }
}

async fn handle_request(State(state): State<AppState>, req: Request) -> Response {
    state.server.handle(req).await
}

/// Scheme of the original request: forwarded header, TLS termination flag,
/// or the conventional https port on the Host header.
fn detect_scheme(headers: &HeaderMap, tls_terminated: bool) -> &'static str {
    if tls_terminated {
        return "https";
    }

    if let Some(proto) = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
    {
        if proto.eq_ignore_ascii_case("https") {
            return "https";
        }
    }

    if let Some(host) = headers.get(header::HOST).and_then(|v| v.to_str().ok()) {
        if host.ends_with(":443") {
            return "https";
        }
    }

    "http"
}
