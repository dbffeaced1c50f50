//! Echo server setup.
//!
//! # Responsibilities
//! - Create the Axum router with the `/echo/{eid}` handler
//! - Wire up middleware (request ID, tracing, timeout)
//! - Serve plain HTTP on a listener, or HTTPS via rustls
//! - Stop gracefully when the shutdown coordinator fires

use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, Request},
    response::Response,
    routing::get,
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::authority::QuotaAuthority;
use crate::config::{QuotaGateConfig, ServerConfig};
use crate::http::request::{request_id_of, UuidRequestId};
use crate::http::response::quota_response;
use crate::identity::AUTHORIZATION;
use crate::net::tls::load_tls_config;

/// Errors that stop the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("invalid bind address {0}")]
    Address(String),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub authority: QuotaAuthority,
}

/// HTTP server answering echo requests with quota headers.
pub struct EchoServer {
    router: Router,
    config: ServerConfig,
}

impl EchoServer {
    pub fn new(config: ServerConfig, authority: QuotaAuthority) -> Self {
        let state = AppState { authority };
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    pub fn from_config(config: &QuotaGateConfig) -> Self {
        Self::new(
            config.server.clone(),
            QuotaAuthority::from_config(&config.authority),
        )
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServerConfig, state: AppState) -> Router {
        Router::new()
            .route("/echo/{eid}", get(echo_handler))
            .route("/echo/", get(echo_empty_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        path = %request.uri().path(),
                        request_id = %request_id_of(request),
                    )
                }),
            )
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
    }

    /// The router, for serving it elsewhere or driving it in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Serve plain HTTP on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Echo server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Echo server received shutdown signal");
            })
            .await?;

        tracing::info!("Echo server stopped");
        Ok(())
    }

    /// Serve HTTPS with the configured certificate until `shutdown` fires.
    pub async fn run_tls(
        self,
        tls: RustlsConfig,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr: SocketAddr = self
            .config
            .bind_address
            .parse()
            .map_err(|_| ServerError::Address(self.config.bind_address.clone()))?;

        let handle = axum_server::Handle::new();
        let shutdown_handle = handle.clone();
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            tracing::info!("Echo server received shutdown signal");
            shutdown_handle.graceful_shutdown(Some(Duration::from_secs(5)));
        });

        tracing::info!(address = %addr, "Echo server starting (TLS)");
        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(self.router.into_make_service())
            .await?;

        tracing::info!("Echo server stopped");
        Ok(())
    }

    /// Bind the configured address and serve, with TLS when configured.
    pub async fn serve(self, shutdown: broadcast::Receiver<()>) -> Result<(), ServerError> {
        match self.config.tls.clone() {
            Some(tls) => {
                let rustls = load_tls_config(&tls).await?;
                self.run_tls(rustls, shutdown).await
            }
            None => {
                let listener = TcpListener::bind(&self.config.bind_address).await?;
                self.run(listener, shutdown).await
            }
        }
    }
}

/// Answer an echo request: identify the caller and report its quota.
async fn echo_handler(
    State(state): State<AppState>,
    Path(eid): Path<String>,
    headers: HeaderMap,
) -> Response {
    echo(&state, &eid, &headers)
}

/// `/echo/` is what an empty route parameter encodes to.
async fn echo_empty_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    echo(&state, "", &headers)
}

fn echo(state: &AppState, eid: &str, headers: &HeaderMap) -> Response {
    let authorization = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    let decision = state.authority.evaluate(authorization);

    let body = format!("Hello World {} {:?} {}", eid, headers, decision.principal);
    quota_response(&decision, body)
}
