use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRef},
    routing::{delete, get, post},
};
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use wimo_auth::{AuthState, Authenticator};
use wimo_db_postgres::PostgresStore;
use wimo_storage::{DynDocumentStore, Persistence, StorageError};

use crate::{
    bootstrap,
    config::{AppConfig, StorageBackend, StorageConfig},
    handlers,
};

/// Shared state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub persistence: Persistence,
    pub authenticator: Authenticator,
}

impl AppState {
    pub fn new(persistence: Persistence) -> Self {
        Self {
            authenticator: Authenticator::new(persistence.clone()),
            persistence,
        }
    }
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        AuthState::new(state.authenticator.clone())
    }
}

/// Opens the document store selected by `storage.backend`.
///
/// # Errors
///
/// Returns an error if the postgres settings cannot be turned into a pool.
pub async fn create_store(cfg: &StorageConfig) -> Result<DynDocumentStore, StorageError> {
    match cfg.backend {
        StorageBackend::Memory => Ok(wimo_db_memory::create_store()),
        StorageBackend::Postgres => {
            let pg = cfg.postgres.clone().unwrap_or_default().to_backend_config();
            let store = PostgresStore::new(&pg).await?;
            Ok(Arc::new(store))
        }
    }
}

/// Builds the persistence facade with the configured timeout and retry.
pub async fn create_persistence(cfg: &StorageConfig) -> Result<Persistence, StorageError> {
    let store = create_store(cfg).await?;
    let persistence = Persistence::with_policy(store, cfg.call_policy());
    tracing::info!(
        backend = persistence.backend_name(),
        timeout_ms = cfg.timeout_ms,
        max_attempts = cfg.retry.max_attempts,
        "Persistence initialized"
    );
    Ok(persistence)
}

pub fn build_app(state: AppState, cfg: &AppConfig) -> Router {
    let body_limit = cfg.server.body_limit_bytes;
    Router::new()
        // Health endpoints
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        // Token check
        .route("/", get(handlers::index))
        // User routes
        .route("/user/auth/", get(handlers::user_auth))
        .route("/user/save/", post(handlers::user_save))
        .route("/user/load/{username}/", get(handlers::user_load))
        .route("/user/list/", get(handlers::user_list))
        .route("/user/delete/{id}/", delete(handlers::user_delete))
        .fallback(handlers::not_found)
        .with_state(state)
        // Middleware stack (order: cors -> timeout -> trace -> body limit)
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::new(cfg.request_timeout()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri().path(),
                        http.status_code = Empty,
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(DefaultBodyLimit::max(body_limit))
}

pub struct WimoServer {
    addr: SocketAddr,
    app: Router,
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    /// Opens the backend, seeds bootstrap records and assembles the router.
    pub async fn build(self) -> anyhow::Result<WimoServer> {
        let persistence = create_persistence(&self.config.storage).await?;
        let state = AppState::new(persistence);

        let stats = bootstrap::seed(&state.authenticator, &self.config.bootstrap).await?;
        tracing::debug!(users = stats.users, tokens = stats.tokens, "Bootstrap finished");

        let app = build_app(state, &self.config);
        Ok(WimoServer {
            addr: self.addr,
            app,
        })
    }
}

impl WimoServer {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    // Wait for Ctrl+C
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
