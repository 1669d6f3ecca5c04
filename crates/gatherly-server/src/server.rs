use std::net::SocketAddr;

use axum::{
    Router, middleware,
    routing::{delete, get, post},
};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use gatherly_storage::{DynRegistryStore, RegistryStore};

use crate::{
    config::{AppConfig, StorageBackend},
    handlers,
    handlers::{events, registrations, users},
    middleware as app_middleware,
    state::AppState,
};

pub struct GatherlyServer {
    addr: SocketAddr,
    app: Router,
}

pub fn build_app(cfg: &AppConfig, state: AppState) -> Router {
    let body_limit = cfg.server.body_limit_bytes;
    Router::new()
        // Health and info endpoints
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        // Users
        .route("/users", post(users::create_user))
        .route("/users/{user_id}", get(users::get_user))
        .route(
            "/users/{user_id}/registrations",
            get(registrations::list_user_registrations),
        )
        // Events
        .route(
            "/events",
            get(events::list_events).post(events::create_event),
        )
        .route(
            "/events/{event_id}",
            get(events::get_event)
                .put(events::update_event)
                .delete(events::delete_event),
        )
        // Registrations
        .route(
            "/events/{event_id}/registrations",
            get(registrations::list_event_registrations).post(registrations::register),
        )
        .route(
            "/events/{event_id}/registrations/{user_id}",
            delete(registrations::unregister),
        )
        // Middleware stack (order: request id -> content negotiation -> compression/cors/trace -> body limit)
        .layer(middleware::from_fn(app_middleware::request_id))
        .layer(middleware::from_fn(app_middleware::content_negotiation))
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    let req_id = req
                        .headers()
                        .get("x-request-id")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("")
                        .to_string();
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri(),
                        http.status_code = Empty,
                        request_id = %req_id
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
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

async fn build_store(cfg: &AppConfig) -> anyhow::Result<DynRegistryStore> {
    match cfg.storage.backend {
        StorageBackend::Memory => Ok(gatherly_db_memory::create_registry_store()),
        StorageBackend::Postgres => {
            let settings = cfg
                .storage
                .postgres
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("storage.postgres config is required"))?;

            let mut pg = gatherly_db_postgres::PostgresConfig::new(settings.connection_url());
            pg.pool_size = settings.pool_size;
            pg.connect_timeout_ms = settings.connect_timeout_ms;
            pg.idle_timeout_ms = settings.idle_timeout_ms;

            Ok(gatherly_db_postgres::create_registry_store(&pg).await?)
        }
    }
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
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

    pub async fn build(self) -> anyhow::Result<GatherlyServer> {
        let store = build_store(&self.config).await?;
        tracing::info!(backend = store.backend_name(), "storage backend ready");

        let state = AppState::new(store);
        let app = build_app(&self.config, state);

        Ok(GatherlyServer {
            addr: self.addr,
            app,
        })
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GatherlyServer {
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
