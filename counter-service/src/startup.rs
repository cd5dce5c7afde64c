use crate::config::{CounterConfig, StoreBackend};
use crate::handlers;
use crate::middleware::cors_headers_middleware;
use crate::services::{CounterService, CounterStore, InMemoryStore, LazyMongoStore};
use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{metrics::metrics_middleware, tracing::request_id_middleware};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: CounterConfig,
    pub counter: CounterService,
}

impl AppState {
    pub fn new(config: CounterConfig, store: Arc<dyn CounterStore>) -> Self {
        let counter = CounterService::new(store, &config.store);
        Self { config, counter }
    }
}

/// The store selected by configuration. Nothing connects here; the MongoDB
/// client is created on first use.
pub fn build_store(config: &CounterConfig) -> Arc<dyn CounterStore> {
    match config.store.backend {
        StoreBackend::Mongodb => Arc::new(LazyMongoStore::new(&config.store)),
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory counter store; counts are lost on restart");
            Arc::new(InMemoryStore::new())
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let counter_routes = Router::new()
        .route(
            "/api/counter",
            get(handlers::get_counter)
                .post(handlers::increment_counter)
                .options(handlers::preflight),
        )
        .route(
            "/api/counter/increment",
            post(handlers::increment_counter).options(handlers::preflight),
        )
        .layer(from_fn(cors_headers_middleware));

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .merge(counter_routes)
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    pub async fn build(config: CounterConfig) -> Result<Self, AppError> {
        let store = build_store(&config);
        Self::build_with_store(config, store).await
    }

    pub async fn build_with_store(
        config: CounterConfig,
        store: Arc<dyn CounterStore>,
    ) -> Result<Self, AppError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let router = build_router(AppState::new(config, store));

        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Listening on {}", port);

        Ok(Self {
            port,
            listener,
            router,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router).await
    }

    /// Serve until `signal` resolves, then stop accepting connections and
    /// let in-flight requests finish before returning.
    pub async fn run_until_shutdown<F>(self, signal: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(signal)
            .await
    }
}
