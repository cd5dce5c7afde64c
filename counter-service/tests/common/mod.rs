//! Common test utilities for counter-service integration tests.
#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use counter_service::config::{CounterConfig, StoreBackend, StoreConfig};
use counter_service::services::InMemoryStore;
use counter_service::startup::{build_router, AppState, Application};
use service_core::config::Config as CommonConfig;
use std::sync::Arc;

pub fn test_config() -> CounterConfig {
    CounterConfig {
        common: CommonConfig { port: 0 },
        service_name: "counter-service-test".to_string(),
        log_level: "debug".to_string(),
        otlp_endpoint: None,
        store: StoreConfig {
            backend: StoreBackend::Memory,
            ..StoreConfig::default()
        },
    }
}

/// Router over the given in-memory store, for `oneshot` tests.
pub fn router_with(store: Arc<InMemoryStore>) -> Router {
    build_router(AppState::new(test_config(), store))
}

/// Router backed by MongoDB whose connection string variable is never set.
pub fn unconfigured_router() -> Router {
    let mut config = test_config();
    config.store = StoreConfig {
        backend: StoreBackend::Mongodb,
        connection_string_var: "COUNTER_SERVICE_TEST_NEVER_SET_CONNECTION".to_string(),
        ..StoreConfig::default()
    };
    let store = counter_service::startup::build_store(&config);
    build_router(AppState::new(config, store))
}

pub fn request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body")
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).expect("Failed to parse JSON")
}

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub store: Arc<InMemoryStore>,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let app = Application::build_with_store(test_config(), store.clone())
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server to accept connections
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            store,
        }
    }
}
