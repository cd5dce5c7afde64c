mod common;

use async_trait::async_trait;
use common::test_config;
use counter_service::models::CounterDocument;
use counter_service::services::{CounterStore, CreateOutcome, InMemoryStore};
use counter_service::startup::Application;
use mongodb::bson::Document;
use service_core::error::AppError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

/// In-memory store whose reads take a while, so a request is still in
/// flight when shutdown begins.
struct SlowStore {
    inner: InMemoryStore,
    delay: Duration,
}

#[async_trait]
impl CounterStore for SlowStore {
    async fn read(&self, id: &str, partition_key: &str) -> Result<Option<Document>, AppError> {
        tokio::time::sleep(self.delay).await;
        self.inner.read(id, partition_key).await
    }

    async fn create(&self, document: &CounterDocument) -> Result<CreateOutcome, AppError> {
        self.inner.create(document).await
    }

    async fn replace(&self, document: &CounterDocument) -> Result<(), AppError> {
        self.inner.replace(document).await
    }

    async fn ping(&self) -> Result<(), AppError> {
        self.inner.ping().await
    }
}

#[tokio::test]
async fn shutdown_lets_in_flight_increment_finish() {
    let store = Arc::new(SlowStore {
        inner: InMemoryStore::new(),
        delay: Duration::from_millis(300),
    });
    let app = Application::build_with_store(test_config(), store.clone())
        .await
        .expect("Failed to build test application");
    let address = format!("http://127.0.0.1:{}/api/counter", app.port());

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let server = tokio::spawn(app.run_until_shutdown(async move {
        shutdown_rx.await.ok();
    }));

    let request = tokio::spawn(async move { reqwest::Client::new().post(&address).send().await });

    // Let the request reach the store before signalling shutdown
    tokio::time::sleep(Duration::from_millis(100)).await;
    shutdown_tx.send(()).expect("Server stopped early");

    let response = request
        .await
        .expect("Request task panicked")
        .expect("In-flight request was cut off");
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["count"], 1);

    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("Server did not stop after shutdown")
        .expect("Server task panicked")
        .expect("Server error");

    let stored = store.inner.get_raw("1", "1").await.expect("document persisted");
    assert_eq!(stored.get_i64("count").unwrap(), 1);
}
