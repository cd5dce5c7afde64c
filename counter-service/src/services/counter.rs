use crate::config::StoreConfig;
use crate::models::CounterDocument;
use crate::services::metrics::{record_document_created, record_operation};
use crate::services::store::{CounterStore, CreateOutcome};
use service_core::error::AppError;
use std::sync::Arc;
use tracing::instrument;

/// Read and increment the shared visitor counter.
///
/// Increment is a plain read-modify-write followed by a whole-document
/// replace. Concurrent increments can overwrite each other.
#[derive(Clone)]
pub struct CounterService {
    store: Arc<dyn CounterStore>,
    counter_id: String,
    partition_key: String,
}

impl CounterService {
    pub fn new(store: Arc<dyn CounterStore>, config: &StoreConfig) -> Self {
        Self {
            store,
            counter_id: config.counter_id.clone(),
            partition_key: config.partition_key.clone(),
        }
    }

    /// Current count. Creates the document at zero if it does not exist yet.
    #[instrument(skip(self), fields(counter_id = %self.counter_id))]
    pub async fn get(&self) -> Result<i64, AppError> {
        let result = self.ensure_document().await.map(|d| d.count);
        record_operation("get", result.is_ok());
        result
    }

    /// Add one and persist, returning the new count.
    #[instrument(skip(self), fields(counter_id = %self.counter_id))]
    pub async fn increment(&self) -> Result<i64, AppError> {
        let result = self.increment_inner().await;
        record_operation("increment", result.is_ok());
        result
    }

    async fn increment_inner(&self) -> Result<i64, AppError> {
        let mut document = self.ensure_document().await?;
        let count = document.increment()?;
        self.store.replace(&document).await?;
        tracing::debug!(count, "Counter incremented");
        Ok(count)
    }

    pub async fn ping(&self) -> Result<(), AppError> {
        self.store.ping().await
    }

    /// Load the counter document, creating it with `count = 0` when absent.
    async fn ensure_document(&self) -> Result<CounterDocument, AppError> {
        if let Some(raw) = self.read().await? {
            return Ok(raw);
        }

        let document = CounterDocument::new(&self.counter_id, &self.partition_key);
        match self.store.create(&document).await? {
            CreateOutcome::Created => {
                tracing::info!(
                    counter_id = %self.counter_id,
                    partition_key = %self.partition_key,
                    "Created counter document"
                );
                record_document_created();
                Ok(document)
            }
            CreateOutcome::AlreadyExists => {
                tracing::debug!("Counter document created concurrently; re-reading");
                self.read().await?.ok_or_else(|| {
                    AppError::DatabaseError(anyhow::anyhow!(
                        "counter document {} reported as existing but could not be read",
                        self.counter_id
                    ))
                })
            }
        }
    }

    async fn read(&self) -> Result<Option<CounterDocument>, AppError> {
        let raw = self.store.read(&self.counter_id, &self.partition_key).await?;
        Ok(raw.map(|raw| CounterDocument::from_stored(&raw, &self.counter_id, &self.partition_key)))
    }
}
