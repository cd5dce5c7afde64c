//! Document store access for the counter document.
//!
//! [`CounterStore`] is the seam between the counter logic and persistence.
//! [`LazyMongoStore`] is the production implementation; it defers creating
//! the driver client until the first call and then reuses it.
//! [`InMemoryStore`] backs local runs and tests.

use crate::config::StoreConfig;
use crate::models::CounterDocument;
use async_trait::async_trait;
use mongodb::{
    bson::{doc, Document},
    error::{ErrorKind, WriteFailure},
    Client as MongoClient, Collection,
};
use service_core::config::require_env;
use service_core::error::AppError;
use std::collections::HashMap;
use tokio::sync::{OnceCell, RwLock};

const DUPLICATE_KEY_CODE: i32 = 11000;

/// Result of attempting to create the counter document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    /// Another writer created it first.
    AlreadyExists,
}

#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Point-read by id within a partition. `None` means not found.
    async fn read(&self, id: &str, partition_key: &str) -> Result<Option<Document>, AppError>;

    async fn create(&self, document: &CounterDocument) -> Result<CreateOutcome, AppError>;

    /// Replace the whole stored document. No version check: last write wins.
    async fn replace(&self, document: &CounterDocument) -> Result<(), AppError>;

    async fn ping(&self) -> Result<(), AppError>;
}

/// A connected MongoDB-API collection (Cosmos DB for MongoDB or plain MongoDB).
#[derive(Clone)]
pub struct MongoCounterStore {
    client: MongoClient,
    collection: Collection<Document>,
}

impl MongoCounterStore {
    pub async fn connect(uri: &str, database: &str, collection: &str) -> Result<Self, AppError> {
        tracing::info!(database = %database, collection = %collection, "Creating MongoDB client");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            // The URI carries credentials; don't log it.
            tracing::error!("Failed to create MongoDB client: {}", e);
            AppError::from(e)
        })?;
        let collection = client.database(database).collection(collection);
        Ok(Self { client, collection })
    }

    fn filter(id: &str, partition_key: &str) -> Document {
        doc! { "_id": id, "partitionKey": partition_key }
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(e)) if e.code == DUPLICATE_KEY_CODE
    )
}

#[async_trait]
impl CounterStore for MongoCounterStore {
    async fn read(&self, id: &str, partition_key: &str) -> Result<Option<Document>, AppError> {
        Ok(self
            .collection
            .find_one(Self::filter(id, partition_key), None)
            .await?)
    }

    async fn create(&self, document: &CounterDocument) -> Result<CreateOutcome, AppError> {
        match self
            .collection
            .insert_one(document.to_document(), None)
            .await
        {
            Ok(_) => Ok(CreateOutcome::Created),
            Err(e) if is_duplicate_key(&e) => Ok(CreateOutcome::AlreadyExists),
            Err(e) => Err(AppError::from(e)),
        }
    }

    async fn replace(&self, document: &CounterDocument) -> Result<(), AppError> {
        let result = self
            .collection
            .replace_one(
                Self::filter(&document.id, &document.partition_key),
                document.to_document(),
                None,
            )
            .await?;

        if result.matched_count == 0 {
            return Err(AppError::NotFound(anyhow::anyhow!(
                "counter document {} disappeared before replace",
                document.id
            )));
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), AppError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                AppError::from(e)
            })?;
        Ok(())
    }
}

/// Creates the MongoDB client on first use and keeps it for the life of the
/// store. A missing connection string fails that access without memoizing
/// anything, so a later call can still succeed once it is set.
pub struct LazyMongoStore {
    connection_string_var: String,
    database: String,
    collection: String,
    inner: OnceCell<MongoCounterStore>,
}

impl LazyMongoStore {
    pub fn new(config: &StoreConfig) -> Self {
        Self {
            connection_string_var: config.connection_string_var.clone(),
            database: config.database_name.clone(),
            collection: config.container_name.clone(),
            inner: OnceCell::new(),
        }
    }

    async fn handle(&self) -> Result<&MongoCounterStore, AppError> {
        self.inner
            .get_or_try_init(|| async {
                let uri = require_env(&self.connection_string_var).map_err(|e| {
                    tracing::error!(
                        var = %self.connection_string_var,
                        "Counter store connection string is not configured"
                    );
                    e
                })?;
                MongoCounterStore::connect(&uri, &self.database, &self.collection).await
            })
            .await
    }
}

#[async_trait]
impl CounterStore for LazyMongoStore {
    async fn read(&self, id: &str, partition_key: &str) -> Result<Option<Document>, AppError> {
        self.handle().await?.read(id, partition_key).await
    }

    async fn create(&self, document: &CounterDocument) -> Result<CreateOutcome, AppError> {
        self.handle().await?.create(document).await
    }

    async fn replace(&self, document: &CounterDocument) -> Result<(), AppError> {
        self.handle().await?.replace(document).await
    }

    async fn ping(&self) -> Result<(), AppError> {
        self.handle().await?.ping().await
    }
}

/// Process-local store keyed by `(partition_key, id)`.
#[derive(Default)]
pub struct InMemoryStore {
    documents: RwLock<HashMap<(String, String), Document>>,
    failure: RwLock<Option<String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a raw record in place, bypassing normalization.
    pub async fn insert_raw(&self, document: Document) {
        let id = document.get_str("_id").unwrap_or_default().to_string();
        let partition_key = document
            .get_str("partitionKey")
            .unwrap_or_default()
            .to_string();
        self.documents
            .write()
            .await
            .insert((partition_key, id), document);
    }

    pub async fn get_raw(&self, id: &str, partition_key: &str) -> Option<Document> {
        self.documents
            .read()
            .await
            .get(&(partition_key.to_string(), id.to_string()))
            .cloned()
    }

    /// Make every subsequent operation fail with `message`; `None` heals it.
    pub async fn set_failure(&self, message: Option<&str>) {
        *self.failure.write().await = message.map(str::to_string);
    }

    async fn check(&self) -> Result<(), AppError> {
        match self.failure.read().await.as_deref() {
            Some(msg) => Err(AppError::DatabaseError(anyhow::anyhow!(msg.to_string()))),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl CounterStore for InMemoryStore {
    async fn read(&self, id: &str, partition_key: &str) -> Result<Option<Document>, AppError> {
        self.check().await?;
        Ok(self.get_raw(id, partition_key).await)
    }

    async fn create(&self, document: &CounterDocument) -> Result<CreateOutcome, AppError> {
        self.check().await?;
        let key = (document.partition_key.clone(), document.id.clone());
        let mut documents = self.documents.write().await;
        if documents.contains_key(&key) {
            return Ok(CreateOutcome::AlreadyExists);
        }
        documents.insert(key, document.to_document());
        Ok(CreateOutcome::Created)
    }

    async fn replace(&self, document: &CounterDocument) -> Result<(), AppError> {
        self.check().await?;
        let key = (document.partition_key.clone(), document.id.clone());
        let mut documents = self.documents.write().await;
        match documents.get_mut(&key) {
            Some(stored) => {
                *stored = document.to_document();
                Ok(())
            }
            None => Err(AppError::NotFound(anyhow::anyhow!(
                "counter document {} disappeared before replace",
                document.id
            ))),
        }
    }

    async fn ping(&self) -> Result<(), AppError> {
        self.check().await
    }
}
