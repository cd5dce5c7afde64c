use service_core::config::{self as core_config, env_or};
use service_core::error::AppError;
use std::env;

pub const DEFAULT_CONNECTION_STRING_VAR: &str = "COSMOSDB_CONNECTION_STRING";

#[derive(Debug, Clone)]
pub struct CounterConfig {
    pub common: core_config::Config,
    pub service_name: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub store: StoreConfig,
}

/// Where the counter document lives.
///
/// The connection string itself is not held here: only the name of the
/// variable it is read from, at first store access.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub database_name: String,
    pub container_name: String,
    pub partition_key: String,
    pub counter_id: String,
    pub connection_string_var: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Mongodb,
    Memory,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Mongodb,
            database_name: "VisitorCounterDb".to_string(),
            container_name: "Counters".to_string(),
            partition_key: "1".to_string(),
            counter_id: "1".to_string(),
            connection_string_var: DEFAULT_CONNECTION_STRING_VAR.to_string(),
        }
    }
}

impl CounterConfig {
    pub fn load() -> Result<Self, AppError> {
        // Load common config (handles .env and APP__ prefix)
        let common = core_config::Config::load()?;
        let defaults = StoreConfig::default();

        Ok(CounterConfig {
            common,
            service_name: env_or("SERVICE_NAME", "counter-service"),
            log_level: env_or("LOG_LEVEL", "info"),
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
            store: StoreConfig {
                backend: env_or("COUNTER_STORE_BACKEND", "mongodb")
                    .parse()
                    .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?,
                database_name: env_or("COSMOSDB_DATABASE_NAME", &defaults.database_name),
                container_name: env_or("COSMOSDB_CONTAINER_NAME", &defaults.container_name),
                partition_key: env_or("COSMOSDB_PARTITION_KEY_VALUE", &defaults.partition_key),
                counter_id: env_or("COSMOSDB_COUNTER_ID", &defaults.counter_id),
                connection_string_var: defaults.connection_string_var,
            },
        })
    }
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mongodb" | "cosmosdb" => Ok(StoreBackend::Mongodb),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(format!("Invalid counter store backend: {}", s)),
        }
    }
}
