//! `CounterConfig::load` against real environment variables.
//!
//! Kept in its own test binary and in a single test so no other test
//! observes the mutated environment.

use counter_service::config::{CounterConfig, StoreBackend, DEFAULT_CONNECTION_STRING_VAR};
use service_core::error::AppError;

const VARS: [&str; 5] = [
    "COSMOSDB_DATABASE_NAME",
    "COSMOSDB_CONTAINER_NAME",
    "COSMOSDB_PARTITION_KEY_VALUE",
    "COSMOSDB_COUNTER_ID",
    "COUNTER_STORE_BACKEND",
];

#[test]
fn load_reads_store_settings_from_environment() {
    std::env::set_var("COSMOSDB_DATABASE_NAME", "SiteStats");
    std::env::set_var("COSMOSDB_CONTAINER_NAME", "Visits");
    std::env::set_var("COSMOSDB_PARTITION_KEY_VALUE", "home");
    std::env::set_var("COSMOSDB_COUNTER_ID", "landing");
    std::env::set_var("COUNTER_STORE_BACKEND", "Memory");

    let config = CounterConfig::load().expect("Failed to load configuration");
    assert_eq!(config.store.database_name, "SiteStats");
    assert_eq!(config.store.container_name, "Visits");
    assert_eq!(config.store.partition_key, "home");
    assert_eq!(config.store.counter_id, "landing");
    assert_eq!(config.store.backend, StoreBackend::Memory);
    assert_eq!(
        config.store.connection_string_var,
        DEFAULT_CONNECTION_STRING_VAR
    );

    std::env::set_var("COUNTER_STORE_BACKEND", "redis");
    let err = CounterConfig::load().unwrap_err();
    assert!(matches!(err, AppError::ConfigError(_)));
    assert!(err.detail().contains("redis"));

    for var in VARS {
        std::env::remove_var(var);
    }

    let config = CounterConfig::load().expect("Failed to load configuration");
    assert_eq!(config.store.database_name, "VisitorCounterDb");
    assert_eq!(config.store.container_name, "Counters");
    assert_eq!(config.store.backend, StoreBackend::Mongodb);
}
