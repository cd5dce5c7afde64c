//! service-core: Shared infrastructure for the counter service.

pub mod config;
pub mod error;
pub mod middleware;
pub mod observability;
