pub mod counter;
pub mod health;

pub use counter::{get_counter, increment_counter, preflight};
pub use health::{health_check, metrics_endpoint, readiness_check};
