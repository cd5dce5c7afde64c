pub mod counter;

pub use counter::{normalize_count, CounterDocument};
