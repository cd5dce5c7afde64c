pub mod counter;
pub mod metrics;
pub mod store;

pub use counter::CounterService;
pub use store::{CounterStore, CreateOutcome, InMemoryStore, LazyMongoStore, MongoCounterStore};
