pub mod clock;
pub mod error;
pub mod json_store;
pub mod memory_store;
pub mod notifications;
pub mod service;
pub mod store;

pub use crate::error::ServiceError;
pub use crate::json_store::JsonDirStore;
pub use crate::memory_store::MemoryStore;
pub use crate::service::{HabitService, HabitServiceBuilder};
pub use crate::store::{HabitStore, StoreError, Subscription};
