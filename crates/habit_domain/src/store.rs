use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use habit_core::{Habit, HabitId, HabitPatch};
use notify::RecommendedWatcher;
use parking_lot::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("i/o error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed habit record {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Walk(#[from] walkdir::Error),
    #[error("habit `{0}` not found")]
    NotFound(HabitId),
    #[error("unable to watch {}: {source}", path.display())]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
}

/// Change callback; carries no payload, receivers are expected to refetch.
pub type OnChange = Arc<dyn Fn() + Send + Sync>;

/// Keeps a change subscription alive. Dropping it unsubscribes.
pub struct Subscription {
    watcher: Option<Mutex<RecommendedWatcher>>,
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn watching(watcher: RecommendedWatcher) -> Self {
        Self {
            watcher: Some(Mutex::new(watcher)),
            cancel: None,
        }
    }

    pub fn on_drop(cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            watcher: None,
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("watching", &self.watcher.is_some())
            .finish()
    }
}

/// Persistence collaborator for habit records.
///
/// Implementations translate [`HabitPatch`] into whatever partial-update
/// mechanism the backend offers.
pub trait HabitStore: Send + Sync {
    fn query_habits(&self, owner: &str) -> Result<Vec<Habit>, StoreError>;
    fn create_habit(&self, habit: Habit) -> Result<HabitId, StoreError>;
    fn update_habit(&self, id: &HabitId, patch: &HabitPatch) -> Result<(), StoreError>;
    fn delete_habit(&self, id: &HabitId) -> Result<(), StoreError>;
    fn subscribe(&self, owner: &str, on_change: OnChange) -> Result<Subscription, StoreError>;
}
