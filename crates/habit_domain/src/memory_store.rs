use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use habit_core::{Habit, HabitId, HabitPatch};
use parking_lot::{Mutex, RwLock};

use crate::store::{HabitStore, OnChange, StoreError, Subscription};

struct Subscriber {
    id: u64,
    owner: String,
    on_change: OnChange,
}

/// In-process store. Subscribers are notified synchronously after each write.
#[derive(Default)]
pub struct MemoryStore {
    habits: RwLock<Vec<Habit>>,
    subscribers: Arc<Mutex<Vec<Subscriber>>>,
    next_habit: AtomicU64,
    next_subscriber: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.habits.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.habits.read().is_empty()
    }

    fn notify(&self, owner: &str) {
        let callbacks: Vec<OnChange> = self
            .subscribers
            .lock()
            .iter()
            .filter(|sub| sub.owner == owner)
            .map(|sub| sub.on_change.clone())
            .collect();
        for callback in callbacks {
            callback();
        }
    }
}

impl HabitStore for MemoryStore {
    fn query_habits(&self, owner: &str) -> Result<Vec<Habit>, StoreError> {
        Ok(self
            .habits
            .read()
            .iter()
            .filter(|habit| habit.owner == owner)
            .cloned()
            .collect())
    }

    fn create_habit(&self, mut habit: Habit) -> Result<HabitId, StoreError> {
        let seq = self.next_habit.fetch_add(1, Ordering::Relaxed) + 1;
        let id = HabitId::new(format!("habit-{seq}"));
        habit.id = id.clone();
        let owner = habit.owner.clone();
        self.habits.write().push(habit);
        self.notify(&owner);
        Ok(id)
    }

    fn update_habit(&self, id: &HabitId, patch: &HabitPatch) -> Result<(), StoreError> {
        let owner = {
            let mut habits = self.habits.write();
            let habit = habits
                .iter_mut()
                .find(|habit| &habit.id == id)
                .ok_or_else(|| StoreError::NotFound(id.clone()))?;
            patch.apply(habit);
            habit.owner.clone()
        };
        self.notify(&owner);
        Ok(())
    }

    fn delete_habit(&self, id: &HabitId) -> Result<(), StoreError> {
        let owner = {
            let mut habits = self.habits.write();
            let idx = habits
                .iter()
                .position(|habit| &habit.id == id)
                .ok_or_else(|| StoreError::NotFound(id.clone()))?;
            habits.remove(idx).owner
        };
        self.notify(&owner);
        Ok(())
    }

    fn subscribe(&self, owner: &str, on_change: OnChange) -> Result<Subscription, StoreError> {
        let id = self.next_subscriber.fetch_add(1, Ordering::Relaxed);
        self.subscribers.lock().push(Subscriber {
            id,
            owner: owner.to_string(),
            on_change,
        });
        let subscribers = Arc::downgrade(&self.subscribers);
        Ok(Subscription::on_drop(move || {
            if let Some(subscribers) = subscribers.upgrade() {
                subscribers.lock().retain(|sub| sub.id != id);
            }
        }))
    }
}
