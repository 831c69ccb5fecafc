use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use habit_core::{
    filter, ledger, stats, streak, FilterCriteria, Habit, HabitDraft, HabitId, HabitStats,
    Overview,
};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

use crate::{
    clock::{Clock, DayTicker, SystemClock},
    error::{Result, ServiceError},
    notifications::ChangeListener,
    store::{HabitStore, Subscription},
};

pub const DEFAULT_OWNER: &str = "local";

/// Owner-scoped view over a [`HabitStore`].
///
/// Holds the last fetched collection. Writes are planned from a fresh fetch and
/// every successful write is followed by another; a failed write leaves the
/// cached collection as the pre-write fetch saw it.
pub struct HabitService {
    owner: String,
    store: Arc<dyn HabitStore>,
    clock: Arc<dyn Clock>,
    habits: RwLock<Vec<Habit>>,
    in_flight: Mutex<HashSet<HabitId>>,
    stale: Arc<AtomicBool>,
    listener: Option<Arc<dyn ChangeListener>>,
    subscription: Option<Subscription>,
}

pub struct HabitServiceBuilder {
    owner: String,
    store: Arc<dyn HabitStore>,
    clock: Arc<dyn Clock>,
    listener: Option<Arc<dyn ChangeListener>>,
}

impl HabitServiceBuilder {
    pub fn new(store: Arc<dyn HabitStore>) -> Self {
        Self {
            owner: DEFAULT_OWNER.to_string(),
            store,
            clock: Arc::new(SystemClock),
            listener: None,
        }
    }

    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = owner.into();
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_change_listener(mut self, listener: Arc<dyn ChangeListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn build(self) -> Result<HabitService> {
        let service = HabitService {
            owner: self.owner,
            store: self.store,
            clock: self.clock,
            habits: RwLock::new(Vec::new()),
            in_flight: Mutex::new(HashSet::new()),
            stale: Arc::new(AtomicBool::new(false)),
            listener: self.listener,
            subscription: None,
        };
        service.refresh()?;
        Ok(service)
    }
}

/// Marks a habit as having a write in flight until dropped.
struct WriteGuard<'a> {
    in_flight: &'a Mutex<HashSet<HabitId>>,
    id: HabitId,
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.lock().remove(&self.id);
    }
}

impl HabitService {
    pub fn builder(store: Arc<dyn HabitStore>) -> HabitServiceBuilder {
        HabitServiceBuilder::new(store)
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn habits(&self) -> Vec<Habit> {
        self.habits.read().clone()
    }

    pub fn habit(&self, id: &HabitId) -> Result<Habit> {
        self.habits
            .read()
            .iter()
            .find(|habit| &habit.id == id)
            .cloned()
            .ok_or_else(|| ServiceError::UnknownHabit(id.clone()))
    }

    /// Replaces the cached collection with a fresh fetch from storage.
    pub fn refresh(&self) -> Result<()> {
        let fetched = self.store.query_habits(&self.owner)?;
        debug!(owner = %self.owner, count = fetched.len(), "habits refetched");
        *self.habits.write() = fetched;
        self.stale.store(false, Ordering::SeqCst);
        Ok(())
    }

    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::SeqCst)
    }

    /// Refetches only when a change notification arrived since the last fetch.
    pub fn refresh_if_stale(&self) -> Result<bool> {
        if !self.is_stale() {
            return Ok(false);
        }
        self.refresh()?;
        Ok(true)
    }

    #[instrument(skip(self, draft), fields(owner = %self.owner))]
    pub fn create_habit(&self, draft: HabitDraft) -> Result<HabitId> {
        let habit = draft.into_habit(&self.owner, self.clock.today(), self.clock.now())?;
        let id = self.store.create_habit(habit)?;
        info!(%id, "habit created");
        self.refresh()?;
        Ok(id)
    }

    #[instrument(skip(self, draft))]
    pub fn edit_habit(&self, id: &HabitId, draft: HabitDraft) -> Result<()> {
        let patch = draft.into_patch(self.clock.now())?;
        let _guard = self.begin_write(id)?;
        self.persisted(id)?;
        self.store.update_habit(id, &patch)?;
        self.refresh()
    }

    #[instrument(skip(self))]
    pub fn delete_habit(&self, id: &HabitId) -> Result<()> {
        let _guard = self.begin_write(id)?;
        self.store.delete_habit(id)?;
        info!(%id, "habit deleted");
        self.refresh()
    }

    /// Flips today's completion and persists the streak bookkeeping.
    #[instrument(skip(self))]
    pub fn toggle_today(&self, id: &HabitId) -> Result<Habit> {
        let _guard = self.begin_write(id)?;
        let habit = self.persisted(id)?;
        let outcome = streak::plan_toggle(&habit, self.clock.today(), self.clock.now())?;
        if let Err(err) = self.store.update_habit(id, &outcome.to_patch()) {
            warn!(%id, %err, "toggle not persisted");
            return Err(err.into());
        }
        info!(
            %id,
            completed = outcome.completion.completed,
            current_streak = outcome.streak.current_streak,
            "habit toggled"
        );
        self.refresh()?;
        self.habit(id)
    }

    /// Sets a single day's entry without touching the streak counters.
    #[instrument(skip(self))]
    pub fn set_completion_day(&self, id: &HabitId, date: NaiveDate, completed: bool) -> Result<()> {
        let _guard = self.begin_write(id)?;
        self.persisted(id)?;
        let update = ledger::set_day(date, completed, self.clock.now());
        self.store.update_habit(id, &update.to_patch())?;
        self.refresh()
    }

    pub fn stats(&self, id: &HabitId) -> Result<HabitStats> {
        Ok(stats::compute_stats(&self.habit(id)?))
    }

    pub fn overview(&self) -> Overview {
        stats::compute_overview(&self.habits.read(), self.clock.today())
    }

    pub fn category_breakdown(&self) -> Vec<stats::CategorySummary> {
        stats::category_breakdown(&self.habits.read(), self.clock.today())
    }

    pub fn filtered(&self, criteria: &FilterCriteria) -> Vec<Habit> {
        filter::filter_habits(&self.habits.read(), criteria)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn category_options(&self) -> Vec<String> {
        filter::category_options(&self.habits.read())
    }

    /// Subscribes to storage changes. Notifications only mark the cache stale.
    pub fn watch(&mut self) -> Result<()> {
        if self.subscription.is_some() {
            return Ok(());
        }
        let stale = self.stale.clone();
        let listener = self.listener.clone();
        let owner = self.owner.clone();
        let subscription = self.store.subscribe(
            &self.owner,
            Arc::new(move || {
                stale.store(true, Ordering::SeqCst);
                if let Some(listener) = &listener {
                    listener.habits_changed(&owner);
                }
            }),
        )?;
        info!(owner = %self.owner, "watching habit store");
        self.subscription = Some(subscription);
        Ok(())
    }

    pub fn is_watching(&self) -> bool {
        self.subscription.is_some()
    }

    /// Starts the day-boundary ticker. A new day marks the cache stale, since
    /// "completed today" flips for every habit.
    pub fn spawn_day_ticker(&self, interval: Duration) -> Result<DayTicker> {
        let stale = self.stale.clone();
        let listener = self.listener.clone();
        DayTicker::spawn(self.clock.clone(), interval, move |today| {
            stale.store(true, Ordering::SeqCst);
            if let Some(listener) = &listener {
                listener.day_changed(today);
            }
        })
        .map_err(ServiceError::Ticker)
    }

    /// Refetches before a write so it is planned from the stored record,
    /// not from a cache that another writer may have overtaken.
    fn persisted(&self, id: &HabitId) -> Result<Habit> {
        self.refresh()?;
        self.habit(id)
    }

    fn begin_write(&self, id: &HabitId) -> Result<WriteGuard<'_>> {
        if !self.in_flight.lock().insert(id.clone()) {
            warn!(%id, "rejecting overlapping write");
            return Err(ServiceError::ToggleInFlight(id.clone()));
        }
        Ok(WriteGuard {
            in_flight: &self.in_flight,
            id: id.clone(),
        })
    }
}
