use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use chrono::{NaiveDate, TimeZone, Utc};
use habit_core::{
    CategoryFilter, FilterCriteria, Habit, HabitDraft, HabitError, HabitId, HabitPatch,
    StatusFilter,
};
use habit_domain::{
    clock::{Clock, FixedClock},
    notifications::ChangeListener,
    store::{OnChange, StoreError, Subscription},
    HabitService, HabitStore, JsonDirStore, MemoryStore, ServiceError,
};
use parking_lot::Mutex;
use tempfile::tempdir;

fn clock_at(y: i32, m: u32, d: u32) -> Arc<FixedClock> {
    Arc::new(FixedClock::new(Utc.with_ymd_and_hms(y, m, d, 9, 0, 0).unwrap()))
}

#[derive(Default)]
struct RecordingListener {
    changed: Mutex<Vec<String>>,
    days: Mutex<Vec<NaiveDate>>,
}

impl ChangeListener for RecordingListener {
    fn habits_changed(&self, owner: &str) {
        self.changed.lock().push(owner.to_string());
    }

    fn day_changed(&self, today: NaiveDate) {
        self.days.lock().push(today);
    }
}

/// Delegates to a [`MemoryStore`] but can be told to fail writes.
#[derive(Default)]
struct FlakyStore {
    inner: MemoryStore,
    fail_writes: AtomicBool,
}

impl HabitStore for FlakyStore {
    fn query_habits(&self, owner: &str) -> Result<Vec<Habit>, StoreError> {
        self.inner.query_habits(owner)
    }

    fn create_habit(&self, habit: Habit) -> Result<HabitId, StoreError> {
        self.inner.create_habit(habit)
    }

    fn update_habit(&self, id: &HabitId, patch: &HabitPatch) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("backend offline".into()));
        }
        self.inner.update_habit(id, patch)
    }

    fn delete_habit(&self, id: &HabitId) -> Result<(), StoreError> {
        self.inner.delete_habit(id)
    }

    fn subscribe(&self, owner: &str, on_change: OnChange) -> Result<Subscription, StoreError> {
        self.inner.subscribe(owner, on_change)
    }
}

/// Parks every update until the test releases it.
struct SlowStore {
    inner: MemoryStore,
    entered: Barrier,
    release: Barrier,
}

impl HabitStore for SlowStore {
    fn query_habits(&self, owner: &str) -> Result<Vec<Habit>, StoreError> {
        self.inner.query_habits(owner)
    }

    fn create_habit(&self, habit: Habit) -> Result<HabitId, StoreError> {
        self.inner.create_habit(habit)
    }

    fn update_habit(&self, id: &HabitId, patch: &HabitPatch) -> Result<(), StoreError> {
        self.entered.wait();
        self.release.wait();
        self.inner.update_habit(id, patch)
    }

    fn delete_habit(&self, id: &HabitId) -> Result<(), StoreError> {
        self.inner.delete_habit(id)
    }

    fn subscribe(&self, owner: &str, on_change: OnChange) -> Result<Subscription, StoreError> {
        self.inner.subscribe(owner, on_change)
    }
}

#[test]
fn toggles_persist_streaks_to_json_records() {
    let temp = tempdir().expect("tempdir");
    let store = Arc::new(JsonDirStore::open(temp.path()).expect("open store"));
    let clock = clock_at(2024, 1, 2);
    let service = HabitService::builder(store.clone())
        .owner("alice")
        .with_clock(clock.clone())
        .build()
        .expect("build service");

    let id = service
        .create_habit(HabitDraft::new("Read").with_category("Learning"))
        .expect("create habit");

    let habit = service.toggle_today(&id).expect("first toggle");
    assert!(habit.completed_today(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()));
    assert_eq!(habit.current_streak, 1);
    assert_eq!(habit.total_completed, 1);

    let record = fs::read_to_string(temp.path().join("alice").join(format!("{id}.json")))
        .expect("read record");
    assert!(record.contains("\"2024-01-02\": true"));

    clock.advance(chrono::Duration::days(1));
    let habit = service.toggle_today(&id).expect("second day");
    assert_eq!(habit.current_streak, 2);
    assert_eq!(habit.longest_streak, 2);
    assert_eq!(habit.total_completed, 2);
    assert_eq!(service.overview().habits_completed_today, 1);

    let habit = service.toggle_today(&id).expect("undo");
    assert_eq!(habit.total_completed, 1);
    assert_eq!(habit.current_streak, 2);
    assert_eq!(habit.longest_streak, 2);
    assert_eq!(service.overview().habits_completed_today, 0);

    let stats = service.stats(&id).expect("stats");
    assert_eq!(stats.tracked_days, 2);
    assert_eq!(stats.completed_days, 1);
    assert_eq!(stats.completion_rate, 50);

    let reopened = HabitService::builder(store)
        .owner("alice")
        .with_clock(clock)
        .build()
        .expect("reopen");
    assert_eq!(reopened.habits(), service.habits());
}

#[test]
fn failed_write_leaves_cache_untouched() {
    let store = Arc::new(FlakyStore::default());
    let service = HabitService::builder(store.clone())
        .with_clock(clock_at(2024, 2, 1))
        .build()
        .expect("build service");
    let id = service.create_habit(HabitDraft::new("Stretch")).unwrap();
    let before = service.habits();

    store.fail_writes.store(true, Ordering::SeqCst);
    let err = service.toggle_today(&id).unwrap_err();
    assert!(matches!(err, ServiceError::Store(StoreError::Unavailable(_))));
    assert_eq!(service.habits(), before);

    store.fail_writes.store(false, Ordering::SeqCst);
    let habit = service.toggle_today(&id).expect("retry succeeds");
    assert_eq!(habit.total_completed, 1);
}

#[test]
fn overlapping_toggle_is_rejected() {
    let store = Arc::new(SlowStore {
        inner: MemoryStore::new(),
        entered: Barrier::new(2),
        release: Barrier::new(2),
    });
    let service = HabitService::builder(store.clone())
        .with_clock(clock_at(2024, 2, 1))
        .build()
        .expect("build service");
    let id = service.create_habit(HabitDraft::new("Journal")).unwrap();

    thread::scope(|scope| {
        let first = scope.spawn(|| service.toggle_today(&id));
        store.entered.wait();
        let second = service.toggle_today(&id);
        assert!(matches!(second, Err(ServiceError::ToggleInFlight(ref busy)) if busy == &id));
        store.release.wait();
        let habit = first.join().expect("join").expect("first toggle");
        assert_eq!(habit.current_streak, 1);
        assert_eq!(habit.total_completed, 1);
    });
}

#[test]
fn change_notifications_mark_cache_stale() {
    let store = Arc::new(MemoryStore::new());
    let listener = Arc::new(RecordingListener::default());
    let clock = clock_at(2024, 3, 1);
    let mut service = HabitService::builder(store.clone())
        .owner("alice")
        .with_clock(clock.clone())
        .with_change_listener(listener.clone())
        .build()
        .expect("build service");
    service.watch().expect("watch");
    assert!(service.is_watching());

    // another device writes directly to storage
    let habit = HabitDraft::new("Walk")
        .into_habit("alice", clock.today(), Utc::now())
        .unwrap();
    store.create_habit(habit).unwrap();
    store
        .create_habit(
            HabitDraft::new("Other owner")
                .into_habit("bob", clock.today(), Utc::now())
                .unwrap(),
        )
        .unwrap();

    assert!(service.is_stale());
    assert_eq!(listener.changed.lock().as_slice(), ["alice"]);
    assert!(service.habits().is_empty());
    assert!(service.refresh_if_stale().unwrap());
    assert_eq!(service.habits().len(), 1);
    assert!(!service.refresh_if_stale().unwrap());
}

#[test]
fn toggle_carries_forward_counters_written_elsewhere() {
    let store = Arc::new(MemoryStore::new());
    let clock = clock_at(2024, 3, 8);
    let mut service = HabitService::builder(store.clone())
        .with_clock(clock.clone())
        .build()
        .expect("build service");
    service.watch().expect("watch");
    let id = service
        .create_habit(HabitDraft::new("Swim").with_target_days(60))
        .unwrap();

    // another device completed yesterday on top of a longer run
    let yesterday = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
    store
        .update_habit(
            &id,
            &HabitPatch {
                set_completion_day: Some((yesterday, true)),
                current_streak: Some(7),
                longest_streak: Some(7),
                total_completed: Some(7),
                last_completed: Some(Some(Utc.with_ymd_and_hms(2024, 3, 7, 9, 0, 0).unwrap())),
                ..HabitPatch::default()
            },
        )
        .unwrap();
    assert!(service.is_stale());

    let habit = service.toggle_today(&id).expect("toggle");
    assert!(habit.completed_today(clock.today()));
    assert_eq!(habit.current_streak, 8);
    assert_eq!(habit.longest_streak, 8);
    assert_eq!(habit.total_completed, 8);
    assert!(habit.is_completed_on(yesterday));
}

#[test]
fn unwatched_toggle_still_reads_stored_counters() {
    let store = Arc::new(MemoryStore::new());
    let service = HabitService::builder(store.clone())
        .with_clock(clock_at(2024, 3, 8))
        .build()
        .expect("build service");
    let id = service
        .create_habit(HabitDraft::new("Swim").with_target_days(60))
        .unwrap();
    store
        .update_habit(
            &id,
            &HabitPatch {
                current_streak: Some(5),
                longest_streak: Some(9),
                total_completed: Some(12),
                ..HabitPatch::default()
            },
        )
        .unwrap();
    assert!(!service.is_stale());

    let habit = service.toggle_today(&id).expect("toggle");
    assert_eq!(habit.current_streak, 1);
    assert_eq!(habit.longest_streak, 9);
    assert_eq!(habit.total_completed, 13);
}

#[test]
fn goal_reached_blocks_toggle() {
    let store = Arc::new(MemoryStore::new());
    let service = HabitService::builder(store)
        .with_clock(clock_at(2024, 4, 1))
        .build()
        .expect("build service");
    let id = service
        .create_habit(HabitDraft::new("One and done").with_target_days(1))
        .unwrap();
    service.toggle_today(&id).unwrap();
    let before = service.habit(&id).unwrap();

    let err = service.toggle_today(&id).unwrap_err();
    assert!(matches!(err, ServiceError::Habit(HabitError::GoalReached { .. })));
    assert_eq!(service.habit(&id).unwrap(), before);
}

#[test]
fn invalid_drafts_are_never_stored() {
    let store = Arc::new(MemoryStore::new());
    let service = HabitService::builder(store.clone())
        .build()
        .expect("build service");
    assert!(matches!(
        service.create_habit(HabitDraft::new("  ")),
        Err(ServiceError::Habit(HabitError::EmptyName))
    ));
    assert!(matches!(
        service.create_habit(HabitDraft::new("Run").with_target_days(0)),
        Err(ServiceError::Habit(HabitError::InvalidTargetDays(0)))
    ));
    assert!(store.is_empty());

    let id = service.create_habit(HabitDraft::new("Run")).unwrap();
    assert!(service
        .edit_habit(&id, HabitDraft::new("Run").with_target_days(-1))
        .is_err());
    assert_eq!(service.habit(&id).unwrap().target_days, 30);
}

#[test]
fn views_filter_the_cached_collection() {
    let store = Arc::new(MemoryStore::new());
    let service = HabitService::builder(store)
        .with_clock(clock_at(2024, 5, 1))
        .build()
        .expect("build service");
    let read = service
        .create_habit(HabitDraft::new("Read").with_category("Learning").with_target_days(1))
        .unwrap();
    service.create_habit(HabitDraft::new("Run")).unwrap();
    service
        .create_habit(HabitDraft::new("Rest").with_category("Health"))
        .unwrap();
    service.toggle_today(&read).unwrap();

    assert_eq!(
        service.category_options(),
        ["all", "Learning", "uncategorized", "Health"]
    );
    let done = service.filtered(&FilterCriteria::default().with_status(StatusFilter::Completed));
    assert_eq!(done.len(), 1);
    assert_eq!(done[0].id, read);

    let r_and_health = service.filtered(
        &FilterCriteria::default()
            .with_search("r")
            .with_category(CategoryFilter::Named("Health".into())),
    );
    assert_eq!(r_and_health.len(), 1);
    assert_eq!(r_and_health[0].name, "Rest");

    let breakdown = service.category_breakdown();
    assert_eq!(breakdown.len(), 3);
    assert_eq!(breakdown[0].completed_today, 1);

    let overview = service.overview();
    assert_eq!(overview.total_habits, 3);
    assert_eq!(overview.habits_completed_today, 1);
    assert_eq!(overview.completion_rate, 33);
}

#[test]
fn backfilled_day_leaves_streaks_alone() {
    let store = Arc::new(MemoryStore::new());
    let service = HabitService::builder(store)
        .with_clock(clock_at(2024, 6, 10))
        .build()
        .expect("build service");
    let id = service.create_habit(HabitDraft::new("Piano")).unwrap();
    let earlier = NaiveDate::from_ymd_opt(2024, 6, 8).unwrap();
    service.set_completion_day(&id, earlier, true).unwrap();

    let habit = service.habit(&id).unwrap();
    assert!(habit.is_completed_on(earlier));
    assert_eq!(habit.current_streak, 0);
    assert_eq!(service.stats(&id).unwrap().completed_days, 1);

    service.delete_habit(&id).unwrap();
    assert!(matches!(
        service.habit(&id),
        Err(ServiceError::UnknownHabit(_))
    ));
}

#[test]
fn day_rollover_reaches_listener() {
    let store = Arc::new(MemoryStore::new());
    let listener = Arc::new(RecordingListener::default());
    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2024, 7, 1, 23, 59, 30).unwrap(),
    ));
    let service = HabitService::builder(store)
        .with_clock(clock.clone())
        .with_change_listener(listener.clone())
        .build()
        .expect("build service");

    let ticker = service
        .spawn_day_ticker(Duration::from_millis(5))
        .expect("ticker");
    clock.advance(chrono::Duration::minutes(1));

    let mut days = Vec::new();
    for _ in 0..1000 {
        days = listener.days.lock().clone();
        if !days.is_empty() {
            break;
        }
        thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(days, [NaiveDate::from_ymd_opt(2024, 7, 2).unwrap()]);
    assert!(service.is_stale());
    ticker.stop();
}
