//! Incremental streak bookkeeping for daily toggles.
//!
//! Streaks are carried forward from the previously persisted counters rather
//! than recomputed from the whole ledger, so every calculation here depends
//! on the habit's last stored state. Callers must not compute two toggles for
//! the same habit from one snapshot.

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::{HabitError, Result};
use crate::habit::{Habit, HabitPatch};
use crate::ledger::{self, CompletionUpdate};
use crate::stats;

/// A completion within this many whole days of the previous one still
/// extends the streak, even if yesterday was never marked.
pub const GRACE_WINDOW_DAYS: i64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreakState {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub total_completed: u32,
    pub last_completed: Option<DateTime<Utc>>,
}

impl StreakState {
    pub fn of(habit: &Habit) -> Self {
        Self {
            current_streak: habit.current_streak,
            longest_streak: habit.longest_streak,
            total_completed: habit.total_completed,
            last_completed: habit.last_completed,
        }
    }
}

/// Streak state after marking `today` complete.
pub fn mark_complete(habit: &Habit, today: NaiveDate, now: DateTime<Utc>) -> StreakState {
    let mut state = StreakState::of(habit);
    state.total_completed = state.total_completed.saturating_add(1);

    let yesterday_done = today
        .pred_opt()
        .map(|yesterday| habit.is_completed_on(yesterday))
        .unwrap_or(false);
    let within_grace = habit
        .last_completed
        .map(|last| (now - last).num_days() <= GRACE_WINDOW_DAYS)
        .unwrap_or(false);

    state.current_streak = if yesterday_done || within_grace {
        state.current_streak.saturating_add(1)
    } else {
        1
    };
    state.longest_streak = state.longest_streak.max(state.current_streak);
    state.last_completed = Some(now);
    state
}

/// Streak state after un-marking a completed day.
///
/// Only the running total is rolled back; the streak counters keep whatever
/// the matching completion produced. Any future correction of the
/// mark/unmark asymmetry belongs here.
pub fn undo_completion(habit: &Habit) -> StreakState {
    let mut state = StreakState::of(habit);
    state.total_completed = state.total_completed.saturating_sub(1);
    state.last_completed = None;
    state
}

/// Result of flipping today's completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleOutcome {
    pub completion: CompletionUpdate,
    pub streak: StreakState,
}

impl ToggleOutcome {
    pub fn to_patch(&self) -> HabitPatch {
        HabitPatch {
            current_streak: Some(self.streak.current_streak),
            longest_streak: Some(self.streak.longest_streak),
            total_completed: Some(self.streak.total_completed),
            last_completed: Some(self.streak.last_completed),
            ..self.completion.to_patch()
        }
    }

    pub fn apply_to(&self, habit: &mut Habit) {
        self.to_patch().apply(habit);
    }
}

/// Plans the flip of today's entry together with the streak bookkeeping.
///
/// Habits that already reached their target cannot be toggled.
pub fn plan_toggle(habit: &Habit, today: NaiveDate, now: DateTime<Utc>) -> Result<ToggleOutcome> {
    if stats::compute_stats(habit).is_completed {
        return Err(HabitError::GoalReached {
            id: habit.id.clone(),
        });
    }
    let completed = !habit.completed_today(today);
    let streak = if completed {
        mark_complete(habit, today, now)
    } else {
        undo_completion(habit)
    };
    Ok(ToggleOutcome {
        completion: ledger::set_day(today, completed, now),
        streak,
    })
}
