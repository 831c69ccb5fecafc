use chrono::{DateTime, NaiveDate, Utc};

use crate::habit::{Habit, HabitPatch};

pub const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

/// Canonical `YYYY-MM-DD` key for a calendar day.
pub fn date_key(date: NaiveDate) -> String {
    date.format(DATE_KEY_FORMAT).to_string()
}

pub fn parse_date_key(key: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(key.trim(), DATE_KEY_FORMAT).ok()
}

/// A single-day change to a habit's completion record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionUpdate {
    pub date: NaiveDate,
    pub completed: bool,
    pub updated_at: DateTime<Utc>,
    pub last_completed: Option<DateTime<Utc>>,
}

impl CompletionUpdate {
    pub fn apply_to(&self, habit: &mut Habit) {
        self.to_patch().apply(habit);
    }

    pub fn to_patch(&self) -> HabitPatch {
        HabitPatch {
            set_completion_day: Some((self.date, self.completed)),
            updated_at: Some(self.updated_at),
            last_completed: Some(self.last_completed),
            ..HabitPatch::default()
        }
    }
}

/// Sets one day's entry; every other day is left as it is.
///
/// Clearing a day also clears `last_completed`.
pub fn set_day(date: NaiveDate, completed: bool, now: DateTime<Utc>) -> CompletionUpdate {
    CompletionUpdate {
        date,
        completed,
        updated_at: now,
        last_completed: completed.then_some(now),
    }
}
