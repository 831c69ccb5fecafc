use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{HabitError, Result};

pub const DEFAULT_TARGET_DAYS: u32 = 30;
pub const DEFAULT_GOAL: &str = "5 times";
pub const UNCATEGORIZED: &str = "uncategorized";

/// Opaque identifier handed out by the storage layer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HabitId(String);

impl HabitId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HabitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for HabitId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RepeatCadence {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl fmt::Display for RepeatCadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RepeatCadence::Daily => "Daily",
            RepeatCadence::Weekly => "Weekly",
            RepeatCadence::Monthly => "Monthly",
        };
        f.write_str(label)
    }
}

impl FromStr for RepeatCadence {
    type Err = HabitError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(RepeatCadence::Daily),
            "weekly" => Ok(RepeatCadence::Weekly),
            "monthly" => Ok(RepeatCadence::Monthly),
            _ => Err(HabitError::UnknownOption {
                kind: "repeat",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeOfDay {
    #[default]
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TimeOfDay::Morning => "Morning",
            TimeOfDay::Afternoon => "Afternoon",
            TimeOfDay::Evening => "Evening",
            TimeOfDay::Night => "Night",
        };
        f.write_str(label)
    }
}

impl FromStr for TimeOfDay {
    type Err = HabitError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "morning" => Ok(TimeOfDay::Morning),
            "afternoon" => Ok(TimeOfDay::Afternoon),
            "evening" => Ok(TimeOfDay::Evening),
            "night" => Ok(TimeOfDay::Night),
            _ => Err(HabitError::UnknownOption {
                kind: "time of day",
                value: s.to_string(),
            }),
        }
    }
}

/// A tracked habit as persisted by the storage collaborator.
///
/// `completions` holds one entry per explicitly toggled day. The streak
/// counters are maintained incrementally by [`crate::streak`] and are not
/// recomputed from the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Habit {
    pub id: HabitId,
    pub owner: String,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub repeat: RepeatCadence,
    #[serde(default)]
    pub time_of_day: TimeOfDay,
    #[serde(default = "default_goal")]
    pub goal: String,
    #[serde(default = "default_target_days")]
    pub target_days: u32,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub completions: BTreeMap<NaiveDate, bool>,
    #[serde(default)]
    pub current_streak: u32,
    #[serde(default)]
    pub longest_streak: u32,
    #[serde(default)]
    pub total_completed: u32,
    #[serde(default)]
    pub last_completed: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_goal() -> String {
    DEFAULT_GOAL.to_string()
}

fn default_target_days() -> u32 {
    DEFAULT_TARGET_DAYS
}

impl Habit {
    pub fn is_completed_on(&self, date: NaiveDate) -> bool {
        self.completions.get(&date).copied().unwrap_or(false)
    }

    pub fn completed_today(&self, today: NaiveDate) -> bool {
        self.is_completed_on(today)
    }

    pub fn tracked_days(&self) -> u32 {
        self.completions.len() as u32
    }

    pub fn completed_days(&self) -> u32 {
        self.completions.values().filter(|done| **done).count() as u32
    }

    /// Category with absent or blank values normalized to [`UNCATEGORIZED`].
    pub fn category_or_default(&self) -> &str {
        self.category
            .as_deref()
            .filter(|category| !category.trim().is_empty())
            .unwrap_or(UNCATEGORIZED)
    }
}

/// User-supplied fields for creating or editing a habit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HabitDraft {
    pub name: String,
    pub category: Option<String>,
    pub repeat: RepeatCadence,
    pub time_of_day: TimeOfDay,
    pub goal: String,
    pub target_days: i64,
    pub start_date: Option<NaiveDate>,
}

impl HabitDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: None,
            repeat: RepeatCadence::default(),
            time_of_day: TimeOfDay::default(),
            goal: DEFAULT_GOAL.to_string(),
            target_days: DEFAULT_TARGET_DAYS as i64,
            start_date: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_target_days(mut self, target_days: i64) -> Self {
        self.target_days = target_days;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(HabitError::EmptyName);
        }
        if self.target_days <= 0 || self.target_days > u32::MAX as i64 {
            return Err(HabitError::InvalidTargetDays(self.target_days));
        }
        Ok(())
    }

    /// Builds a fresh record. The id is a placeholder until storage assigns one.
    pub fn into_habit(self, owner: &str, today: NaiveDate, now: DateTime<Utc>) -> Result<Habit> {
        self.validate()?;
        let mut completions = BTreeMap::new();
        completions.insert(today, false);
        Ok(Habit {
            id: HabitId::new(""),
            owner: owner.to_string(),
            name: self.name.trim().to_string(),
            category: normalize_category(self.category),
            repeat: self.repeat,
            time_of_day: self.time_of_day,
            goal: self.goal,
            target_days: self.target_days as u32,
            start_date: self.start_date.unwrap_or(today),
            completions,
            current_streak: 0,
            longest_streak: 0,
            total_completed: 0,
            last_completed: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Form edit: replaces descriptive fields, never completions or counters.
    pub fn into_patch(self, now: DateTime<Utc>) -> Result<HabitPatch> {
        self.validate()?;
        Ok(HabitPatch {
            name: Some(self.name.trim().to_string()),
            category: Some(normalize_category(self.category)),
            repeat: Some(self.repeat),
            time_of_day: Some(self.time_of_day),
            goal: Some(self.goal),
            target_days: Some(self.target_days as u32),
            start_date: self.start_date,
            updated_at: Some(now),
            ..HabitPatch::default()
        })
    }
}

fn normalize_category(category: Option<String>) -> Option<String> {
    category
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Typed partial update understood by every storage collaborator.
///
/// `None` leaves a field untouched. `last_completed` is doubly optional so a
/// patch can clear the timestamp.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitPatch {
    pub set_completion_day: Option<(NaiveDate, bool)>,
    pub current_streak: Option<u32>,
    pub longest_streak: Option<u32>,
    pub total_completed: Option<u32>,
    pub last_completed: Option<Option<DateTime<Utc>>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub name: Option<String>,
    pub category: Option<Option<String>>,
    pub repeat: Option<RepeatCadence>,
    pub time_of_day: Option<TimeOfDay>,
    pub goal: Option<String>,
    pub target_days: Option<u32>,
    pub start_date: Option<NaiveDate>,
}

impl HabitPatch {
    pub fn apply(&self, habit: &mut Habit) {
        if let Some((date, completed)) = self.set_completion_day {
            habit.completions.insert(date, completed);
        }
        if let Some(value) = self.current_streak {
            habit.current_streak = value;
        }
        if let Some(value) = self.longest_streak {
            habit.longest_streak = value;
        }
        if let Some(value) = self.total_completed {
            habit.total_completed = value;
        }
        if let Some(value) = self.last_completed {
            habit.last_completed = value;
        }
        if let Some(value) = self.updated_at {
            habit.updated_at = value;
        }
        if let Some(value) = &self.name {
            habit.name = value.clone();
        }
        if let Some(value) = &self.category {
            habit.category = value.clone();
        }
        if let Some(value) = self.repeat {
            habit.repeat = value;
        }
        if let Some(value) = self.time_of_day {
            habit.time_of_day = value;
        }
        if let Some(value) = &self.goal {
            habit.goal = value.clone();
        }
        if let Some(value) = self.target_days {
            habit.target_days = value;
        }
        if let Some(value) = self.start_date {
            habit.start_date = value;
        }
    }
}
