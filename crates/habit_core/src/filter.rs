use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{HabitError, Result};
use crate::habit::Habit;
use crate::stats::compute_stats;

pub const ALL: &str = "all";
pub const GOOD_STREAK: u32 = 5;
pub const EXCELLENT_STREAK: u32 = 15;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusFilter {
    #[default]
    All,
    Completed,
    InProgress,
}

impl StatusFilter {
    fn keeps(self, habit: &Habit) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Completed => compute_stats(habit).is_completed,
            StatusFilter::InProgress => !compute_stats(habit).is_completed,
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StatusFilter::All => ALL,
            StatusFilter::Completed => "completed",
            StatusFilter::InProgress => "in-progress",
        })
    }
}

impl FromStr for StatusFilter {
    type Err = HabitError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            ALL => Ok(StatusFilter::All),
            "completed" => Ok(StatusFilter::Completed),
            "in-progress" => Ok(StatusFilter::InProgress),
            other => Err(HabitError::UnknownOption {
                kind: "status",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreakTier {
    #[default]
    All,
    Good,
    Excellent,
}

impl StreakTier {
    fn keeps(self, habit: &Habit) -> bool {
        match self {
            StreakTier::All => true,
            StreakTier::Good => habit.current_streak >= GOOD_STREAK,
            StreakTier::Excellent => habit.current_streak >= EXCELLENT_STREAK,
        }
    }
}

impl fmt::Display for StreakTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StreakTier::All => ALL,
            StreakTier::Good => "good",
            StreakTier::Excellent => "excellent",
        })
    }
}

impl FromStr for StreakTier {
    type Err = HabitError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            ALL => Ok(StreakTier::All),
            "good" => Ok(StreakTier::Good),
            "excellent" => Ok(StreakTier::Excellent),
            other => Err(HabitError::UnknownOption {
                kind: "streak",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CategoryFilter {
    #[default]
    All,
    Named(String),
}

impl CategoryFilter {
    fn keeps(&self, habit: &Habit) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Named(name) => habit.category_or_default() == name,
        }
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryFilter::All => f.write_str(ALL),
            CategoryFilter::Named(name) => f.write_str(name),
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = HabitError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            ALL => CategoryFilter::All,
            name => CategoryFilter::Named(name.to_string()),
        })
    }
}

/// Explicit view parameters: every active filter narrows the result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub search: Option<String>,
    pub status: StatusFilter,
    pub streak: StreakTier,
    pub category: CategoryFilter,
}

impl FilterCriteria {
    pub fn with_search(mut self, query: impl Into<String>) -> Self {
        self.search = Some(query.into());
        self
    }

    pub fn with_status(mut self, status: StatusFilter) -> Self {
        self.status = status;
        self
    }

    pub fn with_streak(mut self, streak: StreakTier) -> Self {
        self.streak = streak;
        self
    }

    pub fn with_category(mut self, category: CategoryFilter) -> Self {
        self.category = category;
        self
    }

    fn matches_search(&self, habit: &Habit) -> bool {
        match self.search.as_deref() {
            None | Some("") => true,
            Some(query) => habit.name.to_lowercase().contains(&query.to_lowercase()),
        }
    }

    pub fn matches(&self, habit: &Habit) -> bool {
        self.matches_search(habit)
            && self.status.keeps(habit)
            && self.streak.keeps(habit)
            && self.category.keeps(habit)
    }
}

/// Applies search, status, streak tier and category in that order. Input
/// order is preserved.
pub fn filter_habits<'a>(habits: &'a [Habit], criteria: &FilterCriteria) -> Vec<&'a Habit> {
    let mut results: Vec<&Habit> = habits.iter().collect();
    results.retain(|habit| criteria.matches_search(habit));
    results.retain(|habit| criteria.status.keeps(habit));
    results.retain(|habit| criteria.streak.keeps(habit));
    results.retain(|habit| criteria.category.keeps(habit));
    results
}

/// Selector options: `all` followed by each distinct normalized category.
pub fn category_options(habits: &[Habit]) -> Vec<String> {
    let mut options = vec![ALL.to_string()];
    for habit in habits {
        let category = habit.category_or_default();
        if !options[1..].iter().any(|existing| existing == category) {
            options.push(category.to_string());
        }
    }
    options
}
