use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::habit::Habit;

/// Progress metrics derived from a single habit. Never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitStats {
    pub tracked_days: u32,
    pub completed_days: u32,
    pub completion_rate: u32,
    pub target_days: u32,
    pub progress_percentage: u32,
    pub days_remaining: u32,
    pub is_completed: bool,
    pub current_streak: u32,
    pub longest_streak: u32,
}

/// Collection-wide rollup for one calendar day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overview {
    pub habits_completed_today: u32,
    pub total_habits: u32,
    pub completion_rate: u32,
    pub best_streak: u32,
    pub current_streak: u32,
    pub total_completed_days: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub name: String,
    pub habits: u32,
    pub completed_today: u32,
}

/// `round(100 * part / whole)` with halves rounded up; 0 when `whole` is 0.
fn percent(part: u32, whole: u32) -> u32 {
    if whole == 0 {
        return 0;
    }
    let (part, whole) = (u64::from(part), u64::from(whole));
    ((200 * part + whole) / (2 * whole)) as u32
}

pub fn compute_stats(habit: &Habit) -> HabitStats {
    let tracked_days = habit.tracked_days();
    let completed_days = habit.completed_days();
    let target_days = habit.target_days;
    HabitStats {
        tracked_days,
        completed_days,
        completion_rate: percent(completed_days, tracked_days),
        target_days,
        progress_percentage: percent(completed_days, target_days).min(100),
        days_remaining: target_days.saturating_sub(completed_days),
        is_completed: completed_days >= target_days,
        current_streak: habit.current_streak,
        longest_streak: habit.longest_streak,
    }
}

pub fn compute_overview(habits: &[Habit], today: NaiveDate) -> Overview {
    if habits.is_empty() {
        return Overview::default();
    }
    let total_habits = habits.len() as u32;
    let habits_completed_today = habits
        .iter()
        .filter(|habit| habit.completed_today(today))
        .count() as u32;
    Overview {
        habits_completed_today,
        total_habits,
        completion_rate: percent(habits_completed_today, total_habits),
        best_streak: habits.iter().map(|h| h.longest_streak).max().unwrap_or(0),
        current_streak: habits.iter().map(|h| h.current_streak).max().unwrap_or(0),
        total_completed_days: habits.iter().map(Habit::completed_days).sum(),
    }
}

/// Habit counts per normalized category, in first-appearance order.
pub fn category_breakdown(habits: &[Habit], today: NaiveDate) -> Vec<CategorySummary> {
    let mut summaries: Vec<CategorySummary> = Vec::new();
    for habit in habits {
        let name = habit.category_or_default();
        let idx = match summaries.iter().position(|s| s.name == name) {
            Some(idx) => idx,
            None => {
                summaries.push(CategorySummary {
                    name: name.to_string(),
                    habits: 0,
                    completed_today: 0,
                });
                summaries.len() - 1
            }
        };
        let summary = &mut summaries[idx];
        summary.habits += 1;
        if habit.completed_today(today) {
            summary.completed_today += 1;
        }
    }
    summaries
}
