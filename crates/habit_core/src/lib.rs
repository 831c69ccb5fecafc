pub mod error;
pub mod filter;
pub mod habit;
pub mod ledger;
pub mod stats;
pub mod streak;

pub use crate::error::HabitError;
pub use crate::filter::{filter_habits, CategoryFilter, FilterCriteria, StatusFilter, StreakTier};
pub use crate::habit::{Habit, HabitDraft, HabitId, HabitPatch, RepeatCadence, TimeOfDay};
pub use crate::stats::{compute_overview, compute_stats, HabitStats, Overview};
