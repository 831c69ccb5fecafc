use thiserror::Error;

use crate::habit::HabitId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HabitError {
    #[error("habit name is required")]
    EmptyName,
    #[error("target days must be at least 1 (got {0})")]
    InvalidTargetDays(i64),
    /// Toggling is disabled once a habit has reached its target.
    #[error("habit `{id}` has already reached its goal")]
    GoalReached { id: HabitId },
    #[error("unknown {kind} option `{value}`")]
    UnknownOption { kind: &'static str, value: String },
}

pub type Result<T, E = HabitError> = std::result::Result<T, E>;
