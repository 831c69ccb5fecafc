use habit_core::{HabitError, HabitId};
use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Habit(#[from] HabitError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("habit `{0}` not found")]
    UnknownHabit(HabitId),
    #[error("habit `{0}` already has a write in flight")]
    ToggleInFlight(HabitId),
    #[error("unable to start day ticker: {0}")]
    Ticker(#[source] std::io::Error),
}

pub type Result<T, E = ServiceError> = std::result::Result<T, E>;
