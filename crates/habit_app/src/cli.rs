use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use habit_core::{CategoryFilter, RepeatCadence, StatusFilter, StreakTier, TimeOfDay};

#[derive(Parser, Debug)]
#[command(name = "habits")]
#[command(about = "Track daily habits, streaks and progress", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List habits, optionally filtered
    List {
        /// Case-insensitive name search
        #[arg(short, long)]
        search: Option<String>,
        /// all, completed or in-progress
        #[arg(long, default_value = "all")]
        status: StatusFilter,
        /// all, good (5+ days) or excellent (15+ days)
        #[arg(long, default_value = "all")]
        streak: StreakTier,
        /// all, or a category name
        #[arg(short, long, default_value = "all")]
        category: CategoryFilter,
    },
    /// Show today's overview across all habits
    Stats,
    /// Show category options and per-category counts
    Categories,
    /// Create a habit
    Add {
        name: String,
        #[arg(short, long)]
        category: Option<String>,
        /// Number of completed days that reaches the goal
        #[arg(short, long, default_value_t = 30, allow_negative_numbers = true)]
        target: i64,
        /// Daily, Weekly or Monthly
        #[arg(short, long, default_value = "daily")]
        repeat: RepeatCadence,
        /// Morning, Afternoon, Evening or Night
        #[arg(long, default_value = "morning")]
        time_of_day: TimeOfDay,
        #[arg(short, long)]
        goal: Option<String>,
        /// First tracked day (YYYY-MM-DD); defaults to today
        #[arg(long)]
        start: Option<NaiveDate>,
    },
    /// Edit a habit's descriptive fields
    Edit {
        id: String,
        #[arg(short, long)]
        name: Option<String>,
        /// New category; an empty string clears it
        #[arg(short, long)]
        category: Option<String>,
        #[arg(short, long, allow_negative_numbers = true)]
        target: Option<i64>,
        #[arg(short, long)]
        repeat: Option<RepeatCadence>,
        #[arg(long)]
        time_of_day: Option<TimeOfDay>,
        #[arg(short, long)]
        goal: Option<String>,
        #[arg(long)]
        start: Option<NaiveDate>,
    },
    /// Mark today complete, or undo today's completion
    Toggle { id: String },
    /// Set a single day's entry without touching streaks
    Mark {
        id: String,
        /// Day to set (YYYY-MM-DD)
        date: NaiveDate,
        /// Record the day as not completed
        #[arg(long)]
        missed: bool,
    },
    /// Delete a habit permanently
    Delete { id: String },
    /// Keep running and re-render whenever habits or the day change
    Watch,
}

impl Default for Command {
    fn default() -> Self {
        Command::List {
            search: None,
            status: StatusFilter::All,
            streak: StreakTier::All,
            category: CategoryFilter::All,
        }
    }
}
