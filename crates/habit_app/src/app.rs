use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use habit_core::{FilterCriteria, HabitDraft, HabitId};
use habit_domain::{
    clock::DEFAULT_POLL_INTERVAL, notifications::ChangeListener, HabitService, JsonDirStore,
};
use tracing::{debug, info, warn};

use crate::cli::Command;
use crate::render;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub(crate) store_dir: PathBuf,
    pub(crate) owner: String,
    pub(crate) poll_interval: Duration,
}

impl AppConfig {
    /// Reads overrides from the environment. Invalid values are logged and the
    /// default is kept, so this never fails.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(dir) = lookup("HABIT_STORE_DIR") {
            if !dir.trim().is_empty() {
                config.store_dir = PathBuf::from(dir);
            }
        }
        if let Some(owner) = lookup("HABIT_OWNER") {
            let owner = owner.trim();
            if owner.is_empty() || owner.contains(|c| c == '/' || c == '\\') {
                warn!(owner, "ignoring invalid HABIT_OWNER");
            } else {
                config.owner = owner.to_string();
            }
        }
        if let Some(secs) = lookup("HABIT_POLL_SECONDS") {
            match secs.trim().parse::<u64>() {
                Ok(value) if value > 0 => config.poll_interval = Duration::from_secs(value),
                _ => warn!(value = %secs, "ignoring invalid HABIT_POLL_SECONDS"),
            }
        }
        config
    }

    pub fn store_dir(&self) -> &Path {
        &self.store_dir
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let store_dir = dirs::data_local_dir()
            .map(|dir| dir.join("habits"))
            .unwrap_or_else(|| PathBuf::from("habits"));
        Self {
            store_dir,
            owner: habit_domain::service::DEFAULT_OWNER.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AppEvent {
    HabitsChanged,
    DayChanged(NaiveDate),
}

struct ChannelListener {
    events: Sender<AppEvent>,
}

impl ChangeListener for ChannelListener {
    fn habits_changed(&self, owner: &str) {
        debug!(owner, "store change notification");
        let _ = self.events.send(AppEvent::HabitsChanged);
    }

    fn day_changed(&self, today: NaiveDate) {
        let _ = self.events.send(AppEvent::DayChanged(today));
    }
}

pub fn run(config: AppConfig, command: Command) -> Result<()> {
    info!(
        store = %config.store_dir.display(),
        owner = %config.owner,
        "opening habit store"
    );
    let store = JsonDirStore::open(&config.store_dir).with_context(|| {
        format!(
            "failed to open habit store at {}",
            config.store_dir.display()
        )
    })?;
    let (events, inbox) = mpsc::channel();
    let service = HabitService::builder(Arc::new(store))
        .owner(config.owner.clone())
        .with_change_listener(Arc::new(ChannelListener { events }))
        .build()
        .context("failed to load habits")?;

    match command {
        Command::List {
            search,
            status,
            streak,
            category,
        } => {
            let mut criteria = FilterCriteria::default()
                .with_status(status)
                .with_streak(streak)
                .with_category(category);
            criteria.search = search;
            print_habits(&service, &criteria);
        }
        Command::Stats => {
            for line in render::overview_lines(&service.overview()) {
                println!("{line}");
            }
        }
        Command::Categories => {
            println!("Options: {}", service.category_options().join(", "));
            for summary in service.category_breakdown() {
                println!("{}", render::category_line(&summary));
            }
        }
        Command::Add {
            name,
            category,
            target,
            repeat,
            time_of_day,
            goal,
            start,
        } => {
            let mut draft = HabitDraft::new(name).with_target_days(target);
            draft.category = category;
            draft.repeat = repeat;
            draft.time_of_day = time_of_day;
            if let Some(goal) = goal {
                draft.goal = goal;
            }
            draft.start_date = start;
            let id = service.create_habit(draft).context("could not add habit")?;
            println!("Habit added (id = {id})");
        }
        Command::Edit {
            id,
            name,
            category,
            target,
            repeat,
            time_of_day,
            goal,
            start,
        } => {
            let id = HabitId::new(id);
            let current = service.habit(&id)?;
            let draft = HabitDraft {
                name: name.unwrap_or(current.name),
                category: category.or(current.category),
                repeat: repeat.unwrap_or(current.repeat),
                time_of_day: time_of_day.unwrap_or(current.time_of_day),
                goal: goal.unwrap_or(current.goal),
                target_days: target.unwrap_or(i64::from(current.target_days)),
                start_date: Some(start.unwrap_or(current.start_date)),
            };
            service
                .edit_habit(&id, draft)
                .with_context(|| format!("could not edit habit {id}"))?;
            println!("Habit {id} updated.");
        }
        Command::Toggle { id } => {
            let id = HabitId::new(id);
            let habit = service
                .toggle_today(&id)
                .with_context(|| format!("could not toggle habit {id}"))?;
            println!("{}", render::habit_line(&habit, service.today()));
        }
        Command::Mark { id, date, missed } => {
            let id = HabitId::new(id);
            service
                .set_completion_day(&id, date, !missed)
                .with_context(|| format!("could not update {date} for habit {id}"))?;
            let state = if missed { "missed" } else { "done" };
            println!("Habit {id}: {date} marked {state}.");
        }
        Command::Delete { id } => {
            let id = HabitId::new(id);
            service
                .delete_habit(&id)
                .with_context(|| format!("could not delete habit {id}"))?;
            println!("Habit {id} deleted.");
        }
        Command::Watch => watch(service, &config, inbox)?,
    }
    Ok(())
}

fn print_habits(service: &HabitService, criteria: &FilterCriteria) {
    let today = service.today();
    let habits = service.filtered(criteria);
    if habits.is_empty() {
        println!("No habits match.");
        return;
    }
    for habit in &habits {
        println!("{}", render::habit_line(habit, today));
    }
}

fn watch(mut service: HabitService, config: &AppConfig, inbox: Receiver<AppEvent>) -> Result<()> {
    service.watch().context("failed to watch habit store")?;
    let _ticker = service
        .spawn_day_ticker(config.poll_interval)
        .context("failed to start day ticker")?;
    print_habits(&service, &FilterCriteria::default());

    for event in inbox {
        if let AppEvent::DayChanged(today) = event {
            info!(%today, "new day, refreshing");
        }
        match service.refresh_if_stale() {
            Ok(true) => {
                println!();
                print_habits(&service, &FilterCriteria::default());
            }
            Ok(false) => {}
            Err(err) => warn!(%err, "refresh failed; keeping previous view"),
        }
    }
    Ok(())
}
