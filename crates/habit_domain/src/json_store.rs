use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use habit_core::{Habit, HabitId, HabitPatch};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use walkdir::WalkDir;

use crate::store::{HabitStore, OnChange, StoreError, Subscription};

/// Stores one pretty-printed JSON record per habit at `<root>/<owner>/<id>.json`.
pub struct JsonDirStore {
    root: PathBuf,
    sequence: AtomicU64,
}

impl JsonDirStore {
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|source| StoreError::Io {
            path: root.clone(),
            source,
        })?;
        tracing::debug!(root = %root.display(), "opened habit store");
        Ok(Self {
            root,
            sequence: AtomicU64::new(0),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn owner_dir(&self, owner: &str) -> PathBuf {
        self.root.join(owner)
    }

    fn next_id(&self) -> HabitId {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        HabitId::new(format!("{:x}{:04x}", Utc::now().timestamp_millis(), seq & 0xffff))
    }

    fn locate(&self, id: &HabitId) -> Result<PathBuf, StoreError> {
        let file_name = format!("{id}.json");
        for entry in WalkDir::new(&self.root).min_depth(2).max_depth(2) {
            let entry = entry?;
            if entry.file_type().is_file() && entry.file_name().to_str() == Some(file_name.as_str())
            {
                return Ok(entry.into_path());
            }
        }
        Err(StoreError::NotFound(id.clone()))
    }

    fn read_record(path: &Path) -> Result<Habit, StoreError> {
        let raw = fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| StoreError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    fn write_record(path: &Path, habit: &Habit) -> Result<(), StoreError> {
        let payload = serde_json::to_string_pretty(habit).map_err(|source| StoreError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, payload).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    fn is_record(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false)
    }
}

impl HabitStore for JsonDirStore {
    fn query_habits(&self, owner: &str) -> Result<Vec<Habit>, StoreError> {
        let dir = self.owner_dir(owner);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut habits = Vec::new();
        for entry in WalkDir::new(&dir).min_depth(1).max_depth(1) {
            let entry = entry?;
            if entry.file_type().is_file() && Self::is_record(entry.path()) {
                habits.push(Self::read_record(entry.path())?);
            }
        }
        habits.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(habits)
    }

    fn create_habit(&self, mut habit: Habit) -> Result<HabitId, StoreError> {
        let dir = self.owner_dir(&habit.owner);
        fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })?;
        let id = self.next_id();
        habit.id = id.clone();
        let path = dir.join(format!("{id}.json"));
        Self::write_record(&path, &habit)?;
        tracing::debug!(%id, path = %path.display(), "habit record created");
        Ok(id)
    }

    fn update_habit(&self, id: &HabitId, patch: &HabitPatch) -> Result<(), StoreError> {
        let path = self.locate(id)?;
        let mut habit = Self::read_record(&path)?;
        patch.apply(&mut habit);
        Self::write_record(&path, &habit)
    }

    fn delete_habit(&self, id: &HabitId) -> Result<(), StoreError> {
        let path = self.locate(id)?;
        fs::remove_file(&path).map_err(|source| StoreError::Io { path, source })
    }

    fn subscribe(&self, owner: &str, on_change: OnChange) -> Result<Subscription, StoreError> {
        let dir = self.owner_dir(owner);
        fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })?;
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) if is_record_change(&event) => {
                tracing::debug!(kind = ?event.kind, "habit record changed on disk");
                on_change();
            }
            Ok(_) => {}
            Err(err) => tracing::warn!(%err, "habit watcher error"),
        })
        .map_err(|source| StoreError::Watch {
            path: dir.clone(),
            source,
        })?;
        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|source| StoreError::Watch {
                path: dir.clone(),
                source,
            })?;
        Ok(Subscription::watching(watcher))
    }
}

fn is_record_change(event: &Event) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) && event.paths.iter().any(|path| JsonDirStore::is_record(path))
}
