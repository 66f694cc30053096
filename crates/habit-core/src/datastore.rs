use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use chrono::{DateTime, NaiveDate, Utc};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::habit::Habit;

#[derive(Debug)]
pub struct DataStore {
    pub data_dir: PathBuf,
    pub habits_path: PathBuf,
}

impl DataStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let habits_path = data_dir.join("habits.data");
        if !habits_path.exists() {
            fs::write(&habits_path, "")?;
        }

        info!(
            data_dir = %data_dir.display(),
            habits = %habits_path.display(),
            "opened datastore"
        );

        Ok(Self {
            data_dir,
            habits_path,
        })
    }

    #[tracing::instrument(skip(self))]
    pub fn load_habits(&self) -> anyhow::Result<Vec<Habit>> {
        load_jsonl(&self.habits_path).context("failed to load habits.data")
    }

    #[tracing::instrument(skip(self, habits))]
    pub fn save_habits(&self, habits: &[Habit]) -> anyhow::Result<()> {
        save_jsonl_atomic(&self.habits_path, habits).context("failed to save habits.data")
    }

    pub fn next_id(&self, habits: &[Habit]) -> u64 {
        habits.iter().map(|h| h.id).max().unwrap_or(0) + 1
    }

    #[tracing::instrument(skip(self, now))]
    pub fn add_habit(&self, name: &str, now: DateTime<Utc>) -> anyhow::Result<Habit> {
        let name = validate_name(name)?;
        let mut habits = self.load_habits()?;
        let habit = Habit::new(self.next_id(&habits), name, now);

        habits.push(habit.clone());
        habits.sort_by_key(|h| h.id);
        self.save_habits(&habits)?;

        debug!(id = habit.id, uuid = %habit.uuid, "habit added");
        Ok(habit)
    }

    #[tracing::instrument(skip(self))]
    pub fn rename_habit(&self, id: u64, name: &str) -> anyhow::Result<Habit> {
        let name = validate_name(name)?;
        let mut habits = self.load_habits()?;
        let habit = find_mut(&mut habits, id)?;
        habit.name = name;
        let renamed = habit.clone();

        self.save_habits(&habits)?;
        Ok(renamed)
    }

    #[tracing::instrument(skip(self))]
    pub fn delete_habit(&self, id: u64) -> anyhow::Result<Habit> {
        let mut habits = self.load_habits()?;
        let idx = habits
            .iter()
            .position(|h| h.id == id)
            .ok_or_else(|| anyhow!("habit not found: {id}"))?;

        let removed = habits.remove(idx);
        self.save_habits(&habits)?;

        info!(
            id,
            completions = removed.completed_dates.len(),
            "deleted habit"
        );
        Ok(removed)
    }

    /// Returns whether `day` is completed after the toggle.
    #[tracing::instrument(skip(self, today))]
    pub fn toggle_completion(
        &self,
        id: u64,
        day: NaiveDate,
        today: NaiveDate,
    ) -> anyhow::Result<bool> {
        let mut habits = self.load_habits()?;
        let habit = find_mut(&mut habits, id)?;

        let completed = habit.toggle(day);
        habit.best_streak = habit.streak(today).best_streak;
        debug!(
            id,
            %day,
            completed,
            best_streak = habit.best_streak,
            "toggled completion"
        );

        self.save_habits(&habits)?;
        Ok(completed)
    }
}

fn find_mut(habits: &mut [Habit], id: u64) -> anyhow::Result<&mut Habit> {
    habits
        .iter_mut()
        .find(|h| h.id == id)
        .ok_or_else(|| anyhow!("habit not found: {id}"))
}

fn validate_name(name: &str) -> anyhow::Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("habit name cannot be empty"));
    }
    Ok(trimmed.to_string())
}

#[tracing::instrument(skip(path))]
fn load_jsonl(path: &Path) -> anyhow::Result<Vec<Habit>> {
    debug!(file = %path.display(), "loading jsonl");
    let file = fs::File::open(path)?;
    let reader = BufReader::new(file);

    let mut out = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let habit: Habit = serde_json::from_str(trimmed)
            .with_context(|| format!("failed parsing {} line {}", path.display(), idx + 1))?;
        out.push(habit);
    }

    debug!(count = out.len(), "loaded habits from jsonl");
    Ok(out)
}

#[tracing::instrument(skip(path, habits))]
fn save_jsonl_atomic(path: &Path, habits: &[Habit]) -> anyhow::Result<()> {
    debug!(file = %path.display(), count = habits.len(), "saving jsonl atomically");

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    for habit in habits {
        let serialized = serde_json::to_string(habit)?;
        writeln!(temp, "{serialized}")?;
    }
    temp.flush()?;

    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

    Ok(())
}
