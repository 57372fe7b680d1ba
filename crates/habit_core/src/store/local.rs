use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::HabitStore;
use crate::error::StoreError;
use crate::habit::{CompletionRecord, HabitFields, HabitId, HabitRecord, UserId};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreState {
    habits: Vec<HabitRecord>,
    completions: Vec<CompletionRecord>,
}

/// Habit store kept in memory and, when opened on a path, mirrored to a JSON file.
pub struct LocalHabitStore {
    path: Option<PathBuf>,
    state: RwLock<StoreState>,
}

impl LocalHabitStore {
    pub fn in_memory() -> Self {
        Self {
            path: None,
            state: RwLock::new(StoreState::default()),
        }
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let state = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            if raw.trim().is_empty() {
                StoreState::default()
            } else {
                serde_json::from_str(&raw)?
            }
        } else {
            StoreState::default()
        };
        tracing::debug!(
            path = %path.display(),
            habits = state.habits.len(),
            completions = state.completions.len(),
            "opened habit store"
        );
        Ok(Self {
            path: Some(path),
            state: RwLock::new(state),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn persist(&self, state: &StoreState) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let payload = serde_json::to_string_pretty(state)?;
        fs::write(path, payload)?;
        tracing::debug!(path = %path.display(), "habit store flushed");
        Ok(())
    }

    /// Applies `change` to a copy of the state; the copy replaces the live state only once
    /// it has been written out.
    fn commit(
        &self,
        change: impl FnOnce(&mut StoreState) -> Result<(), StoreError>,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write();
        let mut next = state.clone();
        change(&mut next)?;
        self.persist(&next)?;
        *state = next;
        Ok(())
    }
}

#[async_trait]
impl HabitStore for LocalHabitStore {
    async fn list_habits(&self, user_id: &UserId) -> Result<Vec<HabitRecord>, StoreError> {
        let state = self.state.read();
        let mut habits: Vec<HabitRecord> = state
            .habits
            .iter()
            .filter(|habit| habit.user_id == *user_id)
            .cloned()
            .collect();
        habits.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(habits)
    }

    async fn list_completions(
        &self,
        habit_id: &HabitId,
    ) -> Result<Vec<CompletionRecord>, StoreError> {
        let state = self.state.read();
        Ok(state
            .completions
            .iter()
            .filter(|row| row.habit_id == *habit_id)
            .cloned()
            .collect())
    }

    async fn upsert_completion(
        &self,
        habit_id: &HabitId,
        user_id: &UserId,
        date: NaiveDate,
        completed: bool,
    ) -> Result<(), StoreError> {
        self.commit(|next| {
            if !next.habits.iter().any(|habit| habit.id == *habit_id) {
                return Err(StoreError::NotFound(habit_id.clone()));
            }
            match next
                .completions
                .iter_mut()
                .find(|row| row.habit_id == *habit_id && row.date == date)
            {
                Some(row) => {
                    row.completed = completed;
                    row.user_id = user_id.clone();
                }
                None => next.completions.push(CompletionRecord {
                    habit_id: habit_id.clone(),
                    user_id: user_id.clone(),
                    date,
                    completed,
                }),
            }
            Ok(())
        })
    }

    async fn delete_completion(
        &self,
        habit_id: &HabitId,
        date: NaiveDate,
    ) -> Result<(), StoreError> {
        self.commit(|next| {
            next.completions
                .retain(|row| !(row.habit_id == *habit_id && row.date == date));
            Ok(())
        })
    }

    async fn create_habit(
        &self,
        user_id: &UserId,
        fields: &HabitFields,
    ) -> Result<HabitRecord, StoreError> {
        let now = Utc::now();
        let record = HabitRecord {
            id: HabitId::generate(),
            user_id: user_id.clone(),
            title: fields.title.clone(),
            description: fields.description.clone(),
            category: fields.category,
            schedule: fields.schedule.clone(),
            frequency: fields.frequency.clone(),
            created_at: now,
            updated_at: now,
        };
        self.commit(|next| {
            next.habits.push(record.clone());
            Ok(())
        })?;
        Ok(record)
    }

    async fn update_habit(
        &self,
        habit_id: &HabitId,
        fields: &HabitFields,
    ) -> Result<(), StoreError> {
        self.commit(|next| {
            let record = next
                .habits
                .iter_mut()
                .find(|habit| habit.id == *habit_id)
                .ok_or_else(|| StoreError::NotFound(habit_id.clone()))?;
            record.apply_fields(fields, Utc::now());
            Ok(())
        })
    }

    async fn delete_habit(&self, habit_id: &HabitId) -> Result<(), StoreError> {
        self.commit(|next| {
            let before = next.habits.len();
            next.habits.retain(|habit| habit.id != *habit_id);
            if next.habits.len() == before {
                return Err(StoreError::NotFound(habit_id.clone()));
            }
            next.completions.retain(|row| row.habit_id != *habit_id);
            Ok(())
        })
    }
}
