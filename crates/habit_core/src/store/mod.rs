//! Persistence port for habits and their per-date completion rows.

mod local;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::StoreError;
use crate::habit::{CompletionRecord, HabitFields, HabitId, HabitRecord, UserId};

pub use local::LocalHabitStore;

/// Backing store for habit records. Implementations must be `Send + Sync`.
#[async_trait]
pub trait HabitStore: Send + Sync {
    async fn list_habits(&self, user_id: &UserId) -> Result<Vec<HabitRecord>, StoreError>;

    async fn list_completions(&self, habit_id: &HabitId)
        -> Result<Vec<CompletionRecord>, StoreError>;

    /// Insert or replace the row keyed on `(habit_id, date)`.
    async fn upsert_completion(
        &self,
        habit_id: &HabitId,
        user_id: &UserId,
        date: NaiveDate,
        completed: bool,
    ) -> Result<(), StoreError>;

    async fn delete_completion(&self, habit_id: &HabitId, date: NaiveDate)
        -> Result<(), StoreError>;

    async fn create_habit(
        &self,
        user_id: &UserId,
        fields: &HabitFields,
    ) -> Result<HabitRecord, StoreError>;

    async fn update_habit(&self, habit_id: &HabitId, fields: &HabitFields)
        -> Result<(), StoreError>;

    /// Removes the habit together with its completion rows.
    async fn delete_habit(&self, habit_id: &HabitId) -> Result<(), StoreError>;
}
