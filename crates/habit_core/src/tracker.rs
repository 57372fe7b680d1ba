use std::sync::Arc;

use chrono::NaiveDate;
use parking_lot::RwLock;
use tracing::instrument;

use crate::error::{Result, StoreError};
use crate::filter::CategoryFilter;
use crate::habit::{CompletionHistory, Habit, HabitDraft, HabitId};
use crate::insights::{InsightsReport, ReportingPeriod};
use crate::merge::{self, CompletionIntent};
use crate::session::SessionContext;
use crate::store::HabitStore;
use crate::week::{CompletionDay, DateWindow};

/// Owns the signed-in user's habit view state and mediates every store round trip.
pub struct HabitTracker {
    store: Arc<dyn HabitStore>,
    session: Arc<SessionContext>,
    window: DateWindow,
    habits: RwLock<Vec<Habit>>,
}

pub struct HabitTrackerBuilder {
    store: Arc<dyn HabitStore>,
    session: Arc<SessionContext>,
    window: DateWindow,
}

impl HabitTrackerBuilder {
    pub fn new(store: Arc<dyn HabitStore>, session: Arc<SessionContext>) -> Self {
        Self {
            store,
            session,
            window: DateWindow::default(),
        }
    }

    pub fn with_window(mut self, window: DateWindow) -> Self {
        self.window = window;
        self
    }

    pub fn build(self) -> HabitTracker {
        HabitTracker {
            store: self.store,
            session: self.session,
            window: self.window,
            habits: RwLock::new(Vec::new()),
        }
    }
}

/// A local change applied ahead of the store's answer.
struct Tentative {
    intent: CompletionIntent,
    previous: Option<bool>,
}

impl HabitTracker {
    pub fn builder(
        store: Arc<dyn HabitStore>,
        session: Arc<SessionContext>,
    ) -> HabitTrackerBuilder {
        HabitTrackerBuilder::new(store, session)
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn window(&self) -> DateWindow {
        self.window
    }

    /// Replaces the view state with a fresh fetch. A failed listing keeps what was loaded.
    #[instrument(skip(self))]
    pub async fn reload(&self) -> Result<()> {
        let user_id = self.session.require_user()?;
        let records = match self.store.list_habits(&user_id).await {
            Ok(records) => records,
            Err(err) => {
                tracing::error!(%err, "failed to fetch habits");
                return Err(err.into());
            }
        };

        let mut loaded = Vec::with_capacity(records.len());
        for record in records {
            let history = match self.store.list_completions(&record.id).await {
                Ok(rows) => rows
                    .into_iter()
                    .map(|row| (row.date, row.completed))
                    .collect::<CompletionHistory>(),
                Err(err) => {
                    tracing::warn!(habit = %record.id, %err, "failed to fetch completions");
                    CompletionHistory::new()
                }
            };
            loaded.push(Habit::from_record(record, history));
        }

        tracing::info!(count = loaded.len(), "habits loaded");
        *self.habits.write() = loaded;
        Ok(())
    }

    pub fn habits(&self) -> Vec<Habit> {
        self.habits.read().clone()
    }

    pub fn habit(&self, habit_id: &HabitId) -> Option<Habit> {
        self.habits.read().iter().find(|h| h.id == *habit_id).cloned()
    }

    pub fn filtered(&self, filter: CategoryFilter) -> Vec<Habit> {
        self.habits
            .read()
            .iter()
            .filter(|habit| filter.matches(habit))
            .cloned()
            .collect()
    }

    pub fn week_window(&self, today: NaiveDate) -> Vec<CompletionDay> {
        self.window.days(today)
    }

    pub fn week_for(&self, habit: &Habit, today: NaiveDate) -> Vec<CompletionDay> {
        merge::merge(&habit.completion_history, &self.window.days(today))
    }

    pub fn insights(&self, period: ReportingPeriod, today: NaiveDate) -> InsightsReport {
        InsightsReport::build(&self.habits.read(), period, today)
    }

    /// Flips the completion for `date`. Future dates are left alone and yield `None`;
    /// otherwise the new state is returned once the store has accepted it.
    #[instrument(skip(self), fields(habit = %habit_id))]
    pub async fn toggle_completion(
        &self,
        habit_id: &HabitId,
        date: NaiveDate,
        today: NaiveDate,
    ) -> Result<Option<bool>> {
        let user_id = self.session.require_user()?;
        let current = self
            .habit(habit_id)
            .ok_or_else(|| StoreError::NotFound(habit_id.clone()))?;
        let day = CompletionDay {
            completed: current.completion_history.is_completed(date),
            ..CompletionDay::for_date(date, today)
        };
        let Some(intent) = merge::toggle(habit_id, &day) else {
            tracing::debug!(%date, "ignoring toggle of a future date");
            return Ok(None);
        };

        let tentative = self.apply_tentative(intent)?;
        let outcome = if tentative.intent.completed {
            self.store
                .upsert_completion(habit_id, &user_id, date, true)
                .await
        } else {
            self.store.delete_completion(habit_id, date).await
        };

        match outcome {
            Ok(()) => {
                tracing::info!(%date, completed = tentative.intent.completed, "completion saved");
                Ok(Some(tentative.intent.completed))
            }
            Err(err) => {
                tracing::warn!(%date, %err, "completion not saved, rolling back");
                self.roll_back(&tentative);
                Err(err.into())
            }
        }
    }

    /// Creates a habit when the draft has no id, updates it otherwise.
    #[instrument(skip(self, draft), fields(id = ?draft.id))]
    pub async fn save_habit(&self, draft: HabitDraft) -> Result<Habit> {
        let user_id = self.session.require_user()?;
        let fields = draft.validate()?;

        match draft.id {
            Some(id) => {
                self.store.update_habit(&id, &fields).await?;
                let mut habits = self.habits.write();
                let updated = match habits.iter_mut().find(|h| h.id == id) {
                    Some(habit) => {
                        habit.apply_fields(&fields);
                        habit.clone()
                    }
                    None => {
                        let habit = Habit {
                            id,
                            title: fields.title,
                            description: fields.description,
                            category: fields.category,
                            schedule: fields.schedule,
                            frequency: fields.frequency,
                            completion_history: CompletionHistory::new(),
                        };
                        habits.push(habit.clone());
                        habit
                    }
                };
                tracing::info!(habit = %updated.id, "habit updated");
                Ok(updated)
            }
            None => {
                let record = self.store.create_habit(&user_id, &fields).await?;
                let habit = Habit::from_record(record, CompletionHistory::new());
                self.habits.write().push(habit.clone());
                tracing::info!(habit = %habit.id, "habit created");
                Ok(habit)
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn delete_habit(&self, habit_id: &HabitId) -> Result<()> {
        self.session.require_user()?;
        self.store.delete_habit(habit_id).await?;
        self.habits.write().retain(|habit| habit.id != *habit_id);
        tracing::info!(habit = %habit_id, "habit deleted");
        Ok(())
    }

    fn apply_tentative(&self, intent: CompletionIntent) -> Result<Tentative> {
        let mut habits = self.habits.write();
        let habit = habits
            .iter_mut()
            .find(|h| h.id == intent.habit_id)
            .ok_or_else(|| StoreError::NotFound(intent.habit_id.clone()))?;
        let previous = habit
            .completion_history
            .apply(intent.date, intent.completed);
        Ok(Tentative { intent, previous })
    }

    fn roll_back(&self, tentative: &Tentative) {
        let mut habits = self.habits.write();
        // The habit may have vanished through a concurrent reload; nothing to undo then.
        if let Some(habit) = habits.iter_mut().find(|h| h.id == tentative.intent.habit_id) {
            habit
                .completion_history
                .restore(tentative.intent.date, tentative.previous);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    use crate::error::{AuthError, HabitError, ValidationError};
    use crate::habit::{Category, CompletionRecord, DayOfWeek, HabitFields, HabitRecord, UserId};
    use crate::identity::{Credentials, IdentityProvider, LocalIdentityProvider};
    use crate::store::LocalHabitStore;

    /// Delegates to a local store but can be told to reject writes or reads.
    struct FlakyStore {
        inner: LocalHabitStore,
        fail_writes: AtomicBool,
        fail_reads: AtomicBool,
    }

    impl FlakyStore {
        fn new() -> Self {
            Self {
                inner: LocalHabitStore::in_memory(),
                fail_writes: AtomicBool::new(false),
                fail_reads: AtomicBool::new(false),
            }
        }

        fn check(&self, flag: &AtomicBool) -> std::result::Result<(), StoreError> {
            if flag.load(Ordering::SeqCst) {
                Err(StoreError::Backend("network unreachable".into()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl HabitStore for FlakyStore {
        async fn list_habits(
            &self,
            user_id: &UserId,
        ) -> std::result::Result<Vec<HabitRecord>, StoreError> {
            self.check(&self.fail_reads)?;
            self.inner.list_habits(user_id).await
        }

        async fn list_completions(
            &self,
            habit_id: &HabitId,
        ) -> std::result::Result<Vec<CompletionRecord>, StoreError> {
            self.check(&self.fail_reads)?;
            self.inner.list_completions(habit_id).await
        }

        async fn upsert_completion(
            &self,
            habit_id: &HabitId,
            user_id: &UserId,
            date: NaiveDate,
            completed: bool,
        ) -> std::result::Result<(), StoreError> {
            self.check(&self.fail_writes)?;
            self.inner.upsert_completion(habit_id, user_id, date, completed).await
        }

        async fn delete_completion(
            &self,
            habit_id: &HabitId,
            date: NaiveDate,
        ) -> std::result::Result<(), StoreError> {
            self.check(&self.fail_writes)?;
            self.inner.delete_completion(habit_id, date).await
        }

        async fn create_habit(
            &self,
            user_id: &UserId,
            fields: &HabitFields,
        ) -> std::result::Result<HabitRecord, StoreError> {
            self.check(&self.fail_writes)?;
            self.inner.create_habit(user_id, fields).await
        }

        async fn update_habit(
            &self,
            habit_id: &HabitId,
            fields: &HabitFields,
        ) -> std::result::Result<(), StoreError> {
            self.check(&self.fail_writes)?;
            self.inner.update_habit(habit_id, fields).await
        }

        async fn delete_habit(&self, habit_id: &HabitId) -> std::result::Result<(), StoreError> {
            self.check(&self.fail_writes)?;
            self.inner.delete_habit(habit_id).await
        }
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 4, d).unwrap()
    }

    async fn signed_in_session() -> Arc<SessionContext> {
        let provider = Arc::new(LocalIdentityProvider::in_memory());
        let creds = Credentials::new("kim@example.com", "secret1");
        provider.sign_up(&creds).await.unwrap();
        let context = SessionContext::attach(provider.clone()).await.unwrap();
        provider.sign_in(&creds).await.unwrap();
        Arc::new(context)
    }

    async fn tracker_with(store: Arc<FlakyStore>) -> HabitTracker {
        HabitTracker::builder(store, signed_in_session().await).build()
    }

    fn draft(title: &str, days: &[DayOfWeek]) -> HabitDraft {
        HabitDraft {
            title: title.into(),
            schedule: days.to_vec(),
            ..HabitDraft::default()
        }
    }

    #[tokio::test]
    async fn create_toggle_and_reload() {
        let store = Arc::new(FlakyStore::new());
        let tracker = tracker_with(store.clone()).await;
        let habit = tracker
            .save_habit(draft("Yoga", &[DayOfWeek::Mon, DayOfWeek::Wed, DayOfWeek::Fri]))
            .await
            .unwrap();
        assert_eq!(habit.frequency, "3 times a week");

        let state = tracker.toggle_completion(&habit.id, date(20), date(20)).await.unwrap();
        assert_eq!(state, Some(true));

        tracker.reload().await.unwrap();
        let reloaded = tracker.habit(&habit.id).unwrap();
        assert!(reloaded.completion_history.is_completed(date(20)));

        let week = tracker.week_for(&reloaded, date(20));
        assert_eq!(week.iter().filter(|day| day.completed).count(), 1);
    }

    #[tokio::test]
    async fn unmarking_deletes_the_row() {
        let store = Arc::new(FlakyStore::new());
        let tracker = tracker_with(store.clone()).await;
        let habit = tracker.save_habit(draft("Read", &DayOfWeek::ALL)).await.unwrap();
        tracker.toggle_completion(&habit.id, date(19), date(20)).await.unwrap();
        let state = tracker.toggle_completion(&habit.id, date(19), date(20)).await.unwrap();
        assert_eq!(state, Some(false));
        assert!(store.inner.list_completions(&habit.id).await.unwrap().is_empty());
        assert!(tracker.habit(&habit.id).unwrap().completion_history.is_empty());
    }

    #[tokio::test]
    async fn future_toggle_is_a_no_op() {
        let store = Arc::new(FlakyStore::new());
        let tracker = tracker_with(store.clone()).await;
        let habit = tracker.save_habit(draft("Run", &DayOfWeek::ALL)).await.unwrap();
        let state = tracker.toggle_completion(&habit.id, date(21), date(20)).await.unwrap();
        assert_eq!(state, None);
        assert!(tracker.habit(&habit.id).unwrap().completion_history.is_empty());
        assert!(store.inner.list_completions(&habit.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_write_rolls_back_tentative_change() {
        let store = Arc::new(FlakyStore::new());
        let tracker = tracker_with(store.clone()).await;
        let habit = tracker.save_habit(draft("Run", &DayOfWeek::ALL)).await.unwrap();
        tracker.toggle_completion(&habit.id, date(18), date(20)).await.unwrap();

        store.fail_writes.store(true, Ordering::SeqCst);
        let err = tracker
            .toggle_completion(&habit.id, date(20), date(20))
            .await
            .unwrap_err();
        assert!(matches!(err, HabitError::Store(StoreError::Backend(_))));

        let err = tracker
            .toggle_completion(&habit.id, date(18), date(20))
            .await
            .unwrap_err();
        assert!(matches!(err, HabitError::Store(_)));

        let history = tracker.habit(&habit.id).unwrap().completion_history;
        assert_eq!(history.entry(date(20)), None);
        assert_eq!(history.entry(date(18)), Some(true));
    }

    #[tokio::test]
    async fn failed_reload_keeps_previous_state() {
        let store = Arc::new(FlakyStore::new());
        let tracker = tracker_with(store.clone()).await;
        tracker.save_habit(draft("Run", &DayOfWeek::ALL)).await.unwrap();
        store.fail_reads.store(true, Ordering::SeqCst);
        assert!(tracker.reload().await.is_err());
        assert_eq!(tracker.habits().len(), 1);
    }

    #[tokio::test]
    async fn edit_keeps_history_and_delete_drops_habit() {
        let store = Arc::new(FlakyStore::new());
        let tracker = tracker_with(store.clone()).await;
        let habit = tracker.save_habit(draft("Run", &DayOfWeek::ALL)).await.unwrap();
        tracker.toggle_completion(&habit.id, date(20), date(20)).await.unwrap();

        let mut edit = HabitDraft::editing(&habit);
        edit.title = "Morning run".into();
        edit.category = Category::Other;
        edit.schedule = vec![DayOfWeek::Sat];
        let updated = tracker.save_habit(edit).await.unwrap();
        assert_eq!(updated.frequency, "Once a week");
        assert!(updated.completion_history.is_completed(date(20)));

        tracker.delete_habit(&habit.id).await.unwrap();
        assert!(tracker.habits().is_empty());
        assert!(store.inner.list_completions(&habit.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_draft_is_rejected_before_the_store() {
        let store = Arc::new(FlakyStore::new());
        let tracker = tracker_with(store.clone()).await;
        let err = tracker.save_habit(draft("Run", &[])).await.unwrap_err();
        assert!(matches!(
            err,
            HabitError::Validation(ValidationError::EmptySchedule)
        ));
        assert!(tracker.habits().is_empty());
    }

    #[tokio::test]
    async fn signed_out_user_cannot_load() {
        let provider = Arc::new(LocalIdentityProvider::in_memory());
        let context = Arc::new(SessionContext::attach(provider).await.unwrap());
        let tracker = HabitTracker::builder(Arc::new(FlakyStore::new()), context).build();
        assert!(matches!(
            tracker.reload().await,
            Err(HabitError::Auth(AuthError::NotSignedIn))
        ));
    }

    #[tokio::test]
    async fn insights_and_filter_reflect_loaded_habits() {
        let store = Arc::new(FlakyStore::new());
        let tracker = tracker_with(store.clone()).await;
        let run = tracker.save_habit(draft("Run", &DayOfWeek::ALL)).await.unwrap();
        let mut budget = draft("Budget", &DayOfWeek::ALL);
        budget.category = Category::Finance;
        tracker.save_habit(budget).await.unwrap();
        tracker.toggle_completion(&run.id, date(20), date(20)).await.unwrap();

        let report = tracker.insights(ReportingPeriod::Week, date(20));
        assert_eq!(report.overall_percentage, 7);
        assert_eq!(report.categories.len(), 2);
        assert_eq!(
            tracker.filtered(CategoryFilter::Only(Category::Finance)).len(),
            1
        );
    }
}
