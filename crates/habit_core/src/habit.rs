use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::frequency;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HabitId(pub String);

impl HabitId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HabitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for HabitId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Fitness,
    Nutrition,
    Education,
    Career,
    Finance,
    Other,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Fitness,
        Category::Nutrition,
        Category::Education,
        Category::Career,
        Category::Finance,
        Category::Other,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            Self::Fitness => "fitness",
            Self::Nutrition => "nutrition",
            Self::Education => "education",
            Self::Career => "career",
            Self::Finance => "finance",
            Self::Other => "other",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Fitness => "Fitness",
            Self::Nutrition => "Nutrition",
            Self::Education => "Education",
            Self::Career => "Career",
            Self::Finance => "Finance",
            Self::Other => "Other",
        }
    }

    /// Shorter wording used by the filter strip.
    pub fn filter_label(self) -> &'static str {
        match self {
            Self::Nutrition => "Diet",
            Self::Finance => "Finances",
            other => other.label(),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Category::ALL
            .into_iter()
            .find(|cat| cat.tag().eq_ignore_ascii_case(needle))
            .ok_or_else(|| ValidationError::UnknownValue {
                field: "category",
                value: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Mon,
        DayOfWeek::Tue,
        DayOfWeek::Wed,
        DayOfWeek::Thu,
        DayOfWeek::Fri,
        DayOfWeek::Sat,
        DayOfWeek::Sun,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            Self::Mon => "mon",
            Self::Tue => "tue",
            Self::Wed => "wed",
            Self::Thu => "thu",
            Self::Fri => "fri",
            Self::Sat => "sat",
            Self::Sun => "sun",
        }
    }

    pub fn short_label(self) -> &'static str {
        match self {
            Self::Mon => "Mon",
            Self::Tue => "Tue",
            Self::Wed => "Wed",
            Self::Thu => "Thu",
            Self::Fri => "Fri",
            Self::Sat => "Sat",
            Self::Sun => "Sun",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Mon => "Monday",
            Self::Tue => "Tuesday",
            Self::Wed => "Wednesday",
            Self::Thu => "Thursday",
            Self::Fri => "Friday",
            Self::Sat => "Saturday",
            Self::Sun => "Sunday",
        }
    }

    pub fn to_weekday(self) -> Weekday {
        match self {
            Self::Mon => Weekday::Mon,
            Self::Tue => Weekday::Tue,
            Self::Wed => Weekday::Wed,
            Self::Thu => Weekday::Thu,
            Self::Fri => Weekday::Fri,
            Self::Sat => Weekday::Sat,
            Self::Sun => Weekday::Sun,
        }
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(value: Weekday) -> Self {
        match value {
            Weekday::Mon => Self::Mon,
            Weekday::Tue => Self::Tue,
            Weekday::Wed => Self::Wed,
            Weekday::Thu => Self::Thu,
            Weekday::Fri => Self::Fri,
            Weekday::Sat => Self::Sat,
            Weekday::Sun => Self::Sun,
        }
    }
}

impl FromStr for DayOfWeek {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        DayOfWeek::ALL
            .into_iter()
            .find(|day| {
                day.tag().eq_ignore_ascii_case(needle) || day.label().eq_ignore_ascii_case(needle)
            })
            .ok_or_else(|| ValidationError::UnknownValue {
                field: "weekday",
                value: s.to_string(),
            })
    }
}

/// Weekdays a habit is expected on. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<DayOfWeek>", into = "Vec<DayOfWeek>")]
pub struct Schedule(BTreeSet<DayOfWeek>);

impl Schedule {
    pub fn new(days: impl IntoIterator<Item = DayOfWeek>) -> Result<Self, ValidationError> {
        let set: BTreeSet<DayOfWeek> = days.into_iter().collect();
        if set.is_empty() {
            return Err(ValidationError::EmptySchedule);
        }
        Ok(Self(set))
    }

    pub fn everyday() -> Self {
        Self(DayOfWeek::ALL.into_iter().collect())
    }

    pub fn weekdays() -> Self {
        Self(DayOfWeek::ALL[..5].iter().copied().collect())
    }

    pub fn contains(&self, day: DayOfWeek) -> bool {
        self.0.contains(&day)
    }

    pub fn is_expected_on(&self, date: NaiveDate) -> bool {
        use chrono::Datelike;
        self.contains(date.weekday().into())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn days(&self) -> impl Iterator<Item = DayOfWeek> + '_ {
        self.0.iter().copied()
    }

    pub fn frequency_label(&self) -> String {
        frequency::label_for_count(self.0.len())
    }
}

impl TryFrom<Vec<DayOfWeek>> for Schedule {
    type Error = ValidationError;

    fn try_from(value: Vec<DayOfWeek>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Schedule> for Vec<DayOfWeek> {
    fn from(value: Schedule) -> Self {
        value.0.into_iter().collect()
    }
}

/// Mapping of calendar dates the user explicitly marked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompletionHistory(BTreeMap<NaiveDate, bool>);

impl CompletionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_completed(&self, date: NaiveDate) -> bool {
        self.0.get(&date).copied().unwrap_or(false)
    }

    pub fn entry(&self, date: NaiveDate) -> Option<bool> {
        self.0.get(&date).copied()
    }

    /// Sets the state for `date` and returns what was recorded before.
    /// Unmarking drops the entry so that absence keeps meaning "not completed".
    pub fn apply(&mut self, date: NaiveDate, completed: bool) -> Option<bool> {
        if completed {
            self.0.insert(date, true)
        } else {
            self.0.remove(&date)
        }
    }

    /// Puts back a value captured by [`CompletionHistory::apply`].
    pub fn restore(&mut self, date: NaiveDate, previous: Option<bool>) {
        match previous {
            Some(value) => {
                self.0.insert(date, value);
            }
            None => {
                self.0.remove(&date);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, bool)> + '_ {
        self.0.iter().map(|(date, done)| (*date, *done))
    }
}

impl FromIterator<(NaiveDate, bool)> for CompletionHistory {
    fn from_iter<T: IntoIterator<Item = (NaiveDate, bool)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Validated, store-ready habit fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitFields {
    pub title: String,
    pub description: Option<String>,
    pub category: Category,
    pub schedule: Schedule,
    pub frequency: String,
}

/// Raw form input for creating or editing a habit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HabitDraft {
    pub id: Option<HabitId>,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub schedule: Vec<DayOfWeek>,
}

impl Default for HabitDraft {
    fn default() -> Self {
        Self {
            id: None,
            title: String::new(),
            description: String::new(),
            category: Category::Fitness,
            schedule: DayOfWeek::ALL[..5].to_vec(),
        }
    }
}

impl HabitDraft {
    pub fn editing(habit: &Habit) -> Self {
        Self {
            id: Some(habit.id.clone()),
            title: habit.title.clone(),
            description: habit.description.clone().unwrap_or_default(),
            category: habit.category,
            schedule: habit.schedule.days().collect(),
        }
    }

    /// Flips a day in or out of the selection, like the day buttons on the form.
    pub fn toggle_day(&mut self, day: DayOfWeek) {
        if let Some(pos) = self.schedule.iter().position(|d| *d == day) {
            self.schedule.remove(pos);
        } else {
            self.schedule.push(day);
        }
    }

    pub fn validate(&self) -> Result<HabitFields, ValidationError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        let schedule = Schedule::new(self.schedule.iter().copied())?;
        let description = self.description.trim();
        Ok(HabitFields {
            title: title.to_string(),
            description: (!description.is_empty()).then(|| description.to_string()),
            category: self.category,
            frequency: schedule.frequency_label(),
            schedule,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitRecord {
    pub id: HabitId,
    pub user_id: UserId,
    pub title: String,
    pub description: Option<String>,
    pub category: Category,
    pub schedule: Schedule,
    pub frequency: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl HabitRecord {
    pub fn apply_fields(&mut self, fields: &HabitFields, now: DateTime<Utc>) {
        self.title = fields.title.clone();
        self.description = fields.description.clone();
        self.category = fields.category;
        self.schedule = fields.schedule.clone();
        self.frequency = fields.frequency.clone();
        self.updated_at = now;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub habit_id: HabitId,
    pub user_id: UserId,
    pub date: NaiveDate,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Habit {
    pub id: HabitId,
    pub title: String,
    pub description: Option<String>,
    pub category: Category,
    pub schedule: Schedule,
    pub frequency: String,
    pub completion_history: CompletionHistory,
}

impl Habit {
    pub fn from_record(record: HabitRecord, completion_history: CompletionHistory) -> Self {
        Self {
            id: record.id,
            title: record.title,
            description: record.description,
            category: record.category,
            schedule: record.schedule,
            frequency: record.frequency,
            completion_history,
        }
    }

    pub fn apply_fields(&mut self, fields: &HabitFields) {
        self.title = fields.title.clone();
        self.description = fields.description.clone();
        self.category = fields.category;
        self.schedule = fields.schedule.clone();
        self.frequency = fields.frequency.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn empty_schedule_is_rejected() {
        assert_eq!(Schedule::new(Vec::new()), Err(ValidationError::EmptySchedule));
        let parsed: Result<Schedule, _> = serde_json::from_str("[]");
        assert!(parsed.is_err());
    }

    #[test]
    fn schedule_serializes_as_tags_in_week_order() {
        let schedule = Schedule::new([DayOfWeek::Fri, DayOfWeek::Mon, DayOfWeek::Fri]).unwrap();
        assert_eq!(schedule.len(), 2);
        assert_eq!(serde_json::to_string(&schedule).unwrap(), r#"["mon","fri"]"#);
    }

    #[test]
    fn draft_validation_trims_and_derives_frequency() {
        let draft = HabitDraft {
            title: "  Yoga ".into(),
            description: "   ".into(),
            schedule: vec![DayOfWeek::Mon, DayOfWeek::Thu],
            ..HabitDraft::default()
        };
        let fields = draft.validate().unwrap();
        assert_eq!(fields.title, "Yoga");
        assert_eq!(fields.description, None);
        assert_eq!(fields.frequency, "2 times a week");
    }

    #[test]
    fn draft_requires_title_and_days() {
        let mut draft = HabitDraft::default();
        assert_eq!(draft.validate(), Err(ValidationError::EmptyTitle));
        draft.title = "Read".into();
        draft.schedule.clear();
        assert_eq!(draft.validate(), Err(ValidationError::EmptySchedule));
        draft.toggle_day(DayOfWeek::Sun);
        assert_eq!(draft.validate().unwrap().frequency, "Once a week");
        draft.toggle_day(DayOfWeek::Sun);
        assert!(draft.schedule.is_empty());
    }

    #[test]
    fn unmarking_removes_the_entry() {
        let mut history = CompletionHistory::new();
        let day = date(2023, 4, 20);
        assert_eq!(history.apply(day, true), None);
        assert!(history.is_completed(day));
        assert_eq!(history.apply(day, false), Some(true));
        assert!(history.is_empty());
        history.restore(day, Some(true));
        assert_eq!(history.entry(day), Some(true));
    }

    #[test]
    fn history_uses_iso_date_keys() {
        let history: CompletionHistory = serde_json::from_str(r#"{"2023-04-20": true}"#).unwrap();
        assert!(history.is_completed(date(2023, 4, 20)));
        assert!(!history.is_completed(date(2023, 4, 21)));
    }

    #[test]
    fn parses_tags_case_insensitively() {
        assert_eq!("Finance".parse::<Category>().unwrap(), Category::Finance);
        assert_eq!("WED".parse::<DayOfWeek>().unwrap(), DayOfWeek::Wed);
        assert_eq!("thursday".parse::<DayOfWeek>().unwrap(), DayOfWeek::Thu);
        assert!("gym".parse::<Category>().is_err());
    }
}
