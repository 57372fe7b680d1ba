use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};

use crate::habit::DayOfWeek;

pub const WINDOW_LEN: usize = 7;

/// One cell of the week strip. Recomputed per render, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionDay {
    pub date: NaiveDate,
    pub completed: bool,
    pub is_today: bool,
    pub is_future: bool,
    pub day_of_week: DayOfWeek,
    pub day_number: u32,
}

impl CompletionDay {
    pub fn for_date(date: NaiveDate, today: NaiveDate) -> Self {
        Self {
            date,
            completed: false,
            is_today: date == today,
            is_future: date > today,
            day_of_week: date.weekday().into(),
            day_number: date.day(),
        }
    }

    pub fn weekday_label(&self) -> &'static str {
        self.day_of_week.short_label()
    }
}

/// Rolling seven-day display window starting on the most recent anchor weekday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    anchor: DayOfWeek,
}

impl Default for DateWindow {
    fn default() -> Self {
        Self {
            anchor: DayOfWeek::Fri,
        }
    }
}

impl DateWindow {
    pub fn new(anchor: DayOfWeek) -> Self {
        Self { anchor }
    }

    pub fn anchor(&self) -> DayOfWeek {
        self.anchor
    }

    /// First date of the window containing `today`.
    pub fn start_for(&self, today: NaiveDate) -> NaiveDate {
        let current = today.weekday().num_days_from_monday();
        let anchor = self.anchor.to_weekday().num_days_from_monday();
        let back = (current + 7 - anchor) % 7;
        today - Duration::days(i64::from(back))
    }

    pub fn days(&self, today: NaiveDate) -> Vec<CompletionDay> {
        let start = self.start_for(today);
        (0..WINDOW_LEN as i64)
            .map(|offset| CompletionDay::for_date(start + Duration::days(offset), today))
            .collect()
    }

    /// Window for a reference instant, judged by the calendar date in the instant's own zone.
    pub fn for_instant<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Vec<CompletionDay> {
        self.days(now.date_naive())
    }
}
