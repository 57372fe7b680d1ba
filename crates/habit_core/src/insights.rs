use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::habit::{Category, Habit};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportingPeriod {
    Week,
    #[default]
    Month,
}

impl ReportingPeriod {
    pub fn days(self) -> u32 {
        match self {
            Self::Week => 7,
            Self::Month => 30,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Week => "Last 7 Days",
            Self::Month => "Last 30 Days",
        }
    }

    /// Dates covered by the period, oldest first, ending on `today`.
    pub fn dates(self, today: NaiveDate) -> Vec<NaiveDate> {
        let span = i64::from(self.days());
        (0..span)
            .map(|offset| today - Duration::days(span - 1 - offset))
            .collect()
    }
}

impl fmt::Display for ReportingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ReportingPeriod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "week" | "7" => Ok(Self::Week),
            "month" | "30" => Ok(Self::Month),
            _ => Err(ValidationError::UnknownValue {
                field: "reporting period",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyTally {
    pub date: NaiveDate,
    pub completed: u32,
    pub total: u32,
}

impl DailyTally {
    pub fn percentage(&self) -> u32 {
        rounded_percentage(u64::from(self.completed), u64::from(self.total))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: Category,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsightsReport {
    pub period: ReportingPeriod,
    pub daily: Vec<DailyTally>,
    pub overall_percentage: u32,
    pub categories: Vec<CategoryCount>,
}

impl InsightsReport {
    pub fn build(habits: &[Habit], period: ReportingPeriod, today: NaiveDate) -> Self {
        let daily = daily_tallies(habits, period, today);
        Self {
            period,
            overall_percentage: overall_percentage(&daily),
            daily,
            categories: category_breakdown(habits),
        }
    }
}

/// Per-day expected and completed counts. A habit only counts on its scheduled weekdays.
pub fn daily_tallies(
    habits: &[Habit],
    period: ReportingPeriod,
    today: NaiveDate,
) -> Vec<DailyTally> {
    period
        .dates(today)
        .into_iter()
        .map(|date| {
            let mut tally = DailyTally {
                date,
                completed: 0,
                total: 0,
            };
            for habit in habits.iter().filter(|h| h.schedule.is_expected_on(date)) {
                tally.total += 1;
                if habit.completion_history.is_completed(date) {
                    tally.completed += 1;
                }
            }
            tally
        })
        .collect()
}

/// Zero when nothing was expected over the period.
pub fn overall_percentage(tallies: &[DailyTally]) -> u32 {
    let completed: u64 = tallies.iter().map(|t| u64::from(t.completed)).sum();
    let total: u64 = tallies.iter().map(|t| u64::from(t.total)).sum();
    rounded_percentage(completed, total)
}

pub fn category_breakdown(habits: &[Habit]) -> Vec<CategoryCount> {
    let mut counts: BTreeMap<Category, usize> = BTreeMap::new();
    for habit in habits {
        *counts.entry(habit.category).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(category, count)| CategoryCount { category, count })
        .collect()
}

// Half-up rounding without floats.
fn rounded_percentage(completed: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    ((200 * completed + total) / (2 * total)) as u32
}
