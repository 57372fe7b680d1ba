use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::habit::{CompletionHistory, HabitId};
use crate::week::CompletionDay;

/// Request to persist a new completion state for one habit/date pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionIntent {
    pub habit_id: HabitId,
    pub date: NaiveDate,
    pub completed: bool,
}

/// Overlays a sparse history onto window descriptors.
pub fn merge(history: &CompletionHistory, window: &[CompletionDay]) -> Vec<CompletionDay> {
    window
        .iter()
        .map(|day| CompletionDay {
            completed: history.is_completed(day.date),
            ..day.clone()
        })
        .collect()
}

/// Flips a merged day. Future days cannot be marked, so they yield nothing.
pub fn toggle(habit_id: &HabitId, day: &CompletionDay) -> Option<CompletionIntent> {
    if day.is_future {
        return None;
    }
    Some(CompletionIntent {
        habit_id: habit_id.clone(),
        date: day.date,
        completed: !day.completed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::week::DateWindow;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn marks_only_recorded_days() {
        let history: CompletionHistory = [(date(2023, 4, 20), true)].into_iter().collect();
        let window = DateWindow::default().days(date(2023, 4, 20));
        let merged = merge(&history, &window);
        assert_eq!(merged.len(), 7);
        for day in &merged {
            assert_eq!(day.completed, day.date == date(2023, 4, 20));
        }
    }

    #[test]
    fn explicit_false_reads_as_not_completed() {
        let history: CompletionHistory = [(date(2023, 4, 18), false)].into_iter().collect();
        let window = DateWindow::default().days(date(2023, 4, 20));
        assert!(merge(&history, &window).iter().all(|day| !day.completed));
    }

    #[test]
    fn merging_is_idempotent() {
        let history: CompletionHistory = [(date(2023, 4, 15), true), (date(2023, 4, 17), true)]
            .into_iter()
            .collect();
        let window = DateWindow::default().days(date(2023, 4, 18));
        let once = merge(&history, &window);
        let twice = merge(&history, &once);
        assert_eq!(once, twice);
        assert_eq!(once, merge(&history, &window));
    }

    #[test]
    fn future_days_cannot_be_toggled() {
        let id = HabitId::from("h1");
        let mut history = CompletionHistory::new();
        let window = DateWindow::default().days(date(2023, 4, 21));
        let merged = merge(&history, &window);
        let tomorrow = &merged[1];
        assert!(tomorrow.is_future);
        assert_eq!(toggle(&id, tomorrow), None);
        let before = history.clone();
        if let Some(intent) = toggle(&id, tomorrow) {
            history.apply(intent.date, intent.completed);
        }
        assert_eq!(history, before);
    }

    #[test]
    fn toggling_today_flips_state() {
        let id = HabitId::from("h1");
        let today = date(2023, 4, 20);
        let history: CompletionHistory = [(today, true)].into_iter().collect();
        let merged = merge(&history, &DateWindow::default().days(today));
        let cell = merged.iter().find(|day| day.is_today).unwrap();
        let intent = toggle(&id, cell).unwrap();
        assert_eq!(
            intent,
            CompletionIntent {
                habit_id: id,
                date: today,
                completed: false
            }
        );
    }
}
