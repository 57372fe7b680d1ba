use std::collections::BTreeSet;

use crate::error::ValidationError;
use crate::habit::DayOfWeek;

/// Cadence label for a selection of weekdays. Duplicate days count once.
pub fn frequency_label(days: &[DayOfWeek]) -> Result<String, ValidationError> {
    let distinct: BTreeSet<DayOfWeek> = days.iter().copied().collect();
    if distinct.is_empty() {
        return Err(ValidationError::EmptySchedule);
    }
    Ok(label_for_count(distinct.len()))
}

pub(crate) fn label_for_count(count: usize) -> String {
    match count {
        7 => "Everyday".to_string(),
        1 => "Once a week".to_string(),
        n => format!("{n} times a week"),
    }
}
