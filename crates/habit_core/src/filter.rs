use std::str::FromStr;

use crate::error::ValidationError;
use crate::habit::{Category, Habit};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl CategoryFilter {
    /// Entries shown in the filter strip, in display order.
    pub const STRIP: [CategoryFilter; 5] = [
        CategoryFilter::All,
        CategoryFilter::Only(Category::Fitness),
        CategoryFilter::Only(Category::Nutrition),
        CategoryFilter::Only(Category::Finance),
        CategoryFilter::Only(Category::Other),
    ];

    pub fn matches(&self, habit: &Habit) -> bool {
        match self {
            Self::All => true,
            Self::Only(category) => habit.category == *category,
        }
    }

    pub fn apply<'a>(&self, habits: &'a [Habit]) -> Vec<&'a Habit> {
        habits.iter().filter(|habit| self.matches(habit)).collect()
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::All => "All",
            Self::Only(category) => category.filter_label(),
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        s.parse::<Category>().map(Self::Only)
    }
}
