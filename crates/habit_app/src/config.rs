use std::path::PathBuf;

use anyhow::Result;
use habit_core::{habit::DayOfWeek, insights::ReportingPeriod};
use tracing::{info, warn};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub week_anchor: DayOfWeek,
    pub report_period: ReportingPeriod,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable source; unusable values keep the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(dir) = lookup("HABITS_DATA_DIR") {
            let dir = dir.trim();
            if !dir.is_empty() {
                config.data_dir = PathBuf::from(dir);
            }
        }
        if let Some(anchor) = lookup("HABITS_WEEK_ANCHOR") {
            match anchor.parse::<DayOfWeek>() {
                Ok(day) => config.week_anchor = day,
                Err(err) => warn!(%err, "ignoring HABITS_WEEK_ANCHOR"),
            }
        }
        if let Some(period) = lookup("HABITS_REPORT_PERIOD") {
            match period.parse::<ReportingPeriod>() {
                Ok(value) => config.report_period = value,
                Err(err) => warn!(%err, "ignoring HABITS_REPORT_PERIOD"),
            }
        }
        info!(data_dir = %config.data_dir.display(), "configuration loaded");
        Ok(config)
    }

    pub fn with_data_dir(mut self, dir: Option<PathBuf>) -> Self {
        if let Some(dir) = dir {
            self.data_dir = dir;
        }
        self
    }

    pub fn habits_path(&self) -> PathBuf {
        self.data_dir.join("habits.json")
    }

    pub fn identity_path(&self) -> PathBuf {
        self.data_dir.join("identity.json")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".habits"),
            week_anchor: DayOfWeek::Fri,
            report_period: ReportingPeriod::Month,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn reads_known_variables() {
        let config = AppConfig::from_lookup(lookup(&[
            ("HABITS_DATA_DIR", "/tmp/habits"),
            ("HABITS_WEEK_ANCHOR", "mon"),
            ("HABITS_REPORT_PERIOD", "week"),
        ]))
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/habits"));
        assert_eq!(config.week_anchor, DayOfWeek::Mon);
        assert_eq!(config.report_period, ReportingPeriod::Week);
        assert_eq!(config.habits_path(), PathBuf::from("/tmp/habits/habits.json"));
    }

    #[test]
    fn bad_values_fall_back_to_defaults() {
        let config = AppConfig::from_lookup(lookup(&[
            ("HABITS_DATA_DIR", "  "),
            ("HABITS_WEEK_ANCHOR", "someday"),
            ("HABITS_REPORT_PERIOD", "decade"),
        ]))
        .unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn flag_overrides_data_dir() {
        let config = AppConfig::default().with_data_dir(Some(PathBuf::from("elsewhere")));
        assert_eq!(config.identity_path(), PathBuf::from("elsewhere/identity.json"));
    }
}
