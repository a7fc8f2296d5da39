//! Configuration file support.
//!
//! Settings are read from a TOML file. Every field has a default, so an
//! empty or missing file yields a working setup: five weekdays, seven
//! one-hour periods, 200 placement attempts per session and a 30 hour
//! weekly ceiling per faculty member.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::TimetableError;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "TIMETABLE_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "timetable.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub scheduler: SchedulerSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// JSON document used to populate the in-memory store at startup.
    #[serde(default)]
    pub seed_path: Option<PathBuf>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            seed_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerSettings {
    /// Random cells tried per session before it is dropped.
    #[serde(default = "default_retry_budget")]
    pub retry_budget: u32,
    /// Weekly hour ceiling applied to every faculty member.
    #[serde(default = "default_faculty_hour_ceiling")]
    pub faculty_hour_ceiling: u32,
    #[serde(default)]
    pub calendar: Calendar,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            retry_budget: default_retry_budget(),
            faculty_hour_ceiling: default_faculty_hour_ceiling(),
            calendar: Calendar::default(),
        }
    }
}

/// The fixed weekly grid of (day, time) cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Calendar {
    #[serde(default = "default_days")]
    pub days: Vec<String>,
    #[serde(default = "default_times")]
    pub times: Vec<String>,
}

impl Default for Calendar {
    fn default() -> Self {
        Self {
            days: default_days(),
            times: default_times(),
        }
    }
}

impl Calendar {
    /// Number of (day, time) cells in a week.
    pub fn cell_count(&self) -> u32 {
        (self.days.len() * self.times.len()) as u32
    }

    pub fn day_index(&self, day: &str) -> Option<usize> {
        self.days.iter().position(|d| d == day)
    }

    pub fn time_index(&self, time: &str) -> Option<usize> {
        self.times.iter().position(|t| t == time)
    }
}

fn default_bind_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_retry_budget() -> u32 {
    200
}

fn default_faculty_hour_ceiling() -> u32 {
    30
}

fn default_days() -> Vec<String> {
    ["Monday", "Tuesday", "Wednesday", "Thursday", "Friday"]
        .iter()
        .map(|d| d.to_string())
        .collect()
}

fn default_times() -> Vec<String> {
    (9..16).map(|h| format!("{:02}:00-{:02}:00", h, h + 1)).collect()
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TimetableError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            TimetableError::Config(format!(
                "failed to read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, TimetableError> {
        let config: AppConfig = toml::from_str(content)
            .map_err(|e| TimetableError::Config(format!("failed to parse config: {}", e)))?;
        config.check()?;
        Ok(config)
    }

    /// Resolve configuration from `TIMETABLE_CONFIG`, then `timetable.toml`,
    /// then built-in defaults.
    pub fn load() -> Result<Self, TimetableError> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Self::from_file(path);
        }
        let local = Path::new(DEFAULT_CONFIG_FILE);
        if local.exists() {
            return Self::from_file(local);
        }
        Ok(Self::default())
    }

    fn check(&self) -> Result<(), TimetableError> {
        let calendar = &self.scheduler.calendar;
        if calendar.days.is_empty() || calendar.times.is_empty() {
            return Err(TimetableError::Config(
                "calendar needs at least one day and one time".to_string(),
            ));
        }
        if self.scheduler.retry_budget == 0 {
            return Err(TimetableError::Config(
                "retry_budget must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config.scheduler.retry_budget, 200);
        assert_eq!(config.scheduler.faculty_hour_ceiling, 30);
        assert_eq!(config.scheduler.calendar.cell_count(), 35);
        assert_eq!(config.scheduler.calendar.times[0], "09:00-10:00");
        assert_eq!(config.scheduler.calendar.times[6], "15:00-16:00");
        assert_eq!(config.server.bind_addr, "127.0.0.1:8080");
        assert!(config.server.seed_path.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_toml(
            r#"
            [server]
            bind_addr = "0.0.0.0:5000"
            seed_path = "data/seed.json"

            [scheduler]
            faculty_hour_ceiling = 20

            [scheduler.calendar]
            days = ["Mon", "Tue"]
            "#,
        )
        .unwrap();
        assert_eq!(config.server.bind_addr, "0.0.0.0:5000");
        assert_eq!(config.scheduler.faculty_hour_ceiling, 20);
        assert_eq!(config.scheduler.retry_budget, 200);
        assert_eq!(config.scheduler.calendar.cell_count(), 14);
        assert_eq!(config.scheduler.calendar.day_index("Tue"), Some(1));
    }

    #[test]
    fn test_rejects_empty_calendar() {
        let err = AppConfig::from_toml("[scheduler.calendar]\ndays = []\n").unwrap_err();
        assert!(matches!(err, TimetableError::Config(_)));
    }

    #[test]
    fn test_rejects_bad_toml() {
        assert!(AppConfig::from_toml("scheduler = 3").is_err());
    }
}
