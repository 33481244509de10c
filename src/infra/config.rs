// src/infra/config.rs — Configuration loading (TOML)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::infra::paths;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub bot: BotConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub timesheet: TimesheetConfig,

    #[serde(default)]
    pub reminder: ReminderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 3978,
        }
    }
}

/// Bot Framework registration. Credentials normally come from the
/// environment; see [`Config::apply_env`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub app_id: Option<String>,
    pub app_password: Option<String>,
    pub token_endpoint: String,
    pub oauth_scope: String,
    pub request_timeout_seconds: u64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            app_id: None,
            app_password: None,
            token_endpoint:
                "https://login.microsoftonline.com/botframework.com/oauth2/v2.0/token".into(),
            oauth_scope: "https://api.botframework.com/.default".into(),
            request_timeout_seconds: 15,
        }
    }
}

impl BotConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Defaults to `timesheets.db` in the data directory.
    pub path: Option<PathBuf>,
    pub call_timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            call_timeout_seconds: 5,
        }
    }
}

impl DatabaseConfig {
    pub fn resolved_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(paths::db_path)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_seconds.max(1))
    }
}

/// One selectable project in the form's project picker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectChoice {
    pub title: String,
    pub value: String,
}

impl ProjectChoice {
    pub fn new(title: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimesheetConfig {
    /// Totals below this are accepted but flagged.
    pub full_day_hours: f64,
    pub max_hours_per_entry: f64,
    #[serde(default = "default_projects")]
    pub projects: Vec<ProjectChoice>,
    /// Idle sessions older than this are evicted. `None` keeps them forever.
    #[serde(default)]
    pub session_ttl_minutes: Option<u64>,
}

fn default_projects() -> Vec<ProjectChoice> {
    vec![
        ProjectChoice::new("Project Alpha", "project-alpha"),
        ProjectChoice::new("Project Beta", "project-beta"),
    ]
}

impl Default for TimesheetConfig {
    fn default() -> Self {
        Self {
            full_day_hours: 8.0,
            max_hours_per_entry: 24.0,
            projects: default_projects(),
            session_ttl_minutes: None,
        }
    }
}

impl TimesheetConfig {
    pub fn session_ttl(&self) -> Option<Duration> {
        self.session_ttl_minutes.map(|m| Duration::from_secs(m * 60))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReminderConfig {
    pub enabled: bool,
    /// Local wall-clock time, "HH:MM".
    pub time: String,
    pub send_timeout_seconds: u64,
    pub max_concurrent_sends: usize,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            time: "18:00".into(),
            send_timeout_seconds: 20,
            max_concurrent_sends: 4,
        }
    }
}

impl ReminderConfig {
    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_seconds.max(1))
    }
}

impl Config {
    /// Load config from file, falling back to defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = paths::config_file_path();
        let mut config = if path.exists() {
            Self::load_from(&path)?
        } else {
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.apply_env();
        Ok(config)
    }

    /// Environment variables override bot credentials and the port.
    pub fn apply_env(&mut self) {
        if let Ok(id) = std::env::var("MICROSOFT_APP_ID") {
            if !id.is_empty() {
                self.bot.app_id = Some(id);
            }
        }
        if let Ok(password) = std::env::var("MICROSOFT_APP_PASSWORD") {
            if !password.is_empty() {
                self.bot.app_password = Some(password);
            }
        }
        if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
    }

    /// Check values that would otherwise fail at first use.
    pub fn validate(&self) -> Result<(), crate::infra::errors::TimesheetError> {
        use crate::infra::errors::TimesheetError;

        if crate::infra::scheduler::parse_daily_time(&self.reminder.time).is_none() {
            return Err(TimesheetError::Config(format!(
                "reminder.time must be HH:MM, got '{}'",
                self.reminder.time
            )));
        }
        if self.timesheet.projects.is_empty() {
            return Err(TimesheetError::Config(
                "timesheet.projects must list at least one project".into(),
            ));
        }
        let max = self.timesheet.max_hours_per_entry;
        if max.is_nan() || max <= 0.0 {
            return Err(TimesheetError::Config(
                "timesheet.max_hours_per_entry must be positive".into(),
            ));
        }
        if self.reminder.max_concurrent_sends == 0 {
            return Err(TimesheetError::Config(
                "reminder.max_concurrent_sends must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
