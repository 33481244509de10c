// src/infra/paths.rs — XDG-compliant path management
//
// All paths respect the TIMESHEET_HOME environment variable for isolation.
// When TIMESHEET_HOME is set, config and data live under that directory.
// When unset, config uses ~/.timesheet-bot/ and data uses XDG_DATA_HOME/timesheet-bot.

use directories::{BaseDirs, ProjectDirs};
use std::path::PathBuf;

/// Returns the TIMESHEET_HOME override, if set.
fn timesheet_home() -> Option<PathBuf> {
    std::env::var_os("TIMESHEET_HOME").map(PathBuf::from)
}

/// Home directory, falling back to the working directory on hosts without one.
pub fn dirs_home() -> PathBuf {
    BaseDirs::new()
        .map(|b| b.home_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Configuration directory: $TIMESHEET_HOME/ or ~/.timesheet-bot/
pub fn config_dir() -> PathBuf {
    if let Some(home) = timesheet_home() {
        return home;
    }
    dirs_home().join(".timesheet-bot")
}

/// Data directory: $TIMESHEET_HOME/data/ or ~/.local/share/timesheet-bot/
pub fn data_dir() -> PathBuf {
    if let Some(home) = timesheet_home() {
        return home.join("data");
    }
    ProjectDirs::from("", "", "timesheet-bot")
        .map(|p| p.data_local_dir().to_path_buf())
        .unwrap_or_else(|| config_dir().join("data"))
}

/// Config file path
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Default database path
pub fn db_path() -> PathBuf {
    data_dir().join("timesheets.db")
}
