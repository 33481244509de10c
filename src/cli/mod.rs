// src/cli/mod.rs — CLI definition (clap derive)

pub mod employees;
pub mod migrate;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "timesheet-bot",
    about = "Teams timesheet bot with daily reminders",
    version
)]
pub struct Cli {
    /// Config file path
    #[arg(long)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the bot endpoint and run the daily reminder (default)
    Serve,
    /// Send the reminder to every employee now, then exit
    Remind,
    /// Database migration management
    Migrate {
        /// Show migration status only
        #[arg(long)]
        status: bool,
        /// Roll back the last migration
        #[arg(long)]
        rollback: bool,
    },
    /// Manage the employee directory used by reminders
    Employees {
        #[command(subcommand)]
        action: EmployeeAction,
    },
}

#[derive(Subcommand, Clone)]
pub enum EmployeeAction {
    /// Add or rename an employee
    Add {
        /// Teams user id (the activity `from.id`)
        external_id: String,
        /// Display name used in reminders
        name: String,
    },
    /// List known employees
    List,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_no_subcommand() {
        let cli = Cli::try_parse_from(["timesheet-bot"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_parse_employee_add() {
        let cli = Cli::try_parse_from([
            "timesheet-bot",
            "--config",
            "/etc/timesheet.toml",
            "employees",
            "add",
            "29:abc",
            "Dana Scully",
        ])
        .unwrap();
        assert_eq!(cli.config.as_deref(), Some("/etc/timesheet.toml"));
        match cli.command {
            Some(Commands::Employees {
                action: EmployeeAction::Add { external_id, name },
            }) => {
                assert_eq!(external_id, "29:abc");
                assert_eq!(name, "Dana Scully");
            }
            _ => panic!("expected employees add"),
        }
    }

    #[test]
    fn test_parse_migrate_flags() {
        let cli = Cli::try_parse_from(["timesheet-bot", "migrate", "--status"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Migrate {
                status: true,
                rollback: false
            })
        ));
    }
}
