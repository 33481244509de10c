// src/cli/migrate.rs — Database migration command
//
// Migrations also run automatically whenever the store is opened; this
// command shows where a database stands and can undo the newest step.

use std::path::Path;

use crate::store::schema;

/// Show migration status, roll back the newest migration, or apply pending ones.
pub fn run_migrate(db_path: &Path, status_only: bool, rollback: bool) -> anyhow::Result<()> {
    if !db_path.exists() && (status_only || rollback) {
        println!("No database found at: {}", db_path.display());
        println!("Run `timesheet-bot migrate` to create it.");
        return Ok(());
    }

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let conn = rusqlite::Connection::open(db_path)?;

    if status_only {
        return show_migration_status(&conn, db_path);
    }

    if rollback {
        match schema::rollback_last(&conn)? {
            Some(version) => println!("Rolled back migration v{version}."),
            None => println!("Nothing to roll back."),
        }
        return show_migration_status(&conn, db_path);
    }

    println!("Running database migrations...");
    schema::run_migrations(&conn)?;
    println!("Migrations complete.");
    show_migration_status(&conn, db_path)
}

fn show_migration_status(conn: &rusqlite::Connection, db_path: &Path) -> anyhow::Result<()> {
    let applied = schema::applied_migrations(conn)?;
    let current = schema::current_version(conn)?;
    let latest = schema::latest_version();

    println!("Database: {}", db_path.display());
    println!("Current schema version: {current} (latest: {latest})");

    if applied.is_empty() {
        println!("No migrations have been run yet.");
        return Ok(());
    }

    println!();
    println!("Applied migrations:");
    for m in &applied {
        println!("  v{}: {} (applied {})", m.version, m.name, m.applied_at);
    }
    if current < latest {
        println!();
        println!("{} pending migration(s).", latest - current);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrate_then_rollback_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("data").join("timesheets.db");

        // Status on a missing database is not an error and creates nothing.
        run_migrate(&db, true, false).unwrap();
        assert!(!db.exists());

        run_migrate(&db, false, false).unwrap();
        let conn = rusqlite::Connection::open(&db).unwrap();
        assert_eq!(schema::current_version(&conn).unwrap(), schema::latest_version());
        drop(conn);

        run_migrate(&db, false, true).unwrap();
        let conn = rusqlite::Connection::open(&db).unwrap();
        assert_eq!(
            schema::current_version(&conn).unwrap(),
            schema::latest_version() - 1
        );
    }
}
