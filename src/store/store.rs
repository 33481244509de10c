// src/store/store.rs — SQLite operations

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::bot::activity::ConversationReference;
use crate::infra::errors::TimesheetError;
use crate::store::schema;
use crate::timesheet::types::{Employee, EntryId, SubmissionRecord, SubmissionRow, TaskType};

type Result<T> = std::result::Result<T, TimesheetError>;

const INSERT_SUBMISSION: &str =
    "INSERT INTO submissions (employee_id, project_id, date, hours, task_type, tasks, remarks, timestamp, entry_id)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
     ON CONFLICT (employee_id, date, entry_id) DO NOTHING";

/// Low-level SQLite operations for timesheet data.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Open (or create) the database at `path` and bring the schema up to date.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        schema::run_migrations(&conn)?;
        Ok(Self::new(conn))
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        schema::run_migrations(&conn)?;
        Ok(Self::new(conn))
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    // -- Submissions --

    pub fn insert_submission(&self, record: &SubmissionRecord) -> Result<i64> {
        insert_record(&self.conn, record, &Utc::now().to_rfc3339())
    }

    /// Insert every record of one submission in a single transaction.
    /// Either all rows land or none do. Replaying a submission that already
    /// landed writes nothing and returns the existing row ids.
    pub fn insert_submissions(&self, records: &[SubmissionRecord]) -> Result<Vec<i64>> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.unchecked_transaction()?;
        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            ids.push(insert_record(&tx, record, &now)?);
        }
        tx.commit()?;
        Ok(ids)
    }

    pub fn query_submissions(&self, employee_id: &str, date: NaiveDate) -> Result<Vec<SubmissionRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, employee_id, project_id, date, hours, task_type, tasks, remarks, timestamp, entry_id
             FROM submissions WHERE employee_id = ?1 AND date = ?2
             ORDER BY id",
        )?;

        let rows = stmt.query_map(params![employee_id, date.to_string()], |row| {
            let date: String = row.get(3)?;
            let task_type: String = row.get(5)?;
            let inserted_at: String = row.get(8)?;
            let entry_id = match row.get::<_, Option<String>>(9)? {
                Some(raw) => raw
                    .parse::<EntryId>()
                    .map_err(|e| conversion_error(9, e))?,
                None => EntryId::placeholder(),
            };
            Ok(SubmissionRow {
                id: row.get(0)?,
                record: SubmissionRecord {
                    entry_id,
                    employee_id: row.get(1)?,
                    project_id: row.get(2)?,
                    date: date.parse().map_err(|e| conversion_error(3, e))?,
                    hours: row.get(4)?,
                    task_type: task_type
                        .parse::<TaskType>()
                        .map_err(|e| conversion_error(5, StrError(e)))?,
                    tasks_completed: row.get(6)?,
                    remarks: row.get(7)?,
                },
                inserted_at: DateTime::parse_from_rfc3339(&inserted_at)
                    .map_err(|e| conversion_error(8, e))?
                    .with_timezone(&Utc),
            })
        })?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    // -- Employees --

    pub fn upsert_employee(&self, employee: &Employee) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO employees (teams_id, name, created_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(teams_id) DO UPDATE SET name = excluded.name",
            params![employee.external_id, employee.name, now],
        )?;
        Ok(())
    }

    pub fn list_employees(&self) -> Result<Vec<Employee>> {
        let mut stmt = self
            .conn
            .prepare("SELECT teams_id, name FROM employees ORDER BY name, teams_id")?;
        let rows = stmt.query_map([], |row| {
            Ok(Employee {
                external_id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    // -- Conversation references --

    pub fn save_reference(&self, user_id: &str, reference: &ConversationReference) -> Result<()> {
        let json = serde_json::to_string(reference)?;
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO conversation_references (user_id, reference_json, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET
                reference_json = excluded.reference_json,
                updated_at = excluded.updated_at",
            params![user_id, json, now],
        )?;
        Ok(())
    }

    pub fn load_reference(&self, user_id: &str) -> Result<Option<ConversationReference>> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT reference_json FROM conversation_references WHERE user_id = ?1",
                [user_id],
                |row| row.get(0),
            )
            .optional()?;

        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}

fn insert_record(conn: &Connection, record: &SubmissionRecord, now: &str) -> Result<i64> {
    let date = record.date.to_string();
    // The placeholder entry of an empty form is not unique per day: NULL never conflicts.
    let entry_id = (!record.entry_id.is_placeholder()).then(|| record.entry_id.to_string());

    let inserted = conn.execute(
        INSERT_SUBMISSION,
        params![
            record.employee_id,
            record.project_id,
            date,
            record.hours,
            record.task_type.as_str(),
            record.tasks_completed,
            record.remarks,
            now,
            entry_id
        ],
    )?;
    if inserted > 0 {
        return Ok(conn.last_insert_rowid());
    }

    tracing::debug!(
        "Entry {} of {} on {} already recorded",
        record.entry_id,
        record.employee_id,
        date
    );
    let id = conn.query_row(
        "SELECT id FROM submissions WHERE employee_id = ?1 AND date = ?2 AND entry_id = ?3",
        params![record.employee_id, date, entry_id],
        |row| row.get(0),
    )?;
    Ok(id)
}

#[derive(Debug)]
struct StrError(String);

impl std::fmt::Display for StrError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for StrError {}

fn conversion_error<E>(column: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(err))
}
