// src/timesheet/types.rs — Timesheet domain types

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of one project entry inside a timesheet form.
///
/// Generated once when the entry is created and never changed; every input
/// field rendered for the entry is keyed by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(Uuid);

impl EntryId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The id given to the blank entry synthesized for an empty form.
    /// Deterministic, so normalizing an empty list always renders the same form.
    pub fn placeholder() -> Self {
        Self(Uuid::nil())
    }

    pub fn is_placeholder(&self) -> bool {
        self.0.is_nil()
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

impl FromStr for EntryId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    #[default]
    Development,
    Design,
    Meeting,
    Testing,
    Research,
    Documentation,
}

impl TaskType {
    pub const ALL: [TaskType; 6] = [
        TaskType::Development,
        TaskType::Design,
        TaskType::Meeting,
        TaskType::Testing,
        TaskType::Research,
        TaskType::Documentation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Development => "development",
            TaskType::Design => "design",
            TaskType::Meeting => "meeting",
            TaskType::Testing => "testing",
            TaskType::Research => "research",
            TaskType::Documentation => "documentation",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            TaskType::Development => "Development",
            TaskType::Design => "Design",
            TaskType::Meeting => "Meeting",
            TaskType::Testing => "Testing",
            TaskType::Research => "Research",
            TaskType::Documentation => "Documentation",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        TaskType::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| format!("unknown task type '{s}'"))
    }
}

/// One project/hours/task row of a day's timesheet, as currently edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectEntry {
    pub id: EntryId,
    /// Selected project value; empty until the user picks one.
    pub project: String,
    pub hours: f64,
    pub task_type: TaskType,
    pub tasks: String,
}

impl ProjectEntry {
    pub fn blank() -> Self {
        Self::blank_with_id(EntryId::new())
    }

    pub fn placeholder() -> Self {
        Self::blank_with_id(EntryId::placeholder())
    }

    pub(crate) fn blank_with_id(id: EntryId) -> Self {
        Self {
            id,
            project: String::new(),
            hours: 0.0,
            task_type: TaskType::default(),
            tasks: String::new(),
        }
    }
}

/// Which input of an entry's section a form field holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldKind {
    Project,
    Hours,
    TaskType,
    Tasks,
}

impl FieldKind {
    pub const ALL: [FieldKind; 4] = [
        FieldKind::Project,
        FieldKind::Hours,
        FieldKind::TaskType,
        FieldKind::Tasks,
    ];

    pub fn prefix(&self) -> &'static str {
        match self {
            FieldKind::Project => "project",
            FieldKind::Hours => "hours",
            FieldKind::TaskType => "task-type",
            FieldKind::Tasks => "tasks",
        }
    }

    /// Human label used in validation messages.
    pub fn label(&self) -> &'static str {
        match self {
            FieldKind::Project => "project",
            FieldKind::Hours => "hours",
            FieldKind::TaskType => "task type",
            FieldKind::Tasks => "tasks completed",
        }
    }
}

/// Structured identity of one rendered input: which entry, which field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldKey {
    pub entry: EntryId,
    pub kind: FieldKind,
}

impl FieldKey {
    pub fn new(entry: EntryId, kind: FieldKind) -> Self {
        Self { entry, kind }
    }

    /// Input id as it appears in the card, e.g. `hours-<uuid>`.
    pub fn field_id(&self) -> String {
        format!("{}-{}", self.kind.prefix(), self.entry)
    }
}

/// A validated row ready to be written for one entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    /// The form entry this row came from. Writing the same entry of the same
    /// day twice keeps the first row.
    pub entry_id: EntryId,
    pub employee_id: String,
    pub project_id: String,
    pub date: NaiveDate,
    pub hours: f64,
    pub task_type: TaskType,
    pub tasks_completed: String,
    pub remarks: String,
}

/// A persisted submission row.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionRow {
    pub id: i64,
    #[serde(flatten)]
    pub record: SubmissionRecord,
    pub inserted_at: DateTime<Utc>,
}

/// An employee known to the reminder job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    /// Chat-platform user id (`from.id` on incoming activities).
    pub external_id: String,
    pub name: String,
}
