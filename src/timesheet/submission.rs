// src/timesheet/submission.rs — Submission aggregation and persistence
//
// Submitting is all-or-nothing: every entry is validated before anything is
// written, and the records of one submission go to the store as one batch.

use std::fmt;

use chrono::NaiveDate;

use crate::infra::config::TimesheetConfig;
use crate::infra::errors::TimesheetError;
use crate::store::StoreHandle;
use crate::timesheet::card::{DATE_FIELD, REMARKS_FIELD};
use crate::timesheet::session::UserSession;
use crate::timesheet::types::{FieldKey, FieldKind, SubmissionRecord, TaskType};
use crate::timesheet::values::FormValues;

const REQUIRED_FIELDS_MESSAGE: &str =
    "Please fill in all required fields for all projects (Project, Hours, Tasks).";

/// What is wrong with one input.
#[derive(Debug, Clone, PartialEq)]
pub enum Issue {
    Missing,
    NotANumber(String),
    OutOfRange(f64),
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldProblem {
    /// 1-based position of the entry on the card.
    pub entry_number: usize,
    pub field: FieldKind,
    pub issue: Issue,
}

impl fmt::Display for FieldProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = self.field.label();
        let n = self.entry_number;
        match &self.issue {
            Issue::Missing => write!(f, "Project #{n}: {label} is required"),
            Issue::NotANumber(raw) => write!(f, "Project #{n}: {label} \"{raw}\" is not a number"),
            Issue::OutOfRange(v) => write!(f, "Project #{n}: {label} {v} is out of range"),
            Issue::Unknown(raw) => write!(f, "Project #{n}: unknown {label} \"{raw}\""),
        }
    }
}

/// Every problem found in one submit attempt.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    pub problems: Vec<FieldProblem>,
    pub date_problem: Option<String>,
}

impl ValidationReport {
    pub fn is_empty(&self) -> bool {
        self.problems.is_empty() && self.date_problem.is_none()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REQUIRED_FIELDS_MESSAGE)?;
        if let Some(raw) = &self.date_problem {
            write!(f, "\n- Date \"{raw}\" is not a valid date (YYYY-MM-DD)")?;
        }
        for problem in &self.problems {
            write!(f, "\n- {problem}")?;
        }
        Ok(())
    }
}

/// A validated submission, ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub employee_id: String,
    pub date: NaiveDate,
    pub remarks: String,
    pub records: Vec<SubmissionRecord>,
    pub total_hours: f64,
}

/// Outcome of a persisted submission.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionSummary {
    pub row_ids: Vec<i64>,
    pub entries: usize,
    pub total_hours: f64,
    pub below_full_day: bool,
    pub full_day_hours: f64,
}

impl SubmissionSummary {
    /// Confirmation text shown to the user.
    pub fn message(&self) -> String {
        let total = round2(self.total_hours);
        if self.below_full_day {
            format!(
                "⚠ Warning: Total hours ({total}) less than {}! Submission was still recorded.",
                self.full_day_hours
            )
        } else {
            format!("✅ Timesheet submitted successfully! Total hours: {total}")
        }
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Join the returned card values against the session's entries and validate
/// them. Nothing is produced unless every entry is complete.
pub fn assemble(
    employee_id: &str,
    session: &UserSession,
    values: &FormValues,
    today: NaiveDate,
    settings: &TimesheetConfig,
) -> Result<Submission, ValidationReport> {
    let mut report = ValidationReport::default();

    let date = match values.non_empty(DATE_FIELD) {
        None => today,
        Some(raw) => match NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
            Ok(date) => date,
            Err(_) => {
                report.date_problem = Some(raw);
                today
            }
        },
    };
    let remarks = values.text(REMARKS_FIELD).unwrap_or_default();

    let mut records = Vec::with_capacity(session.entries.len());
    for (index, entry) in session.entries.iter().enumerate() {
        let entry_number = index + 1;
        let input = |kind: FieldKind| {
            let key = FieldKey::new(entry.id, kind);
            session
                .fields
                .field_id(&key)
                .map(str::to_owned)
                .unwrap_or_else(|| key.field_id())
        };
        let mut problem = |field: FieldKind, issue: Issue| {
            report.problems.push(FieldProblem {
                entry_number,
                field,
                issue,
            })
        };

        let project = values.non_empty(&input(FieldKind::Project));
        if project.is_none() {
            problem(FieldKind::Project, Issue::Missing);
        }

        let hours = match values.number(&input(FieldKind::Hours)) {
            None => {
                problem(FieldKind::Hours, Issue::Missing);
                None
            }
            Some(Err(raw)) => {
                problem(FieldKind::Hours, Issue::NotANumber(raw));
                None
            }
            Some(Ok(h)) if h < 0.0 || h > settings.max_hours_per_entry => {
                problem(FieldKind::Hours, Issue::OutOfRange(h));
                None
            }
            Some(Ok(h)) => Some(h),
        };

        let task_type = match values.non_empty(&input(FieldKind::TaskType)) {
            None => Some(TaskType::default()),
            Some(raw) => match raw.parse::<TaskType>() {
                Ok(t) => Some(t),
                Err(_) => {
                    problem(FieldKind::TaskType, Issue::Unknown(raw));
                    None
                }
            },
        };

        let tasks = values.non_empty(&input(FieldKind::Tasks));
        if tasks.is_none() {
            problem(FieldKind::Tasks, Issue::Missing);
        }

        if let (Some(project_id), Some(hours), Some(task_type), Some(tasks_completed)) =
            (project, hours, task_type, tasks)
        {
            records.push(SubmissionRecord {
                entry_id: entry.id,
                employee_id: employee_id.to_string(),
                project_id,
                date,
                hours,
                task_type,
                tasks_completed,
                remarks: remarks.clone(),
            });
        }
    }

    if !report.is_empty() {
        return Err(report);
    }

    let total_hours = records.iter().map(|r| r.hours).sum();
    Ok(Submission {
        employee_id: employee_id.to_string(),
        date,
        remarks,
        records,
        total_hours,
    })
}

/// Write all records of `submission` in one batch.
pub async fn persist(
    store: &StoreHandle,
    submission: Submission,
    full_day_hours: f64,
) -> Result<SubmissionSummary, TimesheetError> {
    let entries = submission.records.len();
    let total_hours = submission.total_hours;
    let row_ids = store.insert_submissions(submission.records).await?;

    tracing::info!(
        "Recorded {} entr{} for {} on {} ({}h)",
        entries,
        if entries == 1 { "y" } else { "ies" },
        submission.employee_id,
        submission.date,
        round2(total_hours)
    );

    Ok(SubmissionSummary {
        row_ids,
        entries,
        total_hours,
        below_full_day: total_hours < full_day_hours,
        full_day_hours,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{spawn_store_server, Store};
    use crate::timesheet::card::render_card;
    use crate::timesheet::types::ProjectEntry;
    use std::time::Duration;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 9).unwrap()
    }

    /// A session with `n` entries whose card has been rendered.
    fn rendered_session(n: usize) -> UserSession {
        let entries = (0..n).map(|_| ProjectEntry::blank()).collect();
        let mut session = UserSession::new(entries);
        session.fields = render_card(&session.entries, today(), &TimesheetConfig::default()).fields;
        session
    }

    fn fill(session: &UserSession, hours: &[&str]) -> FormValues {
        let mut values = FormValues::default();
        values.insert(DATE_FIELD, "2026-03-09");
        for (entry, h) in session.entries.iter().zip(hours) {
            values.insert(FieldKey::new(entry.id, FieldKind::Project).field_id(), "project-alpha");
            values.insert(FieldKey::new(entry.id, FieldKind::Hours).field_id(), *h);
            values.insert(FieldKey::new(entry.id, FieldKind::TaskType).field_id(), "testing");
            values.insert(FieldKey::new(entry.id, FieldKind::Tasks).field_id(), "wrote tests");
        }
        values
    }

    #[test]
    fn test_assemble_below_full_day() {
        let session = rendered_session(3);
        let values = fill(&session, &["2", "3", "1"]);
        let submission =
            assemble("29:u", &session, &values, today(), &TimesheetConfig::default()).unwrap();
        assert_eq!(submission.records.len(), 3);
        assert_eq!(submission.total_hours, 6.0);
        assert_eq!(submission.records[1].task_type, TaskType::Testing);

        let summary = SubmissionSummary {
            row_ids: vec![1, 2, 3],
            entries: 3,
            total_hours: submission.total_hours,
            below_full_day: submission.total_hours < 8.0,
            full_day_hours: 8.0,
        };
        assert_eq!(
            summary.message(),
            "⚠ Warning: Total hours (6) less than 8! Submission was still recorded."
        );
    }

    #[test]
    fn test_assemble_full_day() {
        let session = rendered_session(2);
        let values = fill(&session, &["5", "4"]);
        let submission =
            assemble("29:u", &session, &values, today(), &TimesheetConfig::default()).unwrap();
        assert_eq!(submission.total_hours, 9.0);

        let summary = SubmissionSummary {
            row_ids: vec![1, 2],
            entries: 2,
            total_hours: 9.0,
            below_full_day: false,
            full_day_hours: 8.0,
        };
        assert_eq!(
            summary.message(),
            "✅ Timesheet submitted successfully! Total hours: 9"
        );
    }

    #[test]
    fn test_one_bad_entry_rejects_all() {
        let session = rendered_session(3);
        let mut values = fill(&session, &["2", "lots", "1"]);
        values.insert(
            FieldKey::new(session.entries[2].id, FieldKind::Tasks).field_id(),
            "   ",
        );

        let report =
            assemble("29:u", &session, &values, today(), &TimesheetConfig::default()).unwrap_err();
        assert_eq!(
            report.problems,
            vec![
                FieldProblem {
                    entry_number: 2,
                    field: FieldKind::Hours,
                    issue: Issue::NotANumber("lots".into()),
                },
                FieldProblem {
                    entry_number: 3,
                    field: FieldKind::Tasks,
                    issue: Issue::Missing,
                },
            ]
        );
        let text = report.to_string();
        assert!(text.starts_with(REQUIRED_FIELDS_MESSAGE));
        assert!(text.contains("Project #3: tasks completed is required"));
    }

    #[test]
    fn test_hours_range_and_defaults() {
        let session = rendered_session(1);
        let mut values = fill(&session, &["25"]);
        let report =
            assemble("29:u", &session, &values, today(), &TimesheetConfig::default()).unwrap_err();
        assert_eq!(report.problems[0].issue, Issue::OutOfRange(25.0));

        values.insert(FieldKey::new(session.entries[0].id, FieldKind::Hours).field_id(), "NaN");
        let report =
            assemble("29:u", &session, &values, today(), &TimesheetConfig::default()).unwrap_err();
        assert_eq!(report.problems[0].issue, Issue::NotANumber("NaN".into()));

        // Missing date and task type fall back to today / development.
        let mut values = fill(&session, &["8"]);
        values.insert(DATE_FIELD, "");
        values.insert(
            FieldKey::new(session.entries[0].id, FieldKind::TaskType).field_id(),
            "",
        );
        let submission =
            assemble("29:u", &session, &values, today(), &TimesheetConfig::default()).unwrap();
        assert_eq!(submission.date, today());
        assert_eq!(submission.records[0].task_type, TaskType::Development);
    }

    #[test]
    fn test_bad_date_is_reported() {
        let session = rendered_session(1);
        let mut values = fill(&session, &["8"]);
        values.insert(DATE_FIELD, "09/03/2026");
        let report =
            assemble("29:u", &session, &values, today(), &TimesheetConfig::default()).unwrap_err();
        assert_eq!(report.date_problem.as_deref(), Some("09/03/2026"));
        assert!(report.problems.is_empty());
    }

    #[tokio::test]
    async fn test_persist_writes_batch() {
        let (store, _join) =
            spawn_store_server(Store::in_memory().unwrap(), Duration::from_secs(5));
        let session = rendered_session(2);
        let values = fill(&session, &["5", "4"]);
        let submission =
            assemble("29:u", &session, &values, today(), &TimesheetConfig::default()).unwrap();

        let summary = persist(&store, submission, 8.0).await.unwrap();
        assert_eq!(summary.row_ids.len(), 2);
        assert!(!summary.below_full_day);

        let rows = store.query_submissions("29:u", today()).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].record.tasks_completed, "wrote tests");
    }
}
