// src/timesheet/reminder.rs — Daily reminder push
//
// For every known employee with a stored conversation reference, resume the
// conversation, post a reminder and a fresh blank form. Recipients are
// handled with bounded concurrency; one failure never stops the others.

use std::sync::Arc;

use chrono::NaiveDate;
use futures::stream::{self, StreamExt};

use crate::bot::connector::{resume, BotConnector};
use crate::infra::config::{ReminderConfig, TimesheetConfig};
use crate::infra::errors::{with_timeout, TimesheetError};
use crate::store::StoreHandle;
use crate::timesheet::card::render_card;
use crate::timesheet::session::{self, SessionStore};
use crate::timesheet::types::Employee;

/// Counts from one reminder run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReminderReport {
    pub delivered: usize,
    /// Employees with no conversation reference yet.
    pub skipped: usize,
    pub failed: usize,
}

enum Outcome {
    Delivered,
    Skipped,
    Failed,
}

pub struct ReminderDispatcher {
    connector: Arc<dyn BotConnector>,
    store: StoreHandle,
    sessions: Arc<dyn SessionStore>,
    timesheet: TimesheetConfig,
    reminder: ReminderConfig,
}

impl ReminderDispatcher {
    pub fn new(
        connector: Arc<dyn BotConnector>,
        store: StoreHandle,
        sessions: Arc<dyn SessionStore>,
        timesheet: TimesheetConfig,
        reminder: ReminderConfig,
    ) -> Self {
        Self {
            connector,
            store,
            sessions,
            timesheet,
            reminder,
        }
    }

    /// Remind every employee. Only failing to list employees is an error;
    /// per-recipient problems are logged and counted.
    pub async fn run(&self, today: NaiveDate) -> Result<ReminderReport, TimesheetError> {
        let employees = self.store.list_employees().await?;
        tracing::info!("Sending timesheet reminders to {} employees", employees.len());

        let outcomes: Vec<Outcome> = stream::iter(employees)
            .map(|employee| self.remind(employee, today))
            .buffer_unordered(self.reminder.max_concurrent_sends.max(1))
            .collect()
            .await;

        let mut report = ReminderReport::default();
        for outcome in outcomes {
            match outcome {
                Outcome::Delivered => report.delivered += 1,
                Outcome::Skipped => report.skipped += 1,
                Outcome::Failed => report.failed += 1,
            }
        }
        tracing::info!(
            "Reminder run finished: {} delivered, {} skipped, {} failed",
            report.delivered,
            report.skipped,
            report.failed
        );
        Ok(report)
    }

    async fn remind(&self, employee: Employee, today: NaiveDate) -> Outcome {
        let reference = match self.store.load_reference(&employee.external_id).await {
            Ok(Some(reference)) => reference,
            Ok(None) => {
                tracing::warn!(
                    "Skipping reminder for {} ({}): they need to message the bot first",
                    employee.name,
                    employee.external_id
                );
                return Outcome::Skipped;
            }
            Err(e) => {
                tracing::error!(
                    "Could not load conversation for {}: {}",
                    employee.external_id,
                    e
                );
                return Outcome::Failed;
            }
        };

        // The fresh form only replaces the user's session once it is delivered.
        let mut slot = self.sessions.lock(&employee.external_id).await;
        let mut fresh = None;
        let mutation = session::start(&mut fresh);
        let card = render_card(&mutation.entries, today, &self.timesheet);
        let conversation = resume(self.connector.as_ref(), &reference);
        let greeting = format!(
            "Hi {}! 👋 Don't forget to submit your timesheet for today.",
            employee.name
        );

        let sent = with_timeout("reminder delivery", self.reminder.send_timeout(), async {
            conversation.send_text(&greeting).await?;
            conversation.send_card(&card).await
        })
        .await;

        match sent {
            Ok(activity_id) => {
                *slot = fresh;
                session::record_render(&mut slot, card.fields, activity_id);
                tracing::debug!("Reminder delivered to {}", employee.external_id);
                Outcome::Delivered
            }
            Err(e) => {
                // Any session in progress is left as it was.
                tracing::error!(
                    "Reminder to {} failed{}: {}",
                    employee.external_id,
                    if e.is_retriable() { " (retriable)" } else { "" },
                    e
                );
                Outcome::Failed
            }
        }
    }
}
