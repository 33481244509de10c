// src/bot/handler.rs — Turn handler: one inbound activity in, replies out
//
// Every turn of a user runs under that user's session lock, from decoding the
// action to recording the delivered card. Nothing a turn does is fatal to the
// process: errors and panics end up as a generic reply to the user.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use futures::FutureExt;

use crate::bot::action::BotAction;
use crate::bot::activity::{Activity, ConversationReference};
use crate::bot::connector::{resume, BotConnector, Conversation};
use crate::infra::config::TimesheetConfig;
use crate::infra::errors::TimesheetError;
use crate::store::StoreHandle;
use crate::timesheet::card::{render_card, DATE_FIELD};
use crate::timesheet::session::{self, Delivery, Mutation, SessionStore, UserSession};
use crate::timesheet::submission::{self, SubmissionSummary};
use crate::timesheet::values::FormValues;

pub const HELP_TEXT: &str = "Type \"timesheet\" to log your hours for the day.";
pub const WELCOME_TEXT: &str =
    "Welcome to the Attendance Bot! Type \"timesheet\" to begin, or \"help\" for options.";
pub const TURN_ERROR_TEXT: &str = "The bot encountered an error or bug.";
pub const SAVE_FAILED_TEXT: &str =
    "❌ Sorry, there was an error saving your timesheet. Please try again.";
pub const NO_SESSION_TEXT: &str =
    "There is no timesheet in progress. Type \"timesheet\" to start a new one.";

/// Source of "today" for date defaults.
pub type Clock = fn() -> NaiveDate;

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

pub struct TimesheetBot {
    connector: Arc<dyn BotConnector>,
    sessions: Arc<dyn SessionStore>,
    store: StoreHandle,
    settings: TimesheetConfig,
    today: Clock,
}

impl TimesheetBot {
    pub fn new(
        connector: Arc<dyn BotConnector>,
        sessions: Arc<dyn SessionStore>,
        store: StoreHandle,
        settings: TimesheetConfig,
    ) -> Self {
        Self {
            connector,
            sessions,
            store,
            settings,
            today: local_today,
        }
    }

    pub fn with_clock(mut self, today: Clock) -> Self {
        self.today = today;
        self
    }

    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    /// Handle one inbound activity. Never fails: errors and panics are logged
    /// and answered with a generic message when the conversation is known.
    pub async fn on_turn(&self, activity: Activity) {
        let outcome = AssertUnwindSafe(self.dispatch(&activity))
            .catch_unwind()
            .await;

        let failure = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(e)) => e.to_string(),
            Err(panic) => panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".into()),
        };
        tracing::error!("[on_turn] unhandled error: {}", failure);

        if let Some(reference) = ConversationReference::from_activity(&activity) {
            if let Err(e) = resume(self.connector.as_ref(), &reference)
                .send_text(TURN_ERROR_TEXT)
                .await
            {
                tracing::error!("Could not report turn error to the user: {}", e);
            }
        }
    }

    async fn dispatch(&self, activity: &Activity) -> Result<(), TimesheetError> {
        let Some(reference) = ConversationReference::from_activity(activity) else {
            tracing::warn!(
                "Ignoring {} activity without conversation or service URL",
                activity.activity_type
            );
            return Ok(());
        };
        let Some(user_id) = activity.sender_id().map(str::to_owned) else {
            tracing::warn!("Ignoring {} activity without a sender", activity.activity_type);
            return Ok(());
        };

        if activity.is_message() || activity.is_conversation_update() {
            self.remember(&user_id, &reference).await;
        }
        if !activity.is_message() {
            return Ok(());
        }

        let action = BotAction::decode(activity);
        tracing::debug!("Turn from {}: {:?}", user_id, action);

        let conversation = resume(self.connector.as_ref(), &reference);
        let reply_to = activity.reply_to_id.as_deref();
        let today = (self.today)();

        match action {
            BotAction::Help => {
                conversation.send_text(HELP_TEXT).await?;
            }
            BotAction::Welcome => {
                conversation.send_text(WELCOME_TEXT).await?;
            }
            BotAction::Malformed(reason) => {
                tracing::warn!("Malformed card action from {}: {}", user_id, reason);
                conversation.send_text(HELP_TEXT).await?;
            }
            BotAction::Unknown(name) => {
                tracing::warn!("Unknown card action '{}' from {}", name, user_id);
                conversation.send_text(HELP_TEXT).await?;
            }
            BotAction::Start => {
                let mut slot = self.sessions.lock(&user_id).await;
                let mutation = session::start(&mut slot);
                self.deliver(&conversation, &mut slot, mutation, today).await?;
            }
            BotAction::AddEntry { values } => {
                let mut slot = self.sessions.lock(&user_id).await;
                let mutation = session::add_entry(&mut slot, &values, reply_to);
                let date = form_date(&values, today);
                self.deliver(&conversation, &mut slot, mutation, date).await?;
            }
            BotAction::DeleteEntry { entry, values } => {
                let mut slot = self.sessions.lock(&user_id).await;
                let mutation = session::delete_entry(&mut slot, entry, &values, reply_to);
                let date = form_date(&values, today);
                self.deliver(&conversation, &mut slot, mutation, date).await?;
            }
            BotAction::Submit { values } => {
                let mut slot = self.sessions.lock(&user_id).await;
                let reply = match self.submit(&user_id, &mut slot, &values, today).await {
                    Ok(Some(summary)) => {
                        session::clear(&mut slot);
                        summary.message()
                    }
                    Ok(None) => NO_SESSION_TEXT.to_string(),
                    Err(TimesheetError::Validation(report)) => {
                        tracing::info!(
                            "Rejected submission from {}: {} problem(s)",
                            user_id,
                            report.problems.len() + usize::from(report.date_problem.is_some())
                        );
                        format!("❌ Error: {report}")
                    }
                    Err(e) => {
                        tracing::error!("Saving timesheet for {} failed: {}", user_id, e);
                        SAVE_FAILED_TEXT.to_string()
                    }
                };
                conversation.send_text(&reply).await?;
            }
        }

        Ok(())
    }

    /// Keep the user's conversation reference for proactive sends. Failures
    /// are logged and the turn continues.
    async fn remember(&self, user_id: &str, reference: &ConversationReference) {
        if let Err(e) = self.store.save_reference(user_id, reference.clone()).await {
            tracing::error!("Could not store conversation reference for {}: {}", user_id, e);
        }
    }

    /// Validate and persist. `Ok(None)` when there is nothing to submit.
    async fn submit(
        &self,
        user_id: &str,
        slot: &mut Option<UserSession>,
        values: &FormValues,
        today: NaiveDate,
    ) -> Result<Option<SubmissionSummary>, TimesheetError> {
        if slot.is_none() {
            *slot = UserSession::recover(values);
            if slot.is_some() {
                tracing::info!("Recovered timesheet session for {} from submitted card", user_id);
            }
        }
        let Some(session) = slot.as_mut() else {
            return Ok(None);
        };
        // Keep what was typed so a failed attempt can be corrected in place.
        session.absorb(values);

        let submission = submission::assemble(user_id, session, values, today, &self.settings)
            .map_err(TimesheetError::Validation)?;
        let summary =
            submission::persist(&self.store, submission, self.settings.full_day_hours).await?;
        Ok(Some(summary))
    }

    /// Render the mutated entry list and put it in front of the user.
    async fn deliver(
        &self,
        conversation: &Conversation<'_>,
        slot: &mut Option<UserSession>,
        mutation: Mutation,
        date: NaiveDate,
    ) -> Result<(), TimesheetError> {
        let card = render_card(&mutation.entries, date, &self.settings);

        let activity_id = match mutation.delivery {
            Delivery::SendNew => conversation.send_card(&card).await?,
            Delivery::Replace(id) => match conversation.update_card(&id, &card).await {
                Ok(()) => Some(id),
                Err(e) => {
                    tracing::warn!("Updating card {} failed ({}); sending a new one", id, e);
                    conversation.send_card(&card).await?
                }
            },
        };

        session::record_render(slot, card.fields, activity_id);
        Ok(())
    }
}

/// The date the user picked on the card, or `today` when absent or invalid.
fn form_date(values: &FormValues, today: NaiveDate) -> NaiveDate {
    values
        .non_empty(DATE_FIELD)
        .and_then(|raw| NaiveDate::parse_from_str(&raw, "%Y-%m-%d").ok())
        .unwrap_or(today)
}
