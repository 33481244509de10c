// tests/common/mod.rs — Shared fixtures: recording connector, activities, card helpers

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{json, Value};

use timesheet_bot::bot::activity::{Activity, ConversationReference};
use timesheet_bot::bot::connector::BotConnector;
use timesheet_bot::bot::TimesheetBot;
use timesheet_bot::infra::config::TimesheetConfig;
use timesheet_bot::infra::errors::TimesheetError;
use timesheet_bot::store::{spawn_store_server, Store, StoreHandle};
use timesheet_bot::timesheet::session::{InMemorySessionStore, SessionStore};

pub const SERVICE_URL: &str = "https://smba.example/emea/";

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 9).unwrap()
}

/// Connector that records everything and can be told to fail.
#[derive(Default)]
pub struct MockConnector {
    pub sent: Mutex<Vec<(String, Activity)>>,
    pub updated: Mutex<Vec<(String, Activity)>>,
    failing_conversations: Mutex<HashSet<String>>,
    fail_next_sends: AtomicUsize,
    counter: AtomicUsize,
}

impl MockConnector {
    pub fn fail_conversation(&self, conversation_id: &str) {
        self.failing_conversations
            .lock()
            .unwrap()
            .insert(conversation_id.to_string());
    }

    pub fn fail_next_sends(&self, n: usize) {
        self.fail_next_sends.store(n, Ordering::SeqCst);
    }

    pub fn sent_to(&self, conversation_id: &str) -> Vec<Activity> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| c == conversation_id)
            .map(|(_, a)| a.clone())
            .collect()
    }

    pub fn last_sent(&self) -> Activity {
        self.sent.lock().unwrap().last().unwrap().1.clone()
    }

    pub fn last_updated(&self) -> (String, Activity) {
        self.updated.lock().unwrap().last().unwrap().clone()
    }

    fn should_fail(&self, reference: &ConversationReference) -> bool {
        if self
            .failing_conversations
            .lock()
            .unwrap()
            .contains(&reference.conversation.id)
        {
            return true;
        }
        self.fail_next_sends
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl BotConnector for MockConnector {
    async fn send(
        &self,
        reference: &ConversationReference,
        activity: Activity,
    ) -> Result<Option<String>, TimesheetError> {
        if self.should_fail(reference) {
            return Err(TimesheetError::Connector {
                status: 502,
                message: "bad gateway".into(),
            });
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        self.sent
            .lock()
            .unwrap()
            .push((reference.conversation.id.clone(), activity));
        Ok(Some(format!("msg-{n}")))
    }

    async fn update(
        &self,
        _reference: &ConversationReference,
        activity_id: &str,
        activity: Activity,
    ) -> Result<(), TimesheetError> {
        self.updated
            .lock()
            .unwrap()
            .push((activity_id.to_string(), activity));
        Ok(())
    }
}

pub struct Harness {
    pub bot: TimesheetBot,
    pub connector: Arc<MockConnector>,
    pub sessions: Arc<InMemorySessionStore>,
    pub store: StoreHandle,
}

pub fn harness() -> Harness {
    let (store, _join) = spawn_store_server(Store::in_memory().unwrap(), Duration::from_secs(5));
    harness_with_store(store)
}

pub fn harness_with_store(store: StoreHandle) -> Harness {
    let connector = Arc::new(MockConnector::default());
    let sessions = Arc::new(InMemorySessionStore::new());
    let bot = TimesheetBot::new(
        connector.clone(),
        sessions.clone() as Arc<dyn SessionStore>,
        store.clone(),
        TimesheetConfig::default(),
    )
    .with_clock(today);
    Harness {
        bot,
        connector,
        sessions,
        store,
    }
}

fn base_activity(user_id: &str, conversation_id: &str) -> Value {
    json!({
        "type": "message",
        "id": "in-1",
        "serviceUrl": SERVICE_URL,
        "channelId": "msteams",
        "from": { "id": user_id, "name": "Dana" },
        "recipient": { "id": "28:bot", "name": "Timesheet" },
        "conversation": { "id": conversation_id, "conversationType": "personal" },
        "locale": "en-US"
    })
}

pub fn text_from(user_id: &str, conversation_id: &str, text: &str) -> Activity {
    let mut v = base_activity(user_id, conversation_id);
    v["text"] = json!(text);
    serde_json::from_value(v).unwrap()
}

/// A card button press: `value` carries the action data merged with inputs.
pub fn card_action(
    user_id: &str,
    conversation_id: &str,
    reply_to: Option<&str>,
    value: Value,
) -> Activity {
    let mut v = base_activity(user_id, conversation_id);
    v["value"] = value;
    if let Some(id) = reply_to {
        v["replyToId"] = json!(id);
    }
    serde_json::from_value(v).unwrap()
}

pub fn conversation_update(user_id: &str, conversation_id: &str) -> Activity {
    let mut v = base_activity(user_id, conversation_id);
    v["type"] = json!("conversationUpdate");
    v["membersAdded"] = json!([{ "id": "28:bot" }]);
    serde_json::from_value(v).unwrap()
}

/// The Adaptive Card carried by an outbound activity.
pub fn card_of(activity: &Activity) -> Value {
    assert_eq!(
        activity.attachments[0]["contentType"],
        "application/vnd.microsoft.card.adaptive"
    );
    activity.attachments[0]["content"].clone()
}

/// The per-entry containers of a card, in display order.
pub fn sections(card: &Value) -> Vec<Value> {
    card["body"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|item| item["type"] == "Container")
        .cloned()
        .collect()
}

/// Entry id of a section, read from its project input id.
pub fn entry_id(section: &Value) -> String {
    section["items"][1]["id"]
        .as_str()
        .unwrap()
        .strip_prefix("project-")
        .unwrap()
        .to_string()
}

pub fn input_value(section: &Value, prefix: &str) -> Value {
    section["items"]
        .as_array()
        .unwrap()
        .iter()
        .find(|item| {
            item["id"]
                .as_str()
                .is_some_and(|id| id.starts_with(&format!("{prefix}-")))
        })
        .map(|item| item["value"].clone())
        .unwrap_or(Value::Null)
}
