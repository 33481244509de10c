// src/bot/action.rs — Decode an inbound activity into a bot action

use serde_json::Value;

use crate::bot::activity::Activity;
use crate::timesheet::card::{ACTION_ADD, ACTION_DELETE, ACTION_SUBMIT};
use crate::timesheet::types::EntryId;
use crate::timesheet::values::FormValues;

/// Keys of a card payload that carry the action itself, not form input.
const ACTION_KEY: &str = "action";
const ENTRY_KEY: &str = "projectId";

/// What a user turn asks the bot to do. Decoded once, at the edge.
#[derive(Debug, Clone, PartialEq)]
pub enum BotAction {
    /// "timesheet" / "submit timesheet": open a fresh form.
    Start,
    Help,
    /// Any other text.
    Welcome,
    AddEntry { values: FormValues },
    DeleteEntry { entry: EntryId, values: FormValues },
    Submit { values: FormValues },
    /// A card payload naming a known action but missing what it needs.
    Malformed(String),
    /// A card payload with an action this bot does not know.
    Unknown(String),
}

impl BotAction {
    pub fn decode(activity: &Activity) -> Self {
        match &activity.value {
            Some(Value::Object(map)) if map.contains_key(ACTION_KEY) => decode_card(map),
            _ => decode_text(activity.text.as_deref().unwrap_or_default()),
        }
    }
}

fn decode_card(map: &serde_json::Map<String, Value>) -> BotAction {
    let action = map
        .get(ACTION_KEY)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let mut inputs = map.clone();
    inputs.remove(ACTION_KEY);
    let entry = inputs.remove(ENTRY_KEY);
    let values = FormValues::new(inputs);

    match action.as_str() {
        ACTION_ADD => BotAction::AddEntry { values },
        ACTION_SUBMIT => BotAction::Submit { values },
        ACTION_DELETE => match entry.as_ref().and_then(Value::as_str).map(str::parse::<EntryId>) {
            Some(Ok(entry)) => BotAction::DeleteEntry { entry, values },
            _ => BotAction::Malformed(format!("{ACTION_DELETE} without a valid {ENTRY_KEY}")),
        },
        _ => BotAction::Unknown(action),
    }
}

fn decode_text(text: &str) -> BotAction {
    let command = normalize_command(text);
    match command.as_str() {
        "timesheet" | "submit timesheet" => BotAction::Start,
        "help" => BotAction::Help,
        _ => BotAction::Welcome,
    }
}

/// Lowercase the message, drop `<at>…</at>` mentions and any other markup,
/// and collapse whitespace.
fn normalize_command(text: &str) -> String {
    let mut without_mentions = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("<at>") {
        without_mentions.push_str(&rest[..start]);
        match rest[start..].find("</at>") {
            Some(end) => rest = &rest[start + end + "</at>".len()..],
            None => {
                rest = "";
            }
        }
    }
    without_mentions.push_str(rest);

    let mut plain = String::with_capacity(without_mentions.len());
    let mut in_tag = false;
    for ch in without_mentions.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => plain.push(ch),
            _ => {}
        }
    }

    plain
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text(t: &str) -> Activity {
        Activity::text(t)
    }

    fn card(value: Value) -> Activity {
        Activity {
            activity_type: "message".into(),
            value: Some(value),
            ..Default::default()
        }
    }

    #[test]
    fn test_text_commands() {
        assert_eq!(BotAction::decode(&text("timesheet")), BotAction::Start);
        assert_eq!(BotAction::decode(&text("  Submit   Timesheet ")), BotAction::Start);
        assert_eq!(BotAction::decode(&text("HELP")), BotAction::Help);
        assert_eq!(BotAction::decode(&text("good morning")), BotAction::Welcome);
        assert_eq!(BotAction::decode(&Activity::default()), BotAction::Welcome);
    }

    #[test]
    fn test_mentions_are_ignored() {
        let activity = text("<at>Timesheet Bot</at> timesheet");
        assert_eq!(BotAction::decode(&activity), BotAction::Start);
        assert_eq!(normalize_command("<p>help</p>"), "help");
    }

    #[test]
    fn test_card_actions() {
        let add = card(json!({ "action": "AddProject", "date": "2026-03-09" }));
        match BotAction::decode(&add) {
            BotAction::AddEntry { values } => {
                assert_eq!(values.text("date").as_deref(), Some("2026-03-09"));
                assert!(!values.contains("action"));
            }
            other => panic!("unexpected {other:?}"),
        }

        let id = EntryId::new();
        let delete = card(json!({ "action": "DeleteProject", "projectId": id.to_string() }));
        match BotAction::decode(&delete) {
            BotAction::DeleteEntry { entry, values } => {
                assert_eq!(entry, id);
                assert!(!values.contains("projectId"));
            }
            other => panic!("unexpected {other:?}"),
        }

        let submit = card(json!({ "action": "SubmitTimesheet", "remarks": "ok" }));
        assert!(matches!(BotAction::decode(&submit), BotAction::Submit { .. }));
    }

    #[test]
    fn test_bad_card_payloads() {
        let delete = card(json!({ "action": "DeleteProject", "projectId": "nope" }));
        assert!(matches!(BotAction::decode(&delete), BotAction::Malformed(_)));

        let unknown = card(json!({ "action": "Approve" }));
        assert_eq!(BotAction::decode(&unknown), BotAction::Unknown("Approve".into()));

        // A value without an action discriminator falls back to the text.
        let mut stray = card(json!({ "foo": 1 }));
        stray.text = Some("help".into());
        assert_eq!(BotAction::decode(&stray), BotAction::Help);
    }
}
