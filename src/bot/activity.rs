// src/bot/activity.rs — Bot Framework activity protocol types
//
// Only the fields this bot reads or writes are modeled; everything else the
// channel sends is ignored on deserialize.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const ACTIVITY_MESSAGE: &str = "message";
pub const ACTIVITY_CONVERSATION_UPDATE: &str = "conversationUpdate";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelAccount {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aad_object_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationAccount {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_group: Option<bool>,
}

/// A Bot Framework activity, inbound or outbound.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    #[serde(rename = "type")]
    pub activity_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<ChannelAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation: Option<ConversationAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<ChannelAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Card action payload: `Action.Submit` data merged with the card inputs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members_added: Vec<ChannelAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

impl Activity {
    /// Outbound plain-text message.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            activity_type: ACTIVITY_MESSAGE.into(),
            text: Some(text.into()),
            ..Default::default()
        }
    }

    /// Outbound message carrying a single attachment.
    pub fn attachment(attachment: Value) -> Self {
        Self {
            activity_type: ACTIVITY_MESSAGE.into(),
            attachments: vec![attachment],
            ..Default::default()
        }
    }

    pub fn is_message(&self) -> bool {
        self.activity_type == ACTIVITY_MESSAGE
    }

    pub fn is_conversation_update(&self) -> bool {
        self.activity_type == ACTIVITY_CONVERSATION_UPDATE
    }

    pub fn sender_id(&self) -> Option<&str> {
        self.from.as_ref().map(|f| f.id.as_str())
    }

    /// Address this activity to the conversation in `reference`, as the bot.
    pub fn addressed_to(mut self, reference: &ConversationReference) -> Self {
        self.from = reference.bot.clone();
        self.recipient = reference.user.clone();
        self.conversation = Some(reference.conversation.clone());
        self.channel_id = Some(reference.channel_id.clone());
        self.service_url = Some(reference.service_url.clone());
        if self.locale.is_none() {
            self.locale = reference.locale.clone();
        }
        self
    }
}

/// Everything needed to post into a conversation outside of a user turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<ChannelAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot: Option<ChannelAccount>,
    pub conversation: ConversationAccount,
    pub channel_id: String,
    pub service_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

impl ConversationReference {
    /// Capture the reference of an inbound activity. `None` when the activity
    /// lacks a conversation or service URL to reply through.
    pub fn from_activity(activity: &Activity) -> Option<Self> {
        Some(Self {
            activity_id: activity.id.clone(),
            user: activity.from.clone(),
            bot: activity.recipient.clone(),
            conversation: activity.conversation.clone()?,
            channel_id: activity.channel_id.clone().unwrap_or_else(|| "msteams".into()),
            service_url: activity.service_url.clone()?,
            locale: activity.locale.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn teams_message() -> Value {
        json!({
            "type": "message",
            "id": "1700000000000",
            "timestamp": "2026-03-09T17:00:00.000Z",
            "serviceUrl": "https://smba.trafficmanager.net/emea/",
            "channelId": "msteams",
            "from": { "id": "29:user-1", "name": "Dana", "aadObjectId": "aad-1" },
            "conversation": { "id": "a:conv-1", "conversationType": "personal", "tenantId": "t-1" },
            "recipient": { "id": "28:bot", "name": "Timesheet" },
            "text": "timesheet",
            "locale": "en-US",
            "entities": [{ "type": "clientInfo" }]
        })
    }

    #[test]
    fn test_deserialize_teams_message() {
        let activity: Activity = serde_json::from_value(teams_message()).unwrap();
        assert!(activity.is_message());
        assert_eq!(activity.sender_id(), Some("29:user-1"));
        assert_eq!(activity.text.as_deref(), Some("timesheet"));
        assert_eq!(
            activity.conversation.as_ref().unwrap().conversation_type.as_deref(),
            Some("personal")
        );
        assert!(activity.value.is_none());
    }

    #[test]
    fn test_reference_from_activity() {
        let activity: Activity = serde_json::from_value(teams_message()).unwrap();
        let reference = ConversationReference::from_activity(&activity).unwrap();
        assert_eq!(reference.conversation.id, "a:conv-1");
        assert_eq!(reference.service_url, "https://smba.trafficmanager.net/emea/");
        assert_eq!(reference.user.as_ref().unwrap().id, "29:user-1");
        assert_eq!(reference.bot.as_ref().unwrap().id, "28:bot");

        let json = serde_json::to_string(&reference).unwrap();
        let back: ConversationReference = serde_json::from_str(&json).unwrap();
        assert_eq!(back, reference);
    }

    #[test]
    fn test_reference_requires_service_url() {
        let mut activity: Activity = serde_json::from_value(teams_message()).unwrap();
        activity.service_url = None;
        assert!(ConversationReference::from_activity(&activity).is_none());
    }

    #[test]
    fn test_addressed_to_swaps_roles() {
        let inbound: Activity = serde_json::from_value(teams_message()).unwrap();
        let reference = ConversationReference::from_activity(&inbound).unwrap();
        let reply = Activity::text("hello").addressed_to(&reference);
        assert_eq!(reply.from.as_ref().unwrap().id, "28:bot");
        assert_eq!(reply.recipient.as_ref().unwrap().id, "29:user-1");

        let wire = serde_json::to_value(&reply).unwrap();
        assert_eq!(wire["type"], "message");
        assert_eq!(wire["conversation"]["id"], "a:conv-1");
        assert!(wire.get("attachments").is_none());
        assert!(wire.get("value").is_none());
    }
}
