// src/bot/connector.rs — Outbound delivery through the Bot Framework connector
//
// Replies and proactive messages both go through the v3 conversations API of
// the channel's service URL. The bot authenticates with an OAuth2
// client-credentials token that is cached until shortly before it expires.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::Mutex;
use url::Url;

use crate::bot::activity::{Activity, ConversationReference};
use crate::infra::config::BotConfig;
use crate::infra::errors::TimesheetError;
use crate::timesheet::card::RenderedCard;

/// Refresh the token this long before the server says it expires.
const TOKEN_GRACE: Duration = Duration::from_secs(60);

/// Something that can post and update activities in a conversation.
#[async_trait]
pub trait BotConnector: Send + Sync {
    /// Post `activity` into the referenced conversation. Returns the id the
    /// channel assigned, when it reports one.
    async fn send(
        &self,
        reference: &ConversationReference,
        activity: Activity,
    ) -> Result<Option<String>, TimesheetError>;

    /// Overwrite a previously posted activity in place.
    async fn update(
        &self,
        reference: &ConversationReference,
        activity_id: &str,
        activity: Activity,
    ) -> Result<(), TimesheetError>;
}

/// A conversation resumed from a stored reference.
pub struct Conversation<'a> {
    connector: &'a dyn BotConnector,
    reference: &'a ConversationReference,
}

/// Resume the conversation in `reference` to send into it outside a user turn.
pub fn resume<'a>(
    connector: &'a dyn BotConnector,
    reference: &'a ConversationReference,
) -> Conversation<'a> {
    Conversation {
        connector,
        reference,
    }
}

impl Conversation<'_> {
    pub fn reference(&self) -> &ConversationReference {
        self.reference
    }

    pub async fn send_text(&self, text: &str) -> Result<Option<String>, TimesheetError> {
        self.connector
            .send(self.reference, Activity::text(text).addressed_to(self.reference))
            .await
    }

    pub async fn send_card(&self, card: &RenderedCard) -> Result<Option<String>, TimesheetError> {
        self.connector
            .send(
                self.reference,
                Activity::attachment(card.attachment()).addressed_to(self.reference),
            )
            .await
    }

    pub async fn update_card(
        &self,
        activity_id: &str,
        card: &RenderedCard,
    ) -> Result<(), TimesheetError> {
        let mut activity = Activity::attachment(card.attachment()).addressed_to(self.reference);
        activity.id = Some(activity_id.to_string());
        self.connector
            .update(self.reference, activity_id, activity)
            .await
    }
}

#[derive(Debug, Clone)]
struct AccessToken {
    token: String,
    expires_at: Instant,
}

impl AccessToken {
    fn is_expired(&self) -> bool {
        Instant::now() + TOKEN_GRACE >= self.expires_at
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Deserialize)]
struct ResourceResponse {
    #[serde(default)]
    id: Option<String>,
}

/// Credentials for the connector. Absent in local emulator setups.
#[derive(Clone)]
struct Credentials {
    app_id: String,
    app_password: String,
}

/// Bot Framework REST client.
pub struct BotFrameworkClient {
    client: reqwest::Client,
    credentials: Option<Credentials>,
    token_endpoint: String,
    oauth_scope: String,
    token: Arc<Mutex<Option<AccessToken>>>,
}

impl BotFrameworkClient {
    pub fn new(config: &BotConfig) -> Result<Self, TimesheetError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .user_agent(format!("timesheet-bot/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        // Blank values count as unset: an empty app id is the emulator setup.
        let app_id = config.app_id.as_deref().filter(|s| !s.trim().is_empty());
        let app_password = config.app_password.as_deref().filter(|s| !s.is_empty());

        let credentials = match (app_id, app_password) {
            (Some(app_id), Some(app_password)) => Some(Credentials {
                app_id: app_id.to_string(),
                app_password: app_password.to_string(),
            }),
            (Some(_), None) => {
                return Err(TimesheetError::Config(
                    "bot.app_id is set but bot.app_password is missing".into(),
                ))
            }
            _ => {
                tracing::warn!("No bot credentials configured; outbound calls are unauthenticated");
                None
            }
        };

        Ok(Self {
            client,
            credentials,
            token_endpoint: config.token_endpoint.clone(),
            oauth_scope: config.oauth_scope.clone(),
            token: Arc::new(Mutex::new(None)),
        })
    }

    /// A valid bearer token, fetching a new one when the cached one is stale.
    async fn bearer(&self) -> Result<Option<String>, TimesheetError> {
        let Some(credentials) = &self.credentials else {
            return Ok(None);
        };

        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref().filter(|t| !t.is_expired()) {
            return Ok(Some(token.token.clone()));
        }

        let response = self
            .client
            .post(&self.token_endpoint)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", credentials.app_id.as_str()),
                ("client_secret", credentials.app_password.as_str()),
                ("scope", self.oauth_scope.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TimesheetError::Connector {
                status: status.as_u16(),
                message: format!("token request failed: {body}"),
            });
        }

        let body: TokenResponse = response.json().await?;
        let lifetime = Duration::from_secs(body.expires_in.unwrap_or(3600));
        tracing::debug!("Bot Framework token obtained (valid for {:?})", lifetime);

        *guard = Some(AccessToken {
            token: body.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });
        Ok(Some(body.access_token))
    }

    async fn call(
        &self,
        method: reqwest::Method,
        url: Url,
        activity: &Activity,
    ) -> Result<reqwest::Response, TimesheetError> {
        let mut request = self.client.request(method, url.clone()).json(activity);
        if let Some(token) = self.bearer().await? {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            tracing::error!("Bot connector {} returned {}: {}", url.path(), status, text);
            return Err(TimesheetError::Connector {
                status: status.as_u16(),
                message: text,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl BotConnector for BotFrameworkClient {
    async fn send(
        &self,
        reference: &ConversationReference,
        activity: Activity,
    ) -> Result<Option<String>, TimesheetError> {
        let url = activities_url(&reference.service_url, &reference.conversation.id, None)?;
        let response = self.call(reqwest::Method::POST, url, &activity).await?;
        // Some channels answer with an empty body.
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(None);
        }
        let body: ResourceResponse = serde_json::from_str(&text)?;
        Ok(body.id.filter(|id| !id.is_empty()))
    }

    async fn update(
        &self,
        reference: &ConversationReference,
        activity_id: &str,
        activity: Activity,
    ) -> Result<(), TimesheetError> {
        let url = activities_url(
            &reference.service_url,
            &reference.conversation.id,
            Some(activity_id),
        )?;
        self.call(reqwest::Method::PUT, url, &activity).await?;
        Ok(())
    }
}

/// `{serviceUrl}/v3/conversations/{conversationId}/activities[/{activityId}]`
fn activities_url(
    service_url: &str,
    conversation_id: &str,
    activity_id: Option<&str>,
) -> Result<Url, TimesheetError> {
    let mut url = Url::parse(service_url)
        .map_err(|e| TimesheetError::Config(format!("invalid service URL {service_url}: {e}")))?;
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| TimesheetError::Config(format!("service URL {service_url} cannot be a base")))?;
        segments
            .pop_if_empty()
            .extend(["v3", "conversations", conversation_id, "activities"]);
        if let Some(id) = activity_id {
            segments.push(id);
        }
    }
    Ok(url)
}
