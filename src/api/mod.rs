// src/api/mod.rs — HTTP surface: Bot Framework endpoint and health checks

pub mod handlers;
pub mod types;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::bot::TimesheetBot;
use crate::infra::config::ServerConfig;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub bot: Arc<TimesheetBot>,
}

/// Build the axum router with all routes.
pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/messages", post(handlers::messages))
        .route("/testing", get(handlers::testing))
        .route("/api/v1/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the router until the task is dropped or aborted.
pub async fn start_server(config: &ServerConfig, state: ApiState) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.bind, config.port);
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Bot listening on http://{addr}/api/messages");
    axum::serve(listener, router).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::activity::{Activity, ConversationReference};
    use crate::bot::connector::BotConnector;
    use crate::infra::config::TimesheetConfig;
    use crate::infra::errors::TimesheetError;
    use crate::store::{spawn_store_server, Store};
    use crate::timesheet::session::InMemorySessionStore;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::sync::Mutex;
    use std::time::Duration;
    use tower::ServiceExt;

    #[derive(Default)]
    struct RecordingConnector {
        sent: Mutex<Vec<Activity>>,
    }

    #[async_trait]
    impl BotConnector for RecordingConnector {
        async fn send(
            &self,
            _reference: &ConversationReference,
            activity: Activity,
        ) -> Result<Option<String>, TimesheetError> {
            let mut sent = self.sent.lock().unwrap();
            sent.push(activity);
            Ok(Some(format!("activity-{}", sent.len())))
        }

        async fn update(
            &self,
            _reference: &ConversationReference,
            _activity_id: &str,
            _activity: Activity,
        ) -> Result<(), TimesheetError> {
            Ok(())
        }
    }

    fn test_state(connector: Arc<RecordingConnector>) -> ApiState {
        let (store, _join) = spawn_store_server(Store::in_memory().unwrap(), Duration::from_secs(5));
        let bot = TimesheetBot::new(
            connector,
            Arc::new(InMemorySessionStore::new()),
            store,
            TimesheetConfig::default(),
        );
        ApiState { bot: Arc::new(bot) }
    }

    async fn body_string(resp: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = build_router(test_state(Arc::default()));
        let req = Request::builder()
            .uri("/api/v1/health")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body: types::HealthResponse = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(body.status, "ok");
        assert_eq!(body.active_sessions, 0);
    }

    #[tokio::test]
    async fn test_testing_page() {
        let app = build_router(test_state(Arc::default()));
        let req = Request::builder().uri("/testing").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body_string(resp).await.contains("Hello from Attendance Bot!"));
    }

    #[tokio::test]
    async fn test_messages_runs_a_turn() {
        let connector = Arc::new(RecordingConnector::default());
        let app = build_router(test_state(connector.clone()));

        let activity = serde_json::json!({
            "type": "message",
            "id": "1",
            "serviceUrl": "https://smba.example/",
            "channelId": "msteams",
            "from": { "id": "29:user-1", "name": "Dana" },
            "recipient": { "id": "28:bot" },
            "conversation": { "id": "a:conv-1" },
            "text": "help"
        });
        let req = Request::builder()
            .method("POST")
            .uri("/api/messages")
            .header("content-type", "application/json")
            .body(Body::from(activity.to_string()))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let sent = connector.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0].text.as_deref(),
            Some(crate::bot::handler::HELP_TEXT)
        );
    }

    #[tokio::test]
    async fn test_messages_rejects_garbage() {
        let app = build_router(test_state(Arc::default()));
        let req = Request::builder()
            .method("POST")
            .uri("/api/messages")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(body_string(resp).await.contains("Invalid activity"));
    }
}
