// src/api/handlers.rs

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Html;
use axum::Json;

use crate::api::{types::*, ApiState};
use crate::bot::activity::Activity;

const TESTING_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>Test Page</title>
</head>
<body>
    <h1>Hello from Attendance Bot!</h1>
    <p>This bot supports multiple projects with add/remove functionality.</p>
</body>
</html>
"#;

/// POST /api/messages — Bot Framework activity endpoint.
pub async fn messages(
    State(state): State<ApiState>,
    payload: Result<Json<Activity>, JsonRejection>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    let Json(activity) = payload.map_err(|rejection| {
        tracing::warn!("Rejected activity payload: {}", rejection.body_text());
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: format!("Invalid activity: {}", rejection.body_text()),
            }),
        )
    })?;

    state.bot.on_turn(activity).await;
    Ok(StatusCode::OK)
}

/// GET /testing — Static page confirming the bot is up.
pub async fn testing() -> Html<&'static str> {
    Html(TESTING_PAGE)
}

/// GET /api/v1/health
pub async fn health(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        active_sessions: state.bot.sessions().active(),
    })
}
