//! HTTP server for GitHub webhooks.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::handlers::LabelBot;
use crate::webhooks::{verify_webhook_signature, IssueCommentEvent, PullRequestEvent};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub bot: LabelBot,
    /// Secret for `X-Hub-Signature-256`; unsigned deliveries are accepted
    /// when unset.
    pub webhook_secret: Option<String>,
}

/// Build the HTTP router for the label service.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/webhooks/github", post(github_webhook_handler))
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// Readiness check endpoint.
async fn readiness_check(State(state): State<AppState>) -> Result<Json<Value>, StatusCode> {
    if state.bot.configuration().items().is_empty() {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }
    Ok(Json(json!({ "status": "ready" })))
}

/// Handle incoming GitHub webhooks.
///
/// This handler:
/// 1. Verifies the signature (if a secret is configured)
/// 2. Routes `issue_comment` and `pull_request` events to the label bot
/// 3. Answers every other event with `ignored`
pub async fn github_webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, StatusCode> {
    let event_type = header(&headers, "x-github-event").unwrap_or("unknown");
    let delivery_id = header(&headers, "x-github-delivery").unwrap_or("unknown");

    info!(
        delivery_id = %delivery_id,
        event_type = %event_type,
        "Received GitHub webhook"
    );

    if let Some(secret) = &state.webhook_secret {
        let Some(signature) = header(&headers, "x-hub-signature-256") else {
            warn!("Missing X-Hub-Signature-256 header");
            return Err(StatusCode::UNAUTHORIZED);
        };

        if !verify_webhook_signature(&body, signature, secret) {
            warn!("Invalid webhook signature");
            return Err(StatusCode::UNAUTHORIZED);
        }
        debug!("Webhook signature verified");
    }

    let response = match event_type {
        "issue_comment" => {
            let event: IssueCommentEvent = parse_payload(&body)?;
            match state.bot.handle_issue_comment(&event).await {
                Ok(outcome) => json!({ "status": "processed", "outcome": outcome }),
                Err(e) => {
                    error!(
                        repo = %event.repository.full_name,
                        number = event.issue.number,
                        error = %e,
                        "Failed to handle comment"
                    );
                    json!({ "status": "error", "error": e.to_string() })
                }
            }
        }
        "pull_request" => {
            let event: PullRequestEvent = parse_payload(&body)?;
            match state
                .bot
                .handle_pull_request(&event, chrono::Utc::now())
                .await
            {
                Ok(outcome) => json!({ "status": "processed", "outcome": outcome }),
                Err(e) => {
                    error!(
                        repo = %event.repository.full_name,
                        number = event.number,
                        error = %e,
                        "Failed to handle pull request event"
                    );
                    json!({ "status": "error", "error": e.to_string() })
                }
            }
        }
        "ping" => json!({ "status": "ignored", "reason": "ping" }),
        other => {
            debug!(event_type = %other, "Ignoring unhandled GitHub event");
            json!({ "status": "ignored", "reason": "unhandled_event" })
        }
    };

    Ok(Json(response))
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn parse_payload<T: DeserializeOwned>(body: &[u8]) -> Result<T, StatusCode> {
    serde_json::from_slice(body).map_err(|e| {
        error!("Failed to parse webhook payload: {e}");
        StatusCode::BAD_REQUEST
    })
}
