use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use teloxide::prelude::*;
use teloxide::types::Update;

use crate::bot::{self, AppState};

const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/webhook", post(receive_update))
        .route("/webhook/register", post(register_webhook))
        .route("/webhook/unregister", post(unregister_webhook))
        .route("/healthz", get(healthz))
        .with_state(state)
}

/// Webhook delivery endpoint. The update is handed to a background task
/// and the 200 goes out immediately; handler failures are logged, never
/// returned to the platform.
async fn receive_update(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<Update>, JsonRejection>,
) -> StatusCode {
    if let Some(secret) = state.config.webhook_secret.as_deref() {
        let provided = headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok());
        if provided != Some(secret) {
            tracing::warn!("Webhook delivery with missing or wrong secret token");
            return StatusCode::UNAUTHORIZED;
        }
    }

    let update = match body {
        Ok(Json(update)) => update,
        Err(e) => {
            // Payloads we cannot decode are acknowledged and dropped.
            tracing::warn!("Ignoring undecodable update: {e}");
            return StatusCode::OK;
        }
    };

    let bot = state.bot.clone();
    tokio::spawn(async move {
        if let Err(e) = bot::dispatch_update(bot, update, state).await {
            tracing::error!("Update handler failed: {e:#}");
        }
    });

    StatusCode::OK
}

async fn register_webhook(State(state): State<AppState>) -> (StatusCode, String) {
    let Some(base) = state.config.webhook_url.clone() else {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "WEBHOOK_URL is not configured".to_string(),
        );
    };

    let url = match reqwest::Url::parse(&format!("{base}/webhook")) {
        Ok(url) => url,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Invalid WEBHOOK_URL: {e}"),
            )
        }
    };

    tracing::info!(%url, "Registering webhook");

    let mut request = state.bot.set_webhook(url);
    if let Some(secret) = state.config.webhook_secret.clone() {
        request = request.secret_token(secret);
    }

    match request.await {
        Ok(_) => (StatusCode::OK, "Webhook registered".to_string()),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("setWebhook failed: {e}"),
        ),
    }
}

async fn unregister_webhook(State(state): State<AppState>) -> (StatusCode, String) {
    tracing::info!("Removing webhook registration");

    match state.bot.delete_webhook().await {
        Ok(_) => (StatusCode::OK, "Webhook removed".to_string()),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("deleteWebhook failed: {e}"),
        ),
    }
}

async fn healthz(State(state): State<AppState>) -> Json<serde_json::Value> {
    let users = state.store.lock().await.user_count().await;
    Json(serde_json::json!({ "status": "ok", "users": users }))
}
