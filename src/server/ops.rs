use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde_json::{Value, json};

use super::error::ApiError;
use super::extractor::{LoggedIn, Session};
use super::state::AppState;
use crate::types::DECISION_INSIGHT;

// ── Health ─────────────────────────────────────────────────────────

fn presence(set: bool) -> &'static str {
    if set { "OK" } else { "MISSING" }
}

pub(super) async fn health(State(state): State<AppState>) -> Json<Value> {
    let config = &state.config;
    let sf = &config.salesforce;

    Json(json!({
        "salesforce": {
            "SF_LOGIN_URL": presence(sf.login_url.is_some()),
            "SF_CLIENT_ID": presence(sf.client_id.is_some()),
            "SF_CLIENT_SECRET": presence(sf.client_secret.is_some()),
            "SF_REDIRECT_URI": presence(sf.redirect_uri.is_some()),
        },
        // The server does not start without a valid password.
        "session": { "SESSION_PASSWORD": "OK" },
        "alert": { "SLACK_WEBHOOK_URL": presence(config.alert_webhook_url.is_some()) },
        "tableau": { "TABLEAU_URL": presence(config.tableau_url.is_some()) },
        "status": "ok",
        "message": "If any of the above are MISSING, set them in the environment or .env and restart the server.",
    }))
}

// ── Alert ──────────────────────────────────────────────────────────

pub(super) async fn alert(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let Some(notifier) = &state.notifier else {
        tracing::error!("Slack webhook URL is not configured");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "success": false, "message": "Slack Webhook URL is not configured." })),
        );
    };

    match notifier.send_decision_debt_alert().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "success": true }))),
        Err(e) => {
            tracing::error!(error = %e, "Error sending Slack alert");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "message": "Error sending Slack alert." })),
            )
        }
    }
}

// ── Debug ──────────────────────────────────────────────────────────

pub(super) async fn debug_session(session: Session) -> Json<Value> {
    let data = session.data();
    Json(json!({
        "isLoggedIn": data.is_logged_in,
        "instanceUrl": data.instance_url,
        "hasAccessToken": data.access_token.is_some(),
    }))
}

pub(super) async fn debug_sobjects(
    State(state): State<AppState>,
    LoggedIn(creds): LoggedIn,
) -> Result<Json<Value>, ApiError> {
    let names = state.salesforce.sobject_names(&creds).await?;

    Ok(Json(json!({
        "instanceUrl": creds.instance_url,
        "total": names.len(),
        "containsDecisionInsight": names.iter().any(|n| n == DECISION_INSIGHT.as_str()),
        "namesSample": names.iter().take(50).collect::<Vec<_>>(),
    })))
}
