use axum::Router;
use axum::extract::{Query, State};
use axum::http::header::{CACHE_CONTROL, EXPIRES, PRAGMA};
use axum::response::{IntoResponse, Redirect};
use axum::routing::{get, patch, post};
use axum_extra::extract::PrivateCookieJar;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use super::error::ApiError;
use super::extractor::Session;
use super::state::AppState;
use super::{ops, proxy};
use crate::error::Error;
use crate::oauth::{self, AuthClient};

/// Where the callback sends the browser after a successful login.
const LOGIN_REDIRECT: &str = "/insights";
const LOGOUT_REDIRECT: &str = "/?logout=true";

/// Create the application router.
pub fn router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/api/auth/login", get(login))
        .route("/api/auth/callback/salesforce", get(callback))
        .route("/api/auth/logout", get(logout))
        .route("/api/health", get(ops::health))
        .route("/api/alert", post(ops::alert))
        .route("/api/salesforce/insights/create", post(proxy::create_insight))
        .route("/api/salesforce/insights/list", get(proxy::list_insights))
        .route("/api/salesforce/insights/updateView", patch(proxy::update_view))
        .route(
            "/api/salesforce/view-events/create",
            post(proxy::create_view_event),
        )
        .route("/api/tableau/frontdoor", post(proxy::frontdoor));

    if state.config.debug_routes {
        router = router
            .route("/api/debug/session", get(ops::debug_session))
            .route("/api/debug/sobjects", get(ops::debug_sobjects));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

// ── Login ──────────────────────────────────────────────────────────

async fn login(
    State(state): State<AppState>,
    mut session: Session,
) -> Result<(PrivateCookieJar, Redirect), ApiError> {
    let config = state.config.salesforce.authorize_config()?;
    let auth_req = AuthClient::with_client(config, state.http.clone()).authorization_url();

    session.data_mut().code_verifier = Some(auth_req.code_verifier);
    let jar = session.save()?;

    Ok((jar, Redirect::to(&auth_req.url)))
}

// ── Callback ───────────────────────────────────────────────────────

#[derive(Deserialize)]
struct CallbackParams {
    code: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

async fn callback(
    State(state): State<AppState>,
    mut session: Session,
    Query(params): Query<CallbackParams>,
) -> Result<(PrivateCookieJar, Redirect), ApiError> {
    if let Some(error) = params.error.filter(|e| !e.is_empty()) {
        return Err(ApiError::OAuthDenied {
            error,
            description: params.error_description,
        });
    }

    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::Validation("No code found".into()))?;

    let code_verifier = session
        .data()
        .code_verifier
        .clone()
        .ok_or_else(|| ApiError::Validation("No code verifier found in session".into()))?;

    let config = state.config.salesforce.token_config()?;

    let tokens = AuthClient::with_client(config, state.http.clone())
        .exchange_code(&code, &code_verifier)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Token exchange failed");
            ApiError::Internal(token_exchange_message(&e))
        })?;

    let instance_url = tokens.instance_url.clone();
    session.data_mut().log_in(tokens);
    let jar = session.save()?;

    tracing::info!(instance_url = %instance_url, "Salesforce OAuth2 login successful");

    Ok((jar, Redirect::to(LOGIN_REDIRECT)))
}

fn token_exchange_message(err: &Error) -> String {
    match err {
        Error::Upstream { .. } => oauth::error_description(err)
            .unwrap_or("Salesforce token exchange failed")
            .to_string(),
        other => other.to_string(),
    }
}

// ── Logout ─────────────────────────────────────────────────────────

async fn logout(session: Session) -> impl IntoResponse {
    (
        session.destroy(),
        [
            (
                CACHE_CONTROL,
                "no-store, no-cache, must-revalidate, proxy-revalidate",
            ),
            (PRAGMA, "no-cache"),
            (EXPIRES, "0"),
        ],
        Redirect::to(LOGOUT_REDIRECT),
    )
}
