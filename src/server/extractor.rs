use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::PrivateCookieJar;
use axum_extra::extract::cookie::Key;
use serde::{Deserialize, Serialize};

use super::cookies;
use super::error::ApiError;
use super::state::AppState;
use crate::oauth::TokenResponse;
use crate::salesforce::OrgCredentials;

/// Login state and tokens carried in the encrypted session cookie.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    #[serde(default)]
    pub is_logged_in: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_verifier: Option<String>,
}

impl SessionData {
    /// Transition to logged-in with the tokens from a successful exchange.
    /// The PKCE verifier is single-use and is dropped here.
    pub fn log_in(&mut self, tokens: TokenResponse) {
        self.is_logged_in = true;
        self.access_token = Some(tokens.access_token);
        self.refresh_token = tokens.refresh_token;
        self.instance_url = Some(tokens.instance_url);
        self.code_verifier = None;
    }

    /// Bearer credentials, only when logged in with both token and instance URL.
    #[must_use]
    pub fn credentials(&self) -> Option<OrgCredentials> {
        if !self.is_logged_in {
            return None;
        }
        match (&self.instance_url, &self.access_token) {
            (Some(instance_url), Some(access_token)) => {
                Some(OrgCredentials::new(instance_url.clone(), access_token.clone()))
            }
            _ => None,
        }
    }
}

/// Exclusive handle to the current request's session.
///
/// Changes are only persisted when the jar returned by [`save`](Session::save)
/// or [`destroy`](Session::destroy) is part of the response.
///
/// ```rust,ignore
/// async fn handler(mut session: Session) -> Result<(PrivateCookieJar, &'static str), ApiError> {
///     session.data_mut().code_verifier = Some(verifier);
///     Ok((session.save()?, "ok"))
/// }
/// ```
pub struct Session {
    jar: PrivateCookieJar,
    data: SessionData,
    cookie_name: String,
    ttl_days: i64,
    secure: bool,
}

impl Session {
    #[must_use]
    pub fn data(&self) -> &SessionData {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut SessionData {
        &mut self.data
    }

    /// Serialize the session into the encrypted cookie.
    ///
    /// # Errors
    ///
    /// [`ApiError::Internal`] if the session cannot be serialized.
    pub fn save(self) -> Result<PrivateCookieJar, ApiError> {
        let value = serde_json::to_string(&self.data)
            .map_err(|e| ApiError::Internal(format!("session serialization failed: {e}")))?;
        let cookie = cookies::session_cookie(&self.cookie_name, value, self.ttl_days, self.secure);
        Ok(self.jar.add(cookie))
    }

    /// Expire the session cookie.
    #[must_use]
    pub fn destroy(self) -> PrivateCookieJar {
        // Added rather than removed so the expiry is sent even when the request
        // carried no session cookie.
        self.jar
            .add(cookies::clear_session_cookie(&self.cookie_name, self.secure))
    }
}

impl FromRequestParts<AppState> for Session {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar: PrivateCookieJar<Key> = match PrivateCookieJar::from_request_parts(parts, state).await {
            Ok(jar) => jar,
            Err(never) => match never {},
        };

        let settings = &state.config.session;
        let data: SessionData = jar
            .get(&settings.cookie_name)
            .and_then(|cookie| match serde_json::from_str(cookie.value()) {
                Ok(data) => Some(data),
                Err(e) => {
                    tracing::debug!(error = %e, "Discarding undecodable session cookie");
                    None
                }
            })
            .unwrap_or_default();

        Ok(Self {
            jar,
            data,
            cookie_name: settings.cookie_name.clone(),
            ttl_days: settings.ttl_days,
            secure: settings.secure_cookies,
        })
    }
}

/// Salesforce credentials of a logged-in session.
///
/// Use as an extractor in proxy handlers; rejects with `401` when the session
/// is logged out or incomplete.
#[derive(Debug, Clone)]
pub struct LoggedIn(pub OrgCredentials);

impl FromRequestParts<AppState> for LoggedIn {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state).await?;
        session
            .data()
            .credentials()
            .map(Self)
            .ok_or(ApiError::Unauthenticated)
    }
}
