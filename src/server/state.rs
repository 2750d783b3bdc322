use std::sync::Arc;
use std::time::Duration;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;

use super::config::AppConfig;
use crate::error::Error;
use crate::notifier::AlertNotifier;
use crate::salesforce::SalesforceClient;

/// Shared state for route handlers. Cloned per request; everything inside is
/// either immutable or a pooled client.
#[derive(Clone)]
pub struct AppState {
    pub(super) config: Arc<AppConfig>,
    pub(super) http: reqwest::Client,
    pub(super) salesforce: SalesforceClient,
    pub(super) notifier: Option<AlertNotifier>,
}

impl AppState {
    /// Build state from validated configuration.
    ///
    /// # Errors
    ///
    /// [`Error::Http`] if the HTTP client cannot be constructed.
    pub fn new(config: AppConfig) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        let notifier = config
            .alert_webhook_url
            .clone()
            .map(|url| AlertNotifier::new(url, http.clone()));

        Ok(Self {
            salesforce: SalesforceClient::new(http.clone()),
            notifier,
            http,
            config: Arc::new(config),
        })
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

// PrivateCookieJar requires Key to be extractable from state
impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.config.session.cookie_key.clone()
    }
}
