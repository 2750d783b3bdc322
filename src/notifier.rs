use serde::Serialize;
use url::Url;

use crate::error::Error;

/// Message posted when a high-risk insight has been viewed without action.
pub const DECISION_DEBT_ALERT: &str = "⚠️ DecisionLag Alert\nHigh-risk insight viewed but not acted upon.\nDecision Debt threshold exceeded.";

#[derive(Serialize)]
struct WebhookMessage<'a> {
    text: &'a str,
}

/// Posts alert messages to a Slack-compatible incoming webhook. No retries.
#[derive(Debug, Clone)]
pub struct AlertNotifier {
    webhook_url: Url,
    http: reqwest::Client,
}

impl AlertNotifier {
    #[must_use]
    pub fn new(webhook_url: Url, http: reqwest::Client) -> Self {
        Self { webhook_url, http }
    }

    /// Send the fixed decision-debt alert.
    ///
    /// # Errors
    ///
    /// [`Error::Http`] on transport failure, [`Error::Upstream`] if the
    /// webhook answers with a non-2xx status.
    pub async fn send_decision_debt_alert(&self) -> Result<(), Error> {
        self.send(DECISION_DEBT_ALERT).await
    }

    /// Post `text` to the webhook.
    ///
    /// # Errors
    ///
    /// See [`send_decision_debt_alert`](Self::send_decision_debt_alert).
    pub async fn send(&self, text: &str) -> Result<(), Error> {
        let response = self
            .http
            .post(self.webhook_url.clone())
            .json(&WebhookMessage { text })
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(Error::Upstream {
            operation: "webhook alert",
            status: status.as_u16(),
            body: serde_json::Value::String(body),
        })
    }
}
