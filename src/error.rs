#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("{operation} failed with status {status}")]
    Upstream {
        operation: &'static str,
        status: u16,
        body: serde_json::Value,
    },
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Invalid record id: {0:?}")]
    InvalidRecordId(String),
    #[error("Unexpected response from {operation}: {detail}")]
    UnexpectedResponse {
        operation: &'static str,
        detail: String,
    },
}

impl Error {
    /// Salesforce error code of the first entry in an upstream error array.
    ///
    /// Salesforce REST errors look like `[{"message", "errorCode", "fields"}]`.
    #[must_use]
    pub fn upstream_error_code(&self) -> Option<&str> {
        match self {
            Self::Upstream { body, .. } => body
                .as_array()
                .and_then(|entries| entries.first())
                .and_then(|entry| entry.get("errorCode"))
                .and_then(|code| code.as_str()),
            _ => None,
        }
    }
}
