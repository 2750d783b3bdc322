#![doc = include_str!("../README.md")]

pub mod error;
pub mod insight;
pub mod notifier;
pub mod oauth;
pub mod pkce;
pub mod salesforce;
pub mod server;
pub mod types;

// Re-exports for convenient access
pub use error::Error;
pub use insight::{NewInsight, ScoreFormula, ScoreInputs};
pub use notifier::AlertNotifier;
pub use oauth::{AuthClient, AuthorizationRequest, OAuthConfig, TokenResponse};
pub use pkce::{generate_code_challenge, generate_code_verifier};
pub use salesforce::{ObjectCall, OrgCredentials, QueryResponse, SalesforceClient};
pub use types::{DECISION_INSIGHT, DECISION_VIEW_EVENT, RecordId, SObjectName};
