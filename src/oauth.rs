use serde::Deserialize;
use url::Url;

use crate::error::Error;
use crate::pkce;

/// Salesforce connected-app `OAuth2` configuration.
///
/// ```rust,ignore
/// use decision_debt_studio::OAuthConfig;
///
/// let config = OAuthConfig::new(
///     "https://login.salesforce.com".parse()?,
///     "my-consumer-key",
///     "https://my-app.com/api/auth/callback/salesforce".parse()?,
/// )
/// .with_client_secret("my-consumer-secret");
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct OAuthConfig {
    pub(crate) login_url: Url,
    pub(crate) client_id: String,
    pub(crate) client_secret: Option<String>,
    pub(crate) redirect_uri: Url,
    pub(crate) scopes: Vec<String>,
}

impl OAuthConfig {
    /// Create a new `OAuth2` configuration rooted at a Salesforce login host.
    #[must_use]
    pub fn new(login_url: Url, client_id: impl Into<String>, redirect_uri: Url) -> Self {
        Self {
            login_url,
            client_id: client_id.into(),
            client_secret: None,
            redirect_uri,
            scopes: vec!["api".into(), "refresh_token".into()],
        }
    }

    /// Consumer secret sent with the token exchange.
    #[must_use]
    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    /// Override the `OAuth2` scopes (default: `["api", "refresh_token"]`).
    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    #[must_use]
    pub fn login_url(&self) -> &Url {
        &self.login_url
    }

    #[must_use]
    pub fn redirect_uri(&self) -> &Url {
        &self.redirect_uri
    }

    #[must_use]
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    /// `{login}/services/oauth2/authorize`
    #[must_use]
    pub fn authorize_url(&self) -> Url {
        self.endpoint("authorize")
    }

    /// `{login}/services/oauth2/token`
    #[must_use]
    pub fn token_url(&self) -> Url {
        self.endpoint("token")
    }

    fn endpoint(&self, name: &str) -> Url {
        let mut url = self.login_url.clone();
        let base = url.path().trim_end_matches('/').to_string();
        url.set_path(&format!("{base}/services/oauth2/{name}"));
        url
    }
}

/// `OAuth2` authorization client for a Salesforce org.
pub struct AuthClient {
    config: OAuthConfig,
    http: reqwest::Client,
}

/// Authorization URL plus the PKCE verifier to store in the session.
#[non_exhaustive]
pub struct AuthorizationRequest {
    pub url: String,
    pub code_verifier: String,
}

/// Token response from the Salesforce token endpoint.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct TokenResponse {
    pub access_token: String,
    pub instance_url: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub issued_at: Option<String>,
}

impl AuthClient {
    #[must_use]
    pub fn new(config: OAuthConfig) -> Self {
        Self::with_client(config, reqwest::Client::new())
    }

    /// Build on a shared HTTP client (connection pool reuse, timeouts).
    #[must_use]
    pub fn with_client(config: OAuthConfig, http: reqwest::Client) -> Self {
        Self { config, http }
    }

    /// Generate an authorization URL with PKCE parameters.
    #[must_use]
    pub fn authorization_url(&self) -> AuthorizationRequest {
        let code_verifier = pkce::generate_code_verifier();
        let code_challenge = pkce::generate_code_challenge(&code_verifier);
        let scope = self.config.scopes.join(" ");

        let mut url = self.config.authorize_url();
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", self.config.redirect_uri.as_str())
            .append_pair("response_type", "code")
            .append_pair("scope", &scope)
            .append_pair("code_challenge", &code_challenge)
            .append_pair("code_challenge_method", "S256");

        AuthorizationRequest {
            url: url.into(),
            code_verifier,
        }
    }

    /// Exchange an authorization code for tokens using PKCE.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if no client secret is configured,
    /// [`Error::Http`] on network failure, or [`Error::Upstream`] carrying the
    /// provider's JSON error body if the token endpoint rejects the exchange.
    pub async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<TokenResponse, Error> {
        let client_secret = self
            .config
            .client_secret
            .as_deref()
            .ok_or_else(|| Error::Config("SF_CLIENT_SECRET is required".into()))?;

        let params = [
            ("grant_type", "authorization_code"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", client_secret),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("code", code),
            ("code_verifier", code_verifier),
        ];

        let response = self
            .http
            .post(self.config.token_url())
            .form(&params)
            .send()
            .await?;

        let response = Self::ensure_success(response, "token exchange").await?;
        response.json::<TokenResponse>().await.map_err(Into::into)
    }

    async fn ensure_success(
        response: reqwest::Response,
        operation: &'static str,
    ) -> Result<reqwest::Response, Error> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();
        let body = serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text));
        Err(Error::Upstream {
            operation,
            status,
            body,
        })
    }
}

/// Provider-supplied `error_description` of a failed token exchange, if any.
#[must_use]
pub fn error_description(err: &Error) -> Option<&str> {
    match err {
        Error::Upstream { body, .. } => body.get("error_description").and_then(|v| v.as_str()),
        _ => None,
    }
}
