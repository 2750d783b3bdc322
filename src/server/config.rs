use axum_extra::extract::cookie::Key;
use url::Url;

use crate::error::Error;
use crate::oauth::OAuthConfig;

/// Minimum length of `SESSION_PASSWORD`.
pub const MIN_SESSION_PASSWORD_LEN: usize = 32;

const MISSING_SALESFORCE_ENV: &str = "Salesforce environment variables are not set";

/// Salesforce connected-app settings.
///
/// Every field is optional at boot; handlers that need them answer `500`
/// when they are absent, and `/api/health` reports which ones are missing.
#[derive(Debug, Clone, Default)]
pub struct SalesforceSettings {
    pub login_url: Option<Url>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<Url>,
}

impl SalesforceSettings {
    /// Settings needed to start the authorization-code flow.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if the login URL, client id or redirect URI is unset.
    pub fn authorize_config(&self) -> Result<OAuthConfig, Error> {
        match (&self.login_url, &self.client_id, &self.redirect_uri) {
            (Some(login_url), Some(client_id), Some(redirect_uri)) => Ok(OAuthConfig::new(
                login_url.clone(),
                client_id.clone(),
                redirect_uri.clone(),
            )),
            _ => Err(Error::Config(MISSING_SALESFORCE_ENV.into())),
        }
    }

    /// Settings needed to exchange an authorization code.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if any of the four values is unset.
    pub fn token_config(&self) -> Result<OAuthConfig, Error> {
        let secret = self
            .client_secret
            .as_ref()
            .ok_or_else(|| Error::Config(MISSING_SALESFORCE_ENV.into()))?;
        Ok(self.authorize_config()?.with_client_secret(secret.clone()))
    }
}

/// Session cookie settings.
#[derive(Clone)]
pub(crate) struct SessionSettings {
    pub(crate) cookie_key: Key,
    pub(crate) cookie_name: String,
    pub(crate) ttl_days: i64,
    pub(crate) secure_cookies: bool,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Application configuration, validated once at startup and shared by every
/// handler through [`AppState`](super::AppState).
///
/// Use [`from_env()`](AppConfig::from_env) in production, or
/// [`from_lookup()`](AppConfig::from_lookup) to supply values directly.
#[derive(Clone)]
pub struct AppConfig {
    pub salesforce: SalesforceSettings,
    pub(crate) session: SessionSettings,
    pub alert_webhook_url: Option<Url>,
    pub tableau_url: Option<String>,
    pub request_timeout_ms: u64,
    pub debug_routes: bool,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from the process environment (and `.env`, if present).
    ///
    /// # Required env vars
    /// - `SESSION_PASSWORD`: at least 32 characters, used to derive the cookie key
    ///
    /// # Optional env vars
    /// - `SF_LOGIN_URL`, `SF_CLIENT_ID`, `SF_CLIENT_SECRET`, `SF_REDIRECT_URI`
    /// - `SLACK_WEBHOOK_URL`: alert webhook
    /// - `TABLEAU_URL` (or `NEXT_PUBLIC_TABLEAU_URL`): dashboard URL
    /// - `SESSION_TTL_DAYS`: cookie lifetime (default 14)
    /// - `SECURE_COOKIES`: `true`/`false`; defaults to `APP_ENV == "production"`
    /// - `REQUEST_TIMEOUT_MS`: upstream timeout (default 30000)
    /// - `DEBUG_ROUTES`: `1`/`true` mounts `/api/debug/*`
    /// - `LOG_LEVEL`, `LOG_FORMAT` (`pretty` | `json`)
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the session password is missing or short,
    /// or a URL value does not parse.
    pub fn from_env() -> Result<Self, Error> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup. Empty values count as unset.
    ///
    /// # Errors
    ///
    /// Same as [`from_env()`](AppConfig::from_env).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let password = get("SESSION_PASSWORD").unwrap_or_default();
        if password.chars().count() < MIN_SESSION_PASSWORD_LEN {
            return Err(Error::Config(format!(
                "SESSION_PASSWORD must be set to a secret of at least \
                 {MIN_SESSION_PASSWORD_LEN} characters. Check /api/health after fixing it."
            )));
        }

        let salesforce = SalesforceSettings {
            login_url: get("SF_LOGIN_URL")
                .map(|raw| parse_url("SF_LOGIN_URL", &normalize_login_url(&raw)))
                .transpose()?,
            client_id: get("SF_CLIENT_ID"),
            client_secret: get("SF_CLIENT_SECRET"),
            redirect_uri: get("SF_REDIRECT_URI")
                .map(|raw| parse_url("SF_REDIRECT_URI", &raw))
                .transpose()?,
        };

        let secure_cookies = match get("SECURE_COOKIES").as_deref() {
            Some(value) => parse_flag(value),
            None => get("APP_ENV").as_deref() == Some("production"),
        };

        let session = SessionSettings {
            cookie_key: Key::derive_from(password.as_bytes()),
            cookie_name: "decision-debt-studio-session".into(),
            ttl_days: parse_or("SESSION_TTL_DAYS", get("SESSION_TTL_DAYS"), 14)?,
            secure_cookies,
        };

        let logging = LoggingConfig {
            level: get("LOG_LEVEL").unwrap_or_else(|| "info".into()),
            format: match get("LOG_FORMAT").map(|f| f.to_lowercase()).as_deref() {
                Some("json") => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        Ok(Self {
            salesforce,
            session,
            alert_webhook_url: get("SLACK_WEBHOOK_URL")
                .map(|raw| parse_url("SLACK_WEBHOOK_URL", &raw))
                .transpose()?,
            tableau_url: get("TABLEAU_URL").or_else(|| get("NEXT_PUBLIC_TABLEAU_URL")),
            request_timeout_ms: parse_or("REQUEST_TIMEOUT_MS", get("REQUEST_TIMEOUT_MS"), 30_000)?,
            debug_routes: get("DEBUG_ROUTES").as_deref().is_some_and(parse_flag),
            logging,
        })
    }

    #[must_use]
    pub fn with_salesforce(mut self, salesforce: SalesforceSettings) -> Self {
        self.salesforce = salesforce;
        self
    }

    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.session.secure_cookies = secure;
        self
    }

    #[must_use]
    pub fn with_session_ttl_days(mut self, days: i64) -> Self {
        self.session.ttl_days = days;
        self
    }

    #[must_use]
    pub fn with_debug_routes(mut self, enabled: bool) -> Self {
        self.debug_routes = enabled;
        self
    }

    #[must_use]
    pub fn session_cookie_name(&self) -> &str {
        &self.session.cookie_name
    }

    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.session.secure_cookies
    }
}

/// Accepts values pasted as `KEY=https://...` and strips trailing slashes.
pub(crate) fn normalize_login_url(raw: &str) -> String {
    let value = raw.rsplit('=').next().unwrap_or(raw).trim();
    value.trim_end_matches('/').to_string()
}

fn parse_url(key: &str, raw: &str) -> Result<Url, Error> {
    raw.parse()
        .map_err(|e| Error::Config(format!("{key}: {e}")))
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true")
}

fn parse_or<T: std::str::FromStr>(key: &str, value: Option<String>, default: T) -> Result<T, Error> {
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{key}: invalid value {raw:?}"))),
        None => Ok(default),
    }
}
