//! Session-authenticated handlers forwarding to the Salesforce data API.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use super::error::ApiError;
use super::extractor::{LoggedIn, Session};
use super::state::AppState;
use crate::error::Error;
use crate::salesforce::{ObjectCall, OrgCredentials};
use crate::types::{DECISION_INSIGHT, DECISION_VIEW_EVENT, RecordId, SObjectName};

/// A create endpoint that forwards a JSON object to one sobject collection.
#[derive(Debug, Clone, Copy)]
pub struct RecordRoute {
    pub object: SObjectName,
    /// Fields that must be present before the call is forwarded.
    pub required: &'static [&'static str],
    /// Field stamped with the current time before forwarding.
    pub timestamp_field: Option<&'static str>,
}

pub const CREATE_INSIGHT: RecordRoute = RecordRoute {
    object: DECISION_INSIGHT,
    required: &["Title__c", "Impact__c", "Risk__c", "Confidence__c"],
    timestamp_field: None,
};

pub const CREATE_VIEW_EVENT: RecordRoute = RecordRoute {
    object: DECISION_VIEW_EVENT,
    required: &["Insight__c", "Viewer_Name__c", "Source__c"],
    timestamp_field: Some("Viewed_At__c"),
};

const LIST_INSIGHTS_SOQL: &str = "SELECT Id, Title__c, Debt_Score__c, CreatedDate, \
     View_Count__c, Last_Viewed_At__c FROM Decision_Insight__c \
     ORDER BY CreatedDate DESC LIMIT 100";

impl RecordRoute {
    /// Validate `body` and create one record, answering `201` with the
    /// upstream body.
    ///
    /// # Errors
    ///
    /// `400` on malformed or incomplete input, `400` with a hint when the
    /// object is unknown to the org, the upstream status otherwise.
    pub async fn create(
        &self,
        state: &AppState,
        creds: &OrgCredentials,
        body: &[u8],
    ) -> Result<(StatusCode, Json<Value>), ApiError> {
        let mut fields = parse_object(body)?;
        if !self
            .required
            .iter()
            .all(|field| is_present(fields.get(*field)))
        {
            return Err(ApiError::Validation("Missing required fields".into()));
        }
        if let Some(field) = self.timestamp_field {
            fields.insert(field.to_string(), Value::String(timestamp_now()?));
        }

        let payload = Value::Object(fields);
        let created = state
            .salesforce
            .forward(creds, ObjectCall::create(self.object, &payload))
            .await
            .map_err(|e| ApiError::for_object(e, self.object))?;

        tracing::info!(object = %self.object, "Record created");
        Ok((StatusCode::CREATED, Json(created.unwrap_or(Value::Null))))
    }
}

// ── Insights ───────────────────────────────────────────────────────

pub(super) async fn create_insight(
    State(state): State<AppState>,
    LoggedIn(creds): LoggedIn,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    CREATE_INSIGHT.create(&state, &creds, &body).await
}

pub(super) async fn list_insights(
    State(state): State<AppState>,
    LoggedIn(creds): LoggedIn,
) -> Result<Json<Vec<Value>>, ApiError> {
    let page = state
        .salesforce
        .query::<Value>(&creds, LIST_INSIGHTS_SOQL)
        .await
        .map_err(|e| ApiError::for_object(e, DECISION_INSIGHT))?;
    Ok(Json(page.records))
}

const INSIGHT_NOT_FOUND: &str = "Failed to fetch insight or insight not found";

#[derive(Deserialize)]
struct ViewCountRecord {
    #[serde(rename = "View_Count__c", default)]
    view_count: Option<f64>,
}

/// Increment `View_Count__c` and stamp `Last_Viewed_At__c`.
///
/// Read-modify-write without concurrency control: two concurrent views can
/// both read `n` and both write `n + 1`.
pub(super) async fn update_view(
    State(state): State<AppState>,
    LoggedIn(creds): LoggedIn,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let fields = parse_object(&body)?;
    let raw_id = fields
        .get("insightId")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::Validation("Missing insightId".into()))?;
    let insight_id: RecordId = raw_id.parse()?;

    let soql = format!("SELECT View_Count__c FROM {DECISION_INSIGHT} WHERE Id = '{insight_id}'");
    let page = state
        .salesforce
        .query::<ViewCountRecord>(&creds, &soql)
        .await
        .map_err(|e| match ApiError::for_object(e, DECISION_INSIGHT) {
            ApiError::Upstream {
                status, details, ..
            } => ApiError::Upstream {
                status,
                message: INSIGHT_NOT_FOUND.into(),
                details,
            },
            other => other,
        })?;

    let current = page
        .records
        .first()
        .ok_or_else(|| ApiError::upstream(404, INSIGHT_NOT_FOUND, Value::Null))?
        .view_count;

    let update = json!({
        "Last_Viewed_At__c": timestamp_now()?,
        "View_Count__c": next_view_count(current),
    });

    state
        .salesforce
        .forward(&creds, ObjectCall::update(DECISION_INSIGHT, &insight_id, &update))
        .await
        .map_err(|e| match e {
            Error::Upstream { status, body, .. } => {
                ApiError::upstream(status, "Salesforce API error on update", body)
            }
            other => other.into(),
        })?;

    Ok(StatusCode::NO_CONTENT)
}

/// Null counts as zero; Salesforce reports number fields as floats.
fn next_view_count(current: Option<f64>) -> u64 {
    let current = current.unwrap_or(0.0).max(0.0);
    current.round() as u64 + 1
}

// ── View events ────────────────────────────────────────────────────

pub(super) async fn create_view_event(
    State(state): State<AppState>,
    LoggedIn(creds): LoggedIn,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    CREATE_VIEW_EVENT.create(&state, &creds, &body).await
}

// ── Tableau frontdoor ──────────────────────────────────────────────

const DEFAULT_FRONTDOOR_TTL_SECS: u64 = 300;

const MISSING_SCOPE_HINT: &str = "Your Salesforce Connected App is missing the \"wave_api\" OAuth scope.\n\n\
To fix this:\n\
1. Go to Salesforce Setup\n\
2. Navigate to: App Manager\n\
3. Find your Connected App and click \"Edit\"\n\
4. Under \"Selected OAuth Scopes\", add \"Access Wave API (wave_api)\"\n\
5. Save, then log out and log back in to get a token with the new scope";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FrontdoorBody {
    access_token: Option<String>,
    instance_url: Option<String>,
}

/// Issue a single-access URL for embedding CRM Analytics.
///
/// Credentials come from the session; when it is logged out, from a JSON
/// body `{accessToken, instanceUrl}`.
pub(super) async fn frontdoor(
    State(state): State<AppState>,
    session: Session,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let creds = session
        .data()
        .credentials()
        .or_else(|| credentials_from_body(&body))
        .ok_or_else(|| ApiError::Custom {
            status: StatusCode::UNAUTHORIZED,
            body: json!({
                "error": "Not authenticated",
                "details": "Please log in to Salesforce first",
            }),
        })?;

    let data = match state.salesforce.single_access(&creds).await {
        Ok(data) => data,
        Err(Error::Upstream { status, body, .. }) => return Err(frontdoor_error(status, body)),
        Err(e) => {
            tracing::error!(error = %e, "Error generating frontdoor URL");
            return Err(ApiError::Custom {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: json!({ "error": "Internal server error", "details": e.to_string() }),
            });
        }
    };

    let frontdoor_url = data
        .get("frontdoorUrl")
        .or_else(|| data.get("url"))
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::Custom {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: json!({
                "error": "Invalid response from Salesforce",
                "details": "No frontdoor URL in response",
            }),
        })?;

    Ok(Json(json!({
        "frontdoorUrl": frontdoor_url,
        "expiresIn": frontdoor_ttl(data.get("expiresIn")),
    })))
}

/// Missing, zero or non-numeric lifetimes fall back to the default.
fn frontdoor_ttl(value: Option<&Value>) -> u64 {
    value
        .and_then(|v| v.as_u64().or_else(|| v.as_f64().map(|secs| secs.round() as u64)))
        .filter(|&secs| secs > 0)
        .unwrap_or(DEFAULT_FRONTDOOR_TTL_SECS)
}

fn credentials_from_body(body: &[u8]) -> Option<OrgCredentials> {
    let body: FrontdoorBody = serde_json::from_slice(body).ok()?;
    match (body.instance_url, body.access_token) {
        (Some(instance_url), Some(access_token))
            if !instance_url.is_empty() && !access_token.is_empty() =>
        {
            Some(OrgCredentials::new(instance_url, access_token))
        }
        _ => None,
    }
}

fn frontdoor_error(status: u16, body: Value) -> ApiError {
    let raw = match body {
        Value::String(text) => json!({ "error": text }),
        other => other,
    };
    let field = |key: &str| raw.get(key).and_then(Value::as_str);

    let code = field("error")
        .or_else(|| field("errorCode"))
        .unwrap_or_default()
        .to_lowercase();

    let (error, hint) = if code.contains("scope") {
        ("❌ Missing Wave API Scope", MISSING_SCOPE_HINT)
    } else if status == 401 {
        (
            "❌ Authentication Failed",
            "Your access token may have expired. Please log out and log back in.",
        )
    } else if status == 403 {
        (
            "❌ Access Denied",
            "Your user may not have permission to access CRM Analytics. Check your \
             Salesforce user permissions and ensure CRM Analytics is enabled for your user.",
        )
    } else {
        ("Failed to generate frontdoor URL", "")
    };

    let details = field("error_description")
        .or_else(|| field("error"))
        .or_else(|| field("message"))
        .unwrap_or("Unknown error")
        .to_string();

    ApiError::Custom {
        status: StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
        body: json!({
            "error": error,
            "details": details,
            "hint": hint,
            "status": status,
            "rawError": raw,
        }),
    }
}

// ── Helpers ────────────────────────────────────────────────────────

fn parse_object(body: &[u8]) -> Result<Map<String, Value>, ApiError> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(_) => Err(ApiError::Validation(
            "Request body must be a JSON object".into(),
        )),
        Err(e) => Err(ApiError::Validation(format!("Invalid JSON body: {e}"))),
    }
}

/// Absent, `null`, `false` and `""` are missing; numeric zero is present.
fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

fn timestamp_now() -> Result<String, ApiError> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(|e| ApiError::Internal(format!("timestamp formatting failed: {e}")))
}
