//! Salesforce REST/SOQL data API client.
//!
//! Every call is a single authenticated request against the org the session
//! logged into; responses are passed back as raw JSON.

use reqwest::Method;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::Error;
use crate::types::{RecordId, SObjectName};

/// REST API version used for every data call.
pub const API_VERSION: &str = "v60.0";

/// Bearer credentials for one org, taken from the session.
#[derive(Debug, Clone)]
pub struct OrgCredentials {
    pub instance_url: String,
    pub access_token: String,
}

impl OrgCredentials {
    #[must_use]
    pub fn new(instance_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            instance_url: instance_url.into(),
            access_token: access_token.into(),
        }
    }

    fn base(&self) -> &str {
        self.instance_url.trim_end_matches('/')
    }
}

/// One call against an sobject endpoint.
///
/// `record` selects `sobjects/{object}/{id}`; without it the call targets the
/// collection `sobjects/{object}/`.
#[derive(Debug, Clone)]
pub struct ObjectCall<'a> {
    pub method: Method,
    pub object: SObjectName,
    pub record: Option<&'a RecordId>,
    pub body: Option<&'a Value>,
}

impl<'a> ObjectCall<'a> {
    /// `POST sobjects/{object}/`
    #[must_use]
    pub fn create(object: SObjectName, body: &'a Value) -> Self {
        Self {
            method: Method::POST,
            object,
            record: None,
            body: Some(body),
        }
    }

    /// `PATCH sobjects/{object}/{id}`
    #[must_use]
    pub fn update(object: SObjectName, id: &'a RecordId, body: &'a Value) -> Self {
        Self {
            method: Method::PATCH,
            object,
            record: Some(id),
            body: Some(body),
        }
    }

    fn operation(&self) -> &'static str {
        match self.method {
            Method::POST => "create record",
            Method::PATCH => "update record",
            Method::DELETE => "delete record",
            _ => "record request",
        }
    }
}

/// Result page of a SOQL query.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse<T> {
    #[serde(default)]
    pub total_size: u64,
    #[serde(default = "default_done")]
    pub done: bool,
    #[serde(default = "Vec::new")]
    pub records: Vec<T>,
}

fn default_done() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct DescribeGlobal {
    #[serde(default)]
    sobjects: Vec<SObjectSummary>,
}

#[derive(Debug, Deserialize)]
struct SObjectSummary {
    name: String,
}

/// Salesforce data API client. Cheap to clone; shares the connection pool.
#[derive(Debug, Clone)]
pub struct SalesforceClient {
    http: reqwest::Client,
    api_version: String,
}

impl SalesforceClient {
    #[must_use]
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            api_version: API_VERSION.into(),
        }
    }

    #[must_use]
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Forward one sobject call with the org's bearer token.
    ///
    /// Returns the upstream JSON body, or `None` for empty bodies (`204`).
    ///
    /// # Errors
    ///
    /// [`Error::Upstream`] with the upstream status and body on non-2xx,
    /// [`Error::Http`] on transport failure.
    pub async fn forward(
        &self,
        creds: &OrgCredentials,
        call: ObjectCall<'_>,
    ) -> Result<Option<Value>, Error> {
        let mut url = format!("{}/sobjects/{}/", self.data_url(creds), call.object);
        if let Some(id) = call.record {
            url.push_str(&urlencoding::encode(id.as_str()));
        }

        let mut request = self.authorized(creds, call.method.clone(), &url);
        if let Some(body) = call.body {
            request = request.json(body);
        }
        Self::execute(request, call.operation()).await
    }

    /// Run a SOQL query.
    ///
    /// # Errors
    ///
    /// [`Error::Upstream`] on non-2xx, [`Error::UnexpectedResponse`] if the
    /// body does not match the expected record shape.
    pub async fn query<T: DeserializeOwned>(
        &self,
        creds: &OrgCredentials,
        soql: &str,
    ) -> Result<QueryResponse<T>, Error> {
        let url = format!("{}/query", self.data_url(creds));
        let request = self
            .authorized(creds, Method::GET, &url)
            .query(&[("q", soql)]);
        let body = Self::execute(request, "query").await?.unwrap_or(Value::Null);
        serde_json::from_value(body).map_err(|e| Error::UnexpectedResponse {
            operation: "query",
            detail: e.to_string(),
        })
    }

    /// API names of every sobject visible to the session user.
    ///
    /// # Errors
    ///
    /// Same as [`query`](Self::query).
    pub async fn sobject_names(&self, creds: &OrgCredentials) -> Result<Vec<String>, Error> {
        let url = format!("{}/sobjects", self.data_url(creds));
        let request = self.authorized(creds, Method::GET, &url);
        let body = Self::execute(request, "describe global")
            .await?
            .unwrap_or(Value::Null);
        let describe: DescribeGlobal =
            serde_json::from_value(body).map_err(|e| Error::UnexpectedResponse {
                operation: "describe global",
                detail: e.to_string(),
            })?;
        Ok(describe.sobjects.into_iter().map(|s| s.name).collect())
    }

    /// Request a single-access (frontdoor) URL for the session's user.
    ///
    /// # Errors
    ///
    /// [`Error::Upstream`] on non-2xx, [`Error::Http`] on transport failure.
    pub async fn single_access(&self, creds: &OrgCredentials) -> Result<Value, Error> {
        let url = format!("{}/services/oauth2/singleaccess", creds.base());
        let request = self.authorized(creds, Method::POST, &url);
        Ok(Self::execute(request, "single access")
            .await?
            .unwrap_or(Value::Null))
    }

    fn data_url(&self, creds: &OrgCredentials) -> String {
        format!("{}/services/data/{}", creds.base(), self.api_version)
    }

    fn authorized(
        &self,
        creds: &OrgCredentials,
        method: Method,
        url: &str,
    ) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .bearer_auth(&creds.access_token)
            .header(ACCEPT, "application/json")
    }

    async fn execute(
        request: reqwest::RequestBuilder,
        operation: &'static str,
    ) -> Result<Option<Value>, Error> {
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        let body = if text.trim().is_empty() {
            None
        } else {
            Some(serde_json::from_str(&text).unwrap_or(Value::String(text)))
        };

        if !status.is_success() {
            tracing::warn!(operation, status = status.as_u16(), "Salesforce API error");
            return Err(Error::Upstream {
                operation,
                status: status.as_u16(),
                body: body.unwrap_or(Value::Null),
            });
        }
        Ok(body)
    }
}
