//! Insight, view-event and frontdoor proxies against a mocked org.

mod common;

use axum::http::{Method, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use wiremock::matchers::{body_json as body_is, body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::*;

const INSIGHT_ID: &str = "a015g00000XyZaBAAV";
const DATA_PATH: &str = "/services/data/v60.0";

fn insight_body() -> Value {
    json!({
        "Title__c": "Renew vendor contract",
        "Impact__c": 8,
        "Risk__c": 9,
        "Confidence__c": 0,
        "Debt_Score__c": 36.0,
    })
}

#[tokio::test]
async fn session_routes_require_login() {
    let app = app(config(&[]));

    for (method, uri) in [
        (Method::POST, "/api/salesforce/insights/create"),
        (Method::GET, "/api/salesforce/insights/list"),
        (Method::PATCH, "/api/salesforce/insights/updateView"),
        (Method::POST, "/api/salesforce/view-events/create"),
    ] {
        let response = send(&app, method, uri, None, Some(json!({}))).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(body_json(response).await, json!({ "error": "Not authorized" }));
    }
}

#[tokio::test]
async fn tampered_cookie_counts_as_logged_out() {
    let app = app(config(&[]));

    let response = send(
        &app,
        Method::GET,
        "/api/salesforce/insights/list",
        Some(&format!("{COOKIE_NAME}=not-a-valid-ciphertext")),
        None,
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_insight_forwards_with_bearer_token() {
    let server = MockServer::start().await;
    let app = app(salesforce_config(&server, &[]));
    let cookie = log_in(&app, &server).await;

    Mock::given(method("POST"))
        .and(path(format!("{DATA_PATH}/sobjects/Decision_Insight__c/")))
        .and(header("Authorization", format!("Bearer {ACCESS_TOKEN}").as_str()))
        .and(body_is(insight_body()))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": INSIGHT_ID,
            "success": true,
            "errors": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = send(
        &app,
        Method::POST,
        "/api/salesforce/insights/create",
        Some(&cookie),
        Some(insight_body()),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["id"], INSIGHT_ID);
}

#[tokio::test]
async fn create_insight_rejects_missing_fields() {
    let server = MockServer::start().await;
    let app = app(salesforce_config(&server, &[]));
    let cookie = log_in(&app, &server).await;

    let response = send(
        &app,
        Method::POST,
        "/api/salesforce/insights/create",
        Some(&cookie),
        Some(json!({ "Title__c": "", "Impact__c": 3, "Risk__c": 2, "Confidence__c": 50 })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({ "error": "Missing required fields" })
    );
}

#[tokio::test]
async fn unknown_object_gets_deployment_hint() {
    let server = MockServer::start().await;
    let app = app(salesforce_config(&server, &[]));
    let cookie = log_in(&app, &server).await;

    Mock::given(method("POST"))
        .and(path(format!("{DATA_PATH}/sobjects/Decision_Insight__c/")))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!([{
            "errorCode": "INVALID_TYPE",
            "message": "sObject type 'Decision_Insight__c' is not supported."
        }])))
        .mount(&server)
        .await;

    let response = send(
        &app,
        Method::POST,
        "/api/salesforce/insights/create",
        Some(&cookie),
        Some(insight_body()),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(
        body["error"],
        "INVALID_TYPE: Object not found: Decision_Insight__c"
    );
    assert!(body["hint"].as_str().unwrap().contains("Object Manager"));
    assert_eq!(body["details"][0]["errorCode"], "INVALID_TYPE");
}

#[tokio::test]
async fn upstream_errors_pass_status_through() {
    let server = MockServer::start().await;
    let app = app(salesforce_config(&server, &[]));
    let cookie = log_in(&app, &server).await;

    Mock::given(method("POST"))
        .and(path(format!("{DATA_PATH}/sobjects/Decision_Insight__c/")))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!([{
            "errorCode": "REQUIRED_FIELD_MISSING",
            "message": "Required fields are missing: [Owner__c]"
        }])))
        .mount(&server)
        .await;

    let response = send(
        &app,
        Method::POST,
        "/api/salesforce/insights/create",
        Some(&cookie),
        Some(insight_body()),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["details"][0]["errorCode"], "REQUIRED_FIELD_MISSING");
}

#[tokio::test]
async fn list_returns_query_records() {
    let server = MockServer::start().await;
    let app = app(salesforce_config(&server, &[]));
    let cookie = log_in(&app, &server).await;

    Mock::given(method("GET"))
        .and(path(format!("{DATA_PATH}/query")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalSize": 2,
            "done": true,
            "records": [
                { "Id": "a015g00000XyZaBAAV", "Title__c": "Renew vendor contract", "View_Count__c": 3.0 },
                { "Id": "a015g00000XyZaCAAV", "Title__c": "Pick a CRM", "View_Count__c": null }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = send(
        &app,
        Method::GET,
        "/api/salesforce/insights/list",
        Some(&cookie),
        None,
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let records = body_json(response).await;
    assert_eq!(records.as_array().unwrap().len(), 2);
    assert_eq!(records[1]["Title__c"], "Pick a CRM");

    let requests = server.received_requests().await.unwrap();
    let query = requests
        .iter()
        .find(|r| r.url.path().ends_with("/query"))
        .unwrap();
    let soql = query
        .url
        .query_pairs()
        .find(|(k, _)| k == "q")
        .map(|(_, v)| v.into_owned())
        .unwrap();
    assert!(soql.contains("ORDER BY CreatedDate DESC LIMIT 100"), "{soql}");
}

#[tokio::test]
async fn update_view_increments_count() {
    let server = MockServer::start().await;
    let app = app(salesforce_config(&server, &[]));
    let cookie = log_in(&app, &server).await;

    Mock::given(method("GET"))
        .and(path(format!("{DATA_PATH}/query")))
        .and(query_param(
            "q",
            format!("SELECT View_Count__c FROM Decision_Insight__c WHERE Id = '{INSIGHT_ID}'")
                .as_str(),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalSize": 1,
            "done": true,
            "records": [{ "View_Count__c": 4.0 }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path(format!(
            "{DATA_PATH}/sobjects/Decision_Insight__c/{INSIGHT_ID}"
        )))
        .and(body_partial_json(json!({ "View_Count__c": 5 })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let response = send(
        &app,
        Method::PATCH,
        "/api/salesforce/insights/updateView",
        Some(&cookie),
        Some(json!({ "insightId": INSIGHT_ID })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let requests = server.received_requests().await.unwrap();
    let patch = requests
        .iter()
        .find(|r| r.method.as_str() == "PATCH")
        .unwrap();
    let sent: Value = serde_json::from_slice(&patch.body).unwrap();
    let stamped = sent["Last_Viewed_At__c"].as_str().unwrap();
    assert!(OffsetDateTime::parse(stamped, &Rfc3339).is_ok(), "{stamped}");
}

#[tokio::test]
async fn update_view_of_missing_insight_is_404() {
    let server = MockServer::start().await;
    let app = app(salesforce_config(&server, &[]));
    let cookie = log_in(&app, &server).await;

    Mock::given(method("GET"))
        .and(path(format!("{DATA_PATH}/query")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalSize": 0,
            "done": true,
            "records": []
        })))
        .mount(&server)
        .await;

    let response = send(
        &app,
        Method::PATCH,
        "/api/salesforce/insights/updateView",
        Some(&cookie),
        Some(json!({ "insightId": INSIGHT_ID })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_json(response).await["error"],
        "Failed to fetch insight or insight not found"
    );
}

#[tokio::test]
async fn update_view_validates_insight_id() {
    let server = MockServer::start().await;
    let app = app(salesforce_config(&server, &[]));
    let cookie = log_in(&app, &server).await;

    let missing = send(
        &app,
        Method::PATCH,
        "/api/salesforce/insights/updateView",
        Some(&cookie),
        Some(json!({})),
    )
    .await;
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(missing).await, json!({ "error": "Missing insightId" }));

    let injected = send(
        &app,
        Method::PATCH,
        "/api/salesforce/insights/updateView",
        Some(&cookie),
        Some(json!({ "insightId": "x' OR Id != '" })),
    )
    .await;
    assert_eq!(injected.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn view_event_is_stamped_with_view_time() {
    let server = MockServer::start().await;
    let app = app(salesforce_config(&server, &[]));
    let cookie = log_in(&app, &server).await;

    Mock::given(method("POST"))
        .and(path(format!("{DATA_PATH}/sobjects/Decision_View_Event__c/")))
        .and(body_partial_json(json!({
            "Insight__c": INSIGHT_ID,
            "Viewer_Name__c": "Dana Reyes",
            "Source__c": "Tableau"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "a025g00000AbCdEAAV",
            "success": true,
            "errors": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = send(
        &app,
        Method::POST,
        "/api/salesforce/view-events/create",
        Some(&cookie),
        Some(json!({
            "Insight__c": INSIGHT_ID,
            "Viewer_Name__c": "Dana Reyes",
            "Source__c": "Tableau"
        })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);

    let requests = server.received_requests().await.unwrap();
    let create = requests
        .iter()
        .find(|r| r.url.path().ends_with("/Decision_View_Event__c/"))
        .unwrap();
    let sent: Value = serde_json::from_slice(&create.body).unwrap();
    assert!(OffsetDateTime::parse(sent["Viewed_At__c"].as_str().unwrap(), &Rfc3339).is_ok());
}

#[tokio::test]
async fn view_event_rejects_missing_fields() {
    let server = MockServer::start().await;
    let app = app(salesforce_config(&server, &[]));
    let cookie = log_in(&app, &server).await;

    let response = send(
        &app,
        Method::POST,
        "/api/salesforce/view-events/create",
        Some(&cookie),
        Some(json!({ "Insight__c": INSIGHT_ID, "Source__c": "Tableau" })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn frontdoor_uses_session_credentials() {
    let server = MockServer::start().await;
    let app = app(salesforce_config(&server, &[]));
    let cookie = log_in(&app, &server).await;

    Mock::given(method("POST"))
        .and(path("/services/oauth2/singleaccess"))
        .and(header("Authorization", format!("Bearer {ACCESS_TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "frontdoorUrl": "https://acme.my.salesforce.com/secur/frontdoor.jsp?otp=abc"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = send(&app, Method::POST, "/api/tableau/frontdoor", Some(&cookie), None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({
            "frontdoorUrl": "https://acme.my.salesforce.com/secur/frontdoor.jsp?otp=abc",
            "expiresIn": 300
        })
    );
}

#[tokio::test]
async fn frontdoor_falls_back_to_body_credentials() {
    let server = MockServer::start().await;
    let app = app(config(&[]));

    Mock::given(method("POST"))
        .and(path("/services/oauth2/singleaccess"))
        .and(header("Authorization", "Bearer body-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "url": "https://acme.my.salesforce.com/secur/frontdoor.jsp?otp=xyz",
            "expiresIn": 120
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = send(
        &app,
        Method::POST,
        "/api/tableau/frontdoor",
        None,
        Some(json!({ "accessToken": "body-token", "instanceUrl": server.uri() })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["expiresIn"], 120);
}

#[tokio::test]
async fn frontdoor_without_credentials_is_401() {
    let app = app(config(&[]));

    let response = send(&app, Method::POST, "/api/tableau/frontdoor", None, None).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "Not authenticated");
}

#[tokio::test]
async fn frontdoor_scope_failure_explains_fix() {
    let server = MockServer::start().await;
    let app = app(salesforce_config(&server, &[]));
    let cookie = log_in(&app, &server).await;

    Mock::given(method("POST"))
        .and(path("/services/oauth2/singleaccess"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "insufficient_scope",
            "error_description": "missing wave_api scope"
        })))
        .mount(&server)
        .await;

    let response = send(&app, Method::POST, "/api/tableau/frontdoor", Some(&cookie), None).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "❌ Missing Wave API Scope");
    assert_eq!(body["details"], "missing wave_api scope");
    assert_eq!(body["status"], 400);
}

#[tokio::test]
async fn frontdoor_expired_token_is_401() {
    let server = MockServer::start().await;
    let app = app(salesforce_config(&server, &[]));
    let cookie = log_in(&app, &server).await;

    Mock::given(method("POST"))
        .and(path("/services/oauth2/singleaccess"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!([{
            "errorCode": "INVALID_SESSION_ID",
            "message": "Session expired or invalid"
        }])))
        .mount(&server)
        .await;

    let response = send(&app, Method::POST, "/api/tableau/frontdoor", Some(&cookie), None).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "❌ Authentication Failed");
}

#[tokio::test]
async fn update_view_patch_failure_keeps_upstream_status() {
    let server = MockServer::start().await;
    let app = app(salesforce_config(&server, &[]));
    let cookie = log_in(&app, &server).await;

    Mock::given(method("GET"))
        .and(path(format!("{DATA_PATH}/query")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalSize": 1,
            "done": true,
            "records": [{ "View_Count__c": 2.0 }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path(format!(
            "{DATA_PATH}/sobjects/Decision_Insight__c/{INSIGHT_ID}"
        )))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!([{
            "errorCode": "INVALID_FIELD_FOR_INSERT_UPDATE",
            "message": "Unable to create/update fields: View_Count__c."
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let response = send(
        &app,
        Method::PATCH,
        "/api/salesforce/insights/updateView",
        Some(&cookie),
        Some(json!({ "insightId": INSIGHT_ID })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Salesforce API error on update");
    assert_eq!(
        body["details"][0]["errorCode"],
        "INVALID_FIELD_FOR_INSERT_UPDATE"
    );
}

#[tokio::test]
async fn list_of_undeployed_object_gets_deployment_hint() {
    let server = MockServer::start().await;
    let app = app(salesforce_config(&server, &[]));
    let cookie = log_in(&app, &server).await;

    Mock::given(method("GET"))
        .and(path(format!("{DATA_PATH}/query")))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!([{
            "errorCode": "INVALID_TYPE",
            "message": "sObject type 'Decision_Insight__c' is not supported."
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let response = send(
        &app,
        Method::GET,
        "/api/salesforce/insights/list",
        Some(&cookie),
        None,
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(
        body["error"],
        "INVALID_TYPE: Object not found: Decision_Insight__c"
    );
    assert!(body["hint"].as_str().unwrap().contains("Object Manager"));
    assert_eq!(body["details"][0]["errorCode"], "INVALID_TYPE");
}

#[tokio::test]
async fn frontdoor_zero_lifetime_uses_default() {
    let server = MockServer::start().await;
    let app = app(config(&[]));

    Mock::given(method("POST"))
        .and(path("/services/oauth2/singleaccess"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "frontdoorUrl": "https://acme.my.salesforce.com/secur/frontdoor.jsp?otp=zero",
            "expiresIn": 0
        })))
        .mount(&server)
        .await;

    let response = send(
        &app,
        Method::POST,
        "/api/tableau/frontdoor",
        None,
        Some(json!({ "accessToken": "body-token", "instanceUrl": server.uri() })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["expiresIn"], 300);
}
