mod support;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use intercom_directory::api::router;
use intercom_directory::report::REPORT_CONTENT_TYPE;
use serde_json::{Value, json};
use support::{Fixture, RecordingTransport};
use tower::ServiceExt;

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .expect("request");

    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes()
        .to_vec();
    (status, bytes)
}

fn json_body(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).expect("json body")
}

#[tokio::test(flavor = "current_thread")]
async fn create_employee_and_extension_sends_mail() {
    let fixture = Fixture::new();
    let app = router(fixture.app_state());

    let (status, body) = call(
        &app,
        "POST",
        "/employees",
        Some(json!({"name": "Asha Verma", "email": "asha@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let employee_id = json_body(&body)["id"].as_u64().expect("id");

    let (status, body) = call(
        &app,
        "POST",
        "/extensions",
        Some(json!({"employee_id": employee_id, "code": "204"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let extension_id = json_body(&body)["id"].as_u64().expect("id");
    assert_eq!(fixture.transport.sent().len(), 1);

    let (status, body) = call(
        &app,
        "PUT",
        &format!("/extensions/{extension_id}"),
        Some(json!({"employee_id": employee_id, "code": "205", "status": true})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body)["code"], "205");
    assert_eq!(fixture.transport.sent()[1].subject, "Intercom Details Updated");

    let (status, body) = call(&app, "GET", "/extensions", None).await;
    assert_eq!(status, StatusCode::OK);
    let listing = json_body(&body);
    assert_eq!(listing[0]["employee"], "Asha Verma");
    assert_eq!(listing[0]["extension"], "205");
}

#[tokio::test(flavor = "current_thread")]
async fn validation_errors_map_to_bad_request() {
    let fixture = Fixture::new();
    let app = router(fixture.app_state());
    let employee_id = fixture.employee("Asha Verma", "");

    let (status, body) = call(
        &app,
        "POST",
        "/extensions",
        Some(json!({"employee_id": employee_id, "code": "123456"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error = &json_body(&body)["error"];
    assert_eq!(error["code"], "validation_failed");
    assert_eq!(error["category"], "validation_error");
    assert_eq!(fixture.transport.attempts(), 0);

    let (status, _) = call(&app, "POST", "/employees", Some(json!({"name": ""}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test(flavor = "current_thread")]
async fn unknown_records_are_not_found() {
    let fixture = Fixture::new();
    let app = router(fixture.app_state());

    let (status, _) = call(&app, "GET", "/employees/42", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = call(&app, "DELETE", "/extensions/7", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test(flavor = "current_thread")]
async fn second_extension_for_an_employee_conflicts() {
    let fixture = Fixture::new();
    let app = router(fixture.app_state());
    let employee_id = fixture.listed("Front Desk", "100");

    let (status, _) = call(
        &app,
        "POST",
        "/extensions",
        Some(json!({"employee_id": employee_id, "code": "101"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test(flavor = "current_thread")]
async fn notification_failure_is_a_bad_gateway_but_persists() {
    let fixture = Fixture::with_transport(RecordingTransport::failing_on(1));
    let app = router(fixture.app_state());
    let employee_id = fixture.employee("Asha Verma", "asha@example.com");

    let (status, body) = call(
        &app,
        "POST",
        "/extensions",
        Some(json!({"employee_id": employee_id, "code": "204"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json_body(&body)["error"]["code"], "notification_failed");

    let (status, body) = call(&app, "GET", "/extensions", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body).as_array().map(Vec::len), Some(1));
}

#[tokio::test(flavor = "current_thread")]
async fn report_downloads_as_xlsx() {
    let fixture = Fixture::new();
    fixture.listed("Front Desk", "100");
    let app = router(fixture.app_state());

    let request = Request::builder()
        .uri("/report")
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        REPORT_CONTENT_TYPE
    );
    let disposition = response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .expect("ascii header")
        .to_string();
    assert!(disposition.starts_with("attachment; filename=\"Telecom_Report_"));

    let bytes = response.into_body().collect().await.expect("body").to_bytes();
    let book = support::read_workbook(&bytes);
    assert!(book.get_sheet_by_name("Intercom List").is_some());
    assert_eq!(fixture.transport.attempts(), 0);
}

#[tokio::test(flavor = "current_thread")]
async fn deleting_an_employee_removes_its_extension() {
    let fixture = Fixture::new();
    let app = router(fixture.app_state());
    let employee_id = fixture.listed("Front Desk", "100");

    let (status, _) = call(&app, "DELETE", &format!("/employees/{employee_id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(fixture.store.extension_count(), 0);
    assert_eq!(fixture.transport.attempts(), 0);
}

#[tokio::test(flavor = "current_thread")]
async fn readiness_reports_components() {
    let fixture = Fixture::new();
    let app = router(fixture.app_state());

    let (status, body) = call(&app, "GET", "/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    let health = json_body(&body);
    assert_eq!(health["status"], "degraded");
    assert_eq!(health["components"][0]["details"]["employees"], 0);

    let (status, body) = call(&app, "GET", "/metrics", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8_lossy(&body).contains("intercom_directory_extensions"));
}
