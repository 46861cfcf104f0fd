use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tower::ServiceExt;

use transfer_dispatch::api::rest::router;
use transfer_dispatch::models::notification::OutboundMessage;
use transfer_dispatch::state::AppState;

fn setup() -> (axum::Router, Arc<AppState>, mpsc::Receiver<OutboundMessage>) {
    setup_with_mailboxes(Vec::new())
}

fn setup_with_mailboxes(
    mailboxes: Vec<String>,
) -> (axum::Router, Arc<AppState>, mpsc::Receiver<OutboundMessage>) {
    let (state, rx) = AppState::new(48, mailboxes, 1024, 1024);
    let shared = Arc::new(state);
    (router(shared.clone()), shared, rx)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn delete_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn drain_messages(rx: &mut mpsc::Receiver<OutboundMessage>) -> Vec<OutboundMessage> {
    let mut messages = Vec::new();
    while let Ok(message) = rx.try_recv() {
        messages.push(message);
    }
    messages
}

struct Fixture {
    job_id: String,
    dispatcher_user: String,
    driver_user: String,
    rep_user: String,
    supplier_user: String,
}

async fn post_json(app: &axum::Router, uri: &str, body: Value) -> Value {
    let response = app
        .clone()
        .oneshot(json_request("POST", uri, body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK, "POST {uri} failed");
    body_json(response).await
}

fn id_of(value: &Value) -> String {
    value["id"].as_str().unwrap().to_string()
}

/// Seeds a supplier/vehicle/driver/rep, one portal user per role plus a
/// dispatcher account, a job with the given shape, and the assignment.
async fn seed(
    app: &axum::Router,
    service_date: DateTime<Utc>,
    service_type: &str,
    collection_required: bool,
    driver_flat_fee: Option<f64>,
) -> Fixture {
    let supplier = post_json(app, "/suppliers", json!({ "name": "Desert Fleet" })).await;
    let supplier_id = id_of(&supplier);

    let vehicle = post_json(
        app,
        "/vehicles",
        json!({ "name": "Bus 12", "supplier_id": supplier_id }),
    )
    .await;
    let vehicle_id = id_of(&vehicle);

    let driver = post_json(
        app,
        "/drivers",
        json!({ "name": "Karim", "flat_fee": driver_flat_fee }),
    )
    .await;
    let driver_id = id_of(&driver);

    let rep = post_json(app, "/reps", json!({ "name": "Mona", "flat_fee": 25.0 })).await;
    let rep_id = id_of(&rep);

    let dispatcher_user = id_of(
        &post_json(
            app,
            "/users",
            json!({ "name": "Dispatcher", "email": "dispatch@example.com", "is_admin": true }),
        )
        .await,
    );
    let driver_user = id_of(
        &post_json(
            app,
            "/users",
            json!({ "name": "Karim", "email": "karim@example.com", "driver_id": driver_id }),
        )
        .await,
    );
    let rep_user = id_of(
        &post_json(
            app,
            "/users",
            json!({ "name": "Mona", "email": "mona@example.com", "rep_id": rep_id }),
        )
        .await,
    );
    let supplier_user = id_of(
        &post_json(
            app,
            "/users",
            json!({ "name": "Fleet Desk", "email": "fleet@example.com", "supplier_id": supplier_id }),
        )
        .await,
    );

    let job = post_json(
        app,
        "/jobs",
        json!({
            "reference": "TRF-1001",
            "service_date": service_date.to_rfc3339(),
            "service_type": service_type,
            "pax_adults": 2,
            "pax_children": 1,
            "origin": "Hurghada Airport",
            "destination": "Hotel Oasis",
            "flight_number": "MS775",
            "collection_required": collection_required
        }),
    )
    .await;
    let job_id = id_of(&job);

    post_json(
        app,
        &format!("/jobs/{job_id}/assignment"),
        json!({
            "actor_user_id": dispatcher_user,
            "vehicle_id": vehicle_id,
            "driver_id": driver_id,
            "rep_id": rep_id
        }),
    )
    .await;

    Fixture {
        job_id,
        dispatcher_user,
        driver_user,
        rep_user,
        supplier_user,
    }
}

#[tokio::test]
async fn health_returns_ok() {
    let (app, _state, _rx) = setup();
    let response = app.oneshot(get_request("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["jobs"], 0);
    assert_eq!(body["assignments"], 0);
}

#[tokio::test]
async fn metrics_returns_prometheus_format() {
    let (app, _state, _rx) = setup();
    let response = app.oneshot(get_request("/metrics")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_string(response).await;
    assert!(body.contains("messages_in_queue"));
}

#[tokio::test]
async fn create_job_starts_pending() {
    let (app, _state, _rx) = setup();
    let job = post_json(
        &app,
        "/jobs",
        json!({
            "reference": "TRF-7",
            "service_date": Utc::now().to_rfc3339(),
            "service_type": "Departure",
            "pax_adults": 1,
            "origin": "Hotel",
            "destination": "Airport"
        }),
    )
    .await;

    assert_eq!(job["status"], "Pending");
    assert!(job["assignment_id"].is_null());
    assert_eq!(job["collection_required"], false);
}

#[tokio::test]
async fn duplicate_reference_is_rejected() {
    let (app, _state, _rx) = setup();
    let body = json!({
        "reference": "TRF-9",
        "service_date": Utc::now().to_rfc3339(),
        "service_type": "Other",
        "pax_adults": 1,
        "origin": "A",
        "destination": "B"
    });

    post_json(&app, "/jobs", body.clone()).await;
    let response = app
        .oneshot(json_request("POST", "/jobs", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn get_nonexistent_job_returns_404() {
    let (app, _state, _rx) = setup();
    let response = app
        .oneshot(get_request("/jobs/00000000-0000-0000-0000-000000000000"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn dispatcher_invalid_transition_names_allowed_set() {
    let (app, _state, _rx) = setup();
    let job = post_json(
        &app,
        "/jobs",
        json!({
            "reference": "TRF-20",
            "service_date": Utc::now().to_rfc3339(),
            "service_type": "Arrival",
            "pax_adults": 2,
            "origin": "Airport",
            "destination": "Hotel"
        }),
    )
    .await;
    let job_id = id_of(&job);
    let actor = uuid::Uuid::new_v4();

    let response = app
        .oneshot(json_request(
            "PATCH",
            &format!("/jobs/{job_id}/status"),
            json!({ "actor_user_id": actor, "status": "Completed" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("Pending"));
    assert!(message.contains("Completed"));
    assert!(message.contains("allowed: Assigned, Cancelled"));
}

#[tokio::test]
async fn dispatcher_terminal_status_reports_none_allowed() {
    let (app, _state, _rx) = setup();
    let fixture = seed(&app, Utc::now(), "Departure", false, None).await;
    let job_id = &fixture.job_id;
    let actor = &fixture.dispatcher_user;

    for status in ["InProgress", "Cancelled"] {
        let response = app
            .clone()
            .oneshot(json_request(
                "PATCH",
                &format!("/jobs/{job_id}/status"),
                json!({ "actor_user_id": actor, "status": status }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .oneshot(json_request(
            "PATCH",
            &format!("/jobs/{job_id}/status"),
            json!({ "actor_user_id": actor, "status": "Completed" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("allowed: none"));
}

#[tokio::test]
async fn driver_updates_status_and_log_records_the_move() {
    let (app, _state, _rx) = setup();
    let fixture = seed(&app, Utc::now(), "Arrival", false, None).await;
    let job_id = &fixture.job_id;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/portal/driver/jobs/{job_id}/status"),
            json!({
                "actor_user_id": fixture.driver_user,
                "status": "InProgress",
                "lat": 30.0,
                "lng": 31.2
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["assignment"]["driver_status"], "InProgress");

    let response = app
        .clone()
        .oneshot(get_request(&format!("/jobs/{job_id}/log")))
        .await
        .unwrap();
    let log = body_json(response).await;
    let entries = log.as_array().unwrap();

    let driver_entries: Vec<&Value> = entries
        .iter()
        .filter(|entry| entry["role"] == "driver")
        .collect();
    assert_eq!(driver_entries.len(), 1);
    assert_eq!(driver_entries[0]["previous"], "Pending");
    assert_eq!(driver_entries[0]["new"], "InProgress");
    assert_eq!(driver_entries[0]["position"]["lat"], 30.0);
    assert_eq!(
        driver_entries[0]["map_link"],
        "https://maps.google.com/?q=30,31.2"
    );

    // reversing into Pending is rejected and names what would be allowed
    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/portal/driver/jobs/{job_id}/status"),
            json!({
                "actor_user_id": fixture.driver_user,
                "status": "Pending",
                "lat": 30.0,
                "lng": 31.2
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("allowed: Completed, Cancelled"));
}

#[tokio::test]
async fn rejected_transition_leaves_status_unchanged() {
    let (app, state, _rx) = setup();
    let fixture = seed(&app, Utc::now(), "Arrival", false, None).await;
    let job_id = &fixture.job_id;

    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/portal/rep/jobs/{job_id}/status"),
            json!({
                "actor_user_id": fixture.rep_user,
                "status": "NoShow",
                "lat": 30.0,
                "lng": 31.2
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);

    let job = state
        .jobs
        .get(&fixture.job_id.parse().unwrap())
        .unwrap()
        .clone();
    let assignment = state.active_assignment(&job).unwrap();
    assert_eq!(
        assignment.rep_status,
        transfer_dispatch::models::assignment::RepStatus::Pending
    );
    assert!(state.job_log(job.id).iter().all(|entry| entry.role
        != transfer_dispatch::models::audit::ActorRole::Rep));
}

#[tokio::test]
async fn closed_edit_window_is_forbidden_until_unlocked() {
    let (app, _state, _rx) = setup();
    let stale_date = Utc::now() - Duration::days(3);
    let fixture = seed(&app, stale_date, "Arrival", false, None).await;
    let job_id = &fixture.job_id;

    let attempt = json!({
        "actor_user_id": fixture.driver_user,
        "status": "InProgress",
        "lat": 30.0,
        "lng": 31.2
    });

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/portal/driver/jobs/{job_id}/status"),
            attempt.clone(),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("edit window closed"));

    // admin unlock bypasses the window for that role only
    post_json(
        &app,
        &format!("/jobs/{job_id}/unlock"),
        json!({ "role": "driver", "admin_user_id": fixture.dispatcher_user }),
    )
    .await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/portal/driver/jobs/{job_id}/status"),
            attempt.clone(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // rep is still locked
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/portal/rep/jobs/{job_id}/status"),
            json!({
                "actor_user_id": fixture.rep_user,
                "status": "Completed",
                "lat": 30.0,
                "lng": 31.2
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // locking again closes the window for the driver
    post_json(
        &app,
        &format!("/jobs/{job_id}/lock"),
        json!({ "role": "driver" }),
    )
    .await;

    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/portal/driver/jobs/{job_id}/status"),
            json!({
                "actor_user_id": fixture.driver_user,
                "status": "Completed",
                "lat": 30.0,
                "lng": 31.2
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn collection_guard_blocks_driver_completion() {
    let (app, _state, _rx) = setup();
    let fixture = seed(&app, Utc::now(), "Arrival", true, None).await;
    let job_id = &fixture.job_id;

    let attempt = json!({
        "actor_user_id": fixture.driver_user,
        "status": "Completed",
        "lat": 30.0,
        "lng": 31.2
    });

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/portal/driver/jobs/{job_id}/status"),
            attempt.clone(),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("uncollected collection"));

    // dispatcher marks the collection collected; the same transition now works
    post_json(
        &app,
        &format!("/jobs/{job_id}"),
        json!({
            "actor_user_id": fixture.dispatcher_user,
            "collection_collected": true
        }),
    )
    .await;

    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/portal/driver/jobs/{job_id}/status"),
            attempt,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn no_show_requires_two_photos_and_valid_gps() {
    let (app, state, _rx) = setup();
    let fixture = seed(&app, Utc::now(), "Arrival", false, None).await;
    let job_id = &fixture.job_id;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/portal/driver/jobs/{job_id}/no-show"),
            json!({
                "actor_user_id": fixture.driver_user,
                "photo1": "s3://evidence/1.jpg",
                "lat": 30.0,
                "lng": 31.2
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(state.no_show_evidence.len(), 0);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/portal/driver/jobs/{job_id}/no-show"),
            json!({
                "actor_user_id": fixture.driver_user,
                "photo1": "s3://evidence/1.jpg",
                "photo2": "s3://evidence/2.jpg",
                "lat": 999.0,
                "lng": 31.2
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/portal/driver/jobs/{job_id}/no-show"),
            json!({
                "actor_user_id": fixture.driver_user,
                "photo1": "s3://evidence/1.jpg",
                "photo2": "s3://evidence/2.jpg",
                "lat": 30.0,
                "lng": 31.2
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["assignment"]["driver_status"], "NoShow");
    assert_eq!(state.no_show_evidence.len(), 1);

    // terminal now: a second no-show is rejected and leaves one record
    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/portal/driver/jobs/{job_id}/no-show"),
            json!({
                "actor_user_id": fixture.driver_user,
                "photo1": "s3://evidence/3.jpg",
                "photo2": "s3://evidence/4.jpg",
                "lat": 30.0,
                "lng": 31.2
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(state.no_show_evidence.len(), 1);
}

#[tokio::test]
async fn rep_fee_posted_once_for_arrival_completion() {
    let (app, _state, _rx) = setup();
    let fixture = seed(&app, Utc::now(), "Arrival", false, None).await;
    let job_id = &fixture.job_id;
    let actor = &fixture.dispatcher_user;

    post_json(
        &app,
        &format!("/jobs/{job_id}/status"),
        json!({ "actor_user_id": actor, "status": "InProgress" }),
    )
    .await;
    post_json(
        &app,
        &format!("/jobs/{job_id}/status"),
        json!({ "actor_user_id": actor, "status": "Completed" }),
    )
    .await;

    // a retried completion is rejected by the table and must not double-post
    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/jobs/{job_id}/status"),
            json!({ "actor_user_id": actor, "status": "Completed" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .oneshot(get_request(&format!("/jobs/{job_id}/fees")))
        .await
        .unwrap();
    let fees = body_json(response).await;
    let rep_fees: Vec<&Value> = fees
        .as_array()
        .unwrap()
        .iter()
        .filter(|fee| fee["role"] == "rep")
        .collect();
    assert_eq!(rep_fees.len(), 1);
    assert_eq!(rep_fees[0]["amount"], 25.0);
}

#[tokio::test]
async fn no_rep_fee_for_departure_completion() {
    let (app, _state, _rx) = setup();
    let fixture = seed(&app, Utc::now(), "Departure", false, None).await;
    let job_id = &fixture.job_id;
    let actor = &fixture.dispatcher_user;

    post_json(
        &app,
        &format!("/jobs/{job_id}/status"),
        json!({ "actor_user_id": actor, "status": "InProgress" }),
    )
    .await;
    post_json(
        &app,
        &format!("/jobs/{job_id}/status"),
        json!({ "actor_user_id": actor, "status": "Completed" }),
    )
    .await;

    let response = app
        .oneshot(get_request(&format!("/jobs/{job_id}/fees")))
        .await
        .unwrap();
    let fees = body_json(response).await;
    assert_eq!(fees.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn driver_flat_fee_posted_on_driver_completion() {
    let (app, _state, _rx) = setup();
    let fixture = seed(&app, Utc::now(), "Arrival", false, Some(12.5)).await;
    let job_id = &fixture.job_id;

    post_json(
        &app,
        &format!("/portal/driver/jobs/{job_id}/status"),
        json!({
            "actor_user_id": fixture.driver_user,
            "status": "Completed",
            "lat": 30.0,
            "lng": 31.2
        }),
    )
    .await;

    let response = app
        .oneshot(get_request(&format!("/jobs/{job_id}/fees")))
        .await
        .unwrap();
    let fees = body_json(response).await;
    let driver_fees: Vec<&Value> = fees
        .as_array()
        .unwrap()
        .iter()
        .filter(|fee| fee["role"] == "driver")
        .collect();
    assert_eq!(driver_fees.len(), 1);
    assert_eq!(driver_fees[0]["amount"], 12.5);
}

#[tokio::test]
async fn unlinked_user_is_forbidden() {
    let (app, _state, _rx) = setup();
    let fixture = seed(&app, Utc::now(), "Arrival", false, None).await;
    let job_id = &fixture.job_id;

    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/portal/driver/jobs/{job_id}/status"),
            json!({
                "actor_user_id": fixture.dispatcher_user,
                "status": "InProgress",
                "lat": 30.0,
                "lng": 31.2
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn driver_of_another_job_gets_not_found() {
    let (app, _state, _rx) = setup();
    let fixture = seed(&app, Utc::now(), "Arrival", false, None).await;

    let other_driver = post_json(&app, "/drivers", json!({ "name": "Samir" })).await;
    let other_user = id_of(
        &post_json(
            &app,
            "/users",
            json!({
                "name": "Samir",
                "email": "samir@example.com",
                "driver_id": id_of(&other_driver)
            }),
        )
        .await,
    );

    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/portal/driver/jobs/{}/status", fixture.job_id),
            json!({
                "actor_user_id": other_user,
                "status": "InProgress",
                "lat": 30.0,
                "lng": 31.2
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn supplier_completes_with_notes() {
    let (app, state, _rx) = setup();
    let fixture = seed(&app, Utc::now(), "Arrival", false, None).await;
    let job_id = &fixture.job_id;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/portal/supplier/jobs/{job_id}/status"),
            json!({
                "actor_user_id": fixture.supplier_user,
                "status": "Completed",
                "notes": "Vehicle swapped at depot, no delay"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["assignment"]["supplier_status"], "Completed");
    assert_eq!(
        body["assignment"]["supplier_notes"],
        "Vehicle swapped at depot, no delay"
    );

    // audit entry carries no GPS for suppliers
    let job_uuid: uuid::Uuid = job_id.parse().unwrap();
    let supplier_entries: Vec<_> = state
        .job_log(job_uuid)
        .into_iter()
        .filter(|entry| entry.role == transfer_dispatch::models::audit::ActorRole::Supplier)
        .collect();
    assert_eq!(supplier_entries.len(), 1);
    assert!(supplier_entries[0].position.is_none());
    assert!(supplier_entries[0].map_link.is_none());

    // terminal
    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/portal/supplier/jobs/{job_id}/status"),
            json!({
                "actor_user_id": fixture.supplier_user,
                "status": "InProgress"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn job_update_fans_out_to_eligible_users_only() {
    let (app, state, mut rx) = setup();
    let fixture = seed(&app, Utc::now(), "Arrival", false, None).await;
    let job_id = &fixture.job_id;

    // grant-holder, admin without the granular grant, and a bystander
    let subscriber = id_of(
        &post_json(
            &app,
            "/users",
            json!({
                "name": "Ops",
                "email": "ops@example.com",
                "notify_on_job_updates": true
            }),
        )
        .await,
    );
    let admin = id_of(
        &post_json(
            &app,
            "/users",
            json!({ "name": "Boss", "email": "boss@example.com", "is_admin": true }),
        )
        .await,
    );
    post_json(
        &app,
        "/users",
        json!({ "name": "Quiet", "email": "quiet@example.com" }),
    )
    .await;

    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/jobs/{job_id}"),
            json!({
                "actor_user_id": fixture.dispatcher_user,
                "origin": "Terminal 2"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let recipients: Vec<String> = state
        .notifications
        .iter()
        .map(|entry| entry.value().user_id.to_string())
        .collect();
    assert_eq!(recipients.len(), 2);
    assert!(recipients.contains(&subscriber));
    assert!(recipients.contains(&admin));

    for entry in state.notifications.iter() {
        assert_eq!(entry.value().changed_fields, vec!["origin".to_string()]);
    }

    let messages = drain_messages(&mut rx);
    let mut addresses: Vec<String> = messages.iter().map(|m| m.to.clone()).collect();
    addresses.sort();
    assert_eq!(addresses, vec!["boss@example.com", "ops@example.com"]);
    assert!(messages[0].body.contains("** From: Terminal 2 **"));
    assert!(messages[0].body.contains("To: Hotel Oasis"));
}

#[tokio::test]
async fn fan_out_dedupes_addresses_against_department_mailboxes() {
    let (app, _state, mut rx) =
        setup_with_mailboxes(vec!["OPS@example.com".to_string(), "fleet@dept.example".to_string()]);
    let fixture = seed(&app, Utc::now(), "Arrival", false, None).await;
    let job_id = &fixture.job_id;

    post_json(
        &app,
        "/users",
        json!({
            "name": "Ops",
            "email": "ops@example.com",
            "notify_on_job_updates": true
        }),
    )
    .await;

    let response = app
        .oneshot(json_request(
            "PATCH",
            &format!("/jobs/{job_id}"),
            json!({
                "actor_user_id": fixture.dispatcher_user,
                "destination": "Hotel Lagoon"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let messages = drain_messages(&mut rx);
    let mut addresses: Vec<String> = messages.iter().map(|m| m.to.clone()).collect();
    addresses.sort();
    assert_eq!(addresses, vec!["fleet@dept.example", "ops@example.com"]);
}

#[tokio::test]
async fn fan_out_with_no_recipients_is_a_silent_noop() {
    let (app, state, mut rx) = setup();
    let fixture = seed(&app, Utc::now(), "Arrival", false, None).await;
    let job_id = &fixture.job_id;

    // the only eligible account is the author, who is excluded
    let response = app
        .oneshot(json_request(
            "PATCH",
            &format!("/jobs/{job_id}"),
            json!({
                "actor_user_id": fixture.dispatcher_user,
                "origin": "Terminal 1"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(state.notifications.len(), 0);
    assert!(drain_messages(&mut rx).is_empty());
}

#[tokio::test]
async fn status_change_fans_out_too() {
    let (app, state, mut rx) = setup();
    let fixture = seed(&app, Utc::now(), "Arrival", false, None).await;
    let job_id = &fixture.job_id;

    post_json(
        &app,
        "/users",
        json!({
            "name": "Ops",
            "email": "ops@example.com",
            "notify_on_job_updates": true
        }),
    )
    .await;

    post_json(
        &app,
        &format!("/jobs/{job_id}/status"),
        json!({ "actor_user_id": fixture.dispatcher_user, "status": "InProgress" }),
    )
    .await;

    assert_eq!(state.notifications.len(), 1);
    let messages = drain_messages(&mut rx);
    assert_eq!(messages.len(), 1);
    assert!(messages[0].body.contains("** Status: InProgress **"));
}

#[tokio::test]
async fn reassignment_retires_the_previous_binding() {
    let (app, state, _rx) = setup();
    let fixture = seed(&app, Utc::now(), "Arrival", false, None).await;
    let job_id = &fixture.job_id;

    let supplier = post_json(&app, "/suppliers", json!({ "name": "City Fleet" })).await;
    let vehicle = post_json(
        &app,
        "/vehicles",
        json!({ "name": "Van 3", "supplier_id": id_of(&supplier) }),
    )
    .await;

    let second = post_json(
        &app,
        &format!("/jobs/{job_id}/assignment"),
        json!({
            "actor_user_id": fixture.dispatcher_user,
            "vehicle_id": id_of(&vehicle)
        }),
    )
    .await;

    let job_uuid: uuid::Uuid = job_id.parse().unwrap();
    let job = state.jobs.get(&job_uuid).unwrap().clone();
    assert_eq!(job.assignment_id.unwrap().to_string(), id_of(&second));

    let active: Vec<_> = state
        .assignments
        .iter()
        .filter(|entry| entry.value().job_id == job_uuid && entry.value().is_active())
        .collect();
    assert_eq!(active.len(), 1);
    assert_eq!(state.assignments.len(), 2);
}

#[tokio::test]
async fn cancellation_retires_the_assignment() {
    let (app, state, _rx) = setup();
    let fixture = seed(&app, Utc::now(), "Arrival", false, None).await;
    let job_id = &fixture.job_id;
    let actor = &fixture.dispatcher_user;

    post_json(
        &app,
        &format!("/jobs/{job_id}/status"),
        json!({ "actor_user_id": actor, "status": "InProgress" }),
    )
    .await;
    post_json(
        &app,
        &format!("/jobs/{job_id}/status"),
        json!({ "actor_user_id": actor, "status": "Cancelled" }),
    )
    .await;

    let job_uuid: uuid::Uuid = job_id.parse().unwrap();
    let job = state.jobs.get(&job_uuid).unwrap().clone();
    assert!(job.assignment_id.is_none());
    assert!(state
        .assignments
        .iter()
        .all(|entry| entry.value().job_id != job_uuid || !entry.value().is_active()));
}

#[tokio::test]
async fn soft_deleted_job_is_gone_from_the_api() {
    let (app, _state, _rx) = setup();
    let fixture = seed(&app, Utc::now(), "Arrival", false, None).await;
    let job_id = &fixture.job_id;

    let response = app
        .clone()
        .oneshot(delete_request(&format!("/jobs/{job_id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(get_request(&format!("/jobs/{job_id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(json_request(
            "PATCH",
            &format!("/jobs/{job_id}/status"),
            json!({ "actor_user_id": fixture.dispatcher_user, "status": "InProgress" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
