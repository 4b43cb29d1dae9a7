//! End-to-end tests against a fake upstream REST API on an ephemeral port

use axum::{
    Json, Router,
    body::{Body, to_bytes},
    extract::{Path, State},
    http::{HeaderMap, Request, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use common::{AuthSession, InMemorySessionStore, SessionStore};
use dashboard::{AppState, BackendClient, create_router};
use serde_json::{Value, json};
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};
use tower::ServiceExt;

const GOOD: &str = "good-token";
const EXPIRED: &str = "expired-token";
const NEWCOMER: &str = "newcomer-token";
/// Saves succeed but every profile read fails
const FLAKY: &str = "flaky-token";
/// Profile reads carry both key spellings and odd types
const MIXED: &str = "mixed-token";

/// Requests the fake upstream received, by endpoint
#[derive(Clone, Default)]
struct Upstream {
    timeslots: Arc<Mutex<Vec<Value>>>,
    passwords: Arc<Mutex<Vec<Value>>>,
    profiles: Arc<Mutex<Vec<Value>>>,
}

fn bearer(headers: &HeaderMap) -> &str {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .unwrap_or_default()
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"message": "Token expired"})),
    )
        .into_response()
}

async fn auth_me(headers: HeaderMap) -> Response {
    if bearer(&headers) == EXPIRED {
        return unauthorized();
    }
    Json(json!({"id": "u1", "email": "ada@example.com", "Mentor": null})).into_response()
}

async fn mentors_me(headers: HeaderMap) -> Response {
    match bearer(&headers) {
        EXPIRED => return unauthorized(),
        FLAKY => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"message": "database unavailable"})),
            )
                .into_response();
        }
        MIXED => {
            return Json(json!({
                "mentor": {
                    "id": "m2",
                    "first_name": "Grace",
                    "firstName": "Grace B.",
                    "last_name": "Hopper",
                    "lastName": "Hopper",
                    "gender": 1,
                    "experience_years": {"value": 40},
                    "experienceYears": "40",
                    "User": {"email": "grace@example.com"}
                }
            }))
            .into_response();
        }
        _ => {}
    }
    Json(json!({
        "mentor": {
            "id": "m1",
            "first_name": "Ada",
            "last_name": "Lovelace",
            "User": {"email": "ada@example.com"},
            "phone": "+44 20 7946 0000",
            "gender": "female",
            "dob": "1815-12-10",
            "job_title": "Analyst",
            "experience_years": "12",
            "session_rate": 150,
            "profile_image": "ada.png",
            "Position": {"id": "0f8fad5b-d9cb-469f-a165-70867728950e"}
        }
    }))
    .into_response()
}

async fn update_mentor(State(upstream): State<Upstream>, Json(body): Json<Value>) -> Response {
    let saved = json!({
        "message": "Mentor updated",
        "mentor": {
            "id": "m1",
            "first_name": body["firstName"],
            "last_name": body["lastName"]
        }
    });
    upstream.profiles.lock().unwrap().push(body);
    Json(saved).into_response()
}

async fn change_password(State(upstream): State<Upstream>, Json(body): Json<Value>) -> Response {
    if body["currentPassword"] == "Wrong1!pass" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"message": "Current password is incorrect"})),
        )
            .into_response();
    }
    upstream.passwords.lock().unwrap().push(body);
    Json(json!({"message": "Password updated"})).into_response()
}

async fn my_sessions(headers: HeaderMap) -> Response {
    let data = if bearer(&headers) == NEWCOMER {
        json!([])
    } else {
        json!([
            {"id": "s1", "location_name": "Zoom", "price": "50.00"},
            {"id": "s2", "Position": {"position_name": "Career coaching"}, "price": 80}
        ])
    };
    Json(json!({"success": true, "data": data})).into_response()
}

async fn add_timeslots(State(upstream): State<Upstream>, Json(body): Json<Value>) -> Response {
    upstream.timeslots.lock().unwrap().push(body);
    Json(json!({"success": true, "data": {"created": 1}})).into_response()
}

async fn my_certificates() -> Response {
    Json(json!([{
        "id": "c1",
        "certificate_number": "CERT-2025-001",
        "issue_date": "2025-01-20T00:00:00.000Z",
        "Position": {"position_name": "Data Analyst"},
        "Mentor": {"first_name": "Ada", "last_name": "Lovelace"},
        "AccUser": {"id": "7c9e6679", "first_name": "Alan", "last_name": "Turing"},
        "Booking": {
            "start_date_snapshot": "2025-01-15T10:00:00.000Z",
            "end_date_snapshot": "2025-01-15T11:30:00.000Z"
        }
    }]))
    .into_response()
}

async fn my_invoices() -> Response {
    Json(json!({"invoices": [
        {
            "id": "a1b2c3d4e5f6",
            "total_amount": "150.00",
            "start_date_snapshot": "2025-01-15T10:00:00.000Z",
            "AccUser": {"first_name": "Alan", "last_name": "Turing"},
            "Payment": {"booking_id": "9f8e7d6c5b4a"}
        },
        {
            "id": "0011aabbccdd",
            "total_amount": 80,
            "created_at": "2025-01-10T16:45:00.000Z",
            "acc_user_name_snapshot": "Grace Hopper"
        }
    ]}))
    .into_response()
}

async fn dashboard_summary(Path(mentor_id): Path<String>) -> Response {
    if mentor_id != "m1" {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({}))).into_response();
    }
    Json(json!({
        "bookings": {"total": 42, "growth": 12.5},
        "revenue": {"total": "3150.00", "growth": 4},
        "certifications": {"total": 7, "growth": 0}
    }))
    .into_response()
}

async fn dashboard_trends() -> Response {
    Json(json!([
        {"month": "Dec", "bookings": 10, "revenue": 900},
        {"month": "Jan", "bookings": 12, "revenue": 1100}
    ]))
    .into_response()
}

async fn weekly_performance() -> Response {
    Json(json!({"weekly": [{"day": "Mon", "completed": 3, "cancelled": 1}]})).into_response()
}

struct Harness {
    app: Router,
    upstream: Upstream,
    sessions: Arc<InMemorySessionStore>,
    api_base_url: String,
}

async fn harness() -> Harness {
    let upstream = Upstream::default();
    let api = Router::new()
        .route("/auth/me", get(auth_me))
        .route("/mentors/me", get(mentors_me).put(update_mentor))
        .route("/mentors/me/password", put(change_password))
        .route("/mentors/me/sessions", get(my_sessions))
        .route("/timeslots", post(add_timeslots))
        .route("/certificates/my", get(my_certificates))
        .route("/invoices/my", get(my_invoices))
        .route("/dashboard/mentor/:id/summary", get(dashboard_summary))
        .route("/dashboard/mentor/:id/trends", get(dashboard_trends))
        .route(
            "/dashboard/mentor/:id/weekly-performance",
            get(weekly_performance),
        );
    let fake = Router::new().nest("/api", api).with_state(upstream.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, fake).await.unwrap();
    });

    let api_base_url = format!("http://{addr}/api");
    let backend = BackendClient::new(api_base_url.clone(), Duration::from_secs(5)).unwrap();
    let sessions = Arc::new(InMemorySessionStore::new(Duration::from_secs(60)));
    let app = create_router(AppState::new(backend, sessions.clone()));

    Harness {
        app,
        upstream,
        sessions,
        api_base_url,
    }
}

fn request(method: &str, uri: &str, token: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"));
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn bootstrap_attaches_mentor_profile() {
    let h = harness().await;

    let (status, body) = call(&h.app, request("POST", "/session", GOOD, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "ada@example.com");
    assert_eq!(body["user"]["Mentor"]["id"], "m1");

    let cached = h.sessions.get(GOOD).await.unwrap().unwrap();
    assert!(cached.has_mentor());

    let (_, body) = call(&h.app, request("GET", "/session", GOOD, None)).await;
    assert_eq!(body["user"]["Mentor"]["first_name"], "Ada");
}

#[tokio::test]
async fn rejected_token_clears_cached_session() {
    let h = harness().await;
    h.sessions.set(&AuthSession::new(EXPIRED)).await.unwrap();

    let (status, body) = call(&h.app, request("POST", "/session", EXPIRED, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthorized");
    assert_eq!(h.sessions.get(EXPIRED).await.unwrap(), None);
}

#[tokio::test]
async fn logout_forgets_session() {
    let h = harness().await;
    call(&h.app, request("POST", "/session", GOOD, None)).await;

    let (status, body) = call(&h.app, request("DELETE", "/session", GOOD, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Logged out successfully");
    assert_eq!(h.sessions.get(GOOD).await.unwrap(), None);
}

#[tokio::test]
async fn session_listing_preselects_first_session() {
    let h = harness().await;

    let (status, body) = call(&h.app, request("GET", "/timeslots/sessions", GOOD, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["sessions"],
        json!([
            {"id": "s1", "label": "Zoom - $50.00"},
            {"id": "s2", "label": "Career coaching - $80"}
        ])
    );
    assert_eq!(body["selection"], json!({"type": "existing", "id": "s1"}));

    let (_, body) = call(&h.app, request("GET", "/timeslots/sessions", NEWCOMER, None)).await;
    assert_eq!(body["sessions"], json!([]));
    assert_eq!(body["selection"], json!({"type": "auto_create"}));
}

#[tokio::test]
async fn timeslot_is_forwarded_as_iso() {
    let h = harness().await;

    let (status, body) = call(
        &h.app,
        request(
            "POST",
            "/timeslots",
            GOOD,
            Some(json!({
                "startDateTime": "15/01/2025, 10:00 AM",
                "endDateTime": "15/01/2025, 11:30 AM"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"], json!({"created": 1}));
    assert_eq!(body["session_id"], "s1");

    call(
        &h.app,
        request(
            "POST",
            "/timeslots",
            GOOD,
            Some(json!({
                "start": "2025-01-16T09:00:00Z",
                "end": "2025-01-16T10:00:00Z",
                "session": {"type": "existing", "id": "s2"}
            })),
        ),
    )
    .await;

    let received = h.upstream.timeslots.lock().unwrap().clone();
    assert_eq!(
        received,
        vec![
            json!({
                "session_id": "s1",
                "timeslots": [{
                    "start_time": "2025-01-15T10:00:00.000Z",
                    "end_time": "2025-01-15T11:30:00.000Z"
                }]
            }),
            json!({
                "session_id": "s2",
                "timeslots": [{
                    "start_time": "2025-01-16T09:00:00.000Z",
                    "end_time": "2025-01-16T10:00:00.000Z"
                }]
            }),
        ]
    );
}

#[tokio::test]
async fn timeslot_auto_creates_only_without_sessions_or_when_asked() {
    let h = harness().await;
    let slot = |session: Option<Value>| {
        let mut body = json!({
            "start": "2025-01-17T09:00:00Z",
            "end": "2025-01-17T10:00:00Z"
        });
        if let Some(session) = session {
            body["session"] = session;
        }
        Some(body)
    };

    let (status, _) = call(&h.app, request("POST", "/timeslots", NEWCOMER, slot(None))).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = call(
        &h.app,
        request(
            "POST",
            "/timeslots",
            GOOD,
            slot(Some(json!({"type": "auto_create"}))),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["session_id"], Value::Null);

    let received = h.upstream.timeslots.lock().unwrap().clone();
    assert_eq!(received.len(), 2);
    assert!(received.iter().all(|r| r["session_id"].is_null()));
}

#[tokio::test]
async fn profile_is_mapped_for_editing() {
    let h = harness().await;

    let (status, body) = call(&h.app, request("GET", "/profile", GOOD, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["firstName"], "Ada");
    assert_eq!(body["email"], "ada@example.com");
    assert_eq!(body["phoneNumber"], "+44 20 7946 0000");
    assert_eq!(body["experienceYears"].as_f64(), Some(12.0));
    assert_eq!(body["sessionRate"].as_f64(), Some(150.0));
    assert_eq!(
        body["profileImageUrl"],
        format!("{}/uploads/ada.png", h.api_base_url.trim_end_matches("/api"))
    );
}

#[tokio::test]
async fn profile_with_both_key_spellings_is_not_blank() {
    let h = harness().await;

    let (status, body) = call(&h.app, request("GET", "/profile", MIXED, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["firstName"], "Grace");
    assert_eq!(body["lastName"], "Hopper");
    assert_eq!(body["email"], "grace@example.com");
    assert_eq!(body["gender"], "1");
    assert_eq!(body["experienceYears"].as_f64(), Some(40.0));
}

#[tokio::test]
async fn profile_update_forwards_normalized_payload() {
    let h = harness().await;

    let (status, body) = call(
        &h.app,
        request(
            "PUT",
            "/profile",
            GOOD,
            Some(json!({
                "firstName": "Ada",
                "lastName": "Lovelace",
                "email": "ada@example.com",
                "phoneNumber": "+44 20 7946 0000",
                "gender": "female",
                "dob": "1815-12-10",
                "jobTitle": "Analyst",
                "experienceYears": "0",
                "sessionRate": "120",
                "positionId": "0f8fad5b-d9cb-469f-a165-70867728950e",
                "industryId": "not-a-uuid"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Profile updated successfully!");
    assert_eq!(body["profile"]["lastName"], "Lovelace");

    let sent = h.upstream.profiles.lock().unwrap()[0].clone();
    assert_eq!(sent["experienceYears"], Value::Null);
    assert_eq!(sent["sessionRate"].as_f64(), Some(120.0));
    assert_eq!(sent["position_id"], "0f8fad5b-d9cb-469f-a165-70867728950e");
    assert!(sent.get("industry_id").is_none());

    let cached = h.sessions.get(GOOD).await.unwrap().unwrap();
    assert!(cached.has_mentor());
}

#[tokio::test]
async fn profile_update_succeeds_when_refresh_fails() {
    let h = harness().await;

    let (status, body) = call(
        &h.app,
        request(
            "PUT",
            "/profile",
            FLAKY,
            Some(json!({
                "firstName": "Augusta",
                "lastName": "King",
                "email": "ada@example.com",
                "phoneNumber": "+44 20 7946 0000",
                "dob": "1815-12-10",
                "jobTitle": "Analyst",
                "sessionRate": 120
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Profile updated successfully!");
    assert_eq!(body["profile"]["firstName"], "Augusta");
    assert_eq!(body["profile"]["lastName"], "King");
    assert_eq!(body["profile"]["jobTitle"], "Analyst");
    assert_eq!(body["profile"]["sessionRate"].as_f64(), Some(120.0));
    assert_eq!(h.upstream.profiles.lock().unwrap().len(), 1);

    let cached = h.sessions.get(FLAKY).await.unwrap().unwrap();
    assert_eq!(
        cached.user,
        Some(json!({"Mentor": {"id": "m1", "first_name": "Augusta", "last_name": "King"}}))
    );
}

#[tokio::test]
async fn certificates_are_listed_for_display() {
    let h = harness().await;

    let (status, body) = call(&h.app, request("GET", "/certificates", GOOD, None)).await;
    assert_eq!(status, StatusCode::OK);
    let cert = &body["certificates"][0];
    assert_eq!(cert["certificateNumber"], "CERT-2025-001");
    assert_eq!(cert["programName"], "Data Analyst");
    assert_eq!(cert["mentorName"], "Ada Lovelace");
    assert_eq!(cert["studentName"], "Alan Turing");
    assert_eq!(cert["studentId"], "U7C9E");
    assert_eq!(cert["startDate"], "15/01/2025");
    assert_eq!(cert["duration"], "1 hour 30 mins");
    assert_eq!(cert["issueDate"], "20/01/2025");
}

#[tokio::test]
async fn invoices_are_paged_and_searchable() {
    let h = harness().await;

    let (status, body) = call(&h.app, request("GET", "/invoices", GOOD, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stats"], json!({"total": 2, "paid": 2, "pending": 0}));
    assert_eq!(body["totalPages"], 1);
    let first = &body["invoices"][0];
    assert_eq!(first["invoiceId"], "INV-A1B2C3");
    assert_eq!(first["bookingId"], "BK-9F8E7D6C");
    assert_eq!(first["user"]["initials"], "AT");
    assert_eq!(first["dateTime"], "15/01/2025, 10:00 AM");
    assert_eq!(first["amount"].as_f64(), Some(150.0));
    assert_eq!(body["invoices"][1]["dateTime"], "10/01/2025, 04:45 PM");

    let (_, body) = call(&h.app, request("GET", "/invoices?search=grace", GOOD, None)).await;
    assert_eq!(body["invoices"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["invoices"][0]["user"]["name"], "Grace Hopper");
    assert_eq!(body["invoices"][0]["bookingId"], "INV-0011AABB");
}

#[tokio::test]
async fn overview_resolves_mentor_and_aggregates() {
    let h = harness().await;

    let (status, body) = call(&h.app, request("GET", "/overview", GOOD, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"]["bookings"], json!({"total": 42.0, "growth": 12.5}));
    assert_eq!(body["summary"]["revenue"]["total"].as_f64(), Some(3150.0));
    assert_eq!(body["trends"][1]["month"], "Jan");
    assert_eq!(
        body["weekly"],
        json!([{"day": "Mon", "completed": 3.0, "incomplete": 0.0, "canceled": 1.0}])
    );
    assert!(body.get("warning").is_none());
}

#[tokio::test]
async fn overview_degrades_to_zeroes_when_summary_fails() {
    let h = harness().await;
    let mut session = AuthSession::new(GOOD);
    session.attach_mentor(json!({"id": "m404"}));
    h.sessions.set(&session).await.unwrap();

    let (status, body) = call(&h.app, request("GET", "/overview", GOOD, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["warning"],
        "Failed to load dashboard data. Please try again later."
    );
    assert_eq!(body["summary"]["bookings"]["total"].as_f64(), Some(0.0));
    assert_eq!(body["trends"], json!([]));

    let (status, _) = call(&h.app, request("GET", "/overview", EXPIRED, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn password_change_forwards_only_current_and_new() {
    let h = harness().await;

    let (status, body) = call(
        &h.app,
        request(
            "POST",
            "/password",
            GOOD,
            Some(json!({
                "currentPassword": "Wrong1!pass",
                "newPassword": "Str0ng!pass",
                "confirmPassword": "Str0ng!pass"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Current password is incorrect");

    let (status, body) = call(
        &h.app,
        request(
            "POST",
            "/password",
            GOOD,
            Some(json!({
                "currentPassword": "Old1!pass",
                "newPassword": "Str0ng!pass",
                "confirmPassword": "Str0ng!pass"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Password changed successfully!");
    assert_eq!(
        h.upstream.passwords.lock().unwrap().clone(),
        vec![json!({"currentPassword": "Old1!pass", "newPassword": "Str0ng!pass"})]
    );
}
