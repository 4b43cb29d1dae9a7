//! Dashboard service routes

use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use common::AuthSession;
use forms::{
    DashboardOverview, ErrorMap, FormValues, InvoicePage, Schema, SessionSelection,
    SessionSummary, TimeSlotInput, certificate_views, invoice_views,
    password::{PasswordChangeForm, password_schema},
    profile::{MentorEnvelope, MentorRecord, ProfileForm, profile_schema},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, error, info, warn};

use crate::{
    client::ClientError,
    error::{ApiError, ApiResult},
    middleware::{CurrentSession, auth_middleware},
    state::AppState,
};

/// Create the router for the dashboard service
pub fn create_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route(
            "/session",
            post(bootstrap_session)
                .get(get_session)
                .delete(clear_session),
        )
        .route("/timeslots/sessions", get(list_sessions))
        .route("/timeslots", post(create_timeslot))
        .route("/profile", get(get_profile).put(update_profile))
        .route("/password", post(change_password))
        .route("/certificates", get(list_certificates))
        .route("/invoices", get(list_invoices))
        .route("/overview", get(dashboard_overview))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/forms/:form/validate", post(validate_form))
        .route("/forms/:form/fields/:field", post(validate_field))
        .merge(protected_routes)
        .with_state(state)
}

/// Pass an upstream result through, expiring the session on a rejected token
async fn guard<T>(
    state: &AppState,
    token: &str,
    result: Result<T, ClientError>,
) -> ApiResult<T> {
    match result {
        Ok(value) => Ok(value),
        Err(ClientError::Unauthorized) => {
            warn!("Upstream rejected the token, clearing session");
            state.expire_session(token).await;
            Err(ApiError::Unauthorized)
        }
        Err(e) => Err(e.into()),
    }
}

fn form_schema(form: &str) -> ApiResult<&'static Schema> {
    match form {
        "profile" => Ok(profile_schema()),
        "password" => Ok(password_schema()),
        other => Err(ApiError::NotFound(format!("Unknown form: {other}"))),
    }
}

fn validation_failed(schema: &Schema, fields: ErrorMap) -> ApiError {
    let message = schema
        .first_message(&fields)
        .unwrap_or("Please fix the errors in the form")
        .to_string();
    warn!("Rejected form submission: {}", message);
    ApiError::Validation { message, fields }
}

/// The mentor object inside a `/mentors/me` response, wrapped or bare
fn mentor_json(raw: &Value) -> Option<Value> {
    MentorEnvelope::try_from(raw)
        .ok()
        .map(|envelope| Value::Object(envelope.mentor().clone()))
}

fn decode_mentor(raw: &Value) -> ApiResult<MentorRecord> {
    MentorRecord::from_response(raw).map_err(|e| {
        error!("Failed to decode mentor profile: {}", e);
        ApiError::Upstream("Failed to load profile data. Please try again.".to_string())
    })
}

/// Mentor id cached on the session user, under `Mentor` or `mentor`
fn cached_mentor_id(session: &AuthSession) -> Option<String> {
    let user = session.user.as_ref()?;
    ["Mentor", "mentor"]
        .iter()
        .filter_map(|key| user.get(*key))
        .find_map(|mentor| match mentor.get("id")? {
            Value::String(id) if !id.is_empty() => Some(id.clone()),
            Value::Number(id) => Some(id.to_string()),
            _ => None,
        })
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "dashboard-service"
    }))
}

/// Load the signed-in mentor into the session cache
///
/// `GET /auth/me` is best effort; only if the user still carries no
/// `Mentor` afterwards is `GET /mentors/me` consulted.
pub async fn bootstrap_session(
    State(state): State<AppState>,
    Extension(CurrentSession(mut session)): Extension<CurrentSession>,
) -> ApiResult<impl IntoResponse> {
    info!("Bootstrapping session");

    if !session.has_mentor() {
        match state.backend.current_user(&session.token).await {
            Ok(user) => session.user = Some(user),
            Err(ClientError::Unauthorized) => {
                state.expire_session(&session.token).await;
                return Err(ApiError::Unauthorized);
            }
            Err(e) => warn!("Failed to fetch current user: {}", e),
        }
    }

    if !session.has_mentor() {
        match state.backend.mentor_profile(&session.token).await {
            Ok(raw) => {
                if let Some(mentor) = mentor_json(&raw) {
                    session.attach_mentor(mentor);
                }
            }
            Err(ClientError::Unauthorized) => {
                state.expire_session(&session.token).await;
                return Err(ApiError::Unauthorized);
            }
            Err(e) => warn!("Failed to fetch mentor profile: {}", e),
        }
    }

    state.sessions.set(&session).await?;

    Ok(Json(json!({
        "authenticated": true,
        "user": session.user,
    })))
}

/// Current cached session
pub async fn get_session(
    Extension(CurrentSession(session)): Extension<CurrentSession>,
) -> impl IntoResponse {
    Json(json!({
        "authenticated": true,
        "user": session.user,
    }))
}

/// Log out
pub async fn clear_session(
    State(state): State<AppState>,
    Extension(CurrentSession(session)): Extension<CurrentSession>,
) -> ApiResult<impl IntoResponse> {
    state.sessions.clear(&session.token).await?;
    info!("Session cleared");

    Ok(Json(json!({
        "message": "Logged out successfully"
    })))
}

#[derive(Debug, Serialize)]
pub struct SessionOption {
    pub id: Option<String>,
    pub label: String,
}

#[derive(Debug, Serialize)]
pub struct SessionListResponse {
    pub sessions: Vec<SessionOption>,
    /// Preselected target for new slots
    pub selection: SessionSelection,
}

async fn load_sessions(state: &AppState, token: &str) -> ApiResult<Vec<SessionSummary>> {
    let result = state.backend.my_sessions(token).await;
    match guard(state, token, result).await {
        Ok(sessions) => Ok(sessions),
        Err(ApiError::Unauthorized) => Err(ApiError::Unauthorized),
        Err(e) => {
            error!("Failed to load sessions: {}", e);
            Err(ApiError::Upstream(
                "Failed to load sessions. Please try again.".to_string(),
            ))
        }
    }
}

/// Sessions the mentor can attach new slots to
pub async fn list_sessions(
    State(state): State<AppState>,
    Extension(CurrentSession(session)): Extension<CurrentSession>,
) -> ApiResult<impl IntoResponse> {
    let sessions = load_sessions(&state, &session.token).await?;

    let selection = SessionSelection::default_for(&sessions);
    let sessions = sessions
        .iter()
        .map(|s| SessionOption {
            id: s.id.clone(),
            label: s.label(),
        })
        .collect();

    Ok(Json(SessionListResponse {
        sessions,
        selection,
    }))
}

#[derive(Debug, Deserialize)]
pub struct CreateTimeSlotRequest {
    #[serde(flatten)]
    pub slot: TimeSlotInput,
    /// Omitted means the same preselection `GET /timeslots/sessions` offers
    #[serde(default)]
    pub session: Option<SessionSelection>,
}

/// Parse a slot typed by the mentor and create it upstream
pub async fn create_timeslot(
    State(state): State<AppState>,
    Extension(CurrentSession(session)): Extension<CurrentSession>,
    Json(payload): Json<CreateTimeSlotRequest>,
) -> ApiResult<impl IntoResponse> {
    let range = payload.slot.parse().inspect_err(|e| {
        warn!("Rejected time slot input: {}", e);
    })?;
    let selection = match payload.session {
        Some(selection) => selection,
        None => SessionSelection::default_for(&load_sessions(&state, &session.token).await?),
    };
    let request = range.into_request(&selection);
    info!(
        "Creating time slot {} - {}",
        request.timeslots[0].start_time, request.timeslots[0].end_time
    );

    let result = state.backend.add_timeslots(&session.token, &request).await;
    let created = guard(&state, &session.token, result).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "session_id": request.session_id,
            "timeslots": request.timeslots,
            "data": created,
        })),
    ))
}

/// Validate a whole form
pub async fn validate_form(
    Path(form): Path<String>,
    Json(values): Json<FormValues>,
) -> ApiResult<impl IntoResponse> {
    let schema = form_schema(&form)?;
    let errors = schema.validate(&values);

    Ok(Json(json!({
        "valid": errors.is_empty(),
        "errors": errors,
    })))
}

/// Validate one field against the current values of the whole form
pub async fn validate_field(
    Path((form, field)): Path<(String, String)>,
    Json(values): Json<FormValues>,
) -> ApiResult<impl IntoResponse> {
    let schema = form_schema(&form)?;
    let error = schema.validate_field(&field, &values)?;

    Ok(Json(json!({
        "field": field,
        "error": error,
    })))
}

/// The mentor profile as an editable form
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(CurrentSession(session)): Extension<CurrentSession>,
) -> ApiResult<impl IntoResponse> {
    let result = state.backend.mentor_profile(&session.token).await;
    let raw = guard(&state, &session.token, result).await?;
    let record = decode_mentor(&raw)?;

    Ok(Json(record.into_form(state.backend.base_url())))
}

/// Validate and save the mentor profile
///
/// The reply is built from the update response overlaid on the submitted
/// form, then refreshed from `GET /mentors/me`. The save has already
/// succeeded by then, so a failed refresh is only logged.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(CurrentSession(mut session)): Extension<CurrentSession>,
    Json(form): Json<ProfileForm>,
) -> ApiResult<impl IntoResponse> {
    let submitted = form.clone();
    let update = form
        .into_update()
        .map_err(|errors| validation_failed(profile_schema(), errors))?;

    let result = state.backend.update_profile(&session.token, &update).await;
    let saved = guard(&state, &session.token, result).await?;
    info!("Profile updated");

    let base_url = state.backend.base_url();
    let mut profile = match MentorRecord::from_response(&saved) {
        Ok(record) => record.merge_into(submitted, base_url),
        Err(e) => {
            debug!("Update response carries no mentor record: {}", e);
            submitted
        }
    };
    let mut cached = match MentorEnvelope::try_from(&saved) {
        Ok(MentorEnvelope::Wrapped(mentor)) => Some(Value::Object(mentor.clone())),
        _ => None,
    };

    match state.backend.mentor_profile(&session.token).await {
        Ok(raw) => match MentorRecord::from_response(&raw) {
            Ok(record) => {
                profile = record.merge_into(profile, base_url);
                cached = mentor_json(&raw);
            }
            Err(e) => warn!("Refreshed profile is unreadable: {}", e),
        },
        Err(e) => warn!("Failed to refresh profile after update: {}", e),
    }

    if let Some(mentor) = cached {
        session.attach_mentor(mentor);
        if let Err(e) = state.sessions.set(&session).await {
            warn!("Failed to cache updated profile: {}", e);
        }
    }

    Ok(Json(json!({
        "message": "Profile updated successfully!",
        "profile": profile,
    })))
}

/// Validate and forward a password change
pub async fn change_password(
    State(state): State<AppState>,
    Extension(CurrentSession(session)): Extension<CurrentSession>,
    Json(form): Json<PasswordChangeForm>,
) -> ApiResult<impl IntoResponse> {
    let change = form
        .into_change()
        .map_err(|errors| validation_failed(password_schema(), errors))?;

    let result = state.backend.change_password(&session.token, &change).await;
    guard(&state, &session.token, result).await?;
    info!("Password changed");

    Ok(Json(json!({
        "message": "Password changed successfully!"
    })))
}

/// Certificates issued for the mentor's sessions
pub async fn list_certificates(
    State(state): State<AppState>,
    Extension(CurrentSession(session)): Extension<CurrentSession>,
) -> ApiResult<impl IntoResponse> {
    let result = state.backend.my_certificates(&session.token).await;
    let raw = guard(&state, &session.token, result).await?;
    let certificates = certificate_views(&raw).map_err(|e| {
        error!("Failed to decode certificates: {}", e);
        ApiError::Upstream("Failed to load certificates".to_string())
    })?;

    Ok(Json(json!({ "certificates": certificates })))
}

#[derive(Debug, Default, Deserialize)]
pub struct InvoiceQuery {
    pub search: Option<String>,
    pub page: Option<usize>,
}

/// One page of the mentor's invoices, optionally filtered
pub async fn list_invoices(
    State(state): State<AppState>,
    Extension(CurrentSession(session)): Extension<CurrentSession>,
    Query(query): Query<InvoiceQuery>,
) -> ApiResult<impl IntoResponse> {
    let result = state.backend.my_invoices(&session.token).await;
    let raw = guard(&state, &session.token, result).await?;
    let invoices = invoice_views(&raw).map_err(|e| {
        error!("Failed to decode invoices: {}", e);
        ApiError::Upstream("Failed to load invoices".to_string())
    })?;

    Ok(Json(InvoicePage::build(
        invoices,
        query.search.as_deref(),
        query.page.unwrap_or(1),
    )))
}

/// Resolve the mentor id from the session, falling back to `GET /mentors/me`
async fn mentor_id(state: &AppState, session: &AuthSession) -> ApiResult<String> {
    if let Some(id) = cached_mentor_id(session) {
        return Ok(id);
    }

    let result = state.backend.mentor_profile(&session.token).await;
    let raw = match guard(state, &session.token, result).await {
        Ok(raw) => raw,
        Err(ApiError::Unauthorized) => return Err(ApiError::Unauthorized),
        Err(e) => {
            error!("Failed to load mentor profile: {}", e);
            return Err(ApiError::Upstream(
                "Failed to load mentor profile. Please try logging in again.".to_string(),
            ));
        }
    };
    decode_mentor(&raw)?.id.ok_or_else(|| {
        ApiError::NotFound("Mentor ID not found. Please log in again.".to_string())
    })
}

/// Headline totals, monthly trends and weekly performance
///
/// Weekly figures are optional. If the totals or the trends cannot be
/// loaded, zeroed figures are returned with a warning instead of an error.
pub async fn dashboard_overview(
    State(state): State<AppState>,
    Extension(CurrentSession(session)): Extension<CurrentSession>,
) -> ApiResult<impl IntoResponse> {
    let mentor_id = mentor_id(&state, &session).await?;
    let token = session.token.as_str();

    let (summary, trends, weekly) = tokio::join!(
        state.backend.dashboard_summary(token, &mentor_id),
        state.backend.dashboard_trends(token, &mentor_id),
        state.backend.weekly_performance(token, &mentor_id),
    );

    let weekly = weekly.unwrap_or_else(|e| {
        debug!("Weekly performance unavailable: {}", e);
        Value::Null
    });
    let overview = match (summary, trends) {
        (Ok(summary), Ok(trends)) => DashboardOverview::new(&summary, &trends, &weekly),
        (Err(ClientError::Unauthorized), _) | (_, Err(ClientError::Unauthorized)) => {
            warn!("Upstream rejected the token, clearing session");
            state.expire_session(token).await;
            return Err(ApiError::Unauthorized);
        }
        (Err(e), _) | (_, Err(e)) => {
            warn!("Failed to load dashboard data: {}", e);
            DashboardOverview::unavailable()
        }
    };

    Ok(Json(overview))
}
