use axum::{Json, extract::Query, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::TypedHeader;
use axum_extra::headers::{Authorization, authorization::Bearer};
use chrono::{DateTime, Utc};
use http::header;
use tracing::info;

use crate::{
    AppState,
    auth::verify_token,
    error::ApiError,
    models::{BookingRequest, CourtState, CourtStatus, MaterializedEvent},
    validation::{parse_instant, validate_booking, validate_range, validate_schedule},
};

#[derive(Debug, serde::Deserialize)]
pub struct RangeQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
pub struct InstructorQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    #[serde(rename = "courtId")]
    pub court_id: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
pub struct StatusQuery {
    pub at: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
pub struct TokenQuery {
    pub token: Option<String>,
}

#[derive(Debug, serde::Deserialize, utoipa::ToSchema)]
pub struct ScheduleValidationRequest {
    #[serde(default)]
    #[schema(value_type = Object)]
    pub schedule: serde_json::Value,
}

type BearerHeader = Option<TypedHeader<Authorization<Bearer>>>;

fn authorize(state: &AppState, auth: BearerHeader, query_token: Option<&str>) -> Result<(), ApiError> {
    let auth_header = auth.map(|TypedHeader(a)| a);
    verify_token(&state.settings, auth_header, query_token)
}

fn resolve_range(
    state: &AppState,
    from: Option<&str>,
    to: Option<&str>,
) -> Result<(DateTime<Utc>, DateTime<Utc>), ApiError> {
    let now = Utc::now();
    let tz = state.calendar.timezone();
    let from = parse_instant(from, tz, now)?;
    let to = parse_instant(to, tz, now)?;
    validate_range(from, to, state.settings.max_range_days)?;
    Ok((from, to))
}

fn sort_events(events: &mut [MaterializedEvent]) {
    events.sort_by(|a, b| a.start().cmp(&b.start()).then_with(|| a.id().cmp(b.id())));
}

async fn instructor_events(state: &AppState, query: &InstructorQuery) -> Result<Vec<MaterializedEvent>, ApiError> {
    let (from, to) = resolve_range(state, query.from.as_deref(), query.to.as_deref())?;
    let snapshot = state.directory.fetch_snapshot().await?;
    let students = snapshot.students_with_schedule(&state.settings.student_role);

    let mut events = state.calendar.expand_by_instructor(
        &students,
        from,
        to,
        &snapshot.users_by_id(),
        &snapshot.courts_by_id(),
    );
    if let Some(court_id) = query.court_id.as_deref().filter(|id| !id.is_empty()) {
        events.retain(|event| event.court_id() == court_id);
    }
    sort_events(&mut events);
    Ok(events)
}

#[utoipa::path(get, path = "/", tag = "agenda")]
pub async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "Beach Flow Agenda API",
        "endpoints": {
            "/agenda/student-classes": "Student class occurrences as JSON",
            "/agenda/instructor-classes": "Classes grouped by instructor as JSON",
            "/agenda/instructor-classes.ical": "Classes grouped by instructor as iCal",
            "/bookings/check": "Check a booking against class slots",
            "/courts/status": "Current court status",
            "/schedules/validate": "Validate a weekly schedule"
        }
    }))
}

#[utoipa::path(get, path = "/healthz/live", tag = "agenda")]
pub async fn healthz_live() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

#[utoipa::path(get, path = "/healthz/ready", tag = "agenda")]
pub async fn healthz_ready() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

#[utoipa::path(
    get,
    path = "/agenda/student-classes",
    params(
        ("from" = Option<String>, Query, description = "Range start (ISO-8601), defaults to now"),
        ("to" = Option<String>, Query, description = "Range end (ISO-8601), defaults to now"),
        ("token" = Option<String>, Query, description = "Authentication token (alternative to Bearer header)")
    ),
    responses(
        (status = 200, description = "Student class occurrences", body = [MaterializedEvent]),
        (status = 400, description = "Invalid range"),
        (status = 401, description = "Invalid authentication token")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "agenda"
)]
pub async fn get_student_classes(
    State(state): State<AppState>,
    auth: BearerHeader,
    Query(query): Query<RangeQuery>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, auth, query.token.as_deref())?;
    let (from, to) = resolve_range(&state, query.from.as_deref(), query.to.as_deref())?;

    let students = state.directory.fetch_students(&state.settings.student_role).await?;
    let mut events = state.calendar.expand_student_classes(&students, from, to);
    sort_events(&mut events);

    Ok(Json(events))
}

#[utoipa::path(
    get,
    path = "/agenda/instructor-classes",
    params(
        ("from" = Option<String>, Query, description = "Range start (ISO-8601), defaults to now"),
        ("to" = Option<String>, Query, description = "Range end (ISO-8601), defaults to now"),
        ("courtId" = Option<String>, Query, description = "Only classes on this court"),
        ("token" = Option<String>, Query, description = "Authentication token (alternative to Bearer header)")
    ),
    responses(
        (status = 200, description = "Classes grouped by instructor", body = [MaterializedEvent]),
        (status = 400, description = "Invalid range"),
        (status = 401, description = "Invalid authentication token")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "agenda"
)]
pub async fn get_instructor_classes(
    State(state): State<AppState>,
    auth: BearerHeader,
    Query(query): Query<InstructorQuery>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, auth, query.token.as_deref())?;
    let events = instructor_events(&state, &query).await?;
    Ok(Json(events))
}

#[utoipa::path(
    get,
    path = "/agenda/instructor-classes.ical",
    params(
        ("from" = Option<String>, Query, description = "Range start (ISO-8601), defaults to now"),
        ("to" = Option<String>, Query, description = "Range end (ISO-8601), defaults to now"),
        ("courtId" = Option<String>, Query, description = "Only classes on this court"),
        ("token" = Option<String>, Query, description = "Authentication token (alternative to Bearer header)")
    ),
    responses(
        (status = 200, description = "iCal file", content_type = "text/calendar"),
        (status = 401, description = "Invalid authentication token"),
        (status = 404, description = "No classes found")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "agenda"
)]
pub async fn get_instructor_ical(
    State(state): State<AppState>,
    auth: BearerHeader,
    Query(query): Query<InstructorQuery>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, auth, query.token.as_deref())?;
    let events = instructor_events(&state, &query).await?;

    if events.is_empty() {
        return Err(ApiError::NotFound("No classes found".into()));
    }

    let body = state
        .exporter
        .generate(&state.settings.labels.calendar_name, &events);
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/calendar"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=beach_flow_agenda.ics",
            ),
        ],
        body,
    ))
}

#[utoipa::path(
    post,
    path = "/bookings/check",
    params(
        ("token" = Option<String>, Query, description = "Authentication token (alternative to Bearer header)")
    ),
    request_body = BookingRequest,
    responses(
        (status = 200, description = "No class on this court at that time"),
        (status = 400, description = "Invalid booking"),
        (status = 401, description = "Invalid authentication token"),
        (status = 409, description = "A student class occupies the court")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "bookings"
)]
pub async fn check_booking(
    State(state): State<AppState>,
    auth: BearerHeader,
    Query(query): Query<TokenQuery>,
    Json(request): Json<BookingRequest>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, auth, query.token.as_deref())?;
    validate_booking(&request)?;

    let students = state.directory.fetch_students(&state.settings.student_role).await?;
    if state
        .calendar
        .rental_conflicts(&request.court_id, request.start, request.end, &students)
    {
        info!(court_id = %request.court_id, start = %request.start, "booking rejected by class slot");
        return Err(ApiError::Conflict(
            "Court is reserved for a student class at this time".into(),
        ));
    }

    Ok(Json(serde_json::json!({"conflict": false})))
}

#[utoipa::path(
    get,
    path = "/courts/status",
    params(
        ("at" = Option<String>, Query, description = "Instant to evaluate (ISO-8601), defaults to now"),
        ("token" = Option<String>, Query, description = "Authentication token (alternative to Bearer header)")
    ),
    responses(
        (status = 200, description = "Status per court: maintenance, rented, in_class or available", body = [CourtStatus]),
        (status = 400, description = "Invalid instant"),
        (status = 401, description = "Invalid authentication token")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "courts"
)]
pub async fn get_court_status(
    State(state): State<AppState>,
    auth: BearerHeader,
    Query(query): Query<StatusQuery>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, auth, query.token.as_deref())?;
    let at = parse_instant(query.at.as_deref(), state.calendar.timezone(), Utc::now())?;

    let snapshot = state.directory.fetch_snapshot().await?;
    let students = snapshot.students_with_schedule(&state.settings.student_role);

    let mut statuses: Vec<CourtStatus> = snapshot
        .courts
        .iter()
        .map(|court| {
            let status = if court.under_maintenance() {
                CourtState::Maintenance
            } else if snapshot.is_rented_at(&court.id, at) {
                CourtState::Rented
            } else if state.calendar.is_court_in_class_at(&court.id, at, &students) {
                CourtState::InClass
            } else {
                CourtState::Available
            };
            CourtStatus {
                id: court.id.clone(),
                name: court.name.clone(),
                status,
            }
        })
        .collect();
    statuses.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));

    Ok(Json(statuses))
}

#[utoipa::path(
    post,
    path = "/schedules/validate",
    params(
        ("token" = Option<String>, Query, description = "Authentication token (alternative to Bearer header)")
    ),
    request_body = ScheduleValidationRequest,
    responses(
        (status = 200, description = "Schedule is valid"),
        (status = 400, description = "First invalid slot"),
        (status = 401, description = "Invalid authentication token")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "schedules"
)]
pub async fn validate_schedule_handler(
    State(state): State<AppState>,
    auth: BearerHeader,
    Query(query): Query<TokenQuery>,
    Json(request): Json<ScheduleValidationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, auth, query.token.as_deref())?;
    let slots = validate_schedule(&request.schedule)?;
    Ok(Json(serde_json::json!({"ok": true, "slots": slots})))
}
