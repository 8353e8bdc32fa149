pub mod auth;
pub mod directory;
pub mod error;
pub mod handlers;
pub mod ical;
pub mod models;
pub mod openapi;
pub mod schedule;
pub mod settings;
pub mod validation;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use handlers::{
    check_booking, get_court_status, get_instructor_classes, get_instructor_ical,
    get_student_classes, healthz_live, healthz_ready, root, validate_schedule_handler,
};
use http::HeaderValue;
use tower_http::LatencyUnit;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{Level, info, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::directory::DirectoryClient;
use crate::ical::ICalExporter;
use crate::openapi::ApiDoc;
use crate::schedule::ClassCalendar;
use crate::settings::{Settings, SettingsError};

#[derive(Clone)]
pub struct AppState {
    pub settings: Settings,
    pub directory: Arc<DirectoryClient>,
    pub calendar: Arc<ClassCalendar>,
    pub exporter: Arc<ICalExporter>,
}

impl AppState {
    pub fn new(settings: Settings) -> Result<Self, SettingsError> {
        let calendar = ClassCalendar::new(settings.tz()?, settings.labels.clone());
        Ok(Self {
            directory: Arc::new(DirectoryClient::new(settings.directory_base_url.clone())),
            calendar: Arc::new(calendar),
            exporter: Arc::new(ICalExporter::new()),
            settings,
        })
    }
}

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::from_env()?;

    let env_filter = if settings.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .without_time()
        .init();

    let state = AppState::new(settings)?;
    let app = build_router(state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], state.settings.port));
    info!(
        timezone = %state.settings.timezone,
        directory = %state.settings.directory_base_url,
        "Starting Beach Flow Agenda API on {addr}"
    );
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(LatencyUnit::Millis),
        );

    let mut router = Router::new()
        .route("/", get(root))
        .route("/healthz/live", get(healthz_live))
        .route("/healthz/ready", get(healthz_ready))
        .route("/agenda/student-classes", get(get_student_classes))
        .route("/agenda/instructor-classes", get(get_instructor_classes))
        .route("/agenda/instructor-classes.ical", get(get_instructor_ical))
        .route("/bookings/check", post(check_booking))
        .route("/courts/status", get(get_court_status))
        .route("/schedules/validate", post(validate_schedule_handler))
        .with_state(state.clone());

    if state.settings.enable_swagger {
        let openapi = ApiDoc::openapi();
        let swagger = SwaggerUi::new("/docs").url("/openapi.json", openapi);
        router = router.merge(swagger);
    }

    if let Some(origin) = state.settings.frontend_url.as_deref() {
        match HeaderValue::from_str(origin) {
            Ok(origin) => {
                let cors = CorsLayer::new()
                    .allow_origin(origin)
                    .allow_methods(Any)
                    .allow_headers(Any);
                router = router.layer(cors);
            }
            Err(err) => warn!(%err, origin, "ignoring invalid frontend_url for CORS"),
        }
    }

    router.layer(trace_layer)
}
