use utoipa::openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::handlers::ScheduleValidationRequest;
use crate::models::{
    Booking, BookingRequest, Court, CourtState, CourtStatus, InstructorClassEvent, MaterializedEvent,
    StudentClassEvent, StudentRef, UserProfile, WeeklySlot,
};

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
        );
        components.add_security_scheme(
            "query_token",
            SecurityScheme::ApiKey(ApiKey::Query(ApiKeyValue::new("token"))),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::healthz_live,
        crate::handlers::healthz_ready,
        crate::handlers::get_student_classes,
        crate::handlers::get_instructor_classes,
        crate::handlers::get_instructor_ical,
        crate::handlers::check_booking,
        crate::handlers::get_court_status,
        crate::handlers::validate_schedule_handler
    ),
    components(schemas(
        MaterializedEvent,
        StudentClassEvent,
        InstructorClassEvent,
        StudentRef,
        Booking,
        BookingRequest,
        Court,
        CourtState,
        CourtStatus,
        UserProfile,
        WeeklySlot,
        ScheduleValidationRequest
    )),
    tags(
        (name = "agenda", description = "Recurring class calendar"),
        (name = "bookings", description = "Booking checks against class slots"),
        (name = "courts", description = "Court status"),
        (name = "schedules", description = "Weekly schedule validation")
    ),
    modifiers(&SecurityAddon),
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_routes_and_schemes() {
        let doc = ApiDoc::openapi();
        for path in [
            "/agenda/student-classes",
            "/agenda/instructor-classes",
            "/agenda/instructor-classes.ical",
            "/bookings/check",
            "/courts/status",
            "/schedules/validate",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
        let components = doc.components.unwrap();
        assert!(components.security_schemes.contains_key("bearer_auth"));
        assert!(components.schemas.contains_key("MaterializedEvent"));
    }
}
