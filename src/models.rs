use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

/// Recurring weekly window on a court, as stored on a student profile.
///
/// Every field is read leniently: a value of the wrong JSON type is treated as
/// absent, so the slot is skipped by the calendar instead of failing the whole
/// profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WeeklySlot {
    /// 0 = Sunday .. 6 = Saturday.
    #[serde(default, deserialize_with = "lenient")]
    pub day_of_week: Option<u8>,
    #[serde(default, deserialize_with = "lenient")]
    #[schema(example = "08:00")]
    pub start: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    #[schema(example = "09:00")]
    pub end: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub court_id: Option<String>,
    #[serde(default, alias = "professorId", deserialize_with = "lenient")]
    pub instructor_id: Option<String>,
}

impl WeeklySlot {
    pub fn new(day_of_week: u8, start: &str, end: &str, court_id: &str) -> Self {
        Self {
            day_of_week: Some(day_of_week),
            start: Some(start.to_string()),
            end: Some(end.to_string()),
            court_id: Some(court_id.to_string()),
            instructor_id: None,
        }
    }

    pub fn with_instructor(mut self, instructor_id: &str) -> Self {
        self.instructor_id = Some(instructor_id.to_string());
        self
    }
}

/// User profile as served by the directory. Only students carry a schedule.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    #[serde(default, deserialize_with = "lenient")]
    pub display_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub role: Option<String>,
    #[serde(default, deserialize_with = "lenient_slots")]
    pub schedule: Vec<WeeklySlot>,
}

impl UserProfile {
    /// Display name, then email, then id.
    pub fn label(&self) -> &str {
        first_present([self.display_name.as_deref(), self.email.as_deref()]).unwrap_or(&self.id)
    }
}

/// Name lookup entry for instructors.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    pub display_name: Option<String>,
    pub email: Option<String>,
}

impl From<&UserProfile> for UserRef {
    fn from(user: &UserProfile) -> Self {
        Self {
            display_name: user.display_name.clone(),
            email: user.email.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CourtRef {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct Court {
    pub id: String,
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub maintenance: Option<bool>,
}

impl Court {
    pub fn under_maintenance(&self) -> bool {
        self.maintenance.unwrap_or(false)
    }
}

/// One-off court rental as stored by the booking service.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    #[serde(default)]
    pub id: String,
    #[serde(default, deserialize_with = "lenient")]
    pub court_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    #[schema(value_type = Option<String>, format = "date-time")]
    pub start: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient")]
    #[schema(value_type = Option<String>, format = "date-time")]
    pub end: Option<DateTime<Utc>>,
}

impl Booking {
    /// Whether this rental holds `court_id` at `at` (both ends inclusive).
    pub fn covers(&self, court_id: &str, at: DateTime<Utc>) -> bool {
        match (self.court_id.as_deref(), self.start, self.end) {
            (Some(id), Some(start), Some(end)) => id == court_id && start <= at && at <= end,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CourtState {
    Available,
    InClass,
    Rented,
    Maintenance,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct CourtStatus {
    pub id: String,
    pub name: Option<String>,
    pub status: CourtState,
}

/// One-off reservation checked against the recurring class slots.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub court_id: String,
    #[schema(value_type = String, format = "date-time", example = "2025-01-06T08:30:00Z")]
    pub start: DateTime<Utc>,
    #[schema(value_type = String, format = "date-time", example = "2025-01-06T08:45:00Z")]
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentRef {
    pub id: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentClassEvent {
    pub id: String,
    pub title: String,
    #[schema(value_type = String, format = "date-time")]
    pub start: DateTime<Utc>,
    #[schema(value_type = String, format = "date-time")]
    pub end: DateTime<Utc>,
    pub court_id: String,
    pub user_id: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InstructorClassEvent {
    pub id: String,
    pub title: String,
    #[schema(value_type = String, format = "date-time")]
    pub start: DateTime<Utc>,
    #[schema(value_type = String, format = "date-time")]
    pub end: DateTime<Utc>,
    pub court_id: String,
    pub court_name: String,
    #[serde(rename = "professorId")]
    pub instructor_id: Option<String>,
    #[serde(rename = "professorName")]
    pub instructor_name: String,
    pub students: Vec<StudentRef>,
}

/// Calendar occurrence derived from weekly slots. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MaterializedEvent {
    StudentClass(StudentClassEvent),
    #[serde(rename = "professor_class")]
    InstructorClass(InstructorClassEvent),
}

impl MaterializedEvent {
    pub fn id(&self) -> &str {
        match self {
            MaterializedEvent::StudentClass(event) => &event.id,
            MaterializedEvent::InstructorClass(event) => &event.id,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            MaterializedEvent::StudentClass(event) => &event.title,
            MaterializedEvent::InstructorClass(event) => &event.title,
        }
    }

    pub fn start(&self) -> DateTime<Utc> {
        match self {
            MaterializedEvent::StudentClass(event) => event.start,
            MaterializedEvent::InstructorClass(event) => event.start,
        }
    }

    pub fn end(&self) -> DateTime<Utc> {
        match self {
            MaterializedEvent::StudentClass(event) => event.end,
            MaterializedEvent::InstructorClass(event) => event.end,
        }
    }

    pub fn court_id(&self) -> &str {
        match self {
            MaterializedEvent::StudentClass(event) => &event.court_id,
            MaterializedEvent::InstructorClass(event) => &event.court_id,
        }
    }
}

/// First non-blank candidate.
pub(crate) fn first_present<'a, const N: usize>(candidates: [Option<&'a str>; N]) -> Option<&'a str> {
    candidates
        .into_iter()
        .flatten()
        .find(|value| !value.trim().is_empty())
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

fn lenient_slots<'de, D>(deserializer: D) -> Result<Vec<WeeklySlot>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let serde_json::Value::Array(items) = value else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_slot_accepts_professor_alias() {
        let slot: WeeklySlot = serde_json::from_value(json!({
            "dayOfWeek": 1,
            "start": "08:00",
            "end": "09:00",
            "courtId": "c1",
            "professorId": "p1"
        }))
        .unwrap();
        assert_eq!(slot, WeeklySlot::new(1, "08:00", "09:00", "c1").with_instructor("p1"));
    }

    #[test]
    fn test_slot_wrong_types_become_absent() {
        let slot: WeeklySlot = serde_json::from_value(json!({
            "dayOfWeek": "monday",
            "start": 800,
            "end": "09:00",
            "courtId": "c1"
        }))
        .unwrap();
        assert_eq!(slot.day_of_week, None);
        assert_eq!(slot.start, None);
        assert_eq!(slot.end.as_deref(), Some("09:00"));
    }

    #[test]
    fn test_profile_skips_malformed_slots() {
        let user: UserProfile = serde_json::from_value(json!({
            "id": "u1",
            "displayName": "Ana",
            "role": "student",
            "schedule": [
                "not a slot",
                { "dayOfWeek": 2, "start": "10:00", "end": "11:00", "courtId": "c2" }
            ]
        }))
        .unwrap();
        assert_eq!(user.schedule.len(), 1);
        assert_eq!(user.schedule[0].court_id.as_deref(), Some("c2"));

        let no_schedule: UserProfile =
            serde_json::from_value(json!({ "id": "u2", "schedule": "weekly" })).unwrap();
        assert!(no_schedule.schedule.is_empty());
    }

    #[test]
    fn test_profile_label_fallbacks() {
        let mut user = UserProfile {
            id: "u1".into(),
            display_name: Some("  ".into()),
            email: Some("ana@example.com".into()),
            ..Default::default()
        };
        assert_eq!(user.label(), "ana@example.com");
        user.email = None;
        assert_eq!(user.label(), "u1");
    }

    #[test]
    fn test_court_maintenance_is_lenient() {
        let courts: Vec<Court> = serde_json::from_value(json!([
            { "id": "c1", "name": "Arena 1", "maintenance": null },
            { "id": "c2", "maintenance": "yes" },
            { "id": "c3", "maintenance": true },
            { "id": "c4" }
        ]))
        .unwrap();
        let flags: Vec<_> = courts.iter().map(Court::under_maintenance).collect();
        assert_eq!(flags, vec![false, false, true, false]);
    }

    #[test]
    fn test_booking_covers() {
        let booking: Booking = serde_json::from_value(json!({
            "id": "b1",
            "courtId": "c1",
            "start": "2025-01-06T08:00:00Z",
            "end": "2025-01-06T09:00:00Z"
        }))
        .unwrap();
        let at = |h, m| Utc.with_ymd_and_hms(2025, 1, 6, h, m, 0).unwrap();
        assert!(booking.covers("c1", at(8, 0)));
        assert!(booking.covers("c1", at(9, 0)));
        assert!(!booking.covers("c1", at(9, 1)));
        assert!(!booking.covers("c2", at(8, 30)));

        let malformed: Booking =
            serde_json::from_value(json!({ "id": "b2", "courtId": "c1", "start": { "seconds": 1 } })).unwrap();
        assert!(!malformed.covers("c1", at(8, 30)));
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let start = Utc.with_ymd_and_hms(2025, 1, 6, 8, 0, 0).unwrap();
        let event = MaterializedEvent::InstructorClass(InstructorClassEvent {
            id: "instructor-p1-c1-1-08:00-09:00-0".into(),
            title: "Rita: 08:00 - 09:00".into(),
            start,
            end: start + chrono::Duration::hours(1),
            court_id: "c1".into(),
            court_name: "Arena 1".into(),
            instructor_id: Some("p1".into()),
            instructor_name: "Rita".into(),
            students: vec![StudentRef {
                id: "s1".into(),
                display_name: "Ana".into(),
            }],
        });
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "professor_class");
        assert_eq!(value["courtName"], "Arena 1");
        assert_eq!(value["professorId"], "p1");
        assert_eq!(value["professorName"], "Rita");
        assert_eq!(value["start"], "2025-01-06T08:00:00Z");
        assert_eq!(value["students"][0]["displayName"], "Ana");
    }
}
