use icalendar::{Calendar, Component, Event, EventLike};

use crate::models::MaterializedEvent;

#[derive(Clone, Default)]
pub struct ICalExporter;

impl ICalExporter {
    pub fn new() -> Self {
        Self
    }

    pub fn generate(&self, calendar_name: &str, events: &[MaterializedEvent]) -> Vec<u8> {
        if events.is_empty() {
            return Vec::new();
        }

        let mut calendar = Calendar::new();
        calendar.name(calendar_name);

        for item in events {
            let mut event = Event::new();
            event.summary(item.title());
            event.starts(item.start());
            event.ends(item.end());
            match item {
                MaterializedEvent::StudentClass(class) => {
                    event.location(&class.court_id);
                    event.description(&format!("Student: {}", class.display_name));
                }
                MaterializedEvent::InstructorClass(class) => {
                    let students = class
                        .students
                        .iter()
                        .map(|s| s.display_name.as_str())
                        .collect::<Vec<_>>()
                        .join(", ");
                    event.location(&class.court_name);
                    event.description(&format!(
                        "Instructor: {}\nStudents: {}",
                        class.instructor_name, students
                    ));
                }
            }
            event.uid(&format!("{}@beach-flow-agenda", item.id()));
            calendar.push(event);
        }

        calendar.to_string().into_bytes()
    }
}
