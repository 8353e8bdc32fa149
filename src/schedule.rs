//! Recurring class calendar.
//!
//! Students carry weekly slots (`dayOfWeek`, `"HH:mm"` start/end, court and
//! optional instructor). This module answers three questions over a snapshot
//! of those schedules: does a one-off booking collide with a class, is a court
//! in class at a given instant, and which concrete class occurrences fall in a
//! date range. Weekdays and minutes-of-day are read in the facility time zone.
//!
//! Nothing here fails: malformed slots and occurrences are skipped.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use tracing::debug;

use crate::models::{
    CourtRef, InstructorClassEvent, MaterializedEvent, StudentClassEvent, StudentRef, UserProfile,
    UserRef, WeeklySlot, first_present,
};
use crate::settings::CalendarLabels;

pub const MINUTES_PER_DAY: i32 = 24 * 60;

const DEFAULT_TIME: &str = "00:00";

/// Lenient `"H:mm"` / `"HH:mm"` parser. Missing or non-numeric parts count as 0.
pub fn time_to_minutes(value: &str) -> i32 {
    let mut parts = value.trim().split(':');
    let hours = parts.next().map(time_component).unwrap_or(0);
    let minutes = parts.next().map(time_component).unwrap_or(0);
    hours.saturating_mul(60).saturating_add(minutes)
}

fn time_component(raw: &str) -> i32 {
    raw.trim().parse().unwrap_or(0)
}

/// Half-open overlap of `[s1, e1)` and `[s2, e2)`.
pub fn times_overlap(s1: i32, e1: i32, s2: i32, e2: i32) -> bool {
    s1 < e2 && e1 > s2
}

pub fn minute_of_day<T: Timelike>(time: &T) -> i32 {
    (time.hour() * 60 + time.minute()) as i32
}

/// 0 = Sunday.
pub fn weekday_index<T: Datelike>(date: &T) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

/// A weekly slot that passed the expansion checks.
struct SlotWindow<'a> {
    day: u8,
    court_id: &'a str,
    instructor_id: Option<&'a str>,
    start_label: &'a str,
    end_label: &'a str,
    start_min: i32,
    end_min: i32,
}

impl<'a> SlotWindow<'a> {
    fn from_slot(slot: &'a WeeklySlot) -> Option<Self> {
        let court_id = slot.court_id.as_deref().filter(|id| !id.is_empty())?;
        let day = slot.day_of_week?;
        let start_label = first_present([slot.start.as_deref()]).unwrap_or(DEFAULT_TIME);
        let end_label = first_present([slot.end.as_deref()]).unwrap_or(DEFAULT_TIME);
        let start_min = time_to_minutes(start_label);
        let end_min = time_to_minutes(end_label);
        if end_min <= start_min {
            return None;
        }
        Some(Self {
            day,
            court_id,
            instructor_id: slot.instructor_id.as_deref().filter(|id| !id.is_empty()),
            start_label,
            end_label,
            start_min,
            end_min,
        })
    }
}

/// Slots grouped by (instructor, court, weekday, start, end).
struct SlotGroup<'a> {
    window: SlotWindow<'a>,
    students: Vec<StudentRef>,
}

type GroupKey<'a> = (Option<&'a str>, &'a str, u8, &'a str, &'a str);

#[derive(Clone, Debug)]
pub struct ClassCalendar {
    tz: Tz,
    labels: CalendarLabels,
}

impl ClassCalendar {
    pub fn new(tz: Tz, labels: CalendarLabels) -> Self {
        Self { tz, labels }
    }

    pub fn timezone(&self) -> &Tz {
        &self.tz
    }

    pub fn labels(&self) -> &CalendarLabels {
        &self.labels
    }

    /// Whether a booking on `court_id` over `[start, end)` collides with any
    /// student class on the weekday of `start`.
    ///
    /// Only the start day is checked; an end on a later day is clamped to 24:00.
    pub fn rental_conflicts(
        &self,
        court_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        students: &[UserProfile],
    ) -> bool {
        let start_local = start.with_timezone(&self.tz);
        let end_local = end.with_timezone(&self.tz);
        let day = weekday_index(&start_local);
        let start_min = minute_of_day(&start_local);
        let end_min = if end_local.date_naive() > start_local.date_naive() {
            MINUTES_PER_DAY
        } else {
            minute_of_day(&end_local)
        };

        slots_on(students, court_id, day).any(|slot| {
            times_overlap(
                start_min,
                end_min,
                time_to_minutes(slot.start.as_deref().unwrap_or_default()),
                time_to_minutes(slot.end.as_deref().unwrap_or_default()),
            )
        })
    }

    /// Whether `court_id` is inside a class slot at `at` (start inclusive, end exclusive).
    pub fn is_court_in_class_at(&self, court_id: &str, at: DateTime<Utc>, students: &[UserProfile]) -> bool {
        let local = at.with_timezone(&self.tz);
        let day = weekday_index(&local);
        let t = minute_of_day(&local);

        slots_on(students, court_id, day).any(|slot| {
            let (Some(start), Some(end)) = (
                first_present([slot.start.as_deref()]),
                first_present([slot.end.as_deref()]),
            ) else {
                return false;
            };
            time_to_minutes(start) <= t && t < time_to_minutes(end)
        })
    }

    /// One event per student slot occurrence in `[from, to)`. Unordered.
    pub fn expand_student_classes(
        &self,
        students: &[UserProfile],
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Vec<MaterializedEvent> {
        let days = self.days_between(from, to);
        let mut events = Vec::new();

        for student in students {
            let name = student.label();
            for window in student.schedule.iter().filter_map(SlotWindow::from_slot) {
                for (start, end) in self.occurrences(&days, &window, from, to) {
                    events.push(MaterializedEvent::StudentClass(StudentClassEvent {
                        id: format!(
                            "student-{}-{}-{}-{}-{}",
                            student.id,
                            window.day,
                            window.start_label,
                            window.end_label,
                            start.timestamp_millis()
                        ),
                        title: format!("{} - {}", self.labels.class_prefix, name),
                        start,
                        end,
                        court_id: window.court_id.to_string(),
                        user_id: student.id.clone(),
                        display_name: name.to_string(),
                    }));
                }
            }
        }

        debug!(count = events.len(), %from, %to, "expanded student classes");
        events
    }

    /// One event per (instructor, court, weekday, time range) occurrence in
    /// `[from, to)`, listing every student booked into that slot. Unordered.
    pub fn expand_by_instructor(
        &self,
        students: &[UserProfile],
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        users_by_id: &HashMap<String, UserRef>,
        courts_by_id: &HashMap<String, CourtRef>,
    ) -> Vec<MaterializedEvent> {
        let groups = group_slots(students);
        let days = self.days_between(from, to);
        let mut events = Vec::new();

        for group in groups.iter().filter(|g| !g.students.is_empty()) {
            let window = &group.window;
            let instructor_name = self.instructor_name(window.instructor_id, users_by_id);
            let court_name = courts_by_id
                .get(window.court_id)
                .and_then(|court| first_present([court.name.as_deref()]))
                .unwrap_or(self.labels.court_placeholder.as_str());
            let title = format!("{instructor_name}: {} - {}", window.start_label, window.end_label);

            for (start, end) in self.occurrences(&days, window, from, to) {
                events.push(MaterializedEvent::InstructorClass(InstructorClassEvent {
                    id: format!(
                        "instructor-{}-{}-{}-{}-{}-{}",
                        window.instructor_id.unwrap_or("none"),
                        window.court_id,
                        window.day,
                        window.start_label,
                        window.end_label,
                        start.timestamp_millis()
                    ),
                    title: title.clone(),
                    start,
                    end,
                    court_id: window.court_id.to_string(),
                    court_name: court_name.to_string(),
                    instructor_id: window.instructor_id.map(str::to_string),
                    instructor_name: instructor_name.to_string(),
                    students: group.students.clone(),
                }));
            }
        }

        debug!(groups = groups.len(), count = events.len(), %from, %to, "expanded instructor classes");
        events
    }

    fn instructor_name<'a>(&'a self, instructor_id: Option<&str>, users_by_id: &'a HashMap<String, UserRef>) -> &'a str {
        instructor_id
            .and_then(|id| users_by_id.get(id))
            .and_then(|user| first_present([user.display_name.as_deref(), user.email.as_deref()]))
            .unwrap_or(self.labels.instructor_placeholder.as_str())
    }

    /// Calendar days from the one containing `from` while their midnight is <= `to`.
    fn days_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<NaiveDate> {
        let first = from.with_timezone(&self.tz).date_naive();
        first
            .iter_days()
            .take_while(|day| {
                self.resolve(day.and_time(NaiveTime::MIN))
                    .is_some_and(|midnight| midnight <= to)
            })
            .collect()
    }

    fn occurrences<'d>(
        &'d self,
        days: &'d [NaiveDate],
        window: &'d SlotWindow<'_>,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> impl Iterator<Item = (DateTime<Utc>, DateTime<Utc>)> + 'd {
        days.iter()
            .filter(move |day| weekday_index(*day) == window.day)
            .filter_map(move |day| {
                let midnight = day.and_time(NaiveTime::MIN);
                let start = midnight.checked_add_signed(Duration::minutes(window.start_min.into()))?;
                let end = midnight.checked_add_signed(Duration::minutes(window.end_min.into()))?;
                let (start, end) = (self.resolve(start)?, self.resolve(end)?);
                (end > from && start < to).then_some((start, end))
            })
    }

    /// Local wall time to an instant. Times skipped by a DST jump move forward an hour;
    /// `None` past the end of the calendar.
    fn resolve(&self, local: NaiveDateTime) -> Option<DateTime<Utc>> {
        self.tz
            .from_local_datetime(&local)
            .earliest()
            .or_else(|| {
                let shifted = local.checked_add_signed(Duration::hours(1))?;
                self.tz.from_local_datetime(&shifted).earliest()
            })
            .map(|instant| instant.with_timezone(&Utc))
    }
}

fn slots_on<'a>(students: &'a [UserProfile], court_id: &'a str, day: u8) -> impl Iterator<Item = &'a WeeklySlot> {
    students
        .iter()
        .flat_map(|student| student.schedule.iter())
        .filter(move |slot| slot.court_id.as_deref() == Some(court_id) && slot.day_of_week == Some(day))
}

fn group_slots(students: &[UserProfile]) -> Vec<SlotGroup<'_>> {
    let mut index: HashMap<GroupKey<'_>, usize> = HashMap::new();
    let mut groups: Vec<SlotGroup<'_>> = Vec::new();

    for student in students {
        for window in student.schedule.iter().filter_map(SlotWindow::from_slot) {
            let key = (
                window.instructor_id,
                window.court_id,
                window.day,
                window.start_label,
                window.end_label,
            );
            let position = *index.entry(key).or_insert_with(|| {
                groups.push(SlotGroup {
                    window,
                    students: Vec::new(),
                });
                groups.len() - 1
            });
            let group = &mut groups[position];
            if !group.students.iter().any(|s| s.id == student.id) {
                group.students.push(StudentRef {
                    id: student.id.clone(),
                    display_name: student.label().to_string(),
                });
            }
        }
    }

    groups
}
