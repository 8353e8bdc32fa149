use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

use chrono::{DateTime, Utc};

use crate::models::{Booking, Court, CourtRef, UserProfile, UserRef};

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Invalid directory URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Read-only client for the profile and court store.
#[derive(Clone)]
pub struct DirectoryClient {
    client: reqwest::Client,
    base_url: Arc<Url>,
}

/// Users, courts and rentals fetched for a single request.
#[derive(Debug, Clone, Default)]
pub struct DirectorySnapshot {
    pub users: Vec<UserProfile>,
    pub courts: Vec<Court>,
    pub bookings: Vec<Booking>,
}

impl DirectoryClient {
    pub fn new(base_url: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: Arc::new(base_url),
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, DirectoryError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }

    async fn fetch_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, DirectoryError> {
        let url = self.endpoint(path)?;
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.json::<T>().await?)
    }

    pub async fn fetch_users(&self) -> Result<Vec<UserProfile>, DirectoryError> {
        self.fetch_json("users").await
    }

    pub async fn fetch_courts(&self) -> Result<Vec<Court>, DirectoryError> {
        self.fetch_json("courts").await
    }

    pub async fn fetch_bookings(&self) -> Result<Vec<Booking>, DirectoryError> {
        self.fetch_json("bookings").await
    }

    pub async fn fetch_students(&self, role: &str) -> Result<Vec<UserProfile>, DirectoryError> {
        let users = self.fetch_users().await?;
        Ok(students_with_schedule(&users, role))
    }

    pub async fn fetch_snapshot(&self) -> Result<DirectorySnapshot, DirectoryError> {
        let (users, courts, bookings) =
            futures::try_join!(self.fetch_users(), self.fetch_courts(), self.fetch_bookings())?;
        tracing::debug!(
            users = users.len(),
            courts = courts.len(),
            bookings = bookings.len(),
            "fetched directory snapshot"
        );
        Ok(DirectorySnapshot { users, courts, bookings })
    }
}

impl DirectorySnapshot {
    pub fn students_with_schedule(&self, role: &str) -> Vec<UserProfile> {
        students_with_schedule(&self.users, role)
    }

    pub fn users_by_id(&self) -> HashMap<String, UserRef> {
        self.users
            .iter()
            .map(|user| (user.id.clone(), UserRef::from(user)))
            .collect()
    }

    pub fn is_rented_at(&self, court_id: &str, at: DateTime<Utc>) -> bool {
        self.bookings.iter().any(|booking| booking.covers(court_id, at))
    }

    pub fn courts_by_id(&self) -> HashMap<String, CourtRef> {
        self.courts
            .iter()
            .map(|court| {
                (
                    court.id.clone(),
                    CourtRef {
                        name: court.name.clone(),
                    },
                )
            })
            .collect()
    }
}

/// Users with the given role and at least one slot.
pub fn students_with_schedule(users: &[UserProfile], role: &str) -> Vec<UserProfile> {
    users
        .iter()
        .filter(|user| user.role.as_deref() == Some(role) && !user.schedule.is_empty())
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use crate::models::WeeklySlot;

    use super::*;

    fn snapshot() -> DirectorySnapshot {
        DirectorySnapshot {
            users: vec![
                UserProfile {
                    id: "s1".into(),
                    display_name: Some("Ana".into()),
                    role: Some("student".into()),
                    schedule: vec![WeeklySlot::new(1, "08:00", "09:00", "c1")],
                    ..Default::default()
                },
                UserProfile {
                    id: "s2".into(),
                    role: Some("student".into()),
                    ..Default::default()
                },
                UserProfile {
                    id: "p1".into(),
                    display_name: Some("Rita".into()),
                    email: Some("rita@example.com".into()),
                    role: Some("instructor".into()),
                    schedule: vec![WeeklySlot::new(2, "08:00", "09:00", "c1")],
                },
            ],
            courts: vec![Court {
                id: "c1".into(),
                name: Some("Arena 1".into()),
                maintenance: None,
            }],
            bookings: vec![Booking {
                id: "b1".into(),
                court_id: Some("c1".into()),
                start: Some(Utc.with_ymd_and_hms(2025, 1, 6, 18, 0, 0).unwrap()),
                end: Some(Utc.with_ymd_and_hms(2025, 1, 6, 19, 0, 0).unwrap()),
            }],
        }
    }

    #[test]
    fn test_students_with_schedule_filters_role_and_empty() {
        let students = snapshot().students_with_schedule("student");
        let ids: Vec<_> = students.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, vec!["s1"]);
    }

    #[test]
    fn test_lookups() {
        let snapshot = snapshot();
        let users = snapshot.users_by_id();
        assert_eq!(users.len(), 3);
        assert_eq!(users["p1"].email.as_deref(), Some("rita@example.com"));
        assert_eq!(snapshot.courts_by_id()["c1"].name.as_deref(), Some("Arena 1"));
    }

    #[test]
    fn test_is_rented_at() {
        let snapshot = snapshot();
        assert!(snapshot.is_rented_at("c1", Utc.with_ymd_and_hms(2025, 1, 6, 18, 30, 0).unwrap()));
        assert!(!snapshot.is_rented_at("c1", Utc.with_ymd_and_hms(2025, 1, 6, 19, 30, 0).unwrap()));
        assert!(!snapshot.is_rented_at("c2", Utc.with_ymd_and_hms(2025, 1, 6, 18, 30, 0).unwrap()));
    }

    #[test]
    fn test_endpoint_joins_paths() {
        let client = DirectoryClient::new(Url::parse("http://store.local/api/").unwrap());
        assert_eq!(
            client.endpoint("users").unwrap().as_str(),
            "http://store.local/api/users"
        );
    }
}
