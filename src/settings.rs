use chrono_tz::Tz;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("unknown time zone: {0}")]
    UnknownTimezone(String),
}

/// Display strings used when building calendar events.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CalendarLabels {
    pub class_prefix: String,
    pub instructor_placeholder: String,
    pub court_placeholder: String,
    pub calendar_name: String,
}

impl Default for CalendarLabels {
    fn default() -> Self {
        Self {
            class_prefix: "Class".to_string(),
            instructor_placeholder: "Instructor".to_string(),
            court_placeholder: "Court".to_string(),
            calendar_name: "Beach Flow Agenda".to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Settings {
    pub directory_base_url: Url,
    pub debug: bool,
    pub auth_token: String,
    pub enable_swagger: bool,
    pub port: u16,
    pub frontend_url: Option<String>,
    /// IANA name of the facility time zone; weekdays and "HH:mm" are read in it.
    pub timezone: String,
    pub max_range_days: u32,
    pub student_role: String,
    #[serde(default)]
    pub labels: CalendarLabels,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        let labels = CalendarLabels::default();

        let config = Config::builder()
            .set_default("directory_base_url", "http://localhost:4000")?
            .set_default("debug", false)?
            .set_default("auth_token", "default-token-change-me")?
            .set_default("enable_swagger", true)?
            .set_default("port", 8080)?
            .set_default("frontend_url", "http://localhost:5173")?
            .set_default("timezone", "America/Sao_Paulo")?
            .set_default("max_range_days", 62)?
            .set_default("student_role", "student")?
            .set_default("labels.class_prefix", labels.class_prefix)?
            .set_default("labels.instructor_placeholder", labels.instructor_placeholder)?
            .set_default("labels.court_placeholder", labels.court_placeholder)?
            .set_default("labels.calendar_name", labels.calendar_name)?
            .add_source(File::with_name("beach-flow").required(false))
            // APP_PORT, APP_LABELS__COURT_PLACEHOLDER, ...
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        config.try_deserialize()
    }

    pub fn tz(&self) -> Result<Tz, SettingsError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| SettingsError::UnknownTimezone(self.timezone.clone()))
    }
}
