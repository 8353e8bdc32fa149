use std::ops::RangeInclusive;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::error::ApiError;
use crate::models::BookingRequest;
use crate::schedule::time_to_minutes;

static TIME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-1]?[0-9]|2[0-3]):[0-5][0-9]$").expect("regex compiles"));

const YEARS: RangeInclusive<i32> = 1900..=9999;

/// Parses an ISO-8601 instant. Values without an offset are read in `tz`;
/// `None` yields `default`.
pub fn parse_instant(raw: Option<&str>, tz: &Tz, default: DateTime<Utc>) -> Result<DateTime<Utc>, ApiError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(default);
    };

    let instant = match DateTime::parse_from_rfc3339(raw) {
        Ok(instant) => instant.with_timezone(&Utc),
        Err(_) => parse_local(raw, tz)?,
    };
    if !YEARS.contains(&instant.year()) {
        return Err(ApiError::BadRequest(format!("date out of range: {raw}")));
    }
    Ok(instant)
}

fn parse_local(raw: &str, tz: &Tz) -> Result<DateTime<Utc>, ApiError> {
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M"))
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d").map(|d| d.and_time(NaiveTime::MIN)))
        .map_err(|_| ApiError::BadRequest(format!("invalid ISO-8601 date: {raw}")))?;

    tz.from_local_datetime(&naive)
        .earliest()
        .map(|instant| instant.with_timezone(&Utc))
        .ok_or_else(|| ApiError::BadRequest(format!("nonexistent local time: {raw}")))
}

pub fn validate_range(from: DateTime<Utc>, to: DateTime<Utc>, max_days: u32) -> Result<(), ApiError> {
    if from > to {
        return Err(ApiError::BadRequest("from must not be after to".into()));
    }
    if to - from > Duration::days(max_days.into()) {
        return Err(ApiError::BadRequest(format!(
            "range must not exceed {max_days} days"
        )));
    }
    Ok(())
}

pub fn validate_booking(request: &BookingRequest) -> Result<(), ApiError> {
    if request.court_id.trim().is_empty() {
        return Err(ApiError::BadRequest("courtId is required".into()));
    }
    if request.end <= request.start {
        return Err(ApiError::BadRequest("end must be after start".into()));
    }
    Ok(())
}

/// Strict check applied before a schedule is stored. Returns the slot count.
pub fn validate_schedule(schedule: &Value) -> Result<usize, ApiError> {
    let Value::Array(slots) = schedule else {
        return Err(ApiError::BadRequest("schedule must be an array".into()));
    };

    for (i, slot) in slots.iter().enumerate() {
        validate_slot(slot).map_err(|reason| ApiError::BadRequest(format!("slot {}: {reason}", i + 1)))?;
    }
    Ok(slots.len())
}

fn validate_slot(slot: &Value) -> Result<(), &'static str> {
    let Value::Object(fields) = slot else {
        return Err("invalid object");
    };

    match fields.get("dayOfWeek").and_then(Value::as_u64) {
        Some(day) if day <= 6 => {}
        _ => return Err("dayOfWeek must be 0-6"),
    }

    let start = fields
        .get("start")
        .and_then(Value::as_str)
        .filter(|s| TIME_REGEX.is_match(s))
        .ok_or("start must be HH:mm")?;
    let end = fields
        .get("end")
        .and_then(Value::as_str)
        .filter(|s| TIME_REGEX.is_match(s))
        .ok_or("end must be HH:mm")?;

    match fields.get("courtId").and_then(Value::as_str) {
        Some(id) if !id.is_empty() => {}
        _ => return Err("courtId is required"),
    }

    if time_to_minutes(end) <= time_to_minutes(start) {
        return Err("end must be after start");
    }
    Ok(())
}
