use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};

/// Naive timestamp layout the server stores and expects.
pub const SERVER_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Render a timestamp at second precision with no offset suffix.
pub fn format_server_timestamp(ts: NaiveDateTime) -> String {
    ts.format(SERVER_FORMAT).to_string()
}

/// Parse `YYYY-MM-DD HH:MM:SS`; the ISO `T` separator is tolerated.
pub fn parse_server_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, SERVER_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S"))
        .ok()
}

/// Drop sub-second precision.
pub fn truncate_to_second(ts: NaiveDateTime) -> NaiveDateTime {
    ts.with_nanosecond(0).unwrap_or(ts)
}

/// Monday 00:00 of the week containing `now`. Sunday belongs to the week
/// that started six days earlier.
pub fn week_start(now: NaiveDateTime) -> NaiveDateTime {
    let days_from_monday = i64::from(now.weekday().num_days_from_monday());
    let monday: NaiveDate = now.date() - Duration::days(days_from_monday);
    monday.and_hms_opt(0, 0, 0).unwrap_or(now)
}

/// Hours between two instants as a fraction.
pub fn elapsed_hours(start: NaiveDateTime, end: NaiveDateTime) -> f64 {
    (end - start).num_seconds() as f64 / 3600.0
}

/// `8.5` → `"8h 30m"`.
pub fn format_duration(hours: f64) -> String {
    if !hours.is_finite() || hours <= 0.0 {
        return "0h 0m".to_string();
    }
    let total_minutes = (hours * 60.0).round() as i64;
    format!("{}h {}m", total_minutes / 60, total_minutes % 60)
}

pub fn round_hours(hours: f64) -> f64 {
    (hours * 100.0).round() / 100.0
}

/// Serde adapter for naive server timestamps.
pub mod server_timestamp {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(ts: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_server_timestamp(*ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_server_timestamp(&raw)
            .ok_or_else(|| de::Error::custom(format!("invalid timestamp: {}", raw)))
    }
}

/// Like [`server_timestamp`] but `false`/`null`/absent map to `None`.
pub mod optional_server_timestamp {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer, de};
    use serde_json::Value;

    pub fn serialize<S: Serializer>(
        ts: &Option<NaiveDateTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match ts {
            Some(ts) => serializer.serialize_str(&super::format_server_timestamp(*ts)),
            None => serializer.serialize_bool(false),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDateTime>, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Null | Value::Bool(false) => Ok(None),
            Value::String(raw) => super::parse_server_timestamp(&raw)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("invalid timestamp: {}", raw))),
            other => Err(de::Error::custom(format!("invalid timestamp: {}", other))),
        }
    }
}
