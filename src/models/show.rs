use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Show {
    pub show_id: i64,
    pub theatre_id: i64,
    pub tmdb_id: i64,
    pub show_time: NaiveDateTime,
    pub ticket_price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ShowRequest {
    #[validate(range(min = 1, message = "theatre_id is required"))]
    pub theatre_id: i64,
    #[validate(range(min = 1, message = "tmdb_id is required"))]
    pub tmdb_id: i64,
    #[serde(deserialize_with = "deserialize_show_time")]
    pub show_time: NaiveDateTime,
    #[validate(range(exclusive_min = 0.0, message = "ticket_price must be positive"))]
    pub ticket_price: f64,
}

// Admin forms send `datetime-local` values, which carry no seconds.
const SHOW_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

pub fn parse_show_time(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim().trim_end_matches('Z');
    SHOW_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

fn deserialize_show_time<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_show_time(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("show_time `{raw}` is not a date and time")))
}
