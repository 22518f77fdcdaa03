// Trajectory-level timing information
use crate::domain::signal::NanoTimestamp;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Recording start/end of a trajectory, as reported by the info endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryTimes {
    #[serde(default, alias = "startTime", deserialize_with = "deserialize_iso")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, alias = "endTime", deserialize_with = "deserialize_iso")]
    pub end_time: Option<DateTime<Utc>>,
}

impl TrajectoryTimes {
    pub fn new(start_time: Option<DateTime<Utc>>, end_time: Option<DateTime<Utc>>) -> Self {
        Self {
            start_time,
            end_time,
        }
    }

    /// Milliseconds between start and end, if both are known
    pub fn duration_ms(&self) -> Option<i64> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds()),
            _ => None,
        }
    }
}

/// Parse an ISO-8601 date. Strings without an offset are taken as UTC.
pub fn parse_iso_datetime(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn deserialize_iso<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_iso_datetime))
}

/// Inclusive range of raw timestamps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: NanoTimestamp,
    pub end: NanoTimestamp,
}

impl TimeWindow {
    pub fn new(start: NanoTimestamp, end: NanoTimestamp) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, ts: NanoTimestamp) -> bool {
        self.start <= ts && ts <= self.end
    }
}
