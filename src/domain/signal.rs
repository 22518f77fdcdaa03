// Sampled signal streams recorded along a trajectory
use crate::domain::error::AnalysisError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Nanosecond epoch timestamp.
///
/// The backend sends these as decimal strings because the values exceed the
/// range a JSON number can carry exactly; integers and floats are accepted too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NanoTimestamp(pub i64);

impl NanoTimestamp {
    pub fn nanos(self) -> i64 {
        self.0
    }

    /// Seconds elapsed since `origin`. Subtracts in widened integer space first,
    /// so any pair of timestamps is representable.
    pub fn seconds_since(self, origin: NanoTimestamp) -> f64 {
        (i128::from(self.0) - i128::from(origin.0)) as f64 / 1e9
    }
}

impl FromStr for NanoTimestamp {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.contains(['e', 'E']) {
            return trimmed
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(|v| NanoTimestamp(v.round() as i64))
                .ok_or_else(|| AnalysisError::InvalidTimestamp(s.to_string()));
        }

        let integer_part = trimmed.split('.').next().unwrap_or_default();
        integer_part
            .parse::<i64>()
            .map(NanoTimestamp)
            .map_err(|_| AnalysisError::InvalidTimestamp(s.to_string()))
    }
}

impl fmt::Display for NanoTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for NanoTimestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for NanoTimestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawTimestamp {
            Int(i64),
            Float(f64),
            Text(String),
        }

        match RawTimestamp::deserialize(deserializer)? {
            RawTimestamp::Int(v) => Ok(NanoTimestamp(v)),
            RawTimestamp::Float(v) => Ok(NanoTimestamp(v.round() as i64)),
            RawTimestamp::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// Anything carrying a sample timestamp
pub trait Timestamped {
    fn timestamp(&self) -> NanoTimestamp;
}

impl Timestamped for NanoTimestamp {
    fn timestamp(&self) -> NanoTimestamp {
        *self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Quaternion {
    pub fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }

    /// Roll/pitch/yaw in degrees (ZYX convention). Pitch saturates at ±90°.
    pub fn to_euler_degrees(&self) -> [f64; 3] {
        let Quaternion { x, y, z, w } = *self;

        let roll = (2.0 * (w * x + y * z)).atan2(1.0 - 2.0 * (x * x + y * y));

        let sin_pitch = 2.0 * (w * y - z * x);
        let pitch = if sin_pitch.abs() >= 1.0 {
            std::f64::consts::FRAC_PI_2.copysign(sin_pitch)
        } else {
            sin_pitch.asin()
        };

        let yaw = (2.0 * (w * z + x * y)).atan2(1.0 - 2.0 * (y * y + z * z));

        [roll.to_degrees(), pitch.to_degrees(), yaw.to_degrees()]
    }
}

/// Stream-specific content of one sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SignalPayload {
    Position { x: f64, y: f64, z: f64 },
    Orientation { quaternion: Quaternion },
    Joints { angles: Vec<f64> },
    Magnitude { value: f64 },
    Event { x: f64, y: f64, z: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalPoint {
    pub timestamp: NanoTimestamp,
    #[serde(flatten)]
    pub payload: SignalPayload,
}

impl SignalPoint {
    pub fn new(timestamp: NanoTimestamp, payload: SignalPayload) -> Self {
        Self { timestamp, payload }
    }
}

impl Timestamped for SignalPoint {
    fn timestamp(&self) -> NanoTimestamp {
        self.timestamp
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    PositionIst,
    PositionSoll,
    OrientationIst,
    OrientationSoll,
    TwistIst,
    AccelIst,
    JointStates,
    Events,
}

impl StreamKind {
    /// Measured streams whose sampling regularity is worth checking
    pub const MEASURED: [StreamKind; 5] = [
        StreamKind::PositionIst,
        StreamKind::OrientationIst,
        StreamKind::TwistIst,
        StreamKind::AccelIst,
        StreamKind::JointStates,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StreamKind::PositionIst => "position_ist",
            StreamKind::PositionSoll => "position_soll",
            StreamKind::OrientationIst => "orientation_ist",
            StreamKind::OrientationSoll => "orientation_soll",
            StreamKind::TwistIst => "twist_ist",
            StreamKind::AccelIst => "accel_ist",
            StreamKind::JointStates => "joint_states",
            StreamKind::Events => "events",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.trim() {
            "position_ist" => Some(StreamKind::PositionIst),
            "position_soll" => Some(StreamKind::PositionSoll),
            "orientation_ist" => Some(StreamKind::OrientationIst),
            "orientation_soll" => Some(StreamKind::OrientationSoll),
            "twist_ist" => Some(StreamKind::TwistIst),
            "accel_ist" => Some(StreamKind::AccelIst),
            "joint_states" => Some(StreamKind::JointStates),
            "events" => Some(StreamKind::Events),
            _ => None,
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One stream of samples. Arrival order is not guaranteed to be time order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSeries {
    pub stream: StreamKind,
    pub points: Vec<SignalPoint>,
}

impl SignalSeries {
    pub fn new(stream: StreamKind, points: Vec<SignalPoint>) -> Self {
        Self { stream, points }
    }

    /// Stable sort by timestamp
    pub fn sort_by_timestamp(&mut self) {
        self.points.sort_by_key(|p| p.timestamp);
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nanosecond_strings() {
        let ts: NanoTimestamp = "1718000000123456789".parse().unwrap();
        assert_eq!(ts.nanos(), 1_718_000_000_123_456_789);

        let ts: NanoTimestamp = "1718000000123456789.0".parse().unwrap();
        assert_eq!(ts.nanos(), 1_718_000_000_123_456_789);

        let ts: NanoTimestamp = "5e9".parse().unwrap();
        assert_eq!(ts.nanos(), 5_000_000_000);

        assert!("not-a-time".parse::<NanoTimestamp>().is_err());
    }

    #[test]
    fn test_deserialize_timestamp_variants() {
        let from_str: NanoTimestamp = serde_json::from_str("\"1718000000123456789\"").unwrap();
        let from_int: NanoTimestamp = serde_json::from_str("1718000000123456789").unwrap();
        assert_eq!(from_str, from_int);

        let json = serde_json::to_string(&from_str).unwrap();
        assert_eq!(json, "\"1718000000123456789\"");
    }

    #[test]
    fn test_seconds_since_keeps_nanosecond_precision() {
        let origin = NanoTimestamp(1_718_000_000_000_000_000);
        let later = NanoTimestamp(1_718_000_000_000_000_001);
        assert_eq!(later.seconds_since(origin), 1e-9);
    }

    #[test]
    fn test_seconds_since_extreme_timestamps() {
        let low = NanoTimestamp(-5);
        let high = NanoTimestamp(i64::MAX);
        assert_eq!(high.seconds_since(low), (i64::MAX as f64 + 5.0) / 1e9);
        assert!(low.seconds_since(high) < 0.0);
        assert_eq!(NanoTimestamp(i64::MIN).seconds_since(high), -(u64::MAX as f64) / 1e9);
    }

    #[test]
    fn test_identity_quaternion_is_zero_euler() {
        let euler = Quaternion::new(0.0, 0.0, 0.0, 1.0).to_euler_degrees();
        assert_eq!(euler, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_yaw_rotation() {
        let half = std::f64::consts::FRAC_PI_4;
        let euler = Quaternion::new(0.0, 0.0, half.sin(), half.cos()).to_euler_degrees();
        assert!(euler[0].abs() < 1e-9);
        assert!(euler[1].abs() < 1e-9);
        assert!((euler[2] - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_sort_by_timestamp_is_stable() {
        let mut series = SignalSeries::new(
            StreamKind::TwistIst,
            vec![
                SignalPoint::new(NanoTimestamp(3), SignalPayload::Magnitude { value: 3.0 }),
                SignalPoint::new(NanoTimestamp(1), SignalPayload::Magnitude { value: 1.0 }),
                SignalPoint::new(NanoTimestamp(3), SignalPayload::Magnitude { value: 4.0 }),
            ],
        );
        series.sort_by_timestamp();
        let values: Vec<f64> = series
            .points
            .iter()
            .map(|p| match p.payload {
                SignalPayload::Magnitude { value } => value,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(values, vec![1.0, 3.0, 4.0]);
    }

    #[test]
    fn test_stream_kind_names_round_trip() {
        for kind in StreamKind::MEASURED {
            assert_eq!(StreamKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(StreamKind::parse("nonsense"), None);
    }
}
