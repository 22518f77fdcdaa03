// Deviation metric rows produced by the analysis backend
use crate::domain::signal::Quaternion;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Metric families computed by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviationMetric {
    Ea,
    Dfd,
    Sidtw,
    Dtw,
    Qad,
    Qdtw,
}

impl DeviationMetric {
    pub const ALL: [DeviationMetric; 6] = [
        DeviationMetric::Ea,
        DeviationMetric::Dfd,
        DeviationMetric::Sidtw,
        DeviationMetric::Dtw,
        DeviationMetric::Qad,
        DeviationMetric::Qdtw,
    ];

    /// Key prefix used by the backend for this metric's columns
    pub fn prefix(&self) -> &'static str {
        match self {
            DeviationMetric::Ea => "ea",
            DeviationMetric::Dfd => "dfd",
            DeviationMetric::Sidtw => "sidtw",
            DeviationMetric::Dtw => "dtw",
            DeviationMetric::Qad => "qad",
            DeviationMetric::Qdtw => "qdtw",
        }
    }

    /// QAD and QDTW compare orientations, everything else positions
    pub fn is_orientation(&self) -> bool {
        matches!(self, DeviationMetric::Qad | DeviationMetric::Qdtw)
    }

    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|m| m.prefix() == name)
    }
}

impl fmt::Display for DeviationMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Access to the trajectory/segment identifiers every record carries
pub trait SegmentKeyed {
    fn bahn_id(&self) -> &str;
    fn segment_id(&self) -> &str;
}

/// Fields shared by every per-point deviation row
pub trait DeviationPoint: SegmentKeyed {
    fn points_order(&self) -> i64;
    fn distance(&self) -> f64;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionDeviation {
    pub bahn_id: String,
    pub segment_id: String,
    pub points_order: i64,
    pub distance: f64,
    pub soll: [f64; 3],
    pub ist: [f64; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrientationDeviation {
    pub bahn_id: String,
    pub segment_id: String,
    pub points_order: i64,
    pub distance: f64,
    pub soll: Quaternion,
    pub ist: Quaternion,
}

/// One point of a deviation metric, tagged by the metric that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "metric", rename_all = "lowercase")]
pub enum DeviationRecord {
    Ea(PositionDeviation),
    Dfd(PositionDeviation),
    Sidtw(PositionDeviation),
    Dtw(PositionDeviation),
    Qad(OrientationDeviation),
    Qdtw(OrientationDeviation),
}

/// Planned/measured coordinates of one deviation point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CoordinatePair {
    Position { soll: [f64; 3], ist: [f64; 3] },
    Orientation { soll: Quaternion, ist: Quaternion },
}

impl DeviationRecord {
    pub fn metric(&self) -> DeviationMetric {
        match self {
            DeviationRecord::Ea(_) => DeviationMetric::Ea,
            DeviationRecord::Dfd(_) => DeviationMetric::Dfd,
            DeviationRecord::Sidtw(_) => DeviationMetric::Sidtw,
            DeviationRecord::Dtw(_) => DeviationMetric::Dtw,
            DeviationRecord::Qad(_) => DeviationMetric::Qad,
            DeviationRecord::Qdtw(_) => DeviationMetric::Qdtw,
        }
    }

    /// Wrap a position row in the variant for `metric`
    pub fn position(metric: DeviationMetric, row: PositionDeviation) -> Option<Self> {
        match metric {
            DeviationMetric::Ea => Some(DeviationRecord::Ea(row)),
            DeviationMetric::Dfd => Some(DeviationRecord::Dfd(row)),
            DeviationMetric::Sidtw => Some(DeviationRecord::Sidtw(row)),
            DeviationMetric::Dtw => Some(DeviationRecord::Dtw(row)),
            DeviationMetric::Qad | DeviationMetric::Qdtw => None,
        }
    }

    /// Wrap an orientation row in the variant for `metric`
    pub fn orientation(metric: DeviationMetric, row: OrientationDeviation) -> Option<Self> {
        match metric {
            DeviationMetric::Qad => Some(DeviationRecord::Qad(row)),
            DeviationMetric::Qdtw => Some(DeviationRecord::Qdtw(row)),
            _ => None,
        }
    }

    pub fn coordinates(&self) -> CoordinatePair {
        match self {
            DeviationRecord::Ea(r)
            | DeviationRecord::Dfd(r)
            | DeviationRecord::Sidtw(r)
            | DeviationRecord::Dtw(r) => CoordinatePair::Position {
                soll: r.soll,
                ist: r.ist,
            },
            DeviationRecord::Qad(r) | DeviationRecord::Qdtw(r) => CoordinatePair::Orientation {
                soll: r.soll,
                ist: r.ist,
            },
        }
    }
}

impl SegmentKeyed for DeviationRecord {
    fn bahn_id(&self) -> &str {
        match self {
            DeviationRecord::Ea(r)
            | DeviationRecord::Dfd(r)
            | DeviationRecord::Sidtw(r)
            | DeviationRecord::Dtw(r) => &r.bahn_id,
            DeviationRecord::Qad(r) | DeviationRecord::Qdtw(r) => &r.bahn_id,
        }
    }

    fn segment_id(&self) -> &str {
        match self {
            DeviationRecord::Ea(r)
            | DeviationRecord::Dfd(r)
            | DeviationRecord::Sidtw(r)
            | DeviationRecord::Dtw(r) => &r.segment_id,
            DeviationRecord::Qad(r) | DeviationRecord::Qdtw(r) => &r.segment_id,
        }
    }
}

impl DeviationPoint for DeviationRecord {
    fn points_order(&self) -> i64 {
        match self {
            DeviationRecord::Ea(r)
            | DeviationRecord::Dfd(r)
            | DeviationRecord::Sidtw(r)
            | DeviationRecord::Dtw(r) => r.points_order,
            DeviationRecord::Qad(r) | DeviationRecord::Qdtw(r) => r.points_order,
        }
    }

    fn distance(&self) -> f64 {
        match self {
            DeviationRecord::Ea(r)
            | DeviationRecord::Dfd(r)
            | DeviationRecord::Sidtw(r)
            | DeviationRecord::Dtw(r) => r.distance,
            DeviationRecord::Qad(r) | DeviationRecord::Qdtw(r) => r.distance,
        }
    }
}

/// Summary of one metric over a whole trajectory or one of its segments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateMetric {
    pub bahn_id: String,
    pub segment_id: String,
    pub min_distance: f64,
    pub max_distance: f64,
    pub avg_distance: f64,
    pub std_distance: f64,
    #[serde(default)]
    pub evaluation: Option<String>,
}

impl SegmentKeyed for AggregateMetric {
    fn bahn_id(&self) -> &str {
        &self.bahn_id
    }

    fn segment_id(&self) -> &str {
        &self.segment_id
    }
}
