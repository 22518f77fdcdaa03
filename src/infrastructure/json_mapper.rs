// Mapper from the analysis API's snake_case JSON rows to domain types
use crate::domain::deviation::{
    AggregateMetric, DeviationMetric, DeviationRecord, OrientationDeviation, PositionDeviation,
};
use crate::domain::signal::{NanoTimestamp, Quaternion, SignalPayload, SignalPoint, SignalSeries, StreamKind};
use serde_json::Value;

fn field<'a>(row: &'a Value, key: &str) -> Option<&'a Value> {
    row.get(key).filter(|v| !v.is_null())
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Ids come as strings or numbers depending on the table
fn as_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn f64_field(row: &Value, key: &str) -> Option<f64> {
    field(row, key).and_then(as_f64)
}

/// First key that is present
fn f64_any(row: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|k| f64_field(row, k))
}

fn id_field(row: &Value, key: &str) -> Option<String> {
    field(row, key).and_then(as_id)
}

fn xyz(row: &Value, prefix: &str) -> Option<[f64; 3]> {
    Some([
        f64_field(row, &format!("{}_x", prefix))?,
        f64_field(row, &format!("{}_y", prefix))?,
        f64_field(row, &format!("{}_z", prefix))?,
    ])
}

fn quaternion(row: &Value, prefix: &str) -> Option<Quaternion> {
    Some(Quaternion::new(
        f64_field(row, &format!("{}_qx", prefix))?,
        f64_field(row, &format!("{}_qy", prefix))?,
        f64_field(row, &format!("{}_qz", prefix))?,
        f64_field(row, &format!("{}_qw", prefix))?,
    ))
}

/// One deviation row. `None` if a required column is missing.
pub fn deviation_record(row: &Value, metric: DeviationMetric) -> Option<DeviationRecord> {
    let p = metric.prefix();
    let bahn_id = id_field(row, "bahn_id")?;
    let segment_id = id_field(row, "segment_id")?;
    let points_order = f64_field(row, "points_order")? as i64;
    let distance = f64_field(row, &format!("{}_distances", p))?;

    if metric.is_orientation() {
        let record = OrientationDeviation {
            bahn_id,
            segment_id,
            points_order,
            distance,
            soll: quaternion(row, &format!("{}_soll", p))?,
            ist: quaternion(row, &format!("{}_ist", p))?,
        };
        DeviationRecord::orientation(metric, record)
    } else {
        let record = PositionDeviation {
            bahn_id,
            segment_id,
            points_order,
            distance,
            soll: xyz(row, &format!("{}_soll", p))?,
            ist: xyz(row, &format!("{}_ist", p))?,
        };
        DeviationRecord::position(metric, record)
    }
}

/// All rows of a deviation response, skipping malformed ones
pub fn deviation_records(body: &Value, metric: DeviationMetric) -> Vec<DeviationRecord> {
    let rows = body.as_array().map(Vec::as_slice).unwrap_or_default();
    let records: Vec<DeviationRecord> = rows
        .iter()
        .filter_map(|row| deviation_record(row, metric))
        .collect();

    if records.len() < rows.len() {
        tracing::warn!(
            %metric,
            skipped = rows.len() - records.len(),
            "Skipped malformed deviation rows"
        );
    }
    records
}

/// One summary row. Columns may or may not carry the metric prefix.
pub fn aggregate_metric(row: &Value, metric: DeviationMetric) -> Option<AggregateMetric> {
    let p = metric.prefix();
    let pick = |name: &str| {
        let prefixed = format!("{}_{}", p, name);
        f64_any(row, &[prefixed.as_str(), name])
    };

    Some(AggregateMetric {
        bahn_id: id_field(row, "bahn_id")?,
        segment_id: id_field(row, "segment_id")?,
        min_distance: pick("min_distance")?,
        max_distance: pick("max_distance")?,
        avg_distance: pick("avg_distance")?,
        std_distance: pick("std_deviation").or_else(|| pick("std_distance"))?,
        evaluation: field(row, "evaluation")
            .or_else(|| field(row, &format!("{}_evaluation", p)))
            .and_then(as_id),
    })
}

pub fn aggregate_metrics(body: &Value, metric: DeviationMetric) -> Vec<AggregateMetric> {
    body.as_array()
        .map(|rows| rows.iter().filter_map(|row| aggregate_metric(row, metric)).collect())
        .unwrap_or_default()
}

fn signal_payload(row: &Value, stream: StreamKind) -> Option<SignalPayload> {
    let suffixed = |name: &str, suffix: &str| {
        let full = format!("{}_{}", name, suffix);
        f64_any(row, &[full.as_str(), name])
    };

    match stream {
        StreamKind::PositionIst | StreamKind::PositionSoll => {
            let s = if stream == StreamKind::PositionIst { "ist" } else { "soll" };
            Some(SignalPayload::Position {
                x: suffixed("x", s)?,
                y: suffixed("y", s)?,
                z: suffixed("z", s)?,
            })
        }
        StreamKind::OrientationIst | StreamKind::OrientationSoll => {
            let s = if stream == StreamKind::OrientationIst { "ist" } else { "soll" };
            Some(SignalPayload::Orientation {
                quaternion: Quaternion::new(
                    suffixed("qx", s)?,
                    suffixed("qy", s)?,
                    suffixed("qz", s)?,
                    suffixed("qw", s)?,
                ),
            })
        }
        StreamKind::TwistIst => Some(SignalPayload::Magnitude {
            value: f64_any(row, &["tcp_speed_ist", "tcp_speed", "value"])?,
        }),
        StreamKind::AccelIst => Some(SignalPayload::Magnitude {
            value: f64_any(row, &["tcp_accel_ist", "tcp_accel", "value"])?,
        }),
        StreamKind::JointStates => {
            let angles: Vec<f64> = (1..=6).map_while(|i| f64_field(row, &format!("joint_{}", i))).collect();
            (!angles.is_empty()).then_some(SignalPayload::Joints { angles })
        }
        StreamKind::Events => Some(SignalPayload::Event {
            x: f64_any(row, &["x_reached", "x"]).unwrap_or_default(),
            y: f64_any(row, &["y_reached", "y"]).unwrap_or_default(),
            z: f64_any(row, &["z_reached", "z"]).unwrap_or_default(),
        }),
    }
}

fn timestamp(row: &Value) -> Option<NanoTimestamp> {
    match field(row, "timestamp")? {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n
            .as_i64()
            .map(NanoTimestamp)
            .or_else(|| n.as_f64().map(|f| NanoTimestamp(f.round() as i64))),
        _ => None,
    }
}

/// Rows of a signal endpoint, in arrival order
pub fn signal_series(body: &Value, stream: StreamKind) -> SignalSeries {
    let rows = body.as_array().map(Vec::as_slice).unwrap_or_default();
    let points: Vec<SignalPoint> = rows
        .iter()
        .filter_map(|row| Some(SignalPoint::new(timestamp(row)?, signal_payload(row, stream)?)))
        .collect();

    if points.len() < rows.len() {
        tracing::warn!(%stream, skipped = rows.len() - points.len(), "Skipped malformed signal rows");
    }
    SignalSeries::new(stream, points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::deviation::{DeviationPoint, SegmentKeyed};
    use serde_json::json;

    #[test]
    fn test_position_deviation_row() {
        let body = json!([{
            "bahn_id": "1718000000",
            "segment_id": "1718000000_2",
            "points_order": 14,
            "ea_distances": 0.42,
            "ea_soll_x": 1.0, "ea_soll_y": 2.0, "ea_soll_z": 3.0,
            "ea_ist_x": 1.1, "ea_ist_y": 2.1, "ea_ist_z": 3.1
        }]);

        let records = deviation_records(&body, DeviationMetric::Ea);
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.metric(), DeviationMetric::Ea);
        assert_eq!(r.segment_id(), "1718000000_2");
        assert_eq!(r.points_order(), 14);
        assert_eq!(r.distance(), 0.42);
    }

    #[test]
    fn test_orientation_deviation_row_with_numeric_ids() {
        let row = json!({
            "bahn_id": 17, "segment_id": "17_1", "points_order": "3",
            "qad_distances": 2.5,
            "qad_soll_qx": 0.0, "qad_soll_qy": 0.0, "qad_soll_qz": 0.0, "qad_soll_qw": 1.0,
            "qad_ist_qx": 0.0, "qad_ist_qy": 0.0, "qad_ist_qz": 0.1, "qad_ist_qw": 0.99
        });
        let record = deviation_record(&row, DeviationMetric::Qad).unwrap();
        assert_eq!(record.bahn_id(), "17");
        assert_eq!(record.points_order(), 3);
        assert!(matches!(record, DeviationRecord::Qad(_)));
    }

    #[test]
    fn test_malformed_rows_are_skipped() {
        let body = json!([
            {"bahn_id": "1", "segment_id": "1", "points_order": 0, "dfd_distances": 1.0},
            "not a row"
        ]);
        assert!(deviation_records(&body, DeviationMetric::Dfd).is_empty());
        assert!(deviation_records(&json!({"detail": "not found"}), DeviationMetric::Dfd).is_empty());
    }

    #[test]
    fn test_aggregate_with_prefixed_columns() {
        let row = json!({
            "bahn_id": "1", "segment_id": "1",
            "sidtw_min_distance": 0.1, "sidtw_max_distance": 0.9,
            "sidtw_avg_distance": 0.4, "sidtw_std_deviation": 0.2,
            "evaluation": "acceptable"
        });
        let agg = aggregate_metric(&row, DeviationMetric::Sidtw).unwrap();
        assert_eq!(agg.max_distance, 0.9);
        assert_eq!(agg.std_distance, 0.2);
        assert_eq!(agg.evaluation.as_deref(), Some("acceptable"));
    }

    #[test]
    fn test_signal_rows() {
        let body = json!([
            {"timestamp": "1718000000000000500", "x_ist": 1.0, "y_ist": 2.0, "z_ist": 3.0},
            {"timestamp": 1718000000000000000i64, "x_ist": 1.5, "y_ist": 2.5, "z_ist": 3.5},
            {"x_ist": 0.0, "y_ist": 0.0, "z_ist": 0.0}
        ]);
        let series = signal_series(&body, StreamKind::PositionIst);
        assert_eq!(series.points.len(), 2);
        assert_eq!(series.points[0].timestamp, NanoTimestamp(1_718_000_000_000_000_500));
        assert_eq!(
            series.points[1].payload,
            SignalPayload::Position { x: 1.5, y: 2.5, z: 3.5 }
        );
    }

    #[test]
    fn test_joint_and_event_rows() {
        let joints = json!([{"timestamp": "1", "joint_1": 0.1, "joint_2": 0.2, "joint_3": 0.3}]);
        let series = signal_series(&joints, StreamKind::JointStates);
        assert_eq!(series.points[0].payload, SignalPayload::Joints { angles: vec![0.1, 0.2, 0.3] });

        let events = json!([{"timestamp": "5"}, {"timestamp": "9", "x_reached": 4.0}]);
        assert_eq!(signal_series(&events, StreamKind::Events).points.len(), 2);
    }
}
