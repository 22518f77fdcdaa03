// Segment resolver - Map a segment selector onto record filters
use crate::domain::deviation::SegmentKeyed;
use std::collections::BTreeSet;
use std::fmt;

/// Which part of a trajectory a view shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentSelector {
    /// The whole trajectory
    Total,
    /// Sub-segment `n` (1-based), stored as `{bahn_id}_{n}`
    Segment(u32),
}

impl SegmentSelector {
    /// Parse `"total"` or `"segment_{n}"`. Anything else is `None`.
    pub fn parse(selector: &str) -> Option<Self> {
        if selector == "total" {
            return Some(SegmentSelector::Total);
        }
        let number = selector.strip_prefix("segment_")?;
        if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        match number.parse::<u32>() {
            Ok(n) if n > 0 => Some(SegmentSelector::Segment(n)),
            _ => None,
        }
    }

    /// Does a record with these identifiers belong to this selector
    fn matches(&self, bahn_id: &str, segment_id: &str) -> bool {
        match self {
            SegmentSelector::Total => segment_id == bahn_id,
            SegmentSelector::Segment(n) => segment_id == segment_key(bahn_id, *n),
        }
    }
}

impl fmt::Display for SegmentSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentSelector::Total => f.write_str("total"),
            SegmentSelector::Segment(n) => write!(f, "segment_{}", n),
        }
    }
}

/// `{bahn_id}_{n}`
pub fn segment_key(bahn_id: &str, n: u32) -> String {
    format!("{}_{}", bahn_id, n)
}

/// Filter records by selector using an explicit `(bahn_id, segment_id)` accessor.
///
/// `"total"` keeps records whose segment id equals their bahn id; when no
/// record has that shape the input is returned unfiltered. `"segment_{n}"`
/// matches `{bahn_id}_{n}` built per record. Unknown selectors give nothing.
pub fn filter_by_segment_with<T, F>(records: &[T], selector: &str, accessor: F) -> Vec<T>
where
    T: Clone,
    F: Fn(&T) -> (&str, &str),
{
    let Some(parsed) = SegmentSelector::parse(selector) else {
        tracing::debug!(selector, "Unrecognised segment selector");
        return Vec::new();
    };

    let filtered: Vec<T> = records
        .iter()
        .filter(|r| {
            let (bahn_id, segment_id) = accessor(*r);
            parsed.matches(bahn_id, segment_id)
        })
        .cloned()
        .collect();

    if parsed == SegmentSelector::Total && filtered.is_empty() {
        return records.to_vec();
    }

    filtered
}

/// [`filter_by_segment_with`] for types that know their own identifiers
pub fn filter_by_segment<T: SegmentKeyed + Clone>(records: &[T], selector: &str) -> Vec<T> {
    filter_by_segment_with(records, selector, |r| (r.bahn_id(), r.segment_id()))
}

/// Sub-segment numbers present in the records, ascending
pub fn available_segments<T: SegmentKeyed>(records: &[T]) -> Vec<u32> {
    records
        .iter()
        .filter_map(|r| {
            let suffix = r.segment_id().strip_prefix(r.bahn_id())?.strip_prefix('_')?;
            match SegmentSelector::parse(&format!("segment_{}", suffix))? {
                SegmentSelector::Segment(n) => Some(n),
                SegmentSelector::Total => None,
            }
        })
        .collect::<BTreeSet<u32>>()
        .into_iter()
        .collect()
}

/// The aggregate row for a selector. Prefers an exact match, then falls back
/// to the first row for `"total"` the same way the record filter does.
pub fn select_aggregate<T: SegmentKeyed + Clone>(aggregates: &[T], selector: &str) -> Option<T> {
    filter_by_segment(aggregates, selector).into_iter().next()
}
