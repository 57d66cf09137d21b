//! Identifier deduplication for stitcher working lists.

use crate::Segment;
use std::collections::HashSet;

/// Keep the first segment for each id, preserving relative order.
///
/// # Example
/// ```
/// use trail_stitcher::{GeoPoint, Segment, dedup_by_id};
///
/// let pts = vec![GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 1.0)];
/// let segs = vec![
///     Segment::new("a", "T", pts.clone()).unwrap(),
///     Segment::new("b", "T", pts.clone()).unwrap(),
///     Segment::new("a", "T", pts).unwrap(),
/// ];
/// let ids: Vec<String> = dedup_by_id(segs).into_iter().map(|s| s.id).collect();
/// assert_eq!(ids, vec!["a", "b"]);
/// ```
pub fn dedup_by_id(segments: Vec<Segment>) -> Vec<Segment> {
    let mut seen: HashSet<String> = HashSet::with_capacity(segments.len());
    segments
        .into_iter()
        .filter(|s| seen.insert(s.id.clone()))
        .collect()
}

/// Ids that occur more than once, each reported once, in order of first repeat.
pub fn duplicate_ids(segments: &[Segment]) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(segments.len());
    let mut reported: HashSet<&str> = HashSet::new();
    let mut duplicates = Vec::new();

    for segment in segments {
        let id = segment.id.as_str();
        if !seen.insert(id) && reported.insert(id) {
            duplicates.push(segment.id.clone());
        }
    }

    duplicates
}
