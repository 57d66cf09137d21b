//! Endpoint matching between two segments.
//!
//! Two fragments of the same trail are adjacent when an endpoint of one lies
//! on an endpoint of the other. There are four ways this can happen; they are
//! always checked in the same order so that a pair matching several ways at
//! once (a loop closed by two fragments, say) resolves deterministically.

use crate::geo_utils::haversine_distance_km;
use crate::Segment;
use std::fmt;

/// How the endpoints of segment A relate to those of segment B.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointRelation {
    /// `end(A)` meets `start(B)`: A precedes B.
    EndToStart,
    /// `start(A)` meets `end(B)`: B precedes A.
    StartToEnd,
    /// `start(A)` meets `start(B)`: one side must be reversed.
    StartToStart,
    /// `end(A)` meets `end(B)`: one side must be reversed.
    EndToEnd,
}

impl EndpointRelation {
    /// All relations, in match priority order.
    pub const PRIORITY: [Self; 4] = [
        Self::EndToStart,
        Self::StartToEnd,
        Self::StartToStart,
        Self::EndToEnd,
    ];

    /// Whether joining along this relation reverses one of the segments.
    pub fn requires_reversal(self) -> bool {
        matches!(self, Self::StartToStart | Self::EndToEnd)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::EndToStart => "end-to-start",
            Self::StartToEnd => "start-to-end",
            Self::StartToStart => "start-to-start",
            Self::EndToEnd => "end-to-end",
        }
    }
}

impl fmt::Display for EndpointRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four endpoint distances between two segments, in kilometers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EndpointDistances {
    pub end_to_start: f64,
    pub start_to_end: f64,
    pub start_to_start: f64,
    pub end_to_end: f64,
}

impl EndpointDistances {
    /// Distance for a given relation.
    pub fn get(&self, relation: EndpointRelation) -> f64 {
        match relation {
            EndpointRelation::EndToStart => self.end_to_start,
            EndpointRelation::StartToEnd => self.start_to_end,
            EndpointRelation::StartToStart => self.start_to_start,
            EndpointRelation::EndToEnd => self.end_to_end,
        }
    }

    /// Smallest of the four distances.
    pub fn min(&self) -> f64 {
        self.end_to_start
            .min(self.start_to_end)
            .min(self.start_to_start)
            .min(self.end_to_end)
    }
}

/// Compute the four endpoint distances between `a` and `b`.
///
/// # Panics
/// If either segment has no points.
pub fn endpoint_distances(a: &Segment, b: &Segment) -> EndpointDistances {
    EndpointDistances {
        end_to_start: haversine_distance_km(a.end(), b.start()),
        start_to_end: haversine_distance_km(a.start(), b.end()),
        start_to_start: haversine_distance_km(a.start(), b.start()),
        end_to_end: haversine_distance_km(a.end(), b.end()),
    }
}

/// Find how `a` and `b` connect, if at all.
///
/// Returns the first relation in [`EndpointRelation::PRIORITY`] whose
/// endpoint distance is within `tolerance_km`. A tolerance of `0.0` demands
/// exact coordinate coincidence.
///
/// # Panics
/// If either segment has no points; see [`Segment::validate`].
///
/// # Example
/// ```
/// use trail_stitcher::{GeoPoint, Segment, EndpointRelation, match_endpoints};
///
/// let a = Segment::new("a", "X", vec![GeoPoint::from_lon_lat(0.0, 0.0), GeoPoint::from_lon_lat(1.0, 1.0)]).unwrap();
/// let b = Segment::new("b", "X", vec![GeoPoint::from_lon_lat(1.0, 1.0), GeoPoint::from_lon_lat(2.0, 2.0)]).unwrap();
///
/// assert_eq!(match_endpoints(&a, &b, 0.0), Some(EndpointRelation::EndToStart));
/// assert_eq!(match_endpoints(&b, &a, 0.0), Some(EndpointRelation::StartToEnd));
/// ```
pub fn match_endpoints(a: &Segment, b: &Segment, tolerance_km: f64) -> Option<EndpointRelation> {
    let distances = endpoint_distances(a, b);
    EndpointRelation::PRIORITY
        .into_iter()
        .find(|&relation| distances.get(relation) <= tolerance_km)
}

/// Join `a` and `b` along `relation` into a new segment.
///
/// The shared coordinate appears once: the succeeding side's first point is
/// dropped. The result keeps `a`'s name; its id joins both ids with `+` in
/// path order (`"b+a"` for [`EndpointRelation::StartToEnd`], `"a+b"` otherwise).
///
/// # Panics
/// If the succeeding side has no points. Segments that passed
/// [`Segment::validate`] never do.
pub fn merge_segments(a: &Segment, b: &Segment, relation: EndpointRelation) -> Segment {
    let mut points = Vec::with_capacity((a.points.len() + b.points.len()).saturating_sub(1));
    let id = match relation {
        EndpointRelation::StartToEnd => format!("{}+{}", b.id, a.id),
        _ => format!("{}+{}", a.id, b.id),
    };

    match relation {
        EndpointRelation::EndToStart => {
            points.extend_from_slice(&a.points);
            points.extend_from_slice(&b.points[1..]);
        }
        EndpointRelation::StartToEnd => {
            points.extend_from_slice(&b.points);
            points.extend_from_slice(&a.points[1..]);
        }
        EndpointRelation::StartToStart => {
            points.extend(a.points.iter().rev());
            points.extend_from_slice(&b.points[1..]);
        }
        EndpointRelation::EndToEnd => {
            points.extend_from_slice(&a.points);
            points.extend(b.points.iter().rev().skip(1));
        }
    }

    Segment {
        id,
        name: a.name.clone(),
        points,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GeoPoint;

    fn seg(id: &str, coords: &[[f64; 2]]) -> Segment {
        let points = coords.iter().map(|c| GeoPoint::from_lon_lat(c[0], c[1])).collect();
        Segment::new(id, "X", points).unwrap()
    }

    fn coords(segment: &Segment) -> Vec<[f64; 2]> {
        segment.points.iter().map(|p| [p.longitude, p.latitude]).collect()
    }

    #[test]
    fn test_end_to_start() {
        let a = seg("a", &[[0.0, 0.0], [1.0, 1.0]]);
        let b = seg("b", &[[1.0, 1.0], [2.0, 2.0]]);
        let rel = match_endpoints(&a, &b, 0.0).unwrap();
        assert_eq!(rel, EndpointRelation::EndToStart);

        let merged = merge_segments(&a, &b, rel);
        assert_eq!(coords(&merged), vec![[0.0, 0.0], [1.0, 1.0], [2.0, 2.0]]);
        assert_eq!(merged.id, "a+b");
    }

    #[test]
    fn test_start_to_end() {
        let a = seg("a", &[[1.0, 1.0], [2.0, 2.0]]);
        let b = seg("b", &[[0.0, 0.0], [1.0, 1.0]]);
        let rel = match_endpoints(&a, &b, 0.0).unwrap();
        assert_eq!(rel, EndpointRelation::StartToEnd);
        let merged = merge_segments(&a, &b, rel);
        assert_eq!(coords(&merged), vec![[0.0, 0.0], [1.0, 1.0], [2.0, 2.0]]);
        assert_eq!(merged.id, "b+a");
    }

    #[test]
    fn test_start_to_start_reverses_first() {
        let a = seg("a", &[[1.0, 1.0], [0.0, 0.0]]);
        let b = seg("b", &[[1.0, 1.0], [2.0, 2.0]]);
        let rel = match_endpoints(&a, &b, 0.0).unwrap();
        assert_eq!(rel, EndpointRelation::StartToStart);
        assert!(rel.requires_reversal());
        assert_eq!(
            coords(&merge_segments(&a, &b, rel)),
            vec![[0.0, 0.0], [1.0, 1.0], [2.0, 2.0]]
        );
    }

    #[test]
    fn test_end_to_end_reverses_second() {
        let a = seg("a", &[[0.0, 0.0], [1.0, 1.0]]);
        let b = seg("b", &[[2.0, 2.0], [1.0, 1.0]]);
        let rel = match_endpoints(&a, &b, 0.0).unwrap();
        assert_eq!(rel, EndpointRelation::EndToEnd);
        assert_eq!(
            coords(&merge_segments(&a, &b, rel)),
            vec![[0.0, 0.0], [1.0, 1.0], [2.0, 2.0]]
        );
    }

    #[test]
    fn test_no_relation_for_gap() {
        let a = seg("a", &[[0.0, 0.0], [1.0, 1.0]]);
        let b = seg("b", &[[1.0, 1.000001], [2.0, 2.0]]);
        assert_eq!(match_endpoints(&a, &b, 0.0), None);
    }

    #[test]
    fn test_tolerance_accepts_near_endpoints() {
        let a = seg("a", &[[0.0, 0.0], [1.0, 1.0]]);
        // ~0.11 m north of a's end
        let b = seg("b", &[[1.0, 1.000001], [2.0, 2.0]]);
        assert_eq!(match_endpoints(&a, &b, 0.001), Some(EndpointRelation::EndToStart));

        let merged = merge_segments(&a, &b, EndpointRelation::EndToStart);
        assert_eq!(merged.points.len(), 3);
        assert_eq!(coords(&merged)[1], [1.0, 1.0]);
    }

    #[test]
    fn test_priority_order_breaks_ties() {
        // Two fragments forming a closed loop match both end-to-start and
        // start-to-end; end-to-start wins.
        let a = seg("a", &[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]]);
        let b = seg("b", &[[1.0, 1.0], [0.0, 1.0], [0.0, 0.0]]);
        assert_eq!(match_endpoints(&a, &b, 0.0), Some(EndpointRelation::EndToStart));
        assert_eq!(
            coords(&merge_segments(&a, &b, EndpointRelation::EndToStart)),
            vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]]
        );
    }

    #[test]
    fn test_endpoint_distances_min() {
        let a = seg("a", &[[0.0, 0.0], [0.0, 1.0]]);
        let b = seg("b", &[[0.0, 3.0], [0.0, 2.0]]);
        let d = endpoint_distances(&a, &b);
        assert_eq!(d.min(), d.end_to_end);
        assert!(d.start_to_end > d.end_to_end);
    }

    #[test]
    fn test_merge_hand_built_single_point_segment() {
        let a = seg("a", &[[0.0, 0.0], [1.0, 1.0]]);
        let b = Segment {
            id: "b".to_string(),
            name: "X".to_string(),
            points: vec![GeoPoint::from_lon_lat(1.0, 1.0)],
        };
        let merged = merge_segments(&a, &b, EndpointRelation::EndToStart);
        assert_eq!(coords(&merged), vec![[0.0, 0.0], [1.0, 1.0]]);
    }

    #[test]
    #[should_panic]
    fn test_merge_into_empty_segment_panics() {
        let a = seg("a", &[[0.0, 0.0], [1.0, 1.0]]);
        let empty = Segment {
            id: "e".to_string(),
            name: "X".to_string(),
            points: Vec::new(),
        };
        merge_segments(&a, &empty, EndpointRelation::EndToStart);
    }

    #[test]
    fn test_relation_display() {
        assert_eq!(EndpointRelation::StartToStart.to_string(), "start-to-start");
        assert!(!EndpointRelation::EndToStart.requires_reversal());
    }
}
