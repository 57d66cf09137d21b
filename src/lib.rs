//! # Trail Stitcher
//!
//! Assembles named trails from the disconnected path fragments a map
//! extract produces.
//!
//! This library provides:
//! - Great-circle distance and length accounting for GPS polylines
//! - Endpoint matching between two fragments (with a fixed priority order)
//! - Stitching of every fragment sharing a trail name into continuous chains
//! - Optional parallel stitching across trail groups
//!
//! ## Features
//!
//! - **`parallel`** - Stitch trail groups in parallel with rayon
//! - **`serde`** - Serialize the data model and load configuration from JSON
//! - **`cli`** - Build the `trail-stitch` debug tool
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use trail_stitcher::{GeoPoint, Segment, StitchConfig, stitch_group};
//!
//! let a = Segment::new("1", "Blue Trail", vec![
//!     GeoPoint::new(39.4917, -77.4841),
//!     GeoPoint::new(39.4950, -77.4835),
//! ]).unwrap();
//! let b = Segment::new("2", "Blue Trail", vec![
//!     GeoPoint::new(39.4950, -77.4835),
//!     GeoPoint::new(39.4992, -77.4831),
//! ]).unwrap();
//!
//! let result = stitch_group("Blue Trail", &[a, b], &StitchConfig::default()).unwrap();
//! assert!(result.is_fully_connected());
//! assert_eq!(result.primary().points.len(), 3);
//! ```

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{Result, StitchError};

// Geographic utilities (haversine distance, polyline length)
pub mod geo_utils;

// Endpoint matching and merge construction
pub mod matching;
pub use matching::{endpoint_distances, match_endpoints, merge_segments, EndpointDistances, EndpointRelation};

// Identifier deduplication for working lists
pub mod dedup;
pub use dedup::{dedup_by_id, duplicate_ids};

// Group stitching
pub mod stitch;
pub use stitch::{
    stitch_group, stitch_trails, LogObserver, NoopObserver, StitchConfig, StitchEvent,
    StitchObserver, StitchResult, StitchStrategy, Stitcher,
};
#[cfg(feature = "parallel")]
pub use stitch::stitch_trails_parallel;

// ============================================================================
// Core Types
// ============================================================================

/// A geographic coordinate with latitude, longitude and optional elevation.
///
/// With the `serde` feature, points serialize as GeoJSON positions:
/// `[lon, lat]` or `[lon, lat, ele]`.
///
/// # Example
/// ```
/// use trail_stitcher::GeoPoint;
/// let point = GeoPoint::new(39.4917, -77.4841); // Catoctin Mountain
/// assert!(point.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(into = "Vec<f64>", try_from = "Vec<f64>"))]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
    /// Elevation in meters, when the source carries one
    pub elevation: Option<f64>,
}

impl GeoPoint {
    /// Create a new point without elevation.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            elevation: None,
        }
    }

    /// Create a new point with elevation.
    pub fn with_elevation(latitude: f64, longitude: f64, elevation: f64) -> Self {
        Self {
            latitude,
            longitude,
            elevation: Some(elevation),
        }
    }

    /// Create a point from GeoJSON axis order (longitude first).
    pub fn from_lon_lat(longitude: f64, latitude: f64) -> Self {
        Self::new(latitude, longitude)
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
            && self.elevation.map_or(true, f64::is_finite)
    }
}

impl From<GeoPoint> for Vec<f64> {
    fn from(p: GeoPoint) -> Self {
        match p.elevation {
            Some(ele) => vec![p.longitude, p.latitude, ele],
            None => vec![p.longitude, p.latitude],
        }
    }
}

impl TryFrom<Vec<f64>> for GeoPoint {
    type Error = String;

    fn try_from(position: Vec<f64>) -> std::result::Result<Self, Self::Error> {
        match position.as_slice() {
            [lon, lat] => Ok(Self::new(*lat, *lon)),
            [lon, lat, ele] => Ok(Self::with_elevation(*lat, *lon, *ele)),
            other => Err(format!(
                "position must have 2 or 3 values, got {}",
                other.len()
            )),
        }
    }
}

/// An open polyline belonging to a named trail.
///
/// Segments are never mutated by the stitcher: a merge produces a new
/// segment whose id is the composition of its inputs' ids.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Segment {
    /// Opaque identifier, unique within a trail group
    pub id: String,
    /// Trail name (the grouping key)
    pub name: String,
    /// Ordered points, at least two
    #[cfg_attr(feature = "serde", serde(rename = "coordinates"))]
    pub points: Vec<GeoPoint>,
}

impl Segment {
    /// Create a segment, rejecting polylines with fewer than two points.
    ///
    /// # Example
    /// ```
    /// use trail_stitcher::{GeoPoint, Segment, StitchError};
    ///
    /// let err = Segment::new("w1", "Short", vec![GeoPoint::new(0.0, 0.0)]).unwrap_err();
    /// assert!(matches!(err, StitchError::InsufficientPoints { .. }));
    /// ```
    pub fn new(id: impl Into<String>, name: impl Into<String>, points: Vec<GeoPoint>) -> Result<Self> {
        let segment = Self {
            id: id.into(),
            name: name.into(),
            points,
        };
        segment.validate()?;
        Ok(segment)
    }

    /// Check the invariants the stitcher relies on.
    pub fn validate(&self) -> Result<()> {
        if self.points.len() < 2 {
            return Err(StitchError::InsufficientPoints {
                trail: self.name.clone(),
                segment_id: self.id.clone(),
                point_count: self.points.len(),
            });
        }
        if let Some(index) = self.points.iter().position(|p| !p.is_valid()) {
            return Err(StitchError::InvalidCoordinate {
                trail: self.name.clone(),
                segment_id: self.id.clone(),
                index,
            });
        }
        Ok(())
    }

    /// First point.
    ///
    /// # Panics
    /// If `points` is empty. Segments built with [`Segment::new`] always have two.
    pub fn start(&self) -> &GeoPoint {
        &self.points[0]
    }

    /// Last point.
    ///
    /// # Panics
    /// If `points` is empty. Segments built with [`Segment::new`] always have two.
    pub fn end(&self) -> &GeoPoint {
        &self.points[self.points.len() - 1]
    }

    /// Total length in kilometers.
    pub fn length_km(&self) -> f64 {
        geo_utils::polyline_length_km(&self.points)
    }

    /// Whether the first and last points coincide exactly.
    pub fn is_closed(&self) -> bool {
        self.points.len() > 2 && self.start() == self.end()
    }

    /// The same segment traversed in the opposite direction.
    pub fn reversed(&self) -> Self {
        Self {
            id: self.id.clone(),
            name: self.name.clone(),
            points: self.points.iter().rev().copied().collect(),
        }
    }
}

/// Mapping from trail name to the segments sharing that name. Ordered so
/// output is reproducible.
pub type TrailGroups = BTreeMap<String, Vec<Segment>>;

/// Group a flat fragment list by trail name, keeping each group's input order.
///
/// # Example
/// ```
/// use trail_stitcher::{GeoPoint, Segment, group_by_name};
///
/// let pts = vec![GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 1.0)];
/// let groups = group_by_name(vec![
///     Segment::new("1", "A", pts.clone()).unwrap(),
///     Segment::new("2", "B", pts.clone()).unwrap(),
///     Segment::new("3", "A", pts).unwrap(),
/// ]);
/// assert_eq!(groups["A"].len(), 2);
/// assert_eq!(groups["B"].len(), 1);
/// ```
pub fn group_by_name(segments: impl IntoIterator<Item = Segment>) -> TrailGroups {
    let mut groups = TrailGroups::new();
    for segment in segments {
        groups.entry(segment.name.clone()).or_default().push(segment);
    }
    groups
}

// ============================================================================
// Tests
// ============================================================================
