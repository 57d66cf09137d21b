//! Error types for trail stitching.
//!
//! Every precondition the stitcher relies on is checked up front and
//! surfaced as a [`StitchError`] instead of an out-of-range access later.

/// Errors returned by the stitching API.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StitchError {
    /// A trail group had no segments.
    #[error("trail group '{trail}' is empty")]
    EmptyGroup { trail: String },

    /// A segment has fewer than two points, so it has no distinct endpoints.
    #[error("segment '{segment_id}' of trail '{trail}' has {point_count} points (minimum 2)")]
    InsufficientPoints {
        trail: String,
        segment_id: String,
        point_count: usize,
    },

    /// A segment contains a non-finite or out-of-range coordinate.
    #[error("segment '{segment_id}' of trail '{trail}' has an invalid coordinate at index {index}")]
    InvalidCoordinate {
        trail: String,
        segment_id: String,
        index: usize,
    },

    /// A segment was filed under a group whose key is not its name.
    #[error("segment '{segment_id}' is named '{found}' but was grouped under '{trail}'")]
    NameMismatch {
        trail: String,
        segment_id: String,
        found: String,
    },

    /// Stitch configuration is invalid.
    #[error("invalid stitch configuration: {0}")]
    InvalidConfig(String),

    /// Stitch configuration could not be parsed.
    #[error("failed to parse stitch configuration: {0}")]
    ConfigParse(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StitchError>;
