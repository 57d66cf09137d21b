//! # Trail Stitching
//!
//! Folds every fragment of a named trail into as few continuous chains as
//! endpoint adjacency allows.
//!
//! ## Algorithm (`Rescan`, the default)
//! 1. Deduplicate the group by segment id
//! 2. Scan ordered pairs (current, candidate) in working-list order and take
//!    the first pair the endpoint matcher relates
//! 3. Remove both, append their merge, deduplicate
//! 4. Repeat until one segment remains or no pair relates
//!
//! Each merge shrinks the working list by one, so a group of `n` segments
//! takes at most `n - 1` merges. Rescanning from the front after every merge
//! costs O(n³) distance checks, which is fine for trail groups (tens of
//! fragments).
//!
//! ## Algorithm (`EndpointIndex`)
//! For large groups, endpoints go into an R-tree once. Each unused segment
//! seeds a chain that grows forward from its end and then backward from its
//! start, always taking the lowest-index unused segment with an endpoint
//! within tolerance (start endpoints before end endpoints).
//!
//! Neither strategy drops data: whatever cannot be connected is returned as
//! additional chains and reported through [`StitchEvent::Unmerged`].

use crate::dedup::{dedup_by_id, duplicate_ids};
use crate::geo_utils::{haversine_distance_km, km_to_degrees};
use crate::matching::{match_endpoints, merge_segments, EndpointRelation};
use crate::{GeoPoint, Result, Segment, StitchError, TrailGroups};
use log::{debug, info, warn};
use rstar::{RTree, RTreeObject, AABB};
use std::collections::{BTreeMap, HashSet};
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// =============================================================================
// Configuration
// =============================================================================

/// Which merge procedure to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum StitchStrategy {
    /// Rescan all pairs after every merge; first related pair wins.
    #[default]
    Rescan,
    /// Grow chains through an R-tree of unresolved endpoints.
    EndpointIndex,
}

impl FromStr for StitchStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "rescan" => Ok(Self::Rescan),
            "endpoint-index" => Ok(Self::EndpointIndex),
            other => Err(format!(
                "unknown strategy '{}' (expected 'rescan' or 'endpoint-index')",
                other
            )),
        }
    }
}

/// Configuration for stitching.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct StitchConfig {
    /// Maximum endpoint distance (km) at which two segments connect.
    /// Default: 0.0 (exact coordinate coincidence)
    pub tolerance_km: f64,
    /// Merge procedure.
    /// Default: `Rescan`
    pub strategy: StitchStrategy,
}

impl Default for StitchConfig {
    fn default() -> Self {
        Self {
            tolerance_km: 0.0,
            strategy: StitchStrategy::Rescan,
        }
    }
}

impl StitchConfig {
    pub fn with_tolerance_km(mut self, tolerance_km: f64) -> Self {
        self.tolerance_km = tolerance_km;
        self
    }

    pub fn with_strategy(mut self, strategy: StitchStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Reject tolerances that cannot be compared against a distance.
    pub fn validate(&self) -> Result<()> {
        if !self.tolerance_km.is_finite() || self.tolerance_km < 0.0 {
            return Err(StitchError::InvalidConfig(format!(
                "tolerance_km must be finite and non-negative, got {}",
                self.tolerance_km
            )));
        }
        Ok(())
    }

    /// Parse a JSON configuration; missing fields take their defaults.
    ///
    /// ```
    /// use trail_stitcher::{StitchConfig, StitchStrategy};
    ///
    /// let config = StitchConfig::from_json(r#"{"strategy": "endpoint-index"}"#).unwrap();
    /// assert_eq!(config.strategy, StitchStrategy::EndpointIndex);
    /// assert_eq!(config.tolerance_km, 0.0);
    /// ```
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| StitchError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

// =============================================================================
// Diagnostics
// =============================================================================

/// Structured progress reported while stitching a group.
#[derive(Debug, Clone, Copy)]
pub enum StitchEvent<'a> {
    GroupStarted {
        trail: &'a str,
        segment_count: usize,
    },
    /// A segment was dropped because an earlier one had the same id.
    DuplicateDropped {
        trail: &'a str,
        segment_id: &'a str,
    },
    MergeFound {
        trail: &'a str,
        first_id: &'a str,
        second_id: &'a str,
        relation: EndpointRelation,
        merged_id: &'a str,
    },
    /// More than one chain survived; `chains` lists all of them.
    Unmerged {
        trail: &'a str,
        chains: &'a [Segment],
    },
    GroupFinished {
        trail: &'a str,
        chain_count: usize,
        merges: usize,
    },
}

/// Receives [`StitchEvent`]s. Implementations must tolerate being called
/// from several threads when groups are stitched in parallel.
pub trait StitchObserver: Send + Sync {
    fn on_event(&self, event: &StitchEvent<'_>);
}

/// Forwards events to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl StitchObserver for LogObserver {
    fn on_event(&self, event: &StitchEvent<'_>) {
        match *event {
            StitchEvent::GroupStarted { trail, segment_count } => {
                debug!("[TrailStitcher] Stitching '{}' ({} segments)", trail, segment_count);
            }
            StitchEvent::DuplicateDropped { trail, segment_id } => {
                warn!("[TrailStitcher] '{}': dropping duplicate segment id {}", trail, segment_id);
            }
            StitchEvent::MergeFound {
                trail,
                first_id,
                second_id,
                relation,
                merged_id,
            } => {
                debug!(
                    "[TrailStitcher] '{}': merge found {}, {} ({}) -> {}",
                    trail, first_id, second_id, relation, merged_id
                );
            }
            StitchEvent::Unmerged { trail, chains } => {
                let ids: Vec<&str> = chains.iter().map(|c| c.id.as_str()).collect();
                warn!(
                    "[TrailStitcher] '{}': {} chains remain unconnected: {}",
                    trail,
                    chains.len(),
                    ids.join(", ")
                );
            }
            StitchEvent::GroupFinished {
                trail,
                chain_count,
                merges,
            } => {
                info!(
                    "[TrailStitcher] '{}': {} merges, {} chain(s)",
                    trail, merges, chain_count
                );
            }
        }
    }
}

/// Discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl StitchObserver for NoopObserver {
    fn on_event(&self, _event: &StitchEvent<'_>) {}
}

static LOG_OBSERVER: LogObserver = LogObserver;

// =============================================================================
// Result
// =============================================================================

/// Outcome of stitching one trail group.
///
/// Always holds at least one chain. A fully connected group yields exactly
/// one; otherwise every disjoint chain is kept, in working-list order.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct StitchResult {
    trail: String,
    chains: Vec<Segment>,
    merges: usize,
}

impl StitchResult {
    pub fn trail(&self) -> &str {
        &self.trail
    }

    pub fn chains(&self) -> &[Segment] {
        &self.chains
    }

    /// Number of successful merges.
    pub fn merges(&self) -> usize {
        self.merges
    }

    /// The first chain in working-list order.
    pub fn primary(&self) -> &Segment {
        &self.chains[0]
    }

    /// The chain with the greatest length (first one on ties).
    pub fn longest(&self) -> &Segment {
        let mut best = &self.chains[0];
        let mut best_len = best.length_km();
        for chain in &self.chains[1..] {
            let len = chain.length_km();
            if len > best_len {
                best = chain;
                best_len = len;
            }
        }
        best
    }

    pub fn is_fully_connected(&self) -> bool {
        self.chains.len() == 1
    }

    /// Sum of all chain lengths in kilometers.
    pub fn total_length_km(&self) -> f64 {
        self.chains.iter().map(Segment::length_km).sum()
    }

    /// Total number of points across all chains.
    pub fn point_count(&self) -> usize {
        self.chains.iter().map(|c| c.points.len()).sum()
    }

    pub fn into_segments(self) -> Vec<Segment> {
        self.chains
    }
}

// =============================================================================
// Stitcher
// =============================================================================

/// Stitches trail groups with a fixed configuration and observer.
///
/// # Example
/// ```
/// use trail_stitcher::{GeoPoint, NoopObserver, Segment, StitchConfig, Stitcher};
///
/// let p = |lon, lat| GeoPoint::from_lon_lat(lon, lat);
/// let a = Segment::new("a", "X", vec![p(0.0, 0.0), p(1.0, 1.0)]).unwrap();
/// let b = Segment::new("b", "X", vec![p(2.0, 2.0), p(1.0, 1.0)]).unwrap();
///
/// let observer = NoopObserver;
/// let stitcher = Stitcher::new(StitchConfig::default()).with_observer(&observer);
/// let result = stitcher.stitch_group("X", &[a, b]).unwrap();
///
/// assert_eq!(result.primary().points, vec![p(0.0, 0.0), p(1.0, 1.0), p(2.0, 2.0)]);
/// ```
pub struct Stitcher<'o> {
    config: StitchConfig,
    observer: &'o dyn StitchObserver,
}

impl Stitcher<'static> {
    /// Create a stitcher that reports through [`LogObserver`].
    pub fn new(config: StitchConfig) -> Self {
        Self {
            config,
            observer: &LOG_OBSERVER,
        }
    }
}

impl<'o> Stitcher<'o> {
    pub fn with_observer<'p>(self, observer: &'p dyn StitchObserver) -> Stitcher<'p> {
        Stitcher {
            config: self.config,
            observer,
        }
    }

    pub fn config(&self) -> &StitchConfig {
        &self.config
    }

    /// Stitch one trail group.
    ///
    /// Fails before doing any work if the configuration is invalid, the
    /// group is empty, or any segment is malformed or filed under the wrong
    /// name.
    pub fn stitch_group(&self, trail: &str, segments: &[Segment]) -> Result<StitchResult> {
        self.config.validate()?;
        check_group(trail, segments)?;

        self.observer.on_event(&StitchEvent::GroupStarted {
            trail,
            segment_count: segments.len(),
        });
        for id in duplicate_ids(segments) {
            self.observer.on_event(&StitchEvent::DuplicateDropped {
                trail,
                segment_id: &id,
            });
        }

        let working = dedup_by_id(segments.to_vec());
        let (chains, merges) = match self.config.strategy {
            StitchStrategy::Rescan => self.rescan(trail, working),
            StitchStrategy::EndpointIndex => self.grow_indexed(trail, working),
        };

        if chains.len() > 1 {
            self.observer.on_event(&StitchEvent::Unmerged {
                trail,
                chains: &chains,
            });
        }
        self.observer.on_event(&StitchEvent::GroupFinished {
            trail,
            chain_count: chains.len(),
            merges,
        });

        Ok(StitchResult {
            trail: trail.to_string(),
            chains,
            merges,
        })
    }

    /// Stitch every group, in name order. Stops at the first invalid group.
    pub fn stitch_trails(&self, groups: &TrailGroups) -> Result<BTreeMap<String, StitchResult>> {
        groups
            .iter()
            .map(|(trail, segments)| {
                self.stitch_group(trail, segments)
                    .map(|result| (trail.clone(), result))
            })
            .collect()
    }

    /// Stitch every group on rayon's thread pool.
    ///
    /// Output is identical to [`Stitcher::stitch_trails`]; only the order
    /// in which events reach the observer differs.
    #[cfg(feature = "parallel")]
    pub fn stitch_trails_parallel(
        &self,
        groups: &TrailGroups,
    ) -> Result<BTreeMap<String, StitchResult>> {
        use rayon::prelude::*;

        groups
            .par_iter()
            .map(|(trail, segments)| {
                self.stitch_group(trail, segments)
                    .map(|result| (trail.clone(), result))
            })
            .collect()
    }

    fn merge_found(
        &self,
        trail: &str,
        first: &Segment,
        second: &Segment,
        relation: EndpointRelation,
        merged: &Segment,
    ) {
        self.observer.on_event(&StitchEvent::MergeFound {
            trail,
            first_id: &first.id,
            second_id: &second.id,
            relation,
            merged_id: &merged.id,
        });
    }

    fn rescan(&self, trail: &str, mut working: Vec<Segment>) -> (Vec<Segment>, usize) {
        let tolerance = self.config.tolerance_km;
        let mut merges = 0;
        let mut seen: HashSet<String> = working.iter().map(|s| s.id.clone()).collect();

        while working.len() > 1 {
            let Some((i, j, relation)) = find_first_pair(&working, tolerance) else {
                break;
            };

            let mut merged = merge_segments(&working[i], &working[j], relation);
            merged.id = fresh_id(merged.id, &seen);
            seen.insert(merged.id.clone());
            self.merge_found(trail, &working[i], &working[j], relation, &merged);

            // Remove the higher index first so the lower one stays put
            let (lo, hi) = if i < j { (i, j) } else { (j, i) };
            working.remove(hi);
            working.remove(lo);
            working.push(merged);
            working = dedup_by_id(working);
            merges += 1;
        }

        (working, merges)
    }

    fn grow_indexed(&self, trail: &str, working: Vec<Segment>) -> (Vec<Segment>, usize) {
        let tolerance = self.config.tolerance_km;
        let tree = build_endpoint_tree(&working);
        let mut used = vec![false; working.len()];
        let mut chains = Vec::new();
        let mut merges = 0;

        for seed in 0..working.len() {
            if used[seed] {
                continue;
            }
            used[seed] = true;
            let mut chain = working[seed].clone();

            // Forward: the chain's end is the free frontier
            while let Some((next, at_start)) = next_unused(&tree, chain.end(), &used, tolerance) {
                used[next] = true;
                let relation = if at_start {
                    EndpointRelation::EndToStart
                } else {
                    EndpointRelation::EndToEnd
                };
                let merged = merge_segments(&chain, &working[next], relation);
                self.merge_found(trail, &chain, &working[next], relation, &merged);
                chain = merged;
                merges += 1;
            }

            // Backward: prepend so the chain's start stays the frontier
            while let Some((prev, at_start)) = next_unused(&tree, chain.start(), &used, tolerance) {
                used[prev] = true;
                let relation = if at_start {
                    EndpointRelation::StartToStart
                } else {
                    EndpointRelation::EndToStart
                };
                let merged = merge_segments(&working[prev], &chain, relation);
                self.merge_found(trail, &working[prev], &chain, relation, &merged);
                chain = merged;
                merges += 1;
            }

            chains.push(chain);
        }

        (chains, merges)
    }
}

// =============================================================================
// Convenience Functions
// =============================================================================

/// Stitch one trail group, reporting through [`LogObserver`].
///
/// # Example
/// ```
/// use trail_stitcher::{GeoPoint, Segment, StitchConfig, stitch_group};
///
/// let p = |lon, lat| GeoPoint::from_lon_lat(lon, lat);
/// let a = Segment::new("a", "X", vec![p(0.0, 0.0), p(1.0, 1.0)]).unwrap();
/// let b = Segment::new("b", "X", vec![p(1.0, 1.0), p(2.0, 2.0)]).unwrap();
///
/// let result = stitch_group("X", &[a, b], &StitchConfig::default()).unwrap();
/// assert!(result.is_fully_connected());
/// assert_eq!(result.primary().points, vec![p(0.0, 0.0), p(1.0, 1.0), p(2.0, 2.0)]);
/// ```
pub fn stitch_group(trail: &str, segments: &[Segment], config: &StitchConfig) -> Result<StitchResult> {
    Stitcher::new(config.clone()).stitch_group(trail, segments)
}

/// Stitch every group in `groups`, reporting through [`LogObserver`].
pub fn stitch_trails(groups: &TrailGroups, config: &StitchConfig) -> Result<BTreeMap<String, StitchResult>> {
    Stitcher::new(config.clone()).stitch_trails(groups)
}

/// Parallel version of [`stitch_trails`].
#[cfg(feature = "parallel")]
pub fn stitch_trails_parallel(
    groups: &TrailGroups,
    config: &StitchConfig,
) -> Result<BTreeMap<String, StitchResult>> {
    Stitcher::new(config.clone()).stitch_trails_parallel(groups)
}

// =============================================================================
// Helpers
// =============================================================================

fn check_group(trail: &str, segments: &[Segment]) -> Result<()> {
    if segments.is_empty() {
        return Err(StitchError::EmptyGroup {
            trail: trail.to_string(),
        });
    }
    for segment in segments {
        if segment.name != trail {
            return Err(StitchError::NameMismatch {
                trail: trail.to_string(),
                segment_id: segment.id.clone(),
                found: segment.name.clone(),
            });
        }
        segment.validate()?;
    }
    Ok(())
}

/// First ordered pair (current, candidate) the matcher relates.
fn find_first_pair(
    working: &[Segment],
    tolerance_km: f64,
) -> Option<(usize, usize, EndpointRelation)> {
    for (i, current) in working.iter().enumerate() {
        for (j, candidate) in working.iter().enumerate() {
            if i == j {
                continue;
            }
            if let Some(relation) = match_endpoints(current, candidate, tolerance_km) {
                return Some((i, j, relation));
            }
        }
    }
    None
}

/// `base`, or `base#n` for the smallest `n` not in `taken`.
///
/// `taken` holds every id the group has used so far, including those of
/// segments already merged away.
fn fresh_id(base: String, taken: &HashSet<String>) -> String {
    if !taken.contains(&base) {
        return base;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{}#{}", base, n);
        if !taken.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

// =============================================================================
// R-tree Indexed Endpoints
// =============================================================================

/// One endpoint of a working segment
#[derive(Debug, Clone, Copy)]
struct IndexedEndpoint {
    segment: usize,
    is_start: bool,
    lat: f64,
    lng: f64,
}

impl RTreeObject for IndexedEndpoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.lng, self.lat])
    }
}

fn build_endpoint_tree(segments: &[Segment]) -> RTree<IndexedEndpoint> {
    let endpoints: Vec<IndexedEndpoint> = segments
        .iter()
        .enumerate()
        .flat_map(|(i, s)| {
            let (start, end) = (s.start(), s.end());
            [
                IndexedEndpoint {
                    segment: i,
                    is_start: true,
                    lat: start.latitude,
                    lng: start.longitude,
                },
                IndexedEndpoint {
                    segment: i,
                    is_start: false,
                    lat: end.latitude,
                    lng: end.longitude,
                },
            ]
        })
        .collect();
    RTree::bulk_load(endpoints)
}

/// Lowest-index unused segment with an endpoint within tolerance of `at`.
/// Returns the segment index and whether the matching endpoint is its start.
fn next_unused(
    tree: &RTree<IndexedEndpoint>,
    at: &GeoPoint,
    used: &[bool],
    tolerance_km: f64,
) -> Option<(usize, bool)> {
    tree.locate_in_envelope_intersecting(&search_window(at, tolerance_km))
        .filter(|e| !used[e.segment])
        .filter(|e| haversine_distance_km(at, &GeoPoint::new(e.lat, e.lng)) <= tolerance_km)
        .min_by_key(|e| (e.segment, !e.is_start))
        .map(|e| (e.segment, e.is_start))
}

/// Box around `at` holding every endpoint within `tolerance_km` of it.
fn search_window(at: &GeoPoint, tolerance_km: f64) -> AABB<[f64; 2]> {
    let (dlat, dlon) = km_to_degrees(tolerance_km, at.latitude);
    // A window reaching the antimeridian spans every longitude
    let (min_lng, max_lng) = if at.longitude - dlon <= -180.0 || at.longitude + dlon >= 180.0 {
        (-180.0, 180.0)
    } else {
        (at.longitude - dlon, at.longitude + dlon)
    };
    AABB::from_corners(
        [min_lng, at.latitude - dlat],
        [max_lng, at.latitude + dlat],
    )
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstar::Envelope;
    use std::sync::Mutex;

    fn seg(id: &str, coords: &[[f64; 2]]) -> Segment {
        let points = coords.iter().map(|c| GeoPoint::from_lon_lat(c[0], c[1])).collect();
        Segment::new(id, "X", points).unwrap()
    }

    fn coords(segment: &Segment) -> Vec<[f64; 2]> {
        segment.points.iter().map(|p| [p.longitude, p.latitude]).collect()
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl StitchObserver for Recorder {
        fn on_event(&self, event: &StitchEvent<'_>) {
            let line = match *event {
                StitchEvent::GroupStarted { segment_count, .. } => format!("start {}", segment_count),
                StitchEvent::DuplicateDropped { segment_id, .. } => format!("dup {}", segment_id),
                StitchEvent::MergeFound { first_id, second_id, relation, merged_id, .. } => {
                    format!("merge {} {} {} {}", first_id, second_id, relation, merged_id)
                }
                StitchEvent::Unmerged { chains, .. } => format!("unmerged {}", chains.len()),
                StitchEvent::GroupFinished { chain_count, merges, .. } => {
                    format!("finish {} {}", chain_count, merges)
                }
            };
            self.0.lock().unwrap().push(line);
        }
    }

    #[test]
    fn test_single_segment_is_returned_unchanged() {
        let a = seg("a", &[[0.0, 0.0], [1.0, 1.0]]);
        let result = stitch_group("X", &[a.clone()], &StitchConfig::default()).unwrap();
        assert_eq!(result.chains(), &[a]);
        assert_eq!(result.merges(), 0);
    }

    #[test]
    fn test_merge_events_in_order() {
        let recorder = Recorder::default();
        let stitcher = Stitcher::new(StitchConfig::default()).with_observer(&recorder);
        let a = seg("a", &[[0.0, 0.0], [1.0, 1.0]]);
        let b = seg("b", &[[1.0, 1.0], [2.0, 2.0]]);
        let c = seg("c", &[[2.0, 2.0], [3.0, 3.0]]);

        let result = stitcher.stitch_group("X", &[a, b, c]).unwrap();
        assert_eq!(result.primary().id, "a+b+c");

        let events = recorder.0.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                "start 3",
                "merge a b end-to-start a+b",
                // working list is now [c, a+b]
                "merge c a+b start-to-end a+b+c",
                "finish 1 2",
            ]
        );
    }

    #[test]
    fn test_fragmented_group_keeps_every_chain() {
        let recorder = Recorder::default();
        let stitcher = Stitcher::new(StitchConfig::default()).with_observer(&recorder);
        let a = seg("a", &[[0.0, 0.0], [1.0, 1.0]]);
        let island = seg("island", &[[50.0, 50.0], [51.0, 51.0]]);
        let b = seg("b", &[[1.0, 1.0], [2.0, 2.0]]);

        let result = stitcher.stitch_group("X", &[a, island, b]).unwrap();
        assert!(!result.is_fully_connected());
        let ids: Vec<&str> = result.chains().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["island", "a+b"]);
        assert_eq!(result.longest().id, "a+b");

        let events = recorder.0.lock().unwrap();
        assert!(events.contains(&"unmerged 2".to_string()));
    }

    #[test]
    fn test_duplicate_ids_dropped_and_reported() {
        let recorder = Recorder::default();
        let stitcher = Stitcher::new(StitchConfig::default()).with_observer(&recorder);
        let a = seg("a", &[[0.0, 0.0], [1.0, 1.0]]);
        let b = seg("b", &[[1.0, 1.0], [2.0, 2.0]]);

        let result = stitcher.stitch_group("X", &[a.clone(), b, a]).unwrap();
        assert!(result.is_fully_connected());
        assert_eq!(result.point_count(), 3);
        assert_eq!(recorder.0.lock().unwrap()[1], "dup a");
    }

    #[test]
    fn test_merged_id_never_reuses_existing_id() {
        let a = seg("a", &[[0.0, 0.0], [1.0, 1.0]]);
        let b = seg("b", &[[1.0, 1.0], [2.0, 2.0]]);
        let clash = seg("a+b", &[[40.0, 40.0], [41.0, 41.0]]);

        let result = stitch_group("X", &[a, b, clash], &StitchConfig::default()).unwrap();
        let ids: Vec<&str> = result.chains().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a+b", "a+b#2"]);
        assert_eq!(result.point_count(), 5);
    }

    #[test]
    fn test_merged_id_never_reuses_merged_away_id() {
        // "a+b" is consumed by the first merge; the later a/b merge must not revive it
        let input = [
            seg("a+b", &[[10.0, 10.0], [11.0, 11.0]]),
            seg("c", &[[11.0, 11.0], [12.0, 12.0]]),
            seg("a", &[[0.0, 0.0], [1.0, 1.0]]),
            seg("b", &[[1.0, 1.0], [2.0, 2.0]]),
        ];

        let result = stitch_group("X", &input, &StitchConfig::default()).unwrap();
        let ids: Vec<&str> = result.chains().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a+b+c", "a+b#2"]);
    }

    #[test]
    fn test_search_window_wraps_antimeridian() {
        let window = search_window(&GeoPoint::new(10.0, 180.0), 0.0);
        assert!(window.contains_point(&[-180.0, 10.0]));

        let window = search_window(&GeoPoint::new(10.0, 0.0), 1.0);
        assert!(!window.contains_point(&[-180.0, 10.0]));
        assert!(window.contains_point(&[0.009, 10.0]));
    }

    #[test]
    fn test_precondition_errors() {
        let config = StitchConfig::default();
        assert_eq!(
            stitch_group("X", &[], &config).unwrap_err(),
            StitchError::EmptyGroup { trail: "X".to_string() }
        );

        let short = Segment {
            id: "s".to_string(),
            name: "X".to_string(),
            points: vec![GeoPoint::new(0.0, 0.0)],
        };
        assert!(matches!(
            stitch_group("X", &[short], &config).unwrap_err(),
            StitchError::InsufficientPoints { point_count: 1, .. }
        ));

        let a = seg("a", &[[0.0, 0.0], [1.0, 1.0]]);
        assert!(matches!(
            stitch_group("Y", &[a], &config).unwrap_err(),
            StitchError::NameMismatch { .. }
        ));
    }

    #[test]
    fn test_invalid_tolerance_rejected() {
        let a = seg("a", &[[0.0, 0.0], [1.0, 1.0]]);
        for bad in [-1.0, f64::NAN, f64::INFINITY] {
            let config = StitchConfig::default().with_tolerance_km(bad);
            assert!(matches!(
                stitch_group("X", &[a.clone()], &config).unwrap_err(),
                StitchError::InvalidConfig(_)
            ));
        }
    }

    #[test]
    fn test_endpoint_index_chain() {
        let config = StitchConfig::default().with_strategy(StitchStrategy::EndpointIndex);
        // Seed sits in the middle and one neighbor is stored reversed
        let mid = seg("mid", &[[1.0, 1.0], [2.0, 2.0]]);
        let tail = seg("tail", &[[3.0, 3.0], [2.0, 2.0]]);
        let head = seg("head", &[[0.0, 0.0], [1.0, 1.0]]);

        let result = stitch_group("X", &[mid, tail, head], &config).unwrap();
        assert!(result.is_fully_connected());
        assert_eq!(result.merges(), 2);
        assert_eq!(
            coords(result.primary()),
            vec![[0.0, 0.0], [1.0, 1.0], [2.0, 2.0], [3.0, 3.0]]
        );
        assert_eq!(result.primary().id, "head+mid+tail");
    }

    #[test]
    fn test_endpoint_index_backward_start_to_start() {
        let config = StitchConfig::default().with_strategy(StitchStrategy::EndpointIndex);
        let a = seg("a", &[[1.0, 1.0], [2.0, 2.0]]);
        let b = seg("b", &[[1.0, 1.0], [0.0, 0.0]]);
        let c = seg("c", &[[-1.0, -1.0], [0.0, 0.0]]);

        let result = stitch_group("X", &[a, b, c], &config).unwrap();
        assert_eq!(
            coords(result.primary()),
            vec![[-1.0, -1.0], [0.0, 0.0], [1.0, 1.0], [2.0, 2.0]]
        );
    }

    #[test]
    fn test_endpoint_index_with_tolerance() {
        let config = StitchConfig::default()
            .with_strategy(StitchStrategy::EndpointIndex)
            .with_tolerance_km(0.005);
        let a = seg("a", &[[-77.4841, 39.4917], [-77.4835, 39.4950]]);
        // Starts ~1 m away from a's end
        let b = seg("b", &[[-77.4835, 39.49501], [-77.4831, 39.4992]]);
        let far = seg("far", &[[-77.40, 39.40], [-77.41, 39.41]]);

        let result = stitch_group("X", &[a, b, far], &config).unwrap();
        assert_eq!(result.chains().len(), 2);
        assert_eq!(result.primary().points.len(), 3);
    }

    #[test]
    fn test_strategy_from_str() {
        assert_eq!("rescan".parse::<StitchStrategy>(), Ok(StitchStrategy::Rescan));
        assert_eq!(
            "endpoint-index".parse::<StitchStrategy>(),
            Ok(StitchStrategy::EndpointIndex)
        );
        assert!("greedy".parse::<StitchStrategy>().is_err());
    }

    #[test]
    fn test_fresh_id() {
        let taken: HashSet<String> = ["a+b", "a+b#2"].iter().map(|s| s.to_string()).collect();
        assert_eq!(fresh_id("c".to_string(), &taken), "c");
        assert_eq!(fresh_id("a+b".to_string(), &taken), "a+b#3");
    }
}
