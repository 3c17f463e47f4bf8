//! # Exhaustive Spatial Scan
//!
//! Finds every below-threshold pair of one distributor, however many rows
//! apart the two outlets are, without building the full `n * (n - 1)` lag
//! table.
//!
//! Outlets are bulk-loaded into an R-tree. Each outlet queries a box of
//! `threshold` meters around itself (converted to degrees with a margin)
//! and keeps candidates that appear earlier in row order. Candidates are
//! measured with the same haversine + rounding as the lag table, so the hits
//! are exactly the below-threshold entries a lag scan with
//! `max_lag = n - 1` would produce.
//!
//! Outlets whose box cannot be expressed as a single lat/lon rectangle
//! (near the poles, across the antimeridian, or out of range) fall back to a
//! linear comparison against all earlier outlets.

use log::debug;
use rstar::{RTree, RTreeObject, AABB};

use crate::geo_utils::{haversine_distance, meters_to_degrees, round_meters};
use crate::lag::{DistanceEntry, LagDistance};
use crate::Coordinate;

/// Widens the search box past the exact radius.
const SEARCH_MARGIN: f64 = 1.1;

/// Boxes reaching past this latitude use the linear fallback.
const MAX_SEARCH_LATITUDE: f64 = 80.0;

/// Outlet position with its row index, for R-tree storage.
#[derive(Debug, Clone, Copy)]
struct IndexedOutlet {
    index: usize,
    lat: f64,
    lng: f64,
}

impl RTreeObject for IndexedOutlet {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.lat, self.lng])
    }
}

/// Search box around `center`, or `None` if the box would wrap.
fn search_box(center: &Coordinate, threshold_meters: f64) -> Option<AABB<[f64; 2]>> {
    if !center.is_within_bounds() {
        return None;
    }
    let radius = threshold_meters * SEARCH_MARGIN;
    let d_lat = meters_to_degrees(radius, 0.0);
    let edge = center.latitude.abs() + d_lat;
    if edge >= MAX_SEARCH_LATITUDE {
        return None;
    }
    // Longitude degrees are widest at the box edge nearest the pole
    let d_lng = meters_to_degrees(radius, edge);
    if center.longitude.abs() + d_lng > 180.0 {
        return None;
    }
    Some(AABB::from_corners(
        [center.latitude - d_lat, center.longitude - d_lng],
        [center.latitude + d_lat, center.longitude + d_lng],
    ))
}

fn measure(coordinates: &[Option<Coordinate>], earlier: usize, later: usize) -> Option<f64> {
    match (&coordinates[earlier], &coordinates[later]) {
        (Some(a), Some(b)) => Some(round_meters(haversine_distance(a, b))),
        _ => None,
    }
}

/// Every pair `(i, j)` with `i < j` closer than `threshold_meters`, as
/// distance entries with `lag = j - i`, sorted by lag then row.
///
/// # Example
///
/// ```rust
/// use outlet_proximity::spatial::exhaustive_scan;
/// use outlet_proximity::Coordinate;
///
/// let coords = vec![
///     Some(Coordinate::new(3.5952, 98.6722)),
///     Some(Coordinate::new(3.7000, 98.7000)),
///     Some(Coordinate::new(3.8000, 98.8000)),
///     Some(Coordinate::new(3.5953, 98.6722)), // 11 m from the first row
/// ];
///
/// let hits = exhaustive_scan(&coords, 100.0);
/// assert_eq!(hits.len(), 1);
/// assert_eq!((hits[0].lag, hits[0].index), (3, 3));
/// ```
pub fn exhaustive_scan(coordinates: &[Option<Coordinate>], threshold_meters: f64) -> Vec<DistanceEntry> {
    let indexed: Vec<IndexedOutlet> = coordinates
        .iter()
        .enumerate()
        .filter_map(|(index, c)| {
            c.filter(Coordinate::is_within_bounds)
                .map(|c| IndexedOutlet { index, lat: c.latitude, lng: c.longitude })
        })
        .collect();
    // Rows the tree cannot answer for; compared linearly
    let unindexed: Vec<usize> = coordinates
        .iter()
        .enumerate()
        .filter(|(_, c)| matches!(c, Some(c) if !c.is_within_bounds()))
        .map(|(i, _)| i)
        .collect();

    let tree = RTree::bulk_load(indexed);
    let mut hits = Vec::new();
    let mut fallbacks = 0usize;

    for (later, coordinate) in coordinates.iter().enumerate() {
        let Some(coordinate) = coordinate else {
            continue;
        };

        let candidates: Vec<usize> = match search_box(coordinate, threshold_meters) {
            Some(envelope) => tree
                .locate_in_envelope(&envelope)
                .map(|p| p.index)
                .filter(|&i| i < later)
                .chain(unindexed.iter().copied().filter(|&i| i < later))
                .collect(),
            None => {
                fallbacks += 1;
                (0..later).collect()
            }
        };

        for earlier in candidates {
            if let Some(distance) = measure(coordinates, earlier, later) {
                if distance < threshold_meters {
                    hits.push(DistanceEntry {
                        lag: later - earlier,
                        index: later,
                        distance: LagDistance::Meters(distance),
                    });
                }
            }
        }
    }

    hits.sort_by_key(|e| (e.lag, e.index));

    debug!(
        "[Spatial] {} outlets, {} hits below {} m ({} linear fallbacks)",
        coordinates.len(),
        hits.len(),
        threshold_meters,
        fallbacks
    );

    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lag::build_lag_table;

    /// Deterministic scatter of points inside a few-km box.
    fn scatter(n: usize, seed: u64, base: (f64, f64)) -> Vec<Option<Coordinate>> {
        let mut state = seed;
        let mut next = || {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            ((state >> 33) as f64) / ((1u64 << 31) as f64)
        };
        (0..n)
            .map(|_| Some(Coordinate::new(base.0 + next() * 0.02, base.1 + next() * 0.02)))
            .collect()
    }

    fn lag_hits(coords: &[Option<Coordinate>], threshold: f64) -> Vec<DistanceEntry> {
        let n = coords.len();
        let names = (0..n).map(|i| format!("P{}", i)).collect();
        let table = build_lag_table("1", "A", names, coords, n.saturating_sub(1).max(1));
        table
            .entries
            .into_iter()
            .filter(|e| e.distance.meters().is_some_and(|m| m < threshold))
            .collect()
    }

    #[test]
    fn test_matches_full_lag_scan() {
        for seed in [1, 7, 42] {
            let coords = scatter(60, seed, (3.59, 98.67));
            for threshold in [50.0, 200.0, 600.0] {
                assert_eq!(exhaustive_scan(&coords, threshold), lag_hits(&coords, threshold));
            }
        }
    }

    #[test]
    fn test_matches_with_missing_and_duplicate_points() {
        let mut coords = scatter(30, 3, (-6.2, 106.8));
        coords[4] = None;
        coords[10] = coords[2];
        coords[11] = coords[2];
        assert_eq!(exhaustive_scan(&coords, 150.0), lag_hits(&coords, 150.0));
    }

    #[test]
    fn test_antimeridian_and_polar_fallback() {
        let coords = vec![
            Some(Coordinate::new(0.0, 179.9999)),
            Some(Coordinate::new(0.0, -179.9999)),
            Some(Coordinate::new(85.0, 10.0)),
            Some(Coordinate::new(85.0001, 10.0)),
        ];
        let hits = exhaustive_scan(&coords, 100.0);
        assert_eq!(hits, lag_hits(&coords, 100.0));
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_out_of_range_rows_are_still_compared() {
        let coords = vec![
            Some(Coordinate::new(3.5952, 98.6722)),
            Some(Coordinate::new(135.0, 3.6)),
            Some(Coordinate::new(135.0, 3.6)),
        ];
        assert_eq!(exhaustive_scan(&coords, 100.0), lag_hits(&coords, 100.0));
    }

    #[test]
    fn test_empty_and_single() {
        assert!(exhaustive_scan(&[], 100.0).is_empty());
        assert!(exhaustive_scan(&[Some(Coordinate::new(1.0, 1.0))], 100.0).is_empty());
    }
}
