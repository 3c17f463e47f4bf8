//! # Lag-Distance Table Builder
//!
//! For one distributor group of `n` outlets in row order and a lag count `m`,
//! computes the distance from each outlet to the outlet `d` rows earlier, for
//! every `d` in `1..=m`.
//!
//! The table always has exactly `n * m` entries, ordered by lag then row.
//! An entry is defined only when `i >= d`; of the `n * m` entries,
//! `sum(max(0, n - d))` carry a distance.
//!
//! Rows whose coordinate could not be cleaned are carried as
//! [`LagDistance::Unavailable`] rather than being placed at `(0, 0)`, so they
//! can never produce a spurious below-threshold hit.

use log::warn;

use crate::geo_utils::{haversine_distance, round_meters};
use crate::Coordinate;

/// Value of one cell of the lag table.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum LagDistance {
    /// `i < d`: there is no outlet `d` rows earlier.
    NoPredecessor,
    /// One of the two outlets has no usable coordinate.
    Unavailable,
    /// Distance in meters, rounded to 2 decimals.
    Meters(f64),
}

impl LagDistance {
    pub fn meters(&self) -> Option<f64> {
        match self {
            LagDistance::Meters(m) => Some(*m),
            _ => None,
        }
    }
}

/// Distance from outlet `index` to outlet `index - lag` of the same group.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DistanceEntry {
    /// Lag offset `d` (1-based).
    pub lag: usize,
    /// Position of the later outlet within its group.
    pub index: usize,
    pub distance: LagDistance,
}

impl DistanceEntry {
    /// Position of the earlier outlet, if it exists.
    pub fn earlier_index(&self) -> Option<usize> {
        self.index.checked_sub(self.lag)
    }
}

/// All lag distances of one distributor.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct LagTable {
    pub distributor_id: String,
    pub distributor_name: String,
    /// Outlet names in row order; entry indices point into this.
    pub outlet_names: Vec<String>,
    pub max_lag: usize,
    /// `outlet_names.len() * max_lag` entries, ordered by lag then index.
    pub entries: Vec<DistanceEntry>,
}

impl LagTable {
    /// Entries that carry a distance.
    pub fn defined(&self) -> impl Iterator<Item = &DistanceEntry> {
        self.entries.iter().filter(|e| e.distance.meters().is_some())
    }

    /// Outlet names of an entry as `(earlier, later)`.
    pub fn outlet_pair(&self, entry: &DistanceEntry) -> Option<(&str, &str)> {
        let earlier = entry.earlier_index()?;
        Some((
            self.outlet_names.get(earlier)?.as_str(),
            self.outlet_names.get(entry.index)?.as_str(),
        ))
    }

    /// Lag columns of one row: element `d - 1` is the distance at lag `d`.
    pub fn row_distances(&self, index: usize) -> Vec<Option<f64>> {
        let n = self.outlet_names.len();
        (0..self.max_lag)
            .map(|d| self.entries.get(d * n + index).and_then(|e| e.distance.meters()))
            .collect()
    }
}

/// Build the lag table for one distributor group.
///
/// `coordinates[i]` is the cleaned coordinate of `outlet_names[i]`, or
/// `None` if the row could not be repaired.
///
/// # Example
///
/// ```rust
/// use outlet_proximity::{build_lag_table, Coordinate};
///
/// let names = vec!["P1".to_string(), "P2".to_string(), "P3".to_string()];
/// let coords = vec![
///     Some(Coordinate::new(3.5952, 98.6722)),
///     Some(Coordinate::new(3.5956, 98.6722)),
///     Some(Coordinate::new(3.6000, 98.6800)),
/// ];
///
/// let table = build_lag_table("1001", "PT. A", names, &coords, 2);
/// assert_eq!(table.entries.len(), 6);
/// assert_eq!(table.defined().count(), 3); // (3 - 1) + (3 - 2)
/// ```
///
/// # Complexity
///
/// O(n · max_lag) distance computations.
pub fn build_lag_table(
    distributor_id: &str,
    distributor_name: &str,
    outlet_names: Vec<String>,
    coordinates: &[Option<Coordinate>],
    max_lag: usize,
) -> LagTable {
    let n = outlet_names.len().min(coordinates.len());
    let mut entries = Vec::with_capacity(n * max_lag);
    let mut unavailable = 0usize;

    for lag in 1..=max_lag {
        for index in 0..n {
            let distance = if index < lag {
                LagDistance::NoPredecessor
            } else {
                match (&coordinates[index - lag], &coordinates[index]) {
                    (Some(earlier), Some(later)) => LagDistance::Meters(round_meters(haversine_distance(earlier, later))),
                    _ => {
                        unavailable += 1;
                        LagDistance::Unavailable
                    }
                }
            };
            entries.push(DistanceEntry { lag, index, distance });
        }
    }

    if unavailable > 0 {
        warn!(
            "[LagTable] {}: {} entries skipped for rows without a usable coordinate",
            distributor_id, unavailable
        );
    }

    let mut outlet_names = outlet_names;
    outlet_names.truncate(n);

    LagTable {
        distributor_id: distributor_id.to_string(),
        distributor_name: distributor_name.to_string(),
        outlet_names,
        max_lag,
        entries,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("P{}", i)).collect()
    }

    /// Points marching north ~111 m apart.
    fn line(n: usize) -> Vec<Option<Coordinate>> {
        (0..n).map(|i| Some(Coordinate::new(3.59 + i as f64 * 0.001, 98.67))).collect()
    }

    #[test]
    fn test_entry_counts() {
        for n in 0..8 {
            for m in 1..6 {
                let table = build_lag_table("1", "A", names(n), &line(n), m);
                assert_eq!(table.entries.len(), n * m);
                let expected: usize = (1..=m).map(|d| n.saturating_sub(d)).sum();
                assert_eq!(table.defined().count(), expected, "n={} m={}", n, m);
            }
        }
    }

    #[test]
    fn test_single_outlet_has_no_distances() {
        let table = build_lag_table("1", "A", names(1), &line(1), 3);
        assert_eq!(table.entries.len(), 3);
        assert_eq!(table.defined().count(), 0);
        assert!(table.entries.iter().all(|e| e.distance == LagDistance::NoPredecessor));
    }

    #[test]
    fn test_scan_order_and_values() {
        let table = build_lag_table("1", "A", names(3), &line(3), 2);
        let order: Vec<(usize, usize)> = table.entries.iter().map(|e| (e.lag, e.index)).collect();
        assert_eq!(order, vec![(1, 0), (1, 1), (1, 2), (2, 0), (2, 1), (2, 2)]);

        let lag1 = table.entries[1].distance.meters().unwrap();
        let lag2 = table.entries[5].distance.meters().unwrap();
        assert!((lag1 - 111.19).abs() < 0.1);
        assert!((lag2 - 222.39).abs() < 0.1);
        assert_eq!(table.outlet_pair(&table.entries[5]), Some(("P1", "P3")));
        assert_eq!(table.outlet_pair(&table.entries[0]), None);
    }

    #[test]
    fn test_unavailable_coordinates_are_not_measured() {
        let mut coords = line(3);
        coords[1] = None;
        let table = build_lag_table("1", "A", names(3), &coords, 2);
        assert_eq!(table.entries[1].distance, LagDistance::Unavailable);
        assert_eq!(table.entries[2].distance, LagDistance::Unavailable);
        // P1 -> P3 at lag 2 is still measured
        assert!(table.entries[5].distance.meters().is_some());
    }

    #[test]
    fn test_row_distances() {
        let table = build_lag_table("1", "A", names(3), &line(3), 2);
        assert_eq!(table.row_distances(0), vec![None, None]);
        let row2 = table.row_distances(2);
        assert!(row2[0].is_some() && row2[1].is_some());
        assert_eq!(table.row_distances(1)[1], None);
    }
}
