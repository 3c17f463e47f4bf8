//! # Proximity Detection
//!
//! Selects the distance entries strictly below the threshold and
//! de-duplicates them into [`ProximityPair`]s.
//!
//! A pair is identified by the unordered outlet-name pair within one
//! distributor. Entries are consumed in scan order (increasing lag, then
//! increasing row), so the pair keeps the distance and lag of its first
//! occurrence; later occurrences are dropped, not merged.

use std::collections::HashSet;

use crate::lag::DistanceEntry;

/// Unordered pair of outlet names: the lexically smaller name comes first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PairKey(String, String);

impl PairKey {
    pub fn new(a: &str, b: &str) -> Self {
        if a <= b {
            PairKey(a.to_string(), b.to_string())
        } else {
            PairKey(b.to_string(), a.to_string())
        }
    }
}

/// Two outlets of the same distributor closer than the threshold.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ProximityPair {
    /// The earlier outlet in row order.
    pub outlet_1: String,
    /// The later outlet in row order.
    pub outlet_2: String,
    pub distributor_id: String,
    pub distributor_name: String,
    /// Rounded distance of the first occurrence.
    pub distance_meters: f64,
    /// Lag at which the pair was first seen.
    pub lag: usize,
}

impl ProximityPair {
    pub fn key(&self) -> PairKey {
        PairKey::new(&self.outlet_1, &self.outlet_2)
    }
}

/// Detector output for one distributor.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Detection {
    /// De-duplicated pairs in first-seen order.
    pub pairs: Vec<ProximityPair>,
    /// Every below-threshold entry, duplicates included, in scan order.
    pub hits: Vec<DistanceEntry>,
}

impl Detection {
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Outlet names involved in at least one pair, in first-seen order.
    pub fn involved_outlets(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        let mut outlets = Vec::new();
        for pair in &self.pairs {
            for name in [pair.outlet_1.as_str(), pair.outlet_2.as_str()] {
                if seen.insert(name) {
                    outlets.push(name);
                }
            }
        }
        outlets
    }
}

/// Find the below-threshold pairs of one distributor.
///
/// `entries` must be in scan order and index into `outlet_names`. Entries
/// without a distance (no predecessor, unavailable coordinate) are skipped.
///
/// # Example
///
/// ```rust
/// use outlet_proximity::{build_lag_table, detect_pairs, Coordinate};
///
/// let names = vec!["P1".to_string(), "P2".to_string()];
/// let coords = vec![Some(Coordinate::new(3.5952, 98.6722)), Some(Coordinate::new(3.5953, 98.6722))];
/// let table = build_lag_table("1001", "PT. A", names, &coords, 1);
///
/// let detection = detect_pairs("1001", "PT. A", &table.outlet_names, &table.entries, 100.0);
/// assert_eq!(detection.pairs.len(), 1);
/// assert_eq!(detection.pairs[0].outlet_1, "P1");
/// ```
pub fn detect_pairs(
    distributor_id: &str,
    distributor_name: &str,
    outlet_names: &[String],
    entries: &[DistanceEntry],
    threshold_meters: f64,
) -> Detection {
    let mut seen: HashSet<PairKey> = HashSet::new();
    let mut detection = Detection::default();

    for entry in entries {
        let Some(distance) = entry.distance.meters() else {
            continue;
        };
        if distance >= threshold_meters {
            continue;
        }
        let (Some(earlier), Some(later)) = (
            entry.earlier_index().and_then(|i| outlet_names.get(i)),
            outlet_names.get(entry.index),
        ) else {
            continue;
        };

        detection.hits.push(*entry);
        if seen.insert(PairKey::new(earlier, later)) {
            detection.pairs.push(ProximityPair {
                outlet_1: earlier.clone(),
                outlet_2: later.clone(),
                distributor_id: distributor_id.to_string(),
                distributor_name: distributor_name.to_string(),
                distance_meters: distance,
                lag: entry.lag,
            });
        }
    }

    detection
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lag::LagDistance;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn entry(lag: usize, index: usize, meters: f64) -> DistanceEntry {
        DistanceEntry { lag, index, distance: LagDistance::Meters(meters) }
    }

    #[test]
    fn test_pair_key_is_unordered() {
        assert_eq!(PairKey::new("B", "A"), PairKey::new("A", "B"));
        assert_eq!(PairKey::new("B", "A"), PairKey("A".to_string(), "B".to_string()));

        let outlets = names(&["P2", "P1"]);
        let detection = detect_pairs("1", "A", &outlets, &[entry(1, 1, 10.0)], 100.0);
        assert_eq!(detection.pairs[0].key(), PairKey::new("P1", "P2"));
    }

    #[test]
    fn test_threshold_is_strict() {
        let outlets = names(&["P1", "P2", "P3"]);
        let entries = vec![entry(1, 1, 100.0), entry(1, 2, 99.99)];
        let detection = detect_pairs("1", "A", &outlets, &entries, 100.0);
        assert_eq!(detection.pairs.len(), 1);
        assert_eq!(detection.pairs[0].outlet_1, "P2");
        assert_eq!(detection.pairs[0].outlet_2, "P3");
    }

    #[test]
    fn test_first_lag_wins() {
        // Duplicate outlet names make the same pair appear at lag 1 and lag 2
        let outlets = names(&["A", "B", "A"]);
        let entries = vec![
            entry(1, 1, 20.0),
            entry(1, 2, 30.0),
            DistanceEntry { lag: 2, index: 0, distance: LagDistance::NoPredecessor },
            entry(2, 2, 5.0),
        ];
        let detection = detect_pairs("1", "A", &outlets, &entries, 100.0);
        assert_eq!(detection.pairs.len(), 1);
        assert_eq!(detection.pairs[0].lag, 1);
        assert_eq!(detection.pairs[0].distance_meters, 20.0);
        assert_eq!(detection.hits.len(), 2);
    }

    #[test]
    fn test_unavailable_entries_are_skipped() {
        let outlets = names(&["P1", "P2"]);
        let entries = vec![
            DistanceEntry { lag: 1, index: 0, distance: LagDistance::NoPredecessor },
            DistanceEntry { lag: 1, index: 1, distance: LagDistance::Unavailable },
        ];
        let detection = detect_pairs("1", "A", &outlets, &entries, 100.0);
        assert!(detection.is_empty());
        assert!(detection.pairs.is_empty());
    }

    #[test]
    fn test_involved_outlets() {
        let outlets = names(&["P1", "P2", "P3", "P4"]);
        let entries = vec![entry(1, 1, 10.0), entry(1, 3, 10.0), entry(2, 2, 10.0)];
        let detection = detect_pairs("1", "A", &outlets, &entries, 50.0);
        assert_eq!(detection.involved_outlets(), vec!["P1", "P2", "P3", "P4"]);
    }
}
