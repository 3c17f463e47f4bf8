//! # Evaluation Session
//!
//! Holds one dataset snapshot and remembers the evaluations already run on
//! it, so an interactive caller that re-submits the same parameters (or
//! flips back to a previous threshold) gets the earlier result instead of a
//! recomputation.
//!
//! The cache key is the dataset identity plus every field of
//! [`EvaluationConfig`]. Replacing the dataset with one of a different
//! identity drops the whole cache.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info};

use crate::dataset::{Dataset, DatasetIdentity};
use crate::error::ConfigError;
use crate::pipeline::{evaluate, Evaluation};
use crate::{EvaluationConfig, ScanMode};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    dataset: DatasetIdentity,
    threshold_bits: u64,
    max_lag: usize,
    group_by_cluster: bool,
    auto_repair: bool,
    scan_mode: ScanMode,
}

impl CacheKey {
    fn new(dataset: &DatasetIdentity, config: &EvaluationConfig) -> Self {
        Self {
            dataset: dataset.clone(),
            // Normalize -0.0; invalid thresholds never reach the cache
            threshold_bits: (config.threshold_meters + 0.0).to_bits(),
            max_lag: config.max_lag,
            group_by_cluster: config.group_by_cluster,
            auto_repair: config.auto_repair,
            scan_mode: config.scan_mode,
        }
    }
}

/// A dataset snapshot with cached evaluations.
///
/// # Example
///
/// ```rust
/// use outlet_proximity::{Dataset, EvaluationConfig, EvaluationSession, RawRecord};
///
/// let dataset = Dataset::from_records(vec![
///     RawRecord::new(0, "1001", "PT. A", "P1", "3.5952", "98.6722"),
///     RawRecord::new(1, "1001", "PT. A", "P2", "3.5953", "98.6722"),
/// ]);
/// let mut session = EvaluationSession::new(dataset);
///
/// let config = EvaluationConfig::default();
/// let first = session.evaluate(&config).unwrap();
/// let second = session.evaluate(&config).unwrap();
/// assert!(std::sync::Arc::ptr_eq(&first, &second));
/// ```
#[derive(Debug)]
pub struct EvaluationSession {
    dataset: Dataset,
    cache: HashMap<CacheKey, Arc<Evaluation>>,
    hits: u64,
    misses: u64,
}

impl EvaluationSession {
    pub fn new(dataset: Dataset) -> Self {
        Self { dataset, cache: HashMap::new(), hits: 0, misses: 0 }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Swap in a new snapshot. The cache survives only if the identity is
    /// unchanged.
    pub fn replace_dataset(&mut self, dataset: Dataset) {
        if dataset.identity() != self.dataset.identity() {
            info!(
                "[Session] Dataset changed ({} -> {}), dropping {} cached results",
                self.dataset.identity().label,
                dataset.identity().label,
                self.cache.len()
            );
            self.cache.clear();
        }
        self.dataset = dataset;
    }

    /// Evaluate with `config`, reusing a cached result when one exists.
    pub fn evaluate(&mut self, config: &EvaluationConfig) -> Result<Arc<Evaluation>, ConfigError> {
        config.validate()?;
        let key = CacheKey::new(self.dataset.identity(), config);

        if let Some(cached) = self.cache.get(&key) {
            self.hits += 1;
            debug!("[Session] Cache hit ({} m, max_lag {})", config.threshold_meters, config.max_lag);
            return Ok(Arc::clone(cached));
        }

        self.misses += 1;
        let evaluation = Arc::new(evaluate(&self.dataset, config)?);
        self.cache.insert(key, Arc::clone(&evaluation));
        Ok(evaluation)
    }

    /// Number of cached evaluations.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// `(hits, misses)` since the session was created.
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::RawRecord;

    fn dataset(lat: &str) -> Dataset {
        Dataset::from_records(vec![
            RawRecord::new(0, "1", "A", "P1", "3.5952", "98.6722"),
            RawRecord::new(1, "1", "A", "P2", lat, "98.6722"),
        ])
    }

    #[test]
    fn test_same_key_is_cached() {
        let mut session = EvaluationSession::new(dataset("3.5953"));
        let config = EvaluationConfig::default();
        let a = session.evaluate(&config).unwrap();
        let b = session.evaluate(&config).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(session.stats(), (1, 1));
    }

    #[test]
    fn test_different_parameters_recompute() {
        let mut session = EvaluationSession::new(dataset("3.5953"));
        let wide = session.evaluate(&EvaluationConfig::default()).unwrap();
        let narrow = session
            .evaluate(&EvaluationConfig { threshold_meters: 5.0, ..Default::default() })
            .unwrap();
        assert_eq!(session.cached(), 2);
        assert_eq!(wide.report().unwrap().pairs().count(), 1);
        assert_eq!(narrow.report().unwrap().pairs().count(), 0);

        // Back to the first threshold: served from cache
        let again = session.evaluate(&EvaluationConfig::default()).unwrap();
        assert!(Arc::ptr_eq(&wide, &again));
    }

    #[test]
    fn test_identity_change_invalidates() {
        let mut session = EvaluationSession::new(dataset("3.5953"));
        let config = EvaluationConfig::default();
        let before = session.evaluate(&config).unwrap();

        session.replace_dataset(dataset("3.5953"));
        assert_eq!(session.cached(), 1);

        session.replace_dataset(dataset("3.7"));
        assert_eq!(session.cached(), 0);
        let after = session.evaluate(&config).unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(after.report().unwrap().pairs().count(), 0);
    }

    #[test]
    fn test_invalid_config_is_not_cached() {
        let mut session = EvaluationSession::new(dataset("3.5953"));
        let config = EvaluationConfig { max_lag: 0, ..Default::default() };
        assert_eq!(session.evaluate(&config).unwrap_err(), ConfigError::ZeroMaxLag);
        assert_eq!(session.cached(), 0);
    }
}
