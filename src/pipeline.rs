//! # Evaluation Pipeline
//!
//! Runs one evaluation over a dataset snapshot:
//!
//! 1. Validate the run parameters ([`EvaluationConfig::validate`]).
//! 2. Run the consistency gate. A closed gate returns
//!    [`Evaluation::Blocked`] and no distance is computed for any
//!    distributor.
//! 3. Clamp `max_lag` to one less than the largest distributor group.
//! 4. For every distributor group: build the lag table, detect pairs (from
//!    the lag table or the exhaustive spatial scan), cluster them.
//!
//! With the `parallel` feature, step 4 runs on the rayon thread pool. Each
//! group owns its de-duplication state and results are collected in group
//! order, so the output is identical to the sequential run.

use std::collections::HashSet;
use std::time::Instant;

use log::{debug, info, warn};

use crate::clustering::{cluster_pairs, ProximityCluster};
use crate::dataset::{Dataset, DatasetIdentity, DistributorGroup};
use crate::error::ConfigError;
use crate::lag::{build_lag_table, LagTable};
use crate::proximity::{detect_pairs, Detection, ProximityPair};
use crate::spatial::exhaustive_scan;
use crate::validation::{run_gate, ValidationReport};
use crate::{Coordinate, EvaluationConfig, ScanMode};

/// Everything computed for one distributor.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DistributorResult {
    pub distributor_id: String,
    pub distributor_name: String,
    /// Position of each of the group's rows in [`Dataset::records`].
    pub rows: Vec<usize>,
    pub lag_table: LagTable,
    pub detection: Detection,
    pub clusters: Vec<ProximityCluster>,
}

impl DistributorResult {
    pub fn pairs(&self) -> &[ProximityPair] {
        &self.detection.pairs
    }

    /// Whether the distributor gets a notification letter.
    pub fn has_hits(&self) -> bool {
        !self.detection.is_empty()
    }
}

/// Result of a completed evaluation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct EvaluationReport {
    pub dataset: DatasetIdentity,
    pub config: EvaluationConfig,
    /// `max_lag` after clamping; the number of lag columns.
    pub effective_max_lag: usize,
    /// Gate report; may still list repaired rows.
    pub validation: ValidationReport,
    /// Cleaned coordinate of every row, indexed like [`Dataset::records`].
    pub coordinates: Vec<Option<Coordinate>>,
    /// Distributors in group order.
    pub distributors: Vec<DistributorResult>,
}

impl EvaluationReport {
    /// All de-duplicated pairs, distributor by distributor.
    pub fn pairs(&self) -> impl Iterator<Item = &ProximityPair> {
        self.distributors.iter().flat_map(|d| d.detection.pairs.iter())
    }

    /// All clusters, distributor by distributor.
    pub fn clusters(&self) -> impl Iterator<Item = &ProximityCluster> {
        self.distributors.iter().flat_map(|d| d.clusters.iter())
    }

    pub fn distributor(&self, distributor_id: &str) -> Option<&DistributorResult> {
        self.distributors.iter().find(|d| d.distributor_id == distributor_id)
    }

    /// Distinct outlet names that appear in at least one pair.
    pub fn involved_outlet_count(&self) -> usize {
        self.pairs()
            .flat_map(|p| [p.outlet_1.as_str(), p.outlet_2.as_str()])
            .collect::<HashSet<_>>()
            .len()
    }
}

/// Outcome of [`evaluate`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(tag = "status", content = "result", rename_all = "snake_case"))]
pub enum Evaluation {
    /// The consistency gate stayed closed; nothing was computed.
    Blocked(ValidationReport),
    Completed(EvaluationReport),
}

impl Evaluation {
    pub fn report(&self) -> Option<&EvaluationReport> {
        match self {
            Evaluation::Completed(report) => Some(report),
            Evaluation::Blocked(_) => None,
        }
    }

    pub fn validation(&self) -> &ValidationReport {
        match self {
            Evaluation::Completed(report) => &report.validation,
            Evaluation::Blocked(validation) => validation,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Evaluation::Completed(_))
    }
}

/// Evaluate a dataset.
///
/// Fails only on unusable parameters. Bad coordinate data ends in
/// [`Evaluation::Blocked`].
///
/// # Example
///
/// ```rust
/// use outlet_proximity::{evaluate, Dataset, EvaluationConfig, RawRecord};
///
/// let dataset = Dataset::from_records(vec![
///     RawRecord::new(0, "1001", "PT. A", "P1", "3.5952", "98.6722"),
///     RawRecord::new(1, "1001", "PT. A", "P2", "bukan angka", "98.6723"),
/// ]);
///
/// let evaluation = evaluate(&dataset, &EvaluationConfig::default()).unwrap();
/// assert!(!evaluation.is_completed());
/// assert_eq!(evaluation.validation().unrepairable.len(), 1);
/// ```
pub fn evaluate(dataset: &Dataset, config: &EvaluationConfig) -> Result<Evaluation, ConfigError> {
    config.validate()?;
    let start = Instant::now();

    let gate = run_gate(dataset, config.auto_repair);
    if !gate.report.is_open() {
        warn!(
            "[Pipeline] Gate closed ({:?}): {} invalid, {} unrepairable rows; no distances computed",
            gate.report.outcome,
            gate.report.invalid.len(),
            gate.report.unrepairable.len()
        );
        return Ok(Evaluation::Blocked(gate.report));
    }

    let largest_group = dataset.largest_group_size();
    let max_lag = config.effective_max_lag(largest_group);
    if max_lag != config.max_lag {
        warn!(
            "[Pipeline] max_lag {} clamped to {} (largest distributor has {} outlets)",
            config.max_lag, max_lag, largest_group
        );
    }

    let groups = dataset.group_by_distributor();
    info!(
        "[Pipeline] Evaluating {} rows in {} distributors (threshold {} m, max_lag {}, {} scan)",
        dataset.len(),
        groups.len(),
        config.threshold_meters,
        max_lag,
        config.scan_mode
    );

    #[cfg(feature = "parallel")]
    let distributors: Vec<DistributorResult> = {
        use rayon::prelude::*;
        debug!("[Pipeline] Using parallel processing (rayon)");
        groups
            .par_iter()
            .map(|group| evaluate_group(group, &gate.coordinates, max_lag, config))
            .collect()
    };

    #[cfg(not(feature = "parallel"))]
    let distributors: Vec<DistributorResult> = groups
        .iter()
        .map(|group| evaluate_group(group, &gate.coordinates, max_lag, config))
        .collect();

    let report = EvaluationReport {
        dataset: dataset.identity().clone(),
        config: config.clone(),
        effective_max_lag: max_lag,
        validation: gate.report,
        coordinates: gate.coordinates,
        distributors,
    };

    info!(
        "[Pipeline] {} pairs, {} clusters, {} distributors with findings in {:?}",
        report.pairs().count(),
        report.clusters().count(),
        report.distributors.iter().filter(|d| d.has_hits()).count(),
        start.elapsed()
    );

    Ok(Evaluation::Completed(report))
}

fn evaluate_group(
    group: &DistributorGroup<'_>,
    coordinates: &[Option<Coordinate>],
    max_lag: usize,
    config: &EvaluationConfig,
) -> DistributorResult {
    let coords: Vec<Option<Coordinate>> = group
        .rows
        .iter()
        .map(|&row| coordinates.get(row).copied().flatten())
        .collect();

    let lag_table = build_lag_table(
        &group.distributor_id,
        &group.distributor_name,
        group.outlet_names(),
        &coords,
        max_lag,
    );

    let detection = match config.scan_mode {
        ScanMode::Lag => detect_pairs(
            &group.distributor_id,
            &group.distributor_name,
            &lag_table.outlet_names,
            &lag_table.entries,
            config.threshold_meters,
        ),
        ScanMode::Exhaustive => {
            let hits = exhaustive_scan(&coords, config.threshold_meters);
            detect_pairs(
                &group.distributor_id,
                &group.distributor_name,
                &lag_table.outlet_names,
                &hits,
                config.threshold_meters,
            )
        }
    };

    let clusters = cluster_pairs(&group.distributor_id, &group.distributor_name, &detection.pairs);

    debug!(
        "[Pipeline] {} ({} outlets): {} hits, {} pairs, {} clusters",
        group.distributor_id,
        group.len(),
        detection.hits.len(),
        detection.pairs.len(),
        clusters.len()
    );

    DistributorResult {
        distributor_id: group.distributor_id.clone(),
        distributor_name: group.distributor_name.clone(),
        rows: group.rows.clone(),
        lag_table,
        detection,
        clusters,
    }
}
