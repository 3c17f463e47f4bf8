//! # Dataset Validation & Repair Gate
//!
//! Runs the coordinate normalizer over every row and decides whether the
//! dataset may proceed to distance computation.
//!
//! 1. Every latitude/longitude cell is validated strictly; failures become
//!    [`InvalidCoordinate`] reports (one per row, latitude reported first).
//! 2. Every cell is then cleaned. Rows where either cell cannot be repaired
//!    become [`UnrepairableCoordinate`] reports.
//! 3. The gate opens only if nothing is unrepairable and, when invalid rows
//!    exist, auto-repair is enabled. A closed gate means no distances are
//!    computed for any distributor.

use log::{debug, info, warn};

use crate::coordinate::{clean, validate, InvalidReason};
use crate::dataset::Dataset;
use crate::Coordinate;

/// Which cell of a row a report refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum CoordinateField {
    Latitude,
    Longitude,
}

/// A row whose coordinate failed strict validation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct InvalidCoordinate {
    pub outlet_name: String,
    pub distributor_id: String,
    pub distributor_name: String,
    /// 1-based spreadsheet line (header is line 1).
    pub row_number: usize,
    pub field: CoordinateField,
    pub reason: InvalidReason,
}

impl InvalidCoordinate {
    pub fn reason_text(&self) -> &'static str {
        self.reason.message()
    }
}

/// A row that still has no usable coordinate after cleaning.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct UnrepairableCoordinate {
    pub outlet_name: String,
    pub distributor_id: String,
    pub distributor_name: String,
    pub row_number: usize,
    pub latitude_repaired: bool,
    pub longitude_repaired: bool,
}

/// How the consistency gate resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum GateOutcome {
    /// Every cell passed strict validation.
    Clean,
    /// Invalid cells existed and all were repaired.
    Repaired { rows: usize },
    /// Invalid cells exist and auto-repair is disabled.
    RepairDeclined,
    /// At least one row could not be repaired.
    Unrepairable,
}

impl GateOutcome {
    pub fn is_open(&self) -> bool {
        matches!(self, GateOutcome::Clean | GateOutcome::Repaired { .. })
    }
}

/// Everything the operator needs to fix the upload.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ValidationReport {
    pub invalid: Vec<InvalidCoordinate>,
    pub unrepairable: Vec<UnrepairableCoordinate>,
    /// Row numbers whose cleaned coordinate lies outside the degree ranges.
    /// Reported only; such rows are still evaluated.
    pub out_of_range_rows: Vec<usize>,
    pub outcome: GateOutcome,
}

impl ValidationReport {
    pub fn is_open(&self) -> bool {
        self.outcome.is_open()
    }
}

/// Result of running the gate: the report plus the cleaned coordinate of
/// every row, indexed like [`Dataset::records`].
#[derive(Debug, Clone)]
pub struct Gate {
    pub report: ValidationReport,
    pub coordinates: Vec<Option<Coordinate>>,
}

/// Strictly validate every row. At most one report per row.
pub fn find_invalid(dataset: &Dataset) -> Vec<InvalidCoordinate> {
    dataset
        .records()
        .iter()
        .filter_map(|record| {
            let (field, reason) = match (validate(&record.latitude).reason(), validate(&record.longitude).reason()) {
                (Some(reason), _) => (CoordinateField::Latitude, reason),
                (None, Some(reason)) => (CoordinateField::Longitude, reason),
                (None, None) => return None,
            };
            Some(InvalidCoordinate {
                outlet_name: record.outlet_name.clone(),
                distributor_id: record.distributor_id.clone(),
                distributor_name: record.distributor_name.clone(),
                row_number: record.row_number(),
                field,
                reason,
            })
        })
        .collect()
}

/// Validate, repair and decide.
///
/// # Example
/// ```
/// use outlet_proximity::{Dataset, GateOutcome, RawRecord};
/// use outlet_proximity::validation::run_gate;
///
/// let dataset = Dataset::from_records(vec![
///     RawRecord::new(0, "1", "A", "P1", "3,5952", "98.6722"),
///     RawRecord::new(1, "1", "A", "P2", "NA", "98.6800"),
/// ]);
///
/// let gate = run_gate(&dataset, true);
/// assert_eq!(gate.report.invalid.len(), 1);
/// assert_eq!(gate.report.outcome, GateOutcome::Unrepairable);
/// ```
pub fn run_gate(dataset: &Dataset, auto_repair: bool) -> Gate {
    let invalid = find_invalid(dataset);

    let mut coordinates = Vec::with_capacity(dataset.len());
    let mut unrepairable = Vec::new();
    let mut out_of_range_rows = Vec::new();

    for record in dataset.records() {
        let lat = clean(&record.latitude);
        let lon = clean(&record.longitude);
        match (lat, lon) {
            (Some(lat), Some(lon)) => {
                let coordinate = Coordinate::new(lat, lon);
                if !coordinate.is_within_bounds() {
                    out_of_range_rows.push(record.row_number());
                }
                coordinates.push(Some(coordinate));
            }
            _ => {
                unrepairable.push(UnrepairableCoordinate {
                    outlet_name: record.outlet_name.clone(),
                    distributor_id: record.distributor_id.clone(),
                    distributor_name: record.distributor_name.clone(),
                    row_number: record.row_number(),
                    latitude_repaired: lat.is_some(),
                    longitude_repaired: lon.is_some(),
                });
                coordinates.push(None);
            }
        }
    }

    let outcome = if invalid.is_empty() {
        GateOutcome::Clean
    } else if !auto_repair {
        GateOutcome::RepairDeclined
    } else if !unrepairable.is_empty() {
        GateOutcome::Unrepairable
    } else {
        GateOutcome::Repaired { rows: invalid.len() }
    };

    if !out_of_range_rows.is_empty() {
        warn!(
            "[Validation] {} rows have coordinates outside [-90, 90] / [-180, 180]: {:?}",
            out_of_range_rows.len(),
            out_of_range_rows
        );
    }
    for row in &unrepairable {
        debug!(
            "[Validation] Row {} ({} / {}) could not be repaired",
            row.row_number, row.outlet_name, row.distributor_id
        );
    }
    info!(
        "[Validation] {} rows: {} invalid, {} unrepairable -> {:?}",
        dataset.len(),
        invalid.len(),
        unrepairable.len(),
        outcome
    );

    Gate {
        report: ValidationReport { invalid, unrepairable, out_of_range_rows, outcome },
        coordinates,
    }
}
