//! # Outlet Proximity
//!
//! Coordinate validation and proximity evaluation for outlet ("pangkalan")
//! networks grouped by distributor ("agen").
//!
//! This library provides:
//! - Validation and best-effort repair of latitude/longitude cells
//! - Lag-distance tables: distance from each outlet to the outlet `d` rows
//!   earlier within its distributor
//! - Detection of outlet pairs closer than a threshold, de-duplicated per
//!   distributor
//! - Clustering of transitively-close outlets
//! - Rendering helpers for the annotated table, pair sheet and letters
//!
//! ## Features
//!
//! - **`parallel`** - Evaluate distributor groups in parallel with rayon
//! - **`serde`** - `Serialize` for all results, JSON config loading
//! - **`csv`** - Load datasets from CSV
//! - **`cli`** - The `outlet-proximity` command-line tool
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use outlet_proximity::{Dataset, Evaluation, EvaluationConfig, RawRecord, evaluate};
//!
//! let rows = vec![
//!     RawRecord::new(0, "1001", "PT. SUMBER GAS", "Pangkalan A", "3.59520", "98.67220"),
//!     RawRecord::new(1, "1001", "PT. SUMBER GAS", "Pangkalan B", "3.59530", "98.67230"),
//!     RawRecord::new(2, "1001", "PT. SUMBER GAS", "Pangkalan C", "3.61000", "98.69000"),
//! ];
//! let dataset = Dataset::from_records(rows);
//!
//! let config = EvaluationConfig { threshold_meters: 100.0, max_lag: 2, ..Default::default() };
//!
//! match evaluate(&dataset, &config).unwrap() {
//!     Evaluation::Completed(report) => {
//!         assert_eq!(report.pairs().count(), 1);
//!         assert_eq!(report.clusters().count(), 1);
//!     }
//!     Evaluation::Blocked(validation) => panic!("unexpected: {:?}", validation),
//! }
//! ```

use std::fmt;

pub mod clustering;
pub mod coordinate;
pub mod dataset;
pub mod error;
pub mod geo_utils;
pub mod lag;
pub mod pipeline;
pub mod proximity;
pub mod report;
pub mod session;
pub mod spatial;
pub mod validation;

pub use clustering::{cluster_pairs, ProximityCluster};
pub use coordinate::{EmptySource, InvalidReason, ValidationOutcome};
pub use dataset::{ColumnMapping, ColumnRef, Dataset, DatasetIdentity, DistributorGroup, RawRecord};
pub use error::{ConfigError, SchemaError};
pub use lag::{build_lag_table, DistanceEntry, LagDistance, LagTable};
pub use pipeline::{evaluate, DistributorResult, Evaluation, EvaluationReport};
pub use proximity::{detect_pairs, Detection, PairKey, ProximityPair};
pub use report::LetterConfig;
pub use session::EvaluationSession;
pub use validation::{GateOutcome, InvalidCoordinate, UnrepairableCoordinate, ValidationReport};

#[cfg(feature = "csv")]
pub use dataset::load::{load_csv, load_csv_file, Encoding};
#[cfg(feature = "csv")]
pub use error::LoadError;

// ============================================================================
// Core Types
// ============================================================================

/// A validated coordinate in degrees.
///
/// Both components are finite. Ranges are not enforced; see
/// [`Coordinate::is_within_bounds`].
///
/// # Example
/// ```
/// use outlet_proximity::Coordinate;
/// let outlet = Coordinate::new(3.5952, 98.6722); // Medan
/// assert!(outlet.is_within_bounds());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Create a new coordinate.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Check that latitude is within [-90, 90] and longitude within [-180, 180].
    pub fn is_within_bounds(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// A raw cell value as it arrived from the source table.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RawValue {
    /// Blank or absent cell.
    Missing,
    /// A cell already typed as a number by the reader.
    Number(f64),
    /// Free text, possibly malformed.
    Text(String),
}

impl RawValue {
    /// Text shown when the cell is written back to a table.
    pub fn display_text(&self) -> String {
        match self {
            RawValue::Missing => String::new(),
            RawValue::Number(value) => value.to_string(),
            RawValue::Text(text) => text.clone(),
        }
    }
}

impl From<&str> for RawValue {
    /// Empty strings become [`RawValue::Missing`], everything else is kept
    /// verbatim as text.
    fn from(text: &str) -> Self {
        if text.is_empty() {
            RawValue::Missing
        } else {
            RawValue::Text(text.to_string())
        }
    }
}

impl From<String> for RawValue {
    fn from(text: String) -> Self {
        if text.is_empty() {
            RawValue::Missing
        } else {
            RawValue::Text(text)
        }
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Number(value)
    }
}

impl From<Option<f64>> for RawValue {
    fn from(value: Option<f64>) -> Self {
        value.map_or(RawValue::Missing, RawValue::Number)
    }
}

/// How below-threshold candidates are found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ScanMode {
    /// Compare each outlet with the outlets 1..=max_lag rows before it.
    #[default]
    Lag,
    /// Compare every pair of outlets in a distributor via an R-tree.
    Exhaustive,
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanMode::Lag => f.write_str("lag"),
            ScanMode::Exhaustive => f.write_str("exhaustive"),
        }
    }
}

/// Parameters for one evaluation run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EvaluationConfig {
    /// Outlets closer than this are flagged (strictly less than).
    /// Default: 100.0 meters
    pub threshold_meters: f64,

    /// Number of lag columns. Clamped to one less than the largest
    /// distributor group (minimum 1).
    /// Default: 10
    pub max_lag: usize,

    /// Letters list clusters instead of raw pairs.
    /// Default: true
    pub group_by_cluster: bool,

    /// Repair invalid cells with [`coordinate::clean`] instead of blocking.
    /// Default: true
    pub auto_repair: bool,

    /// Candidate search strategy.
    /// Default: [`ScanMode::Lag`]
    pub scan_mode: ScanMode,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            threshold_meters: 100.0,
            max_lag: 10,
            group_by_cluster: true,
            auto_repair: true,
            scan_mode: ScanMode::Lag,
        }
    }
}

impl EvaluationConfig {
    /// Reject parameters no run could use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.threshold_meters.is_finite() || self.threshold_meters <= 0.0 {
            return Err(ConfigError::InvalidThreshold(self.threshold_meters));
        }
        if self.max_lag == 0 {
            return Err(ConfigError::ZeroMaxLag);
        }
        Ok(())
    }

    /// The lag count actually used for a dataset whose largest group has
    /// `largest_group` outlets.
    pub fn effective_max_lag(&self, largest_group: usize) -> usize {
        let bound = largest_group.saturating_sub(1).max(1);
        self.max_lag.clamp(1, bound)
    }
}

// ============================================================================
// Tests
// ============================================================================
