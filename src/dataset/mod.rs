//! # Dataset & Schema
//!
//! The tabular input of one evaluation run: a header row, the raw rows, and
//! the resolved positions of the five columns the pipeline reads.
//!
//! The spreadsheet template the tool was built around places the columns at
//! fixed positions (distributor ID in column 0, distributor name in 1, outlet
//! name in 2, latitude in 8, longitude in 9). [`ColumnMapping::default`]
//! keeps that layout; [`ColumnMapping::named`] looks columns up by header
//! instead. Either way the mapping is resolved once, when the [`Dataset`] is
//! built, and a table that does not fit fails with a [`SchemaError`].

use std::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::SchemaError;
use crate::RawValue;

#[cfg(feature = "csv")]
pub mod load;

/// Header names used when a dataset is built from records rather than a table.
const DEFAULT_HEADERS: [&str; 5] = ["ID Agen", "Nama Agen", "Nama Pangkalan", "Latitude", "Longitude"];

// ============================================================================
// Column Mapping
// ============================================================================

/// Reference to one column, by position or by header text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum ColumnRef {
    Index(usize),
    Name(String),
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnRef::Index(i) => write!(f, "#{}", i),
            ColumnRef::Name(name) => write!(f, "\"{}\"", name),
        }
    }
}

/// Where to find the five columns the pipeline reads.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ColumnMapping {
    pub distributor_id: ColumnRef,
    pub distributor_name: ColumnRef,
    pub outlet_name: ColumnRef,
    pub latitude: ColumnRef,
    pub longitude: ColumnRef,
}

impl Default for ColumnMapping {
    /// Positional layout of the distributor upload template.
    fn default() -> Self {
        Self {
            distributor_id: ColumnRef::Index(0),
            distributor_name: ColumnRef::Index(1),
            outlet_name: ColumnRef::Index(2),
            latitude: ColumnRef::Index(8),
            longitude: ColumnRef::Index(9),
        }
    }
}

impl ColumnMapping {
    /// Look every column up by header text.
    pub fn named(
        distributor_id: &str,
        distributor_name: &str,
        outlet_name: &str,
        latitude: &str,
        longitude: &str,
    ) -> Self {
        Self {
            distributor_id: ColumnRef::Name(distributor_id.to_string()),
            distributor_name: ColumnRef::Name(distributor_name.to_string()),
            outlet_name: ColumnRef::Name(outlet_name.to_string()),
            latitude: ColumnRef::Name(latitude.to_string()),
            longitude: ColumnRef::Name(longitude.to_string()),
        }
    }

    /// Resolve against a header row.
    pub fn resolve(&self, headers: &[String]) -> Result<ResolvedColumns, SchemaError> {
        if headers.is_empty() {
            return Err(SchemaError::EmptyHeader);
        }
        Ok(ResolvedColumns {
            distributor_id: resolve_column(&self.distributor_id, "distributor_id", headers)?,
            distributor_name: resolve_column(&self.distributor_name, "distributor_name", headers)?,
            outlet_name: resolve_column(&self.outlet_name, "outlet_name", headers)?,
            latitude: resolve_column(&self.latitude, "latitude", headers)?,
            longitude: resolve_column(&self.longitude, "longitude", headers)?,
        })
    }
}

/// Column positions after resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ResolvedColumns {
    pub distributor_id: usize,
    pub distributor_name: usize,
    pub outlet_name: usize,
    pub latitude: usize,
    pub longitude: usize,
}

fn resolve_column(column: &ColumnRef, role: &'static str, headers: &[String]) -> Result<usize, SchemaError> {
    match column {
        ColumnRef::Index(index) => {
            if *index < headers.len() {
                Ok(*index)
            } else {
                Err(SchemaError::TooFewColumns { role, index: *index, width: headers.len() })
            }
        }
        ColumnRef::Name(name) => {
            let wanted = name.trim();
            headers
                .iter()
                .position(|h| h.trim() == wanted)
                .or_else(|| headers.iter().position(|h| h.trim().eq_ignore_ascii_case(wanted)))
                .ok_or_else(|| SchemaError::MissingColumn {
                    name: name.clone(),
                    available: headers.join(", "),
                })
        }
    }
}

// ============================================================================
// Records
// ============================================================================

/// One input row.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RawRecord {
    /// Zero-based position among the data rows (header excluded).
    pub source_index: usize,
    pub distributor_id: String,
    pub distributor_name: String,
    pub outlet_name: String,
    pub latitude: RawValue,
    pub longitude: RawValue,
    /// Every cell of the row, for writing the annotated table back out.
    pub cells: Vec<RawValue>,
}

impl RawRecord {
    /// Build a record laid out like [`Dataset::from_records`] expects.
    pub fn new(
        source_index: usize,
        distributor_id: &str,
        distributor_name: &str,
        outlet_name: &str,
        latitude: impl Into<RawValue>,
        longitude: impl Into<RawValue>,
    ) -> Self {
        let latitude = latitude.into();
        let longitude = longitude.into();
        let cells = vec![
            RawValue::from(distributor_id),
            RawValue::from(distributor_name),
            RawValue::from(outlet_name),
            latitude.clone(),
            longitude.clone(),
        ];
        Self {
            source_index,
            distributor_id: distributor_id.to_string(),
            distributor_name: distributor_name.to_string(),
            outlet_name: outlet_name.to_string(),
            latitude,
            longitude,
            cells,
        }
    }

    /// 1-based spreadsheet line number; line 1 is the header.
    pub fn row_number(&self) -> usize {
        self.source_index + 2
    }
}

// ============================================================================
// Dataset
// ============================================================================

/// Identity of a dataset snapshot, used to key cached results.
///
/// Two datasets with the same label and identical cells share an identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DatasetIdentity {
    pub label: String,
    pub rows: usize,
    pub fingerprint: u64,
}

/// An immutable snapshot of the uploaded table.
#[derive(Debug, Clone)]
pub struct Dataset {
    identity: DatasetIdentity,
    headers: Vec<String>,
    columns: ResolvedColumns,
    records: Vec<RawRecord>,
}

impl Dataset {
    /// Build a dataset from a header row and raw rows.
    ///
    /// Short rows are padded with [`RawValue::Missing`].
    ///
    /// # Example
    /// ```
    /// use outlet_proximity::{ColumnMapping, Dataset, RawValue};
    ///
    /// let headers = vec!["Agen".to_string(), "Nama".to_string(), "Pangkalan".to_string(),
    ///                    "Lat".to_string(), "Lon".to_string()];
    /// let rows = vec![vec![
    ///     RawValue::from("1001"), RawValue::from("PT. A"), RawValue::from("P1"),
    ///     RawValue::from("3.5952"), RawValue::from("98.6722"),
    /// ]];
    /// let mapping = ColumnMapping::named("Agen", "Nama", "Pangkalan", "Lat", "Lon");
    /// let dataset = Dataset::from_table("upload.csv", headers, rows, &mapping).unwrap();
    /// assert_eq!(dataset.records()[0].outlet_name, "P1");
    /// ```
    pub fn from_table(
        label: &str,
        headers: Vec<String>,
        rows: Vec<Vec<RawValue>>,
        mapping: &ColumnMapping,
    ) -> Result<Self, SchemaError> {
        let columns = mapping.resolve(&headers)?;
        let width = headers.len();

        let records: Vec<RawRecord> = rows
            .into_iter()
            .enumerate()
            .map(|(source_index, mut cells)| {
                if cells.len() < width {
                    cells.resize(width, RawValue::Missing);
                }
                RawRecord {
                    source_index,
                    distributor_id: cells[columns.distributor_id].display_text(),
                    distributor_name: cells[columns.distributor_name].display_text(),
                    outlet_name: cells[columns.outlet_name].display_text(),
                    latitude: cells[columns.latitude].clone(),
                    longitude: cells[columns.longitude].clone(),
                    cells,
                }
            })
            .collect();

        Ok(Self::assemble(label, headers, columns, records))
    }

    /// Build a dataset from records created with [`RawRecord::new`].
    pub fn from_records(records: Vec<RawRecord>) -> Self {
        let headers = DEFAULT_HEADERS.iter().map(|h| h.to_string()).collect();
        let columns = ResolvedColumns {
            distributor_id: 0,
            distributor_name: 1,
            outlet_name: 2,
            latitude: 3,
            longitude: 4,
        };
        Self::assemble("records", headers, columns, records)
    }

    fn assemble(label: &str, headers: Vec<String>, columns: ResolvedColumns, records: Vec<RawRecord>) -> Self {
        let identity = DatasetIdentity {
            label: label.to_string(),
            rows: records.len(),
            fingerprint: fingerprint(&headers, &records),
        };
        Self { identity, headers, columns, records }
    }

    /// Same dataset under a different label (e.g. the uploaded file name).
    pub fn with_label(mut self, label: &str) -> Self {
        self.identity.label = label.to_string();
        self
    }

    pub fn identity(&self) -> &DatasetIdentity {
        &self.identity
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn columns(&self) -> ResolvedColumns {
        self.columns
    }

    pub fn records(&self) -> &[RawRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Split the rows by distributor ID.
    ///
    /// Groups come out in ascending distributor-ID order (numeric when both
    /// IDs are numbers); rows inside a group keep their original order, which
    /// the lag computation depends on.
    pub fn group_by_distributor(&self) -> Vec<DistributorGroup<'_>> {
        let mut position: HashMap<&str, usize> = HashMap::new();
        let mut groups: Vec<DistributorGroup<'_>> = Vec::new();

        for (row, record) in self.records.iter().enumerate() {
            let idx = *position.entry(record.distributor_id.as_str()).or_insert_with(|| {
                groups.push(DistributorGroup {
                    distributor_id: record.distributor_id.clone(),
                    // Name of the first row represents the whole group
                    distributor_name: record.distributor_name.clone(),
                    records: Vec::new(),
                    rows: Vec::new(),
                });
                groups.len() - 1
            });
            groups[idx].records.push(record);
            groups[idx].rows.push(row);
        }

        groups.sort_by(|a, b| compare_distributor_ids(&a.distributor_id, &b.distributor_id));
        groups
    }

    /// Size of the largest distributor group.
    pub fn largest_group_size(&self) -> usize {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for record in &self.records {
            *counts.entry(record.distributor_id.as_str()).or_insert(0) += 1;
        }
        counts.values().copied().max().unwrap_or(0)
    }
}

/// Rows of one distributor, in original row order.
#[derive(Debug, Clone)]
pub struct DistributorGroup<'a> {
    pub distributor_id: String,
    pub distributor_name: String,
    pub records: Vec<&'a RawRecord>,
    /// Position of each record in [`Dataset::records`].
    pub rows: Vec<usize>,
}

impl DistributorGroup<'_> {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Outlet names in row order.
    pub fn outlet_names(&self) -> Vec<String> {
        self.records.iter().map(|r| r.outlet_name.clone()).collect()
    }
}

/// Numeric IDs sort numerically and before text IDs; text IDs sort lexically.
fn compare_distributor_ids(a: &str, b: &str) -> Ordering {
    match (a.trim().parse::<f64>(), b.trim().parse::<f64>()) {
        (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

fn fingerprint(headers: &[String], records: &[RawRecord]) -> u64 {
    let mut hasher = DefaultHasher::new();
    headers.hash(&mut hasher);
    for record in records {
        record.source_index.hash(&mut hasher);
        for cell in &record.cells {
            hash_raw_value(cell, &mut hasher);
        }
    }
    hasher.finish()
}

fn hash_raw_value<H: Hasher>(value: &RawValue, hasher: &mut H) {
    match value {
        RawValue::Missing => 0u8.hash(hasher),
        RawValue::Number(v) => {
            1u8.hash(hasher);
            v.to_bits().hash(hasher);
        }
        RawValue::Text(t) => {
            2u8.hash(hasher);
            t.hash(hasher);
        }
    }
}
