//! CSV loading.
//!
//! Every non-empty cell is kept as [`RawValue::Text`]; typing happens in the
//! coordinate normalizer, so a malformed latitude is reported rather than
//! rejected by the reader.

use std::fs;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use log::{debug, info};

use super::{ColumnMapping, Dataset};
use crate::error::LoadError;
use crate::RawValue;

/// Text encoding of the uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Utf8,
    /// ISO-8859-1; each byte maps to the code point of the same value.
    Latin1,
}

impl FromStr for Encoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "utf-8" | "utf8" => Ok(Encoding::Utf8),
            "latin1" | "latin-1" | "iso-8859-1" => Ok(Encoding::Latin1),
            other => Err(format!("unsupported encoding '{}' (use utf-8 or latin1)", other)),
        }
    }
}

impl Encoding {
    fn decode(self, bytes: Vec<u8>) -> Result<String, LoadError> {
        let text = match self {
            Encoding::Utf8 => String::from_utf8(bytes).map_err(|_| LoadError::Encoding)?,
            Encoding::Latin1 => bytes.into_iter().map(char::from).collect(),
        };
        Ok(text.strip_prefix('\u{feff}').map(str::to_string).unwrap_or(text))
    }
}

/// Load a dataset from any CSV reader.
///
/// The first record is the header row. Rows may be ragged; missing trailing
/// cells are treated as empty.
///
/// # Example
/// ```
/// use outlet_proximity::{load_csv, ColumnMapping, Encoding};
///
/// let csv = "agen,nama,pangkalan,lat,lon\n1001,PT. A,P1,\"3,5952\",98.6722\n";
/// let mapping = ColumnMapping::named("agen", "nama", "pangkalan", "lat", "lon");
/// let dataset = load_csv(csv.as_bytes(), "upload.csv", Encoding::Utf8, &mapping).unwrap();
/// assert_eq!(dataset.len(), 1);
/// ```
pub fn load_csv<R: Read>(
    mut reader: R,
    label: &str,
    encoding: Encoding,
    mapping: &ColumnMapping,
) -> Result<Dataset, LoadError> {
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .map_err(|source| LoadError::Io { path: label.to_string(), source })?;
    let text = encoding.decode(bytes)?;

    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = csv_reader
        .headers()
        .map_err(|source| LoadError::Csv { line: 1, source })?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut rows = Vec::new();
    for (index, result) in csv_reader.records().enumerate() {
        let record = result.map_err(|source| LoadError::Csv {
            line: source.position().map_or(index as u64 + 2, |p| p.line()),
            source,
        })?;
        rows.push(record.iter().map(RawValue::from).collect::<Vec<_>>());
    }

    debug!("[Load] {}: {} header columns, {} rows", label, headers.len(), rows.len());
    let dataset = Dataset::from_table(label, headers, rows, mapping)?;
    info!("[Load] Loaded {} rows from {}", dataset.len(), label);
    Ok(dataset)
}

/// Load a dataset from a CSV file; the file name becomes the dataset label.
pub fn load_csv_file(path: &Path, encoding: Encoding, mapping: &ColumnMapping) -> Result<Dataset, LoadError> {
    let display = path.display().to_string();
    let file = fs::File::open(path).map_err(|source| LoadError::Io { path: display.clone(), source })?;
    let label = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or(display);
    load_csv(file, &label, encoding, mapping)
}
