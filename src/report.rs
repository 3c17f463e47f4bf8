//! # Report Rendering
//!
//! Turns an [`EvaluationReport`] into the artefacts operators work with:
//!
//! | Function | Output |
//! |----------|--------|
//! | [`annotated_headers`] / [`annotated_rows`] | Input table plus one `Jarak {d} (m)` column per lag |
//! | [`pair_rows`] | The pair sheet ([`PAIR_HEADERS`]) |
//! | [`summary`] | Pair count and unique outlet count |
//! | [`render_letters`] | One notification letter per distributor with findings |
//!
//! Everything here is plain text; writers (CSV, spreadsheet, document)
//! decide how to present [`AnnotatedCell::highlighted`].

use std::collections::HashSet;
use std::fmt;

use crate::dataset::Dataset;
use crate::pipeline::{DistributorResult, EvaluationReport};

/// Column headers of the pair sheet.
pub const PAIR_HEADERS: [&str; 5] = ["Pangkalan 1", "Pangkalan 2", "Jarak (m)", "Nama Agen", "Field Jarak"];

/// Header of the lag column for lag `d`.
pub fn lag_column_name(lag: usize) -> String {
    format!("Jarak {} (m)", lag)
}

/// Distance as written to tables and letters: shortest exact decimal form.
pub fn format_meters(meters: f64) -> String {
    format!("{}", meters)
}

// ============================================================================
// Annotated table
// ============================================================================

/// One cell of the annotated table.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AnnotatedCell {
    pub text: String,
    /// Below-threshold distance, or an outlet that is part of a pair.
    pub highlighted: bool,
}

impl AnnotatedCell {
    fn plain(text: String) -> Self {
        Self { text, highlighted: false }
    }
}

/// Original headers followed by the lag columns.
pub fn annotated_headers(dataset: &Dataset, report: &EvaluationReport) -> Vec<String> {
    dataset
        .headers()
        .iter()
        .cloned()
        .chain((1..=report.effective_max_lag).map(lag_column_name))
        .collect()
}

/// Rows of the annotated table, distributor by distributor, each in
/// original row order.
///
/// Coordinate cells carry the cleaned value; rows the report does not know
/// about are skipped.
pub fn annotated_rows(dataset: &Dataset, report: &EvaluationReport) -> Vec<Vec<AnnotatedCell>> {
    let columns = dataset.columns();
    let width = dataset.headers().len();
    let threshold = report.config.threshold_meters;
    let mut rows = Vec::with_capacity(dataset.len());

    for distributor in &report.distributors {
        let involved: HashSet<&str> = distributor.detection.involved_outlets().into_iter().collect();

        for (position, &row) in distributor.rows.iter().enumerate() {
            let Some(record) = dataset.records().get(row) else {
                continue;
            };

            let mut cells: Vec<AnnotatedCell> = (0..width)
                .map(|i| AnnotatedCell::plain(record.cells.get(i).map(|c| c.display_text()).unwrap_or_default()))
                .collect();

            if let Some(Some(coordinate)) = report.coordinates.get(row) {
                cells[columns.latitude].text = coordinate.latitude.to_string();
                cells[columns.longitude].text = coordinate.longitude.to_string();
            }
            if involved.contains(record.outlet_name.as_str()) {
                cells[columns.outlet_name].highlighted = true;
            }

            cells.extend(distributor.lag_table.row_distances(position).into_iter().map(|d| match d {
                Some(meters) => AnnotatedCell { text: format_meters(meters), highlighted: meters < threshold },
                None => AnnotatedCell::plain(String::new()),
            }));

            rows.push(cells);
        }
    }

    rows
}

// ============================================================================
// Pair sheet & summary
// ============================================================================

/// Rows of the pair sheet, in the order of [`EvaluationReport::pairs`].
pub fn pair_rows(report: &EvaluationReport) -> Vec<Vec<String>> {
    report
        .pairs()
        .map(|pair| {
            vec![
                pair.outlet_1.clone(),
                pair.outlet_2.clone(),
                format_meters(pair.distance_meters),
                pair.distributor_name.clone(),
                pair.lag.to_string(),
            ]
        })
        .collect()
}

/// Totals shown under the pair sheet.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Summary {
    pub threshold_meters: f64,
    pub pair_count: usize,
    pub unique_outlets: usize,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Rekapitulasi:")?;
        writeln!(
            f,
            "Jumlah pasangan pangkalan dengan jarak di bawah {} meter: {}",
            format_meters(self.threshold_meters),
            self.pair_count
        )?;
        writeln!(f, "Jumlah pangkalan unik yang terlibat: {}", self.unique_outlets)
    }
}

pub fn summary(report: &EvaluationReport) -> Summary {
    Summary {
        threshold_meters: report.config.threshold_meters,
        pair_count: report.pairs().count(),
        unique_outlets: report.involved_outlet_count(),
    }
}

// ============================================================================
// Letters
// ============================================================================

/// Letterhead and signature text.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LetterConfig {
    /// Default: "Medan, Januari 2025"
    pub place_and_date: String,
    /// Default: "No. /PND430000/2025-S3"
    pub reference_number: String,
    /// Text after "Lampiran:". Default: empty
    pub attachment: String,
    /// Default: "Region Manager Retail Sales Sumbagut"
    pub signatory_title: String,
    /// Default: "Edith Indra Triyadi"
    pub signatory_name: String,
    /// Listed under "Tembusan:" when not empty.
    pub copy_recipients: Vec<String>,
}

impl Default for LetterConfig {
    fn default() -> Self {
        Self {
            place_and_date: "Medan, Januari 2025".to_string(),
            reference_number: "No. /PND430000/2025-S3".to_string(),
            attachment: String::new(),
            signatory_title: "Region Manager Retail Sales Sumbagut".to_string(),
            signatory_name: "Edith Indra Triyadi".to_string(),
            copy_recipients: Vec::new(),
        }
    }
}

/// A rendered notification letter.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Letter {
    pub distributor_id: String,
    pub file_name: String,
    pub body: String,
}

/// Title-case every word; a leading `"PT. "` is kept as written.
///
/// ```rust
/// use outlet_proximity::report::format_distributor_name;
///
/// assert_eq!(format_distributor_name("PT. SUMBER  GAS abadi"), "PT. Sumber Gas Abadi");
/// assert_eq!(format_distributor_name("cv maju JAYA"), "Cv Maju Jaya");
/// ```
pub fn format_distributor_name(name: &str) -> String {
    let (prefix, rest) = match name.strip_prefix("PT. ") {
        Some(rest) => ("PT. ", rest),
        None => ("", name),
    };
    let words: Vec<String> = rest.split_whitespace().map(capitalize).collect();
    format!("{}{}", prefix, words.join(" "))
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Letter file name; path separators and other reserved characters in the
/// distributor name become `_`.
pub fn letter_file_name(distributor_name: &str) -> String {
    let safe: String = distributor_name
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|') { '_' } else { c })
        .collect();
    format!("Evaluasi Data Pangkalan {}.txt", safe.trim())
}

/// Finding lines of one letter, numbered from 1.
fn finding_lines(distributor: &DistributorResult, group_by_cluster: bool) -> Vec<String> {
    if group_by_cluster {
        distributor
            .clusters
            .iter()
            .map(|cluster| format!("{}. Pangkalan {}", cluster.number, cluster.outlets.join(", Pangkalan ")))
            .collect()
    } else {
        distributor
            .pairs()
            .iter()
            .enumerate()
            .map(|(i, pair)| {
                format!(
                    "{}. Pangkalan {} dengan Pangkalan {}, jarak {} meter",
                    i + 1,
                    pair.outlet_1,
                    pair.outlet_2,
                    format_meters(pair.distance_meters)
                )
            })
            .collect()
    }
}

/// Render the letter for one distributor, or `None` if it has no finding.
pub fn render_letter(
    distributor: &DistributorResult,
    threshold_meters: f64,
    group_by_cluster: bool,
    letter: &LetterConfig,
) -> Option<Letter> {
    if !distributor.has_hits() {
        return None;
    }
    let name = format_distributor_name(&distributor.distributor_name);

    let mut lines = vec![
        letter.place_and_date.clone(),
        letter.reference_number.clone(),
        format!("Lampiran: {}", letter.attachment).trim_end().to_string(),
        format!("Perihal: Evaluasi Data Pangkalan {} pada SIMELON", name),
        String::new(),
        "Yang terhormat".to_string(),
        format!("Pimpinan {}", name),
        "Di Tempat".to_string(),
        String::new(),
        "Dengan hormat,".to_string(),
        String::new(),
        "Dalam rangka menjamin kemudahan akses masyarakat untuk mendapatkan LPG 3 Kg, kami telah melakukan \
         evaluasi titik lokasi pangkalan Saudara yang terdaftar pada SIMELON."
            .to_string(),
        String::new(),
        format!(
            "Hasil evaluasi tersebut ditemukan bahwa terdapat pangkalan dengan titik lokasi dibawah {} meter yaitu:",
            format_meters(threshold_meters)
        ),
    ];
    lines.extend(finding_lines(distributor, group_by_cluster));
    lines.extend([
        String::new(),
        "Sehubungan dengan hal tersebut, maka kami minta Saudara melakukan evaluasi berupa:".to_string(),
        "1. Memastikan kembali titik lokasi pangkalan sesuai dengan kondisi riil lapangan dan mengupdate pada \
         Web SIMELON."
            .to_string(),
        "2. Apabila pangkalan benar pada titik lokasi yang sama, maka segera lakukan pemindahan lokasi salah \
         satu pangkalan."
            .to_string(),
        String::new(),
        "Selanjutnya agar Saudara segera menindaklanjuti temuan tersebut dan melaporkan kembali kepada kami \
         dalam waktu 1 bulan kedepan."
            .to_string(),
        String::new(),
        "Demikian disampaikan, atas perhatian dan kerjasamanya kami ucapkan terima kasih.".to_string(),
        String::new(),
        letter.signatory_title.clone(),
        letter.signatory_name.clone(),
    ]);
    if !letter.copy_recipients.is_empty() {
        lines.push(String::new());
        lines.push("Tembusan:".to_string());
        lines.extend(letter.copy_recipients.iter().enumerate().map(|(i, r)| format!("{}. {}", i + 1, r)));
    }

    let mut body = lines.join("\n");
    body.push('\n');

    Some(Letter {
        distributor_id: distributor.distributor_id.clone(),
        file_name: letter_file_name(&distributor.distributor_name),
        body,
    })
}

/// Letters for every distributor with findings, in group order.
pub fn render_letters(report: &EvaluationReport, letter: &LetterConfig) -> Vec<Letter> {
    report
        .distributors
        .iter()
        .filter_map(|d| render_letter(d, report.config.threshold_meters, report.config.group_by_cluster, letter))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::RawRecord;
    use crate::pipeline::{evaluate, Evaluation};
    use crate::EvaluationConfig;

    fn medan() -> Dataset {
        Dataset::from_records(vec![
            RawRecord::new(0, "1001", "PT. SUMBER GAS", "Pangkalan B", "3.5952", "98.6722"),
            RawRecord::new(1, "1001", "PT. SUMBER GAS", "Pangkalan A", "3,5953", "98.6722"),
            RawRecord::new(2, "1001", "PT. SUMBER GAS", "Pangkalan C", "3.6500", "98.7000"),
            RawRecord::new(3, "1002", "cv maju", "Pangkalan D", "3.7000", "98.7000"),
        ])
    }

    fn run(dataset: &Dataset, config: &EvaluationConfig) -> EvaluationReport {
        match evaluate(dataset, config).unwrap() {
            Evaluation::Completed(report) => report,
            Evaluation::Blocked(v) => panic!("blocked: {:?}", v.outcome),
        }
    }

    #[test]
    fn test_annotated_table() {
        let ds = medan();
        let report = run(&ds, &EvaluationConfig { max_lag: 2, ..Default::default() });

        let headers = annotated_headers(&ds, &report);
        assert_eq!(headers.len(), 7);
        assert_eq!(headers[5], "Jarak 1 (m)");
        assert_eq!(headers[6], "Jarak 2 (m)");

        let rows = annotated_rows(&ds, &report);
        assert_eq!(rows.len(), 4);
        // Repaired coordinate replaces the raw text
        assert_eq!(rows[1][3].text, "3.5953");
        assert!(rows[1][2].highlighted);
        assert!(!rows[2][2].highlighted);
        assert_eq!(rows[1][5].text, "11.12");
        assert!(rows[1][5].highlighted);
        assert_eq!(rows[0][5].text, "");
        assert!(!rows[2][5].highlighted);
        // Single-outlet distributor: no distances
        assert!(rows[3][5].text.is_empty() && rows[3][6].text.is_empty());
    }

    #[test]
    fn test_pair_rows_and_summary() {
        let ds = medan();
        let report = run(&ds, &EvaluationConfig::default());
        let rows = pair_rows(&report);
        assert_eq!(rows, vec![vec!["Pangkalan B", "Pangkalan A", "11.12", "PT. SUMBER GAS", "1"]]);

        let s = summary(&report);
        assert_eq!((s.pair_count, s.unique_outlets), (1, 2));
        assert_eq!(
            s.to_string(),
            "Rekapitulasi:\nJumlah pasangan pangkalan dengan jarak di bawah 100 meter: 1\n\
             Jumlah pangkalan unik yang terlibat: 2\n"
        );
    }

    #[test]
    fn test_cluster_letter() {
        let report = run(&medan(), &EvaluationConfig::default());
        let letters = render_letters(&report, &LetterConfig::default());
        assert_eq!(letters.len(), 1);
        let letter = &letters[0];
        assert_eq!(letter.file_name, "Evaluasi Data Pangkalan PT. SUMBER GAS.txt");
        assert!(letter.body.starts_with("Medan, Januari 2025\nNo. /PND430000/2025-S3\nLampiran:\n"));
        assert!(letter.body.contains("Perihal: Evaluasi Data Pangkalan PT. Sumber Gas pada SIMELON"));
        assert!(letter.body.contains("dibawah 100 meter yaitu:\n1. Pangkalan Pangkalan A, Pangkalan Pangkalan B\n"));
        assert!(letter.body.ends_with("Edith Indra Triyadi\n"));
    }

    #[test]
    fn test_pair_letter_with_copies() {
        let config = EvaluationConfig { group_by_cluster: false, ..Default::default() };
        let report = run(&medan(), &config);
        let letter_config = LetterConfig { copy_recipients: vec!["Arsip".to_string()], ..Default::default() };
        let letter = render_letter(&report.distributors[0], 100.0, false, &letter_config).unwrap();
        assert!(letter
            .body
            .contains("1. Pangkalan Pangkalan B dengan Pangkalan Pangkalan A, jarak 11.12 meter\n"));
        assert!(letter.body.ends_with("Tembusan:\n1. Arsip\n"));
        assert!(render_letter(&report.distributors[1], 100.0, false, &letter_config).is_none());
    }

    #[test]
    fn test_duplicate_outlet_letter_names_the_outlet() {
        let ds = Dataset::from_records(vec![
            RawRecord::new(0, "1", "PT. GANDA", "Pangkalan X", "3.5952", "98.6722"),
            RawRecord::new(1, "1", "PT. GANDA", "Pangkalan X", "3.5952", "98.6722"),
        ]);
        let report = run(&ds, &EvaluationConfig::default());
        assert_eq!(report.pairs().count(), 1);
        assert_eq!(report.clusters().count(), 1);

        let letters = render_letters(&report, &LetterConfig::default());
        assert_eq!(letters.len(), 1);
        assert!(letters[0]
            .body
            .contains("dibawah 100 meter yaitu:\n1. Pangkalan Pangkalan X\n\nSehubungan"));
    }

    #[test]
    fn test_format_distributor_name() {
        assert_eq!(format_distributor_name("PT. SUMBER GAS"), "PT. Sumber Gas");
        assert_eq!(format_distributor_name("PT.ABADI"), "Pt.abadi");
        assert_eq!(format_distributor_name("  cv  maju "), "Cv Maju");
        assert_eq!(format_distributor_name(""), "");
    }

    #[test]
    fn test_letter_file_name_is_path_safe() {
        assert_eq!(letter_file_name("PT. A/B"), "Evaluasi Data Pangkalan PT. A_B.txt");
    }
}
