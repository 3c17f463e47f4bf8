//! `outlet-proximity` command-line shell.
//!
//! ```text
//! outlet-proximity validate data.csv
//! outlet-proximity evaluate data.csv --threshold 100 --max-lag 10 --out hasil/
//! ```
//!
//! Logging follows `RUST_LOG` (default `info`).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use log::{info, warn};
use serde::Deserialize;
use thiserror::Error;

use outlet_proximity::report::{
    annotated_headers, annotated_rows, pair_rows, render_letters, summary, PAIR_HEADERS,
};
use outlet_proximity::validation::{run_gate, ValidationReport};
use outlet_proximity::{
    evaluate, load_csv_file, ColumnMapping, ConfigError, Dataset, Encoding, Evaluation, EvaluationConfig,
    LetterConfig, LoadError, ScanMode,
};

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid --columns mapping: {0}")]
    Columns(#[source] serde_json::Error),

    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid config {path}: {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to write CSV {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("failed to serialize report: {0}")]
    Json(#[source] serde_json::Error),
}

#[derive(Debug, Parser)]
#[command(name = "outlet-proximity", version)]
#[command(about = "Validate outlet coordinates and flag outlets that sit too close together")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Report invalid and unrepairable coordinates
    Validate(InputArgs),
    /// Compute lag distances, pairs, clusters and letters
    Evaluate(EvaluateArgs),
}

#[derive(Debug, Args)]
struct InputArgs {
    /// Distributor upload (CSV, header on the first line)
    input: PathBuf,

    /// Input text encoding: utf-8 or latin1
    #[arg(long, env = "OUTLET_PROXIMITY_ENCODING", default_value = "utf-8")]
    encoding: Encoding,

    /// Column mapping as JSON, e.g. {"distributor_id":0,...,"latitude":"Lat"}
    #[arg(long, env = "OUTLET_PROXIMITY_COLUMNS")]
    columns: Option<String>,

    /// JSON file with "evaluation", "letter" and "columns" sections
    #[arg(long, env = "OUTLET_PROXIMITY_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct EvaluateArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Distance threshold in meters (strictly below is flagged)
    #[arg(long, env = "OUTLET_PROXIMITY_THRESHOLD")]
    threshold: Option<f64>,

    /// Number of lag columns
    #[arg(long, env = "OUTLET_PROXIMITY_MAX_LAG")]
    max_lag: Option<usize>,

    /// List raw pairs in letters instead of clusters
    #[arg(long)]
    pairs_only: bool,

    /// Compare every pair of outlets, not just the lag window
    #[arg(long)]
    exhaustive: bool,

    /// Block instead of repairing invalid coordinates
    #[arg(long)]
    no_auto_repair: bool,

    /// Output directory
    #[arg(long, env = "OUTLET_PROXIMITY_OUT", default_value = "hasil")]
    out: PathBuf,
}

/// Contents of a `--config` file. Every section is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    evaluation: EvaluationConfig,
    letter: LetterConfig,
    columns: Option<ColumnMapping>,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Validate(args) => run_validate(&args),
        Commands::Evaluate(args) => run_evaluate(&args),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(args: &InputArgs) -> Result<ConfigFile, CliError> {
    let mut config = match &args.config {
        Some(path) => {
            let display = path.display().to_string();
            let text = fs::read_to_string(path).map_err(|source| CliError::ConfigRead { path: display.clone(), source })?;
            serde_json::from_str(&text).map_err(|source| CliError::ConfigParse { path: display, source })?
        }
        None => ConfigFile::default(),
    };
    if let Some(json) = &args.columns {
        config.columns = Some(serde_json::from_str(json).map_err(CliError::Columns)?);
    }
    Ok(config)
}

fn load_dataset(args: &InputArgs, mapping: &ColumnMapping) -> Result<Dataset, CliError> {
    Ok(load_csv_file(&args.input, args.encoding, mapping)?)
}

fn print_validation(report: &ValidationReport) {
    if report.invalid.is_empty() {
        println!("Semua koordinat valid.");
    } else {
        println!("Koordinat tidak valid ({} baris):", report.invalid.len());
        for row in &report.invalid {
            println!(
                "  Baris {}: {} ({} / {}) {:?}: {}",
                row.row_number,
                row.outlet_name,
                row.distributor_id,
                row.distributor_name,
                row.field,
                row.reason_text()
            );
        }
    }
    if !report.unrepairable.is_empty() {
        println!("Tidak dapat diperbaiki ({} baris):", report.unrepairable.len());
        for row in &report.unrepairable {
            println!(
                "  Baris {}: {} ({} / {})",
                row.row_number, row.outlet_name, row.distributor_id, row.distributor_name
            );
        }
    }
    if !report.out_of_range_rows.is_empty() {
        println!("Di luar rentang derajat: baris {:?}", report.out_of_range_rows);
    }
}

fn run_validate(args: &InputArgs) -> Result<ExitCode, CliError> {
    let config = load_config(args)?;
    let dataset = load_dataset(args, &config.columns.unwrap_or_default())?;
    let gate = run_gate(&dataset, true);
    print_validation(&gate.report);

    Ok(if gate.report.unrepairable.is_empty() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn run_evaluate(args: &EvaluateArgs) -> Result<ExitCode, CliError> {
    let file = load_config(&args.input)?;
    let mut config = file.evaluation;
    if let Some(threshold) = args.threshold {
        config.threshold_meters = threshold;
    }
    if let Some(max_lag) = args.max_lag {
        config.max_lag = max_lag;
    }
    if args.pairs_only {
        config.group_by_cluster = false;
    }
    if args.exhaustive {
        config.scan_mode = ScanMode::Exhaustive;
    }
    if args.no_auto_repair {
        config.auto_repair = false;
    }

    let dataset = load_dataset(&args.input, &file.columns.unwrap_or_default())?;
    let evaluation = evaluate(&dataset, &config)?;

    create_dir(&args.out)?;
    let json = serde_json::to_string_pretty(&evaluation).map_err(CliError::Json)?;
    write_text(&args.out.join("report.json"), &json)?;

    let report = match &evaluation {
        Evaluation::Completed(report) => report,
        Evaluation::Blocked(validation) => {
            print_validation(validation);
            warn!("Evaluation blocked ({:?}); only report.json was written", validation.outcome);
            return Ok(ExitCode::from(2));
        }
    };

    let headers = annotated_headers(&dataset, report);
    let rows: Vec<Vec<String>> = annotated_rows(&dataset, report)
        .into_iter()
        .map(|row| row.into_iter().map(|cell| cell.text).collect())
        .collect();
    write_csv(&args.out.join("hasil_jarak.csv"), &headers, &rows)?;

    let pair_headers: Vec<String> = PAIR_HEADERS.iter().map(|h| h.to_string()).collect();
    write_csv(&args.out.join("rekap_pasangan.csv"), &pair_headers, &pair_rows(report))?;

    let totals = summary(report);
    write_text(&args.out.join("rekap.txt"), &totals.to_string())?;
    print!("{}", totals);

    let letters = render_letters(report, &file.letter);
    let letter_dir = args.out.join("surat");
    create_dir(&letter_dir)?;
    for letter in &letters {
        write_text(&letter_dir.join(&letter.file_name), &letter.body)?;
    }

    info!(
        "Wrote {} rows, {} pairs and {} letters to {}",
        rows.len(),
        totals.pair_count,
        letters.len(),
        args.out.display()
    );
    Ok(ExitCode::SUCCESS)
}

fn create_dir(path: &Path) -> Result<(), CliError> {
    fs::create_dir_all(path).map_err(|source| CliError::Write { path: path.display().to_string(), source })
}

fn write_text(path: &Path, text: &str) -> Result<(), CliError> {
    fs::write(path, text).map_err(|source| CliError::Write { path: path.display().to_string(), source })
}

fn write_csv(path: &Path, headers: &[String], rows: &[Vec<String>]) -> Result<(), CliError> {
    let display = path.display().to_string();
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|source| CliError::Csv { path: display.clone(), source })?;
    writer
        .write_record(headers)
        .map_err(|source| CliError::Csv { path: display.clone(), source })?;
    for row in rows {
        writer
            .write_record(row)
            .map_err(|source| CliError::Csv { path: display.clone(), source })?;
    }
    writer.flush().map_err(|source| CliError::Write { path: display, source })
}
