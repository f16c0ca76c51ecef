use std::thread;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use log::{debug, error, info};

use super::bundle::ArtifactBundle;
use super::error::PipelineError;
use super::inference::{infer, PredictionResult};
use super::preprocess::prepare_projected;
use super::utils::parse_decimal;

/// Column names appended to the augmented table
pub const PREDICTION_COLUMN: &str = "Prediksi";
pub const PROBABILITY_COLUMN: &str = "Probabilitas WTP";
pub const CORRECT_COLUMN: &str = "Benar";

/// How a delimited indicator table is written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableFormat {
    /// Cell delimiter, e.g. `,` or `;`
    pub delimiter: char,
    /// Decimal separator used in numeric cells, e.g. `.` or `,`
    pub decimal_separator: char,
    /// Optional digit-group separator stripped before parsing
    pub thousands_separator: Option<char>,
    /// Header name of the ground-truth label column
    pub target_column: String,
}

impl Default for TableFormat {
    fn default() -> Self {
        Self {
            delimiter: ',',
            decimal_separator: '.',
            thousands_separator: None,
            target_column: "WTP".to_string(),
        }
    }
}

impl TableFormat {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.delimiter == self.decimal_separator {
            return Err(PipelineError::ValidationError(
                format!("Delimiter and decimal separator are both '{}'", self.delimiter)
            ));
        }
        if let Some(sep) = self.thousands_separator {
            if sep == self.delimiter || sep == self.decimal_separator {
                return Err(PipelineError::ValidationError(
                    format!("Thousands separator '{}' clashes with another separator", sep)
                ));
            }
        }
        if self.target_column.trim().is_empty() {
            return Err(PipelineError::ValidationError("Target column name cannot be empty".into()));
        }
        Ok(())
    }

    /// Parses one numeric cell written in this format; `None` for anything
    /// that is not a finite number
    pub fn parse_number(&self, raw: &str) -> Option<f64> {
        parse_decimal(raw, self.decimal_separator, self.thousands_separator)
    }

    fn split<'a>(&self, line: &'a str) -> Vec<&'a str> {
        line.split(self.delimiter)
            .map(|cell| {
                let cell = cell.trim();
                cell.strip_prefix('"')
                    .and_then(|c| c.strip_suffix('"'))
                    .unwrap_or(cell)
            })
            .collect()
    }

    fn format_number(&self, value: f64) -> String {
        let text = format!("{:.4}", value);
        if self.decimal_separator == '.' {
            text
        } else {
            text.replace('.', &self.decimal_separator.to_string())
        }
    }
}

/// A header plus rows of raw text cells.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkTable {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl BulkTable {
    /// Builds a table from already-split cells; every row must match the header width
    pub fn from_rows(header: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self, PipelineError> {
        if header.is_empty() {
            return Err(PipelineError::EmptyInputError("Table has no header".into()));
        }
        for (idx, row) in rows.iter().enumerate() {
            if row.len() != header.len() {
                return Err(PipelineError::MalformedDataError {
                    row: idx + 1,
                    column: "*".into(),
                    value: format!("{} cells, expected {}", row.len(), header.len()),
                });
            }
        }
        Ok(Self { header, rows })
    }

    /// Parses delimited text. The first non-blank line is the header.
    pub fn parse(raw: &str, format: &TableFormat) -> Result<Self, PipelineError> {
        format.validate()?;
        let mut lines = raw.lines()
            .map(|line| line.trim_end_matches('\r'))
            .filter(|line| !line.trim().is_empty());

        let header_line = lines.next()
            .ok_or_else(|| PipelineError::EmptyInputError("Table has no header".into()))?;
        // Spreadsheet exports often start with a byte-order mark
        let header_line = header_line.trim_start_matches('\u{feff}');
        let header: Vec<String> = format.split(header_line).into_iter().map(String::from).collect();

        let rows = lines
            .map(|line| format.split(line).into_iter().map(String::from).collect())
            .collect();
        Self::from_rows(header, rows)
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h == name)
    }
}

/// One table row with its prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRow {
    /// Original cells, unchanged
    pub cells: Vec<String>,
    pub truth: u8,
    pub prediction: PredictionResult,
    pub correct: bool,
}

/// Result of scoring a labeled table.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkReport {
    pub header: Vec<String>,
    pub rows: Vec<ScoredRow>,
    pub correct: usize,
    /// `correct / rows.len()`, always within [0, 1]
    pub accuracy: f64,
}

impl BulkReport {
    pub fn total(&self) -> usize {
        self.rows.len()
    }

    /// Header of the augmented table: original columns plus prediction columns
    pub fn augmented_header(&self) -> Vec<String> {
        let mut header = self.header.clone();
        header.extend([PREDICTION_COLUMN, PROBABILITY_COLUMN, CORRECT_COLUMN].map(String::from));
        header
    }

    /// Renders the augmented table in the given format
    pub fn to_delimited(&self, format: &TableFormat) -> String {
        let delimiter = format.delimiter.to_string();
        let mut out = self.augmented_header().join(&delimiter);
        out.push('\n');
        for row in &self.rows {
            let mut cells = row.cells.clone();
            cells.push(row.prediction.label.to_string());
            cells.push(format.format_number(row.prediction.probability_positive));
            cells.push(if row.correct { "Ya" } else { "Tidak" }.to_string());
            out.push_str(&cells.join(&delimiter));
            out.push('\n');
        }
        out
    }
}

struct ParsedRow {
    values: Array1<f64>,
    truth: u8,
}

/// Locates every feature column and the target column, reporting all that are missing
fn resolve_columns(bundle: &ArtifactBundle, table: &BulkTable, format: &TableFormat) -> Result<(Vec<usize>, usize), PipelineError> {
    let mut missing = Vec::new();
    let features: Vec<usize> = bundle.features().iter()
        .filter_map(|name| {
            let idx = table.column_index(name);
            if idx.is_none() {
                missing.push(name.clone());
            }
            idx
        })
        .collect();
    let target = table.column_index(&format.target_column);
    if target.is_none() {
        missing.push(format.target_column.clone());
    }
    match target {
        Some(target) if missing.is_empty() => Ok((features, target)),
        _ => {
            error!("Table is missing {} required column(s)", missing.len());
            Err(PipelineError::SchemaMismatchError(missing))
        }
    }
}

fn parse_row(
    row_number: usize,
    cells: &[String],
    header: &[String],
    feature_columns: &[usize],
    target_column: usize,
    format: &TableFormat,
) -> Result<ParsedRow, PipelineError> {
    let malformed = |col: usize| PipelineError::MalformedDataError {
        row: row_number,
        column: header[col].clone(),
        value: cells[col].clone(),
    };

    let mut values = Vec::with_capacity(feature_columns.len());
    for &col in feature_columns {
        let cell = cells[col].as_str();
        if cell.is_empty() {
            values.push(f64::NAN);
            continue;
        }
        match format.parse_number(cell) {
            Some(v) => values.push(v),
            _ => return Err(malformed(col)),
        }
    }

    let truth = match format.parse_number(&cells[target_column]) {
        Some(v) if v == 0.0 => 0,
        Some(v) if v == 1.0 => 1,
        _ => return Err(malformed(target_column)),
    };

    Ok(ParsedRow { values: Array1::from(values), truth })
}

fn resolve_workers(requested: usize, rows: usize) -> usize {
    let workers = if requested == 0 {
        thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
    } else {
        requested
    };
    workers.clamp(1, rows.max(1))
}

/// Unwraps a joined worker, turning a panic into `WorkerError`
fn worker_result<T>(joined: thread::Result<T>) -> Result<T, PipelineError> {
    joined.map_err(|payload| {
        let reason = payload.downcast_ref::<&str>().map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        error!("Bulk scoring worker panicked: {}", reason);
        PipelineError::WorkerError(reason)
    })
}

/// Scores every row of a labeled table and reports accuracy.
///
/// The whole batch fails on the first schema or cell problem; no partial
/// report is produced. Rows are scored independently, split over `workers`
/// scoped threads (0 picks the available parallelism), and the report keeps
/// input order whatever the worker count.
pub fn evaluate(
    bundle: &ArtifactBundle,
    table: &BulkTable,
    format: &TableFormat,
    workers: usize,
) -> Result<BulkReport, PipelineError> {
    format.validate()?;
    let (feature_columns, target_column) = resolve_columns(bundle, table, format)?;
    if table.is_empty() {
        return Err(PipelineError::EmptyInputError("Table has no data rows".into()));
    }

    let parsed = table.rows().iter()
        .enumerate()
        .map(|(idx, cells)| parse_row(idx + 1, cells, table.header(), &feature_columns, target_column, format))
        .collect::<Result<Vec<_>, _>>()?;

    let workers = resolve_workers(workers, parsed.len());
    let chunk_size = parsed.len().div_ceil(workers);
    debug!("Scoring {} row(s) on {} worker(s)", parsed.len(), workers);

    let predictions: Vec<PredictionResult> = thread::scope(|scope| {
        let handles: Vec<_> = parsed.chunks(chunk_size)
            .map(|part| {
                scope.spawn(move || {
                    part.iter()
                        .map(|row| infer(bundle.model(), &prepare_projected(bundle, row.values.clone())))
                        .collect::<Result<Vec<_>, _>>()
                })
            })
            .collect();

        let mut predictions = Vec::with_capacity(parsed.len());
        for handle in handles {
            predictions.extend(worker_result(handle.join())??);
        }
        Ok::<_, PipelineError>(predictions)
    })?;

    let rows: Vec<ScoredRow> = table.rows().iter()
        .zip(&parsed)
        .zip(predictions)
        .map(|((cells, parsed), prediction)| ScoredRow {
            cells: cells.clone(),
            truth: parsed.truth,
            correct: prediction.label == parsed.truth,
            prediction,
        })
        .collect();

    let correct = rows.iter().filter(|r| r.correct).count();
    let accuracy = correct as f64 / rows.len() as f64;
    info!("Bulk evaluation: {}/{} correct (accuracy {:.2}%)", correct, rows.len(), accuracy * 100.0);

    Ok(BulkReport {
        header: table.header().to_vec(),
        rows,
        correct,
        accuracy,
    })
}
