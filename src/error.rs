//! Error types shared by the loader and the analysis stages.

use std::path::PathBuf;
use thiserror::Error;

/// Failures that abort an analysis run.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("failed to load data: {0}")]
    DataLoad(#[from] DataLoadError),

    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("degenerate input: {0}")]
    DegenerateInput(String),

    #[error("green area exceeds total area for: {}", districts.join(", "))]
    InconsistentArea { districts: Vec<String> },
}

/// Reasons the input table could not be produced.
#[derive(Debug, Error)]
pub enum DataLoadError {
    #[error("input file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("unsupported input format '{0}' (expected xlsx, xlsm, xlsb, xls, ods or csv)")]
    UnsupportedFormat(String),

    #[error("could not open workbook {}: {source}", path.display())]
    Workbook {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    #[error("could not read csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("sheet '{sheet}' not found (available: {})", available.join(", "))]
    MissingSheet {
        sheet: String,
        available: Vec<String>,
    },

    #[error("sheet has no header row")]
    Empty,

    #[error("missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("row {row}: cannot parse '{value}' in column '{column}' as a number")]
    InvalidNumber {
        row: usize,
        column: &'static str,
        value: String,
    },
}
