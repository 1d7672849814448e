use camino::Utf8PathBuf;
use thiserror::Error;

use crate::spec_table::RowError;

#[derive(Error, Debug)]
pub enum CksError {
    #[error("Decryption failed: {0}")]
    Decryption(String),

    #[error("Decrypted payload is not valid UTF-8: {0}")]
    InvalidPlaintext(#[from] std::string::FromUtf8Error),

    #[error("Error during the spectroscopic table parsing: {0}")]
    Parse(RowError),

    #[error("Catalog entry not found for object {id} (catalog key: {key})")]
    CatalogLookup { id: u32, key: String },

    #[error("Object {0} is not present in the spectroscopic table")]
    RecordNotFound(u32),

    #[error("Sample set not found: {0}")]
    SampleSetMissing(Utf8PathBuf),

    #[error("Invalid sample set {path}: {reason}")]
    SampleSetFormat { path: Utf8PathBuf, reason: String },

    #[error("Invalid summary file {path}: {reason}")]
    InvalidSummaryFile { path: Utf8PathBuf, reason: String },

    #[error("Unable to compute quantiles for column '{column}': {reason}")]
    QuantileComputation { column: String, reason: String },

    #[error("Invalid quantile level: {0} (expected a value in (0, 1))")]
    InvalidQuantile(f64),

    #[error("Invalid column pattern: {0}")]
    InvalidColumnPattern(#[from] regex::Error),

    #[error("Invalid summary configuration: {0}")]
    InvalidConfig(String),

    #[error("Duplicate object id in summary table: {0}")]
    DuplicateId(String),

    #[error("Quantile extraction failed for object {id}: {source}")]
    Extraction {
        id: String,
        #[source]
        source: Box<CksError>,
    },

    #[error("Unable to perform file operation: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Parquet error: {0}")]
    ParquetError(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    ArrowError(#[from] arrow_schema::ArrowError),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("JSON configuration error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Unable to build the worker pool: {0}")]
    ThreadPoolError(#[from] rayon::ThreadPoolBuildError),
}

impl From<tempfile::PersistError> for CksError {
    fn from(err: tempfile::PersistError) -> Self {
        CksError::IoError(err.error)
    }
}

impl CksError {
    /// Attach the failing object id to an extraction error.
    pub(crate) fn for_object(self, id: &str) -> Self {
        match self {
            CksError::Extraction { .. } => self,
            other => CksError::Extraction {
                id: id.to_string(),
                source: Box::new(other),
            },
        }
    }
}

impl PartialEq for CksError {
    fn eq(&self, other: &Self) -> bool {
        use CksError::*;
        match (self, other) {
            (Decryption(a), Decryption(b)) => a == b,
            (Parse(a), Parse(b)) => a == b,
            (CatalogLookup { id: a, key: ka }, CatalogLookup { id: b, key: kb }) => {
                a == b && ka == kb
            }
            (RecordNotFound(a), RecordNotFound(b)) => a == b,
            (SampleSetMissing(a), SampleSetMissing(b)) => a == b,
            (SampleSetFormat { path: a, .. }, SampleSetFormat { path: b, .. }) => a == b,
            (InvalidSummaryFile { path: a, .. }, InvalidSummaryFile { path: b, .. }) => a == b,
            (
                QuantileComputation { column: a, .. },
                QuantileComputation { column: b, .. },
            ) => a == b,
            (InvalidQuantile(a), InvalidQuantile(b)) => a == b,
            (InvalidConfig(a), InvalidConfig(b)) => a == b,
            (DuplicateId(a), DuplicateId(b)) => a == b,
            (Extraction { id: a, source: sa }, Extraction { id: b, source: sb }) => {
                a == b && sa == sb
            }

            // Wrapped foreign errors only compare by variant
            (InvalidPlaintext(_), InvalidPlaintext(_)) => true,
            (InvalidColumnPattern(_), InvalidColumnPattern(_)) => true,
            (IoError(_), IoError(_)) => true,
            (ParquetError(_), ParquetError(_)) => true,
            (ArrowError(_), ArrowError(_)) => true,
            (CsvError(_), CsvError(_)) => true,
            (JsonError(_), JsonError(_)) => true,
            (ThreadPoolError(_), ThreadPoolError(_)) => true,

            _ => false,
        }
    }
}
