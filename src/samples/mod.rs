//! # Posterior sample sets
//!
//! A **sample set** is the table of independent posterior draws written by the stellar model
//! fit of one object: one column per model variable (e.g. `mass_0`, `radius_0`, `Teff_0`,
//! `age`, `AV`), one row per draw. Column names are free-form; the quantile extractor finds
//! the variables it needs by pattern matching.
//!
//! Sample sets live in a model directory, one file per object named `{id}.{ext}`:
//!
//! * [`SampleFormat::Parquet`] – `{id}.parquet`, numeric Arrow columns
//!   (`Float64`, `Float32`, `Int64`, `Int32`, `UInt32`), see [`parquet_reader`].
//! * [`SampleFormat::Csv`] – `{id}.csv` with a header row, see [`csv_reader`].
//!
//! Missing draws (Arrow nulls, empty or `nan` CSV cells) are stored as `NaN`. Columns whose
//! type is not numeric are kept as [`ColumnValues::NonNumeric`] so that requesting them
//! fails loudly at quantile time instead of disappearing.
pub mod csv_reader;
pub mod parquet_reader;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::cks_errors::CksError;

/// On-disk format of the sample sets of a model directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleFormat {
    #[default]
    Parquet,
    Csv,
}

impl SampleFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            SampleFormat::Parquet => "parquet",
            SampleFormat::Csv => "csv",
        }
    }

    /// Path of the sample set of `id` inside `directory`.
    pub fn path_for(&self, directory: &Utf8Path, id: &str) -> Utf8PathBuf {
        directory.join(format!("{id}.{}", self.extension()))
    }

    fn read(&self, path: &Utf8Path, id: &str) -> Result<SampleSet, CksError> {
        match self {
            SampleFormat::Parquet => parquet_reader::read_parquet_samples(path, id),
            SampleFormat::Csv => csv_reader::read_csv_samples(path, id),
        }
    }
}

/// Draws of one column.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues {
    Numeric(Vec<f64>),
    /// Non numeric column; payload names the stored type.
    NonNumeric(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SampleColumn {
    pub name: String,
    pub values: ColumnValues,
}

impl SampleColumn {
    pub fn numeric(name: impl Into<String>, values: Vec<f64>) -> Self {
        SampleColumn {
            name: name.into(),
            values: ColumnValues::Numeric(values),
        }
    }
}

/// Posterior draws of one object, columns in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSet {
    pub id: String,
    columns: Vec<SampleColumn>,
}

impl SampleSet {
    pub fn new(id: impl Into<String>, columns: Vec<SampleColumn>) -> Self {
        SampleSet {
            id: id.into(),
            columns,
        }
    }

    /// Load the sample set of `id` from `directory`.
    ///
    /// Arguments
    /// -----------------
    /// * `directory`: Model directory holding one file per object.
    /// * `id`: Raw identifier (file stem).
    /// * `format`: File format of the directory.
    ///
    /// Return
    /// ----------
    /// * The sample set, [`CksError::SampleSetMissing`] when `{id}.{ext}` does not exist, or
    ///   a reader error ([`CksError::ParquetError`], [`CksError::CsvError`],
    ///   [`CksError::SampleSetFormat`]).
    pub fn load(directory: &Utf8Path, id: &str, format: SampleFormat) -> Result<Self, CksError> {
        let path = format.path_for(directory, id);
        if !path.is_file() {
            return Err(CksError::SampleSetMissing(path));
        }
        let samples = format.read(&path, id)?;
        tracing::debug!(
            file = %path,
            columns = samples.columns.len(),
            draws = samples.n_draws(),
            "sample set loaded"
        );
        Ok(samples)
    }

    pub fn columns(&self) -> &[SampleColumn] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn column(&self, name: &str) -> Option<&SampleColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Number of draws (length of the first numeric column).
    pub fn n_draws(&self) -> usize {
        self.columns
            .iter()
            .find_map(|c| match &c.values {
                ColumnValues::Numeric(v) => Some(v.len()),
                ColumnValues::NonNumeric(_) => None,
            })
            .unwrap_or(0)
    }
}
