//! Tunable parameters of a summary run.
//!
//! [`SummaryConfig`] gathers everything a caller may adjust: which variables to look for,
//! which quantile levels to report, how many workers to use, what to do with a failing
//! sample set, and where to write the result. Build one with the fluent
//! [`SummaryConfig::builder`] or deserialize it from JSON; both paths validate.
//!
//! ```rust
//! use cks::summary::config::SummaryConfig;
//!
//! let config = SummaryConfig::builder()
//!     .columns(["mass", "radius"])
//!     .quantiles([0.16, 0.5, 0.84])
//!     .processes(4)
//!     .raise_exceptions(false)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.processes, 4);
//! ```
use camino::{Utf8Path, Utf8PathBuf};
use itertools::Itertools;
use regex::RegexSet;
use serde::{Deserialize, Serialize};

use crate::{
    cks_errors::CksError,
    constants::{DEFAULT_COLUMNS, DEFAULT_QUANTILES},
    samples::SampleFormat,
    summary::quantiles::quantile_column_name,
};

/// Configuration of a summary run.
///
/// Fields
/// -----------------
/// * `columns` – Requested base variable names. Each one is a regular expression searched
///   in the sample set column names (plain names match as substrings).
/// * `quantiles` – Levels in `(0, 1)`, reported in the given order.
/// * `processes` – Worker pool size. `1` runs sequentially in enumeration order, `0` uses
///   one worker per available core.
/// * `raise_exceptions` – `true` (default): the first failing sample set aborts the run.
///   `false`: failing sample sets are logged, reported, and left out of the table.
/// * `filename` – Output file override; `.csv` selects CSV output, anything else Parquet.
/// * `format` – On-disk format of the sample sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    pub columns: Vec<String>,
    pub quantiles: Vec<f64>,
    pub processes: usize,
    pub raise_exceptions: bool,
    pub filename: Option<Utf8PathBuf>,
    pub format: SampleFormat,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        SummaryConfig {
            columns: DEFAULT_COLUMNS.iter().map(|c| c.to_string()).collect(),
            quantiles: DEFAULT_QUANTILES.to_vec(),
            processes: 1,
            raise_exceptions: true,
            filename: None,
            format: SampleFormat::Parquet,
        }
    }
}

impl SummaryConfig {
    pub fn builder() -> SummaryConfigBuilder {
        SummaryConfigBuilder::new()
    }

    /// Check the configuration.
    ///
    /// Return
    /// ----------
    /// * `Ok(())`, or
    /// * [`CksError::InvalidConfig`] for an empty column or quantile list, or quantile levels
    ///   that would produce the same output column name,
    /// * [`CksError::InvalidColumnPattern`] for a column that is not a valid pattern,
    /// * [`CksError::InvalidQuantile`] for a level outside `(0, 1)`.
    pub fn validate(&self) -> Result<(), CksError> {
        if self.columns.is_empty() {
            return Err(CksError::InvalidConfig(
                "at least one column must be requested".into(),
            ));
        }
        RegexSet::new(&self.columns)?;

        if self.quantiles.is_empty() {
            return Err(CksError::InvalidConfig(
                "at least one quantile level must be requested".into(),
            ));
        }
        if let Some(&q) = self
            .quantiles
            .iter()
            .find(|q| !(q.is_finite() && **q > 0.0 && **q < 1.0))
        {
            return Err(CksError::InvalidQuantile(q));
        }
        if let Some(name) = self
            .quantiles
            .iter()
            .map(|&q| quantile_column_name("", q))
            .duplicates()
            .next()
        {
            return Err(CksError::InvalidConfig(format!(
                "several quantile levels map to the same column suffix '{name}'"
            )));
        }
        Ok(())
    }

    /// Deserialize from JSON; absent fields take their default value.
    pub fn from_json_str(json: &str) -> Result<Self, CksError> {
        let config: SummaryConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Utf8Path) -> Result<Self, CksError> {
        Self::from_json_str(&std::fs::read_to_string(path)?)
    }
}

#[derive(Debug, Clone)]
pub struct SummaryConfigBuilder {
    config: SummaryConfig,
}

impl Default for SummaryConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SummaryConfigBuilder {
    /// Create a new builder initialized with default values.
    pub fn new() -> Self {
        Self {
            config: SummaryConfig::default(),
        }
    }

    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn quantiles(mut self, levels: impl IntoIterator<Item = f64>) -> Self {
        self.config.quantiles = levels.into_iter().collect();
        self
    }

    pub fn processes(mut self, v: usize) -> Self {
        self.config.processes = v;
        self
    }

    pub fn raise_exceptions(mut self, v: bool) -> Self {
        self.config.raise_exceptions = v;
        self
    }

    pub fn filename(mut self, v: impl Into<Utf8PathBuf>) -> Self {
        self.config.filename = Some(v.into());
        self
    }

    pub fn format(mut self, v: SampleFormat) -> Self {
        self.config.format = v;
        self
    }

    /// Finalize the builder, see [`SummaryConfig::validate`] for the rules applied.
    pub fn build(self) -> Result<SummaryConfig, CksError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
