//! # Quantile extraction
//!
//! Reduce one [`SampleSet`] to one [`QuantileRow`]: every column whose name matches one of
//! the requested variables is summarized by its quantiles at the configured levels.
//!
//! ## Column matching
//! -----------------
//! Requested names are regular expressions searched anywhere in the column name, so the
//! default `radius` picks up `radius_0`, `radius_1`, … and `Teff` picks up `Teff_0`.
//! A column matched by several requested names is reported once, and columns keep the
//! order they have in the sample set.
//!
//! ## Interpolation
//! -----------------
//! Quantiles use linear interpolation between order statistics: for `n` finite draws
//! sorted ascending and a level `q`, the position is `q · (n − 1)` and the value is
//! interpolated between its two neighbours. `NaN` draws are ignored.
//!
//! ## Output names
//! -----------------
//! The quantile of column `c` at level `q` is stored as `{c}_{round(100 q):02}`, e.g.
//! `radius_0_16`, `radius_0_50`, `mass_0_05`.
//!
//! ## See also
//! ------------
//! * [`crate::summary::aggregate`] – Runs the extractor over a whole directory.
use camino::Utf8Path;
use itertools::Itertools;
use regex::RegexSet;

use super::{config::SummaryConfig, summary_table::QuantileRow};
use crate::{
    cks_errors::CksError,
    constants::ObjectId,
    samples::{ColumnValues, SampleFormat, SampleSet},
};

/// Name of the output column holding the quantile of `column` at `level`.
pub fn quantile_column_name(column: &str, level: f64) -> String {
    format!("{column}_{:02.0}", level * 100.0)
}

/// Quantile of already sorted, finite draws.
///
/// The interpolation is written so that it stays monotone in `level` even with rounding.
///
/// Arguments
/// -----------------
/// * `sorted`: Draws in ascending order, non empty.
/// * `level`: Quantile level in `[0, 1]`.
fn quantile_sorted(sorted: &[f64], level: f64) -> f64 {
    let last = sorted.len() - 1;
    let pos = level * last as f64;
    let lo = (pos.floor() as usize).min(last);
    let hi = (lo + 1).min(last);
    let t = pos - lo as f64;

    let (a, b) = (sorted[lo], sorted[hi]);
    let diff = b - a;
    if t < 0.5 {
        a + diff * t
    } else {
        b - diff * (1.0 - t)
    }
}

/// Quantiles of one column of draws at every requested level.
///
/// Arguments
/// -----------------
/// * `column`: Column name, used for error reporting.
/// * `draws`: Raw draws, `NaN` entries are dropped.
/// * `levels`: Quantile levels in `(0, 1)`.
///
/// Return
/// ----------
/// * One value per level, in the order of `levels`, or
///   [`CksError::QuantileComputation`] when no draw is left.
pub fn column_quantiles(column: &str, draws: &[f64], levels: &[f64]) -> Result<Vec<f64>, CksError> {
    let mut sorted: Vec<f64> = draws.iter().copied().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() {
        return Err(CksError::QuantileComputation {
            column: column.to_string(),
            reason: format!("no usable draws (out of {})", draws.len()),
        });
    }
    sorted.sort_unstable_by(f64::total_cmp);

    Ok(levels
        .iter()
        .map(|&level| quantile_sorted(&sorted, level))
        .collect())
}

/// Requested variable names compiled into a single matcher.
#[derive(Debug, Clone)]
pub struct ColumnMatcher {
    patterns: RegexSet,
}

impl ColumnMatcher {
    pub fn new<I, S>(patterns: I) -> Result<Self, CksError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(ColumnMatcher {
            patterns: RegexSet::new(patterns)?,
        })
    }

    pub fn is_match(&self, column: &str) -> bool {
        self.patterns.is_match(column)
    }

    /// Matching column names, deduplicated, in input order.
    pub fn matching<'a>(&self, columns: impl IntoIterator<Item = &'a str>) -> Vec<&'a str> {
        columns
            .into_iter()
            .filter(|c| self.is_match(c))
            .unique()
            .collect()
    }
}

/// Reduces sample sets to quantile rows for a fixed configuration.
///
/// Holds the compiled column matcher so that a run over many objects compiles the
/// patterns once. The extractor is `Send + Sync` and is shared by reference between
/// workers.
#[derive(Debug, Clone)]
pub struct QuantileExtractor {
    matcher: ColumnMatcher,
    levels: Vec<f64>,
    format: SampleFormat,
}

impl QuantileExtractor {
    pub fn new(config: &SummaryConfig) -> Result<Self, CksError> {
        config.validate()?;
        Ok(QuantileExtractor {
            matcher: ColumnMatcher::new(&config.columns)?,
            levels: config.quantiles.clone(),
            format: config.format,
        })
    }

    pub fn levels(&self) -> &[f64] {
        &self.levels
    }

    /// Load `{directory}/{id}.{ext}` and reduce it to a row.
    ///
    /// Return
    /// ----------
    /// * The row keyed by [`ObjectId::parse`] of `id`, or the loader / quantile error
    ///   (see [`SampleSet::load`] and [`QuantileExtractor::quantile_row`]).
    pub fn extract(&self, directory: &Utf8Path, id: &str) -> Result<QuantileRow, CksError> {
        let samples = SampleSet::load(directory, id, self.format)?;
        self.quantile_row(&samples)
    }

    /// Reduce an in-memory sample set.
    ///
    /// A sample set without any matching column yields an empty row. A matching column that
    /// is not numeric, or holds no usable draw, is a [`CksError::QuantileComputation`].
    pub fn quantile_row(&self, samples: &SampleSet) -> Result<QuantileRow, CksError> {
        let mut row = QuantileRow::new(ObjectId::parse(&samples.id));

        for name in self.matcher.matching(samples.column_names()) {
            let Some(column) = samples.column(name) else {
                continue;
            };
            let draws = match &column.values {
                ColumnValues::Numeric(draws) => draws,
                ColumnValues::NonNumeric(kind) => {
                    return Err(CksError::QuantileComputation {
                        column: name.to_string(),
                        reason: format!("column is not numeric ({kind})"),
                    })
                }
            };

            let values = column_quantiles(name, draws, &self.levels)?;
            for (&level, value) in self.levels.iter().zip(values) {
                row.push(quantile_column_name(name, level), value);
            }
        }

        Ok(row)
    }
}

/// Quantile row of the sample set `id` stored in `directory`.
pub fn extract_quantiles(
    id: &str,
    directory: &Utf8Path,
    config: &SummaryConfig,
) -> Result<QuantileRow, CksError> {
    QuantileExtractor::new(config)?.extract(directory, id)
}
