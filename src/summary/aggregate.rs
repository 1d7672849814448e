//! # Directory aggregation
//!
//! Fan a [`QuantileExtractor`] out over every sample set of a model directory and merge
//! the rows into one [`SummaryTable`].
//!
//! ## Workflow
//! -----------------
//! 1. [`discover_ids`] lists `{id}.{ext}` files (numeric stem, extension of the configured
//!    [`SampleFormat`]) sorted by file name. Anything else is skipped.
//! 2. Each id is reduced independently. With `processes == 1` the ids are processed in
//!    order on the calling thread, otherwise on a dedicated rayon pool of `processes`
//!    threads (`0` = one per core). Workers share nothing but the read-only extractor.
//! 3. Once every worker is done the rows are sorted by id and checked for duplicates.
//!
//! ## Failure policy
//! -----------------
//! * `raise_exceptions = true`: the first failing id aborts the run with
//!   [`CksError::Extraction`] carrying that id and the underlying error.
//! * `raise_exceptions = false`: a failing id is logged with `tracing::warn!`, recorded in
//!   [`SummaryRun::failures`], and left out of the table. File stems naming the same
//!   object (`1` and `01`) keep the first one in file name order, the others are failures
//!   with [`CksError::DuplicateId`].
//!
//! ## Output
//! -----------------
//! [`make_summary`] reads `{base}/starmodels/{name}/models` and writes
//! `{base}/{name}_summary.parquet` (or `config.filename`). The output is rebuilt from
//! scratch on every run and replaced atomically.
use camino::{Utf8Path, Utf8PathBuf};
use itertools::{Either, Itertools};
use rayon::prelude::*;
use regex::Regex;

use super::{
    config::SummaryConfig,
    quantiles::QuantileExtractor,
    summary_table::{QuantileRow, SummaryTable},
};
use crate::{
    cks_errors::CksError,
    constants::{FastHashMap, ObjectId, SUMMARY_SUFFIX},
    samples::SampleFormat,
};

#[cfg(feature = "progress")]
use super::progress_bar::{fmt_dur, summary_progress_bar};

/// A sample set left out of the table in skip mode.
#[derive(Debug, PartialEq)]
pub struct ExtractionFailure {
    pub id: String,
    pub error: CksError,
}

/// Outcome of a summary run.
#[derive(Debug)]
pub struct SummaryRun {
    pub table: SummaryTable,
    /// File written, `None` for in-memory runs.
    pub path: Option<Utf8PathBuf>,
    pub failures: Vec<ExtractionFailure>,
}

/// Identifiers of the sample sets stored in `directory`, sorted by file name.
pub fn discover_ids(directory: &Utf8Path, format: SampleFormat) -> Result<Vec<String>, CksError> {
    let pattern = Regex::new(&format!(r"^(\d+)\.{}$", regex::escape(format.extension())))?;

    let mut names = Vec::new();
    for entry in std::fs::read_dir(directory)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => names.push(name),
            Err(name) => tracing::debug!(file = ?name, "skipping non UTF-8 file name"),
        }
    }
    names.sort();

    Ok(names
        .into_iter()
        .filter_map(|name| match pattern.captures(&name) {
            Some(caps) => Some(caps[1].to_string()),
            None => {
                tracing::debug!(file = %name, "skipping file without a sample set name");
                None
            }
        })
        .collect())
}

/// Keep the first row of every id (file name order), report the others as failures.
///
/// Distinct file stems such as `1` and `01` name the same object.
fn drop_colliding_ids(
    rows: Vec<(&str, QuantileRow)>,
    failures: &mut Vec<ExtractionFailure>,
) -> Vec<QuantileRow> {
    let mut seen: FastHashMap<ObjectId, &str> = FastHashMap::default();
    let mut kept = Vec::with_capacity(rows.len());

    for (id, row) in rows {
        match seen.get(&row.id) {
            Some(&first) => {
                tracing::warn!(id, kept = first, "sample set skipped, object already summarized");
                failures.push(ExtractionFailure {
                    id: id.to_string(),
                    error: CksError::DuplicateId(row.id.to_string()),
                });
            }
            None => {
                seen.insert(row.id.clone(), id);
                kept.push(row);
            }
        }
    }
    kept
}

type Outcome = Result<Result<QuantileRow, ExtractionFailure>, CksError>;

fn reduce_one(
    extractor: &QuantileExtractor,
    directory: &Utf8Path,
    id: &str,
    raise_exceptions: bool,
) -> Outcome {
    match extractor.extract(directory, id) {
        Ok(row) => Ok(Ok(row)),
        Err(error) if raise_exceptions => Err(error.for_object(id)),
        Err(error) => {
            tracing::warn!(id, %error, "sample set skipped");
            Ok(Err(ExtractionFailure {
                id: id.to_string(),
                error,
            }))
        }
    }
}

/// Reduce every sample set of `model_dir` to a summary table, in memory.
///
/// Arguments
/// -----------------
/// * `model_dir`: Directory holding one `{id}.{ext}` sample set per object.
/// * `config`: Columns, levels, worker count and failure policy.
///
/// Return
/// ----------
/// * A [`SummaryRun`] without output path, or the first error in propagate mode
///   ([`CksError::Extraction`]), a listing error, or [`CksError::DuplicateId`] when two
///   files name the same object in propagate mode.
pub fn summarize_directory(
    model_dir: &Utf8Path,
    config: &SummaryConfig,
) -> Result<SummaryRun, CksError> {
    let extractor = QuantileExtractor::new(config)?;
    let ids = discover_ids(model_dir, config.format)?;
    tracing::info!(
        directory = %model_dir,
        objects = ids.len(),
        processes = config.processes,
        "summarizing sample sets"
    );

    #[cfg(feature = "progress")]
    let pb = summary_progress_bar(ids.len() as u64);
    #[cfg(feature = "progress")]
    let tick = || pb.inc(1);
    #[cfg(not(feature = "progress"))]
    let tick = || ();

    let job = |id: &String| {
        let outcome = reduce_one(&extractor, model_dir, id, config.raise_exceptions);
        tick();
        outcome
    };

    let outcomes: Vec<Result<QuantileRow, ExtractionFailure>> = if config.processes == 1 {
        ids.iter().map(job).collect::<Result<_, _>>()?
    } else {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.processes)
            .build()?;
        pool.install(|| ids.par_iter().map(job).collect::<Result<_, _>>())?
    };

    #[cfg(feature = "progress")]
    {
        pb.finish_and_clear();
        tracing::debug!(elapsed = %fmt_dur(pb.elapsed()), "workers joined");
    }

    let (rows, mut failures): (Vec<_>, Vec<_>) = ids
        .iter()
        .zip(outcomes)
        .partition_map(|(id, outcome)| match outcome {
            Ok(row) => Either::Left((id.as_str(), row)),
            Err(failure) => Either::Right(failure),
        });

    let rows = if config.raise_exceptions {
        rows.into_iter().map(|(_, row)| row).collect()
    } else {
        drop_colliding_ids(rows, &mut failures)
    };

    let table = SummaryTable::from_rows(rows)?;
    if !failures.is_empty() {
        tracing::warn!(
            skipped = failures.len(),
            kept = table.len(),
            "some sample sets could not be summarized"
        );
    }

    Ok(SummaryRun {
        table,
        path: None,
        failures,
    })
}

/// Summarize `model_dir` and write the table to `output`.
///
/// The output format follows the extension of `output` (see [`SummaryTable::write`]).
pub fn summarize_to(
    model_dir: &Utf8Path,
    output: &Utf8Path,
    config: &SummaryConfig,
) -> Result<SummaryRun, CksError> {
    let mut run = summarize_directory(model_dir, config)?;
    run.table.write(output)?;
    tracing::info!(file = %output, rows = run.table.len(), "summary written");
    run.path = Some(output.to_owned());
    Ok(run)
}

/// Default output file of the run `name` under `base_dir`.
pub fn summary_path(base_dir: &Utf8Path, name: &str) -> Utf8PathBuf {
    base_dir.join(format!("{name}{SUMMARY_SUFFIX}.parquet"))
}

/// Summarize the model directory of run `name`.
///
/// Arguments
/// -----------------
/// * `base_dir`: Root of the run tree.
/// * `name`: Run name; sample sets are read from `{base_dir}/starmodels/{name}/models`.
/// * `config`: Run configuration; `config.filename` overrides the default output
///   `{base_dir}/{name}_summary.parquet`.
///
/// Return
/// ----------
/// * The [`SummaryRun`] with the written path.
pub fn make_summary(
    base_dir: &Utf8Path,
    name: &str,
    config: &SummaryConfig,
) -> Result<SummaryRun, CksError> {
    let model_dir = base_dir.join("starmodels").join(name).join("models");
    let output = config
        .filename
        .clone()
        .unwrap_or_else(|| summary_path(base_dir, name));
    summarize_to(&model_dir, &output, config)
}
