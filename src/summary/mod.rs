//! # Posterior quantile summaries
//!
//! Turn a directory of per-object posterior sample sets into one table of quantiles.
//!
//! ## Components
//! -----------------
//! * [`config`] – [`config::SummaryConfig`]: requested variables, quantile levels, worker
//!   count, failure policy, output file.
//! * [`quantiles`] – Column matching and interpolated quantiles of one sample set.
//! * [`summary_table`] – Sparse quantile rows merged into a sorted, id-unique table, with
//!   atomic Parquet / CSV persistence and read-back.
//! * [`aggregate`] – Directory discovery, sequential or rayon fan-out, merge and write.
//!
//! ## Example
//! -----------------
//! ```rust,no_run
//! use camino::Utf8Path;
//! use cks::summary::{aggregate::make_summary, config::SummaryConfig};
//!
//! let config = SummaryConfig::builder()
//!     .processes(8)
//!     .raise_exceptions(false)
//!     .build()?;
//! // Reads /data/cks/starmodels/iso/models/{id}.parquet
//! // and writes /data/cks/iso_summary.parquet
//! let run = make_summary(Utf8Path::new("/data/cks"), "iso", &config)?;
//! for failure in &run.failures {
//!     eprintln!("{}: {}", failure.id, failure.error);
//! }
//! # Ok::<(), cks::cks_errors::CksError>(())
//! ```
pub mod aggregate;
pub mod config;
pub mod quantiles;
pub mod summary_table;

#[cfg(feature = "progress")]
pub(crate) mod progress_bar;
