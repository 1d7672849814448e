//! # Constants and type definitions for cks
//!
//! This module centralizes the **default tunables**, **measurement uncertainties**, and
//! **common type definitions** used throughout the `cks` library.
//!
//! ## Overview
//!
//! - Default variable names and quantile levels of a summary run
//! - Spectroscopic uncertainties attached to star model constraints
//! - File conventions (delimiters, extensions, output suffix)
//! - The [`ObjectId`] key shared by sample sets and summary rows

use ahash::RandomState;
use std::collections::HashMap;

// -------------------------------------------------------------------------------------------------
// Summary defaults
// -------------------------------------------------------------------------------------------------

/// Base variable names searched in every sample set.
pub const DEFAULT_COLUMNS: [&str; 8] = [
    "mass", "radius", "Teff", "logg", "age", "feh", "distance", "AV",
];

/// Quantile levels reported for every matched column.
pub const DEFAULT_QUANTILES: [f64; 5] = [0.05, 0.16, 0.5, 0.84, 0.95];

/// Suffix appended to the run name to build the summary file name.
pub const SUMMARY_SUFFIX: &str = "_summary";

// -------------------------------------------------------------------------------------------------
// Spectroscopic table conventions
// -------------------------------------------------------------------------------------------------

/// Field delimiter of the spectroscopic table rows.
pub const FIELD_DELIMITER: char = '&';

/// Sigil wrapping numeric cells of the table (LaTeX math mode).
pub const CELL_SIGIL: char = '$';

/// 1-σ uncertainty on the effective temperature (K).
pub const TEFF_UNC: f64 = 116.0;

/// 1-σ uncertainty on the surface gravity (dex).
pub const LOGG_UNC: f64 = 0.07;

/// 1-σ uncertainty on the metallicity (dex).
pub const FEH_UNC: f64 = 0.04;

/// Photometric bands joined from the external catalog.
pub const BANDS: [&str; 3] = ["J", "H", "K"];

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Effective temperature in Kelvin
pub type Kelvin = f64;
/// Logarithmic quantity in dex
pub type Dex = f64;
/// Apparent magnitude
pub type Magnitude = f64;

/// Hash map using [`ahash`](https://docs.rs/ahash) for fast hashing.
pub type FastHashMap<K, V> = HashMap<K, V, RandomState>;

// -------------------------------------------------------------------------------------------------
// Identifiers
// -------------------------------------------------------------------------------------------------

/// Identifier of a sample set / summary row.
///
/// This can be:
/// - A catalog number (e.g. `Int(1234)`), the usual case
/// - Any other file stem that is not numeric-looking (e.g. `"K00001"`)
///
/// The derived ordering places every `Int` before every `Name`, integers ascending
/// and names lexically, which is the total order of a summary table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectId {
    /// Numeric identifier
    Int(u64),
    /// Free-form identifier kept verbatim
    Name(String),
}

impl ObjectId {
    /// Coerce a raw identifier: pure digits become `Int`, anything else stays a `Name`.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<u64>() {
            Ok(n) if trimmed.chars().all(|c| c.is_ascii_digit()) => ObjectId::Int(n),
            _ => ObjectId::Name(trimmed.to_string()),
        }
    }

    pub fn as_int(&self) -> Option<u64> {
        match self {
            ObjectId::Int(n) => Some(*n),
            ObjectId::Name(_) => None,
        }
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ObjectId::Int(n) => write!(f, "{n}"),
            ObjectId::Name(s) => write!(f, "{s}"),
        }
    }
}

impl From<u64> for ObjectId {
    fn from(n: u64) -> Self {
        ObjectId::Int(n)
    }
}

impl From<&str> for ObjectId {
    fn from(s: &str) -> Self {
        ObjectId::parse(s)
    }
}
