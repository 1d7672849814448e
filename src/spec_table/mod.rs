//! # Spectroscopic table
//!
//! Parser for the hand-edited spectroscopic table distributed with the survey. The table is
//! a LaTeX `tabular` body: one star per line, fields separated by `&`, numeric cells wrapped
//! in `$` math-mode sigils.
//!
//! ```text
//! 1234-01 & $5800 & $4.4 & $0.1 & $3.2 \\
//! ```
//!
//! ## Row grammar
//! -----------------
//! | field | content                                   | example   |
//! |-------|-------------------------------------------|-----------|
//! | 0     | object id, `digits` optionally `-suffix`   | `1234-01` |
//! | 1     | effective temperature (K)                 | `$5800`   |
//! | 2     | surface gravity (dex)                     | `$4.4`    |
//! | 3     | metallicity (dex)                         | `$0.1`    |
//! | 4     | projected rotation velocity (km/s)        | `$3.2`    |
//!
//! Extra trailing fields are ignored, as is a trailing `\\` row terminator.
//!
//! ## Error policy
//! -----------------
//! * A row whose id or numeric fields do not parse is **rejected**: it is logged, recorded in
//!   [`SpecTable::rejected`], and the load continues.
//! * A missing photometry entry for an accepted row is **fatal**
//!   ([`CksError::CatalogLookup`]); no partial record is ever built.
//! * Several rows with the same id: the **last line wins**, and the number of overwritten
//!   records is reported by [`SpecTable::overwritten`].
//!
//! ## See also
//! ------------
//! * [`catalog`] – Photometry and extinction collaborators joined by catalog key.
//! * [`EncryptedStore`](crate::crypt::store::EncryptedStore) – Decrypts and caches the table.
pub mod catalog;

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::{
    cks_errors::CksError,
    constants::{Dex, Kelvin, CELL_SIGIL, FIELD_DELIMITER},
    crypt::store::TableParser,
};
use catalog::{BandPhotometry, PhotometryCatalog};

static OBJECT_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)(?:-(\w+))?").unwrap());

/// Row-level parsing errors of the spectroscopic table.
///
/// Variants
/// -----------------
/// * `InvalidId` – The first field holds no `digits[-suffix]` id; payload carries the field.
/// * `InvalidNumber` – A numeric field failed conversion; payload carries index and content.
/// * `MissingField` – The row has fewer fields than expected.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RowError {
    #[error("No object id in first field: '{0}'")]
    InvalidId(String),
    #[error("Field {index} is not a number: '{value}'")]
    InvalidNumber { index: usize, value: String },
    #[error("Missing field {0}")]
    MissingField(usize),
}

impl From<RowError> for CksError {
    fn from(err: RowError) -> Self {
        CksError::Parse(err)
    }
}

/// Convert a `$`-wrapped numeric cell to a float.
///
/// Arguments
/// -----------------
/// * `index`: Position of the field in its row (for diagnostics).
/// * `cell`: Raw cell content, e.g. `" $5800 "`.
///
/// Return
/// ----------
/// * The parsed value, or [`RowError::InvalidNumber`].
pub fn parse_cell(index: usize, cell: &str) -> Result<f64, RowError> {
    let stripped: String = cell.chars().filter(|&c| c != CELL_SIGIL).collect();
    stripped
        .trim()
        .parse::<f64>()
        .map_err(|_| RowError::InvalidNumber {
            index,
            value: cell.trim().to_string(),
        })
}

/// Extract the object id from the leading field (`"1234-01"` → `1234`).
pub fn parse_object_id(field: &str) -> Result<u32, RowError> {
    OBJECT_ID
        .captures(field)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .filter(|&id| id > 0)
        .ok_or_else(|| RowError::InvalidId(field.trim().to_string()))
}

/// One star of the spectroscopic table.
///
/// Fields
/// -----------------
/// * `id` – Positive catalog number.
/// * `teff` – Effective temperature (K).
/// * `logg` – Surface gravity (dex).
/// * `feh` – Metallicity \[Fe/H\] (dex).
/// * `vsini` – Projected rotation velocity (km/s).
/// * `photometry` – J/H/K magnitudes joined from the catalog, `None` when the parser has no
///   catalog attached.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecRecord {
    pub id: u32,
    pub teff: Kelvin,
    pub logg: Dex,
    pub feh: Dex,
    pub vsini: f64,
    pub photometry: Option<BandPhotometry>,
}

impl SpecRecord {
    /// Parse one table row (without catalog enrichment).
    pub fn parse_row(line: &str) -> Result<Self, RowError> {
        let line = line.trim_end();
        let line = line.strip_suffix("\\\\").unwrap_or(line);
        let fields: Vec<&str> = line.split(FIELD_DELIMITER).collect();

        let id = parse_object_id(fields[0])?;
        let numeric = |index: usize| -> Result<f64, RowError> {
            let cell = fields.get(index).ok_or(RowError::MissingField(index))?;
            parse_cell(index, cell)
        };

        Ok(SpecRecord {
            id,
            teff: numeric(1)?,
            logg: numeric(2)?,
            feh: numeric(3)?,
            vsini: numeric(4)?,
            photometry: None,
        })
    }
}

/// A row excluded from the table, kept for reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedRow {
    /// 1-based line number in the plaintext
    pub line_number: usize,
    pub line: String,
    pub error: RowError,
}

/// The parsed spectroscopic table, indexed by object id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpecTable {
    records: BTreeMap<u32, SpecRecord>,
    rejected: Vec<RejectedRow>,
    overwritten: usize,
}

impl SpecTable {
    pub fn get(&self, id: u32) -> Option<&SpecRecord> {
        self.records.get(&id)
    }

    /// Records in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &SpecRecord> {
        self.records.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.records.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn rejected(&self) -> &[RejectedRow] {
        &self.rejected
    }

    /// Number of records replaced by a later row with the same id.
    pub fn overwritten(&self) -> usize {
        self.overwritten
    }

    /// Insert a record, replacing (and returning) any record with the same id.
    pub fn insert(&mut self, record: SpecRecord) -> Option<SpecRecord> {
        let previous = self.records.insert(record.id, record);
        if previous.is_some() {
            self.overwritten += 1;
        }
        previous
    }
}

/// [`TableParser`] for the spectroscopic table, optionally joined with a photometry catalog.
pub struct SpecTableParser {
    catalog: Option<Box<dyn PhotometryCatalog + Send + Sync>>,
}

impl Default for SpecTableParser {
    fn default() -> Self {
        Self::new()
    }
}

impl SpecTableParser {
    /// Parser without catalog enrichment (`photometry` stays `None`).
    pub fn new() -> Self {
        SpecTableParser { catalog: None }
    }

    /// Parser joining every accepted row with `catalog`.
    pub fn with_catalog(catalog: impl PhotometryCatalog + Send + Sync + 'static) -> Self {
        SpecTableParser {
            catalog: Some(Box::new(catalog)),
        }
    }

    fn enrich(&self, record: &mut SpecRecord) -> Result<(), CksError> {
        let Some(catalog) = &self.catalog else {
            return Ok(());
        };
        let key = catalog.catalog_key(record.id);
        let photometry = catalog
            .photometry(&key)
            .ok_or(CksError::CatalogLookup { id: record.id, key })?;
        record.photometry = Some(photometry);
        Ok(())
    }
}

impl TableParser for SpecTableParser {
    type Table = SpecTable;

    fn parse_table(&self, plaintext: &str) -> Result<SpecTable, CksError> {
        let mut table = SpecTable::default();

        for (idx, line) in plaintext.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }

            let mut record = match SpecRecord::parse_row(line) {
                Ok(record) => record,
                Err(error) => {
                    tracing::warn!(line_number = idx + 1, %error, line, "rejected table row");
                    table.rejected.push(RejectedRow {
                        line_number: idx + 1,
                        line: line.to_string(),
                        error,
                    });
                    continue;
                }
            };

            self.enrich(&mut record)?;

            let id = record.id;
            if table.insert(record).is_some() {
                tracing::debug!(id, line_number = idx + 1, "duplicate id, keeping the last row");
            }
        }

        tracing::info!(
            records = table.len(),
            rejected = table.rejected.len(),
            overwritten = table.overwritten,
            "spectroscopic table parsed"
        );
        Ok(table)
    }
}

#[cfg(test)]
mod spec_table_test {
    use approx::assert_relative_eq;

    use super::catalog::{CsvPhotometryCatalog, Photometry};
    use super::*;

    #[test]
    fn test_parse_row() {
        let record = SpecRecord::parse_row("1234-01 & $5800 & $4.4 & $0.1 & $3.2").unwrap();
        assert_eq!(record.id, 1234);
        assert_eq!(record.teff, 5800.0);
        assert_eq!(record.logg, 4.4);
        assert_eq!(record.feh, 0.1);
        assert_eq!(record.vsini, 3.2);
        assert_eq!(record.photometry, None);
    }

    #[test]
    fn test_parse_row_latex_terminator() {
        let record =
            SpecRecord::parse_row("7-01 & $5800$ & $4.40$ & $-0.12$ & $1.0$ \\\\").unwrap();
        assert_eq!(record.id, 7);
        assert_eq!(record.feh, -0.12);
        assert_eq!(record.vsini, 1.0);
    }

    #[test]
    fn test_object_id() {
        assert_eq!(parse_object_id("1234-01"), Ok(1234));
        assert_eq!(parse_object_id(" 42 "), Ok(42));
        assert_eq!(parse_object_id("K00042-b"), Ok(42));
        assert_eq!(
            parse_object_id("abc"),
            Err(RowError::InvalidId("abc".into()))
        );
        assert_eq!(parse_object_id("0-01"), Err(RowError::InvalidId("0-01".into())));
    }

    #[test]
    fn test_parse_cell_round_trip() {
        for value in [5800.0, 4.4, 0.1, -0.25, 3.2, 1e-3, 123456.789] {
            let cell = format!(" ${value} ");
            assert_eq!(parse_cell(1, &cell), Ok(value));
        }
        assert_eq!(
            parse_cell(2, "$abc"),
            Err(RowError::InvalidNumber {
                index: 2,
                value: "$abc".into()
            })
        );
    }

    #[test]
    fn test_rejected_rows_do_not_abort() {
        let text = "1-01 & $5000 & $4.5 & $0.0 & $2.0\n\
                    garbage & $1 & $2 & $3 & $4\n\
                    \n\
                    2-01 & $oops & $4.5 & $0.0 & $2.0\n\
                    3-01 & $5100 & $4.2\n\
                    4-01 & $6100 & $4.1 & $0.2 & $9.0\n";
        let table = SpecTableParser::new().parse_table(text).unwrap();

        assert_eq!(table.ids().collect::<Vec<_>>(), vec![1, 4]);
        assert_eq!(table.rejected().len(), 3);
        assert_eq!(table.rejected()[0].line_number, 2);
        assert_eq!(
            table.rejected()[0].error,
            RowError::InvalidId("garbage".into())
        );
        assert_eq!(
            table.rejected()[1].error,
            RowError::InvalidNumber {
                index: 1,
                value: "$oops".into()
            }
        );
        assert_eq!(table.rejected()[2].error, RowError::MissingField(3));
    }

    #[test]
    fn test_duplicate_id_last_wins() {
        let text = "5-01 & $5000 & $4.5 & $0.0 & $2.0\n\
                    5-02 & $5500 & $4.0 & $0.3 & $7.0\n";
        let table = SpecTableParser::new().parse_table(text).unwrap();

        assert_eq!(table.len(), 1);
        assert_eq!(table.overwritten(), 1);
        let record = table.get(5).unwrap();
        assert_relative_eq!(record.teff, 5500.0);
        assert_relative_eq!(record.vsini, 7.0);
    }

    fn catalog() -> CsvPhotometryCatalog {
        let mut catalog = CsvPhotometryCatalog::default();
        let band = |value| Photometry { value, unc: 0.02 };
        catalog.insert(
            "K00001.01",
            BandPhotometry {
                j: band(10.0),
                h: band(9.5),
                k: band(9.4),
            },
        );
        catalog
    }

    #[test]
    fn test_catalog_join() {
        let parser = SpecTableParser::with_catalog(catalog());
        let table = parser
            .parse_table("1-01 & $5000 & $4.5 & $0.0 & $2.0")
            .unwrap();
        let photometry = table.get(1).unwrap().photometry.unwrap();
        assert_eq!(photometry.h.value, 9.5);
        assert_eq!(photometry.k.unc, 0.02);
    }

    #[test]
    fn test_missing_catalog_entry_is_fatal() {
        let parser = SpecTableParser::with_catalog(catalog());
        let err = parser
            .parse_table("1-01 & $5000 & $4.5 & $0.0 & $2.0\n2-01 & $5000 & $4.5 & $0.0 & $2.0")
            .unwrap_err();
        assert_eq!(
            err,
            CksError::CatalogLookup {
                id: 2,
                key: "K00002.01".into()
            }
        );
    }
}
