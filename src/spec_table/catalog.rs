//! External catalog collaborators joined with the spectroscopic table.
//!
//! Both catalogs are keyed by a **catalog name** derived from the numeric object id. The
//! default convention is the KOI designation used by the Kepler catalogs:
//! `1234` → `"K01234.01"` (see [`koi_name`]).
//!
//! * [`PhotometryCatalog`] – J/H/K magnitudes with uncertainties, one entry per object.
//!   [`CsvPhotometryCatalog`] loads it from a CSV export.
//! * [`MaxExtinctionTable`] – Upper bound on the V-band extinction along each line of sight.
use std::io::Read;

use camino::Utf8Path;
use serde::Deserialize;

use crate::{
    cks_errors::CksError,
    constants::{FastHashMap, Magnitude},
    spec_table::RowError,
};

/// KOI designation of the first candidate around star `id`.
///
/// ```rust
/// assert_eq!(cks::spec_table::catalog::koi_name(1234), "K01234.01");
/// ```
pub fn koi_name(id: u32) -> String {
    format!("K{id:05}.01")
}

/// A magnitude and its 1-σ uncertainty.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Photometry {
    pub value: Magnitude,
    pub unc: Magnitude,
}

/// 2MASS J, H and K band photometry of one object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandPhotometry {
    pub j: Photometry,
    pub h: Photometry,
    pub k: Photometry,
}

impl BandPhotometry {
    /// Look a band up by name (`"J"`, `"H"` or `"K"`).
    pub fn band(&self, name: &str) -> Option<Photometry> {
        match name {
            "J" => Some(self.j),
            "H" => Some(self.h),
            "K" => Some(self.k),
            _ => None,
        }
    }
}

/// Read-only photometry lookup by catalog key.
pub trait PhotometryCatalog {
    /// Catalog key of an object id. Defaults to the KOI convention.
    fn catalog_key(&self, id: u32) -> String {
        koi_name(id)
    }

    fn photometry(&self, key: &str) -> Option<BandPhotometry>;
}

#[derive(Debug, Deserialize)]
struct CatalogRow {
    name: String,
    #[serde(rename = "J")]
    j: f64,
    #[serde(rename = "J_unc")]
    j_unc: f64,
    #[serde(rename = "H")]
    h: f64,
    #[serde(rename = "H_unc")]
    h_unc: f64,
    #[serde(rename = "K")]
    k: f64,
    #[serde(rename = "K_unc")]
    k_unc: f64,
}

/// In-memory photometry catalog, usually loaded from a CSV export with the header
/// `name,J,J_unc,H,H_unc,K,K_unc`.
#[derive(Debug, Clone, Default)]
pub struct CsvPhotometryCatalog {
    entries: FastHashMap<String, BandPhotometry>,
}

impl CsvPhotometryCatalog {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, CksError> {
        let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut catalog = CsvPhotometryCatalog::default();

        for row in csv_reader.deserialize::<CatalogRow>() {
            let row = row?;
            catalog.insert(
                row.name,
                BandPhotometry {
                    j: Photometry { value: row.j, unc: row.j_unc },
                    h: Photometry { value: row.h, unc: row.h_unc },
                    k: Photometry { value: row.k, unc: row.k_unc },
                },
            );
        }
        Ok(catalog)
    }

    pub fn from_path(path: &Utf8Path) -> Result<Self, CksError> {
        Self::from_reader(std::fs::File::open(path)?)
    }

    pub fn insert(&mut self, key: impl Into<String>, photometry: BandPhotometry) {
        self.entries.insert(key.into(), photometry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PhotometryCatalog for CsvPhotometryCatalog {
    fn photometry(&self, key: &str) -> Option<BandPhotometry> {
        self.entries.get(key).copied()
    }
}

/// Maximum V-band extinction per object, read from a whitespace separated `name AV` table.
#[derive(Debug, Clone, Default)]
pub struct MaxExtinctionTable {
    entries: FastHashMap<String, f64>,
}

impl MaxExtinctionTable {
    /// Parse the text table. Blank lines and `#` comments are ignored, any other malformed
    /// line is an error.
    pub fn parse(text: &str) -> Result<Self, CksError> {
        let mut entries = FastHashMap::default();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut fields = line.split_whitespace();
            let name = fields.next().ok_or(RowError::MissingField(0))?;
            let av = fields.next().ok_or(RowError::MissingField(1))?;
            let av = av.parse::<f64>().map_err(|_| RowError::InvalidNumber {
                index: 1,
                value: av.to_string(),
            })?;
            entries.insert(name.to_string(), av);
        }

        Ok(MaxExtinctionTable { entries })
    }

    pub fn from_path(path: &Utf8Path) -> Result<Self, CksError> {
        Self::parse(&std::fs::read_to_string(path)?)
    }

    /// Maximum extinction for an object id (KOI key convention).
    pub fn max_av(&self, id: u32) -> Result<f64, CksError> {
        let key = koi_name(id);
        self.entries
            .get(&key)
            .copied()
            .ok_or(CksError::CatalogLookup { id, key })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
