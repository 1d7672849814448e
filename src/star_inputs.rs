//! Observational constraints handed to the stellar model fit of one object.
//!
//! The fit itself happens outside this crate; this module only gathers what it needs from
//! the spectroscopic table and the extinction catalog:
//!
//! * `Teff`, `logg`, `feh` from the spectroscopic table, with the survey's fixed
//!   uncertainties ([`TEFF_UNC`], [`LOGG_UNC`], [`FEH_UNC`]),
//! * `J`, `H`, `K` magnitudes joined from the photometry catalog,
//! * the maximum V-band extinction allowed along the line of sight.
use std::collections::BTreeMap;

use crate::{
    cks_errors::CksError,
    constants::{BANDS, FEH_UNC, LOGG_UNC, TEFF_UNC},
    spec_table::{catalog::MaxExtinctionTable, SpecTable},
};

/// Named `(value, uncertainty)` constraints of one object.
#[derive(Debug, Clone, PartialEq)]
pub struct StarModelInputs {
    pub id: u32,
    pub constraints: BTreeMap<String, (f64, f64)>,
    pub max_av: f64,
}

impl StarModelInputs {
    /// Gather the constraints of object `id`.
    ///
    /// Arguments
    /// -----------------
    /// * `id`: Object id.
    /// * `spec`: Parsed spectroscopic table (photometry is included when it was joined).
    /// * `extinction`: Maximum extinction catalog.
    ///
    /// Return
    /// ----------
    /// * The inputs, [`CksError::RecordNotFound`] if `id` is not in `spec`, or
    ///   [`CksError::CatalogLookup`] if the extinction bound is missing.
    pub fn from_tables(
        id: u32,
        spec: &SpecTable,
        extinction: &MaxExtinctionTable,
    ) -> Result<Self, CksError> {
        let record = spec.get(id).ok_or(CksError::RecordNotFound(id))?;
        let max_av = extinction.max_av(id)?;

        let mut constraints = BTreeMap::new();
        if let Some(photometry) = &record.photometry {
            for band in BANDS {
                if let Some(mag) = photometry.band(band) {
                    constraints.insert(band.to_string(), (mag.value, mag.unc));
                }
            }
        }
        constraints.insert("Teff".to_string(), (record.teff, TEFF_UNC));
        constraints.insert("logg".to_string(), (record.logg, LOGG_UNC));
        constraints.insert("feh".to_string(), (record.feh, FEH_UNC));

        Ok(StarModelInputs {
            id,
            constraints,
            max_av,
        })
    }

    /// Add or replace one constraint.
    pub fn with_constraint(mut self, name: impl Into<String>, value: f64, unc: f64) -> Self {
        self.constraints.insert(name.into(), (value, unc));
        self
    }

    /// Drop the given photometric bands (unknown names are ignored).
    pub fn skip_bands(mut self, bands: &[&str]) -> Self {
        for band in bands {
            self.constraints.remove(*band);
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<(f64, f64)> {
        self.constraints.get(name).copied()
    }
}
