//! CSV sample sets: a header row of column names, then one draw per line.
//!
//! Empty cells and `nan` (any case) are missing draws and read as `NaN`. A column holding
//! any other non numeric cell is kept as [`ColumnValues::NonNumeric`].
use camino::Utf8Path;

use super::{ColumnValues, SampleColumn, SampleSet};
use crate::cks_errors::CksError;

fn parse_draw(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    if cell.is_empty() || cell.eq_ignore_ascii_case("nan") {
        return Some(f64::NAN);
    }
    cell.parse::<f64>().ok()
}

pub(crate) fn read_csv_samples(path: &Utf8Path, id: &str) -> Result<SampleSet, CksError> {
    let mut reader = csv::Reader::from_path(path)?;
    let names: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    // `None` once a column has shown a non numeric cell.
    let mut draws: Vec<Option<Vec<f64>>> = vec![Some(Vec::new()); names.len()];

    for record in reader.records() {
        let record = record?;
        for (slot, cell) in draws.iter_mut().zip(record.iter()) {
            if slot.is_none() {
                continue;
            }
            match parse_draw(cell) {
                Some(v) => {
                    if let Some(values) = slot.as_mut() {
                        values.push(v);
                    }
                }
                None => *slot = None,
            }
        }
    }

    let columns = names
        .into_iter()
        .zip(draws)
        .map(|(name, values)| SampleColumn {
            name,
            values: match values {
                Some(v) => ColumnValues::Numeric(v),
                None => ColumnValues::NonNumeric("text".into()),
            },
        })
        .collect();

    Ok(SampleSet::new(id, columns))
}
