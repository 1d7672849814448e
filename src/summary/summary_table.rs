//! # Summary tables
//!
//! A [`SummaryTable`] is the merged result of a summary run: one [`QuantileRow`] per
//! object, unique by id and sorted ascending. Rows are sparse (a sample set lacking a
//! variable simply has no value for it) and the table schema is the union of the row
//! fields, in order of first appearance.
//!
//! ## File layout
//! -----------------
//! * **Parquet** (default): first column `id` (`Int64` when every id is an integer, `Utf8`
//!   otherwise), then one nullable `Float64` column per quantile field.
//! * **CSV** (selected by a `.csv` extension): header `id,<fields…>`, empty cells for
//!   missing values.
//!
//! Writes go through a temporary file in the destination directory which is renamed over
//! the target once complete, so a reader never observes a partial table.
use std::{io::Write, sync::Arc};

use arrow_array::{
    Array, ArrayRef, Float64Array, Int64Array, RecordBatch, StringArray, UInt64Array,
};
use camino::Utf8Path;
use itertools::Itertools;
use parquet::arrow::{arrow_reader::ParquetRecordBatchReaderBuilder, ArrowWriter};
use parquet::errors::ParquetError;
use tempfile::NamedTempFile;

use crate::{cks_errors::CksError, constants::ObjectId};

const ID_COLUMN: &str = "id";

/// Quantiles of one object, as `(field, value)` pairs in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantileRow {
    pub id: ObjectId,
    values: Vec<(String, f64)>,
}

impl QuantileRow {
    pub fn new(id: ObjectId) -> Self {
        QuantileRow {
            id,
            values: Vec::new(),
        }
    }

    pub fn push(&mut self, field: impl Into<String>, value: f64) {
        self.values.push((field.into(), value));
    }

    pub fn get(&self, field: &str) -> Option<f64> {
        self.values
            .iter()
            .find_map(|(name, v)| (name == field).then_some(*v))
    }

    pub fn values(&self) -> &[(String, f64)] {
        &self.values
    }
}

/// Merged, sorted quantile rows of a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SummaryTable {
    rows: Vec<QuantileRow>,
    columns: Vec<String>,
}

fn is_csv(path: &Utf8Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

fn invalid(path: &Utf8Path, reason: impl Into<String>) -> CksError {
    CksError::InvalidSummaryFile {
        path: path.to_owned(),
        reason: reason.into(),
    }
}

impl SummaryTable {
    /// Build a table from rows in any order.
    ///
    /// Return
    /// ----------
    /// * The table sorted by id, or [`CksError::DuplicateId`] when two rows share an id.
    pub fn from_rows(mut rows: Vec<QuantileRow>) -> Result<Self, CksError> {
        rows.sort_by(|a, b| a.id.cmp(&b.id));
        if let Some((a, _)) = rows.iter().tuple_windows().find(|(a, b)| a.id == b.id) {
            return Err(CksError::DuplicateId(a.id.to_string()));
        }

        let columns = rows
            .iter()
            .flat_map(|row| row.values.iter().map(|(name, _)| name.clone()))
            .unique()
            .collect();

        Ok(SummaryTable { rows, columns })
    }

    pub fn rows(&self) -> &[QuantileRow] {
        &self.rows
    }

    /// Union of the row fields, in order of first appearance (the `id` column excluded).
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn ids(&self) -> impl Iterator<Item = &ObjectId> {
        self.rows.iter().map(|row| &row.id)
    }

    pub fn get(&self, id: &ObjectId) -> Option<&QuantileRow> {
        self.rows
            .binary_search_by(|row| row.id.cmp(id))
            .ok()
            .map(|i| &self.rows[i])
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Value of `field` for every row, `None` where the row lacks it.
    fn column_values(&self, field: &str) -> Vec<Option<f64>> {
        self.rows.iter().map(|row| row.get(field)).collect()
    }

    /// Write the table to `path`, replacing any previous file.
    ///
    /// The format is CSV for a `.csv` extension and Parquet otherwise. The table is first
    /// written to a temporary file next to `path`, then moved into place.
    pub fn write(&self, path: &Utf8Path) -> Result<(), CksError> {
        let parent = match path.parent() {
            Some(p) if !p.as_str().is_empty() => p,
            _ => Utf8Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(parent)?;

        if is_csv(path) {
            self.write_csv(tmp.as_file_mut())?;
        } else {
            self.write_parquet(tmp.as_file_mut())?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(path)?;

        tracing::debug!(
            file = %path,
            rows = self.len(),
            columns = self.columns.len(),
            "summary table written"
        );
        Ok(())
    }

    fn write_csv<W: Write>(&self, out: W) -> Result<(), CksError> {
        let mut writer = csv::Writer::from_writer(out);
        writer.write_record(
            std::iter::once(ID_COLUMN).chain(self.columns.iter().map(String::as_str)),
        )?;

        for row in &self.rows {
            let mut record = vec![row.id.to_string()];
            record.extend(
                self.columns
                    .iter()
                    .map(|field| row.get(field).map(|v| v.to_string()).unwrap_or_default()),
            );
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }

    fn id_array(&self) -> ArrayRef {
        let ints: Option<Vec<i64>> = self
            .ids()
            .map(|id| id.as_int().and_then(|n| i64::try_from(n).ok()))
            .collect();
        match ints {
            Some(ints) => Arc::new(Int64Array::from(ints)) as ArrayRef,
            None => Arc::new(StringArray::from(
                self.ids().map(|id| id.to_string()).collect::<Vec<_>>(),
            )) as ArrayRef,
        }
    }

    fn write_parquet<W: Write + Send>(&self, out: W) -> Result<(), CksError> {
        let arrays = std::iter::once((ID_COLUMN.to_string(), self.id_array())).chain(
            self.columns.iter().map(|field| {
                (
                    field.clone(),
                    Arc::new(Float64Array::from(self.column_values(field))) as ArrayRef,
                )
            }),
        );
        let batch = RecordBatch::try_from_iter(arrays)?;

        let mut writer = ArrowWriter::try_new(out, batch.schema(), None)?;
        writer.write(&batch)?;
        writer.close()?;
        Ok(())
    }

    /// Read back a table written by [`SummaryTable::write`].
    ///
    /// Return
    /// ----------
    /// * The table, or [`CksError::InvalidSummaryFile`] when the file does not have the
    ///   summary layout (first column `id`, numeric fields).
    pub fn read(path: &Utf8Path) -> Result<Self, CksError> {
        let rows = if is_csv(path) {
            Self::read_csv(path)?
        } else {
            Self::read_parquet(path)?
        };
        Self::from_rows(rows)
    }

    fn read_csv(path: &Utf8Path) -> Result<Vec<QuantileRow>, CksError> {
        let mut reader = csv::Reader::from_path(path)?;
        let headers = reader.headers()?.clone();
        if headers.get(0) != Some(ID_COLUMN) {
            return Err(invalid(path, "first column must be 'id'"));
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let mut row = QuantileRow::new(ObjectId::parse(record.get(0).unwrap_or_default()));
            for (field, cell) in headers.iter().zip(record.iter()).skip(1) {
                let cell = cell.trim();
                if cell.is_empty() {
                    continue;
                }
                let value = cell.parse::<f64>().map_err(|_| {
                    invalid(path, format!("non numeric value '{cell}' in '{field}'"))
                })?;
                row.push(field, value);
            }
            rows.push(row);
        }
        Ok(rows)
    }

    fn read_parquet(path: &Utf8Path) -> Result<Vec<QuantileRow>, CksError> {
        let file = std::fs::File::open(path)?;
        let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
        let fields: Vec<String> = builder
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect();
        if fields.first().map(String::as_str) != Some(ID_COLUMN) {
            return Err(invalid(path, "first column must be 'id'"));
        }
        let reader = builder.build()?;

        let mut rows = Vec::new();
        for maybe_batch in reader {
            let batch = maybe_batch.map_err(ParquetError::from)?;
            let ids = read_ids(path, batch.column(0).as_ref())?;

            let values = batch
                .columns()
                .iter()
                .skip(1)
                .zip(&fields[1..])
                .map(|(array, field)| {
                    array
                        .as_any()
                        .downcast_ref::<Float64Array>()
                        .ok_or_else(|| invalid(path, format!("column '{field}' is not Float64")))
                })
                .collect::<Result<Vec<_>, _>>()?;

            for (i, id) in ids.into_iter().enumerate() {
                let mut row = QuantileRow::new(id);
                for (array, field) in values.iter().zip(&fields[1..]) {
                    if array.is_valid(i) {
                        row.push(field.as_str(), array.value(i));
                    }
                }
                rows.push(row);
            }
        }
        Ok(rows)
    }
}

fn read_ids(path: &Utf8Path, array: &dyn Array) -> Result<Vec<ObjectId>, CksError> {
    if array.null_count() > 0 {
        return Err(invalid(path, "null id"));
    }
    let any = array.as_any();
    if let Some(arr) = any.downcast_ref::<Int64Array>() {
        Ok(arr
            .values()
            .iter()
            .map(|&n| match u64::try_from(n) {
                Ok(n) => ObjectId::Int(n),
                Err(_) => ObjectId::Name(n.to_string()),
            })
            .collect())
    } else if let Some(arr) = any.downcast_ref::<UInt64Array>() {
        Ok(arr.values().iter().map(|&n| ObjectId::Int(n)).collect())
    } else if let Some(arr) = any.downcast_ref::<StringArray>() {
        Ok(arr.iter().flatten().map(ObjectId::parse).collect())
    } else {
        Err(invalid(
            path,
            format!("unsupported id type {}", array.data_type()),
        ))
    }
}

#[cfg(test)]
mod summary_table_test {
    use camino::Utf8PathBuf;

    use super::*;

    fn row(id: impl Into<ObjectId>, values: &[(&str, f64)]) -> QuantileRow {
        let mut row = QuantileRow::new(id.into());
        for (name, v) in values {
            row.push(*name, *v);
        }
        row
    }

    fn sample_table() -> SummaryTable {
        SummaryTable::from_rows(vec![
            row(20_u64, &[("mass_0_50", 1.1), ("AV_50", 0.2)]),
            row(3_u64, &[("mass_0_50", 0.9), ("radius_0_50", 1.3)]),
            row(7_u64, &[("radius_0_50", 2.25)]),
        ])
        .unwrap()
    }

    #[test]
    fn test_sorted_union_schema() {
        let table = sample_table();
        assert_eq!(
            table.ids().cloned().collect::<Vec<_>>(),
            vec![ObjectId::Int(3), ObjectId::Int(7), ObjectId::Int(20)]
        );
        assert_eq!(table.columns(), &["mass_0_50", "radius_0_50", "AV_50"]);
        assert_eq!(table.get(&ObjectId::Int(7)).unwrap().get("mass_0_50"), None);
        assert!(table.get(&ObjectId::Int(8)).is_none());
    }

    #[test]
    fn test_duplicate_id() {
        let err = SummaryTable::from_rows(vec![
            row(5_u64, &[("a_50", 1.0)]),
            row(5_u64, &[("a_50", 2.0)]),
        ])
        .unwrap_err();
        assert_eq!(err, CksError::DuplicateId("5".into()));
    }

    #[test]
    fn test_parquet_and_csv_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let table = sample_table();

        for name in ["out.parquet", "out.csv"] {
            let path = root.join(name);
            table.write(&path).unwrap();
            assert_eq!(SummaryTable::read(&path).unwrap(), table);
        }
    }

    #[test]
    fn test_named_ids_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("named.parquet")).unwrap();
        let table = SummaryTable::from_rows(vec![
            row("K00752", &[("x_50", 1.0)]),
            row(12_u64, &[("x_50", 2.0)]),
        ])
        .unwrap();
        table.write(&path).unwrap();

        let back = SummaryTable::read(&path).unwrap();
        assert_eq!(back, table);
        assert_eq!(back.rows()[0].id, ObjectId::Int(12));
    }

    #[test]
    fn test_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("out.csv")).unwrap();
        std::fs::write(&path, "stale content\n").unwrap();

        let table = sample_table();
        table.write(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("id,mass_0_50,radius_0_50,AV_50\n3,0.9,1.3,\n"));

        let smaller = SummaryTable::from_rows(vec![row(1_u64, &[("b_50", 4.0)])]).unwrap();
        smaller.write(&path).unwrap();
        assert_eq!(SummaryTable::read(&path).unwrap(), smaller);
    }

    #[test]
    fn test_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("bad.csv")).unwrap();
        std::fs::write(&path, "name,x_50\n1,2.0\n").unwrap();
        assert!(matches!(
            SummaryTable::read(&path),
            Err(CksError::InvalidSummaryFile { .. })
        ));

        std::fs::write(&path, "id,x_50\n1,abc\n").unwrap();
        assert!(matches!(
            SummaryTable::read(&path),
            Err(CksError::InvalidSummaryFile { .. })
        ));
    }
}
