//! # Parquet sample sets
//!
//! Read (and write) posterior draws stored as **Apache Parquet**. Every leaf column of the
//! file becomes one [`SampleColumn`]; numeric Arrow types are widened to `f64`, everything
//! else is kept as [`ColumnValues::NonNumeric`] with its Arrow type name.
//!
//! ## Null Handling Policy
//! -----------------
//! Two execution paths per batch and column:
//! - **No nulls** (fast path): the raw `&[f64]` slice is appended directly.
//! - **With nulls** (fallback): nulls become `NaN` and are ignored by the quantile code.
//!
//! ## See also
//! ------------
//! * [`SampleSet::load`] – Public entry point, resolves `{dir}/{id}.parquet`.
//! * [`write_parquet_samples`] – Produce a sample set file (fixtures, conversions).
use std::sync::Arc;

use arrow_array::{
    Array, ArrayRef, Float32Array, Float64Array, Int32Array, Int64Array, RecordBatch,
    UInt32Array,
};
use arrow_schema::DataType;
use camino::Utf8Path;
use parquet::arrow::{arrow_reader::ParquetRecordBatchReaderBuilder, ArrowWriter};
use parquet::errors::ParquetError;

use super::{ColumnValues, SampleColumn, SampleSet};
use crate::cks_errors::CksError;

fn is_numeric(data_type: &DataType) -> bool {
    matches!(
        data_type,
        DataType::Float64 | DataType::Float32 | DataType::Int64 | DataType::Int32 | DataType::UInt32
    )
}

/// Append one Arrow array to `out`, widening to `f64`.
///
/// Return
/// ----------
/// * `None` when the array is not one of the supported numeric types.
fn append_numeric(array: &dyn Array, out: &mut Vec<f64>) -> Option<()> {
    let any = array.as_any();
    if let Some(arr) = any.downcast_ref::<Float64Array>() {
        if arr.nulls().is_none() {
            out.extend_from_slice(arr.values());
        } else {
            out.extend(arr.iter().map(|v| v.unwrap_or(f64::NAN)));
        }
    } else if let Some(arr) = any.downcast_ref::<Float32Array>() {
        out.extend(arr.iter().map(|v| v.map_or(f64::NAN, f64::from)));
    } else if let Some(arr) = any.downcast_ref::<Int64Array>() {
        out.extend(arr.iter().map(|v| v.map_or(f64::NAN, |x| x as f64)));
    } else if let Some(arr) = any.downcast_ref::<Int32Array>() {
        out.extend(arr.iter().map(|v| v.map_or(f64::NAN, f64::from)));
    } else if let Some(arr) = any.downcast_ref::<UInt32Array>() {
        out.extend(arr.iter().map(|v| v.map_or(f64::NAN, f64::from)));
    } else {
        return None;
    }
    Some(())
}

/// Load a Parquet sample set.
///
/// Arguments
/// -----------------
/// * `path`: Parquet file.
/// * `id`: Raw identifier recorded on the returned [`SampleSet`].
///
/// Return
/// ----------
/// * The sample set, with columns in schema order.
pub(crate) fn read_parquet_samples(path: &Utf8Path, id: &str) -> Result<SampleSet, CksError> {
    let file = std::fs::File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let schema = builder.schema().clone();
    let reader = builder.with_batch_size(8192).build()?;

    let mut columns: Vec<SampleColumn> = schema
        .fields()
        .iter()
        .map(|field| SampleColumn {
            name: field.name().clone(),
            values: if is_numeric(field.data_type()) {
                ColumnValues::Numeric(Vec::new())
            } else {
                ColumnValues::NonNumeric(field.data_type().to_string())
            },
        })
        .collect();

    for maybe_batch in reader {
        let batch = maybe_batch.map_err(ParquetError::from)?;

        for (column, array) in columns.iter_mut().zip(batch.columns()) {
            if let ColumnValues::Numeric(values) = &mut column.values {
                append_numeric(array.as_ref(), values).ok_or_else(|| {
                    CksError::SampleSetFormat {
                        path: path.to_owned(),
                        reason: format!(
                            "column '{}' has unexpected type {}",
                            column.name,
                            array.data_type()
                        ),
                    }
                })?;
            }
        }
    }

    Ok(SampleSet::new(id, columns))
}

/// Write the numeric columns of a sample set as a Parquet file (`Float64` columns).
pub fn write_parquet_samples(path: &Utf8Path, samples: &SampleSet) -> Result<(), CksError> {
    let arrays = samples
        .columns()
        .iter()
        .filter_map(|column| match &column.values {
            ColumnValues::Numeric(values) => Some((
                column.name.clone(),
                Arc::new(Float64Array::from(values.clone())) as ArrayRef,
            )),
            ColumnValues::NonNumeric(_) => None,
        });
    let batch = RecordBatch::try_from_iter(arrays)?;

    let file = std::fs::File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

#[cfg(test)]
mod parquet_reader_test {
    use arrow_array::StringArray;
    use camino::Utf8PathBuf;

    use super::*;
    use crate::samples::SampleFormat;

    #[test]
    fn test_write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();

        let set = SampleSet::new(
            "12",
            vec![
                SampleColumn::numeric("mass_0", vec![1.0, 1.2, 0.8]),
                SampleColumn::numeric("age", vec![9.5, 9.6, 9.7]),
            ],
        );
        write_parquet_samples(&root.join("12.parquet"), &set).unwrap();

        let loaded = SampleSet::load(&root, "12", SampleFormat::Parquet).unwrap();
        assert_eq!(loaded, set);
    }

    #[test]
    fn test_mixed_types_and_nulls() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("5.parquet")).unwrap();

        let batch = RecordBatch::try_from_iter(vec![
            (
                "radius_0",
                Arc::new(Float32Array::from(vec![Some(1.5), None, Some(2.5)])) as ArrayRef,
            ),
            (
                "n_eff",
                Arc::new(Int64Array::from(vec![10_i64, 20, 30])) as ArrayRef,
            ),
            (
                "label",
                Arc::new(StringArray::from(vec!["a", "b", "c"])) as ArrayRef,
            ),
        ])
        .unwrap();
        let file = std::fs::File::create(&path).unwrap();
        let mut writer = ArrowWriter::try_new(file, batch.schema(), None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let set = read_parquet_samples(&path, "5").unwrap();
        match &set.column("radius_0").unwrap().values {
            ColumnValues::Numeric(v) => {
                assert_eq!(v[0], 1.5);
                assert!(v[1].is_nan());
                assert_eq!(v[2], 2.5);
            }
            other => panic!("unexpected column values: {other:?}"),
        }
        assert_eq!(
            set.column("n_eff").unwrap().values,
            ColumnValues::Numeric(vec![10.0, 20.0, 30.0])
        );
        assert!(matches!(
            set.column("label").unwrap().values,
            ColumnValues::NonNumeric(_)
        ));
    }
}
