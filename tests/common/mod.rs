#![allow(dead_code)]

use camino::{Utf8Path, Utf8PathBuf};
use cks::samples::{parquet_reader::write_parquet_samples, SampleColumn, SampleSet};
use tempfile::TempDir;

/// Scratch directory, removed when the guard is dropped.
pub fn scratch_dir() -> (TempDir, Utf8PathBuf) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp dir");
    (dir, root)
}

/// Write `{dir}/{id}.parquet` with the given numeric columns.
pub fn write_sample_set(dir: &Utf8Path, id: &str, columns: &[(&str, Vec<f64>)]) {
    let set = SampleSet::new(
        id,
        columns
            .iter()
            .map(|(name, values)| SampleColumn::numeric(*name, values.clone()))
            .collect(),
    );
    write_parquet_samples(&dir.join(format!("{id}.parquet")), &set).expect("write sample set");
}

/// Deterministic pseudo-posterior: `n` draws spread around `center`.
pub fn draws(center: f64, spread: f64, n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let u = ((i * 7919 + 13) % n) as f64 / n as f64;
            center + spread * (u - 0.5)
        })
        .collect()
}

/// Model directory `{base}/starmodels/{name}/models` with a few stars.
pub fn populate_models(base: &Utf8Path, name: &str, ids: &[u32]) -> Utf8PathBuf {
    let models = base.join("starmodels").join(name).join("models");
    std::fs::create_dir_all(&models).expect("create model dir");
    for &id in ids {
        let x = id as f64;
        write_sample_set(
            &models,
            &id.to_string(),
            &[
                ("mass_0", draws(1.0 + 0.01 * x, 0.2, 400)),
                ("radius_0", draws(1.0 + 0.05 * x, 0.3, 400)),
                ("Teff_0", draws(5000.0 + 10.0 * x, 200.0, 400)),
                ("eep_0", draws(350.0, 20.0, 400)),
                ("AV", draws(0.1, 0.05, 400)),
            ],
        );
    }
    models
}
