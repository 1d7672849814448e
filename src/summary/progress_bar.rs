//! Progress reporting for summary runs (enabled with the `progress` feature).
//!
//! Components
//! -----------------
//! * [`summary_progress_bar`] – Bar over the sample sets dispatched to the workers.
//! * [`fmt_dur`] – Human-readable [`Duration`], e.g. `"253µs"`, `"42ms"`, `"3.14s"`.
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

const TEMPLATE: &str =
    "{bar:40.cyan/blue} {pos}/{len} ({percent:>3}%) | {per_sec} | ETA {eta_precise} | {msg}";

/// Progress bar over `total` sample sets.
///
/// The bar is `Sync` and can be ticked from rayon workers directly.
pub(crate) fn summary_progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total.max(1));
    let style =
        ProgressStyle::with_template(TEMPLATE).unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb.enable_steady_tick(Duration::from_millis(200));
    pb
}

/// Duration with a unit matched to its magnitude.
pub fn fmt_dur(d: Duration) -> String {
    match d.as_micros() {
        us @ 0..=999 => format!("{us}µs"),
        us if us < 1_000_000 => format!("{}ms", us / 1_000),
        _ => format!("{:.2}s", d.as_secs_f64()),
    }
}

#[cfg(test)]
mod progress_bar_test {
    use super::*;

    #[test]
    fn test_fmt_dur() {
        assert_eq!(fmt_dur(Duration::from_micros(253)), "253µs");
        assert_eq!(fmt_dur(Duration::from_millis(42)), "42ms");
        assert_eq!(fmt_dur(Duration::from_millis(3140)), "3.14s");
        assert_eq!(fmt_dur(Duration::from_micros(999_999)), "999ms");
        assert_eq!(fmt_dur(Duration::ZERO), "0µs");
    }
}
