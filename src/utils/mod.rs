use statrs::statistics::{Data, OrderStatistics};
use std::time::Instant;

/// Returns a formatted string of elapsed time, e.g.
/// `1min 34.852s`
pub fn get_formatted_elapsed_time(instant: Instant) -> String {
    let dur = instant.elapsed();
    let minutes = dur.as_secs() / 60;
    let sub_sec = dur.as_secs() % 60;
    let sub_milli = dur.subsec_millis();
    if minutes > 0 {
        return format!("{}min {}.{:03}s", minutes, sub_sec, sub_milli);
    }
    format!("{}.{:03}s", sub_sec, sub_milli)
}

/// Interquartile range of a sample. Returns zero for an empty sample.
pub fn interquartile_range(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0f64;
    }
    let mut data = Data::new(values.to_vec());
    let iqr = data.interquartile_range();
    if iqr.is_finite() {
        iqr
    } else {
        0f64
    }
}

/// The (lower, upper) percentile values of a sample, with percentiles given
/// in the range 0-100. Returns `None` for an empty sample.
pub fn percentile_band(values: &[f64], lower: usize, upper: usize) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let mut data = Data::new(values.to_vec());
    Some((data.percentile(lower), data.percentile(upper)))
}
