use serde::{Deserialize, Serialize};

/// One recorded instant of intraoperative telemetry.
///
/// `heart_rate` is `None` when the monitor emitted a row for this second but
/// the reading itself was invalid. A second with no sample at all simply has
/// no entry in the series; the two cases are distinct and both matter to gap
/// detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeartRateSample {
    pub second: u32,
    pub heart_rate: Option<f64>,
}

impl HeartRateSample {
    pub fn new(second: u32, heart_rate: Option<f64>) -> Self {
        Self { second, heart_rate }
    }

    pub fn is_valid(&self) -> bool {
        self.heart_rate.map(f64::is_finite).unwrap_or(false)
    }
}

/// Heart-rate samples for exactly one case, ordered by `second` ascending.
///
/// A series is immutable once loaded; selecting a different case replaces it
/// wholesale.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeartRateSeries {
    pub samples: Vec<HeartRateSample>,
}

impl HeartRateSeries {
    pub fn new(mut samples: Vec<HeartRateSample>) -> Self {
        samples.sort_by_key(|s| s.second);
        Self { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn first_second(&self) -> Option<u32> {
        self.samples.first().map(|s| s.second)
    }

    pub fn last_second(&self) -> Option<u32> {
        self.samples.last().map(|s| s.second)
    }

    /// Total recorded duration, i.e. the timestamp of the final sample.
    pub fn duration_seconds(&self) -> u32 {
        self.last_second().unwrap_or(0)
    }

    /// Min/max over valid readings only.
    pub fn rate_bounds(&self) -> Option<(f64, f64)> {
        let mut bounds: Option<(f64, f64)> = None;
        for sample in self.samples.iter().filter(|s| s.is_valid()) {
            let rate = sample.heart_rate.unwrap_or_default();
            bounds = Some(match bounds {
                Some((lo, hi)) => (lo.min(rate), hi.max(rate)),
                None => (rate, rate),
            });
        }
        bounds
    }

    /// Mean over valid readings; `None` when the series holds none.
    pub fn mean_rate(&self) -> Option<f64> {
        let mut sum = 0.0;
        let mut count = 0usize;
        for sample in &self.samples {
            if let Some(rate) = sample.heart_rate.filter(|r| r.is_finite()) {
                sum += rate;
                count += 1;
            }
        }
        if count == 0 {
            None
        } else {
            Some(sum / count as f64)
        }
    }
}

/// Format a second count as HH:MM:SS for playhead readouts.
pub fn format_hms(seconds: u32) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{hours:02}:{minutes:02}:{secs:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn series_sorts_on_construction() {
        let series = HeartRateSeries::new(vec![
            HeartRateSample::new(10, Some(70.0)),
            HeartRateSample::new(2, Some(65.0)),
            HeartRateSample::new(5, None),
        ]);
        let seconds: Vec<u32> = series.samples.iter().map(|s| s.second).collect();
        assert_eq!(seconds, vec![2, 5, 10]);
        assert_eq!(series.first_second(), Some(2));
        assert_eq!(series.duration_seconds(), 10);
    }

    #[test]
    fn mean_skips_invalid_readings() {
        let series = HeartRateSeries::new(vec![
            HeartRateSample::new(0, Some(60.0)),
            HeartRateSample::new(1, None),
            HeartRateSample::new(2, Some(80.0)),
        ]);
        assert_eq!(series.mean_rate(), Some(70.0));
        assert_eq!(series.rate_bounds(), Some((60.0, 80.0)));
    }

    #[test]
    fn empty_series_reports_no_rates() {
        let series = HeartRateSeries::default();
        assert!(series.is_empty());
        assert_eq!(series.mean_rate(), None);
        assert_eq!(series.rate_bounds(), None);
    }

    #[test]
    fn hms_formatting() {
        assert_eq!(format_hms(0), "00:00:00");
        assert_eq!(format_hms(3661), "01:01:01");
        assert_eq!(format_hms(900), "00:15:00");
    }
}
