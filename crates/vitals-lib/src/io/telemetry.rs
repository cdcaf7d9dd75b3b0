use crate::signal::{HeartRateSample, HeartRateSeries};
use anyhow::{Context, Result};
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Heart-rate channel column in the monitor exports.
pub const DEFAULT_CHANNEL: &str = "Solar8000/HR";

/// Column carrying the sample timestamp in seconds.
const TIME_COLUMN: &str = "Time";

/// Parse a per-case telemetry CSV from any reader.
///
/// Invalid or empty readings load as `None` so their time slot stays visible
/// to gap detection; they are never dropped. An input with a header but no
/// rows yields an explicit empty series.
pub fn parse_case_csv<R: Read>(input: R, channel: &str) -> Result<HeartRateSeries> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .has_headers(true)
        .from_reader(input);
    let headers = reader.headers().context("reading telemetry header")?.clone();

    let time_idx = locate_column(&headers, TIME_COLUMN)?;
    let rate_idx = locate_column(&headers, channel)?;

    let mut samples = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("reading telemetry row {}", row + 1))?;
        let time: f64 = record
            .get(time_idx)
            .ok_or_else(|| anyhow::anyhow!("row {}: missing time field", row + 1))?
            .parse()
            .with_context(|| format!("row {}: time is not a number", row + 1))?;
        if !time.is_finite() || time < 0.0 {
            anyhow::bail!("row {}: time {} out of range", row + 1, time);
        }
        let heart_rate = record
            .get(rate_idx)
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| v.is_finite());
        samples.push(HeartRateSample::new(time.round() as u32, heart_rate));
    }
    Ok(HeartRateSeries::new(samples))
}

/// Read a per-case telemetry CSV from disk.
pub fn read_case_csv(path: &Path, channel: &str) -> Result<HeartRateSeries> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    parse_case_csv(file, channel)
}

fn locate_column(headers: &csv::StringRecord, requested: &str) -> Result<usize> {
    headers
        .iter()
        .position(|name| name.eq_ignore_ascii_case(requested))
        .ok_or_else(|| anyhow::anyhow!("missing column {}", requested))
}
