use crate::signal::{HeartRateSample, HeartRateSeries};
use crate::zones::ZoneBoundaries;
use log::debug;
use serde::{Deserialize, Serialize};

/// Window lengths for the scrubber, in seconds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScrubConfig {
    /// Trailing span that gets rendered.
    pub render_window_s: u32,
    /// Trailing span feeding the rolling average and gap detection.
    pub average_window_s: u32,
}

impl Default for ScrubConfig {
    fn default() -> Self {
        Self {
            render_window_s: 15 * 60,
            average_window_s: 60,
        }
    }
}

/// A contiguous span where the trailing averaging window held zero valid
/// readings. Open (`end_second == None`) while the gap is ongoing.
///
/// `average_at_start` is the rolling average that was current when the gap
/// was entered; scrubbing back into the gap replays it instead of
/// recomputing over nothing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GapInterval {
    pub start_second: u32,
    pub end_second: Option<u32>,
    pub average_at_start: Option<f64>,
}

impl GapInterval {
    fn contains(&self, second: u32) -> bool {
        second >= self.start_second && self.end_second.map_or(true, |end| second <= end)
    }
}

/// One scrubber output: everything the renderer needs for the current
/// playhead position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrubFrame {
    pub percent: f64,
    pub current_second: u32,
    /// Lower edge of the rendered trailing window.
    pub window_start: u32,
    /// Gap-free sub-runs of the visible window, one polyline each.
    pub segments: Vec<Vec<HeartRateSample>>,
    /// Rolling average over the trailing minute; survives gaps by replaying
    /// the last value computed from real data.
    pub average: Option<f64>,
    /// True while the trailing averaging window holds no valid reading.
    pub is_missing: bool,
    /// True when some gap starts strictly inside the rendered window, i.e.
    /// the line must be drawn as disjoint segments.
    pub gap_in_render_window: bool,
    pub zones: ZoneBoundaries,
}

impl ScrubFrame {
    pub fn has_data(&self) -> bool {
        self.segments.iter().any(|seg| !seg.is_empty())
    }
}

/// Owns one case's scrub state: the series, recorded gaps, and the previous
/// call's position. All module-level mutable state of the event-callback
/// formulation lives here explicitly.
#[derive(Debug, Clone)]
pub struct Scrubber {
    series: HeartRateSeries,
    zones: ZoneBoundaries,
    config: ScrubConfig,
    gaps: Vec<GapInterval>,
    last_second: Option<u32>,
    last_average: Option<f64>,
    last_window_had_data: Option<bool>,
}

impl Scrubber {
    pub fn new(series: HeartRateSeries, zones: ZoneBoundaries, config: ScrubConfig) -> Self {
        Self {
            series,
            zones,
            config,
            gaps: Vec::new(),
            last_second: None,
            last_average: None,
            last_window_had_data: None,
        }
    }

    pub fn series(&self) -> &HeartRateSeries {
        &self.series
    }

    pub fn zones(&self) -> ZoneBoundaries {
        self.zones
    }

    pub fn config(&self) -> ScrubConfig {
        self.config
    }

    /// Gaps recorded so far, ordered by start.
    pub fn gaps(&self) -> &[GapInterval] {
        &self.gaps
    }

    /// The playhead percent corresponding to an absolute second.
    pub fn percent_at(&self, second: u32) -> f64 {
        let duration = self.series.duration_seconds();
        if duration == 0 {
            0.0
        } else {
            second as f64 / duration as f64 * 100.0
        }
    }

    /// Move the playhead and produce the frame for its new position.
    pub fn advance_to(&mut self, percent: f64) -> ScrubFrame {
        let percent = if percent.is_finite() {
            percent.clamp(0.0, 100.0)
        } else {
            0.0
        };

        if self.series.is_empty() {
            return ScrubFrame {
                percent,
                current_second: 0,
                window_start: 0,
                segments: Vec::new(),
                average: None,
                is_missing: false,
                gap_in_render_window: false,
                zones: self.zones,
            };
        }

        let duration = self.series.duration_seconds();
        let current = (percent / 100.0 * duration as f64).round() as u32;
        let window_start = current.saturating_sub(self.config.render_window_s);

        let first_second = self.series.first_second().unwrap_or(0);
        let visible: Vec<HeartRateSample> = if current < first_second {
            // Before recording starts the window degenerates to the first
            // sample so the chart is never empty.
            self.series.samples.first().copied().into_iter().collect()
        } else {
            self.series
                .samples
                .iter()
                .copied()
                .filter(|s| s.second >= window_start && s.second <= current)
                .collect()
        };

        let recent_floor = current as i64 - self.config.average_window_s as i64;
        let recent_valid: Vec<&HeartRateSample> = visible
            .iter()
            .filter(|s| s.second as i64 >= recent_floor && s.is_valid())
            .collect();

        let is_missing = recent_valid.is_empty();
        let moving_forward = self.last_second.map_or(false, |prev| current > prev);

        let average = if is_missing {
            self.resolve_missing(current, moving_forward)
        } else {
            self.close_open_gaps(moving_forward);
            let sum: f64 = recent_valid.iter().filter_map(|s| s.heart_rate).sum();
            let mean = sum / recent_valid.len() as f64;
            self.last_average = Some(mean);
            Some(mean)
        };

        let window_floor = current as i64 - self.config.render_window_s as i64;
        let cuts: Vec<GapInterval> = self
            .gaps
            .iter()
            .copied()
            .filter(|g| (g.start_second as i64) > window_floor && g.start_second < current)
            .collect();
        let gap_in_render_window = !cuts.is_empty();
        let segments = split_segments(&visible, &cuts);

        self.last_second = Some(current);
        self.last_window_had_data = Some(!is_missing);

        ScrubFrame {
            percent,
            current_second: current,
            window_start,
            segments,
            average,
            is_missing,
            gap_in_render_window,
            zones: self.zones,
        }
    }

    /// The averaging window is empty: replay a recorded gap if the playhead
    /// is inside one, or open a new interval on a forward has-data to
    /// no-data transition. Backward movement only reads history.
    fn resolve_missing(&mut self, current: u32, moving_forward: bool) -> Option<f64> {
        if let Some(gap) = self.gaps.iter().find(|g| g.contains(current)) {
            let average = gap.average_at_start.or(self.last_average);
            self.last_average = average;
            return average;
        }
        if moving_forward && self.last_window_had_data == Some(true) {
            debug!("heart-rate gap opened at {current}s");
            self.gaps.push(GapInterval {
                start_second: current,
                end_second: None,
                average_at_start: self.last_average,
            });
            self.gaps.sort_by_key(|g| g.start_second);
        }
        if self.last_average.is_none() {
            self.last_average = self.average_before(current);
        }
        self.last_average
    }

    /// Average over the trailing minute ending at the newest valid sample at
    /// or before `second`. Covers a session whose very first position lands
    /// inside silence: some sample exists behind the playhead, so the
    /// average must still be defined.
    fn average_before(&self, second: u32) -> Option<f64> {
        let anchor = self
            .series
            .samples
            .iter()
            .rev()
            .find(|s| s.second <= second && s.is_valid())?;
        let floor = anchor.second.saturating_sub(self.config.average_window_s);
        let (sum, count) = self
            .series
            .samples
            .iter()
            .filter(|s| s.second >= floor && s.second <= anchor.second && s.is_valid())
            .fold((0.0, 0usize), |(sum, count), s| {
                (sum + s.heart_rate.unwrap_or_default(), count + 1)
            });
        if count == 0 {
            None
        } else {
            Some(sum / count as f64)
        }
    }

    /// Data reappeared after an empty window while moving forward: close the
    /// interval at the previous playhead second.
    fn close_open_gaps(&mut self, moving_forward: bool) {
        if !moving_forward || self.last_window_had_data != Some(false) {
            return;
        }
        let prev = match self.last_second {
            Some(prev) => prev,
            None => return,
        };
        for gap in self
            .gaps
            .iter_mut()
            .filter(|g| g.end_second.is_none() && g.start_second <= prev)
        {
            let end = prev.max(gap.start_second + 1);
            debug!(
                "heart-rate gap {}s..{}s closed",
                gap.start_second, end
            );
            gap.end_second = Some(end);
        }
    }
}

/// Split the visible window into one run per side of each gap that starts
/// inside it. `cuts` must be ordered by start.
fn split_segments(visible: &[HeartRateSample], cuts: &[GapInterval]) -> Vec<Vec<HeartRateSample>> {
    if visible.is_empty() && cuts.is_empty() {
        return Vec::new();
    }
    let mut segments = Vec::with_capacity(cuts.len() + 1);
    let mut lower: Option<u32> = None;
    for gap in cuts {
        let run: Vec<HeartRateSample> = visible
            .iter()
            .copied()
            .filter(|s| lower.map_or(true, |lo| s.second >= lo) && s.second <= gap.start_second)
            .collect();
        segments.push(run);
        lower = Some(gap.end_second.unwrap_or(u32::MAX));
    }
    let tail: Vec<HeartRateSample> = visible
        .iter()
        .copied()
        .filter(|s| lower.map_or(true, |lo| s.second >= lo))
        .collect();
    segments.push(tail);
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dense_series(start: u32, end: u32, rate: f64) -> Vec<HeartRateSample> {
        (start..=end)
            .map(|second| HeartRateSample::new(second, Some(rate)))
            .collect()
    }

    fn scrubber(samples: Vec<HeartRateSample>) -> Scrubber {
        Scrubber::new(
            HeartRateSeries::new(samples),
            ZoneBoundaries::for_age(30.0),
            ScrubConfig::default(),
        )
    }

    fn percent_for(second: u32, duration: u32) -> f64 {
        second as f64 / duration as f64 * 100.0
    }

    #[test]
    fn forward_scrub_over_dense_series_keeps_one_segment() {
        let mut scrub = scrubber(dense_series(0, 1800, 72.0));
        for step in 0..=100 {
            let frame = scrub.advance_to(step as f64);
            assert_eq!(frame.segments.len(), 1, "at {step}%");
            assert!(!frame.is_missing);
            let avg = frame.average.expect("average defined");
            assert!(avg.is_finite());
            assert!((avg - 72.0).abs() < 1e-9);
        }
        assert!(scrub.gaps().is_empty());
    }

    #[test]
    fn advance_is_idempotent() {
        let mut samples = dense_series(0, 99, 75.0);
        samples.extend(dense_series(191, 1800, 75.0));
        let mut scrub = scrubber(samples);
        for second in (0..=400).step_by(10) {
            scrub.advance_to(percent_for(second, 1800));
        }
        let gaps_before = scrub.gaps().to_vec();
        let first = scrub.advance_to(percent_for(400, 1800));
        let second = scrub.advance_to(percent_for(400, 1800));
        assert_eq!(first, second);
        assert_eq!(scrub.gaps(), gaps_before.as_slice());
    }

    #[test]
    fn absent_samples_open_and_close_a_gap() {
        // Dense 1 Hz except seconds 100..=190 produced nothing at all.
        let mut samples = dense_series(0, 99, 75.0);
        samples.extend(dense_series(191, 1800, 75.0));
        let mut scrub = scrubber(samples);

        let mut first_missing = None;
        for second in (0..=200).step_by(10) {
            let frame = scrub.advance_to(percent_for(second, 1800));
            if frame.is_missing && first_missing.is_none() {
                first_missing = Some(second);
            }
        }
        // The averaging window only empties once its floor passes the last
        // real sample at 99s.
        assert_eq!(first_missing, Some(160));

        let frame = scrub.advance_to(percent_for(200, 1800));
        assert!(!frame.is_missing);
        assert!(frame.gap_in_render_window);
        assert_eq!(frame.segments.len(), 2);
        assert!(frame.segments[0].iter().all(|s| s.second <= 160));
        assert!(frame.segments[1].iter().all(|s| s.second >= 190));

        assert_eq!(scrub.gaps().len(), 1);
        let gap = scrub.gaps()[0];
        assert_eq!(gap.start_second, 160);
        assert_eq!(gap.end_second, Some(190));
        assert!(gap.start_second < gap.end_second.unwrap());
    }

    #[test]
    fn backward_scrub_replays_average_at_gap_entry() {
        // 75 bpm before the hole, 90 bpm after it.
        let mut samples = dense_series(0, 99, 75.0);
        samples.extend(dense_series(191, 1800, 90.0));
        let mut scrub = scrubber(samples);

        for second in (0..=300).step_by(10) {
            scrub.advance_to(percent_for(second, 1800));
        }
        let at_entry = scrub.gaps()[0].average_at_start.expect("captured");
        assert!((at_entry - 75.0).abs() < 1e-9);

        let frame = scrub.advance_to(percent_for(170, 1800));
        assert!(frame.is_missing);
        assert_eq!(frame.average, Some(at_entry));
        // Reading history must not mint new intervals.
        assert_eq!(scrub.gaps().len(), 1);
    }

    #[test]
    fn backward_scrub_never_creates_gaps() {
        let mut samples = dense_series(0, 99, 75.0);
        samples.extend(dense_series(191, 400, 75.0));
        let mut scrub = scrubber(samples);
        scrub.advance_to(percent_for(400, 400));
        // Jump straight back into the silent region without ever having
        // crossed it forward step by step.
        let frame = scrub.advance_to(percent_for(160, 400));
        assert!(frame.is_missing);
        assert!(scrub.gaps().is_empty());
        // The last good average carries through.
        assert!(frame.average.is_some());
    }

    #[test]
    fn first_position_inside_silence_still_has_an_average() {
        let mut samples = dense_series(0, 99, 75.0);
        samples.extend(dense_series(191, 400, 90.0));
        let mut scrub = scrubber(samples);
        // No prior calls: the playhead lands straight in the hole.
        let frame = scrub.advance_to(percent_for(170, 400));
        assert!(frame.is_missing);
        assert_eq!(frame.average, Some(75.0));
        assert!(scrub.gaps().is_empty());
    }

    #[test]
    fn trailing_window_clips_to_fifteen_minutes() {
        let mut scrub = scrubber(dense_series(0, 1800, 70.0));

        let frame = scrub.advance_to(percent_for(1000, 1800));
        assert_eq!(frame.current_second, 1000);
        assert_eq!(frame.window_start, 100);
        let all: Vec<u32> = frame.segments[0].iter().map(|s| s.second).collect();
        assert_eq!(*all.first().unwrap(), 100);
        assert_eq!(*all.last().unwrap(), 1000);

        let frame = scrub.advance_to(percent_for(500, 1800));
        assert_eq!(frame.window_start, 0);
        let all: Vec<u32> = frame.segments[0].iter().map(|s| s.second).collect();
        assert_eq!(*all.first().unwrap(), 0);
        assert_eq!(*all.last().unwrap(), 500);
    }

    #[test]
    fn playhead_before_first_sample_shows_first_sample() {
        let mut scrub = scrubber(dense_series(300, 1800, 68.0));
        let frame = scrub.advance_to(1.0); // 18s, well before 300s
        assert_eq!(frame.segments.len(), 1);
        assert_eq!(frame.segments[0].len(), 1);
        assert_eq!(frame.segments[0][0].second, 300);
    }

    #[test]
    fn empty_series_reports_no_data() {
        let mut scrub = scrubber(Vec::new());
        let frame = scrub.advance_to(50.0);
        assert!(!frame.has_data());
        assert!(frame.segments.is_empty());
        assert_eq!(frame.average, None);
        assert!(!frame.is_missing);
    }

    #[test]
    fn invalid_minute_end_to_end() {
        // 3600 s at 1 Hz, constant 75 bpm, readings present but invalid for
        // seconds 1200..=1260.
        let samples: Vec<HeartRateSample> = (0..=3600)
            .map(|second| {
                let rate = if (1200..=1260).contains(&second) {
                    None
                } else {
                    Some(75.0)
                };
                HeartRateSample::new(second, rate)
            })
            .collect();
        let mut scrub = scrubber(samples);

        let mut missing_at = Vec::new();
        for step in 0..=100 {
            let frame = scrub.advance_to(step as f64);
            if frame.is_missing {
                missing_at.push(frame.current_second);
            } else {
                let avg = frame.average.expect("average defined");
                assert!((avg - 75.0).abs() < 1e-9, "at {}s", frame.current_second);
            }
            if let Some(avg) = frame.average {
                assert!(avg.is_finite());
            }
        }
        // The 1% grid lands on 36 s multiples; the only playhead whose whole
        // trailing minute is invalid is 1260 s.
        assert_eq!(missing_at, vec![1260]);

        // The replayed average inside the hole equals the pre-gap average.
        let gap = scrub.gaps()[0];
        assert_eq!(gap.average_at_start, Some(75.0));
        assert!(gap.start_second < gap.end_second.unwrap());
    }

    #[test]
    fn segment_count_tracks_gaps_in_window() {
        // Two separate holes inside a long recording.
        let mut samples = dense_series(0, 199, 70.0);
        samples.extend(dense_series(300, 499, 70.0));
        samples.extend(dense_series(620, 1800, 70.0));
        let mut scrub = scrubber(samples);
        for second in (0..=800).step_by(20) {
            scrub.advance_to(percent_for(second, 1800));
        }
        assert_eq!(scrub.gaps().len(), 2);
        let frame = scrub.advance_to(percent_for(800, 1800));
        let in_window = scrub
            .gaps()
            .iter()
            .filter(|g| {
                (g.start_second as i64) > frame.current_second as i64 - 900
                    && g.start_second < frame.current_second
            })
            .count();
        assert_eq!(frame.segments.len(), 1 + in_window);
    }

    #[test]
    fn percent_is_clamped() {
        let mut scrub = scrubber(dense_series(0, 100, 70.0));
        let frame = scrub.advance_to(250.0);
        assert_eq!(frame.current_second, 100);
        let frame = scrub.advance_to(-5.0);
        assert_eq!(frame.current_second, 0);
        let frame = scrub.advance_to(f64::NAN);
        assert_eq!(frame.current_second, 0);
    }
}
