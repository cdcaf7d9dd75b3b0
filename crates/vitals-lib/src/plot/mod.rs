use crate::config::Palette;
use crate::scrub::ScrubFrame;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Axis {
    pub label: Option<String>,
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
pub struct Color(pub u32);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Style {
    pub width: f32,
    pub color: Color,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineSeries {
    pub name: String,
    pub points: Vec<[f64; 2]>,
    pub style: Style,
}

/// Horizontal shaded rectangle spanning the full x domain between two rates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Band {
    pub name: String,
    pub from_rate: f64,
    pub to_rate: f64,
    pub color: Color,
}

/// Backend-neutral description of the windowed chart. The rendering layer
/// (plotters, a terminal chart) turns this into pixels; nothing here knows
/// how to draw.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Figure {
    pub title: Option<String>,
    pub x: Axis,
    pub y: Axis,
    pub x_domain: [f64; 2],
    pub y_domain: [f64; 2],
    pub bands: Vec<Band>,
    pub series: Vec<LineSeries>,
}

impl Figure {
    pub fn is_empty(&self) -> bool {
        self.series.iter().all(|s| s.points.is_empty())
    }
}

/// Bound the point count of a polyline by bucketed subsampling.
pub fn decimate(points: &[[f64; 2]], max_points: usize) -> Vec<[f64; 2]> {
    if points.len() <= max_points || max_points == 0 {
        return points.to_vec();
    }
    let bucket = points.len() as f64 / max_points as f64;
    let mut out = Vec::with_capacity(max_points);
    for i in 0..max_points {
        let idx = (i as f64 * bucket).floor() as usize;
        if idx >= points.len() {
            break;
        }
        out.push(points[idx]);
    }
    out
}

const MAX_POINTS_PER_SEGMENT: usize = 1024;

/// Build the windowed chart for one scrub frame: y domain snapped to
/// decades, zone bands clipped to it, one polyline per gap-free segment.
pub fn window_figure(frame: &ScrubFrame, palette: &Palette) -> Figure {
    let rates: Vec<f64> = frame
        .segments
        .iter()
        .flatten()
        .filter_map(|s| s.heart_rate)
        .filter(|r| r.is_finite())
        .collect();
    let (rate_lo, rate_hi) = rates.iter().fold((f64::MAX, f64::MIN), |(lo, hi), &r| {
        (lo.min(r), hi.max(r))
    });
    let (first_y, end_y) = if rates.is_empty() {
        (0.0, 100.0)
    } else {
        (
            ((rate_lo / 10.0).floor() * 10.0).max(0.0),
            (rate_hi / 10.0).ceil() * 10.0,
        )
    };

    let x_end = (frame.current_second as f64).max(frame.window_start as f64 + 1.0);
    let zones = frame.zones;

    let mut bands = Vec::new();
    let mut push_band = |name: &str, from: f64, to: f64, color: u32| {
        let from = from.max(first_y);
        let to = to.min(end_y);
        if to > from {
            bands.push(Band {
                name: name.to_string(),
                from_rate: from,
                to_rate: to,
                color: Color(color),
            });
        }
    };
    push_band("too low", first_y, zones.resting_floor, palette.too_low);
    push_band("resting", zones.resting_floor, zones.moderate, palette.resting);
    push_band("moderate", zones.moderate, zones.vigorous, palette.moderate);
    push_band("vigorous", zones.vigorous, end_y, palette.vigorous);

    let series = frame
        .segments
        .iter()
        .enumerate()
        .map(|(idx, segment)| {
            let points: Vec<[f64; 2]> = segment
                .iter()
                .filter(|s| s.is_valid())
                .map(|s| [s.second as f64, s.heart_rate.unwrap_or_default()])
                .collect();
            LineSeries {
                name: format!("segment {}", idx + 1),
                points: decimate(&points, MAX_POINTS_PER_SEGMENT),
                style: Style {
                    width: 2.0,
                    color: Color(palette.trace),
                },
            }
        })
        .collect();

    Figure {
        title: None,
        x: Axis {
            label: Some("Time since operation started".into()),
        },
        y: Axis {
            label: Some("Heart rate (bpm)".into()),
        },
        x_domain: [frame.window_start as f64, x_end],
        y_domain: [first_y, end_y],
        bands,
        series,
    }
}
