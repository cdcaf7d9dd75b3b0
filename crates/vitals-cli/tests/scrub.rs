use assert_cmd::cargo::cargo_bin_cmd;
use serde::Deserialize;
use std::{error::Error, path::PathBuf};

#[derive(Deserialize)]
struct FrameSummary {
    percent: f64,
    current_second: u32,
    segments: usize,
    average: Option<f64>,
    is_missing: bool,
    gap_in_render_window: bool,
}

fn sample_path(relative: &str) -> String {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .expect("crates dir")
        .parent()
        .expect("workspace root")
        .join(relative)
        .to_string_lossy()
        .to_string()
}

fn scrub_frames(percents: &[&str]) -> Result<Vec<FrameSummary>, Box<dyn Error>> {
    let mut cmd = cargo_bin_cmd!("vitals");
    cmd.args([
        "scrub",
        "--catalog",
        &sample_path("test_data/catalog_sample.csv"),
        "--telemetry",
        &sample_path("test_data/case_gap.csv"),
        "--case",
        "3",
    ]);
    for percent in percents {
        cmd.args(["--percent", percent]);
    }
    let output = cmd.assert().success().get_output().stdout.clone();
    let mut frames = Vec::new();
    for line in output.split(|&b| b == b'\n').filter(|l| !l.is_empty()) {
        frames.push(serde_json::from_slice(line)?);
    }
    Ok(frames)
}

#[test]
fn forward_replay_detects_the_hole() -> Result<(), Box<dyn Error>> {
    // The fixture records 75 bpm for 0..=99s, nothing at all for 100..=190s,
    // then 90 bpm through 300s.
    let percents: Vec<String> = (0..=10).map(|p| (p * 10).to_string()).collect();
    let refs: Vec<&str> = percents.iter().map(String::as_str).collect();
    let frames = scrub_frames(&refs)?;
    assert_eq!(frames.len(), 11);

    let missing: Vec<u32> = frames
        .iter()
        .filter(|f| f.is_missing)
        .map(|f| f.current_second)
        .collect();
    // The averaging window only runs dry once its floor passes 99s.
    assert_eq!(missing, vec![180]);

    let at_gap = frames.iter().find(|f| f.current_second == 180).unwrap();
    assert_eq!(at_gap.average, Some(75.0));

    let last = frames.last().unwrap();
    assert_eq!(last.percent, 100.0);
    assert_eq!(last.current_second, 300);
    assert!(last.gap_in_render_window);
    assert_eq!(last.segments, 2);
    assert_eq!(last.average, Some(90.0));

    // Every frame with any data behind it carries a finite average.
    assert!(frames.iter().all(|f| f.average.is_some()));
    Ok(())
}

#[test]
fn repeated_position_is_idempotent() -> Result<(), Box<dyn Error>> {
    let frames = scrub_frames(&["0", "30", "60", "60"])?;
    assert_eq!(frames.len(), 4);
    let a = &frames[2];
    let b = &frames[3];
    assert_eq!(a.current_second, b.current_second);
    assert_eq!(a.segments, b.segments);
    assert_eq!(a.average, b.average);
    assert_eq!(a.is_missing, b.is_missing);
    Ok(())
}

#[test]
fn backward_scrub_replays_gap_entry_average() -> Result<(), Box<dyn Error>> {
    // Forward through the hole, then back into it: the average must be the
    // one captured on entry, not a recomputation over nothing.
    let frames = scrub_frames(&["0", "20", "40", "50", "60", "80", "100", "60"])?;
    let revisit = frames.last().unwrap();
    assert!(revisit.is_missing);
    assert_eq!(revisit.average, Some(75.0));
    Ok(())
}
