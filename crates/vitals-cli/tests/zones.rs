use assert_cmd::cargo::cargo_bin_cmd;
use serde::Deserialize;
use std::error::Error;

#[derive(Deserialize)]
struct Zones {
    resting_floor: f64,
    moderate: f64,
    vigorous: f64,
    peak: f64,
}

#[test]
fn zones_for_an_adult() -> Result<(), Box<dyn Error>> {
    let mut cmd = cargo_bin_cmd!("vitals");
    cmd.args(["zones", "--age", "30"]);
    let output = cmd.assert().success().get_output().stdout.clone();
    let zones: Zones = serde_json::from_slice(&output)?;
    assert_eq!(zones.resting_floor, 40.0);
    assert_eq!(zones.moderate, 95.0);
    assert_eq!(zones.vigorous, 133.0);
    assert_eq!(zones.peak, 161.5);
    Ok(())
}

#[test]
fn zones_for_young_children_raise_the_floor() -> Result<(), Box<dyn Error>> {
    for (age, floor) in [("4", 80.0), ("9", 70.0)] {
        let mut cmd = cargo_bin_cmd!("vitals");
        cmd.args(["zones", "--age", age]);
        let output = cmd.assert().success().get_output().stdout.clone();
        let zones: Zones = serde_json::from_slice(&output)?;
        assert_eq!(zones.resting_floor, floor, "age {age}");
    }
    Ok(())
}

#[test]
fn negative_age_is_rejected() {
    let mut cmd = cargo_bin_cmd!("vitals");
    cmd.args(["zones", "--age=-1"]);
    cmd.assert().failure();
}
