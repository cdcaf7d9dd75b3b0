use assert_cmd::cargo::cargo_bin_cmd;
use serde::Deserialize;
use std::{error::Error, path::PathBuf};

#[derive(Deserialize)]
struct Summary {
    category: String,
    description: Option<String>,
    count: usize,
    mean_heart_rate: Option<f64>,
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

#[test]
fn rollup_excludes_others_by_default() -> Result<(), Box<dyn Error>> {
    let mut cmd = cargo_bin_cmd!("vitals");
    cmd.args([
        "categories",
        "--catalog",
        &sample_path("test_data/catalog_sample.csv"),
    ]);
    let output = cmd.assert().success().get_output().stdout.clone();
    let summaries: Vec<Summary> = serde_json::from_slice(&output)?;

    assert_eq!(summaries.len(), 3);
    assert!(summaries.iter().all(|s| s.category != "Others"));
    let colorectal = summaries
        .iter()
        .find(|s| s.category == "Colorectal")
        .expect("colorectal present");
    assert_eq!(colorectal.count, 2);
    assert_eq!(colorectal.mean_heart_rate, Some(78.0));
    Ok(())
}

#[test]
fn include_others_and_join_descriptions() -> Result<(), Box<dyn Error>> {
    let mut cmd = cargo_bin_cmd!("vitals");
    cmd.args([
        "categories",
        "--catalog",
        &sample_path("test_data/catalog_sample.csv"),
        "--descriptions",
        &sample_path("test_data/optype_descriptions.json"),
        "--include-others",
    ]);
    let output = cmd.assert().success().get_output().stdout.clone();
    let summaries: Vec<Summary> = serde_json::from_slice(&output)?;

    assert_eq!(summaries.len(), 4);
    let others = summaries
        .iter()
        .find(|s| s.category == "Others")
        .expect("others present");
    assert_eq!(others.count, 1);
    assert!(others
        .description
        .as_deref()
        .unwrap_or_default()
        .contains("service lines"));
    Ok(())
}

#[test]
fn case_info_reports_one_record() -> Result<(), Box<dyn Error>> {
    #[derive(Deserialize)]
    struct CaseInfo {
        case_id: u32,
        category: String,
        hypertension: bool,
        mortality: bool,
    }

    let mut cmd = cargo_bin_cmd!("vitals");
    cmd.args([
        "case-info",
        "--catalog",
        &sample_path("test_data/catalog_sample.csv"),
        "--case",
        "4",
    ]);
    let output = cmd.assert().success().get_output().stdout.clone();
    let info: CaseInfo = serde_json::from_slice(&output)?;
    assert_eq!(info.case_id, 4);
    assert_eq!(info.category, "Colorectal");
    assert!(info.hypertension);
    assert!(info.mortality);
    Ok(())
}

#[test]
fn unknown_case_is_a_clean_failure() {
    let mut cmd = cargo_bin_cmd!("vitals");
    cmd.args([
        "case-info",
        "--catalog",
        &sample_path("test_data/catalog_sample.csv"),
        "--case",
        "999",
    ]);
    cmd.assert().failure();
}
