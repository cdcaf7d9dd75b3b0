use crate::catalog::{Catalog, CatalogRow, PatientRecord};
use anyhow::{Context, Result};
use csv::{ReaderBuilder, Trim};
use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::Path;

/// Parse the patient catalog CSV from any reader, validating each row at
/// this boundary.
pub fn parse_catalog_csv<R: Read>(input: R) -> Result<Catalog> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .has_headers(true)
        .from_reader(input);
    let mut records = Vec::new();
    for (idx, row) in reader.deserialize::<CatalogRow>().enumerate() {
        let row = row.with_context(|| format!("parsing catalog row {}", idx + 1))?;
        let record = PatientRecord::from_row(row)
            .with_context(|| format!("validating catalog row {}", idx + 1))?;
        records.push(record);
    }
    Ok(Catalog::new(records))
}

/// Read the patient catalog CSV from disk.
pub fn read_catalog_csv(path: &Path) -> Result<Catalog> {
    let file = fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
    parse_catalog_csv(file)
}

/// Read the surgery-category description map (category key to
/// human-readable text).
pub fn read_descriptions(path: &Path) -> Result<BTreeMap<String, String>> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}
