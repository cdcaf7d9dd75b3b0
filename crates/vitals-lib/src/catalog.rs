use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    /// Ages outside `[0, inf)` violate the zone-derivation contract and are
    /// rejected here, at the catalog boundary.
    #[error("case {case_id}: invalid age {age}")]
    InvalidAge { case_id: u32, age: f64 },
    #[error("case {case_id}: invalid surgery duration {duration}")]
    InvalidDuration { case_id: u32, duration: f64 },
}

/// Raw catalog row as it appears in the CSV export.
#[derive(Debug, Deserialize)]
pub(crate) struct CatalogRow {
    pub case_id: u32,
    pub age: f64,
    #[serde(default)]
    pub sex: String,
    #[serde(default)]
    pub bmi: Option<f64>,
    #[serde(default)]
    pub optype: String,
    pub duration: f64,
    #[serde(default)]
    pub max_hr: Option<f64>,
    #[serde(default)]
    pub ave_hr: Option<f64>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub death_inhosp: u8,
    #[serde(default)]
    pub preop_htn: u8,
    #[serde(default)]
    pub preop_dm: u8,
    #[serde(default)]
    pub dx: String,
    #[serde(default)]
    pub opname: String,
}

/// Static attributes of one surgical case. Read-only after load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub case_id: u32,
    pub age: f64,
    pub sex: String,
    pub bmi: Option<f64>,
    pub category: String,
    /// Surgery duration in minutes.
    pub duration_min: f64,
    pub max_hr: Option<f64>,
    pub ave_hr: Option<f64>,
    pub position: Option<String>,
    pub mortality: bool,
    pub hypertension: bool,
    pub diabetes: bool,
    pub diagnosis: String,
    pub surgery_name: String,
}

impl PatientRecord {
    pub(crate) fn from_row(row: CatalogRow) -> Result<Self, CatalogError> {
        if !row.age.is_finite() || row.age < 0.0 {
            return Err(CatalogError::InvalidAge {
                case_id: row.case_id,
                age: row.age,
            });
        }
        if !row.duration.is_finite() || row.duration < 0.0 {
            return Err(CatalogError::InvalidDuration {
                case_id: row.case_id,
                duration: row.duration,
            });
        }
        Ok(Self {
            case_id: row.case_id,
            age: row.age,
            sex: row.sex,
            bmi: row.bmi,
            category: row.optype,
            duration_min: row.duration,
            max_hr: row.max_hr,
            ave_hr: row.ave_hr,
            position: row.position,
            mortality: row.death_inhosp == 1,
            hypertension: row.preop_htn == 1,
            diabetes: row.preop_dm == 1,
            diagnosis: row.dx,
            surgery_name: row.opname,
        })
    }
}

/// All patient records for the session, read once at load time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    pub records: Vec<PatientRecord>,
}

/// Per-category rollup used for the overview bubbles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub category: String,
    pub description: Option<String>,
    pub count: usize,
    pub mean_heart_rate: Option<f64>,
}

/// Catch-all category key excluded from overview rollups by default.
pub const OTHERS_CATEGORY: &str = "Others";

impl Catalog {
    pub fn new(records: Vec<PatientRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Lookup by case id. Absence is the caller's problem, not an error.
    pub fn find_case(&self, case_id: u32) -> Option<&PatientRecord> {
        self.records.iter().find(|r| r.case_id == case_id)
    }

    pub fn cases_in_category<'a>(
        &'a self,
        category: &'a str,
    ) -> impl Iterator<Item = &'a PatientRecord> {
        self.records.iter().filter(move |r| r.category == category)
    }

    /// Group records by surgery category and roll up count plus mean
    /// recorded heart rate, largest categories first. Descriptions come from
    /// the category map when one is supplied.
    pub fn category_summaries(
        &self,
        descriptions: Option<&BTreeMap<String, String>>,
        include_others: bool,
    ) -> Vec<CategorySummary> {
        let mut grouped: BTreeMap<&str, (usize, f64, usize)> = BTreeMap::new();
        for record in &self.records {
            if !include_others && record.category == OTHERS_CATEGORY {
                continue;
            }
            let entry = grouped.entry(record.category.as_str()).or_default();
            entry.0 += 1;
            if let Some(rate) = record.ave_hr.filter(|r| r.is_finite()) {
                entry.1 += rate;
                entry.2 += 1;
            }
        }
        let mut summaries: Vec<CategorySummary> = grouped
            .into_iter()
            .map(|(category, (count, rate_sum, rate_count))| CategorySummary {
                category: category.to_string(),
                description: descriptions
                    .and_then(|map| map.get(category))
                    .cloned(),
                count,
                mean_heart_rate: if rate_count > 0 {
                    Some(rate_sum / rate_count as f64)
                } else {
                    None
                },
            })
            .collect();
        summaries.sort_by(|a, b| b.count.cmp(&a.count).then(a.category.cmp(&b.category)));
        summaries
    }
}
