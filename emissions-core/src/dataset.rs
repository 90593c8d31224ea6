use std::collections::HashSet;
use std::io::Read;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::{Observation, Year, GLOBAL};

pub const COL_ENTITY: &str = "Entity";
pub const COL_YEAR: &str = "Year";
pub const COL_EMISSIONS: &str = "Annual CO₂ emissions";
const COL_EMISSIONS_ASCII: &str = "Annual CO2 emissions";

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("missing column: {0}")]
    MissingColumn(&'static str),
    #[error("invalid row at line {line}: {reason}")]
    InvalidRow { line: u64, reason: String },
    #[error("dataset has no usable rows")]
    Empty,
}

/// What to do with a row whose fields do not parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowPolicy {
    /// Fail the whole load on the first bad row.
    Strict,
    /// Drop bad rows, count them and keep going.
    #[default]
    SkipInvalid,
}

/// Summary of a load, kept alongside the data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadReport {
    pub rows: usize,
    pub skipped: usize,
    pub warnings: Vec<String>,
}

/// Immutable, ordered table of observations.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    observations: Vec<Observation>,
    report: LoadReport,
}

struct Columns {
    entity: usize,
    year: usize,
    emissions: usize,
}

impl Columns {
    fn locate(headers: &csv::StringRecord) -> Result<Self, DatasetError> {
        let find = |names: &[&str]| {
            headers.iter().position(|h| {
                let h = h.trim_start_matches('\u{feff}').trim();
                names.iter().any(|n| *n == h)
            })
        };
        Ok(Self {
            entity: find(&[COL_ENTITY]).ok_or(DatasetError::MissingColumn(COL_ENTITY))?,
            year: find(&[COL_YEAR]).ok_or(DatasetError::MissingColumn(COL_YEAR))?,
            emissions: find(&[COL_EMISSIONS, COL_EMISSIONS_ASCII])
                .ok_or(DatasetError::MissingColumn(COL_EMISSIONS))?,
        })
    }
}

fn parse_row(record: &csv::StringRecord, cols: &Columns) -> Result<Observation, String> {
    let entity = record.get(cols.entity).unwrap_or("").trim();
    if entity.is_empty() {
        return Err("empty entity".to_string());
    }
    if entity == GLOBAL {
        return Err(format!("entity name {GLOBAL:?} is reserved"));
    }
    let year_raw = record.get(cols.year).unwrap_or("").trim();
    let year: Year = year_raw
        .parse()
        .map_err(|_| format!("year {year_raw:?} is not an integer"))?;
    let emissions_raw = record.get(cols.emissions).unwrap_or("").trim();
    let emissions: f64 = emissions_raw
        .parse()
        .map_err(|_| format!("emissions {emissions_raw:?} is not a number"))?;
    if !emissions.is_finite() || emissions < 0.0 {
        return Err(format!("emissions {emissions} out of range"));
    }
    Ok(Observation::new(entity, year, emissions))
}

impl Dataset {
    /// Wrap already-validated observations.
    pub fn new(observations: Vec<Observation>) -> Self {
        let report = LoadReport {
            rows: observations.len(),
            ..LoadReport::default()
        };
        Self {
            observations,
            report,
        }
    }

    pub fn from_csv_str(input: &str, policy: RowPolicy) -> Result<Self, DatasetError> {
        Self::from_reader(input.as_bytes(), policy)
    }

    /// Read `Entity`, `Year` and `Annual CO₂ emissions`; other columns are ignored.
    pub fn from_reader<R: Read>(reader: R, policy: RowPolicy) -> Result<Self, DatasetError> {
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let cols = Columns::locate(rdr.headers()?)?;

        let mut observations = Vec::new();
        let mut report = LoadReport::default();
        for result in rdr.records() {
            let parsed = match result {
                Ok(record) => {
                    let line = record.position().map(|p| p.line()).unwrap_or_default();
                    (line, parse_row(&record, &cols))
                }
                // undecodable text is a bad row, not a broken file
                Err(err) if matches!(err.kind(), csv::ErrorKind::Utf8 { .. }) => {
                    let line = err.position().map(|p| p.line()).unwrap_or_default();
                    (line, Err("row is not valid UTF-8".to_string()))
                }
                Err(err) => return Err(err.into()),
            };
            let (line, row) = parsed;
            match row {
                Ok(obs) => observations.push(obs),
                Err(reason) => match policy {
                    RowPolicy::Strict => return Err(DatasetError::InvalidRow { line, reason }),
                    RowPolicy::SkipInvalid => {
                        warn!(line, %reason, "skipping dataset row");
                        report.skipped += 1;
                        report.warnings.push(format!("line {line}: {reason}"));
                    }
                },
            }
        }
        if observations.is_empty() {
            return Err(DatasetError::Empty);
        }
        report.rows = observations.len();
        info!(rows = report.rows, skipped = report.skipped, "dataset loaded");
        Ok(Self {
            observations,
            report,
        })
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn report(&self) -> &LoadReport {
        &self.report
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Selector contents: `"Global"` then each entity in first-appearance order.
    pub fn entity_options(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut options = vec![GLOBAL.to_string()];
        for obs in &self.observations {
            if seen.insert(obs.entity.as_str()) {
                options.push(obs.entity.clone());
            }
        }
        options
    }

    pub fn has_entity(&self, name: &str) -> bool {
        self.observations.iter().any(|o| o.entity == name)
    }

    /// First observation for `entity` in `year`.
    pub fn find(&self, entity: &str, year: Year) -> Option<&Observation> {
        self.observations
            .iter()
            .find(|o| o.entity == entity && o.year == year)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const OWID_SAMPLE: &str = "\
Entity,Code,Year,Annual CO₂ emissions
United Kingdom,GBR,1850,112000000
United Kingdom,GBR,1851,115000000
\"Bonaire, Sint Eustatius and Saba\",BES,1950,12000
France,FRA,1850,26000000
";

    #[test]
    fn loads_owid_layout_with_quoted_names() {
        let ds = Dataset::from_csv_str(OWID_SAMPLE, RowPolicy::Strict).unwrap();
        assert_eq!(ds.len(), 4);
        assert_eq!(ds.report().skipped, 0);
        let bes = ds.find("Bonaire, Sint Eustatius and Saba", 1950).unwrap();
        assert_relative_eq!(bes.emissions, 12_000.0);
        assert_eq!(
            ds.entity_options(),
            vec![
                "Global",
                "United Kingdom",
                "Bonaire, Sint Eustatius and Saba",
                "France"
            ]
        );
    }

    #[test]
    fn missing_column_fails_the_load() {
        let err = Dataset::from_csv_str("Entity,Year\nA,1900\n", RowPolicy::SkipInvalid)
            .unwrap_err();
        assert!(matches!(err, DatasetError::MissingColumn(COL_EMISSIONS)));
    }

    #[test]
    fn strict_policy_rejects_malformed_row() {
        let csv = "Entity,Year,Annual CO₂ emissions\nA,1900,1.5\nA,nineteen,2.0\n";
        let err = Dataset::from_csv_str(csv, RowPolicy::Strict).unwrap_err();
        match err {
            DatasetError::InvalidRow { line, reason } => {
                assert_eq!(line, 3);
                assert!(reason.contains("nineteen"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn skip_policy_drops_and_counts_bad_rows() {
        let csv = "\
Entity,Year,Annual CO₂ emissions
A,1900,1.5
A,1901,
A,1902,-3
,1903,4
Global,1904,4
A,1905,abc
A,1906,2.5
";
        let ds = Dataset::from_csv_str(csv, RowPolicy::SkipInvalid).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.report().rows, 2);
        assert_eq!(ds.report().skipped, 5);
        assert_eq!(ds.report().warnings.len(), 5);
    }

    #[test]
    fn non_utf8_row_follows_row_policy() {
        let bytes: &[u8] =
            b"Entity,Year,Annual CO\xe2\x82\x82 emissions\nFrance,1850,26000000\n\xff\xfe,1851,1\nFrance,1852,27000000\n";
        let ds = Dataset::from_reader(bytes, RowPolicy::SkipInvalid).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.report().skipped, 1);
        assert!(ds.report().warnings[0].starts_with("line 3:"));

        match Dataset::from_reader(bytes, RowPolicy::Strict).unwrap_err() {
            DatasetError::InvalidRow { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn all_rows_invalid_is_an_empty_dataset() {
        let csv = "Entity,Year,Annual CO₂ emissions\nA,x,1\n";
        assert!(matches!(
            Dataset::from_csv_str(csv, RowPolicy::SkipInvalid),
            Err(DatasetError::Empty)
        ));
    }

    #[test]
    fn ascii_header_variant_is_accepted() {
        let csv = "Entity,Year,Annual CO2 emissions\nA,1900,1.5\n";
        let ds = Dataset::from_csv_str(csv, RowPolicy::Strict).unwrap();
        assert!(ds.has_entity("A"));
        assert!(!ds.has_entity("B"));
    }
}
