use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

mod dataset;

pub use dataset::{Dataset, DatasetError, LoadReport, RowPolicy};

/// Calendar year of an observation.
pub type Year = i32;

/// Selector label of the aggregate pseudo-entity.
pub const GLOBAL: &str = "Global";

/// Points at or below this value are dropped from every rendered series.
pub const MIN_EMISSIONS: f64 = 0.1;

/// One row of the source table: annual emissions (tonnes) of one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub entity: String,
    pub year: Year,
    pub emissions: f64,
}

impl Observation {
    pub fn new(entity: impl Into<String>, year: Year, emissions: f64) -> Self {
        Self {
            entity: entity.into(),
            year,
            emissions,
        }
    }
}

/// What the chart is showing: the world aggregate or a single entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Selection {
    #[default]
    Global,
    Entity(String),
}

impl Selection {
    /// Build a selection from a selector value; `"Global"` maps to the sentinel.
    pub fn from_name(name: impl Into<String>) -> Self {
        let name = name.into();
        if name == GLOBAL {
            Selection::Global
        } else {
            Selection::Entity(name)
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Selection::Global => GLOBAL,
            Selection::Entity(name) => name,
        }
    }

    pub fn is_global(&self) -> bool {
        matches!(self, Selection::Global)
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Selection {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Selection::from_name(s))
    }
}

impl From<&str> for Selection {
    fn from(s: &str) -> Self {
        Selection::from_name(s)
    }
}

/// A single (year, emissions) point of a derived series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub year: Year,
    pub emissions: f64,
}

/// Derive the chart series for `selection`.
///
/// `Global` sums every entity per year; an entity selection takes that entity's
/// rows. Either way the result is ordered by year and keeps only points above
/// [`MIN_EMISSIONS`]. Nothing is cached: callers re-derive on every change.
pub fn derive_series(dataset: &Dataset, selection: &Selection) -> Vec<SeriesPoint> {
    let mut series: Vec<SeriesPoint> = match selection {
        Selection::Global => {
            let mut by_year: BTreeMap<Year, f64> = BTreeMap::new();
            for obs in dataset.observations() {
                *by_year.entry(obs.year).or_insert(0.0) += obs.emissions;
            }
            by_year
                .into_iter()
                .map(|(year, emissions)| SeriesPoint { year, emissions })
                .collect()
        }
        Selection::Entity(name) => {
            let mut points: Vec<SeriesPoint> = dataset
                .observations()
                .iter()
                .filter(|obs| &obs.entity == name)
                .map(|obs| SeriesPoint {
                    year: obs.year,
                    emissions: obs.emissions,
                })
                .collect();
            // Stable sort, so the first row of a duplicated year wins (same as `Dataset::find`).
            points.sort_by_key(|p| p.year);
            points.dedup_by_key(|p| p.year);
            points
        }
    };
    series.retain(|p| p.emissions > MIN_EMISSIONS);
    series
}

/// Closed interval `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent<T> {
    pub min: T,
    pub max: T,
}

/// Axis domains for a series: years on x, `[0, max]` emissions on y.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Domains {
    pub years: Extent<Year>,
    pub emissions: Extent<f64>,
}

impl Domains {
    /// `None` for an empty series; there is nothing sensible to scale to.
    pub fn of(series: &[SeriesPoint]) -> Option<Self> {
        let first = series.first()?;
        let mut years = Extent {
            min: first.year,
            max: first.year,
        };
        let mut max_emissions = first.emissions;
        for p in &series[1..] {
            years.min = years.min.min(p.year);
            years.max = years.max.max(p.year);
            max_emissions = max_emissions.max(p.emissions);
        }
        Some(Self {
            years,
            emissions: Extent {
                min: 0.0,
                max: max_emissions,
            },
        })
    }
}

/// Tonnes to millions of tonnes, two decimals.
pub fn format_millions(tonnes: f64) -> String {
    format!("{:.2}", tonnes / 1e6)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn dataset(rows: &[(&str, Year, f64)]) -> Dataset {
        Dataset::new(
            rows.iter()
                .map(|(e, y, v)| Observation::new(*e, *y, *v))
                .collect(),
        )
    }

    #[test]
    fn global_sums_all_entities_per_year() {
        let x = 2_000_000.0;
        let y = 2_500_000.0;
        let z = 500_000.0;
        let ds = dataset(&[
            ("United Kingdom", 1850, x),
            ("United Kingdom", 1851, y),
            ("France", 1850, z),
        ]);
        let series = derive_series(&ds, &Selection::Global);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].year, 1850);
        assert_relative_eq!(series[0].emissions, x + z);
        assert_eq!(series[1].year, 1851);
        assert_relative_eq!(series[1].emissions, y);
    }

    #[test]
    fn entity_series_is_sorted_and_filtered() {
        let ds = dataset(&[
            ("China", 2001, 3.0e9),
            ("China", 1900, 0.1),
            ("India", 1999, 9.0e8),
            ("China", 1999, 2.9e9),
            ("China", 1950, 0.0),
            ("China", 2000, 3.1e9),
        ]);
        let series = derive_series(&ds, &Selection::from_name("China"));
        let years: Vec<Year> = series.iter().map(|p| p.year).collect();
        assert_eq!(years, vec![1999, 2000, 2001]);
        assert!(series.windows(2).all(|w| w[0].year < w[1].year));
        assert!(series.iter().all(|p| p.emissions > MIN_EMISSIONS));
    }

    #[test]
    fn global_filter_applies_after_aggregation() {
        let ds = dataset(&[("A", 1800, 0.06), ("B", 1800, 0.06), ("A", 1801, 0.05)]);
        let series = derive_series(&ds, &Selection::Global);
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].year, 1800);
        assert_relative_eq!(series[0].emissions, 0.12);
    }

    #[test]
    fn duplicated_entity_year_keeps_first_row() {
        let ds = dataset(&[("A", 1900, 5.0), ("A", 1900, 7.0)]);
        let series = derive_series(&ds, &Selection::from_name("A"));
        assert_eq!(series.len(), 1);
        assert_relative_eq!(series[0].emissions, 5.0);
    }

    #[test]
    fn unknown_entity_yields_empty_series_and_no_domains() {
        let ds = dataset(&[("A", 1900, 5.0)]);
        let series = derive_series(&ds, &Selection::from_name("Atlantis"));
        assert!(series.is_empty());
        assert!(Domains::of(&series).is_none());
    }

    #[test]
    fn domains_cover_years_and_start_at_zero() {
        let series = vec![
            SeriesPoint { year: 1850, emissions: 4.0 },
            SeriesPoint { year: 1900, emissions: 10.0 },
            SeriesPoint { year: 2021, emissions: 7.5 },
        ];
        let d = Domains::of(&series).unwrap();
        assert_eq!(d.years, Extent { min: 1850, max: 2021 });
        assert_relative_eq!(d.emissions.min, 0.0);
        assert_relative_eq!(d.emissions.max, 10.0);
    }

    #[test]
    fn selection_parses_global_sentinel() {
        assert_eq!(Selection::from_name("Global"), Selection::Global);
        assert_eq!(
            "France".parse::<Selection>().unwrap(),
            Selection::Entity("France".into())
        );
        assert_eq!(Selection::Global.to_string(), "Global");
    }

    #[test]
    fn millions_use_two_decimals() {
        assert_eq!(format_millions(2_345_678.0), "2.35");
        assert_eq!(format_millions(37_120_000_000.0), "37120.00");
    }
}
