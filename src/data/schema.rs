use thiserror::Error;

use super::model::{Cadence, MeasurementRecord};

/// Accepted header names for the value column, with the cadence each implies.
const VALUE_COLUMNS: &[(&str, Cadence)] = &[
    ("Monthly Measurements", Cadence::Monthly),
    ("Measurement", Cadence::Unspecified),
    ("Daily Measurements", Cadence::Daily),
];

/// Accepted header names for a single-column period.
const PERIOD_COLUMNS: &[&str] = &["Month/Year", "Date"];

const YEARLY_AVERAGE_COLUMN: &str = "Yearly Measurement Average";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("missing {field} column (expected one of: {expected})")]
    MissingColumn {
        field: &'static str,
        expected: String,
    },
    #[error("row {row}: expected at least {expected} fields, found {found}")]
    ShortRow {
        row: usize,
        expected: usize,
        found: usize,
    },
}

/// Where the period comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodColumns {
    Single(usize),
    Split { year: usize, month: usize },
}

/// Column positions resolved from a header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub state: usize,
    pub county: usize,
    pub material: usize,
    pub period: PeriodColumns,
    pub value: usize,
    pub cadence: Cadence,
    pub yearly_average: Option<usize>,
}

impl Schema {
    /// Map header names onto the canonical fields. Matching is exact.
    pub fn resolve<S: AsRef<str>>(headers: &[S]) -> Result<Self, SchemaError> {
        let find = |name: &str| headers.iter().position(|h| h.as_ref() == name);
        let require = |field: &'static str, name: &str| {
            find(name).ok_or_else(|| SchemaError::MissingColumn {
                field,
                expected: format!("'{name}'"),
            })
        };

        let state = require("state", "State")?;
        let county = require("county", "County")?;
        let material = require("material", "Material")?;

        let period = match PERIOD_COLUMNS.iter().find_map(|name| find(*name)) {
            Some(idx) => PeriodColumns::Single(idx),
            None => match (find("Year"), find("Month")) {
                (Some(year), Some(month)) => PeriodColumns::Split { year, month },
                _ => {
                    return Err(SchemaError::MissingColumn {
                        field: "period",
                        expected: "'Month/Year', 'Date', or 'Year' + 'Month'".to_string(),
                    });
                }
            },
        };

        let (value, cadence) = VALUE_COLUMNS
            .iter()
            .find_map(|(name, cadence)| find(*name).map(|idx| (idx, *cadence)))
            .ok_or_else(|| SchemaError::MissingColumn {
                field: "value",
                expected: VALUE_COLUMNS
                    .iter()
                    .map(|(name, _)| format!("'{name}'"))
                    .collect::<Vec<_>>()
                    .join(", "),
            })?;

        Ok(Schema {
            state,
            county,
            material,
            period,
            value,
            cadence,
            yearly_average: find(YEARLY_AVERAGE_COLUMN),
        })
    }

    /// Highest column index the schema reads.
    fn max_index(&self) -> usize {
        let period = match self.period {
            PeriodColumns::Single(i) => i,
            PeriodColumns::Split { year, month } => year.max(month),
        };
        [self.state, self.county, self.material, self.value, period]
            .into_iter()
            .chain(self.yearly_average)
            .max()
            .unwrap_or_default()
    }

    /// Build a record from one row of text cells.
    ///
    /// Returns `Ok(None)` when the value cell is empty or not a finite number;
    /// such rows are skipped by the loader.
    pub fn record<S: AsRef<str>>(
        &self,
        row: usize,
        cells: &[S],
    ) -> Result<Option<MeasurementRecord>, SchemaError> {
        if cells.len() <= self.max_index() {
            return Err(SchemaError::ShortRow {
                row,
                expected: self.max_index() + 1,
                found: cells.len(),
            });
        }
        let cell = move |i: usize| cells[i].as_ref();

        let Some(value) = parse_number(cell(self.value)) else {
            return Ok(None);
        };
        let period = match self.period {
            PeriodColumns::Single(i) => cell(i).to_string(),
            PeriodColumns::Split { year, month } => {
                format!("{}/{}", period_part(cell(month)), period_part(cell(year)))
            }
        };

        Ok(Some(MeasurementRecord {
            state: cell(self.state).to_string(),
            county: cell(self.county).to_string(),
            material: cell(self.material).to_string(),
            period,
            value,
            yearly_average: self.yearly_average.and_then(|i| parse_number(cell(i))),
        }))
    }
}

fn parse_number(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// One half of a split period. Integral numbers lose any float formatting
/// (`2021.0` → `2021`); anything else, e.g. a month name, is kept as text.
fn period_part(s: &str) -> String {
    match parse_number(s) {
        Some(v) if v.fract() == 0.0 && v.abs() < 1e6 => format!("{}", v as i64),
        _ => s.trim().to_string(),
    }
}
