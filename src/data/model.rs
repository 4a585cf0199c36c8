use std::collections::{HashMap, HashSet};
use std::fmt;

// ---------------------------------------------------------------------------
// Material – the pollutant vocabulary
// ---------------------------------------------------------------------------

/// A pollutant / measurement type as it appears in the `Material` column.
///
/// The vocabulary is small and fixed; anything unrecognised is kept verbatim
/// in [`Material::Other`] so it can still be filtered and displayed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Material {
    Pm25,
    Co,
    Ozone,
    No2,
    So2,
    Aqi,
    Other(String),
}

impl Material {
    /// Classify a raw `Material` cell. Matching is exact and case-sensitive.
    pub fn from_name(name: &str) -> Self {
        match name {
            "PM2.5" => Material::Pm25,
            "CO" => Material::Co,
            "Ozone" => Material::Ozone,
            "NO2" => Material::No2,
            "SO2" => Material::So2,
            "AQI" => Material::Aqi,
            other => Material::Other(other.to_string()),
        }
    }

    /// Measurement unit used on axis labels.
    pub fn unit(&self) -> Unit {
        match self {
            Material::Pm25 => Unit::MicrogramsPerCubicMeter,
            Material::Co | Material::Ozone => Unit::PartsPerMillion,
            Material::No2 | Material::So2 | Material::Aqi | Material::Other(_) => {
                Unit::PartsPerBillion
            }
        }
    }
}

/// Unit lookup straight from the raw material name.
pub fn unit_for(material: &str) -> Unit {
    Material::from_name(material).unit()
}

// ---------------------------------------------------------------------------
// Unit
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unit {
    MicrogramsPerCubicMeter,
    PartsPerMillion,
    PartsPerBillion,
}

impl Unit {
    pub fn symbol(self) -> &'static str {
        match self {
            Unit::MicrogramsPerCubicMeter => "µg/m³",
            Unit::PartsPerMillion => "ppm",
            Unit::PartsPerBillion => "ppb",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

// ---------------------------------------------------------------------------
// Cadence – what one value represents (from the value column's name)
// ---------------------------------------------------------------------------

/// Sampling cadence implied by the value column the table was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cadence {
    /// `Monthly Measurements`
    Monthly,
    /// `Daily Measurements`
    Daily,
    /// `Measurement`
    #[default]
    Unspecified,
}

impl Cadence {
    /// Prefix used on axis labels, including the trailing space.
    pub fn label_prefix(self) -> &'static str {
        match self {
            Cadence::Monthly => "Monthly ",
            Cadence::Daily => "Daily ",
            Cadence::Unspecified => "",
        }
    }
}

// ---------------------------------------------------------------------------
// MeasurementRecord – one row of the source table
// ---------------------------------------------------------------------------

/// A single measurement row.
///
/// `period` is kept exactly as it appeared in the file; it is parsed per
/// pipeline run so malformed tokens can be dropped and counted.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementRecord {
    pub state: String,
    pub county: String,
    pub material: String,
    pub period: String,
    pub value: f64,
    pub yearly_average: Option<f64>,
}

// ---------------------------------------------------------------------------
// Option index – distinct values in first-seen order
// ---------------------------------------------------------------------------

/// Distinct strings, listed in the order they were first inserted.
#[derive(Debug, Clone, Default)]
struct FirstSeen {
    order: Vec<String>,
    seen: HashSet<String>,
}

impl FirstSeen {
    fn insert(&mut self, value: &str) {
        if self.seen.insert(value.to_string()) {
            self.order.push(value.to_string());
        }
    }

    fn as_strs(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }
}

/// state → county → material, each level in file order.
#[derive(Debug, Clone, Default)]
struct OptionIndex {
    states: FirstSeen,
    counties: HashMap<String, FirstSeen>,
    materials: HashMap<String, HashMap<String, FirstSeen>>,
}

impl OptionIndex {
    fn insert(&mut self, rec: &MeasurementRecord) {
        self.states.insert(&rec.state);
        self.counties
            .entry(rec.state.clone())
            .or_default()
            .insert(&rec.county);
        self.materials
            .entry(rec.state.clone())
            .or_default()
            .entry(rec.county.clone())
            .or_default()
            .insert(&rec.material);
    }
}

// ---------------------------------------------------------------------------
// MeasurementTable – the complete loaded dataset
// ---------------------------------------------------------------------------

/// The loaded table with pre-computed option indices for cascading filters.
///
/// Built once per load and never mutated afterwards.
#[derive(Debug, Clone, Default)]
pub struct MeasurementTable {
    /// All records, in file order. Duplicates are valid.
    pub records: Vec<MeasurementRecord>,
    /// Cadence of the value column.
    pub cadence: Cadence,
    /// Whether the source carried a precomputed yearly-average column.
    pub has_yearly_average: bool,
    /// Rows discarded at load time because their value was not numeric.
    pub skipped_rows: usize,
    /// Distinct option values per cascade level.
    index: OptionIndex,
}

impl MeasurementTable {
    /// Build the option index from the loaded records.
    pub fn from_records(records: Vec<MeasurementRecord>, cadence: Cadence) -> Self {
        let mut index = OptionIndex::default();
        let mut has_yearly_average = false;

        for rec in &records {
            index.insert(rec);
            has_yearly_average |= rec.yearly_average.is_some();
        }

        MeasurementTable {
            records,
            cadence,
            has_yearly_average,
            skipped_rows: 0,
            index,
        }
    }

    /// Distinct states, in the order they first appear in the file.
    pub fn states(&self) -> Vec<&str> {
        self.index.states.as_strs()
    }

    /// Distinct counties observed within `state`, in file order.
    pub fn counties(&self, state: &str) -> Vec<&str> {
        self.index
            .counties
            .get(state)
            .map(FirstSeen::as_strs)
            .unwrap_or_default()
    }

    /// Distinct materials observed within `state` + `county`, in file order.
    pub fn materials(&self, state: &str, county: &str) -> Vec<&str> {
        self.index
            .materials
            .get(state)
            .and_then(|counties| counties.get(county))
            .map(FirstSeen::as_strs)
            .unwrap_or_default()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
