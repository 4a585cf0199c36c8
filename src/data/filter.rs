use super::model::{MeasurementRecord, MeasurementTable};

// ---------------------------------------------------------------------------
// Filter selection: the cascading (state, county, material) choice
// ---------------------------------------------------------------------------

/// The user's current selection. A `None` field applies no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSelection {
    pub state: Option<String>,
    pub county: Option<String>,
    pub material: Option<String>,
}

impl FilterSelection {
    /// A fully specified selection.
    pub fn new(state: &str, county: &str, material: &str) -> Self {
        Self {
            state: Some(state.to_string()),
            county: Some(county.to_string()),
            material: Some(material.to_string()),
        }
    }

    /// Whether a record passes every set field (exact, case-sensitive).
    pub fn matches(&self, rec: &MeasurementRecord) -> bool {
        fn field_ok(wanted: &Option<String>, actual: &str) -> bool {
            wanted.as_deref().map_or(true, |w| w == actual)
        }
        field_ok(&self.state, &rec.state)
            && field_ok(&self.county, &rec.county)
            && field_ok(&self.material, &rec.material)
    }
}

/// Return the records that pass `selection`, in table order.
pub fn narrow<'a>(
    table: &'a MeasurementTable,
    selection: &FilterSelection,
) -> Vec<&'a MeasurementRecord> {
    table
        .records
        .iter()
        .filter(|rec| selection.matches(rec))
        .collect()
}

// ---------------------------------------------------------------------------
// Cascading option lists
// ---------------------------------------------------------------------------

/// Options for each dropdown given what is already chosen upstream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOptions {
    pub states: Vec<String>,
    pub counties: Vec<String>,
    pub materials: Vec<String>,
}

/// Compute the option lists for `selection`.
///
/// Counties are empty until a state is chosen, materials until a county is.
pub fn options_for(table: &MeasurementTable, selection: &FilterSelection) -> FilterOptions {
    let to_owned = |v: Vec<&str>| v.into_iter().map(str::to_string).collect::<Vec<_>>();

    let counties = selection
        .state
        .as_deref()
        .map(|s| to_owned(table.counties(s)))
        .unwrap_or_default();
    let materials = match (selection.state.as_deref(), selection.county.as_deref()) {
        (Some(s), Some(c)) => to_owned(table.materials(s, c)),
        _ => Vec::new(),
    };

    FilterOptions {
        states: to_owned(table.states()),
        counties,
        materials,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::tests::sample_table;

    #[test]
    fn narrow_returns_exact_matches() {
        let table = sample_table();
        let rows = narrow(&table, &FilterSelection::new("ND", "Cass", "PM2.5"));
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.state == "ND" && r.county == "Cass" && r.material == "PM2.5"));
        assert_eq!(rows[0].period, "2021-01");
        assert_eq!(rows[1].period, "2021-02");
    }

    #[test]
    fn unset_fields_do_not_filter() {
        let table = sample_table();
        assert_eq!(narrow(&table, &FilterSelection::default()).len(), table.len());

        let only_state = FilterSelection {
            state: Some("ND".into()),
            ..Default::default()
        };
        assert_eq!(narrow(&table, &only_state).len(), 4);

        let only_material = FilterSelection {
            material: Some("PM2.5".into()),
            ..Default::default()
        };
        assert_eq!(narrow(&table, &only_material).len(), 3);
    }

    #[test]
    fn matching_is_case_sensitive() {
        let table = sample_table();
        assert!(narrow(&table, &FilterSelection::new("nd", "Cass", "PM2.5")).is_empty());
        assert!(narrow(&table, &FilterSelection::new("ND", "Cass", "pm2.5")).is_empty());
    }

    #[test]
    fn cascading_options_equal_observed_distinct_values() {
        let table = sample_table();
        let mut sel = FilterSelection {
            state: Some("ND".into()),
            ..Default::default()
        };
        let opts = options_for(&table, &sel);
        assert_eq!(opts.counties, vec!["Cass", "Burleigh"]);
        assert!(opts.materials.is_empty());

        sel.county = Some("Cass".into());
        let opts = options_for(&table, &sel);
        assert_eq!(opts.materials, vec!["PM2.5", "CO"]);
        for material in &opts.materials {
            assert!(table
                .records
                .iter()
                .any(|r| r.state == "ND" && r.county == "Cass" && &r.material == material));
        }
    }

    #[test]
    fn no_state_means_no_downstream_options() {
        let opts = options_for(&sample_table(), &FilterSelection::default());
        assert_eq!(opts.states, vec!["ND", "MN"]);
        assert!(opts.counties.is_empty());
        assert!(opts.materials.is_empty());
    }
}
