use std::collections::BTreeMap;

use chrono::NaiveDate;

use super::error::PolicyError;
use super::parameters::{BandValue, ParameterNode, PolicyValues, paths};

/// Client parameters after the API layer has coerced them to numbers. The
/// same map feeds both the reform and situation builders, so each builder
/// consumes the levers it owns and leaves the rest alone.
pub type ParamMap = BTreeMap<String, f64>;

#[derive(Debug, Clone, PartialEq)]
pub struct Override {
    pub path: String,
    pub value: f64,
}

/// An ordered list of parameter overrides layered onto the baseline tree.
/// When several reforms are applied, later overrides win.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reform {
    overrides: Vec<Override>,
}

impl Reform {
    pub fn with(mut self, path: &str, value: f64) -> Self {
        self.overrides.push(Override {
            path: path.to_string(),
            value,
        });
        self
    }

    pub fn overrides(&self) -> &[Override] {
        &self.overrides
    }

    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }
}

fn rate_lever(params: &ParamMap, lever: &str) -> Result<Option<f64>, PolicyError> {
    match params.get(lever) {
        None => Ok(None),
        Some(v) if v.is_finite() && (0.0..=100.0).contains(v) => Ok(Some(v / 100.0)),
        Some(_) => Err(PolicyError::invalid_lever(
            lever,
            "must be a percentage between 0 and 100",
        )),
    }
}

fn amount_lever(params: &ParamMap, lever: &str) -> Result<Option<f64>, PolicyError> {
    match params.get(lever) {
        None => Ok(None),
        Some(v) if v.is_finite() && *v >= 0.0 => Ok(Some(*v)),
        Some(_) => Err(PolicyError::invalid_lever(lever, "must be >= 0")),
    }
}

/// Builds a reform from client policy levers. Rates come in as percentages
/// (0-100), amounts in pounds. Keys the reform builder does not own are
/// ignored; invalid values for owned keys are rejected.
pub fn create_reform(params: &ParamMap) -> Result<Reform, PolicyError> {
    let mut reform = Reform::default();

    let rate_levers: [(&str, String); 6] = [
        (
            "basic_rate",
            paths::bracket_member(paths::INCOME_TAX_SCALE, 0, "rate"),
        ),
        (
            "higher_rate",
            paths::bracket_member(paths::INCOME_TAX_SCALE, 1, "rate"),
        ),
        (
            "add_rate",
            paths::bracket_member(paths::INCOME_TAX_SCALE, 2, "rate"),
        ),
        (
            "NI_main_rate",
            paths::bracket_member(paths::NI_SCALE, 0, "rate"),
        ),
        (
            "NI_upper_rate",
            paths::bracket_member(paths::NI_SCALE, 1, "rate"),
        ),
        ("LVT", paths::LVT_RATE.to_string()),
    ];
    for (lever, path) in rate_levers {
        if let Some(value) = rate_lever(params, lever)? {
            reform = reform.with(&path, value);
        }
    }
    if let Some(value) = rate_lever(params, "UC_reduction_rate")? {
        reform = reform.with(paths::UC_REDUCTION_RATE, value);
    }

    let amount_levers: [(&str, String); 6] = [
        ("personal_allowance", paths::PERSONAL_ALLOWANCE.to_string()),
        (
            "higher_threshold",
            paths::bracket_member(paths::INCOME_TAX_SCALE, 1, "threshold"),
        ),
        ("child_benefit", paths::CHILD_BENEFIT_ELDEST.to_string()),
        ("child_UBI", paths::CHILD_UBI.to_string()),
        ("adult_UBI", paths::ADULT_UBI.to_string()),
        ("senior_UBI", paths::SENIOR_UBI.to_string()),
    ];
    for (lever, path) in amount_levers {
        if let Some(value) = amount_lever(params, lever)? {
            reform = reform.with(&path, value);
        }
    }

    Ok(reform)
}

/// Pins every parameter to its value at `today`, so simulations at a past tax
/// year still use current-law numbers. Applied before the user reform in
/// every configuration; the user's overrides come later and therefore win.
pub fn current_date_parameters(tree: &ParameterNode, today: NaiveDate) -> Reform {
    let mut reform = Reform::default();
    for (path, value) in tree.values_at(today) {
        reform = reform.with(&path, value);
    }
    reform
}

/// The fixed land-value-tax addition used in the household baseline.
pub fn add_lvt() -> Reform {
    Reform::default().with(paths::LVT_RATE, 0.005)
}

fn lookup(values: &BTreeMap<String, f64>, path: &str) -> Result<f64, PolicyError> {
    values
        .get(path)
        .copied()
        .ok_or_else(|| PolicyError::UnknownParameter(path.to_string()))
}

fn resolve_bands(
    tree: &ParameterNode,
    values: &BTreeMap<String, f64>,
    scale_path: &str,
) -> Result<Vec<BandValue>, PolicyError> {
    let scale = tree
        .find_scale(scale_path)
        .ok_or_else(|| PolicyError::UnknownParameter(scale_path.to_string()))?;
    let mut bands = Vec::with_capacity(scale.brackets().len());
    for index in 0..scale.brackets().len() {
        bands.push(BandValue {
            threshold: lookup(values, &paths::bracket_member(scale_path, index, "threshold"))?,
            rate: lookup(values, &paths::bracket_member(scale_path, index, "rate"))?,
        });
    }
    // Reforms may reorder thresholds; band arithmetic assumes ascending order.
    bands.sort_by(|a, b| a.threshold.total_cmp(&b.threshold));
    Ok(bands)
}

/// Resolves the parameter tree at `date` under an ordered reform stack into
/// the concrete numbers the calculator consumes.
pub fn resolve_policy(
    tree: &ParameterNode,
    date: NaiveDate,
    reforms: &[Reform],
) -> Result<PolicyValues, PolicyError> {
    let mut values: BTreeMap<String, f64> = tree.values_at(date).into_iter().collect();
    for reform in reforms {
        for o in reform.overrides() {
            let slot = values
                .get_mut(&o.path)
                .ok_or_else(|| PolicyError::UnknownParameter(o.path.clone()))?;
            *slot = o.value;
        }
    }

    Ok(PolicyValues {
        personal_allowance: lookup(&values, paths::PERSONAL_ALLOWANCE)?,
        allowance_taper_start: lookup(&values, paths::PA_TAPER_START)?,
        income_tax_bands: resolve_bands(tree, &values, paths::INCOME_TAX_SCALE)?,
        ni_bands: resolve_bands(tree, &values, paths::NI_SCALE)?,
        lvt_rate: lookup(&values, paths::LVT_RATE)?,
        child_benefit_eldest: lookup(&values, paths::CHILD_BENEFIT_ELDEST)?,
        child_benefit_additional: lookup(&values, paths::CHILD_BENEFIT_ADDITIONAL)?,
        uc_standard_allowance: lookup(&values, paths::UC_STANDARD_ALLOWANCE)?,
        uc_reduction_rate: lookup(&values, paths::UC_REDUCTION_RATE)?,
        uc_work_allowance: lookup(&values, paths::UC_WORK_ALLOWANCE)?,
        child_ubi: lookup(&values, paths::CHILD_UBI)?,
        adult_ubi: lookup(&values, paths::ADULT_UBI)?,
        senior_ubi: lookup(&values, paths::SENIOR_UBI)?,
        poverty_line: lookup(&values, paths::POVERTY_LINE)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parameters::uk_parameter_tree;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn params(entries: &[(&str, f64)]) -> ParamMap {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect()
    }

    #[test]
    fn empty_params_build_an_empty_reform() {
        let reform = create_reform(&ParamMap::new()).unwrap();
        assert!(reform.is_empty());
    }

    #[test]
    fn rate_levers_convert_percent_to_fraction() {
        let reform = create_reform(&params(&[("basic_rate", 25.0)])).unwrap();
        assert_eq!(reform.overrides().len(), 1);
        assert_eq!(
            reform.overrides()[0].path,
            paths::bracket_member(paths::INCOME_TAX_SCALE, 0, "rate")
        );
        assert_eq!(reform.overrides()[0].value, 0.25);
    }

    #[test]
    fn out_of_range_rate_is_rejected() {
        let err = create_reform(&params(&[("basic_rate", 120.0)])).unwrap_err();
        assert!(err.is_bad_request());
        let err = create_reform(&params(&[("LVT", -1.0)])).unwrap_err();
        assert!(err.is_bad_request());
    }

    #[test]
    fn negative_amount_is_rejected() {
        let err = create_reform(&params(&[("adult_UBI", -10.0)])).unwrap_err();
        assert!(err.is_bad_request());
    }

    #[test]
    fn situation_levers_are_ignored_by_the_reform_builder() {
        let reform = create_reform(&params(&[("children", 2.0), ("age_1", 40.0)])).unwrap();
        assert!(reform.is_empty());
    }

    #[test]
    fn later_reform_in_the_stack_wins() {
        let tree = uk_parameter_tree().unwrap();
        let today = d(2026, 8, 23);
        let snapshot = current_date_parameters(&tree, today);
        let user = create_reform(&params(&[("basic_rate", 30.0)])).unwrap();

        let policy = resolve_policy(&tree, today, &[snapshot, user]).unwrap();
        assert_eq!(policy.income_tax_bands[0].rate, 0.30);
    }

    #[test]
    fn current_date_parameters_pin_values_for_past_year_simulations() {
        let tree = uk_parameter_tree().unwrap();
        let today = d(2026, 8, 23);
        let snapshot = current_date_parameters(&tree, today);

        // Resolved at a 2020 date, the snapshot still yields today's numbers.
        let pinned = resolve_policy(&tree, d(2020, 4, 6), &[snapshot]).unwrap();
        assert_eq!(pinned.personal_allowance, 12_570.0);
        assert_eq!(pinned.ni_bands[0].rate, 0.08);

        let unpinned = resolve_policy(&tree, d(2020, 4, 6), &[]).unwrap();
        assert_eq!(unpinned.personal_allowance, 12_500.0);
        assert_eq!(unpinned.ni_bands[0].rate, 0.12);
    }

    #[test]
    fn add_lvt_sets_the_fixed_baseline_rate() {
        let tree = uk_parameter_tree().unwrap();
        let policy = resolve_policy(&tree, d(2026, 8, 23), &[add_lvt()]).unwrap();
        assert_eq!(policy.lvt_rate, 0.005);
    }

    #[test]
    fn override_on_unknown_path_is_an_engine_error() {
        let tree = uk_parameter_tree().unwrap();
        let bogus = Reform::default().with("tax.no_such.parameter", 1.0);
        let err = resolve_policy(&tree, d(2026, 8, 23), &[bogus]).unwrap_err();
        assert!(matches!(err, PolicyError::UnknownParameter(_)));
        assert!(!err.is_bad_request());
    }

    #[test]
    fn bands_are_sorted_after_overrides() {
        let tree = uk_parameter_tree().unwrap();
        let user = create_reform(&params(&[("higher_threshold", 0.0)])).unwrap();
        let policy = resolve_policy(&tree, d(2026, 8, 23), &[user]).unwrap();
        for pair in policy.income_tax_bands.windows(2) {
            assert!(pair[0].threshold <= pair[1].threshold);
        }
    }
}
