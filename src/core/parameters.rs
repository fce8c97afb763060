use chrono::NaiveDate;
use serde::Serialize;

use super::error::PolicyError;

/// Unit attached to an externally visible parameter, reported to clients as
/// the record's `type` field.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKind {
    Rate,
    YearlyAmount,
    WeeklyAmount,
}

/// Client-facing description of a policy lever. Presence of this struct is
/// the visibility flag: parameters without metadata never appear in the
/// `parameters` endpoint output, and a visible parameter always carries every
/// required field.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ParameterMeta {
    pub title: &'static str,
    pub description: &'static str,
    pub summary: &'static str,
    pub kind: ParameterKind,
}

/// A scalar policy value with a date-ordered history. `value_at` returns the
/// latest entry at or before the requested date, or the earliest entry when
/// the date predates the whole history.
#[derive(Debug, Clone)]
pub struct Parameter {
    name: String,
    values: Vec<(NaiveDate, f64)>,
    meta: Option<ParameterMeta>,
}

impl Parameter {
    pub fn new(
        name: &str,
        values: Vec<(NaiveDate, f64)>,
        meta: Option<ParameterMeta>,
    ) -> Result<Self, PolicyError> {
        if values.is_empty() {
            return Err(PolicyError::InvalidParameter {
                name: name.to_string(),
                reason: "empty value history".to_string(),
            });
        }
        if values.windows(2).any(|pair| pair[0].0 >= pair[1].0) {
            return Err(PolicyError::InvalidParameter {
                name: name.to_string(),
                reason: "value history is not strictly date-ordered".to_string(),
            });
        }
        if values.iter().any(|(_, v)| !v.is_finite()) {
            return Err(PolicyError::InvalidParameter {
                name: name.to_string(),
                reason: "non-finite value".to_string(),
            });
        }
        Ok(Self {
            name: name.to_string(),
            values,
            meta,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn meta(&self) -> Option<&ParameterMeta> {
        self.meta.as_ref()
    }

    pub fn value_at(&self, date: NaiveDate) -> f64 {
        let mut current = self.values[0].1;
        for (start, value) in &self.values {
            if *start <= date {
                current = *value;
            } else {
                break;
            }
        }
        current
    }
}

/// One step of a progressive scale. Members are optional; a bracket exposes
/// at most three constituent parameters (rate, amount, threshold).
#[derive(Debug, Clone, Default)]
pub struct Bracket {
    pub rate: Option<Parameter>,
    pub amount: Option<Parameter>,
    pub threshold: Option<Parameter>,
}

impl Bracket {
    /// Present members in the fixed (rate, amount, threshold) order.
    pub fn members(&self) -> impl Iterator<Item = &Parameter> {
        [
            self.rate.as_ref(),
            self.amount.as_ref(),
            self.threshold.as_ref(),
        ]
        .into_iter()
        .flatten()
    }
}

#[derive(Debug, Clone)]
pub struct ParameterScale {
    name: String,
    brackets: Vec<Bracket>,
}

impl ParameterScale {
    pub fn new(name: &str, brackets: Vec<Bracket>) -> Result<Self, PolicyError> {
        if brackets.is_empty() {
            return Err(PolicyError::InvalidParameter {
                name: name.to_string(),
                reason: "scale has no brackets".to_string(),
            });
        }
        Ok(Self {
            name: name.to_string(),
            brackets,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn brackets(&self) -> &[Bracket] {
        &self.brackets
    }
}

#[derive(Debug, Clone)]
pub enum ParameterChild {
    Node(ParameterNode),
    Value(Parameter),
    Scale(ParameterScale),
}

/// Leaf of the tree as seen by `descendants`.
#[derive(Copy, Clone)]
pub enum Leaf<'a> {
    Value(&'a Parameter),
    Scale(&'a ParameterScale),
}

/// Tree of policy parameters. Interior nodes group related levers; leaves are
/// scalar parameters or bracket scales.
#[derive(Debug, Clone)]
pub struct ParameterNode {
    name: String,
    children: Vec<ParameterChild>,
}

impl ParameterNode {
    pub fn new(name: &str, children: Vec<ParameterChild>) -> Self {
        Self {
            name: name.to_string(),
            children,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// All leaves in depth-first order.
    pub fn descendants(&self) -> Vec<Leaf<'_>> {
        let mut leaves = Vec::new();
        self.collect_leaves(&mut leaves);
        leaves
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<Leaf<'a>>) {
        for child in &self.children {
            match child {
                ParameterChild::Node(node) => node.collect_leaves(out),
                ParameterChild::Value(param) => out.push(Leaf::Value(param)),
                ParameterChild::Scale(scale) => out.push(Leaf::Scale(scale)),
            }
        }
    }

    /// Every addressable scalar value (scalar leaves plus bracket members)
    /// evaluated at `date`, keyed by full parameter path.
    pub fn values_at(&self, date: NaiveDate) -> Vec<(String, f64)> {
        let mut out = Vec::new();
        for leaf in self.descendants() {
            match leaf {
                Leaf::Value(param) => {
                    out.push((param.name().to_string(), param.value_at(date)));
                }
                Leaf::Scale(scale) => {
                    for bracket in scale.brackets() {
                        for member in bracket.members() {
                            out.push((member.name().to_string(), member.value_at(date)));
                        }
                    }
                }
            }
        }
        out
    }

    pub fn find_scale(&self, path: &str) -> Option<&ParameterScale> {
        for leaf in self.descendants() {
            if let Leaf::Scale(scale) = leaf {
                if scale.name() == path {
                    return Some(scale);
                }
            }
        }
        None
    }
}

/// Canonical parameter paths used by the reform builder and the resolver.
pub mod paths {
    pub const PERSONAL_ALLOWANCE: &str = "tax.income_tax.personal_allowance";
    pub const PA_TAPER_START: &str = "tax.income_tax.allowance_taper_start";
    pub const INCOME_TAX_SCALE: &str = "tax.income_tax.scale";
    pub const NI_SCALE: &str = "tax.national_insurance.scale";
    pub const LVT_RATE: &str = "tax.land_value_tax.rate";
    pub const CHILD_BENEFIT_ELDEST: &str = "benefits.child_benefit.eldest";
    pub const CHILD_BENEFIT_ADDITIONAL: &str = "benefits.child_benefit.additional";
    pub const UC_STANDARD_ALLOWANCE: &str = "benefits.universal_credit.standard_allowance";
    pub const UC_REDUCTION_RATE: &str = "benefits.universal_credit.reduction_rate";
    pub const UC_WORK_ALLOWANCE: &str = "benefits.universal_credit.work_allowance";
    pub const CHILD_UBI: &str = "benefits.basic_income.child";
    pub const ADULT_UBI: &str = "benefits.basic_income.adult";
    pub const SENIOR_UBI: &str = "benefits.basic_income.senior";
    pub const POVERTY_LINE: &str = "poverty.absolute_poverty_line";

    pub fn bracket_member(scale: &str, index: usize, member: &str) -> String {
        format!("{scale}.bracket_{}.{member}", index + 1)
    }
}

/// One resolved band of a progressive scale: the marginal `rate` applies to
/// income above `threshold`, up to the next band's threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandValue {
    pub threshold: f64,
    pub rate: f64,
}

/// Concrete policy numbers consumed by the calculator, produced by resolving
/// the parameter tree at a date under an ordered reform stack.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyValues {
    pub personal_allowance: f64,
    pub allowance_taper_start: f64,
    pub income_tax_bands: Vec<BandValue>,
    pub ni_bands: Vec<BandValue>,
    pub lvt_rate: f64,
    pub child_benefit_eldest: f64,
    pub child_benefit_additional: f64,
    pub uc_standard_allowance: f64,
    pub uc_reduction_rate: f64,
    pub uc_work_allowance: f64,
    pub child_ubi: f64,
    pub adult_ubi: f64,
    pub senior_ubi: f64,
    pub poverty_line: f64,
}

fn date(year: i32, month: u32, day: u32) -> Result<NaiveDate, PolicyError> {
    NaiveDate::from_ymd_opt(year, month, day).ok_or(PolicyError::InvalidParameter {
        name: "baseline".to_string(),
        reason: format!("invalid date {year}-{month}-{day}"),
    })
}

fn scalar(
    name: &str,
    values: &[(i32, u32, u32, f64)],
    meta: Option<ParameterMeta>,
) -> Result<Parameter, PolicyError> {
    let mut history = Vec::with_capacity(values.len());
    for (y, m, d, v) in values {
        history.push((date(*y, *m, *d)?, *v));
    }
    Parameter::new(name, history, meta)
}

fn band_bracket(
    scale: &str,
    index: usize,
    threshold: &[(i32, u32, u32, f64)],
    rate: &[(i32, u32, u32, f64)],
    threshold_meta: Option<ParameterMeta>,
    rate_meta: Option<ParameterMeta>,
) -> Result<Bracket, PolicyError> {
    Ok(Bracket {
        rate: Some(scalar(
            &paths::bracket_member(scale, index, "rate"),
            rate,
            rate_meta,
        )?),
        amount: None,
        threshold: Some(scalar(
            &paths::bracket_member(scale, index, "threshold"),
            threshold,
            threshold_meta,
        )?),
    })
}

fn meta(
    title: &'static str,
    description: &'static str,
    summary: &'static str,
    kind: ParameterKind,
) -> Option<ParameterMeta> {
    Some(ParameterMeta {
        title,
        description,
        summary,
        kind,
    })
}

/// The baseline parameter tree: current-law values with dated uprating
/// history. Levers a client may adjust carry metadata; internal plumbing
/// (taper start, poverty line, UC work allowance) does not.
pub fn uk_parameter_tree() -> Result<ParameterNode, PolicyError> {
    let income_tax = ParameterNode::new(
        "tax.income_tax",
        vec![
            ParameterChild::Value(scalar(
                paths::PERSONAL_ALLOWANCE,
                &[(2019, 4, 6, 12_500.0), (2021, 4, 6, 12_570.0)],
                meta(
                    "Personal allowance",
                    "Yearly income each person may earn before paying income tax.",
                    "Income tax personal allowance",
                    ParameterKind::YearlyAmount,
                ),
            )?),
            ParameterChild::Value(scalar(
                paths::PA_TAPER_START,
                &[(2019, 4, 6, 100_000.0)],
                None,
            )?),
            ParameterChild::Scale(ParameterScale::new(
                paths::INCOME_TAX_SCALE,
                vec![
                    band_bracket(
                        paths::INCOME_TAX_SCALE,
                        0,
                        &[(2019, 4, 6, 0.0)],
                        &[(2019, 4, 6, 0.20)],
                        None,
                        meta(
                            "Basic rate",
                            "Marginal income tax rate on the basic band.",
                            "Income tax basic rate",
                            ParameterKind::Rate,
                        ),
                    )?,
                    band_bracket(
                        paths::INCOME_TAX_SCALE,
                        1,
                        &[(2019, 4, 6, 37_500.0), (2021, 4, 6, 37_700.0)],
                        &[(2019, 4, 6, 0.40)],
                        meta(
                            "Higher rate threshold",
                            "Taxable income above which the higher rate applies.",
                            "Income tax higher rate threshold",
                            ParameterKind::YearlyAmount,
                        ),
                        meta(
                            "Higher rate",
                            "Marginal income tax rate on the higher band.",
                            "Income tax higher rate",
                            ParameterKind::Rate,
                        ),
                    )?,
                    band_bracket(
                        paths::INCOME_TAX_SCALE,
                        2,
                        &[(2019, 4, 6, 150_000.0), (2023, 4, 6, 125_140.0)],
                        &[(2019, 4, 6, 0.45)],
                        None,
                        meta(
                            "Additional rate",
                            "Marginal income tax rate on the additional band.",
                            "Income tax additional rate",
                            ParameterKind::Rate,
                        ),
                    )?,
                ],
            )?),
        ],
    );

    let national_insurance = ParameterNode::new(
        "tax.national_insurance",
        vec![ParameterChild::Scale(ParameterScale::new(
            paths::NI_SCALE,
            vec![
                band_bracket(
                    paths::NI_SCALE,
                    0,
                    &[(2019, 4, 6, 8_632.0), (2022, 7, 6, 12_570.0)],
                    &[(2019, 4, 6, 0.12), (2024, 4, 6, 0.08)],
                    None,
                    meta(
                        "NI main rate",
                        "Employee national insurance rate on earnings in the main band.",
                        "National insurance main rate",
                        ParameterKind::Rate,
                    ),
                )?,
                band_bracket(
                    paths::NI_SCALE,
                    1,
                    &[(2019, 4, 6, 50_000.0), (2021, 4, 6, 50_270.0)],
                    &[(2019, 4, 6, 0.02)],
                    None,
                    meta(
                        "NI upper rate",
                        "Employee national insurance rate on earnings above the upper threshold.",
                        "National insurance upper rate",
                        ParameterKind::Rate,
                    ),
                )?,
            ],
        )?)],
    );

    let land_value_tax = ParameterNode::new(
        "tax.land_value_tax",
        vec![ParameterChild::Value(scalar(
            paths::LVT_RATE,
            &[(2019, 4, 6, 0.0)],
            meta(
                "Land value tax",
                "Yearly tax rate on the unimproved value of household land.",
                "Land value tax rate",
                ParameterKind::Rate,
            ),
        )?)],
    );

    let child_benefit = ParameterNode::new(
        "benefits.child_benefit",
        vec![
            ParameterChild::Value(scalar(
                paths::CHILD_BENEFIT_ELDEST,
                &[(2019, 4, 6, 20.70), (2024, 4, 6, 25.60)],
                meta(
                    "Child benefit (eldest)",
                    "Weekly child benefit for the eldest or only child.",
                    "Child benefit for the first child",
                    ParameterKind::WeeklyAmount,
                ),
            )?),
            ParameterChild::Value(scalar(
                paths::CHILD_BENEFIT_ADDITIONAL,
                &[(2019, 4, 6, 13.70), (2024, 4, 6, 16.95)],
                meta(
                    "Child benefit (additional)",
                    "Weekly child benefit for each child after the first.",
                    "Child benefit for additional children",
                    ParameterKind::WeeklyAmount,
                ),
            )?),
        ],
    );

    let universal_credit = ParameterNode::new(
        "benefits.universal_credit",
        vec![
            ParameterChild::Value(scalar(
                paths::UC_STANDARD_ALLOWANCE,
                &[(2019, 4, 6, 4_200.0), (2024, 4, 6, 4_800.0)],
                meta(
                    "UC standard allowance",
                    "Yearly universal credit standard allowance per household.",
                    "Universal credit standard allowance",
                    ParameterKind::YearlyAmount,
                ),
            )?),
            ParameterChild::Value(scalar(
                paths::UC_REDUCTION_RATE,
                &[(2019, 4, 6, 0.63), (2021, 12, 1, 0.55)],
                meta(
                    "UC reduction rate",
                    "Rate at which universal credit is withdrawn against earnings.",
                    "Universal credit taper rate",
                    ParameterKind::Rate,
                ),
            )?),
            ParameterChild::Value(scalar(
                paths::UC_WORK_ALLOWANCE,
                &[(2019, 4, 6, 5_000.0)],
                None,
            )?),
        ],
    );

    let basic_income = ParameterNode::new(
        "benefits.basic_income",
        vec![
            ParameterChild::Value(scalar(
                paths::CHILD_UBI,
                &[(2019, 4, 6, 0.0)],
                meta(
                    "Child basic income",
                    "Weekly unconditional payment per child.",
                    "Basic income for children",
                    ParameterKind::WeeklyAmount,
                ),
            )?),
            ParameterChild::Value(scalar(
                paths::ADULT_UBI,
                &[(2019, 4, 6, 0.0)],
                meta(
                    "Adult basic income",
                    "Weekly unconditional payment per working-age adult.",
                    "Basic income for working-age adults",
                    ParameterKind::WeeklyAmount,
                ),
            )?),
            ParameterChild::Value(scalar(
                paths::SENIOR_UBI,
                &[(2019, 4, 6, 0.0)],
                meta(
                    "Senior basic income",
                    "Weekly unconditional payment per adult over state pension age.",
                    "Basic income for seniors",
                    ParameterKind::WeeklyAmount,
                ),
            )?),
        ],
    );

    let poverty = ParameterNode::new(
        "poverty",
        vec![ParameterChild::Value(scalar(
            paths::POVERTY_LINE,
            &[(2019, 4, 6, 15_400.0), (2024, 4, 6, 17_100.0)],
            None,
        )?)],
    );

    Ok(ParameterNode::new(
        "gov",
        vec![
            ParameterChild::Node(ParameterNode::new(
                "tax",
                vec![
                    ParameterChild::Node(income_tax),
                    ParameterChild::Node(national_insurance),
                    ParameterChild::Node(land_value_tax),
                ],
            )),
            ParameterChild::Node(ParameterNode::new(
                "benefits",
                vec![
                    ParameterChild::Node(child_benefit),
                    ParameterChild::Node(universal_credit),
                    ParameterChild::Node(basic_income),
                ],
            )),
            ParameterChild::Node(poverty),
        ],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn value_at_picks_latest_entry_not_after_date() {
        let param = Parameter::new(
            "test.param",
            vec![(d(2020, 4, 6), 1.0), (d(2022, 4, 6), 2.0)],
            None,
        )
        .unwrap();

        assert_eq!(param.value_at(d(2019, 1, 1)), 1.0);
        assert_eq!(param.value_at(d(2020, 4, 6)), 1.0);
        assert_eq!(param.value_at(d(2021, 12, 31)), 1.0);
        assert_eq!(param.value_at(d(2022, 4, 6)), 2.0);
        assert_eq!(param.value_at(d(2030, 1, 1)), 2.0);
    }

    #[test]
    fn parameter_rejects_unordered_history() {
        let err = Parameter::new(
            "test.param",
            vec![(d(2022, 4, 6), 2.0), (d(2020, 4, 6), 1.0)],
            None,
        )
        .unwrap_err();
        assert!(matches!(err, PolicyError::InvalidParameter { .. }));
    }

    #[test]
    fn parameter_rejects_empty_history() {
        assert!(Parameter::new("test.param", vec![], None).is_err());
    }

    #[test]
    fn baseline_tree_builds_and_contains_expected_leaves() {
        let tree = uk_parameter_tree().unwrap();
        let leaves = tree.descendants();

        let scalar_names: Vec<&str> = leaves
            .iter()
            .filter_map(|leaf| match leaf {
                Leaf::Value(p) => Some(p.name()),
                Leaf::Scale(_) => None,
            })
            .collect();
        assert!(scalar_names.contains(&paths::PERSONAL_ALLOWANCE));
        assert!(scalar_names.contains(&paths::ADULT_UBI));
        assert!(scalar_names.contains(&paths::POVERTY_LINE));

        assert!(tree.find_scale(paths::INCOME_TAX_SCALE).is_some());
        assert!(tree.find_scale(paths::NI_SCALE).is_some());
        assert!(tree.find_scale("tax.income_tax.personal_allowance").is_none());
    }

    #[test]
    fn bracket_members_expand_to_at_most_three() {
        let tree = uk_parameter_tree().unwrap();
        for leaf in tree.descendants() {
            if let Leaf::Scale(scale) = leaf {
                for bracket in scale.brackets() {
                    assert!(bracket.members().count() <= 3);
                }
            }
        }
    }

    #[test]
    fn values_at_reflects_uprating_history() {
        let tree = uk_parameter_tree().unwrap();
        let old: std::collections::BTreeMap<_, _> =
            tree.values_at(d(2020, 1, 1)).into_iter().collect();
        let new: std::collections::BTreeMap<_, _> =
            tree.values_at(d(2026, 1, 1)).into_iter().collect();

        assert_eq!(old[paths::PERSONAL_ALLOWANCE], 12_500.0);
        assert_eq!(new[paths::PERSONAL_ALLOWANCE], 12_570.0);

        let ni_main = paths::bracket_member(paths::NI_SCALE, 0, "rate");
        assert_eq!(old[&ni_main], 0.12);
        assert_eq!(new[&ni_main], 0.08);
    }

    #[test]
    fn visibility_flag_is_metadata_presence() {
        let tree = uk_parameter_tree().unwrap();
        let mut visible = 0;
        let mut hidden = 0;
        for leaf in tree.descendants() {
            match leaf {
                Leaf::Value(p) => {
                    if p.meta().is_some() {
                        visible += 1;
                    } else {
                        hidden += 1;
                    }
                }
                Leaf::Scale(scale) => {
                    for bracket in scale.brackets() {
                        for member in bracket.members() {
                            if member.meta().is_some() {
                                visible += 1;
                            } else {
                                hidden += 1;
                            }
                        }
                    }
                }
            }
        }
        assert!(visible > 0);
        assert!(hidden > 0);
    }
}
