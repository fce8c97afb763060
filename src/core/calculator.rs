use super::parameters::{BandValue, PolicyValues};

/// Age from which an adult counts as a senior (basic income, poverty groups).
pub const SENIOR_AGE: u32 = 65;

const WEEKS_PER_YEAR: f64 = 52.0;

/// Yearly amounts for a single simulated household.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HouseholdOutcome {
    pub employment_income: f64,
    pub income_tax: f64,
    pub national_insurance: f64,
    pub land_value_tax: f64,
    pub child_benefit: f64,
    pub universal_credit: f64,
    pub basic_income: f64,
    pub net_income: f64,
}

impl HouseholdOutcome {
    pub fn tax(&self) -> f64 {
        self.income_tax + self.national_insurance + self.land_value_tax
    }

    pub fn benefits(&self) -> f64 {
        self.child_benefit + self.universal_credit + self.basic_income
    }
}

/// Marginal tax over ascending bands: each band's rate applies to the slice
/// of `amount` between its threshold and the next band's threshold.
pub fn marginal_band_tax(bands: &[BandValue], amount: f64) -> f64 {
    let mut tax = 0.0;
    for (index, band) in bands.iter().enumerate() {
        let upper = bands
            .get(index + 1)
            .map(|next| next.threshold)
            .unwrap_or(f64::INFINITY);
        let taxed = (amount.min(upper) - band.threshold).max(0.0);
        tax += band.rate * taxed;
    }
    tax
}

/// Per-adult income tax: personal allowance (withdrawn at 50p per pound of
/// income above the taper start), then the progressive scale over taxable
/// income.
pub fn income_tax(policy: &PolicyValues, gross: f64) -> f64 {
    let taper = 0.5 * (gross - policy.allowance_taper_start).max(0.0);
    let allowance = (policy.personal_allowance - taper).max(0.0);
    let taxable = (gross - allowance).max(0.0);
    marginal_band_tax(&policy.income_tax_bands, taxable)
}

/// Per-adult employee national insurance over gross earnings.
pub fn national_insurance(policy: &PolicyValues, gross: f64) -> f64 {
    marginal_band_tax(&policy.ni_bands, gross)
}

fn child_benefit(policy: &PolicyValues, children: u32) -> f64 {
    if children == 0 {
        return 0.0;
    }
    let weekly = policy.child_benefit_eldest
        + policy.child_benefit_additional * (children - 1) as f64;
    weekly * WEEKS_PER_YEAR
}

fn universal_credit(policy: &PolicyValues, household_earnings: f64) -> f64 {
    let reduction =
        policy.uc_reduction_rate * (household_earnings - policy.uc_work_allowance).max(0.0);
    (policy.uc_standard_allowance - reduction).max(0.0)
}

fn basic_income(policy: &PolicyValues, adult_ages: &[u32], children: u32) -> f64 {
    let adult_weekly: f64 = adult_ages
        .iter()
        .map(|&age| {
            if age >= SENIOR_AGE {
                policy.senior_ubi
            } else {
                policy.adult_ubi
            }
        })
        .sum();
    (adult_weekly + policy.child_ubi * children as f64) * WEEKS_PER_YEAR
}

/// Computes one household's yearly taxes, benefits and net income under the
/// given resolved policy.
pub fn simulate_household(
    policy: &PolicyValues,
    adult_ages: &[u32],
    employment_incomes: &[f64],
    children: u32,
    land_value: f64,
) -> HouseholdOutcome {
    let employment_income: f64 = employment_incomes.iter().sum();
    let income_tax: f64 = employment_incomes
        .iter()
        .map(|&gross| self::income_tax(policy, gross))
        .sum();
    let national_insurance: f64 = employment_incomes
        .iter()
        .map(|&gross| self::national_insurance(policy, gross))
        .sum();
    let land_value_tax = policy.lvt_rate * land_value;
    let child_benefit = child_benefit(policy, children);
    let universal_credit = universal_credit(policy, employment_income);
    let basic_income = basic_income(policy, adult_ages, children);

    let net_income = employment_income - income_tax - national_insurance - land_value_tax
        + child_benefit
        + universal_credit
        + basic_income;

    HouseholdOutcome {
        employment_income,
        income_tax,
        national_insurance,
        land_value_tax,
        child_benefit,
        universal_credit,
        basic_income,
        net_income,
    }
}

/// OECD-style equivalence scale: 1.0 for the first adult, 0.5 for each
/// further adult, 0.3 per child.
pub fn equivalence_scale(adults: usize, children: u32) -> f64 {
    if adults == 0 {
        return 1.0;
    }
    1.0 + 0.5 * (adults as f64 - 1.0) + 0.3 * children as f64
}

pub fn equivalised_income(net_income: f64, adults: usize, children: u32) -> f64 {
    net_income / equivalence_scale(adults, children)
}

pub fn in_poverty(policy: &PolicyValues, net_income: f64, adults: usize, children: u32) -> bool {
    equivalised_income(net_income, adults, children) < policy.poverty_line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parameters::uk_parameter_tree;
    use crate::core::reform::resolve_policy;
    use chrono::NaiveDate;
    use proptest::prelude::{prop_assert, proptest};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn current_policy() -> PolicyValues {
        let tree = uk_parameter_tree().unwrap();
        let today = NaiveDate::from_ymd_opt(2026, 8, 23).unwrap();
        resolve_policy(&tree, today, &[]).unwrap()
    }

    #[test]
    fn income_tax_matches_known_figures() {
        let policy = current_policy();
        // 50,000 gross: allowance 12,570, taxable 37,430, all at 20%.
        assert_approx(income_tax(&policy, 50_000.0), 7_486.0);
        // Below the allowance: no tax.
        assert_approx(income_tax(&policy, 10_000.0), 0.0);
    }

    #[test]
    fn allowance_is_fully_tapered_at_high_incomes() {
        let policy = current_policy();
        // At 137,710 the 50p taper has removed the whole 12,570 allowance.
        let taper_end = policy.allowance_taper_start + 2.0 * policy.personal_allowance;
        let taxed_with_taper = income_tax(&policy, taper_end);
        let expected = marginal_band_tax(&policy.income_tax_bands, taper_end);
        assert_approx(taxed_with_taper, expected);
    }

    #[test]
    fn national_insurance_matches_known_figures() {
        let policy = current_policy();
        // 50,270 gross: (50,270 - 12,570) * 8%.
        assert_approx(national_insurance(&policy, 50_270.0), 3_016.0);
        // 60,000 gross adds 2% above the upper threshold.
        assert_approx(national_insurance(&policy, 60_000.0), 3_016.0 + 9_730.0 * 0.02);
    }

    #[test]
    fn universal_credit_floors_at_zero() {
        let policy = current_policy();
        let outcome = simulate_household(&policy, &[35], &[80_000.0], 0, 0.0);
        assert_eq!(outcome.universal_credit, 0.0);

        let workless = simulate_household(&policy, &[35], &[0.0], 0, 0.0);
        assert_approx(workless.universal_credit, policy.uc_standard_allowance);
    }

    #[test]
    fn child_benefit_distinguishes_eldest_from_additional() {
        let policy = current_policy();
        let one = simulate_household(&policy, &[35], &[0.0], 1, 0.0);
        let two = simulate_household(&policy, &[35], &[0.0], 2, 0.0);
        assert_approx(one.child_benefit, policy.child_benefit_eldest * 52.0);
        assert_approx(
            two.child_benefit - one.child_benefit,
            policy.child_benefit_additional * 52.0,
        );
    }

    #[test]
    fn basic_income_splits_by_age_group() {
        let mut policy = current_policy();
        policy.adult_ubi = 50.0;
        policy.senior_ubi = 30.0;
        policy.child_ubi = 20.0;

        let outcome = simulate_household(&policy, &[40, 70], &[0.0, 0.0], 1, 0.0);
        assert_approx(outcome.basic_income, (50.0 + 30.0 + 20.0) * 52.0);
    }

    #[test]
    fn net_income_balances_components() {
        let policy = current_policy();
        let outcome = simulate_household(&policy, &[40, 38], &[35_000.0, 18_000.0], 2, 200_000.0);
        assert_approx(
            outcome.net_income,
            outcome.employment_income - outcome.tax() + outcome.benefits(),
        );
    }

    #[test]
    fn equivalence_scale_matches_oecd_style_weights() {
        assert_approx(equivalence_scale(1, 0), 1.0);
        assert_approx(equivalence_scale(2, 0), 1.5);
        assert_approx(equivalence_scale(2, 2), 2.1);
    }

    proptest! {
        #[test]
        fn prop_income_tax_is_monotone_in_income(
            lo in 0u32..200_000,
            delta in 0u32..100_000
        ) {
            let policy = current_policy();
            let low = income_tax(&policy, lo as f64);
            let high = income_tax(&policy, (lo + delta) as f64);
            prop_assert!(high + 1e-9 >= low);
        }

        #[test]
        fn prop_raising_the_basic_rate_never_raises_net_income(
            gross in 0u32..250_000,
            bump_bp in 1u32..3000
        ) {
            let mut policy = current_policy();
            let before = simulate_household(&policy, &[40], &[gross as f64], 0, 0.0);
            policy.income_tax_bands[0].rate += bump_bp as f64 / 10_000.0;
            let after = simulate_household(&policy, &[40], &[gross as f64], 0, 0.0);
            prop_assert!(after.net_income <= before.net_income + 1e-9);
        }

        #[test]
        fn prop_band_tax_never_exceeds_amount(amount in 0u32..1_000_000) {
            let policy = current_policy();
            let tax = marginal_band_tax(&policy.income_tax_bands, amount as f64);
            prop_assert!(tax >= 0.0);
            prop_assert!(tax <= amount as f64);
        }
    }
}
