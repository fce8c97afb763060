use chrono::NaiveDate;

use super::calculator::{
    HouseholdOutcome, SENIOR_AGE, equivalised_income, in_poverty, simulate_household,
};
use super::dataset::SurveyDataset;
use super::error::PolicyError;
use super::parameters::{ParameterNode, PolicyValues};
use super::reform::{Reform, resolve_policy};

/// Queryable population variables, household-level unless noted.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Variable {
    NetIncome,
    EmploymentIncome,
    Tax,
    Benefits,
    /// Person counts per household, household-weighted.
    People,
    Children,
    /// 0/1 poverty flag, person-weighted.
    InPoverty,
    /// Equivalised net income, person-weighted.
    EquivalisedNetIncome,
}

/// A variable evaluated across the survey: one value and one weight per
/// household (weights are person-level where the variable is person-level).
#[derive(Debug, Clone)]
pub struct WeightedSeries {
    values: Vec<f64>,
    weights: Vec<f64>,
}

impl WeightedSeries {
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn sum(&self) -> f64 {
        self.values
            .iter()
            .zip(&self.weights)
            .map(|(v, w)| v * w)
            .sum()
    }

    pub fn mean(&self) -> f64 {
        let total_weight: f64 = self.weights.iter().sum();
        if total_weight == 0.0 {
            return 0.0;
        }
        self.sum() / total_weight
    }
}

/// Population-wide simulation of a reform stack against the survey dataset.
/// Every household is computed once at construction; the handle is immutable
/// afterwards, so a process-wide baseline can be shared across requests.
#[derive(Debug, Clone)]
pub struct Microsimulation {
    outcomes: Vec<HouseholdOutcome>,
    poverty: Vec<bool>,
    equivalised: Vec<f64>,
    weights: Vec<f64>,
    people: Vec<f64>,
    children: Vec<f64>,
    working_age: Vec<f64>,
    seniors: Vec<f64>,
}

impl Microsimulation {
    pub fn new(
        tree: &ParameterNode,
        reforms: &[Reform],
        dataset: &SurveyDataset,
        date: NaiveDate,
    ) -> Result<Self, PolicyError> {
        let policy = resolve_policy(tree, date, reforms)?;
        Ok(Self::from_policy(&policy, dataset))
    }

    fn from_policy(policy: &PolicyValues, dataset: &SurveyDataset) -> Self {
        let n = dataset.households.len();
        let mut outcomes = Vec::with_capacity(n);
        let mut poverty = Vec::with_capacity(n);
        let mut equivalised = Vec::with_capacity(n);
        let mut weights = Vec::with_capacity(n);
        let mut people = Vec::with_capacity(n);
        let mut children = Vec::with_capacity(n);
        let mut working_age = Vec::with_capacity(n);
        let mut seniors = Vec::with_capacity(n);

        for record in &dataset.households {
            let outcome = simulate_household(
                policy,
                &record.adult_ages,
                &record.employment_incomes,
                record.children,
                record.land_value,
            );
            let adults = record.adult_ages.len();
            poverty.push(in_poverty(
                policy,
                outcome.net_income,
                adults,
                record.children,
            ));
            equivalised.push(equivalised_income(
                outcome.net_income,
                adults,
                record.children,
            ));
            outcomes.push(outcome);
            weights.push(record.weight);
            people.push(record.people());
            children.push(record.children as f64);
            let senior_count = record
                .adult_ages
                .iter()
                .filter(|&&age| age >= SENIOR_AGE)
                .count() as f64;
            seniors.push(senior_count);
            working_age.push(adults as f64 - senior_count);
        }

        Self {
            outcomes,
            poverty,
            equivalised,
            weights,
            people,
            children,
            working_age,
            seniors,
        }
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn calc(&self, variable: Variable) -> WeightedSeries {
        let household_weights = || self.weights.clone();
        let person_weights = || {
            self.weights
                .iter()
                .zip(&self.people)
                .map(|(w, p)| w * p)
                .collect()
        };

        let (values, weights) = match variable {
            Variable::NetIncome => (
                self.outcomes.iter().map(|o| o.net_income).collect(),
                household_weights(),
            ),
            Variable::EmploymentIncome => (
                self.outcomes.iter().map(|o| o.employment_income).collect(),
                household_weights(),
            ),
            Variable::Tax => (
                self.outcomes.iter().map(|o| o.tax()).collect(),
                household_weights(),
            ),
            Variable::Benefits => (
                self.outcomes.iter().map(|o| o.benefits()).collect(),
                household_weights(),
            ),
            Variable::People => (self.people.clone(), household_weights()),
            Variable::Children => (self.children.clone(), household_weights()),
            Variable::InPoverty => (
                self.poverty
                    .iter()
                    .map(|&p| if p { 1.0 } else { 0.0 })
                    .collect(),
                person_weights(),
            ),
            Variable::EquivalisedNetIncome => (self.equivalised.clone(), person_weights()),
        };

        WeightedSeries { values, weights }
    }

    pub fn outcomes(&self) -> &[HouseholdOutcome] {
        &self.outcomes
    }

    pub fn poverty_flags(&self) -> &[bool] {
        &self.poverty
    }

    pub fn household_weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn people_per_household(&self) -> &[f64] {
        &self.people
    }

    pub fn children_per_household(&self) -> &[f64] {
        &self.children
    }

    pub fn working_age_per_household(&self) -> &[f64] {
        &self.working_age
    }

    pub fn seniors_per_household(&self) -> &[f64] {
        &self.seniors
    }

    /// Assigns each household an income decile (1..=10) by person-weighted
    /// equivalised net income. Charts rank on the baseline handle so that
    /// baseline and reformed households stay aligned.
    pub fn decile_ranks(&self) -> Vec<u8> {
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.sort_by(|&a, &b| self.equivalised[a].total_cmp(&self.equivalised[b]));

        let total: f64 = self
            .weights
            .iter()
            .zip(&self.people)
            .map(|(w, p)| w * p)
            .sum();
        let mut ranks = vec![1_u8; self.len()];
        if total <= 0.0 {
            return ranks;
        }

        let mut cumulative = 0.0;
        for index in order {
            let person_weight = self.weights[index] * self.people[index];
            let midpoint = cumulative + 0.5 * person_weight;
            cumulative += person_weight;
            let decile = ((midpoint / total) * 10.0).floor() as i64 + 1;
            ranks[index] = decile.clamp(1, 10) as u8;
        }
        ranks
    }
}
