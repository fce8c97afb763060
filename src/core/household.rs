use chrono::NaiveDate;

use super::calculator::{
    HouseholdOutcome, SENIOR_AGE, equivalised_income, in_poverty, simulate_household,
};
use super::error::PolicyError;
use super::parameters::{ParameterNode, PolicyValues};
use super::population::Variable;
use super::reform::{Reform, resolve_policy};
use super::situation::Situation;

/// Tax year simulated by the household endpoint.
pub const DEFAULT_TAX_YEAR: i32 = 2026;

/// Grid used for budget and marginal-rate charts: gross employment income
/// from zero to the cap in steps of exactly 100.
pub const EMPLOYMENT_SWEEP_STEP: f64 = 100.0;
pub const EMPLOYMENT_SWEEP_MAX: f64 = 200_000.0;

/// Single-household simulation at a fixed tax year.
#[derive(Debug, Clone)]
pub struct IndividualSim {
    policy: PolicyValues,
    situation: Situation,
    outcome: HouseholdOutcome,
}

fn tax_year_start(year: i32) -> Result<NaiveDate, PolicyError> {
    NaiveDate::from_ymd_opt(year, 4, 6).ok_or(PolicyError::InvalidParameter {
        name: "tax_year".to_string(),
        reason: format!("invalid year {year}"),
    })
}

fn outcome_for(policy: &PolicyValues, situation: &Situation) -> HouseholdOutcome {
    let ages: Vec<u32> = situation.adults.iter().map(|a| a.age).collect();
    let incomes: Vec<f64> = situation
        .adults
        .iter()
        .map(|a| a.employment_income)
        .collect();
    simulate_household(
        policy,
        &ages,
        &incomes,
        situation.children,
        situation.land_value,
    )
}

impl IndividualSim {
    pub fn new(
        tree: &ParameterNode,
        reforms: &[Reform],
        situation: &Situation,
        year: i32,
    ) -> Result<Self, PolicyError> {
        let policy = resolve_policy(tree, tax_year_start(year)?, reforms)?;
        let outcome = outcome_for(&policy, situation);
        Ok(Self {
            policy,
            situation: situation.clone(),
            outcome,
        })
    }

    pub fn outcome(&self) -> &HouseholdOutcome {
        &self.outcome
    }

    pub fn calc(&self, variable: Variable) -> f64 {
        let adults = self.situation.adults.len();
        let children = self.situation.children;
        match variable {
            Variable::NetIncome => self.outcome.net_income,
            Variable::EmploymentIncome => self.outcome.employment_income,
            Variable::Tax => self.outcome.tax(),
            Variable::Benefits => self.outcome.benefits(),
            Variable::People => adults as f64 + children as f64,
            Variable::Children => children as f64,
            Variable::InPoverty => {
                if in_poverty(&self.policy, self.outcome.net_income, adults, children) {
                    1.0
                } else {
                    0.0
                }
            }
            Variable::EquivalisedNetIncome => {
                equivalised_income(self.outcome.net_income, adults, children)
            }
        }
    }

    pub fn is_senior_household(&self) -> bool {
        self.situation.adults.iter().all(|a| a.age >= SENIOR_AGE)
    }

    /// Evaluates the household over a grid of gross employment incomes for
    /// the first adult, other members unchanged. Returns a derived result;
    /// the simulation itself is never mutated, so charts computed before and
    /// after a sweep agree.
    pub fn sweep_employment_income(
        &self,
        step: f64,
        max: f64,
    ) -> Result<IncomeSweep, PolicyError> {
        if !(step.is_finite() && step > 0.0) || !(max.is_finite() && max >= 0.0) {
            return Err(PolicyError::InvalidParameter {
                name: "employment_income_sweep".to_string(),
                reason: format!("invalid grid: step {step}, max {max}"),
            });
        }

        let points = (max / step).floor() as usize + 1;
        let mut gross = Vec::with_capacity(points);
        let mut net = Vec::with_capacity(points);
        let mut tax = Vec::with_capacity(points);

        let mut varied = self.situation.clone();
        for index in 0..points {
            let income = index as f64 * step;
            varied.adults[0].employment_income = income;
            let outcome = outcome_for(&self.policy, &varied);
            gross.push(income);
            net.push(outcome.net_income);
            tax.push(outcome.tax());
        }

        Ok(IncomeSweep { gross, net, tax })
    }
}

/// Result of an employment-income sweep: parallel arrays over the gross
/// income grid.
#[derive(Debug, Clone)]
pub struct IncomeSweep {
    pub gross: Vec<f64>,
    pub net: Vec<f64>,
    pub tax: Vec<f64>,
}
