use serde::Serialize;

use crate::core::{IncomeSweep, IndividualSim, Variable};

use super::{WaterfallChart, WaterfallItem};

/// Baseline/reformed pair for one headline figure.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FigureComparison {
    pub baseline: f64,
    pub reformed: f64,
    pub change: f64,
}

impl FigureComparison {
    fn new(baseline: f64, reformed: f64) -> Self {
        Self {
            baseline,
            reformed,
            change: reformed - baseline,
        }
    }
}

/// Headline yearly figures for the simulated household.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadlineFigures {
    pub net_income: FigureComparison,
    pub tax: FigureComparison,
    pub benefits: FigureComparison,
}

pub fn headline_figures(baseline: &IndividualSim, reformed: &IndividualSim) -> HeadlineFigures {
    HeadlineFigures {
        net_income: FigureComparison::new(
            baseline.calc(Variable::NetIncome),
            reformed.calc(Variable::NetIncome),
        ),
        tax: FigureComparison::new(baseline.calc(Variable::Tax), reformed.calc(Variable::Tax)),
        benefits: FigureComparison::new(
            baseline.calc(Variable::Benefits),
            reformed.calc(Variable::Benefits),
        ),
    }
}

/// Per-component decomposition of the household's net income change. Tax
/// components enter with the sign of their effect on net income.
pub fn household_waterfall_chart(
    baseline: &IndividualSim,
    reformed: &IndividualSim,
) -> WaterfallChart {
    let b = baseline.outcome();
    let r = reformed.outcome();

    let items = vec![
        WaterfallItem {
            label: "Income tax".to_string(),
            amount: -(r.income_tax - b.income_tax),
        },
        WaterfallItem {
            label: "National insurance".to_string(),
            amount: -(r.national_insurance - b.national_insurance),
        },
        WaterfallItem {
            label: "Land value tax".to_string(),
            amount: -(r.land_value_tax - b.land_value_tax),
        },
        WaterfallItem {
            label: "Child benefit".to_string(),
            amount: r.child_benefit - b.child_benefit,
        },
        WaterfallItem {
            label: "Universal credit".to_string(),
            amount: r.universal_credit - b.universal_credit,
        },
        WaterfallItem {
            label: "Basic income".to_string(),
            amount: r.basic_income - b.basic_income,
        },
    ];
    WaterfallChart::from_items(items)
}

/// Household net income and total tax across the employment-income grid,
/// baseline vs reformed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetChart {
    pub employment_income: Vec<f64>,
    pub baseline_net_income: Vec<f64>,
    pub reformed_net_income: Vec<f64>,
    pub baseline_tax: Vec<f64>,
    pub reformed_tax: Vec<f64>,
}

pub fn budget_chart(baseline: &IncomeSweep, reformed: &IncomeSweep) -> BudgetChart {
    BudgetChart {
        employment_income: baseline.gross.clone(),
        baseline_net_income: baseline.net.clone(),
        reformed_net_income: reformed.net.clone(),
        baseline_tax: baseline.tax.clone(),
        reformed_tax: reformed.tax.clone(),
    }
}

/// Marginal tax rates over the sweep: 1 minus the net-income gain from each
/// extra pound of gross income, evaluated per grid step.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MtrChart {
    pub employment_income: Vec<f64>,
    pub baseline_mtr: Vec<f64>,
    pub reformed_mtr: Vec<f64>,
}

fn marginal_rates(sweep: &IncomeSweep) -> Vec<f64> {
    sweep
        .gross
        .windows(2)
        .zip(sweep.net.windows(2))
        .map(|(gross, net)| {
            let step = gross[1] - gross[0];
            1.0 - (net[1] - net[0]) / step
        })
        .collect()
}

pub fn mtr_chart(baseline: &IncomeSweep, reformed: &IncomeSweep) -> MtrChart {
    let points = baseline.gross.len().saturating_sub(1);
    MtrChart {
        employment_income: baseline.gross[..points].to_vec(),
        baseline_mtr: marginal_rates(baseline),
        reformed_mtr: marginal_rates(reformed),
    }
}
