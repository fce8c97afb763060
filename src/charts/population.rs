use serde::Serialize;

use crate::core::{Microsimulation, Variable};

use super::{WaterfallChart, WaterfallItem};

/// Relative net-income change below which a person counts as unaffected.
const NO_CHANGE_BAND: f64 = 0.001;
/// Relative change separating modest from large gains and losses.
const LARGE_CHANGE_BAND: f64 = 0.05;

/// Headline comparison of a reformed population against the baseline.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadlineMetrics {
    /// Yearly cost to the exchequer: reformed total net income minus
    /// baseline. Positive means the reform gives money to households.
    pub net_cost: f64,
    /// Relative change in the person-level poverty rate.
    pub poverty_change: f64,
    /// Share of people whose household gains more than 0.1%.
    pub winner_share: f64,
    /// Share of people whose household loses more than 0.1%.
    pub loser_share: f64,
    /// Mean yearly net-income change per household.
    pub avg_gain: f64,
}

fn relative_change(baseline: f64, reformed: f64) -> f64 {
    (reformed - baseline) / baseline.abs().max(1.0)
}

pub fn headline_metrics(baseline: &Microsimulation, reformed: &Microsimulation) -> HeadlineMetrics {
    let baseline_net = baseline.calc(Variable::NetIncome);
    let reformed_net = reformed.calc(Variable::NetIncome);

    let baseline_poverty = baseline.calc(Variable::InPoverty).mean();
    let reformed_poverty = reformed.calc(Variable::InPoverty).mean();
    let poverty_change = if baseline_poverty > 0.0 {
        (reformed_poverty - baseline_poverty) / baseline_poverty
    } else {
        0.0
    };

    let mut winners = 0.0;
    let mut losers = 0.0;
    let mut people_total = 0.0;
    for index in 0..baseline.len() {
        let people = baseline.household_weights()[index] * baseline.people_per_household()[index];
        people_total += people;
        let change = relative_change(
            baseline_net.values()[index],
            reformed_net.values()[index],
        );
        if change > NO_CHANGE_BAND {
            winners += people;
        } else if change < -NO_CHANGE_BAND {
            losers += people;
        }
    }

    let household_weight_total: f64 = baseline.household_weights().iter().sum();

    HeadlineMetrics {
        net_cost: reformed_net.sum() - baseline_net.sum(),
        poverty_change,
        winner_share: if people_total > 0.0 {
            winners / people_total
        } else {
            0.0
        },
        loser_share: if people_total > 0.0 {
            losers / people_total
        } else {
            0.0
        },
        avg_gain: if household_weight_total > 0.0 {
            (reformed_net.sum() - baseline_net.sum()) / household_weight_total
        } else {
            0.0
        },
    }
}

/// Relative mean net-income change per baseline income decile.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecileChart {
    pub deciles: Vec<u8>,
    pub changes: Vec<f64>,
}

pub fn decile_chart(baseline: &Microsimulation, reformed: &Microsimulation) -> DecileChart {
    let ranks = baseline.decile_ranks();
    let baseline_net = baseline.calc(Variable::NetIncome);
    let reformed_net = reformed.calc(Variable::NetIncome);

    let mut baseline_totals = [0.0_f64; 10];
    let mut reformed_totals = [0.0_f64; 10];
    for (index, &rank) in ranks.iter().enumerate() {
        let weight = baseline.household_weights()[index];
        baseline_totals[rank as usize - 1] += weight * baseline_net.values()[index];
        reformed_totals[rank as usize - 1] += weight * reformed_net.values()[index];
    }

    let deciles = (1..=10).collect();
    let changes = (0..10)
        .map(|d| {
            if baseline_totals[d].abs() > 0.0 {
                (reformed_totals[d] - baseline_totals[d]) / baseline_totals[d].abs()
            } else {
                0.0
            }
        })
        .collect();

    DecileChart { deciles, changes }
}

/// Person-level poverty rates by demographic group.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PovertyRates {
    pub children: f64,
    pub working_age: f64,
    pub seniors: f64,
    pub all: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PovertyChart {
    pub baseline: PovertyRates,
    pub reformed: PovertyRates,
}

fn poverty_rates(sim: &Microsimulation) -> PovertyRates {
    let mut group_people = [0.0_f64; 4];
    let mut group_poor = [0.0_f64; 4];

    for index in 0..sim.len() {
        let weight = sim.household_weights()[index];
        let groups = [
            sim.children_per_household()[index],
            sim.working_age_per_household()[index],
            sim.seniors_per_household()[index],
            sim.people_per_household()[index],
        ];
        let poor = sim.poverty_flags()[index];
        for (slot, count) in groups.iter().enumerate() {
            let people = weight * count;
            group_people[slot] += people;
            if poor {
                group_poor[slot] += people;
            }
        }
    }

    let rate = |slot: usize| {
        if group_people[slot] > 0.0 {
            group_poor[slot] / group_people[slot]
        } else {
            0.0
        }
    };

    PovertyRates {
        children: rate(0),
        working_age: rate(1),
        seniors: rate(2),
        all: rate(3),
    }
}

pub fn poverty_chart(baseline: &Microsimulation, reformed: &Microsimulation) -> PovertyChart {
    PovertyChart {
        baseline: poverty_rates(baseline),
        reformed: poverty_rates(reformed),
    }
}

/// Budget decomposition of the reform: change in benefit outlays plus change
/// in foregone tax revenue, totalling the headline net cost.
pub fn population_waterfall_chart(
    baseline: &Microsimulation,
    reformed: &Microsimulation,
) -> WaterfallChart {
    let tax_change = reformed.calc(Variable::Tax).sum() - baseline.calc(Variable::Tax).sum();
    let benefit_change =
        reformed.calc(Variable::Benefits).sum() - baseline.calc(Variable::Benefits).sum();

    WaterfallChart::from_items(vec![
        WaterfallItem {
            label: "Benefit outlays".to_string(),
            amount: benefit_change,
        },
        WaterfallItem {
            label: "Tax revenue".to_string(),
            amount: -tax_change,
        },
    ])
}

/// Per-decile shares of people by outcome band; the five shares sum to one
/// within each decile.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntraDecileChart {
    pub deciles: Vec<u8>,
    pub gain_more_than_5_pct: Vec<f64>,
    pub gain: Vec<f64>,
    pub no_change: Vec<f64>,
    pub lose: Vec<f64>,
    pub lose_more_than_5_pct: Vec<f64>,
}

pub fn intra_decile_chart(
    baseline: &Microsimulation,
    reformed: &Microsimulation,
) -> IntraDecileChart {
    let ranks = baseline.decile_ranks();
    let baseline_net = baseline.calc(Variable::NetIncome);
    let reformed_net = reformed.calc(Variable::NetIncome);

    let mut people = [[0.0_f64; 5]; 10];
    let mut totals = [0.0_f64; 10];
    for (index, &rank) in ranks.iter().enumerate() {
        let weight =
            baseline.household_weights()[index] * baseline.people_per_household()[index];
        let change = relative_change(
            baseline_net.values()[index],
            reformed_net.values()[index],
        );
        let band = if change > LARGE_CHANGE_BAND {
            0
        } else if change > NO_CHANGE_BAND {
            1
        } else if change >= -NO_CHANGE_BAND {
            2
        } else if change >= -LARGE_CHANGE_BAND {
            3
        } else {
            4
        };
        people[rank as usize - 1][band] += weight;
        totals[rank as usize - 1] += weight;
    }

    let share = |decile: usize, band: usize| {
        if totals[decile] > 0.0 {
            people[decile][band] / totals[decile]
        } else {
            0.0
        }
    };

    IntraDecileChart {
        deciles: (1..=10).collect(),
        gain_more_than_5_pct: (0..10).map(|d| share(d, 0)).collect(),
        gain: (0..10).map(|d| share(d, 1)).collect(),
        no_change: (0..10).map(|d| share(d, 2)).collect(),
        lose: (0..10).map(|d| share(d, 3)).collect(),
        lose_more_than_5_pct: (0..10).map(|d| share(d, 4)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        Microsimulation, ParamMap, SurveyDataset, create_reform, uk_parameter_tree,
    };
    use chrono::NaiveDate;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 23).unwrap()
    }

    fn sims(levers: &[(&str, f64)]) -> (Microsimulation, Microsimulation) {
        let tree = uk_parameter_tree().unwrap();
        let dataset = SurveyDataset::synthetic(512, 42);
        let baseline = Microsimulation::new(&tree, &[], &dataset, today()).unwrap();
        let map: ParamMap = levers
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect();
        let reform = create_reform(&map).unwrap();
        let reformed = Microsimulation::new(&tree, &[reform], &dataset, today()).unwrap();
        (baseline, reformed)
    }

    #[test]
    fn identical_simulations_report_zero_change() {
        let (baseline, reformed) = sims(&[]);
        let metrics = headline_metrics(&baseline, &reformed);
        assert_eq!(metrics.net_cost, 0.0);
        assert_eq!(metrics.poverty_change, 0.0);
        assert_eq!(metrics.winner_share, 0.0);
        assert_eq!(metrics.loser_share, 0.0);
        assert_eq!(metrics.avg_gain, 0.0);

        let deciles = decile_chart(&baseline, &reformed);
        assert!(deciles.changes.iter().all(|&c| c == 0.0));

        let intra = intra_decile_chart(&baseline, &reformed);
        assert!(intra.no_change.iter().all(|&s| (s - 1.0).abs() < 1e-12));
    }

    #[test]
    fn a_tax_rise_makes_losers_and_revenue() {
        let (baseline, reformed) = sims(&[("basic_rate", 25.0)]);
        let metrics = headline_metrics(&baseline, &reformed);
        assert!(metrics.net_cost < 0.0);
        assert!(metrics.loser_share > 0.0);
        assert_eq!(metrics.winner_share, 0.0);
    }

    #[test]
    fn a_universal_payment_makes_winners_and_costs_money() {
        let (baseline, reformed) = sims(&[("adult_UBI", 100.0)]);
        let metrics = headline_metrics(&baseline, &reformed);
        assert!(metrics.net_cost > 0.0);
        assert!(metrics.winner_share > 0.0);
        assert_eq!(metrics.loser_share, 0.0);
        assert!(metrics.poverty_change < 0.0);
    }

    #[test]
    fn waterfall_total_matches_the_headline_net_cost() {
        let (baseline, reformed) = sims(&[("adult_UBI", 75.0), ("basic_rate", 24.0)]);
        let metrics = headline_metrics(&baseline, &reformed);
        let waterfall = population_waterfall_chart(&baseline, &reformed);
        assert!((waterfall.total - metrics.net_cost).abs() < 1e-3);
        assert_eq!(waterfall.items.len(), 2);
    }

    #[test]
    fn intra_decile_shares_sum_to_one() {
        let (baseline, reformed) = sims(&[("basic_rate", 30.0)]);
        let intra = intra_decile_chart(&baseline, &reformed);
        for d in 0..10 {
            let sum = intra.gain_more_than_5_pct[d]
                + intra.gain[d]
                + intra.no_change[d]
                + intra.lose[d]
                + intra.lose_more_than_5_pct[d];
            assert!((sum - 1.0).abs() < 1e-9, "decile {d} shares sum to {sum}");
        }
    }

    #[test]
    fn poverty_chart_reports_all_four_groups() {
        let (baseline, reformed) = sims(&[("child_UBI", 60.0)]);
        let chart = poverty_chart(&baseline, &reformed);
        assert!(chart.baseline.all > 0.0);
        assert!(chart.reformed.children <= chart.baseline.children);
        for rate in [
            chart.baseline.children,
            chart.baseline.working_age,
            chart.baseline.seniors,
            chart.baseline.all,
        ] {
            assert!((0.0..=1.0).contains(&rate));
        }
    }
}
