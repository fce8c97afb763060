mod calculator;
mod dataset;
mod error;
mod household;
mod parameters;
mod population;
mod reform;
mod situation;

pub use calculator::{
    HouseholdOutcome, SENIOR_AGE, equivalence_scale, equivalised_income, in_poverty, income_tax,
    marginal_band_tax, national_insurance, simulate_household,
};
pub use dataset::{DEFAULT_HOUSEHOLDS, DEFAULT_SEED, HouseholdRecord, SurveyDataset};
pub use error::PolicyError;
pub use household::{
    DEFAULT_TAX_YEAR, EMPLOYMENT_SWEEP_MAX, EMPLOYMENT_SWEEP_STEP, IncomeSweep, IndividualSim,
};
pub use parameters::{
    BandValue, Bracket, Leaf, Parameter, ParameterChild, ParameterKind, ParameterMeta,
    ParameterNode, ParameterScale, PolicyValues, paths, uk_parameter_tree,
};
pub use population::{Microsimulation, Variable, WeightedSeries};
pub use reform::{
    Override, ParamMap, Reform, add_lvt, create_reform, current_date_parameters, resolve_policy,
};
pub use situation::{Adult, Situation, create_situation};
