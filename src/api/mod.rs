use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::{Json, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::NaiveDate;
use serde::Serialize;
use tokio::net::TcpListener;

use crate::charts::WaterfallChart;
use crate::charts::household::{
    BudgetChart, HeadlineFigures, MtrChart, budget_chart, headline_figures,
    household_waterfall_chart, mtr_chart,
};
use crate::charts::population::{
    DecileChart, HeadlineMetrics, IntraDecileChart, PovertyChart, decile_chart, headline_metrics,
    intra_decile_chart, population_waterfall_chart, poverty_chart,
};
use crate::core::{
    DEFAULT_TAX_YEAR, EMPLOYMENT_SWEEP_MAX, EMPLOYMENT_SWEEP_STEP, IndividualSim, Leaf,
    Microsimulation, ParamMap, Parameter, ParameterKind, ParameterNode, PolicyError, Reform,
    SurveyDataset, Variable, add_lvt, create_reform, create_situation, current_date_parameters,
    uk_parameter_tree,
};

/// Route paths the web client owns; listed for the hosting framework, not
/// served here.
pub const CLIENT_ROUTES: [&str; 5] = [
    "/",
    "/population-impact",
    "/household",
    "/household-impact",
    "/faq",
];

/// API operation names, in route order.
pub const API_ENDPOINTS: [&str; 4] = [
    "population_reform",
    "household_reform",
    "ubi",
    "parameters",
];

/// Everything a request handler needs, built once at startup and shared
/// read-only: the baseline parameter tree, the survey dataset, the pinned
/// current-date reform and the baseline population simulation.
pub struct AppContext {
    tree: ParameterNode,
    dataset: SurveyDataset,
    default_reform: Reform,
    baseline: Microsimulation,
    today: NaiveDate,
}

impl AppContext {
    pub fn new(households: usize, seed: u64, today: NaiveDate) -> Result<Self, PolicyError> {
        let tree = uk_parameter_tree()?;
        let dataset = SurveyDataset::synthetic(households, seed);
        let default_reform = current_date_parameters(&tree, today);
        let baseline =
            Microsimulation::new(&tree, &[default_reform.clone()], &dataset, today)?;
        Ok(Self {
            tree,
            dataset,
            default_reform,
            baseline,
            today,
        })
    }

}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulationReformResponse {
    #[serde(flatten)]
    pub headline: HeadlineMetrics,
    pub decile_chart: DecileChart,
    pub poverty_chart: PovertyChart,
    pub waterfall_chart: WaterfallChart,
    pub intra_decile_chart: IntraDecileChart,
}

/// Simulates a reform against the whole population and compares it with the
/// shared baseline.
pub fn population_reform(
    ctx: &AppContext,
    params: &ParamMap,
) -> Result<PopulationReformResponse, PolicyError> {
    let reform = create_reform(params)?;
    let reformed = Microsimulation::new(
        &ctx.tree,
        &[ctx.default_reform.clone(), reform],
        &ctx.dataset,
        ctx.today,
    )?;

    Ok(PopulationReformResponse {
        headline: headline_metrics(&ctx.baseline, &reformed),
        decile_chart: decile_chart(&ctx.baseline, &reformed),
        poverty_chart: poverty_chart(&ctx.baseline, &reformed),
        waterfall_chart: population_waterfall_chart(&ctx.baseline, &reformed),
        intra_decile_chart: intra_decile_chart(&ctx.baseline, &reformed),
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HouseholdReformResponse {
    #[serde(flatten)]
    pub figures: HeadlineFigures,
    pub waterfall_chart: WaterfallChart,
    pub budget_chart: BudgetChart,
    pub mtr_chart: MtrChart,
}

/// Simulates one household under current law (plus the fixed LVT baseline
/// addition) and under the reform, including employment-income sweeps for the
/// budget and marginal-rate charts.
pub fn household_reform(
    ctx: &AppContext,
    params: &ParamMap,
) -> Result<HouseholdReformResponse, PolicyError> {
    let situation = create_situation(params)?;
    let reform = create_reform(params)?;

    let baseline_config = [ctx.default_reform.clone(), add_lvt()];
    let reform_config = [ctx.default_reform.clone(), reform];
    let baseline = IndividualSim::new(&ctx.tree, &baseline_config, &situation, DEFAULT_TAX_YEAR)?;
    let reformed = IndividualSim::new(&ctx.tree, &reform_config, &situation, DEFAULT_TAX_YEAR)?;

    let figures = headline_figures(&baseline, &reformed);
    let waterfall = household_waterfall_chart(&baseline, &reformed);

    let baseline_sweep =
        baseline.sweep_employment_income(EMPLOYMENT_SWEEP_STEP, EMPLOYMENT_SWEEP_MAX)?;
    let reformed_sweep =
        reformed.sweep_employment_income(EMPLOYMENT_SWEEP_STEP, EMPLOYMENT_SWEEP_MAX)?;

    Ok(HouseholdReformResponse {
        figures,
        waterfall_chart: waterfall,
        budget_chart: budget_chart(&baseline_sweep, &reformed_sweep),
        mtr_chart: mtr_chart(&baseline_sweep, &reformed_sweep),
    })
}

#[derive(Debug, Serialize)]
pub struct UbiResponse {
    #[serde(rename = "UBI")]
    pub ubi: f64,
}

/// Converts a reform's net revenue into a per-capita yearly payment, floored
/// at zero: a revenue-negative reform funds no universal payment.
pub fn ubi(ctx: &AppContext, params: &ParamMap) -> Result<UbiResponse, PolicyError> {
    let reform = create_reform(params)?;
    let reformed = Microsimulation::new(
        &ctx.tree,
        &[ctx.default_reform.clone(), reform],
        &ctx.dataset,
        ctx.today,
    )?;

    let revenue = ctx.baseline.calc(Variable::NetIncome).sum()
        - reformed.calc(Variable::NetIncome).sum();
    let people = ctx.baseline.calc(Variable::People).sum();
    let amount = if people > 0.0 {
        (revenue / people).max(0.0)
    } else {
        0.0
    };
    Ok(UbiResponse { ubi: amount })
}

#[derive(Debug, Serialize)]
pub struct ParameterRecord {
    pub title: String,
    pub description: String,
    pub default: f64,
    pub value: f64,
    pub summary: String,
    #[serde(rename = "type")]
    pub kind: ParameterKind,
}

#[derive(Debug, Serialize)]
pub struct ParametersResponse {
    pub parameters: Vec<ParameterRecord>,
}

fn parameter_record(param: &Parameter, today: NaiveDate) -> Option<ParameterRecord> {
    let meta = param.meta()?;
    let value = param.value_at(today);
    Some(ParameterRecord {
        title: meta.title.to_string(),
        description: meta.description.to_string(),
        default: value,
        value,
        summary: meta.summary.to_string(),
        kind: meta.kind,
    })
}

/// Lists every externally visible policy parameter at its current value.
/// Scale parameters expand into their per-bracket rate/amount/threshold
/// members; parameters without metadata are never exposed.
pub fn parameters(ctx: &AppContext, _params: &ParamMap) -> ParametersResponse {
    let mut records = Vec::new();
    for leaf in ctx.tree.descendants() {
        match leaf {
            Leaf::Value(param) => {
                records.extend(parameter_record(param, ctx.today));
            }
            Leaf::Scale(scale) => {
                for bracket in scale.brackets() {
                    for member in bracket.members() {
                        records.extend(parameter_record(member, ctx.today));
                    }
                }
            }
        }
    }
    ParametersResponse {
        parameters: records,
    }
}

pub async fn run_http_server(port: u16, households: usize, seed: u64) -> std::io::Result<()> {
    let today = chrono::Local::now().date_naive();
    let ctx = AppContext::new(households, seed, today).map_err(std::io::Error::other)?;
    let ctx = Arc::new(ctx);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route(
            "/api/population-reform",
            get(population_reform_get).post(population_reform_post),
        )
        .route(
            "/api/household-reform",
            get(household_reform_get).post(household_reform_post),
        )
        .route("/api/ubi", get(ubi_get).post(ubi_post))
        .route("/api/parameters", get(parameters_get).post(parameters_post))
        .fallback(not_found_handler)
        .with_state(ctx);

    let listener = TcpListener::bind(addr).await?;
    println!("policysim API listening on http://{addr}");
    println!("Local access: http://127.0.0.1:{port}/api/parameters");

    axum::serve(listener, app).await
}

type Ctx = State<Arc<AppContext>>;
type QueryParams = Query<HashMap<String, String>>;
type JsonParams = Json<HashMap<String, serde_json::Value>>;

async fn population_reform_get(State(ctx): Ctx, Query(query): QueryParams) -> Response {
    match params_from_query(&query) {
        Ok(params) => respond(population_reform(&ctx, &params)),
        Err(msg) => error_response(StatusCode::BAD_REQUEST, &msg),
    }
}

async fn population_reform_post(State(ctx): Ctx, Json(body): JsonParams) -> Response {
    match params_from_json(&body) {
        Ok(params) => respond(population_reform(&ctx, &params)),
        Err(msg) => error_response(StatusCode::BAD_REQUEST, &msg),
    }
}

async fn household_reform_get(State(ctx): Ctx, Query(query): QueryParams) -> Response {
    match params_from_query(&query) {
        Ok(params) => respond(household_reform(&ctx, &params)),
        Err(msg) => error_response(StatusCode::BAD_REQUEST, &msg),
    }
}

async fn household_reform_post(State(ctx): Ctx, Json(body): JsonParams) -> Response {
    match params_from_json(&body) {
        Ok(params) => respond(household_reform(&ctx, &params)),
        Err(msg) => error_response(StatusCode::BAD_REQUEST, &msg),
    }
}

async fn ubi_get(State(ctx): Ctx, Query(query): QueryParams) -> Response {
    match params_from_query(&query) {
        Ok(params) => respond(ubi(&ctx, &params)),
        Err(msg) => error_response(StatusCode::BAD_REQUEST, &msg),
    }
}

async fn ubi_post(State(ctx): Ctx, Json(body): JsonParams) -> Response {
    match params_from_json(&body) {
        Ok(params) => respond(ubi(&ctx, &params)),
        Err(msg) => error_response(StatusCode::BAD_REQUEST, &msg),
    }
}

async fn parameters_get(State(ctx): Ctx) -> Response {
    json_response(StatusCode::OK, parameters(&ctx, &ParamMap::new()))
}

async fn parameters_post(State(ctx): Ctx) -> Response {
    json_response(StatusCode::OK, parameters(&ctx, &ParamMap::new()))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

fn params_from_query(query: &HashMap<String, String>) -> Result<ParamMap, String> {
    let mut params = ParamMap::new();
    for (key, raw) in query {
        let value: f64 = raw
            .parse()
            .map_err(|_| format!("parameter {key} must be numeric, got {raw:?}"))?;
        params.insert(key.clone(), value);
    }
    Ok(params)
}

fn params_from_json(body: &HashMap<String, serde_json::Value>) -> Result<ParamMap, String> {
    let mut params = ParamMap::new();
    for (key, value) in body {
        let number = match value {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.parse().ok(),
            serde_json::Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        };
        let number =
            number.ok_or_else(|| format!("parameter {key} must be a simple numeric value"))?;
        params.insert(key.clone(), number);
    }
    Ok(params)
}

fn respond<T: Serialize>(result: Result<T, PolicyError>) -> Response {
    match result {
        Ok(body) => json_response(StatusCode::OK, body),
        Err(err) if err.is_bad_request() => {
            error_response(StatusCode::BAD_REQUEST, &err.to_string())
        }
        Err(err) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string()),
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}
