use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::{Parser, ValueEnum, error::ErrorKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::core::{
    AmortizationSystem, ComparisonResult, Decision, FgtsConfig, InvestScenario, MAX_TERM_MONTHS,
    MonthlyInstallment, PayoffStrategy, SimulationParameters, SimulationReport,
    SimulationSummary, TargetTermSolution, compare, simulate, solve_target_term,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliAmortizationSystem {
    #[value(alias = "sac")]
    EqualAmortization,
    #[value(alias = "price")]
    EqualInstallment,
}

impl From<CliAmortizationSystem> for AmortizationSystem {
    fn from(value: CliAmortizationSystem) -> Self {
        match value {
            CliAmortizationSystem::EqualAmortization => AmortizationSystem::EqualAmortization,
            CliAmortizationSystem::EqualInstallment => AmortizationSystem::EqualInstallment,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliPayoffStrategy {
    ReduceTerm,
    ReduceInstallment,
}

impl From<CliPayoffStrategy> for PayoffStrategy {
    fn from(value: CliPayoffStrategy) -> Self {
        match value {
            CliPayoffStrategy::ReduceTerm => PayoffStrategy::ReduceTerm,
            CliPayoffStrategy::ReduceInstallment => PayoffStrategy::ReduceInstallment,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiAmortizationSystem {
    #[serde(alias = "equalAmortization", alias = "equal_amortization", alias = "sac")]
    EqualAmortization,
    #[serde(alias = "equalInstallment", alias = "equal_installment", alias = "price")]
    EqualInstallment,
}

impl From<ApiAmortizationSystem> for CliAmortizationSystem {
    fn from(value: ApiAmortizationSystem) -> Self {
        match value {
            ApiAmortizationSystem::EqualAmortization => CliAmortizationSystem::EqualAmortization,
            ApiAmortizationSystem::EqualInstallment => CliAmortizationSystem::EqualInstallment,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiPayoffStrategy {
    #[serde(alias = "reduceTerm", alias = "reduce_term", alias = "term")]
    ReduceTerm,
    #[serde(
        alias = "reduceInstallment",
        alias = "reduce_installment",
        alias = "installment"
    )]
    ReduceInstallment,
}

impl From<ApiPayoffStrategy> for CliPayoffStrategy {
    fn from(value: ApiPayoffStrategy) -> Self {
        match value {
            ApiPayoffStrategy::ReduceTerm => CliPayoffStrategy::ReduceTerm,
            ApiPayoffStrategy::ReduceInstallment => CliPayoffStrategy::ReduceInstallment,
        }
    }
}

/// `{"12": 5000}` in JSON bodies, or `12:5000,24:1000` where only flat
/// strings are available (query strings).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ApiOneTimeExtras {
    Map(BTreeMap<String, f64>),
    List(String),
}

impl ApiOneTimeExtras {
    fn into_pairs(self) -> Result<Vec<(u32, f64)>, String> {
        match self {
            ApiOneTimeExtras::Map(map) => map
                .into_iter()
                .map(|(month, amount)| {
                    month
                        .trim()
                        .parse::<u32>()
                        .map(|month| (month, amount))
                        .map_err(|e| format!("invalid oneTimeExtras month '{month}': {e}"))
                })
                .collect(),
            ApiOneTimeExtras::List(list) => list
                .split(',')
                .filter(|entry| !entry.trim().is_empty())
                .map(parse_one_time_extra)
                .collect(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SimulatePayload {
    property_value: Option<f64>,
    down_payment: Option<f64>,
    term_months: Option<u32>,
    interest_rate: Option<f64>,
    system: Option<ApiAmortizationSystem>,
    strategy: Option<ApiPayoffStrategy>,

    appreciation_rate: Option<f64>,
    inflation_rate: Option<f64>,
    investment_rate: Option<f64>,
    monthly_rent: Option<f64>,

    monthly_extra: Option<f64>,
    one_time_extras: Option<ApiOneTimeExtras>,

    balance_insurance_rate: Option<f64>,
    property_insurance_rate: Option<f64>,
    admin_fee: Option<f64>,
    start_year: Option<i32>,

    fgts_balance: Option<f64>,
    fgts_gross_income: Option<f64>,
    fgts_auto_apply: Option<bool>,

    target_months: Option<u32>,
}

#[derive(Parser, Debug)]
#[command(
    name = "homeloan",
    about = "Mortgage amortization simulator (SAC / Price, extra payments, rent-vs-buy, target-term solver)"
)]
pub struct Cli {
    #[arg(long, default_value_t = 500_000.0)]
    property_value: f64,
    #[arg(long, default_value_t = 100_000.0)]
    down_payment: f64,
    #[arg(long, default_value_t = 360, help = "Original loan term in months")]
    term_months: u32,
    #[arg(
        long,
        default_value_t = 9.0,
        help = "Nominal annual interest rate in percent, e.g. 9.5"
    )]
    annual_interest_rate: f64,
    #[arg(long, value_enum, default_value_t = CliAmortizationSystem::EqualInstallment)]
    system: CliAmortizationSystem,
    #[arg(
        long,
        value_enum,
        default_value_t = CliPayoffStrategy::ReduceTerm,
        help = "What extra payments reduce: the remaining term or the installment"
    )]
    strategy: CliPayoffStrategy,
    #[arg(
        long,
        default_value_t = 4.0,
        help = "Annual property appreciation in percent"
    )]
    appreciation_rate: f64,
    #[arg(
        long,
        default_value_t = 4.5,
        help = "Annual inflation in percent, applied to rent"
    )]
    inflation_rate: f64,
    #[arg(
        long,
        default_value_t = 10.0,
        help = "Annual return of the rent-and-invest portfolio in percent"
    )]
    investment_rate: f64,
    #[arg(long, default_value_t = 2_000.0, help = "Monthly rent at month 1")]
    monthly_rent: f64,
    #[arg(long, default_value_t = 0.0, help = "Recurring extra principal per month")]
    monthly_extra: f64,
    #[arg(
        long = "one-time-extra",
        value_name = "MONTH:AMOUNT",
        value_parser = parse_one_time_extra,
        help = "One-time extra principal payment, repeatable"
    )]
    one_time_extras: Vec<(u32, f64)>,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Monthly insurance in percent of the outstanding balance"
    )]
    balance_insurance_rate: f64,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Monthly insurance in percent of the original property value"
    )]
    property_insurance_rate: f64,
    #[arg(long, default_value_t = 0.0, help = "Fixed monthly administrative fee")]
    admin_fee: f64,
    #[arg(long, default_value_t = 2025, help = "Calendar year of month 1")]
    start_year: i32,
    #[arg(long, help = "FGTS wallet balance at month 1")]
    fgts_balance: Option<f64>,
    #[arg(long, help = "Gross monthly income; 8% accrues into the FGTS wallet")]
    fgts_gross_income: Option<f64>,
    #[arg(
        long,
        default_value_t = false,
        help = "Apply the whole FGTS wallet to principal every 24 months"
    )]
    fgts_auto_apply: bool,
    #[arg(
        long,
        help = "Solve for the monthly extra that pays the loan off in this many months"
    )]
    target_months: Option<u32>,
    #[arg(long, default_value_t = false, help = "Include the monthly schedule in output")]
    schedule: bool,
}

fn parse_one_time_extra(raw: &str) -> Result<(u32, f64), String> {
    let (month, amount) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected MONTH:AMOUNT, got '{raw}'"))?;
    let month = month
        .trim()
        .parse::<u32>()
        .map_err(|e| format!("invalid month '{month}': {e}"))?;
    let amount = amount
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid amount '{amount}': {e}"))?;
    Ok((month, amount))
}

#[derive(Debug)]
struct ApiRequest {
    params: SimulationParameters,
    target_months: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SolveResponse {
    solution: TargetTermSolution,
    summary: SimulationSummary,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CliReport {
    summary: SimulationSummary,
    buy_final_net_equity: f64,
    invest: InvestScenario,
    decision: Decision,
    #[serde(skip_serializing_if = "Option::is_none")]
    solution: Option<TargetTermSolution>,
    #[serde(skip_serializing_if = "Option::is_none")]
    installments: Option<Vec<MonthlyInstallment>>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn build_params(cli: Cli) -> Result<SimulationParameters, String> {
    if cli.term_months == 0 {
        return Err("--term-months must be > 0".to_string());
    }
    if cli.term_months > MAX_TERM_MONTHS {
        return Err(format!("--term-months must be <= {MAX_TERM_MONTHS}"));
    }

    if !cli.property_value.is_finite() || cli.property_value <= 0.0 {
        return Err("--property-value must be > 0".to_string());
    }

    if !cli.down_payment.is_finite() || cli.down_payment < 0.0 {
        return Err("--down-payment must be >= 0".to_string());
    }

    if cli.down_payment >= cli.property_value {
        return Err("--down-payment must be < --property-value".to_string());
    }

    if !(0.0..=100.0).contains(&cli.annual_interest_rate) {
        return Err("--annual-interest-rate must be between 0 and 100".to_string());
    }

    for (name, rate) in [
        ("--appreciation-rate", cli.appreciation_rate),
        ("--inflation-rate", cli.inflation_rate),
        ("--investment-rate", cli.investment_rate),
    ] {
        if !rate.is_finite() || rate <= -100.0 {
            return Err(format!("{name} must be > -100"));
        }
    }

    for (name, value) in [
        ("--monthly-rent", cli.monthly_rent),
        ("--monthly-extra", cli.monthly_extra),
        ("--balance-insurance-rate", cli.balance_insurance_rate),
        ("--property-insurance-rate", cli.property_insurance_rate),
        ("--admin-fee", cli.admin_fee),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(format!("{name} must be >= 0"));
        }
    }

    let mut one_time_extras = BTreeMap::new();
    for (month, amount) in cli.one_time_extras {
        if month == 0 || month > cli.term_months {
            return Err(format!(
                "--one-time-extra month must be between 1 and {}",
                cli.term_months
            ));
        }
        if !amount.is_finite() || amount < 0.0 {
            return Err("--one-time-extra amount must be >= 0".to_string());
        }
        *one_time_extras.entry(month).or_insert(0.0) += amount;
    }

    let fgts = match (cli.fgts_balance, cli.fgts_gross_income) {
        (None, None) if !cli.fgts_auto_apply => None,
        (balance, income) => Some(FgtsConfig::from_gross_income(
            balance.unwrap_or(0.0),
            income.unwrap_or(0.0),
            cli.fgts_auto_apply,
        )),
    };

    let params = SimulationParameters {
        property_value: cli.property_value,
        down_payment: cli.down_payment,
        term_months: cli.term_months,
        annual_interest_rate: cli.annual_interest_rate,
        system: cli.system.into(),
        annual_appreciation_rate: cli.appreciation_rate,
        annual_inflation_rate: cli.inflation_rate,
        annual_investment_rate: cli.investment_rate,
        monthly_rent: cli.monthly_rent,
        monthly_extra: cli.monthly_extra,
        one_time_extras,
        strategy: cli.strategy.into(),
        balance_insurance_rate: cli.balance_insurance_rate,
        property_insurance_rate: cli.property_insurance_rate,
        monthly_admin_fee: cli.admin_fee,
        start_year: cli.start_year,
        fgts,
    };
    params.validate().map_err(|e| e.to_string())?;
    Ok(params)
}

/// Parses command-line arguments, runs the engine and renders the report as JSON.
pub fn run_cli<I, T>(args: I) -> Result<String, String>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => return Err(e.to_string()),
    };
    let include_schedule = cli.schedule;
    let target_months = cli.target_months;
    let params = build_params(cli)?;
    let report = build_cli_report(&params, target_months, include_schedule)?;
    serde_json::to_string_pretty(&report).map_err(|e| format!("failed to render report: {e}"))
}

fn build_cli_report(
    params: &SimulationParameters,
    target_months: Option<u32>,
    include_schedule: bool,
) -> Result<CliReport, String> {
    let simulation = simulate(params).map_err(|e| e.to_string())?;
    let comparison = compare(params).map_err(|e| e.to_string())?;
    let solution = target_months
        .map(|target| solve_target_term(params, target))
        .transpose()
        .map_err(|e| e.to_string())?;

    Ok(CliReport {
        summary: simulation.summary,
        buy_final_net_equity: comparison.buy.final_net_equity,
        invest: comparison.invest,
        decision: comparison.decision,
        solution,
        installments: include_schedule.then_some(simulation.installments),
    })
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route(
            "/api/simulate",
            get(simulate_get_handler).post(simulate_post_handler),
        )
        .route(
            "/api/compare",
            get(compare_get_handler).post(compare_post_handler),
        )
        .route("/api/solve", get(solve_get_handler).post(solve_post_handler))
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    log::info!("homeloan HTTP API listening on http://{addr}");
    log::info!("Local access: http://127.0.0.1:{port}/api/simulate");

    axum::serve(listener, app).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn simulate_get_handler(Query(payload): Query<SimulatePayload>) -> Response {
    simulate_handler_impl(payload)
}

async fn simulate_post_handler(Json(payload): Json<SimulatePayload>) -> Response {
    simulate_handler_impl(payload)
}

async fn compare_get_handler(Query(payload): Query<SimulatePayload>) -> Response {
    compare_handler_impl(payload)
}

async fn compare_post_handler(Json(payload): Json<SimulatePayload>) -> Response {
    compare_handler_impl(payload)
}

async fn solve_get_handler(Query(payload): Query<SimulatePayload>) -> Response {
    solve_handler_impl(payload)
}

async fn solve_post_handler(Json(payload): Json<SimulatePayload>) -> Response {
    solve_handler_impl(payload)
}

fn simulate_handler_impl(payload: SimulatePayload) -> Response {
    match api_request_from_payload(payload).and_then(|req| run_simulation(&req)) {
        Ok(report) => json_response(StatusCode::OK, report),
        Err(msg) => error_response(StatusCode::BAD_REQUEST, &msg),
    }
}

fn compare_handler_impl(payload: SimulatePayload) -> Response {
    match api_request_from_payload(payload).and_then(|req| run_comparison(&req)) {
        Ok(result) => json_response(StatusCode::OK, result),
        Err(msg) => error_response(StatusCode::BAD_REQUEST, &msg),
    }
}

fn solve_handler_impl(payload: SimulatePayload) -> Response {
    match api_request_from_payload(payload).and_then(|req| run_solver(&req)) {
        Ok(result) => json_response(StatusCode::OK, result),
        Err(msg) => error_response(StatusCode::BAD_REQUEST, &msg),
    }
}

fn run_simulation(request: &ApiRequest) -> Result<SimulationReport, String> {
    simulate(&request.params).map_err(|e| e.to_string())
}

fn run_comparison(request: &ApiRequest) -> Result<ComparisonResult, String> {
    compare(&request.params).map_err(|e| e.to_string())
}

fn run_solver(request: &ApiRequest) -> Result<SolveResponse, String> {
    let target = request
        .target_months
        .ok_or_else(|| "targetMonths is required".to_string())?;
    let solution = solve_target_term(&request.params, target).map_err(|e| e.to_string())?;
    let solved = SimulationParameters {
        monthly_extra: solution.monthly_extra,
        ..request.params.clone()
    };
    let summary = simulate(&solved).map_err(|e| e.to_string())?.summary;
    Ok(SolveResponse { solution, summary })
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

#[cfg(test)]
fn api_request_from_json(json: &str) -> Result<ApiRequest, String> {
    let payload = serde_json::from_str::<SimulatePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_payload(payload)
}

fn api_request_from_payload(payload: SimulatePayload) -> Result<ApiRequest, String> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.property_value {
        cli.property_value = v;
    }
    if let Some(v) = payload.down_payment {
        cli.down_payment = v;
    }
    if let Some(v) = payload.term_months {
        cli.term_months = v;
    }
    if let Some(v) = payload.interest_rate {
        cli.annual_interest_rate = v;
    }
    if let Some(v) = payload.system {
        cli.system = v.into();
    }
    if let Some(v) = payload.strategy {
        cli.strategy = v.into();
    }

    if let Some(v) = payload.appreciation_rate {
        cli.appreciation_rate = v;
    }
    if let Some(v) = payload.inflation_rate {
        cli.inflation_rate = v;
    }
    if let Some(v) = payload.investment_rate {
        cli.investment_rate = v;
    }
    if let Some(v) = payload.monthly_rent {
        cli.monthly_rent = v;
    }

    if let Some(v) = payload.monthly_extra {
        cli.monthly_extra = v;
    }
    if let Some(v) = payload.one_time_extras {
        cli.one_time_extras = v.into_pairs()?;
    }

    if let Some(v) = payload.balance_insurance_rate {
        cli.balance_insurance_rate = v;
    }
    if let Some(v) = payload.property_insurance_rate {
        cli.property_insurance_rate = v;
    }
    if let Some(v) = payload.admin_fee {
        cli.admin_fee = v;
    }
    if let Some(v) = payload.start_year {
        cli.start_year = v;
    }

    if let Some(v) = payload.fgts_balance {
        cli.fgts_balance = Some(v);
    }
    if let Some(v) = payload.fgts_gross_income {
        cli.fgts_gross_income = Some(v);
    }
    if let Some(v) = payload.fgts_auto_apply {
        cli.fgts_auto_apply = v;
    }
    if let Some(v) = payload.target_months {
        cli.target_months = Some(v);
    }

    let target_months = cli.target_months;
    let params = build_params(cli)?;
    if let Some(target) = target_months {
        if target == 0 || target >= params.term_months {
            return Err("targetMonths must be >= 1 and < termMonths".to_string());
        }
    }

    Ok(ApiRequest {
        params,
        target_months,
    })
}

fn default_cli_for_api() -> Cli {
    Cli {
        property_value: 500_000.0,
        down_payment: 100_000.0,
        term_months: 360,
        annual_interest_rate: 9.0,
        system: CliAmortizationSystem::EqualInstallment,
        strategy: CliPayoffStrategy::ReduceTerm,
        appreciation_rate: 4.0,
        inflation_rate: 4.5,
        investment_rate: 10.0,
        monthly_rent: 2_000.0,
        monthly_extra: 0.0,
        one_time_extras: Vec::new(),
        balance_insurance_rate: 0.0,
        property_insurance_rate: 0.0,
        admin_fee: 0.0,
        start_year: 2025,
        fgts_balance: None,
        fgts_gross_income: None,
        fgts_auto_apply: false,
        target_months: None,
        schedule: false,
    }
}
