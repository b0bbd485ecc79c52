mod comparison;
mod engine;
mod error;
mod solver;
mod types;

pub use comparison::{compare, compare_schedule};
pub use engine::{
    annuity_payment, baseline_interest, generate_schedule, monthly_rate_from_effective,
    monthly_rate_from_nominal, simulate,
};
pub use error::{EngineError, EngineResult};
pub use solver::{SOLVER_ITERATIONS, SolveIteration, TargetTermSolution, solve_target_term};
pub use types::{
    AmortizationSystem, BuyScenario, ComparisonResult, Decision, FGTS_APPLICATION_INTERVAL,
    FGTS_CONTRIBUTION_RATE, FgtsConfig, InvestScenario, MAX_TERM_MONTHS, MonthlyInstallment,
    PayoffStrategy, Scenario, SimulationParameters, SimulationReport, SimulationSummary,
};
