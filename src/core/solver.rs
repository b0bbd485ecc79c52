use serde::Serialize;

use super::engine::run_schedule;
use super::error::{EngineError, EngineResult};
use super::types::SimulationParameters;

/// Fixed bisection depth; no early exit on convergence.
pub const SOLVER_ITERATIONS: u32 = 20;

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveIteration {
    pub iteration: u32,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub candidate_extra: f64,
    pub months: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetTermSolution {
    pub target_months: u32,
    pub monthly_extra: f64,
    pub lower_bound: f64,
    pub achieved_months: u32,
    pub iterations: Vec<SolveIteration>,
}

/// Smallest recurring monthly extra (to within the bisection resolution)
/// that pays the loan off in `target_months` or fewer. One-time extras and
/// the FGTS wallet stay as configured.
pub fn solve_target_term(
    params: &SimulationParameters,
    target_months: u32,
) -> EngineResult<TargetTermSolution> {
    params.validate()?;
    if target_months == 0 || target_months >= params.term_months {
        return Err(EngineError::TargetOutOfRange {
            target: target_months,
            term_months: params.term_months,
        });
    }

    let mut lo = 0.0;
    let mut hi = params.principal();
    let mut iterations = Vec::with_capacity(SOLVER_ITERATIONS as usize);

    for iteration in 1..=SOLVER_ITERATIONS {
        let mid = (lo + hi) * 0.5;
        let months = schedule_length(params, mid);
        iterations.push(SolveIteration {
            iteration,
            lower_bound: lo,
            upper_bound: hi,
            candidate_extra: mid,
            months,
        });
        log::debug!("solver iteration {iteration}: extra {mid:.2} -> {months} months");

        if months > target_months {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    Ok(TargetTermSolution {
        target_months,
        monthly_extra: hi,
        lower_bound: lo,
        achieved_months: schedule_length(params, hi),
        iterations,
    })
}

fn schedule_length(base: &SimulationParameters, monthly_extra: f64) -> u32 {
    let params = SimulationParameters {
        monthly_extra,
        ..base.clone()
    };
    run_schedule(&params).installments.len() as u32
}
