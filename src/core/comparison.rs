use super::engine::{BALANCE_EPSILON, monthly_rate_from_effective, run_schedule};
use super::error::EngineResult;
use super::types::{
    BuyScenario, ComparisonResult, Decision, InvestScenario, MonthlyInstallment, Scenario,
    SimulationParameters,
};

/// Runs the buy schedule and weighs it against renting and investing the
/// same monthly cash.
pub fn compare(params: &SimulationParameters) -> EngineResult<ComparisonResult> {
    params.validate()?;
    let installments = run_schedule(params).installments;
    Ok(compare_against_rent(params, installments))
}

/// Same as [`compare`] for a schedule the caller already generated.
pub fn compare_schedule(
    params: &SimulationParameters,
    installments: Vec<MonthlyInstallment>,
) -> EngineResult<ComparisonResult> {
    params.validate()?;
    Ok(compare_against_rent(params, installments))
}

fn compare_against_rent(
    params: &SimulationParameters,
    installments: Vec<MonthlyInstallment>,
) -> ComparisonResult {
    let horizon = params.term_months;
    let invest = simulate_rent_and_invest(params, &installments);
    let buy = project_buy_scenario(params, installments);

    let winner = if buy.final_net_equity > invest.final_invested {
        Scenario::Buy
    } else {
        Scenario::RentInvest
    };
    let difference = (buy.final_net_equity - invest.final_invested).abs();
    log::info!(
        "rent vs buy over {horizon} months: {winner:?} by {difference:.2} (equity {:.2}, invested {:.2})",
        buy.final_net_equity,
        invest.final_invested
    );

    ComparisonResult {
        horizon_months: horizon,
        buy,
        invest,
        decision: Decision {
            winner,
            difference,
            break_even_month: None,
        },
    }
}

fn simulate_rent_and_invest(
    params: &SimulationParameters,
    installments: &[MonthlyInstallment],
) -> InvestScenario {
    let investment_rate = monthly_rate_from_effective(params.annual_investment_rate);
    let inflation = monthly_rate_from_effective(params.annual_inflation_rate);

    let mut pot = params.down_payment;
    let mut rent = params.monthly_rent;
    let mut total_rent_paid = 0.0;

    for month in 1..=params.term_months {
        pot *= 1.0 + investment_rate;
        let budget = installments
            .get(month as usize - 1)
            .map(|row| row.total_cash_flow)
            .unwrap_or(0.0);
        // Negative when rent exceeds the budget: capital is drawn down.
        pot += budget - rent;
        total_rent_paid += rent;
        rent *= 1.0 + inflation;
    }

    InvestScenario {
        total_rent_paid,
        final_invested: pot,
    }
}

fn project_buy_scenario(
    params: &SimulationParameters,
    installments: Vec<MonthlyInstallment>,
) -> BuyScenario {
    let appreciation = 1.0 + monthly_rate_from_effective(params.annual_appreciation_rate);
    let horizon = params.term_months;

    let (last_value, residual, elapsed) = match installments.last() {
        Some(row) => {
            let residual = if row.final_balance > BALANCE_EPSILON {
                row.final_balance
            } else {
                0.0
            };
            (row.property_value, residual, row.month)
        }
        None => (params.property_value, params.principal(), 0),
    };
    let remaining = horizon.saturating_sub(elapsed);
    let final_property_value = last_value * appreciation.powi(remaining as i32);

    BuyScenario {
        total_paid: params.down_payment
            + installments
                .iter()
                .map(|row| row.total_cash_flow)
                .sum::<f64>(),
        final_property_value,
        final_net_equity: final_property_value - residual,
        installments,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::engine::tests::{assert_approx_tol, sample_params};
    use crate::core::{EngineError, generate_schedule};

    fn investing_favoured() -> SimulationParameters {
        SimulationParameters {
            annual_interest_rate: 12.0,
            annual_appreciation_rate: 0.0,
            annual_inflation_rate: 0.0,
            annual_investment_rate: 15.0,
            monthly_rent: 1_500.0,
            ..sample_params()
        }
    }

    fn buying_favoured() -> SimulationParameters {
        SimulationParameters {
            annual_interest_rate: 2.0,
            annual_appreciation_rate: 10.0,
            annual_inflation_rate: 0.0,
            annual_investment_rate: 0.0,
            monthly_rent: 3_000.0,
            ..sample_params()
        }
    }

    #[test]
    fn high_investment_return_selects_rent_and_invest() {
        let result = compare(&investing_favoured()).expect("valid params");
        assert_eq!(result.decision.winner, Scenario::RentInvest);
        assert!(result.invest.final_invested > result.buy.final_net_equity);
        assert_approx_tol(
            result.decision.difference,
            result.invest.final_invested - result.buy.final_net_equity,
            1e-6,
        );
    }

    #[test]
    fn strong_appreciation_selects_buy() {
        let result = compare(&buying_favoured()).expect("valid params");
        assert_eq!(result.decision.winner, Scenario::Buy);
        assert!(result.buy.final_net_equity > result.invest.final_invested);
        assert!(result.decision.difference > 0.0);
    }

    #[test]
    fn break_even_month_is_never_reported() {
        assert_eq!(
            compare(&investing_favoured())
                .expect("valid params")
                .decision
                .break_even_month,
            None
        );
        assert_eq!(
            compare(&buying_favoured())
                .expect("valid params")
                .decision
                .break_even_month,
            None
        );
    }

    #[test]
    fn zero_growth_pot_tracks_budget_minus_rent() {
        let params = SimulationParameters {
            term_months: 24,
            annual_interest_rate: 0.0,
            annual_appreciation_rate: 0.0,
            annual_inflation_rate: 0.0,
            annual_investment_rate: 0.0,
            monthly_rent: 1_000.0,
            ..sample_params()
        };

        let result = compare(&params).expect("valid params");
        let budget: f64 = result.buy.installments.iter().map(|r| r.total_cash_flow).sum();
        assert_approx_tol(result.invest.total_rent_paid, 24_000.0, 1e-9);
        assert_approx_tol(
            result.invest.final_invested,
            params.down_payment + budget - 24_000.0,
            1e-6,
        );
        assert_approx_tol(result.buy.total_paid, params.down_payment + budget, 1e-6);
    }

    #[test]
    fn rent_inflates_monthly() {
        let params = SimulationParameters {
            term_months: 12,
            annual_inflation_rate: 12.0,
            monthly_rent: 1_000.0,
            ..sample_params()
        };
        let result = compare(&params).expect("valid params");
        let monthly = monthly_rate_from_effective(12.0);
        let expected: f64 = (0..12).map(|m| 1_000.0 * (1.0 + monthly).powi(m)).sum();
        assert_approx_tol(result.invest.total_rent_paid, expected, 1e-6);
    }

    #[test]
    fn early_payoff_projects_property_value_to_horizon() {
        let mut params = sample_params();
        params.one_time_extras.insert(12, 1_000_000.0);

        let result = compare(&params).expect("valid params");
        assert_eq!(result.buy.installments.len(), 12);
        assert_eq!(result.horizon_months, 360);
        let expected = params.property_value * 1.04_f64.powi(30);
        assert_approx_tol(result.buy.final_property_value, expected, 1e-3);
        assert_approx_tol(result.buy.final_net_equity, expected, 1e-3);
    }

    #[test]
    fn retired_mortgage_months_draw_down_the_pot() {
        let mut params = sample_params();
        params.annual_investment_rate = 0.0;
        params.annual_inflation_rate = 0.0;
        params.monthly_rent = 1_000.0;
        params.one_time_extras.insert(1, 1_000_000.0);

        let result = compare(&params).expect("valid params");
        assert_eq!(result.buy.installments.len(), 1);
        let first = result.buy.installments[0].total_cash_flow;
        assert_approx_tol(
            result.invest.final_invested,
            params.down_payment + first - 360.0 * 1_000.0,
            1e-6,
        );
    }

    #[test]
    fn compare_schedule_matches_compare() {
        let params = sample_params();
        let rows = generate_schedule(&params).expect("valid params");
        let direct = compare(&params).expect("valid params");
        let from_rows = compare_schedule(&params, rows).expect("valid params");
        assert_eq!(direct.decision.winner, from_rows.decision.winner);
        assert_approx_tol(
            direct.invest.final_invested,
            from_rows.invest.final_invested,
            1e-9,
        );
    }

    #[test]
    fn compare_rejects_invalid_parameters() {
        let mut params = sample_params();
        params.property_value = -1.0;
        assert!(matches!(
            compare(&params),
            Err(EngineError::NonPositivePropertyValue(_))
        ));
    }
}
