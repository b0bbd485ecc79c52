use super::error::EngineResult;
use super::types::{
    AmortizationSystem, FGTS_APPLICATION_INTERVAL, FgtsConfig, MonthlyInstallment,
    PayoffStrategy, SimulationParameters, SimulationReport, SimulationSummary,
};

/// Remaining balance at or below which the loan counts as paid off.
pub(crate) const BALANCE_EPSILON: f64 = 0.01;

#[derive(Debug)]
pub(crate) struct ScheduleRun {
    pub(crate) installments: Vec<MonthlyInstallment>,
    pub(crate) fgts_balance: f64,
}

#[derive(Debug)]
struct FgtsWallet {
    balance: f64,
    monthly_accrual: f64,
    auto_apply: bool,
}

impl FgtsWallet {
    fn new(config: Option<FgtsConfig>) -> Self {
        match config {
            Some(cfg) => Self {
                balance: cfg.initial_balance.max(0.0),
                monthly_accrual: cfg.monthly_accrual.max(0.0),
                auto_apply: cfg.auto_apply,
            },
            None => Self {
                balance: 0.0,
                monthly_accrual: 0.0,
                auto_apply: false,
            },
        }
    }

    /// Accrues one month and returns the amount withdrawn towards principal,
    /// never more than `room`.
    fn step(&mut self, month: u32, room: f64) -> f64 {
        self.balance += self.monthly_accrual;
        if !self.auto_apply || month % FGTS_APPLICATION_INTERVAL != 0 {
            return 0.0;
        }
        let applied = self.balance.min(room.max(0.0));
        self.balance -= applied;
        applied
    }
}

/// Monthly rate of a nominal annual percentage compounded monthly.
pub fn monthly_rate_from_nominal(annual_pct: f64) -> f64 {
    annual_pct / 100.0 / 12.0
}

/// Monthly rate equivalent to an effective annual percentage.
pub fn monthly_rate_from_effective(annual_pct: f64) -> f64 {
    (1.0 + annual_pct / 100.0).powf(1.0 / 12.0) - 1.0
}

/// Level payment that retires `principal` over `months` at `monthly_rate`.
pub fn annuity_payment(principal: f64, monthly_rate: f64, months: u32) -> f64 {
    if months == 0 {
        return principal;
    }
    if monthly_rate.abs() <= 1e-12 {
        return principal / months as f64;
    }
    // Negative exponent keeps long horizons finite: the discount factor decays to 0.
    let discount = (1.0 + monthly_rate).powf(-(months as f64));
    principal * monthly_rate / (1.0 - discount)
}

/// Produces the month-by-month schedule for one loan configuration.
pub fn generate_schedule(params: &SimulationParameters) -> EngineResult<Vec<MonthlyInstallment>> {
    params.validate()?;
    Ok(run_schedule(params).installments)
}

/// Schedule plus aggregate totals measured against a no-extras baseline.
pub fn simulate(params: &SimulationParameters) -> EngineResult<SimulationReport> {
    params.validate()?;
    let run = run_schedule(params);
    let baseline = run_schedule(&params.without_extras());
    let summary = summarize(params, &run, &baseline.installments);
    log::debug!(
        "simulated {} of {} months, interest saved {:.2}",
        summary.months,
        params.term_months,
        summary.interest_saved
    );
    Ok(SimulationReport {
        summary,
        installments: run.installments,
    })
}

/// Interest charged by the same loan with every extra-payment channel off.
pub fn baseline_interest(params: &SimulationParameters) -> EngineResult<f64> {
    params.validate()?;
    Ok(total_interest(
        &run_schedule(&params.without_extras()).installments,
    ))
}

fn total_interest(installments: &[MonthlyInstallment]) -> f64 {
    installments.iter().map(|row| row.interest).sum()
}

fn summarize(
    params: &SimulationParameters,
    run: &ScheduleRun,
    baseline: &[MonthlyInstallment],
) -> SimulationSummary {
    let rows = &run.installments;
    let months = rows.len() as u32;
    let interest = total_interest(rows);
    let baseline_interest = total_interest(baseline);
    let (final_property_value, final_net_equity) = rows
        .last()
        .map(|row| (row.property_value, row.net_equity))
        .unwrap_or((params.property_value, params.down_payment));

    SimulationSummary {
        months,
        total_paid: rows.iter().map(|row| row.total_cash_flow).sum(),
        total_interest: interest,
        total_insurance: rows
            .iter()
            .map(|row| row.balance_insurance + row.property_insurance)
            .sum(),
        total_admin_fees: rows.iter().map(|row| row.admin_fee).sum(),
        total_extra_amortization: rows.iter().map(|row| row.extra_amortization).sum(),
        baseline_interest,
        baseline_months: baseline.len() as u32,
        interest_saved: baseline_interest - interest,
        months_reduced: params.term_months.saturating_sub(months),
        final_property_value,
        final_net_equity,
        final_fgts_balance: run.fgts_balance,
    }
}

/// Core recurrence. Assumes `params` already passed validation.
pub(crate) fn run_schedule(params: &SimulationParameters) -> ScheduleRun {
    let principal = params.principal();
    let term = params.term_months;
    let rate = monthly_rate_from_nominal(params.annual_interest_rate);
    let appreciation = monthly_rate_from_effective(params.annual_appreciation_rate);
    let fixed_payment = annuity_payment(principal, rate, term);
    let fixed_amortization = principal / term as f64;
    let balance_insurance_rate = params.balance_insurance_rate / 100.0;
    // Original value, not the appreciated one.
    let property_insurance = params.property_value * params.property_insurance_rate / 100.0;

    let mut wallet = FgtsWallet::new(params.fgts);
    let mut balance = principal;
    let mut property_value = params.property_value;
    let mut installments = Vec::with_capacity(term as usize);

    for month in 1..=term {
        let initial_balance = balance;
        let interest = initial_balance * rate;
        let amortization = match params.system {
            AmortizationSystem::EqualAmortization => fixed_amortization.min(initial_balance),
            AmortizationSystem::EqualInstallment => {
                let payment = match params.strategy {
                    PayoffStrategy::ReduceTerm => fixed_payment,
                    PayoffStrategy::ReduceInstallment => {
                        annuity_payment(initial_balance, rate, term - month + 1)
                    }
                };
                (payment - interest).max(0.0).min(initial_balance)
            }
        };

        let balance_insurance = initial_balance * balance_insurance_rate;
        let admin_fee = params.monthly_admin_fee;
        let total_payment =
            amortization + interest + balance_insurance + property_insurance + admin_fee;

        let room = (initial_balance - amortization).max(0.0);
        let scheduled_extra = params.monthly_extra.max(0.0)
            + params
                .one_time_extras
                .get(&month)
                .copied()
                .unwrap_or(0.0)
                .max(0.0);
        let out_of_pocket = scheduled_extra.min(room);
        let fgts_applied = wallet.step(month, room - out_of_pocket);
        let extra_amortization = out_of_pocket + fgts_applied;

        let final_balance = (initial_balance - amortization - extra_amortization).max(0.0);
        property_value *= 1.0 + appreciation;

        installments.push(MonthlyInstallment {
            month,
            year: params.start_year + ((month - 1) / 12) as i32,
            initial_balance,
            interest,
            amortization,
            extra_amortization,
            fgts_applied,
            balance_insurance,
            property_insurance,
            admin_fee,
            total_payment,
            total_cash_flow: total_payment + extra_amortization,
            final_balance,
            property_value,
            net_equity: property_value - final_balance,
        });

        balance = final_balance;
        if balance <= BALANCE_EPSILON {
            break;
        }
    }

    ScheduleRun {
        installments,
        fgts_balance: wallet.balance,
    }
}
