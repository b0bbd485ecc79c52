use std::collections::BTreeMap;

use serde::Serialize;

/// Share of gross income deposited into the FGTS wallet every month.
pub const FGTS_CONTRIBUTION_RATE: f64 = 0.08;

/// Months between automatic FGTS withdrawals.
pub const FGTS_APPLICATION_INTERVAL: u32 = 24;

/// Longest loan term accepted, in months (100 years).
pub const MAX_TERM_MONTHS: u32 = 1_200;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AmortizationSystem {
    /// Constant principal portion, declining payment (SAC).
    EqualAmortization,
    /// Constant total payment, shifting interest/principal split (Price).
    EqualInstallment,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PayoffStrategy {
    ReduceTerm,
    ReduceInstallment,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    Buy,
    RentInvest,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FgtsConfig {
    pub initial_balance: f64,
    pub monthly_accrual: f64,
    pub auto_apply: bool,
}

impl FgtsConfig {
    pub fn from_gross_income(initial_balance: f64, gross_income: f64, auto_apply: bool) -> Self {
        Self {
            initial_balance,
            monthly_accrual: gross_income * FGTS_CONTRIBUTION_RATE,
            auto_apply,
        }
    }
}

/// Complete, immutable input for one run. Interest and growth rates are
/// annual percentages; fee rates are monthly percentages.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationParameters {
    pub property_value: f64,
    pub down_payment: f64,
    pub term_months: u32,
    pub annual_interest_rate: f64,
    pub system: AmortizationSystem,
    pub annual_appreciation_rate: f64,
    pub annual_inflation_rate: f64,
    pub annual_investment_rate: f64,
    pub monthly_rent: f64,
    pub monthly_extra: f64,
    pub one_time_extras: BTreeMap<u32, f64>,
    pub strategy: PayoffStrategy,
    pub balance_insurance_rate: f64,
    pub property_insurance_rate: f64,
    pub monthly_admin_fee: f64,
    pub start_year: i32,
    pub fgts: Option<FgtsConfig>,
}

impl SimulationParameters {
    pub fn principal(&self) -> f64 {
        self.property_value - self.down_payment
    }

    /// Same loan with every extra-payment channel switched off.
    pub fn without_extras(&self) -> Self {
        Self {
            monthly_extra: 0.0,
            one_time_extras: BTreeMap::new(),
            fgts: None,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyInstallment {
    pub month: u32,
    pub year: i32,
    pub initial_balance: f64,
    pub interest: f64,
    pub amortization: f64,
    pub extra_amortization: f64,
    pub fgts_applied: f64,
    pub balance_insurance: f64,
    pub property_insurance: f64,
    pub admin_fee: f64,
    pub total_payment: f64,
    pub total_cash_flow: f64,
    pub final_balance: f64,
    pub property_value: f64,
    pub net_equity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationSummary {
    pub months: u32,
    pub total_paid: f64,
    pub total_interest: f64,
    pub total_insurance: f64,
    pub total_admin_fees: f64,
    pub total_extra_amortization: f64,
    pub baseline_interest: f64,
    pub baseline_months: u32,
    pub interest_saved: f64,
    pub months_reduced: u32,
    pub final_property_value: f64,
    pub final_net_equity: f64,
    pub final_fgts_balance: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationReport {
    pub summary: SimulationSummary,
    pub installments: Vec<MonthlyInstallment>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyScenario {
    pub total_paid: f64,
    pub final_property_value: f64,
    pub final_net_equity: f64,
    pub installments: Vec<MonthlyInstallment>,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestScenario {
    pub total_rent_paid: f64,
    pub final_invested: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub winner: Scenario,
    pub difference: f64,
    /// Never computed; always `None`.
    pub break_even_month: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResult {
    pub horizon_months: u32,
    pub buy: BuyScenario,
    pub invest: InvestScenario,
    pub decision: Decision,
}
