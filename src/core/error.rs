use thiserror::Error;

use super::{MAX_TERM_MONTHS, SimulationParameters};

#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    #[error("{field} must be finite")]
    NonFinite { field: &'static str },

    #[error("{field} must be >= 0, got {value}")]
    Negative { field: &'static str, value: f64 },

    #[error("{field} must be > -100, got {value}")]
    RateTooLow { field: &'static str, value: f64 },

    #[error("term_months must be > 0")]
    ZeroTerm,

    #[error("term_months must be <= {max}, got {term_months}")]
    TermTooLong { term_months: u32, max: u32 },

    #[error("property_value must be > 0, got {0}")]
    NonPositivePropertyValue(f64),

    #[error("down_payment ({down_payment}) must be < property_value ({property_value})")]
    DownPaymentTooLarge {
        down_payment: f64,
        property_value: f64,
    },

    #[error("one-time extra payments must be keyed by month >= 1")]
    OneTimeExtraMonthZero,

    #[error("target_months must be >= 1 and < term_months ({term_months}), got {target}")]
    TargetOutOfRange { target: u32, term_months: u32 },
}

pub type EngineResult<T> = Result<T, EngineError>;

impl SimulationParameters {
    /// Rejects parameter sets the engine cannot simulate meaningfully.
    pub fn validate(&self) -> EngineResult<()> {
        for (field, value) in [
            ("property_value", self.property_value),
            ("down_payment", self.down_payment),
            ("annual_interest_rate", self.annual_interest_rate),
            ("annual_appreciation_rate", self.annual_appreciation_rate),
            ("annual_inflation_rate", self.annual_inflation_rate),
            ("annual_investment_rate", self.annual_investment_rate),
            ("monthly_rent", self.monthly_rent),
            ("monthly_extra", self.monthly_extra),
            ("balance_insurance_rate", self.balance_insurance_rate),
            ("property_insurance_rate", self.property_insurance_rate),
            ("monthly_admin_fee", self.monthly_admin_fee),
        ] {
            if !value.is_finite() {
                return Err(EngineError::NonFinite { field });
            }
        }

        if self.term_months == 0 {
            return Err(EngineError::ZeroTerm);
        }
        if self.term_months > MAX_TERM_MONTHS {
            return Err(EngineError::TermTooLong {
                term_months: self.term_months,
                max: MAX_TERM_MONTHS,
            });
        }
        if self.property_value <= 0.0 {
            return Err(EngineError::NonPositivePropertyValue(self.property_value));
        }
        if self.down_payment >= self.property_value {
            return Err(EngineError::DownPaymentTooLarge {
                down_payment: self.down_payment,
                property_value: self.property_value,
            });
        }

        for (field, value) in [
            ("down_payment", self.down_payment),
            ("annual_interest_rate", self.annual_interest_rate),
            ("monthly_rent", self.monthly_rent),
            ("monthly_extra", self.monthly_extra),
            ("balance_insurance_rate", self.balance_insurance_rate),
            ("property_insurance_rate", self.property_insurance_rate),
            ("monthly_admin_fee", self.monthly_admin_fee),
        ] {
            if value < 0.0 {
                return Err(EngineError::Negative { field, value });
            }
        }

        // Growth rates may be negative but not at or below -100%.
        for (field, value) in [
            ("annual_appreciation_rate", self.annual_appreciation_rate),
            ("annual_inflation_rate", self.annual_inflation_rate),
            ("annual_investment_rate", self.annual_investment_rate),
        ] {
            if value <= -100.0 {
                return Err(EngineError::RateTooLow { field, value });
            }
        }

        for (&month, &amount) in &self.one_time_extras {
            if month == 0 {
                return Err(EngineError::OneTimeExtraMonthZero);
            }
            if !amount.is_finite() {
                return Err(EngineError::NonFinite {
                    field: "one_time_extras",
                });
            }
            if amount < 0.0 {
                return Err(EngineError::Negative {
                    field: "one_time_extras",
                    value: amount,
                });
            }
        }

        if let Some(fgts) = &self.fgts {
            for (field, value) in [
                ("fgts.initial_balance", fgts.initial_balance),
                ("fgts.monthly_accrual", fgts.monthly_accrual),
            ] {
                if !value.is_finite() {
                    return Err(EngineError::NonFinite { field });
                }
                if value < 0.0 {
                    return Err(EngineError::Negative { field, value });
                }
            }
        }

        Ok(())
    }
}
