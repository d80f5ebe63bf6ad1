//! Customer profiles ("comparisons"), the input side of a calculation.

use crate::{
    error::{EngineError, EngineResult},
    types::{period_label, ComparisonId, PeriodValues},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored customer profile. Read-only to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub comparison_id:      ComparisonId,
    pub customer_name:      Option<String>,
    /// kWh per year.
    pub annual_consumption: f64,
    /// kWh per period.
    pub consumption:        PeriodValues,
    /// Contracted kW per period.
    pub contracted_power:   PeriodValues,
    pub tariff_class:       String,
    pub current_provider:   Option<String>,
    /// € per year the customer pays today.
    pub current_bill:       f64,
    pub created_at:         DateTime<Utc>,
    pub last_calculated_at: Option<DateTime<Utc>>,
}

impl CustomerProfile {
    /// Largest contracted power across declared periods, 0 when none.
    pub fn max_contracted_power(&self) -> f64 {
        self.contracted_power.max_or_zero()
    }

    pub fn validate(&self) -> EngineResult<()> {
        validate_fields(
            self.annual_consumption,
            &self.tariff_class,
            &self.consumption,
            &self.contracted_power,
            self.current_bill,
        )
        .map_err(|reason| {
            EngineError::validation(format!("comparison {}: {reason}", self.comparison_id))
        })
    }
}

/// Input for creating a comparison. The store assigns id and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewComparison {
    #[serde(default)]
    pub comparison_id:      Option<ComparisonId>,
    #[serde(default)]
    pub customer_name:      Option<String>,
    pub annual_consumption: f64,
    #[serde(default)]
    pub consumption:        PeriodValues,
    #[serde(default)]
    pub contracted_power:   PeriodValues,
    pub tariff_class:       String,
    #[serde(default)]
    pub current_provider:   Option<String>,
    /// € per year paid today. Required.
    pub current_bill:       f64,
}

impl NewComparison {
    pub fn validate(&self) -> EngineResult<()> {
        validate_fields(
            self.annual_consumption,
            &self.tariff_class,
            &self.consumption,
            &self.contracted_power,
            self.current_bill,
        )
        .map_err(EngineError::validation)
    }

    pub fn into_profile(self, comparison_id: ComparisonId, created_at: DateTime<Utc>) -> CustomerProfile {
        CustomerProfile {
            comparison_id,
            customer_name:      self.customer_name,
            annual_consumption: self.annual_consumption,
            consumption:        self.consumption,
            contracted_power:   self.contracted_power,
            tariff_class:       self.tariff_class,
            current_provider:   self.current_provider,
            current_bill:       self.current_bill,
            created_at,
            last_calculated_at: None,
        }
    }
}

fn validate_fields(
    annual_consumption: f64,
    tariff_class: &str,
    consumption: &PeriodValues,
    contracted_power: &PeriodValues,
    current_bill: f64,
) -> Result<(), String> {
    if !annual_consumption.is_finite() || annual_consumption <= 0.0 {
        return Err(format!(
            "annual consumption must be positive, got {annual_consumption}"
        ));
    }
    if tariff_class.trim().is_empty() {
        return Err("tariff class is required".to_string());
    }
    if let Some(p) = consumption.first_invalid() {
        return Err(format!("consumption {} is negative or not a number", period_label(p)));
    }
    if let Some(p) = contracted_power.first_invalid() {
        return Err(format!("contracted power {} is negative or not a number", period_label(p)));
    }
    if !current_bill.is_finite() {
        return Err("current bill is not a number".to_string());
    }
    Ok(())
}
