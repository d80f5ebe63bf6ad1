//! Tariff catalog types and the applicability-range predicate shared by
//! candidate selection and commission matching.

use crate::{
    comparison::CustomerProfile,
    types::{PeriodValues, ProviderId, TariffId},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    pub provider_id: ProviderId,
    pub name:        String,
}

/// Which customer dimension a range is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeKind {
    /// Annual consumption in kWh.
    Energy,
    /// Maximum contracted power across periods, in kW.
    Power,
}

impl RangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RangeKind::Energy => "energy",
            RangeKind::Power  => "power",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "energy" => Some(RangeKind::Energy),
            "power"  => Some(RangeKind::Power),
            _        => None,
        }
    }
}

/// Inclusive `[from, to]` range; `to = None` is open-ended.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ApplicabilityRange {
    pub kind: RangeKind,
    #[serde(default)]
    pub from: f64,
    #[serde(default)]
    pub to:   Option<f64>,
}

impl ApplicabilityRange {
    pub fn energy(from: f64, to: Option<f64>) -> Self {
        Self { kind: RangeKind::Energy, from, to }
    }

    pub fn power(from: f64, to: Option<f64>) -> Self {
        Self { kind: RangeKind::Power, from, to }
    }

    /// Open-ended energy range from zero: matches every valid profile.
    pub fn unbounded() -> Self {
        Self::energy(0.0, None)
    }

    /// `from <= to` when `to` is set, and both bounds are finite.
    pub fn is_well_formed(&self) -> bool {
        self.from.is_finite()
            && match self.to {
                Some(to) => to.is_finite() && self.from <= to,
                None     => true,
            }
    }

    /// The profile value this range is evaluated against.
    pub fn subject_value(&self, profile: &CustomerProfile) -> f64 {
        match self.kind {
            RangeKind::Energy => profile.annual_consumption,
            RangeKind::Power  => profile.max_contracted_power(),
        }
    }

    pub fn contains_value(&self, value: f64) -> bool {
        if !self.is_well_formed() {
            return false;
        }
        value >= self.from && self.to.map_or(true, |to| value <= to)
    }

    pub fn contains(&self, profile: &CustomerProfile) -> bool {
        self.contains_value(self.subject_value(profile))
    }
}

/// A fee rate with optional clamp bounds. Every part may be absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FeeTerm {
    #[serde(default)]
    pub rate: Option<f64>,
    #[serde(default)]
    pub min:  Option<f64>,
    #[serde(default)]
    pub max:  Option<f64>,
}

impl FeeTerm {
    pub fn rate(rate: f64) -> Self {
        Self { rate: Some(rate), min: None, max: None }
    }

    /// Replace each part with the override when the override is present.
    pub fn overridden_by(&self, other: &FeeTerm) -> FeeTerm {
        FeeTerm {
            rate: other.rate.or(self.rate),
            min:  other.min.or(self.min),
            max:  other.max.or(self.max),
        }
    }

    /// Rate clamped to the bounds that are present. Absent rate counts as 0
    /// before clamping, so a lone minimum still applies.
    pub fn effective_rate(&self) -> f64 {
        let mut rate = self.rate.unwrap_or(0.0);
        if let Some(min) = self.min {
            rate = rate.max(min);
        }
        if let Some(max) = self.max {
            rate = rate.min(max);
        }
        rate
    }

    pub fn check(&self) -> Result<(), String> {
        for (name, value) in [("rate", self.rate), ("min", self.min), ("max", self.max)] {
            if let Some(v) = value {
                if !v.is_finite() || v < 0.0 {
                    return Err(format!("fee {name} must be a non-negative number, got {v}"));
                }
            }
        }
        if let (Some(min), Some(max)) = (self.min, self.max) {
            if min > max {
                return Err(format!("fee minimum {min} exceeds maximum {max}"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tariff {
    pub tariff_id:    TariffId,
    pub provider_id:  ProviderId,
    pub offer_name:   String,
    pub tariff_class: String,
    pub offer_type:   String,
    /// €/kWh per period.
    #[serde(default)]
    pub energy_prices: PeriodValues,
    /// €/kW per month, per period.
    #[serde(default)]
    pub power_prices:  PeriodValues,
    pub range:         ApplicabilityRange,
    #[serde(default)]
    pub fee_based:     bool,
    #[serde(default)]
    pub energy_fee:    FeeTerm,
    #[serde(default)]
    pub power_fee:     FeeTerm,
    #[serde(default)]
    pub energy_discount_pct: Option<f64>,
    #[serde(default)]
    pub power_discount_pct:  Option<f64>,
    /// €/year.
    #[serde(default)]
    pub management_cost: Option<f64>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Tariff {
    /// Reject stored data the cost formula cannot price.
    pub fn check(&self) -> Result<(), String> {
        if let Some(p) = self.energy_prices.first_invalid() {
            return Err(format!(
                "energy price {} is negative or not a number",
                crate::types::period_label(p)
            ));
        }
        if let Some(p) = self.power_prices.first_invalid() {
            return Err(format!(
                "power price {} is negative or not a number",
                crate::types::period_label(p)
            ));
        }
        self.energy_fee.check().map_err(|e| format!("energy {e}"))?;
        self.power_fee.check().map_err(|e| format!("power {e}"))?;
        for (name, pct) in [
            ("energy", self.energy_discount_pct),
            ("power", self.power_discount_pct),
        ] {
            if let Some(pct) = pct {
                if !(0.0..=100.0).contains(&pct) {
                    return Err(format!("{name} discount {pct}% outside 0..=100"));
                }
            }
        }
        if let Some(cost) = self.management_cost {
            if !cost.is_finite() || cost < 0.0 {
                return Err(format!("management cost {cost} is negative or not a number"));
            }
        }
        Ok(())
    }
}
