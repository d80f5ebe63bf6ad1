//! Shared primitive types used across the engine.

use serde::{Deserialize, Serialize};

/// Identifier of a stored comparison (customer profile).
pub type ComparisonId = String;

/// Identifier of a catalog tariff.
pub type TariffId = String;

/// Identifier of a catalog provider.
pub type ProviderId = String;

/// Number of regulatory time-of-use periods (P1..P6).
pub const PERIOD_COUNT: usize = 6;

/// One optional value per period.
///
/// Absent means "no value declared" and contributes nothing to any sum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodValues(pub [Option<f64>; PERIOD_COUNT]);

impl PeriodValues {
    pub fn new(values: [Option<f64>; PERIOD_COUNT]) -> Self {
        Self(values)
    }

    /// Only P1 populated; the rest absent.
    pub fn p1(value: f64) -> Self {
        let mut values = [None; PERIOD_COUNT];
        values[0] = Some(value);
        Self(values)
    }

    pub fn get(&self, period: usize) -> Option<f64> {
        self.0.get(period).copied().flatten()
    }

    pub fn set(&mut self, period: usize, value: Option<f64>) {
        if let Some(slot) = self.0.get_mut(period) {
            *slot = value;
        }
    }

    /// Present values with their zero-based period index.
    pub fn present(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.0
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.map(|v| (i, v)))
    }

    /// Largest present value, or 0 when nothing is declared.
    pub fn max_or_zero(&self) -> f64 {
        self.present().map(|(_, v)| v).fold(0.0, f64::max)
    }

    /// Σ self[p] × other[p] over periods where both sides are present.
    pub fn dot(&self, other: &PeriodValues) -> f64 {
        self.present()
            .filter_map(|(i, v)| other.get(i).map(|o| v * o))
            .sum()
    }

    /// First period holding a negative or non-finite value, if any.
    pub fn first_invalid(&self) -> Option<usize> {
        self.present()
            .find(|(_, v)| !v.is_finite() || *v < 0.0)
            .map(|(i, _)| i)
    }
}

/// Human label for a zero-based period index ("P1".."P6").
pub fn period_label(period: usize) -> String {
    format!("P{}", period + 1)
}
