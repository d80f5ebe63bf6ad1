//! Per-tariff annual cost computation.
//!
//! energy  = Σ consumption[p] × energy_price[p]  (+ fee × annual kWh) − discount
//! power   = Σ power[p] × power_price[p] × 12     (+ fee × max kW)     − discount
//! base    = energy + power + management
//! tax     = base × electricity tax rate
//! vat     = (base + tax) × VAT rate
//! total   = base + tax + vat
//!
//! No rounding happens here; display layers round.

use crate::{
    comparison::CustomerProfile,
    config::EngineConfig,
    error::{EngineError, EngineResult},
    tariff::{FeeTerm, Tariff},
};
use serde::{Deserialize, Serialize};

/// Live "what-if" fee values. Each present field replaces the tariff's
/// stored value for this calculation only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CalculationOverrides {
    #[serde(rename = "feeEnergia", default)]
    pub energy_fee:     Option<f64>,
    #[serde(rename = "feeEnergiaMinimo", default)]
    pub energy_fee_min: Option<f64>,
    #[serde(rename = "feeEnergiaMaximo", default)]
    pub energy_fee_max: Option<f64>,
    #[serde(rename = "feePotencia", default)]
    pub power_fee:      Option<f64>,
    #[serde(rename = "feePotenciaMinimo", default)]
    pub power_fee_min:  Option<f64>,
    #[serde(rename = "feePotenciaMaximo", default)]
    pub power_fee_max:  Option<f64>,
}

impl CalculationOverrides {
    pub fn energy(&self) -> FeeTerm {
        FeeTerm {
            rate: self.energy_fee,
            min:  self.energy_fee_min,
            max:  self.energy_fee_max,
        }
    }

    pub fn power(&self) -> FeeTerm {
        FeeTerm {
            rate: self.power_fee,
            min:  self.power_fee_min,
            max:  self.power_fee_max,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn validate(&self) -> EngineResult<()> {
        self.energy()
            .check()
            .map_err(|e| EngineError::validation(format!("override energy {e}")))?;
        self.power()
            .check()
            .map_err(|e| EngineError::validation(format!("override power {e}")))?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    /// Effective energy fee rate; `None` when the tariff is not fee-based.
    pub energy_fee_rate:  Option<f64>,
    /// Effective power fee rate; `None` when the tariff is not fee-based.
    pub power_fee_rate:   Option<f64>,
    pub energy_cost:      f64,
    pub power_cost:       f64,
    pub management_cost:  f64,
    pub base:             f64,
    pub electricity_tax:  f64,
    pub vat:              f64,
    pub total:            f64,
    /// `current_bill - total`; negative when the tariff costs more.
    pub savings:          f64,
}

/// Price one tariff for one profile.
pub fn compute_cost(
    config: &EngineConfig,
    profile: &CustomerProfile,
    tariff: &Tariff,
    overrides: Option<&CalculationOverrides>,
) -> EngineResult<CostBreakdown> {
    tariff
        .check()
        .map_err(|reason| EngineError::computation(&tariff.tariff_id, reason))?;

    let (energy_fee, power_fee) = match overrides {
        Some(o) => (
            tariff.energy_fee.overridden_by(&o.energy()),
            tariff.power_fee.overridden_by(&o.power()),
        ),
        None => (tariff.energy_fee, tariff.power_fee),
    };

    // Energy term
    let mut energy_cost = profile.consumption.dot(&tariff.energy_prices);
    let energy_fee_rate = tariff.fee_based.then(|| energy_fee.effective_rate());
    if let Some(rate) = energy_fee_rate {
        energy_cost += profile.annual_consumption * rate;
    }
    energy_cost = apply_discount(energy_cost, tariff.energy_discount_pct);

    // Power term (monthly prices → annual)
    let mut power_cost =
        profile.contracted_power.dot(&tariff.power_prices) * config.months_per_year;
    let power_fee_rate = tariff.fee_based.then(|| power_fee.effective_rate());
    if let Some(rate) = power_fee_rate {
        power_cost += profile.max_contracted_power() * rate;
    }
    power_cost = apply_discount(power_cost, tariff.power_discount_pct);

    let management_cost = tariff.management_cost.unwrap_or(0.0);
    let base = energy_cost + power_cost + management_cost;
    let electricity_tax = base * config.electricity_tax_rate;
    let vat = (base + electricity_tax) * config.vat_rate;
    let total = base + electricity_tax + vat;

    if !total.is_finite() {
        return Err(EngineError::computation(
            &tariff.tariff_id,
            format!("total is not a finite number ({total})"),
        ));
    }

    Ok(CostBreakdown {
        energy_fee_rate,
        power_fee_rate,
        energy_cost,
        power_cost,
        management_cost,
        base,
        electricity_tax,
        vat,
        total,
        savings: profile.current_bill - total,
    })
}

fn apply_discount(amount: f64, pct: Option<f64>) -> f64 {
    match pct {
        Some(pct) => amount - amount * pct / 100.0,
        None      => amount,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        tariff::ApplicabilityRange,
        types::PeriodValues,
    };
    use chrono::Utc;

    fn profile() -> CustomerProfile {
        CustomerProfile {
            comparison_id:      "cmp".into(),
            customer_name:      None,
            annual_consumption: 4000.0,
            consumption:        PeriodValues::p1(4000.0),
            contracted_power:   PeriodValues::p1(4.6),
            tariff_class:       "2.0TD".into(),
            current_provider:   None,
            current_bill:       600.0,
            created_at:         Utc::now(),
            last_calculated_at: None,
        }
    }

    fn tariff() -> Tariff {
        Tariff {
            tariff_id:           "A".into(),
            provider_id:         "prov".into(),
            offer_name:          "Offer".into(),
            tariff_class:        "2.0TD".into(),
            offer_type:          "fixed".into(),
            energy_prices:       PeriodValues::p1(0.15),
            power_prices:        PeriodValues::p1(0.05),
            range:               ApplicabilityRange::unbounded(),
            fee_based:           false,
            energy_fee:          FeeTerm::default(),
            power_fee:           FeeTerm::default(),
            energy_discount_pct: None,
            power_discount_pct:  None,
            management_cost:     None,
            active:              true,
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn reference_scenario_breakdown() {
        let cost = compute_cost(&EngineConfig::default(), &profile(), &tariff(), None).unwrap();
        assert!(close(cost.energy_cost, 600.0));
        assert!(close(cost.power_cost, 2.76));
        assert!(close(cost.base, 602.76));
        assert!(close(cost.electricity_tax, 30.817_288_34), "tax {}", cost.electricity_tax);
        assert!(close(cost.vat, 133.051_230_55), "vat {}", cost.vat);
        assert!(close(cost.total, 766.628_518_89), "total {}", cost.total);
        assert!(cost.savings < 0.0);
        assert!(close(cost.savings, -166.628_518_89));
        assert_eq!(cost.energy_fee_rate, None);
    }

    #[test]
    fn absent_prices_contribute_nothing() {
        let mut t = tariff();
        t.energy_prices = PeriodValues::default();
        t.power_prices = PeriodValues::default();
        let cost = compute_cost(&EngineConfig::default(), &profile(), &t, None).unwrap();
        assert_eq!(cost.energy_cost, 0.0);
        assert_eq!(cost.power_cost, 0.0);
        assert_eq!(cost.total, 0.0);
        assert_eq!(cost.savings, 600.0);
    }

    #[test]
    fn fee_applies_only_to_fee_based_tariffs() {
        let mut t = tariff();
        t.energy_fee = FeeTerm::rate(0.01);
        let plain = compute_cost(&EngineConfig::default(), &profile(), &t, None).unwrap();
        assert!(close(plain.energy_cost, 600.0));

        t.fee_based = true;
        let fee = compute_cost(&EngineConfig::default(), &profile(), &t, None).unwrap();
        assert!(close(fee.energy_cost, 640.0));
        assert_eq!(fee.energy_fee_rate, Some(0.01));
    }

    #[test]
    fn override_min_clamps_fee_up() {
        let mut t = tariff();
        t.fee_based = true;
        let overrides = CalculationOverrides {
            energy_fee:     Some(0.002),
            energy_fee_min: Some(0.005),
            ..Default::default()
        };
        let cost = compute_cost(&EngineConfig::default(), &profile(), &t, Some(&overrides)).unwrap();
        assert_eq!(cost.energy_fee_rate, Some(0.005));
        assert!(close(cost.energy_cost, 600.0 + 4000.0 * 0.005));
    }

    #[test]
    fn power_fee_uses_max_contracted_power() {
        let mut t = tariff();
        t.fee_based = true;
        t.power_fee = FeeTerm { rate: Some(1.0), min: None, max: Some(0.5) };
        let mut p = profile();
        p.contracted_power.set(1, Some(6.0));
        let cost = compute_cost(&EngineConfig::default(), &p, &t, None).unwrap();
        // P1 only priced: 4.6 × 0.05 × 12, fee: 6.0 × 0.5
        assert!(close(cost.power_cost, 2.76 + 3.0), "power {}", cost.power_cost);
    }

    #[test]
    fn power_override_clamps_fee_up_and_down() {
        let mut t = tariff();
        t.fee_based = true;
        t.power_fee = FeeTerm::rate(0.5);
        let config = EngineConfig::default();

        let stored = compute_cost(&config, &profile(), &t, None).unwrap();
        assert_eq!(stored.power_fee_rate, Some(0.5));
        assert!(close(stored.power_cost, 2.76 + 4.6 * 0.5));

        let up = CalculationOverrides { power_fee_min: Some(1.0), ..Default::default() };
        let cost = compute_cost(&config, &profile(), &t, Some(&up)).unwrap();
        assert_eq!(cost.power_fee_rate, Some(1.0));
        assert!(close(cost.power_cost, 2.76 + 4.6), "power {}", cost.power_cost);

        let down = CalculationOverrides {
            power_fee:     Some(0.8),
            power_fee_max: Some(0.2),
            ..Default::default()
        };
        let cost = compute_cost(&config, &profile(), &t, Some(&down)).unwrap();
        assert_eq!(cost.power_fee_rate, Some(0.2));
        assert!(close(cost.power_cost, 2.76 + 0.92), "power {}", cost.power_cost);
        assert!(close(cost.energy_cost, 600.0), "energy untouched");

        assert_eq!(t.power_fee, FeeTerm::rate(0.5));
    }

    #[test]
    fn override_max_clamps_energy_fee_down() {
        let mut t = tariff();
        t.fee_based = true;
        t.energy_fee = FeeTerm::rate(0.002);
        let cap = CalculationOverrides { energy_fee_max: Some(0.001), ..Default::default() };
        let cost = compute_cost(&EngineConfig::default(), &profile(), &t, Some(&cap)).unwrap();
        assert_eq!(cost.energy_fee_rate, Some(0.001));
        assert!(close(cost.energy_cost, 600.0 + 4.0));
    }

    #[test]
    fn discounts_reduce_each_term() {
        let mut t = tariff();
        t.energy_discount_pct = Some(10.0);
        t.power_discount_pct = Some(50.0);
        t.management_cost = Some(12.0);
        let cost = compute_cost(&EngineConfig::default(), &profile(), &t, None).unwrap();
        assert!(close(cost.energy_cost, 540.0));
        assert!(close(cost.power_cost, 1.38));
        assert!(close(cost.base, 540.0 + 1.38 + 12.0));
    }

    #[test]
    fn malformed_tariff_is_a_computation_error() {
        let mut t = tariff();
        t.energy_prices.set(2, Some(-0.2));
        let err = compute_cost(&EngineConfig::default(), &profile(), &t, None).unwrap_err();
        assert!(matches!(err, EngineError::Computation { ref tariff_id, .. } if tariff_id == "A"));
    }

    #[test]
    fn override_json_uses_wire_names() {
        let o: CalculationOverrides =
            serde_json::from_str(r#"{ "feeEnergia": 0.002, "feePotenciaMaximo": 1.5 }"#).unwrap();
        assert_eq!(o.energy_fee, Some(0.002));
        assert_eq!(o.power_fee_max, Some(1.5));
        assert!(o.energy_fee_min.is_none());
    }
}
