//! Candidate selection: which catalog tariffs apply to a profile.

use crate::{comparison::CustomerProfile, tariff::Tariff};

/// Keep the tariffs whose range holds for `profile`.
///
/// `tariffs` is expected to be pre-filtered by the store to active tariffs of
/// the profile's class; both conditions are re-checked so the function is
/// safe on an unfiltered list. An empty result is a normal outcome.
pub fn select_candidates(profile: &CustomerProfile, tariffs: Vec<Tariff>) -> Vec<Tariff> {
    tariffs
        .into_iter()
        .filter(|t| {
            if !t.active || t.tariff_class != profile.tariff_class {
                return false;
            }
            if !t.range.is_well_formed() {
                log::warn!(
                    "comparison={} tariff={}: malformed range {:?}, excluded",
                    profile.comparison_id, t.tariff_id, t.range
                );
                return false;
            }
            t.range.contains(profile)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        tariff::{ApplicabilityRange, FeeTerm},
        types::PeriodValues,
    };
    use chrono::Utc;

    fn profile(annual: f64) -> CustomerProfile {
        CustomerProfile {
            comparison_id:      "cmp".into(),
            customer_name:      None,
            annual_consumption: annual,
            consumption:        PeriodValues::p1(annual),
            contracted_power:   PeriodValues::new([Some(3.3), Some(4.6), None, None, None, None]),
            tariff_class:       "2.0TD".into(),
            current_provider:   None,
            current_bill:       0.0,
            created_at:         Utc::now(),
            last_calculated_at: None,
        }
    }

    fn tariff(id: &str, class: &str, range: ApplicabilityRange) -> Tariff {
        Tariff {
            tariff_id:           id.into(),
            provider_id:         "prov".into(),
            offer_name:          id.into(),
            tariff_class:        class.into(),
            offer_type:          "fixed".into(),
            energy_prices:       PeriodValues::p1(0.1),
            power_prices:        PeriodValues::default(),
            range,
            fee_based:           false,
            energy_fee:          FeeTerm::default(),
            power_fee:           FeeTerm::default(),
            energy_discount_pct: None,
            power_discount_pct:  None,
            management_cost:     None,
            active:              true,
        }
    }

    fn ids(selected: &[Tariff]) -> Vec<&str> {
        selected.iter().map(|t| t.tariff_id.as_str()).collect()
    }

    #[test]
    fn energy_range_bounds_are_inclusive() {
        let catalog = || vec![tariff("t", "2.0TD", ApplicabilityRange::energy(1000.0, Some(5000.0)))];
        assert_eq!(select_candidates(&profile(1000.0), catalog()).len(), 1);
        assert_eq!(select_candidates(&profile(5000.0), catalog()).len(), 1);
        assert!(select_candidates(&profile(999.0), catalog()).is_empty());
        assert!(select_candidates(&profile(5001.0), catalog()).is_empty());
    }

    #[test]
    fn power_range_checks_max_contracted_power() {
        let catalog = vec![
            tariff("low", "2.0TD", ApplicabilityRange::power(0.0, Some(4.0))),
            tariff("high", "2.0TD", ApplicabilityRange::power(4.0, Some(10.0))),
        ];
        assert_eq!(ids(&select_candidates(&profile(4000.0), catalog)), vec!["high"]);
    }

    #[test]
    fn other_classes_and_inactive_tariffs_are_dropped() {
        let mut inactive = tariff("off", "2.0TD", ApplicabilityRange::unbounded());
        inactive.active = false;
        let catalog = vec![
            tariff("other", "3.0TD", ApplicabilityRange::unbounded()),
            inactive,
            tariff("ok", "2.0TD", ApplicabilityRange::unbounded()),
        ];
        assert_eq!(ids(&select_candidates(&profile(4000.0), catalog)), vec!["ok"]);
    }
}
