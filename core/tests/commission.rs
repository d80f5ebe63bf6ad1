use tariff_core::{
    commission::{CommissionBasis, CommissionRule},
    comparison::NewComparison,
    config::EngineConfig,
    engine::CalculationEngine,
    store::TariffStore,
    tariff::{ApplicabilityRange, FeeTerm, Provider, Tariff},
    types::PeriodValues,
};

fn make_store() -> TariffStore {
    let store = TariffStore::in_memory().unwrap();
    store.migrate().unwrap();
    for id in ["prov", "other"] {
        store
            .upsert_provider(&Provider { provider_id: id.into(), name: id.into() })
            .unwrap();
    }
    store
        .upsert_tariff(&Tariff {
            tariff_id:           "t".into(),
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
        })
        .unwrap();
    store
        .create_comparison(NewComparison {
            comparison_id:      Some("cmp".into()),
            customer_name:      None,
            annual_consumption: 4000.0,
            consumption:        PeriodValues::p1(4000.0),
            contracted_power:   PeriodValues::p1(4.6),
            tariff_class:       "2.0TD".into(),
            current_provider:   None,
            current_bill:       600.0,
        })
        .unwrap();
    store
}

fn rule(id: &str, value: f64) -> CommissionRule {
    CommissionRule {
        rule_id:      id.into(),
        provider_id:  "prov".into(),
        offer_name:   "Offer".into(),
        tariff_class: "2.0TD".into(),
        offer_type:   "fixed".into(),
        range:        ApplicabilityRange::unbounded(),
        value,
        basis:        CommissionBasis::Flat,
        active:       true,
    }
}

fn matched(store: &TariffStore) -> (f64, Option<String>) {
    let engine = CalculationEngine::new(store, EngineConfig::default());
    let results = engine.calculate_and_save("cmp", None).unwrap();
    assert_eq!(results.len(), 1);
    (results[0].commission.value, results[0].commission.rule_id.clone())
}

#[test]
fn highest_of_two_matching_rules_wins() {
    let store = make_store();
    store.upsert_commission_rule(&rule("five", 5.0)).unwrap();
    store.upsert_commission_rule(&rule("eight", 8.0)).unwrap();

    assert_eq!(matched(&store), (8.0, Some("eight".into())));
}

#[test]
fn no_rule_means_zero_commission() {
    let store = make_store();
    assert_eq!(matched(&store), (0.0, None));
}

#[test]
fn rules_for_other_keys_do_not_match() {
    let store = make_store();
    let mut wrong_type = rule("wrong-type", 99.0);
    wrong_type.offer_type = "indexed".into();
    let mut wrong_provider = rule("wrong-provider", 98.0);
    wrong_provider.provider_id = "other".into();
    let mut wrong_offer = rule("wrong-offer", 97.0);
    wrong_offer.offer_name = "Another".into();
    for r in [&wrong_type, &wrong_provider, &wrong_offer] {
        store.upsert_commission_rule(r).unwrap();
    }
    store.upsert_commission_rule(&rule("right", 3.0)).unwrap();

    assert_eq!(matched(&store), (3.0, Some("right".into())));
}

#[test]
fn rule_range_is_checked_against_its_own_dimension() {
    let store = make_store();
    // Power rule: 4.6 kW is inside [0, 10].
    let mut power = rule("power", 12.0);
    power.range = ApplicabilityRange::power(0.0, Some(10.0));
    // Energy rule: 4000 kWh is outside [0, 10]; 4.6 kW would have been inside.
    let mut energy = rule("energy", 20.0);
    energy.range = ApplicabilityRange::energy(0.0, Some(10.0));
    store.upsert_commission_rule(&power).unwrap();
    store.upsert_commission_rule(&energy).unwrap();

    assert_eq!(matched(&store), (12.0, Some("power".into())));
}

#[test]
fn inactive_rules_are_not_considered() {
    let store = make_store();
    let mut inactive = rule("inactive", 500.0);
    inactive.active = false;
    store.upsert_commission_rule(&inactive).unwrap();
    store.upsert_commission_rule(&rule("active", 1.0)).unwrap();

    assert_eq!(matched(&store), (1.0, Some("active".into())));
}

#[test]
fn matching_is_a_pure_read() {
    let store = make_store();
    store.upsert_commission_rule(&rule("r", 7.0)).unwrap();
    let engine = CalculationEngine::new(&store, EngineConfig::default());
    let profile = store.comparison("cmp").unwrap().unwrap();
    let tariff = store.tariff("t").unwrap().unwrap();

    let first = engine.match_commission(&profile, &tariff).unwrap();
    let second = engine.match_commission(&profile, &tariff).unwrap();

    assert_eq!(first, second);
    assert_eq!(store.result_count("cmp").unwrap(), 0);
}
