//! Commission rules and max-wins matching.
//!
//! A rule matches a tariff when its key (provider, offer name, tariff class,
//! offer type) equals the tariff's, it is active, and its own range holds
//! for the customer. The store narrows by key; the range is checked here.

use crate::{
    comparison::CustomerProfile,
    tariff::ApplicabilityRange,
    types::ProviderId,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommissionBasis {
    /// Fixed amount per contract.
    Flat,
    /// Derived from the fee charged on the tariff.
    Fee,
}

impl CommissionBasis {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommissionBasis::Flat => "flat",
            CommissionBasis::Fee  => "fee",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "flat" => Some(CommissionBasis::Flat),
            "fee"  => Some(CommissionBasis::Fee),
            _      => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommissionRule {
    pub rule_id:      String,
    pub provider_id:  ProviderId,
    pub offer_name:   String,
    pub tariff_class: String,
    pub offer_type:   String,
    pub range:        ApplicabilityRange,
    pub value:        f64,
    #[serde(default = "default_basis")]
    pub basis:        CommissionBasis,
    #[serde(default = "default_active")]
    pub active:       bool,
}

fn default_basis() -> CommissionBasis {
    CommissionBasis::Flat
}

fn default_active() -> bool {
    true
}

/// Outcome of matching one tariff against the commission table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommissionMatch {
    pub value:   f64,
    pub rule_id: Option<String>,
    pub basis:   Option<CommissionBasis>,
}

impl CommissionMatch {
    pub fn none() -> Self {
        Self { value: 0.0, rule_id: None, basis: None }
    }
}

/// Highest-valued rule among `candidates` whose range holds for `profile`.
/// On equal values the earlier rule wins, so callers should pass rules in a
/// stable order.
pub fn best_commission(candidates: &[CommissionRule], profile: &CustomerProfile) -> CommissionMatch {
    let mut best: Option<&CommissionRule> = None;
    for rule in candidates {
        if !rule.active || !rule.value.is_finite() || !rule.range.contains(profile) {
            continue;
        }
        if best.map_or(true, |b| rule.value > b.value) {
            best = Some(rule);
        }
    }
    match best {
        Some(rule) => CommissionMatch {
            value:   rule.value,
            rule_id: Some(rule.rule_id.clone()),
            basis:   Some(rule.basis),
        },
        None => CommissionMatch::none(),
    }
}
