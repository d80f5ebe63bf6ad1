//! The calculation engine: ranks every applicable tariff for a comparison.
//!
//! PIPELINE (per request):
//!   1. Load and validate the customer profile.
//!   2. Select candidate tariffs (class + active + range).
//!      A stored row that cannot be read counts as a skipped candidate.
//!   3. Price each candidate, then match its commission.
//!      A tariff that fails to price is logged and skipped.
//!   4. Sort cheapest first and assign ranks.
//!   5. Replace the stored result set (delete then insert).
//!
//! RULES:
//!   - Catalog data is never mutated; overrides only affect this run.
//!   - Every call re-reads the catalog; nothing is cached.
//!   - Storage errors abort the request; per-tariff errors do not.

use crate::{
    candidate,
    commission::{self, CommissionMatch},
    comparison::CustomerProfile,
    config::EngineConfig,
    cost::{self, CalculationOverrides, CostBreakdown},
    error::{EngineError, EngineResult},
    store::TariffStore,
    tariff::Tariff,
    types::{ComparisonId, ProviderId, TariffId},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One ranked line of a comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationResult {
    /// 1-based position, cheapest first.
    pub rank:        u32,
    pub tariff_id:   TariffId,
    pub provider_id: ProviderId,
    pub offer_name:  String,
    pub cost:        CostBreakdown,
    pub commission:  CommissionMatch,
}

/// Audit record of one orchestrator invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationRun {
    pub comparison_id:   ComparisonId,
    pub calculated_at:   DateTime<Utc>,
    pub candidate_count: usize,
    pub result_count:    usize,
    pub skipped_count:   usize,
    pub overrides:       Option<CalculationOverrides>,
}

struct Evaluation {
    results:         Vec<CalculationResult>,
    candidate_count: usize,
    skipped_count:   usize,
}

pub struct CalculationEngine<'a> {
    store:  &'a TariffStore,
    config: EngineConfig,
}

impl<'a> CalculationEngine<'a> {
    pub fn new(store: &'a TariffStore, config: EngineConfig) -> Self {
        Self { store, config }
    }

    /// Compute, rank and persist results for a comparison, replacing any
    /// earlier result set. Returns the ranked list.
    pub fn calculate_and_save(
        &self,
        comparison_id: &str,
        overrides: Option<&CalculationOverrides>,
    ) -> EngineResult<Vec<CalculationResult>> {
        let overrides = normalize(overrides);
        let evaluation = self.evaluate(comparison_id, overrides)?;

        let run = CalculationRun {
            comparison_id:   comparison_id.to_string(),
            calculated_at:   Utc::now(),
            candidate_count: evaluation.candidate_count,
            result_count:    evaluation.results.len(),
            skipped_count:   evaluation.skipped_count,
            overrides:       overrides.copied(),
        };
        self.store
            .replace_results(comparison_id, &evaluation.results, &run)
            .map_err(|e| {
                log::error!("comparison={comparison_id}: failed to store results: {e}");
                e
            })?;

        log::info!(
            "comparison={comparison_id}: {} results from {} candidates ({} skipped){}",
            run.result_count,
            run.candidate_count,
            run.skipped_count,
            if overrides.is_some() { ", with overrides" } else { "" }
        );
        Ok(evaluation.results)
    }

    /// Same ranking as `calculate_and_save`, without touching stored results.
    pub fn preview(
        &self,
        comparison_id: &str,
        overrides: Option<&CalculationOverrides>,
    ) -> EngineResult<Vec<CalculationResult>> {
        Ok(self.evaluate(comparison_id, normalize(overrides))?.results)
    }

    /// Stored results for a comparison, cheapest first.
    pub fn results(&self, comparison_id: &str) -> EngineResult<Vec<CalculationResult>> {
        if !self.store.comparison_exists(comparison_id)? {
            return Err(not_found(comparison_id));
        }
        self.store.results_for(comparison_id)
    }

    /// Price a single tariff for a comparison. Unlike the batch path, a
    /// pricing failure is returned to the caller. The tariff's class, range
    /// and active flag are not checked.
    pub fn quote_tariff(
        &self,
        comparison_id: &str,
        tariff_id: &str,
        overrides: Option<&CalculationOverrides>,
    ) -> EngineResult<CalculationResult> {
        let overrides = normalize(overrides);
        if let Some(o) = overrides {
            o.validate()?;
        }
        let profile = self.load_profile(comparison_id)?;
        let tariff = self
            .store
            .tariff(tariff_id)?
            .ok_or_else(|| EngineError::TariffNotFound {
                tariff_id: tariff_id.to_string(),
            })?;
        let cost = cost::compute_cost(&self.config, &profile, &tariff, overrides)?;
        let commission = self.match_commission(&profile, &tariff)?;
        Ok(to_result(&tariff, cost, commission, 1))
    }

    /// Active tariffs of the profile's class whose range holds.
    pub fn select_candidates(&self, profile: &CustomerProfile) -> EngineResult<Vec<Tariff>> {
        Ok(self.candidates(profile)?.0)
    }

    /// Highest commission among matching rules for `tariff`, zero if none.
    pub fn match_commission(
        &self,
        profile: &CustomerProfile,
        tariff: &Tariff,
    ) -> EngineResult<CommissionMatch> {
        let rules = self.store.commission_rules_for(
            &tariff.provider_id,
            &tariff.offer_name,
            &tariff.tariff_class,
            &tariff.offer_type,
        )?;
        Ok(commission::best_commission(&rules, profile))
    }

    fn load_profile(&self, comparison_id: &str) -> EngineResult<CustomerProfile> {
        let profile = self
            .store
            .comparison(comparison_id)?
            .ok_or_else(|| {
                log::warn!("comparison={comparison_id}: not found");
                not_found(comparison_id)
            })?;
        profile.validate().map_err(|e| {
            log::warn!("comparison={comparison_id}: {e}");
            e
        })?;
        Ok(profile)
    }

    /// Candidates plus the number of class tariffs whose stored row could
    /// not be read. Those are logged here and never priced.
    fn candidates(&self, profile: &CustomerProfile) -> EngineResult<(Vec<Tariff>, usize)> {
        let comparison_id = &profile.comparison_id;
        let mut readable = Vec::new();
        let mut unreadable = 0;
        for row in self.store.active_tariffs_for_class(&profile.tariff_class)? {
            match row {
                Ok(tariff) => readable.push(tariff),
                Err(u) => {
                    log::warn!(
                        "comparison={comparison_id} tariff={}: skipped: unreadable row: {}",
                        u.tariff_id,
                        u.error
                    );
                    unreadable += 1;
                }
            }
        }
        Ok((candidate::select_candidates(profile, readable), unreadable))
    }

    fn evaluate(
        &self,
        comparison_id: &str,
        overrides: Option<&CalculationOverrides>,
    ) -> EngineResult<Evaluation> {
        if let Some(o) = overrides {
            o.validate()?;
        }
        let profile = self.load_profile(comparison_id)?;
        let (candidates, unreadable) = self.candidates(&profile)?;
        let candidate_count = candidates.len() + unreadable;
        if candidate_count == 0 {
            log::info!(
                "comparison={comparison_id}: no tariffs apply to class {}",
                profile.tariff_class
            );
        }

        let mut priced = Vec::with_capacity(candidates.len());
        let mut skipped_count = unreadable;
        for tariff in &candidates {
            let cost = match cost::compute_cost(&self.config, &profile, tariff, overrides) {
                Ok(cost) => cost,
                Err(e) => {
                    log::warn!(
                        "comparison={comparison_id} tariff={}: skipped: {e}",
                        tariff.tariff_id
                    );
                    skipped_count += 1;
                    continue;
                }
            };
            let commission = self.match_commission(&profile, tariff)?;
            log::debug!(
                "comparison={comparison_id} tariff={}: total {:.2}, savings {:.2}, commission {:.2}",
                tariff.tariff_id, cost.total, cost.savings, commission.value
            );
            priced.push((tariff, cost, commission));
        }

        // Cheapest first; ties fall back to catalog id so reruns are stable.
        priced.sort_by(|(ta, ca, _), (tb, cb, _)| {
            ca.total
                .total_cmp(&cb.total)
                .then_with(|| ta.tariff_id.cmp(&tb.tariff_id))
        });

        let results = priced
            .into_iter()
            .enumerate()
            .map(|(i, (tariff, cost, commission))| to_result(tariff, cost, commission, i as u32 + 1))
            .collect();

        Ok(Evaluation {
            results,
            candidate_count,
            skipped_count,
        })
    }
}

/// Treat an all-empty override set like no overrides at all.
fn normalize(overrides: Option<&CalculationOverrides>) -> Option<&CalculationOverrides> {
    overrides.filter(|o| !o.is_empty())
}

fn not_found(comparison_id: &str) -> EngineError {
    EngineError::NotFound {
        comparison_id: comparison_id.to_string(),
    }
}

fn to_result(
    tariff: &Tariff,
    cost: CostBreakdown,
    commission: CommissionMatch,
    rank: u32,
) -> CalculationResult {
    CalculationResult {
        rank,
        tariff_id:   tariff.tariff_id.clone(),
        provider_id: tariff.provider_id.clone(),
        offer_name:  tariff.offer_name.clone(),
        cost,
        commission,
    }
}
