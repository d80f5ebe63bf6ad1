use super::{is_row_decode_error, period_values, unknown_label, TariffStore};
use crate::{
    commission::{CommissionBasis, CommissionRule},
    config::CatalogFile,
    error::EngineResult,
    tariff::{ApplicabilityRange, FeeTerm, Provider, RangeKind, Tariff},
    types::TariffId,
};
use rusqlite::{params, OptionalExtension, Row};

/// A stored tariff row whose columns could not be decoded.
#[derive(Debug)]
pub struct UnreadableTariff {
    pub tariff_id: TariffId,
    pub error:     rusqlite::Error,
}

const TARIFF_COLUMNS: &str = "tariff_id, provider_id, offer_name, tariff_class, offer_type,
    energy_p1, energy_p2, energy_p3, energy_p4, energy_p5, energy_p6,
    power_p1, power_p2, power_p3, power_p4, power_p5, power_p6,
    range_kind, range_from, range_to, fee_based,
    energy_fee, energy_fee_min, energy_fee_max,
    power_fee, power_fee_min, power_fee_max,
    energy_discount_pct, power_discount_pct, management_cost, active";

const RULE_COLUMNS: &str = "rule_id, provider_id, offer_name, tariff_class, offer_type,
    range_kind, range_from, range_to, value, basis, active";

impl TariffStore {
    // ── Import ─────────────────────────────────────────────────

    /// Upsert every provider, tariff and commission rule in one transaction.
    pub fn import_catalog(&self, catalog: &CatalogFile) -> EngineResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        for provider in &catalog.providers {
            self.upsert_provider(provider)?;
        }
        for tariff in &catalog.tariffs {
            self.upsert_tariff(tariff)?;
        }
        for rule in &catalog.commissions {
            self.upsert_commission_rule(rule)?;
        }
        tx.commit()?;
        log::info!(
            "store: imported {} providers, {} tariffs, {} commission rules",
            catalog.providers.len(),
            catalog.tariffs.len(),
            catalog.commissions.len()
        );
        Ok(())
    }

    pub fn upsert_provider(&self, provider: &Provider) -> EngineResult<()> {
        self.conn.execute(
            "INSERT INTO provider (provider_id, name) VALUES (?1, ?2)
             ON CONFLICT(provider_id) DO UPDATE SET name = excluded.name",
            params![provider.provider_id, provider.name],
        )?;
        Ok(())
    }

    pub fn upsert_tariff(&self, t: &Tariff) -> EngineResult<()> {
        let e = &t.energy_prices;
        let p = &t.power_prices;
        self.conn.execute(
            &format!(
                "INSERT OR REPLACE INTO tariff ({TARIFF_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                         ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28,
                         ?29, ?30, ?31)"
            ),
            params![
                t.tariff_id,
                t.provider_id,
                t.offer_name,
                t.tariff_class,
                t.offer_type,
                e.get(0), e.get(1), e.get(2), e.get(3), e.get(4), e.get(5),
                p.get(0), p.get(1), p.get(2), p.get(3), p.get(4), p.get(5),
                t.range.kind.as_str(),
                t.range.from,
                t.range.to,
                if t.fee_based { 1i64 } else { 0i64 },
                t.energy_fee.rate,
                t.energy_fee.min,
                t.energy_fee.max,
                t.power_fee.rate,
                t.power_fee.min,
                t.power_fee.max,
                t.energy_discount_pct,
                t.power_discount_pct,
                t.management_cost,
                if t.active { 1i64 } else { 0i64 },
            ],
        )?;
        Ok(())
    }

    pub fn upsert_commission_rule(&self, r: &CommissionRule) -> EngineResult<()> {
        self.conn.execute(
            &format!(
                "INSERT OR REPLACE INTO commission_rule ({RULE_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
            ),
            params![
                r.rule_id,
                r.provider_id,
                r.offer_name,
                r.tariff_class,
                r.offer_type,
                r.range.kind.as_str(),
                r.range.from,
                r.range.to,
                r.value,
                r.basis.as_str(),
                if r.active { 1i64 } else { 0i64 },
            ],
        )?;
        Ok(())
    }

    pub fn set_tariff_active(&self, tariff_id: &str, active: bool) -> EngineResult<()> {
        self.conn.execute(
            "UPDATE tariff SET active = ?1 WHERE tariff_id = ?2",
            params![if active { 1i64 } else { 0i64 }, tariff_id],
        )?;
        Ok(())
    }

    // ── Queries ────────────────────────────────────────────────

    pub fn tariff(&self, tariff_id: &str) -> EngineResult<Option<Tariff>> {
        let tariff = self
            .conn
            .query_row(
                &format!("SELECT {TARIFF_COLUMNS} FROM tariff WHERE tariff_id = ?1"),
                params![tariff_id],
                tariff_from_row,
            )
            .optional()?;
        Ok(tariff)
    }

    /// Active tariffs of one access-tariff class, ordered by id.
    /// A row that cannot be decoded comes back as `Err` carrying its id,
    /// so the caller decides how to report it.
    pub fn active_tariffs_for_class(
        &self,
        tariff_class: &str,
    ) -> EngineResult<Vec<Result<Tariff, UnreadableTariff>>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TARIFF_COLUMNS} FROM tariff
             WHERE active = 1 AND tariff_class = ?1
             ORDER BY tariff_id ASC"
        ))?;
        let rows = stmt.query_map(params![tariff_class], |row| {
            let tariff_id: TariffId = row.get(0)?;
            Ok(tariff_from_row(row).map_err(|error| UnreadableTariff { tariff_id, error }))
        })?;

        let mut tariffs = Vec::new();
        for row in rows {
            match row? {
                Err(u) if !is_row_decode_error(&u.error) => return Err(u.error.into()),
                decoded => tariffs.push(decoded),
            }
        }
        Ok(tariffs)
    }

    /// Active commission rules for a (provider, offer, class, type) key, ordered by id.
    pub fn commission_rules_for(
        &self,
        provider_id: &str,
        offer_name: &str,
        tariff_class: &str,
        offer_type: &str,
    ) -> EngineResult<Vec<CommissionRule>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RULE_COLUMNS} FROM commission_rule
             WHERE active = 1 AND provider_id = ?1 AND offer_name = ?2
               AND tariff_class = ?3 AND offer_type = ?4
             ORDER BY rule_id ASC"
        ))?;
        let rows = stmt.query_map(
            params![provider_id, offer_name, tariff_class, offer_type],
            rule_from_row,
        )?;

        let mut rules = Vec::new();
        for row in rows {
            match row {
                Ok(r) => rules.push(r),
                Err(e) if is_row_decode_error(&e) => {
                    log::warn!("store: skipping unreadable commission rule for {provider_id}/{offer_name}: {e}");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(rules)
    }

    pub fn providers(&self) -> EngineResult<Vec<Provider>> {
        let mut stmt = self
            .conn
            .prepare("SELECT provider_id, name FROM provider ORDER BY provider_id ASC")?;
        let providers = stmt
            .query_map([], |row| {
                Ok(Provider {
                    provider_id: row.get(0)?,
                    name:        row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(providers)
    }
}

fn range_from_row(row: &Row<'_>, first: usize) -> rusqlite::Result<ApplicabilityRange> {
    let kind: String = row.get(first)?;
    let kind = RangeKind::parse(&kind).ok_or_else(|| unknown_label(first, "range kind", &kind))?;
    Ok(ApplicabilityRange {
        kind,
        from: row.get(first + 1)?,
        to:   row.get(first + 2)?,
    })
}

fn tariff_from_row(row: &Row<'_>) -> rusqlite::Result<Tariff> {
    Ok(Tariff {
        tariff_id:     row.get(0)?,
        provider_id:   row.get(1)?,
        offer_name:    row.get(2)?,
        tariff_class:  row.get(3)?,
        offer_type:    row.get(4)?,
        energy_prices: period_values(row, 5)?,
        power_prices:  period_values(row, 11)?,
        range:         range_from_row(row, 17)?,
        fee_based:     row.get::<_, i64>(20)? != 0,
        energy_fee: FeeTerm {
            rate: row.get(21)?,
            min:  row.get(22)?,
            max:  row.get(23)?,
        },
        power_fee: FeeTerm {
            rate: row.get(24)?,
            min:  row.get(25)?,
            max:  row.get(26)?,
        },
        energy_discount_pct: row.get(27)?,
        power_discount_pct:  row.get(28)?,
        management_cost:     row.get(29)?,
        active:              row.get::<_, i64>(30)? != 0,
    })
}

fn rule_from_row(row: &Row<'_>) -> rusqlite::Result<CommissionRule> {
    let basis: String = row.get(9)?;
    Ok(CommissionRule {
        rule_id:      row.get(0)?,
        provider_id:  row.get(1)?,
        offer_name:   row.get(2)?,
        tariff_class: row.get(3)?,
        offer_type:   row.get(4)?,
        range:        range_from_row(row, 5)?,
        value:        row.get(8)?,
        basis:        CommissionBasis::parse(&basis)
            .ok_or_else(|| unknown_label(9, "commission basis", &basis))?,
        active:       row.get::<_, i64>(10)? != 0,
    })
}
