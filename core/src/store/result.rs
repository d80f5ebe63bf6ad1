use super::TariffStore;
use crate::{
    commission::{CommissionBasis, CommissionMatch},
    cost::{CalculationOverrides, CostBreakdown},
    engine::{CalculationResult, CalculationRun},
    error::EngineResult,
};
use rusqlite::{params, types::Type, Row};

impl TariffStore {
    /// Delete every stored result for the comparison, insert `results`,
    /// stamp the comparison and append the audit row. One transaction.
    pub fn replace_results(
        &self,
        comparison_id: &str,
        results: &[CalculationResult],
        run: &CalculationRun,
    ) -> EngineResult<()> {
        let overrides_json = run
            .overrides
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let tx = self.conn.unchecked_transaction()?;
        let removed = self.conn.execute(
            "DELETE FROM calculation_result WHERE comparison_id = ?1",
            params![comparison_id],
        )?;
        for r in results {
            self.conn.execute(
                "INSERT INTO calculation_result (
                    comparison_id, rank, tariff_id, provider_id, offer_name,
                    energy_fee_rate, power_fee_rate,
                    energy_cost, power_cost, management_cost, base,
                    electricity_tax, vat, total, savings,
                    commission, commission_rule, commission_basis
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                          ?15, ?16, ?17, ?18)",
                params![
                    comparison_id,
                    r.rank as i64,
                    r.tariff_id,
                    r.provider_id,
                    r.offer_name,
                    r.cost.energy_fee_rate,
                    r.cost.power_fee_rate,
                    r.cost.energy_cost,
                    r.cost.power_cost,
                    r.cost.management_cost,
                    r.cost.base,
                    r.cost.electricity_tax,
                    r.cost.vat,
                    r.cost.total,
                    r.cost.savings,
                    r.commission.value,
                    r.commission.rule_id,
                    r.commission.basis.map(|b| b.as_str()),
                ],
            )?;
        }
        self.conn.execute(
            "UPDATE comparison SET last_calculated_at = ?1 WHERE comparison_id = ?2",
            params![run.calculated_at, comparison_id],
        )?;
        self.conn.execute(
            "INSERT INTO calculation_run (
                comparison_id, calculated_at, candidate_count,
                result_count, skipped_count, overrides
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                comparison_id,
                run.calculated_at,
                run.candidate_count as i64,
                run.result_count as i64,
                run.skipped_count as i64,
                overrides_json,
            ],
        )?;
        tx.commit()?;

        log::debug!(
            "comparison={comparison_id}: replaced {removed} stored results with {}",
            results.len()
        );
        Ok(())
    }

    /// Stored results ordered by rank (cheapest first).
    pub fn results_for(&self, comparison_id: &str) -> EngineResult<Vec<CalculationResult>> {
        let mut stmt = self.conn.prepare(
            "SELECT rank, tariff_id, provider_id, offer_name,
                    energy_fee_rate, power_fee_rate,
                    energy_cost, power_cost, management_cost, base,
                    electricity_tax, vat, total, savings,
                    commission, commission_rule, commission_basis
             FROM calculation_result
             WHERE comparison_id = ?1
             ORDER BY rank ASC",
        )?;
        let results = stmt
            .query_map(params![comparison_id], result_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(results)
    }

    pub fn result_count(&self, comparison_id: &str) -> EngineResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM calculation_result WHERE comparison_id = ?1",
            params![comparison_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Audit trail of orchestrator runs, newest first.
    pub fn calculation_runs(&self, comparison_id: &str) -> EngineResult<Vec<CalculationRun>> {
        let mut stmt = self.conn.prepare(
            "SELECT comparison_id, calculated_at, candidate_count,
                    result_count, skipped_count, overrides
             FROM calculation_run
             WHERE comparison_id = ?1
             ORDER BY id DESC",
        )?;
        let runs = stmt
            .query_map(params![comparison_id], |row| {
                let overrides: Option<String> = row.get(5)?;
                let overrides = overrides
                    .map(|json| serde_json::from_str::<CalculationOverrides>(&json))
                    .transpose()
                    .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?;
                Ok(CalculationRun {
                    comparison_id:   row.get(0)?,
                    calculated_at:   row.get(1)?,
                    candidate_count: row.get::<_, i64>(2)? as usize,
                    result_count:    row.get::<_, i64>(3)? as usize,
                    skipped_count:   row.get::<_, i64>(4)? as usize,
                    overrides,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(runs)
    }
}

fn result_from_row(row: &Row<'_>) -> rusqlite::Result<CalculationResult> {
    let basis: Option<String> = row.get(16)?;
    let basis = match basis {
        Some(b) => Some(
            CommissionBasis::parse(&b).ok_or_else(|| super::unknown_label(16, "commission basis", &b))?,
        ),
        None => None,
    };
    Ok(CalculationResult {
        rank:        row.get::<_, i64>(0)? as u32,
        tariff_id:   row.get(1)?,
        provider_id: row.get(2)?,
        offer_name:  row.get(3)?,
        cost: CostBreakdown {
            energy_fee_rate: row.get(4)?,
            power_fee_rate:  row.get(5)?,
            energy_cost:     row.get(6)?,
            power_cost:      row.get(7)?,
            management_cost: row.get(8)?,
            base:            row.get(9)?,
            electricity_tax: row.get(10)?,
            vat:             row.get(11)?,
            total:           row.get(12)?,
            savings:         row.get(13)?,
        },
        commission: CommissionMatch {
            value:   row.get(14)?,
            rule_id: row.get(15)?,
            basis,
        },
    })
}
