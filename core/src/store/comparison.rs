use super::{period_values, TariffStore};
use crate::{
    comparison::{CustomerProfile, NewComparison},
    error::{EngineError, EngineResult},
};
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};

const COMPARISON_COLUMNS: &str = "comparison_id, customer_name, annual_consumption,
    consumption_p1, consumption_p2, consumption_p3, consumption_p4, consumption_p5, consumption_p6,
    power_p1, power_p2, power_p3, power_p4, power_p5, power_p6,
    tariff_class, current_provider, current_bill, created_at, last_calculated_at";

impl TariffStore {
    /// Validate and persist a new customer profile.
    /// A v4 UUID is assigned when the input carries no id.
    pub fn create_comparison(&self, input: NewComparison) -> EngineResult<CustomerProfile> {
        input.validate()?;
        let comparison_id = input
            .comparison_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        if self.comparison_exists(&comparison_id)? {
            return Err(EngineError::validation(format!(
                "comparison {comparison_id} already exists"
            )));
        }

        let profile = input.into_profile(comparison_id, Utc::now());
        let c = &profile.consumption;
        let p = &profile.contracted_power;
        self.conn.execute(
            &format!(
                "INSERT INTO comparison ({COMPARISON_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                         ?16, ?17, ?18, ?19, ?20)"
            ),
            params![
                profile.comparison_id,
                profile.customer_name,
                profile.annual_consumption,
                c.get(0), c.get(1), c.get(2), c.get(3), c.get(4), c.get(5),
                p.get(0), p.get(1), p.get(2), p.get(3), p.get(4), p.get(5),
                profile.tariff_class,
                profile.current_provider,
                profile.current_bill,
                profile.created_at,
                profile.last_calculated_at,
            ],
        )?;
        log::info!(
            "comparison={}: created ({} kWh/year, class {})",
            profile.comparison_id, profile.annual_consumption, profile.tariff_class
        );
        Ok(profile)
    }

    pub fn comparison(&self, comparison_id: &str) -> EngineResult<Option<CustomerProfile>> {
        let profile = self
            .conn
            .query_row(
                &format!("SELECT {COMPARISON_COLUMNS} FROM comparison WHERE comparison_id = ?1"),
                params![comparison_id],
                comparison_from_row,
            )
            .optional()?;
        Ok(profile)
    }

    pub fn comparison_exists(&self, comparison_id: &str) -> EngineResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM comparison WHERE comparison_id = ?1",
            params![comparison_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

fn comparison_from_row(row: &Row<'_>) -> rusqlite::Result<CustomerProfile> {
    Ok(CustomerProfile {
        comparison_id:      row.get(0)?,
        customer_name:      row.get(1)?,
        annual_consumption: row.get(2)?,
        consumption:        period_values(row, 3)?,
        contracted_power:   period_values(row, 9)?,
        tariff_class:       row.get(15)?,
        current_provider:   row.get(16)?,
        current_bill:       row.get(17)?,
        created_at:         row.get(18)?,
        last_calculated_at: row.get(19)?,
    })
}
