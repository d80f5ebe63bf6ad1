//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! The engine calls store methods; it never executes SQL directly.

use crate::{error::EngineResult, types::{PeriodValues, PERIOD_COUNT}};
mod catalog;
mod comparison;
mod result;
pub use catalog::UnreadableTariff;
use rusqlite::{types::Type, Connection, Row};

pub struct TariffStore {
    conn: Connection,
    path: Option<String>, // None for :memory:, Some(path) for file
}

impl TariffStore {
    /// Open (or create) the database at `path`.
    pub fn open(path: &str) -> EngineResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        log::debug!("store: opened {path}");
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> EngineResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn, path: None })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> EngineResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_catalog.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/002_comparison.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/003_results.sql"))?;
        Ok(())
    }

    /// Flush WAL and drop the connection.
    pub fn close(self) -> EngineResult<()> {
        if self.path.is_some() {
            let _ = self.conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);");
        }
        self.conn.close().map_err(|(_, e)| e)?;
        Ok(())
    }
}

// ── Row helpers ────────────────────────────────────────────────────

/// Read six consecutive nullable REAL columns starting at `first`.
fn period_values(row: &Row<'_>, first: usize) -> rusqlite::Result<PeriodValues> {
    let mut values = [None; PERIOD_COUNT];
    for (i, slot) in values.iter_mut().enumerate() {
        *slot = row.get::<_, Option<f64>>(first + i)?;
    }
    Ok(PeriodValues::new(values))
}

/// Conversion failure for a text column holding an unknown enum label.
fn unknown_label(column: usize, what: &str, value: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        column,
        Type::Text,
        anyhow::anyhow!("unknown {what} '{value}'").into(),
    )
}

/// True for errors caused by one row's contents rather than the database.
fn is_row_decode_error(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::FromSqlConversionFailure(..)
            | rusqlite::Error::InvalidColumnType(..)
            | rusqlite::Error::IntegralValueOutOfRange(..)
    )
}
