//! SQLite persistence layer.
//!
//! RULE: Only store/ talks to the database.
//! Screening code sees the store through the ApplicantSource, RuleCatalogue
//! and RegistrySource traits and never executes SQL directly.
//!
//! The connection sits behind a Mutex so one store can be shared through an
//! Arc by the caller and the external screening worker.

use crate::{
    error::{ScreenError, ScreenResult},
    identifiers::IdentifierKind,
};
use chrono::NaiveDate;
use rusqlite::{types::Type, Connection, Row};
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

mod applicant;
mod registry;
mod rules;

pub struct ScreenStore {
    conn: Mutex<Connection>,
}

impl ScreenStore {
    pub fn open(path: &str) -> ScreenResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        log::debug!("opened screening store at {path}");
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> ScreenResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> ScreenResult<()> {
        let conn = self.conn()?;
        conn.execute_batch(include_str!("../../../migrations/001_applicants.sql"))?;
        conn.execute_batch(include_str!("../../../migrations/002_fraud_rules.sql"))?;
        conn.execute_batch(include_str!("../../../migrations/003_registry.sql"))?;
        conn.execute_batch(include_str!("../../../migrations/004_rule_audit.sql"))?;
        Ok(())
    }

    fn conn(&self) -> ScreenResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| ScreenError::StorePoisoned)
    }
}

// ── Column helpers ───────────────────────────────────────────────────────────

/// Column holding `kind` in both the applicant and registry_person tables.
fn identifier_column(kind: IdentifierKind) -> &'static str {
    match kind {
        IdentifierKind::Pan => "pan_number",
        IdentifierKind::Aadhaar => "aadhaar_number",
        IdentifierKind::Phone => "phone",
        IdentifierKind::Email => "email",
    }
}

fn conversion_error<E>(idx: usize, e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

/// Parse a TEXT column through `FromStr`.
fn parsed<T>(r: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = ScreenError>,
{
    let raw: String = r.get(idx)?;
    raw.parse().map_err(|e| conversion_error(idx, e))
}

/// Optional ISO date column. Empty text reads as NULL.
fn date(r: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    let raw: Option<String> = r.get(idx)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|e| conversion_error(idx, e)),
    }
}

fn date_text(d: Option<NaiveDate>) -> Option<String> {
    d.map(|d| d.format("%Y-%m-%d").to_string())
}
