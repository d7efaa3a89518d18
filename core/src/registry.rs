//! External "known persons" registry: record types and lookup contract.
//!
//! RULE: The registry is reference data owned elsewhere. Nothing in the
//! screening path writes to it; imports go through the store directly.

use crate::{
    config::RegistryConnectionConfig,
    error::{ScreenError, ScreenResult},
    identifiers::{mask, IdentifierKind},
    types::PersonId,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

// ── Records ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryPerson {
    pub person_id: PersonId,
    pub full_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub pan_number: Option<String>,
    pub aadhaar_number: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaseStatus {
    Open,
    Closed,
    Convicted,
    Acquitted,
}

impl CaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Closed => "CLOSED",
            Self::Convicted => "CONVICTED",
            Self::Acquitted => "ACQUITTED",
        }
    }
}

impl FromStr for CaseStatus {
    type Err = ScreenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "OPEN" | "PENDING" => Ok(Self::Open),
            "CLOSED" => Ok(Self::Closed),
            "CONVICTED" => Ok(Self::Convicted),
            "ACQUITTED" => Ok(Self::Acquitted),
            _ => Err(ScreenError::InvalidValue { field: "case status", value: s.to_string() }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriminalRecord {
    pub person_id: PersonId,
    pub case_number: String,
    pub case_type: String,
    pub court_name: Option<String>,
    pub status: CaseStatus,
    pub verdict_date: Option<NaiveDate>,
}

/// Loan status, declared from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanStatus {
    Closed,
    Active,
    Defaulted,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "CLOSED",
            Self::Active => "ACTIVE",
            Self::Defaulted => "DEFAULTED",
        }
    }
}

impl FromStr for LoanStatus {
    type Err = ScreenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CLOSED" => Ok(Self::Closed),
            "ACTIVE" => Ok(Self::Active),
            "DEFAULTED" => Ok(Self::Defaulted),
            _ => Err(ScreenError::InvalidValue { field: "loan status", value: s.to_string() }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryLoan {
    pub person_id: PersonId,
    pub loan_type: String,
    pub institution_name: String,
    pub loan_amount: f64,
    pub outstanding_balance: f64,
    pub status: LoanStatus,
    #[serde(default)]
    pub default_flag: bool,
}

impl RegistryLoan {
    pub fn is_defaulted(&self) -> bool {
        self.status == LoanStatus::Defaulted || self.default_flag
    }

    pub fn is_active(&self) -> bool {
        self.status == LoanStatus::Active && !self.default_flag
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankAccount {
    pub person_id: PersonId,
    pub bank_name: String,
    pub account_number: String,
    pub account_type: String,
    pub balance: f64,
    pub last_transaction_date: Option<NaiveDate>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentStatus {
    Verified,
    Unverified,
    Expired,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Verified => "VERIFIED",
            Self::Unverified => "UNVERIFIED",
            Self::Expired => "EXPIRED",
        }
    }
}

impl FromStr for DocumentStatus {
    type Err = ScreenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "VERIFIED" => Ok(Self::Verified),
            "UNVERIFIED" => Ok(Self::Unverified),
            "EXPIRED" => Ok(Self::Expired),
            _ => Err(ScreenError::InvalidValue { field: "document status", value: s.to_string() }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryDocument {
    pub person_id: PersonId,
    pub document_type: String,
    pub document_number: String,
    pub issued_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub verification_status: DocumentStatus,
}

// ── Bulk import ──────────────────────────────────────────────────────────────

/// A registry data drop, loaded from JSON or built by the demo population.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryImport {
    pub persons: Vec<RegistryPerson>,
    pub criminal_records: Vec<CriminalRecord>,
    pub loans: Vec<RegistryLoan>,
    pub bank_accounts: Vec<BankAccount>,
    pub documents: Vec<RegistryDocument>,
}

impl RegistryImport {
    pub fn from_json_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegistryCounts {
    pub persons: usize,
    pub criminal_records: usize,
    pub loans: usize,
    pub bank_accounts: usize,
    pub documents: usize,
}

// ── Lookup contract ──────────────────────────────────────────────────────────

/// Read access to the external registry.
///
/// Lookups take normalized identifier values. Multi-row results are in
/// ascending `person_id` order so "first" is well defined.
pub trait RegistrySource: Send + Sync {
    fn find_by_identifier(&self, kind: IdentifierKind, value: &str) -> ScreenResult<Vec<RegistryPerson>>;

    fn criminal_records(&self, person_id: PersonId) -> ScreenResult<Vec<CriminalRecord>>;

    fn loans(&self, person_id: PersonId) -> ScreenResult<Vec<RegistryLoan>>;

    fn bank_accounts(&self, person_id: PersonId) -> ScreenResult<Vec<BankAccount>>;

    fn documents(&self, person_id: PersonId) -> ScreenResult<Vec<RegistryDocument>>;
}

// ── Retry ────────────────────────────────────────────────────────────────────

/// Bounded retry for registry calls. Only transient faults are retried.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(cfg: &RegistryConnectionConfig) -> Self {
        Self {
            attempts: cfg.retry_attempts.max(1),
            backoff: Duration::from_millis(cfg.retry_backoff_ms),
        }
    }

    pub fn run<T>(&self, what: &str, mut op: impl FnMut() -> ScreenResult<T>) -> ScreenResult<T> {
        let attempts = self.attempts.max(1);
        let mut attempt = 1;
        loop {
            match op() {
                Err(e) if e.is_transient() && attempt < attempts => {
                    log::warn!("registry {what} failed (attempt {attempt}/{attempts}): {e}");
                    if !self.backoff.is_zero() {
                        std::thread::sleep(self.backoff * attempt);
                    }
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

/// A registry view that applies a `RetryPolicy` to every call.
pub struct RetryingRegistry<'a> {
    inner: &'a dyn RegistrySource,
    policy: RetryPolicy,
}

impl<'a> RetryingRegistry<'a> {
    pub fn new(inner: &'a dyn RegistrySource, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

impl RegistrySource for RetryingRegistry<'_> {
    fn find_by_identifier(&self, kind: IdentifierKind, value: &str) -> ScreenResult<Vec<RegistryPerson>> {
        let what = format!("lookup by {} {}", kind.label(), mask(value));
        self.policy.run(&what, || self.inner.find_by_identifier(kind, value))
    }

    fn criminal_records(&self, person_id: PersonId) -> ScreenResult<Vec<CriminalRecord>> {
        self.policy.run("criminal records", || self.inner.criminal_records(person_id))
    }

    fn loans(&self, person_id: PersonId) -> ScreenResult<Vec<RegistryLoan>> {
        self.policy.run("loans", || self.inner.loans(person_id))
    }

    fn bank_accounts(&self, person_id: PersonId) -> ScreenResult<Vec<BankAccount>> {
        self.policy.run("bank accounts", || self.inner.bank_accounts(person_id))
    }

    fn documents(&self, person_id: PersonId) -> ScreenResult<Vec<RegistryDocument>> {
        self.policy.run("documents", || self.inner.documents(person_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn retry_stops_after_configured_attempts() {
        let policy = RetryPolicy { attempts: 3, backoff: Duration::ZERO };
        let calls = Cell::new(0);
        let result: ScreenResult<()> = policy.run("test", || {
            calls.set(calls.get() + 1);
            Err(ScreenError::RegistryUnavailable("down".into()))
        });
        assert!(result.is_err());
        assert_eq!(calls.get(), 3, "Expected 3 attempts, got {}", calls.get());
    }

    #[test]
    fn non_transient_errors_are_not_retried() {
        let policy = RetryPolicy { attempts: 3, backoff: Duration::ZERO };
        let calls = Cell::new(0);
        let _: ScreenResult<()> = policy.run("test", || {
            calls.set(calls.get() + 1);
            Err(ScreenError::InvalidValue { field: "loan status", value: "?".into() })
        });
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn worst_loan_status_ordering() {
        assert!(LoanStatus::Defaulted > LoanStatus::Active);
        assert!(LoanStatus::Active > LoanStatus::Closed);
    }
}
