//! External rule engine: fixed checks against the matched registry person.
//!
//! Check order:
//!   1. Criminal history
//!   2. Loan history
//!   3. Bank records
//!   4. Document verification
//!
//! RULE: perform_check never fails. A fault in any step becomes one
//! EXTERNAL_SYSTEM_ERROR flag and the flags gathered so far are kept.

use crate::{
    config::{ExternalRulesConfig, ScreeningConfig},
    error::{ScreenError, ScreenResult},
    identifiers::{mask, Identifiers},
    identity_matcher::{IdentityMatcher, MatchOutcome},
    registry::{CaseStatus, DocumentStatus, RegistrySource, RetryPolicy, RetryingRegistry},
    scoring::{Flag, RegistryFindings, ScoringResult, Subject},
    types::{FlagCategory, PersonId, RiskLevel, Severity},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Instant;

/// Flag raised when the registry could not be fully consulted.
pub const SYSTEM_ERROR_CODE: &str = "EXTERNAL_SYSTEM_ERROR";

/// Which checks to run. All on by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckOptions {
    pub criminal: bool,
    pub loan_history: bool,
    pub bank_records: bool,
    pub documents: bool,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self { criminal: true, loan_history: true, bank_records: true, documents: true }
    }
}

pub struct ExternalRuleEngine {
    rules: ExternalRulesConfig,
    retry: RetryPolicy,
}

impl ExternalRuleEngine {
    pub fn new(rules: ExternalRulesConfig, retry: RetryPolicy) -> Self {
        Self { rules, retry }
    }

    pub fn from_config(cfg: &ScreeningConfig) -> Self {
        Self::new(cfg.external.clone(), RetryPolicy::from_config(&cfg.registry))
    }

    pub fn perform_check(
        &self,
        registry: &dyn RegistrySource,
        identifiers: &Identifiers,
        options: &CheckOptions,
    ) -> ScoringResult {
        let started = Instant::now();
        let mut result = ScoringResult::new(Subject::Unmatched);
        let mut findings = RegistryFindings::default();
        let registry = RetryingRegistry::new(registry, self.retry);

        if let Err(e) = self.run_checks(&registry, identifiers, options, &mut result, &mut findings) {
            log::warn!("external screening for {} failed: {e}", identifiers.masked());
            self.push_system_error(&mut result, &e);
        }
        self.complete(result, findings, started)
    }

    /// Result for a screening that never produced one of its own.
    pub fn fault_result(&self, fault: &ScreenError, started: Instant) -> ScoringResult {
        let mut result = ScoringResult::new(Subject::Unmatched);
        self.push_system_error(&mut result, fault);
        self.complete(result, RegistryFindings::default(), started)
    }

    fn run_checks(
        &self,
        registry: &dyn RegistrySource,
        identifiers: &Identifiers,
        options: &CheckOptions,
        result: &mut ScoringResult,
        findings: &mut RegistryFindings,
    ) -> ScreenResult<()> {
        let matched = match IdentityMatcher::new(registry).resolve(identifiers)? {
            MatchOutcome::Matched(m) => m,
            MatchOutcome::NotFound => {
                log::info!("registry: no person found for {}", identifiers.masked());
                return Ok(());
            }
        };

        let person_id = matched.person.person_id;
        result.subject = Subject::Person(person_id);
        findings.person_found = true;
        findings.person_id = Some(person_id);
        findings.matched_by = Some(matched.matched_by);
        findings.match_candidates = matched.candidates;
        findings.ambiguous_match = matched.is_ambiguous();

        if options.criminal {
            self.check_criminal(registry, person_id, result, findings)?;
        }
        if options.loan_history {
            self.check_loans(registry, person_id, result, findings)?;
        }
        if options.bank_records {
            self.check_bank_records(registry, person_id, result, findings)?;
        }
        if options.documents {
            self.check_documents(registry, person_id, result, findings)?;
        }
        Ok(())
    }

    fn check_criminal(
        &self,
        registry: &dyn RegistrySource,
        person_id: PersonId,
        result: &mut ScoringResult,
        findings: &mut RegistryFindings,
    ) -> ScreenResult<()> {
        let records = registry.criminal_records(person_id)?;
        let convicted: Vec<_> = records.iter().filter(|r| r.status == CaseStatus::Convicted).collect();
        let open: Vec<_> = records.iter().filter(|r| r.status == CaseStatus::Open).collect();

        findings.total_criminal_cases = records.len() as u32;
        findings.convicted_cases = convicted.len() as u32;
        findings.open_cases = open.len() as u32;
        findings.criminal_case_types = records
            .iter()
            .map(|r| r.case_type.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        if !convicted.is_empty() {
            let types: BTreeSet<&str> = convicted.iter().map(|r| r.case_type.as_str()).collect();
            result.push_flag(flag(
                "CRIMINAL_CONVICTION",
                "Criminal Conviction",
                FlagCategory::Criminal,
                Severity::Critical,
                self.rules.conviction_weight,
                format!("Person has {} criminal conviction(s)", convicted.len()),
                format!("Case types: {}", join(types)),
            ));
        }
        if !open.is_empty() {
            let types: BTreeSet<&str> = open.iter().map(|r| r.case_type.as_str()).collect();
            result.push_flag(flag(
                "CRIMINAL_OPEN_CASE",
                "Open Criminal Case",
                FlagCategory::Criminal,
                Severity::High,
                self.rules.open_case_weight,
                format!("Person has {} open criminal case(s)", open.len()),
                format!("Pending case types: {}", join(types)),
            ));
        }
        Ok(())
    }

    fn check_loans(
        &self,
        registry: &dyn RegistrySource,
        person_id: PersonId,
        result: &mut ScoringResult,
        findings: &mut RegistryFindings,
    ) -> ScreenResult<()> {
        let loans = registry.loans(person_id)?;
        if loans.is_empty() {
            return Ok(());
        }
        let active = loans.iter().filter(|l| l.is_active()).count() as u32;
        let defaulted = loans.iter().filter(|l| l.is_defaulted()).count() as u32;
        let outstanding: f64 = loans.iter().map(|l| l.outstanding_balance).sum();

        findings.total_loans = loans.len() as u32;
        findings.active_loans = active;
        findings.defaulted_loans = defaulted;
        findings.total_outstanding = outstanding;
        findings.worst_loan_status = loans.iter().map(|l| l.status).max();

        if defaulted > 0 {
            let (weight, severity) = match defaulted {
                1 => (self.rules.default_weights[0], Severity::Medium),
                2 => (self.rules.default_weights[1], Severity::High),
                _ => (self.rules.default_weights[2], Severity::Critical),
            };
            result.push_flag(flag(
                "LOAN_DEFAULT_HISTORY",
                "Loan Default History",
                FlagCategory::LoanHistory,
                severity,
                weight,
                format!("Person has {defaulted} defaulted loan(s)"),
                format!("Total defaulted loans: {defaulted}, total outstanding: {outstanding:.2}"),
            ));
        }
        if active >= self.rules.active_loans_threshold {
            result.push_flag(flag(
                "MULTIPLE_ACTIVE_LOANS",
                "Multiple Active Loans",
                FlagCategory::LoanHistory,
                Severity::High,
                self.rules.active_loans_weight,
                format!("Person has {active} active loans"),
                "Active loans may indicate over-leveraging".to_string(),
            ));
        }
        if outstanding > self.rules.high_debt_threshold {
            result.push_flag(flag(
                "HIGH_OUTSTANDING_DEBT",
                "High Outstanding Debt",
                FlagCategory::LoanHistory,
                Severity::High,
                self.rules.high_debt_weight,
                format!("Total outstanding debt {outstanding:.2} exceeds {:.2}", self.rules.high_debt_threshold),
                format!("Across {} loan(s)", loans.len()),
            ));
        }
        Ok(())
    }

    fn check_bank_records(
        &self,
        registry: &dyn RegistrySource,
        person_id: PersonId,
        result: &mut ScoringResult,
        findings: &mut RegistryFindings,
    ) -> ScreenResult<()> {
        let accounts = registry.bank_accounts(person_id)?;
        let total = accounts.len() as u32;
        let inactive = accounts.iter().filter(|a| !a.is_active).count() as u32;

        findings.total_bank_accounts = total;
        findings.inactive_bank_accounts = inactive;
        findings.total_bank_balance = accounts.iter().map(|a| a.balance).sum();

        if total >= self.rules.bank_accounts_threshold {
            result.push_flag(flag(
                "EXCESSIVE_BANK_ACCOUNTS",
                "Excessive Bank Accounts",
                FlagCategory::BankRecords,
                Severity::Medium,
                self.rules.bank_accounts_weight,
                format!("Person holds {total} bank accounts"),
                format!("Threshold is {}", self.rules.bank_accounts_threshold),
            ));
        }
        if inactive >= self.rules.inactive_accounts_threshold {
            result.push_flag(flag(
                "MULTIPLE_INACTIVE_ACCOUNTS",
                "Multiple Inactive Accounts",
                FlagCategory::BankRecords,
                Severity::Medium,
                self.rules.inactive_accounts_weight,
                format!("Person has {inactive} inactive bank accounts"),
                "Suspicious pattern of dormant accounts".to_string(),
            ));
        }
        Ok(())
    }

    fn check_documents(
        &self,
        registry: &dyn RegistrySource,
        person_id: PersonId,
        result: &mut ScoringResult,
        findings: &mut RegistryFindings,
    ) -> ScreenResult<()> {
        for doc in registry.documents(person_id)? {
            let number = mask(&doc.document_number);
            match doc.verification_status {
                DocumentStatus::Expired => {
                    let when = doc
                        .expiry_date
                        .map(|d| format!(" on {d}"))
                        .unwrap_or_default();
                    findings.document_issues.push(format!("{} {number} expired", doc.document_type));
                    result.push_flag(flag(
                        "EXPIRED_DOCUMENT",
                        "Expired Document",
                        FlagCategory::DocumentVerification,
                        Severity::Medium,
                        self.rules.expired_document_weight,
                        format!("{} document has expired", doc.document_type),
                        format!("Document {number} expired{when}"),
                    ));
                }
                DocumentStatus::Unverified => {
                    findings.document_issues.push(format!("{} {number} unverified", doc.document_type));
                    result.push_flag(flag(
                        "UNVERIFIED_DOCUMENT",
                        "Unverified Document",
                        FlagCategory::DocumentVerification,
                        Severity::Medium,
                        self.rules.unverified_document_weight,
                        format!("{} document is not verified", doc.document_type),
                        format!("Document {number} awaiting verification"),
                    ));
                }
                DocumentStatus::Verified => {}
            }
        }
        Ok(())
    }

    fn push_system_error(&self, result: &mut ScoringResult, fault: &ScreenError) {
        result.push_flag(flag(
            SYSTEM_ERROR_CODE,
            "External System Error",
            FlagCategory::System,
            Severity::Medium,
            self.rules.system_error_weight,
            "Error occurred during external fraud screening".to_string(),
            fault.to_string(),
        ));
    }

    fn complete(&self, mut result: ScoringResult, mut findings: RegistryFindings, started: Instant) -> ScoringResult {
        result.classify(&self.rules.risk_bands);
        // A conviction alone must not read as a medium risk.
        if findings.convicted_cases > 0 {
            result.raise_floor(RiskLevel::High);
        }
        let max = self.rules.max_possible_score.max(1) as f64;
        findings.risk_score_percentage = (result.total_score as f64 / max * 100.0).min(100.0);
        result.findings = Some(findings);
        result.finish(started);
        result
    }
}

fn flag(
    code: &str,
    name: &str,
    category: FlagCategory,
    severity: Severity,
    weight: u32,
    description: String,
    detail: String,
) -> Flag {
    Flag {
        rule_code: code.to_string(),
        rule_name: name.to_string(),
        category,
        severity,
        weight,
        description,
        detail,
    }
}

fn join(items: BTreeSet<&str>) -> String {
    items.into_iter().collect::<Vec<_>>().join(", ")
}
