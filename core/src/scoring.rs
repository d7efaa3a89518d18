//! Flags, score accumulation and risk classification.
//!
//! RULE: total_score is always the sum of flag weights. Flags are only
//! added through `push_flag` so the two never drift apart.

use crate::{
    identifiers::IdentifierKind,
    registry::LoanStatus,
    types::{ApplicantId, FlagCategory, PersonId, Recommendation, RiskLevel, ScreeningAction, Severity},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;

// ── Bands ────────────────────────────────────────────────────────────────────

/// Lower bounds (inclusive) of each non-clean risk level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskBands {
    pub low: u32,
    pub medium: u32,
    pub high: u32,
    pub critical: u32,
}

impl RiskBands {
    /// Monotonic step function of score.
    pub fn classify(&self, score: u32) -> RiskLevel {
        if score >= self.critical {
            RiskLevel::Critical
        } else if score >= self.high {
            RiskLevel::High
        } else if score >= self.medium {
            RiskLevel::Medium
        } else if score >= self.low {
            RiskLevel::Low
        } else {
            RiskLevel::Clean
        }
    }

    pub fn is_increasing(&self) -> bool {
        self.low < self.medium && self.medium < self.high && self.high < self.critical
    }
}

// ── Flag ─────────────────────────────────────────────────────────────────────

/// One triggered rule. Produced at most once per rule per screening.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flag {
    pub rule_code: String,
    pub rule_name: String,
    pub category: FlagCategory,
    pub severity: Severity,
    pub weight: u32,
    pub description: String,
    pub detail: String,
}

// ── Result ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Subject {
    Applicant(ApplicantId),
    Person(PersonId),
    Unmatched,
}

/// What the registry said about the matched person.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RegistryFindings {
    pub person_found: bool,
    pub person_id: Option<PersonId>,
    pub matched_by: Option<IdentifierKind>,
    pub match_candidates: usize,
    pub ambiguous_match: bool,
    pub total_criminal_cases: u32,
    pub convicted_cases: u32,
    pub open_cases: u32,
    pub criminal_case_types: Vec<String>,
    pub total_loans: u32,
    pub active_loans: u32,
    pub defaulted_loans: u32,
    pub total_outstanding: f64,
    pub worst_loan_status: Option<LoanStatus>,
    pub total_bank_accounts: u32,
    pub inactive_bank_accounts: u32,
    pub total_bank_balance: f64,
    pub document_issues: Vec<String>,
    pub risk_score_percentage: f64,
}

/// Aggregate of one screening pipeline (internal or external).
#[derive(Debug, Clone, Serialize)]
pub struct ScoringResult {
    pub subject: Subject,
    pub flags: Vec<Flag>,
    pub total_score: u32,
    pub risk_level: RiskLevel,
    pub recommendation: Recommendation,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    /// Internal only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screening_action: Option<ScreeningAction>,
    /// Internal only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_catalogue_version: Option<i64>,
    /// External only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub findings: Option<RegistryFindings>,
}

impl ScoringResult {
    pub fn new(subject: Subject) -> Self {
        let now = Utc::now();
        Self {
            subject,
            flags: Vec::new(),
            total_score: 0,
            risk_level: RiskLevel::Clean,
            recommendation: Recommendation::Approve,
            started_at: now,
            completed_at: now,
            elapsed_ms: 0,
            screening_action: None,
            rule_catalogue_version: None,
            findings: None,
        }
    }

    pub fn push_flag(&mut self, flag: Flag) {
        log::debug!(
            "flag {} severity={} weight={}: {}",
            flag.rule_code,
            flag.severity.as_str(),
            flag.weight,
            flag.description
        );
        self.total_score = self.total_score.saturating_add(flag.weight);
        self.flags.push(flag);
    }

    /// Derive level and recommendation from the current score.
    pub fn classify(&mut self, bands: &RiskBands) {
        self.risk_level = bands.classify(self.total_score);
        self.recommendation = self.risk_level.recommendation();
    }

    /// Raise the level to at least `floor`. Never lowers it.
    pub fn raise_floor(&mut self, floor: RiskLevel) {
        if self.risk_level < floor {
            self.risk_level = floor;
            self.recommendation = floor.recommendation();
        }
    }

    pub fn finish(&mut self, started: Instant) {
        self.completed_at = Utc::now();
        self.elapsed_ms = started.elapsed().as_millis() as u64;
    }

    pub fn has_flag(&self, rule_code: &str) -> bool {
        self.flags.iter().any(|f| f.rule_code == rule_code)
    }

    pub fn high_risk_flag_count(&self) -> usize {
        self.flags.iter().filter(|f| f.severity.is_high_risk()).count()
    }

    pub fn flags_by_severity(&self) -> BTreeMap<Severity, Vec<&Flag>> {
        let mut by_severity: BTreeMap<Severity, Vec<&Flag>> = BTreeMap::new();
        for flag in &self.flags {
            by_severity.entry(flag.severity).or_default().push(flag);
        }
        by_severity
    }

    pub fn convicted_cases(&self) -> u32 {
        self.findings.as_ref().map(|f| f.convicted_cases).unwrap_or(0)
    }

    pub fn defaulted_loans(&self) -> u32 {
        self.findings.as_ref().map(|f| f.defaulted_loans).unwrap_or(0)
    }

    /// Human-readable account of how the score was reached.
    pub fn explanation(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .flags
            .iter()
            .map(|f| format!("+{} {} ({}): {}", f.weight, f.rule_code, f.severity.as_str(), f.description))
            .collect();
        lines.push(format!(
            "total {} -> {} / {}",
            self.total_score, self.risk_level, self.recommendation
        ));
        lines
    }
}
