//! Shared primitive types used across the screening pipeline.

use crate::error::ScreenError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Row id of an applicant in the applicant-data store.
pub type ApplicantId = i64;

/// Row id of a person in the external registry.
pub type PersonId = i64;

// ── Severity ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }

    pub fn is_high_risk(&self) -> bool {
        matches!(self, Self::High | Self::Critical)
    }
}

impl FromStr for Severity {
    type Err = ScreenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOW" => Ok(Self::Low),
            "MEDIUM" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            "CRITICAL" => Ok(Self::Critical),
            _ => Err(ScreenError::InvalidValue { field: "severity", value: s.to_string() }),
        }
    }
}

// ── Risk level / recommendation ──────────────────────────────────────────────

/// Ordinal risk classification. Declaration order is the ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Clean,
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clean => "CLEAN",
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }

    /// The action implied by a level on its own.
    pub fn recommendation(self) -> Recommendation {
        match self {
            Self::Clean => Recommendation::Approve,
            Self::Low | Self::Medium => Recommendation::Review,
            Self::High | Self::Critical => Recommendation::Reject,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    Approve,
    Review,
    Reject,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "APPROVE",
            Self::Review => "REVIEW",
            Self::Reject => "REJECT",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Workflow band derived from the internal risk score threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScreeningAction {
    ApproveRejectAllowed,
    EscalateToCompliance,
}

impl ScreeningAction {
    pub fn for_score(total_score: u32, risk_score_threshold: u32) -> Self {
        if total_score >= risk_score_threshold {
            Self::EscalateToCompliance
        } else {
            Self::ApproveRejectAllowed
        }
    }
}

// ── Categories ───────────────────────────────────────────────────────────────

/// Category of an internal rule. Each validator serves exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleCategory {
    Identity,
    Financial,
    Employment,
    CrossVerification,
}

impl RuleCategory {
    /// Evaluation order used by the internal aggregator.
    pub const ALL: [RuleCategory; 4] = [
        Self::Identity,
        Self::Financial,
        Self::Employment,
        Self::CrossVerification,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Identity => "IDENTITY",
            Self::Financial => "FINANCIAL",
            Self::Employment => "EMPLOYMENT",
            Self::CrossVerification => "CROSS_VERIFICATION",
        }
    }
}

impl FromStr for RuleCategory {
    type Err = ScreenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "IDENTITY" => Ok(Self::Identity),
            "FINANCIAL" => Ok(Self::Financial),
            "EMPLOYMENT" => Ok(Self::Employment),
            "CROSS_VERIFICATION" => Ok(Self::CrossVerification),
            _ => Err(ScreenError::InvalidValue { field: "rule category", value: s.to_string() }),
        }
    }
}

/// Category carried on a flag. Covers both internal and external checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlagCategory {
    Identity,
    Financial,
    Employment,
    CrossVerification,
    Criminal,
    LoanHistory,
    BankRecords,
    DocumentVerification,
    System,
}

impl From<RuleCategory> for FlagCategory {
    fn from(c: RuleCategory) -> Self {
        match c {
            RuleCategory::Identity => Self::Identity,
            RuleCategory::Financial => Self::Financial,
            RuleCategory::Employment => Self::Employment,
            RuleCategory::CrossVerification => Self::CrossVerification,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlagSource {
    Internal,
    External,
}

// ── Loan type ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanType {
    Personal,
    Home,
    Vehicle,
    Education,
    Business,
    Gold,
    Other,
}

impl LoanType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Personal => "personal",
            Self::Home => "home",
            Self::Vehicle => "vehicle",
            Self::Education => "education",
            Self::Business => "business",
            Self::Gold => "gold",
            Self::Other => "other",
        }
    }
}

impl FromStr for LoanType {
    type Err = ScreenError;

    /// Unknown names map to `Other` so legacy loan types still screen.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "personal" => Self::Personal,
            "home" => Self::Home,
            "vehicle" | "car" | "auto" => Self::Vehicle,
            "education" => Self::Education,
            "business" => Self::Business,
            "gold" => Self::Gold,
            _ => Self::Other,
        })
    }
}
