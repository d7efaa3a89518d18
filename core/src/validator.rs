//! Validator trait and registry.
//!
//! RULE: Every internal fraud check implements FraudValidator.
//! A validator serves one category and declares the rule types it handles.
//! The registry indexes those capabilities once, when validators are
//! registered; dispatch at screening time is a map lookup.

use crate::{
    applicant::{ApplicantProfile, ApplicantSource},
    cross_verification_validator::CrossVerificationValidator,
    employment_validator::EmploymentValidator,
    error::ScreenResult,
    financial_validator::FinancialValidator,
    identity_validator::IdentityValidator,
    rule_catalogue::RuleDefinition,
    scoring::Flag,
    types::{RuleCategory, Severity},
};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Everything a validator may look at.
pub struct ValidationContext<'a> {
    pub applicant: &'a ApplicantProfile,
    /// For checks that compare against other applicants.
    pub applicants: &'a dyn ApplicantSource,
    /// Reference date for age and tenure checks.
    pub today: NaiveDate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationOutcome {
    pub triggered: bool,
    pub weight: u32,
    pub severity: Severity,
    pub category: RuleCategory,
    pub description: String,
    pub detail: String,
}

impl ValidationOutcome {
    pub fn clear(rule: &RuleDefinition) -> Self {
        Self {
            triggered: false,
            weight: 0,
            severity: rule.severity,
            category: rule.category,
            description: String::new(),
            detail: String::new(),
        }
    }

    /// Weight and severity always come from the rule as configured.
    pub fn triggered(rule: &RuleDefinition, detail: impl Into<String>) -> Self {
        let description = if rule.description.is_empty() {
            rule.name.clone()
        } else {
            rule.description.clone()
        };
        Self {
            triggered: true,
            weight: rule.weight,
            severity: rule.severity,
            category: rule.category,
            description,
            detail: detail.into(),
        }
    }

    pub fn into_flag(self, rule: &RuleDefinition) -> Option<Flag> {
        if !self.triggered {
            return None;
        }
        Some(Flag {
            rule_code: rule.code.clone(),
            rule_name: rule.name.clone(),
            category: self.category.into(),
            severity: self.severity,
            weight: self.weight,
            description: self.description,
            detail: self.detail,
        })
    }
}

/// The contract every internal fraud check fulfills.
pub trait FraudValidator: Send + Sync {
    /// Stable name used in logs.
    fn name(&self) -> &'static str;

    fn category(&self) -> RuleCategory;

    /// Rule types this validator evaluates. Empty means any type in its category.
    fn supported_types(&self) -> &'static [&'static str];

    fn can_handle(&self, rule: &RuleDefinition) -> bool {
        let types = self.supported_types();
        rule.category == self.category()
            && (types.is_empty() || types.contains(&rule.rule_type.as_str()))
    }

    /// Evaluate one rule. Must not depend on anything but the rule and context.
    fn validate(&self, rule: &RuleDefinition, ctx: &ValidationContext<'_>) -> ScreenResult<ValidationOutcome>;
}

#[derive(Default)]
pub struct ValidatorRegistry {
    validators: Vec<Box<dyn FraudValidator>>,
    by_type: BTreeMap<RuleCategory, BTreeMap<&'static str, usize>>,
    any_type: BTreeMap<RuleCategory, usize>,
}

impl ValidatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The four built-in validators, one per category.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(IdentityValidator));
        registry.register(Box::new(FinancialValidator));
        registry.register(Box::new(EmploymentValidator));
        registry.register(Box::new(CrossVerificationValidator));
        registry
    }

    /// Earlier registrations win when capabilities overlap.
    pub fn register(&mut self, validator: Box<dyn FraudValidator>) {
        let idx = self.validators.len();
        let category = validator.category();
        let types = validator.supported_types();
        if types.is_empty() {
            self.any_type.entry(category).or_insert(idx);
        } else {
            let slot = self.by_type.entry(category).or_default();
            for t in types {
                slot.entry(*t).or_insert(idx);
            }
        }
        self.validators.push(validator);
    }

    pub fn resolve(&self, rule: &RuleDefinition) -> Option<&dyn FraudValidator> {
        let specific = self
            .by_type
            .get(&rule.category)
            .and_then(|m| m.get(rule.rule_type.as_str()))
            .copied();
        let wildcard = self.any_type.get(&rule.category).copied();
        let idx = match (specific, wildcard) {
            (Some(a), Some(b)) => a.min(b),
            (a, b) => a.or(b)?,
        };
        self.validators.get(idx).map(|v| v.as_ref())
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}
