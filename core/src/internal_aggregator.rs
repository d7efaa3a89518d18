//! Internal scoring: run every enabled catalogue rule through its validator.
//!
//! Categories run in `RuleCategory::ALL` order; within a category rules run
//! by execution order, then code. Same applicant data and same snapshot
//! always give the same flags in the same order.

use crate::{
    applicant::{ApplicantProfile, ApplicantSource},
    config::{InternalScoringConfig, ScreeningConfig},
    error::ScreenResult,
    rule_catalogue::RuleSnapshot,
    scoring::{Flag, RiskBands, ScoringResult, Subject},
    types::{RuleCategory, ScreeningAction},
    validator::{ValidationContext, ValidatorRegistry},
};
use chrono::NaiveDate;
use std::time::Instant;

pub struct InternalAggregator {
    validators: ValidatorRegistry,
    bands: RiskBands,
    risk_score_threshold: u32,
}

impl InternalAggregator {
    pub fn new(validators: ValidatorRegistry, cfg: &InternalScoringConfig) -> Self {
        Self {
            validators,
            bands: cfg.risk_bands,
            risk_score_threshold: cfg.risk_score_threshold,
        }
    }

    pub fn from_config(cfg: &ScreeningConfig) -> Self {
        Self::new(ValidatorRegistry::with_defaults(), &cfg.internal)
    }

    /// Flags raised by the enabled rules of one category.
    pub fn validate_category(
        &self,
        category: RuleCategory,
        rules: &RuleSnapshot,
        ctx: &ValidationContext<'_>,
    ) -> ScreenResult<Vec<Flag>> {
        let mut flags = Vec::new();
        for rule in rules.enabled_in(category) {
            let Some(validator) = self.validators.resolve(rule).filter(|v| v.can_handle(rule)) else {
                log::warn!(
                    "no validator for rule {} ({} / {}), skipping",
                    rule.code,
                    category.as_str(),
                    rule.rule_type
                );
                continue;
            };
            let outcome = validator.validate(rule, ctx)?;
            if let Some(flag) = outcome.into_flag(rule) {
                flags.push(flag);
            }
        }
        Ok(flags)
    }

    pub fn screen(
        &self,
        applicant: &ApplicantProfile,
        applicants: &dyn ApplicantSource,
        rules: &RuleSnapshot,
        today: NaiveDate,
    ) -> ScreenResult<ScoringResult> {
        let started = Instant::now();
        let mut result = ScoringResult::new(Subject::Applicant(applicant.applicant_id));
        result.rule_catalogue_version = Some(rules.version);

        let ctx = ValidationContext { applicant, applicants, today };
        for category in RuleCategory::ALL {
            for flag in self.validate_category(category, rules, &ctx)? {
                result.push_flag(flag);
            }
        }

        result.classify(&self.bands);
        result.screening_action = Some(ScreeningAction::for_score(result.total_score, self.risk_score_threshold));
        result.finish(started);

        log::info!(
            "applicant={} internal: score={} level={} flags={} rules_v={}",
            applicant.applicant_id,
            result.total_score,
            result.risk_level,
            result.flags.len(),
            rules.version
        );
        Ok(result)
    }
}
