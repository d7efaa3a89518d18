//! Employment checks.

use crate::{
    applicant::whole_years_between,
    error::ScreenResult,
    rule_catalogue::{rule_types, RuleDefinition},
    types::RuleCategory,
    validator::{FraudValidator, ValidationContext, ValidationOutcome},
};

// ── Constants ────────────────────────────────────────────────────────────────

const PERSONAL_EMAIL_DOMAINS: &[&str] = &["gmail.com", "yahoo.com", "hotmail.com", "outlook.com"];

const GENERIC_EMPLOYER_WORDS: &[&str] = &[
    "company",
    "firm",
    "business",
    "shop",
    "store",
    "enterprises",
    "traders",
];

pub struct EmploymentValidator;

impl FraudValidator for EmploymentValidator {
    fn name(&self) -> &'static str {
        "employment"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Employment
    }

    fn supported_types(&self) -> &'static [&'static str] {
        &[rule_types::THRESHOLD, rule_types::PATTERN_MATCH]
    }

    fn validate(&self, rule: &RuleDefinition, ctx: &ValidationContext<'_>) -> ScreenResult<ValidationOutcome> {
        let employment = ctx.applicant.employment.as_ref();
        let employer = employment
            .and_then(|e| e.employer_name.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let detail = match rule.code.as_str() {
            "MISSING_EMPLOYMENT_DETAILS" => match employment {
                None => Some("No employment record provided".to_string()),
                Some(_) if employer.is_none() => Some("Employer name missing".to_string()),
                Some(e) if !e.monthly_income.is_some_and(|m| m > 0.0) => {
                    Some("Monthly income missing or not positive".to_string())
                }
                Some(_) => None,
            },
            "PERSONAL_EMAIL_DOMAIN_EMPLOYER" => employer.and_then(|name| {
                let lower = name.to_lowercase();
                PERSONAL_EMAIL_DOMAINS
                    .iter()
                    .find(|d| lower.contains(*d))
                    .map(|d| format!("Employer name contains personal mail domain {d}"))
            }),
            "VAGUE_EMPLOYER_NAME" => employer.and_then(|name| {
                let lower = name.to_lowercase();
                let min_len = rule.param_f64("MIN_LENGTH", 20.0);
                let generic = GENERIC_EMPLOYER_WORDS.iter().find(|w| lower.contains(*w));
                match generic {
                    Some(w) if (name.chars().count() as f64) < min_len => {
                        Some(format!("Employer name '{name}' is short and generic ('{w}')"))
                    }
                    _ => None,
                }
            }),
            "UNREALISTIC_EMPLOYMENT_DURATION" => employment.and_then(|e| e.start_date).and_then(|start| {
                let years = whole_years_between(start, ctx.today);
                let max = rule.param_f64("MAX_YEARS", 40.0);
                (years as f64 > max).then(|| format!("Employment duration of {years} years exceeds {max}"))
            }),
            "FUTURE_EMPLOYMENT_DATE" => employment
                .and_then(|e| e.start_date)
                .filter(|start| *start > ctx.today)
                .map(|start| format!("Employment start date {start} is after {}", ctx.today)),
            other => {
                log::warn!("employment validator has no check for rule {other}, skipping");
                None
            }
        };
        Ok(match detail {
            Some(d) => ValidationOutcome::triggered(rule, d),
            None => ValidationOutcome::clear(rule),
        })
    }
}
