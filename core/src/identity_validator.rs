//! Identity checks: duplicate identifiers, identifier formats, age range.

use crate::{
    applicant::whole_years_between,
    error::ScreenResult,
    identifiers::{is_valid_aadhaar, is_valid_pan, mask, IdentifierKind},
    rule_catalogue::{rule_types, RuleDefinition},
    types::{ApplicantId, RuleCategory},
    validator::{FraudValidator, ValidationContext, ValidationOutcome},
};

// ── Constants ────────────────────────────────────────────────────────────────

const DEFAULT_MIN_AGE: f64 = 18.0;
const DEFAULT_MAX_AGE: f64 = 80.0;

pub struct IdentityValidator;

impl FraudValidator for IdentityValidator {
    fn name(&self) -> &'static str {
        "identity"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Identity
    }

    fn supported_types(&self) -> &'static [&'static str] {
        &[rule_types::DUPLICATE_CHECK, rule_types::PATTERN_MATCH, rule_types::THRESHOLD]
    }

    fn validate(&self, rule: &RuleDefinition, ctx: &ValidationContext<'_>) -> ScreenResult<ValidationOutcome> {
        match rule.code.as_str() {
            "DUPLICATE_AADHAAR" => duplicate_identifier(rule, ctx, IdentifierKind::Aadhaar),
            "DUPLICATE_PAN" => duplicate_identifier(rule, ctx, IdentifierKind::Pan),
            "DUPLICATE_PHONE" => duplicate_identifier(rule, ctx, IdentifierKind::Phone),
            "DUPLICATE_EMAIL" => duplicate_identifier(rule, ctx, IdentifierKind::Email),
            "INVALID_PAN_FORMAT" => Ok(malformed_identifier(rule, ctx, IdentifierKind::Pan, is_valid_pan)),
            "INVALID_AADHAAR_FORMAT" => {
                Ok(malformed_identifier(rule, ctx, IdentifierKind::Aadhaar, is_valid_aadhaar))
            }
            "AGE_OUT_OF_RANGE" => Ok(age_out_of_range(rule, ctx)),
            other => {
                log::warn!("identity validator has no check for rule {other}, skipping");
                Ok(ValidationOutcome::clear(rule))
            }
        }
    }
}

/// Triggers when any other applicant holds the same normalized identifier.
fn duplicate_identifier(
    rule: &RuleDefinition,
    ctx: &ValidationContext<'_>,
    kind: IdentifierKind,
) -> ScreenResult<ValidationOutcome> {
    let own = match ctx.applicant.identifier(kind).and_then(|v| kind.normalize(v)) {
        Some(v) => v,
        None => return Ok(ValidationOutcome::clear(rule)),
    };

    let mut others: Vec<ApplicantId> = ctx
        .applicants
        .identifier_holders(kind)?
        .into_iter()
        .filter(|(id, _)| *id != ctx.applicant.applicant_id)
        .filter(|(_, raw)| kind.normalize(raw).as_deref() == Some(own.as_str()))
        .map(|(id, _)| id)
        .collect();
    others.sort_unstable();
    others.dedup();

    if others.is_empty() {
        return Ok(ValidationOutcome::clear(rule));
    }

    let ids: Vec<String> = others.iter().map(|id| id.to_string()).collect();
    Ok(ValidationOutcome::triggered(
        rule,
        format!(
            "{} other applicant(s) share this {} ({}): applicant IDs {}",
            others.len(),
            kind.label(),
            mask(&own),
            ids.join(", ")
        ),
    ))
}

fn malformed_identifier(
    rule: &RuleDefinition,
    ctx: &ValidationContext<'_>,
    kind: IdentifierKind,
    is_valid: fn(&str) -> bool,
) -> ValidationOutcome {
    match ctx.applicant.identifier(kind).and_then(|v| kind.normalize(v)) {
        Some(v) if !is_valid(&v) => ValidationOutcome::triggered(
            rule,
            format!("{} {} is not a valid {} number", kind.label(), mask(&v), kind.label()),
        ),
        _ => ValidationOutcome::clear(rule),
    }
}

fn age_out_of_range(rule: &RuleDefinition, ctx: &ValidationContext<'_>) -> ValidationOutcome {
    let Some(dob) = ctx.applicant.date_of_birth else {
        return ValidationOutcome::clear(rule);
    };
    let min_age = rule.param_f64("MIN_AGE", DEFAULT_MIN_AGE);
    let max_age = rule.param_f64("MAX_AGE", DEFAULT_MAX_AGE);
    let age = whole_years_between(dob, ctx.today) as f64;
    if age < min_age || age > max_age {
        ValidationOutcome::triggered(
            rule,
            format!("Applicant age {age} outside allowed range {min_age}-{max_age}"),
        )
    } else {
        ValidationOutcome::clear(rule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        applicant::{ApplicantProfile, ApplicantSource},
        rule_catalogue::default_rules,
    };
    use chrono::NaiveDate;

    /// Applicants keyed by identifier kind, raw values as submitted.
    struct Holders(Vec<(IdentifierKind, ApplicantId, &'static str)>);

    impl ApplicantSource for Holders {
        fn applicant_profile(&self, _: ApplicantId) -> ScreenResult<Option<ApplicantProfile>> {
            Ok(None)
        }
        fn identifier_holders(&self, kind: IdentifierKind) -> ScreenResult<Vec<(ApplicantId, String)>> {
            Ok(self
                .0
                .iter()
                .filter(|(k, _, _)| *k == kind)
                .map(|(_, id, raw)| (*id, raw.to_string()))
                .collect())
        }
        fn applicant_ids(&self) -> ScreenResult<Vec<ApplicantId>> {
            Ok(self.0.iter().map(|(_, id, _)| *id).collect())
        }
    }

    fn rule(code: &str) -> RuleDefinition {
        default_rules()
            .unwrap()
            .into_iter()
            .find(|r| r.code == code)
            .unwrap()
    }

    fn run(code: &str, applicant: &ApplicantProfile, holders: &Holders) -> ValidationOutcome {
        let ctx = ValidationContext {
            applicant,
            applicants: holders,
            today: NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
        };
        IdentityValidator.validate(&rule(code), &ctx).unwrap()
    }

    #[test]
    fn duplicate_phone_matches_across_formats() {
        let me = ApplicantProfile {
            applicant_id: 2,
            phone: Some("9876543210".into()),
            ..Default::default()
        };
        let holders = Holders(vec![
            (IdentifierKind::Phone, 1, "+91 98765-43210"),
            (IdentifierKind::Phone, 2, "9876543210"),
            (IdentifierKind::Phone, 3, "9000000000"),
        ]);

        let out = run("DUPLICATE_PHONE", &me, &holders);
        assert!(out.triggered);
        assert_eq!(out.weight, 20);
        assert!(out.detail.contains("applicant IDs 1"), "Got {}", out.detail);
        assert!(!out.detail.contains("9876543210"), "Unmasked: {}", out.detail);
    }

    #[test]
    fn own_identifier_alone_is_not_a_duplicate() {
        let me = ApplicantProfile {
            applicant_id: 5,
            pan_number: Some("ABCPK1234L".into()),
            ..Default::default()
        };
        let holders = Holders(vec![(IdentifierKind::Pan, 5, "abcpk1234l")]);
        assert!(!run("DUPLICATE_PAN", &me, &holders).triggered);
    }

    #[test]
    fn malformed_pan_and_underage_trigger() {
        let me = ApplicantProfile {
            applicant_id: 1,
            pan_number: Some("ABC1234".into()),
            date_of_birth: NaiveDate::from_ymd_opt(2008, 6, 1),
            ..Default::default()
        };
        let holders = Holders(Vec::new());
        assert!(run("INVALID_PAN_FORMAT", &me, &holders).triggered);
        let age = run("AGE_OUT_OF_RANGE", &me, &holders);
        assert!(age.triggered);
        assert!(age.detail.contains("17"), "Got {}", age.detail);
    }

    /// A twelve-digit Aadhaar with a broken check digit is flagged; a good one is not.
    #[test]
    fn aadhaar_checksum_is_enforced() {
        let holders = Holders(Vec::new());
        let good = crate::identifiers::aadhaar_with_check_digit("49871234560").unwrap();
        let last = good.as_bytes()[11];
        let bad = format!("{}{}", &good[..11], if last == b'9' { '0' } else { (last + 1) as char });

        let ok = ApplicantProfile { applicant_id: 1, aadhaar_number: Some(good), ..Default::default() };
        assert!(!run("INVALID_AADHAAR_FORMAT", &ok, &holders).triggered);
        let broken = ApplicantProfile { applicant_id: 2, aadhaar_number: Some(bad), ..Default::default() };
        let out = run("INVALID_AADHAAR_FORMAT", &broken, &holders);
        assert!(out.triggered, "Expected a checksum failure, got {}", out.detail);
    }
}
