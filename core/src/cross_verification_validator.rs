//! Cross-verification: application data against uploaded documents and
//! the bank statement.
//!
//! Document values arrive as extracted fields. A field no document yielded
//! is not a mismatch; only a value that disagrees is.

use crate::{
    applicant::{ApplicantProfile, ExtractedFieldName},
    error::ScreenResult,
    identifiers::{is_valid_ifsc, mask, IdentifierKind},
    rule_catalogue::{rule_types, RuleDefinition},
    types::RuleCategory,
    validator::{FraudValidator, ValidationContext, ValidationOutcome},
};
use chrono::NaiveDate;

const DOB_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y"];

pub struct CrossVerificationValidator;

impl FraudValidator for CrossVerificationValidator {
    fn name(&self) -> &'static str {
        "cross_verification"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::CrossVerification
    }

    fn supported_types(&self) -> &'static [&'static str] {
        &[rule_types::CROSS_CHECK, rule_types::PATTERN_MATCH]
    }

    fn validate(&self, rule: &RuleDefinition, ctx: &ValidationContext<'_>) -> ScreenResult<ValidationOutcome> {
        let a = ctx.applicant;
        let detail = match rule.code.as_str() {
            "NAME_CROSS_VERIFICATION_FAILED" => {
                let expected = normalize_name(&a.full_name());
                mismatching_documents(a, ExtractedFieldName::Name, |v| normalize_name(v) == expected)
                    .map(|docs| format!("Name differs from application on: {docs}"))
            }
            "DOB_CROSS_VERIFICATION_FAILED" => a.date_of_birth.and_then(|dob| {
                mismatching_documents(a, ExtractedFieldName::Dob, |v| parse_dob(v).map_or(true, |d| d == dob))
                    .map(|docs| format!("Date of birth differs from application on: {docs}"))
            }),
            "PAN_CROSS_VERIFICATION_FAILED" => identifier_mismatch(a, IdentifierKind::Pan, ExtractedFieldName::Pan),
            "AADHAAR_CROSS_VERIFICATION_FAILED" => {
                identifier_mismatch(a, IdentifierKind::Aadhaar, ExtractedFieldName::Aadhaar)
            }
            "GENDER_CROSS_VERIFICATION_FAILED" => a.gender.as_deref().and_then(gender_code).and_then(|g| {
                mismatching_documents(a, ExtractedFieldName::Gender, |v| gender_code(v).map_or(true, |d| d == g))
                    .map(|docs| format!("Gender differs from application on: {docs}"))
            }),
            "INVALID_IFSC_CODE" => a
                .financials
                .as_ref()
                .and_then(|f| f.ifsc_code.as_deref())
                .map(|code| code.trim().to_ascii_uppercase())
                .filter(|code| !code.is_empty() && !is_valid_ifsc(code))
                .map(|code| format!("IFSC code '{code}' is not in AAAA0XXXXXX format")),
            "HIDDEN_LOANS_DETECTED" => declared_and_observed(a).and_then(|(declared, observed)| {
                (declared == 0 && observed > 0).then(|| {
                    format!("No loans declared but {observed} EMI debit(s) seen on the bank statement")
                })
            }),
            "LOAN_DECLARATION_MISMATCH" => declared_and_observed(a).and_then(|(declared, observed)| {
                let max_diff = rule.param_f64("MAX_DIFFERENCE", 2.0);
                let diff = declared.abs_diff(observed);
                (diff as f64 >= max_diff)
                    .then(|| format!("{declared} loan(s) declared, {observed} EMI debit(s) on the bank statement"))
            }),
            other => {
                log::warn!("cross-verification validator has no check for rule {other}, skipping");
                None
            }
        };
        Ok(match detail {
            Some(d) => ValidationOutcome::triggered(rule, d),
            None => ValidationOutcome::clear(rule),
        })
    }
}

/// Comma-joined document types whose `field` value fails `matches`.
fn mismatching_documents(
    a: &ApplicantProfile,
    field: ExtractedFieldName,
    matches: impl Fn(&str) -> bool,
) -> Option<String> {
    let mut docs: Vec<&str> = a
        .extracted(field)
        .filter(|f| !f.value.trim().is_empty() && !matches(&f.value))
        .map(|f| f.document_type.as_str())
        .collect();
    docs.sort_unstable();
    docs.dedup();
    (!docs.is_empty()).then(|| docs.join(", "))
}

fn identifier_mismatch(a: &ApplicantProfile, kind: IdentifierKind, field: ExtractedFieldName) -> Option<String> {
    let declared = a.identifier(kind).and_then(|v| kind.normalize(v))?;
    let differing: Vec<(&str, String)> = a
        .extracted(field)
        .filter_map(|f| {
            kind.normalize(&f.value)
                .filter(|n| *n != declared)
                .map(|n| (f.document_type.as_str(), n))
        })
        .collect();
    let (_, first) = differing.first()?;
    let mut docs: Vec<&str> = differing.iter().map(|(doc, _)| *doc).collect();
    docs.sort_unstable();
    docs.dedup();
    Some(format!(
        "{} {} on application, {} on: {}",
        kind.label(),
        mask(&declared),
        mask(first),
        docs.join(", ")
    ))
}

fn declared_and_observed(a: &ApplicantProfile) -> Option<(u32, u32)> {
    let declared = a.credit_history.as_ref()?.total_active_loans?;
    let observed = a.financials.as_ref()?.observed_emi_debits?;
    Some((declared, observed))
}

fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .map(|w| w.trim_matches('.').to_lowercase())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_dob(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    DOB_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}

fn gender_code(value: &str) -> Option<char> {
    match value.trim().to_ascii_lowercase().as_str() {
        "m" | "male" => Some('m'),
        "f" | "female" => Some('f'),
        "o" | "other" | "t" | "transgender" => Some('o'),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        applicant::{ApplicantSource, CreditHistory, ExtractedField, FinancialDetails},
        rule_catalogue::default_rules,
        types::ApplicantId,
    };

    struct NoApplicants;

    impl ApplicantSource for NoApplicants {
        fn applicant_profile(&self, _: ApplicantId) -> ScreenResult<Option<ApplicantProfile>> {
            Ok(None)
        }
        fn identifier_holders(&self, _: IdentifierKind) -> ScreenResult<Vec<(ApplicantId, String)>> {
            Ok(Vec::new())
        }
        fn applicant_ids(&self) -> ScreenResult<Vec<ApplicantId>> {
            Ok(Vec::new())
        }
    }

    fn run(code: &str, applicant: &ApplicantProfile) -> ValidationOutcome {
        let rule = default_rules().unwrap().into_iter().find(|r| r.code == code).unwrap();
        let ctx = ValidationContext {
            applicant,
            applicants: &NoApplicants,
            today: NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
        };
        CrossVerificationValidator.validate(&rule, &ctx).unwrap()
    }

    fn field(document_type: &str, field: ExtractedFieldName, value: &str) -> ExtractedField {
        ExtractedField { document_type: document_type.into(), field, value: value.into() }
    }

    fn declaring(extracted_fields: Vec<ExtractedField>) -> ApplicantProfile {
        ApplicantProfile {
            applicant_id: 1,
            gender: Some("F".into()),
            pan_number: Some("ABCPK1234L".into()),
            aadhaar_number: Some("2345 6789 0123".into()),
            extracted_fields,
            ..Default::default()
        }
    }

    /// A document carrying a different PAN or Aadhaar is flagged, masked.
    #[test]
    fn identifier_on_document_must_match_application() {
        let same = declaring(vec![
            field("PAN_CARD", ExtractedFieldName::Pan, " abcpk1234l"),
            field("AADHAAR_CARD", ExtractedFieldName::Aadhaar, "234567890123"),
        ]);
        assert!(!run("PAN_CROSS_VERIFICATION_FAILED", &same).triggered);
        assert!(!run("AADHAAR_CROSS_VERIFICATION_FAILED", &same).triggered);

        let other = declaring(vec![
            field("PAN_CARD", ExtractedFieldName::Pan, "ABCPK9999L"),
            field("AADHAAR_CARD", ExtractedFieldName::Aadhaar, "2345 6789 9999"),
        ]);
        let pan = run("PAN_CROSS_VERIFICATION_FAILED", &other);
        assert!(pan.triggered);
        assert!(pan.detail.contains("****999L") && pan.detail.contains("PAN_CARD"), "Got {}", pan.detail);
        assert!(!pan.detail.contains("ABCPK9999L"), "Unmasked: {}", pan.detail);
        let aadhaar = run("AADHAAR_CROSS_VERIFICATION_FAILED", &other);
        assert!(aadhaar.triggered);
        assert!(!aadhaar.detail.contains("234567890123"), "Unmasked: {}", aadhaar.detail);
    }

    /// Gender words and letters compare as one code; unreadable values are skipped.
    #[test]
    fn gender_mismatch_compares_codes() {
        let female = declaring(vec![field("AADHAAR_CARD", ExtractedFieldName::Gender, "female")]);
        assert!(!run("GENDER_CROSS_VERIFICATION_FAILED", &female).triggered);
        let unreadable = declaring(vec![field("AADHAAR_CARD", ExtractedFieldName::Gender, "?")]);
        assert!(!run("GENDER_CROSS_VERIFICATION_FAILED", &unreadable).triggered);
        let male = declaring(vec![field("PASSPORT", ExtractedFieldName::Gender, "Male")]);
        let out = run("GENDER_CROSS_VERIFICATION_FAILED", &male);
        assert!(out.triggered);
        assert!(out.detail.ends_with("PASSPORT"), "Got {}", out.detail);
    }

    /// A gap of exactly two between declared loans and EMI debits is a mismatch; one is not.
    #[test]
    fn loan_declaration_gap_threshold() {
        let with = |declared: u32, observed: u32| ApplicantProfile {
            credit_history: Some(CreditHistory { total_active_loans: Some(declared), ..Default::default() }),
            financials: Some(FinancialDetails { observed_emi_debits: Some(observed), ..Default::default() }),
            ..Default::default()
        };
        let cases = [(1, 3, true, false), (1, 2, false, false), (3, 1, true, false), (0, 1, false, true)];
        for (declared, observed, mismatch, hidden) in cases {
            let a = with(declared, observed);
            let got = (
                run("LOAN_DECLARATION_MISMATCH", &a).triggered,
                run("HIDDEN_LOANS_DETECTED", &a).triggered,
            );
            assert_eq!(
                got,
                (mismatch, hidden),
                "Expected {:?}, got {got:?} for {declared} declared / {observed} seen",
                (mismatch, hidden)
            );
        }
    }

    #[test]
    fn names_compare_ignoring_case_and_spacing() {
        assert_eq!(normalize_name("  Ravi   KUMAR "), normalize_name("ravi kumar"));
        assert_ne!(normalize_name("Ravi Kumar"), normalize_name("Ravi Kumar Singh"));
    }

    #[test]
    fn dob_accepts_common_document_formats() {
        let d = NaiveDate::from_ymd_opt(1990, 4, 12).unwrap();
        assert_eq!(parse_dob("1990-04-12"), Some(d));
        assert_eq!(parse_dob("12/04/1990"), Some(d));
        assert_eq!(parse_dob("not a date"), None);
    }
}
