//! Financial checks: affordability ratios, credit profile, bank statement signals.
//!
//! Ratio rules come in pairs (HIGH_* / ELEVATED_*) whose bands do not
//! overlap, so one ratio never fires both rules of a pair.

use crate::{
    applicant::ApplicantProfile,
    error::ScreenResult,
    rule_catalogue::{rule_types, RuleDefinition},
    types::{LoanType, RuleCategory},
    validator::{FraudValidator, ValidationContext, ValidationOutcome},
};

// ── Constants ────────────────────────────────────────────────────────────────

const CHEQUE_BOUNCE_KEYWORDS: &[&str] = &[
    "cheque bounce",
    "check bounce",
    "insufficient funds",
    "payment failed",
    "dishonoured",
    "dishonored",
];

const CASH_INCOME_KEYWORDS: &[&str] = &["cash", "daily wage", "contract", "freelance"];

/// Minimum credit score for a loan of `loan_type` and `amount`.
pub fn minimum_credit_score(loan_type: LoanType, amount: f64) -> u32 {
    match loan_type {
        LoanType::Personal if amount > 500_000.0 => 700,
        LoanType::Personal => 650,
        LoanType::Home if amount > 2_000_000.0 => 750,
        LoanType::Home => 700,
        LoanType::Vehicle => 600,
        LoanType::Education => 650,
        LoanType::Business => 720,
        LoanType::Gold => 550,
        LoanType::Other => 650,
    }
}

/// Largest loan allowed, as a multiple of monthly income.
pub fn max_income_multiple(loan_type: LoanType) -> f64 {
    match loan_type {
        LoanType::Personal => 24.0,
        LoanType::Home => 120.0,
        LoanType::Vehicle => 48.0,
        LoanType::Education => 72.0,
        LoanType::Business => 100.0,
        LoanType::Gold | LoanType::Other => 60.0,
    }
}

pub struct FinancialValidator;

impl FraudValidator for FinancialValidator {
    fn name(&self) -> &'static str {
        "financial"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Financial
    }

    fn supported_types(&self) -> &'static [&'static str] {
        &[rule_types::THRESHOLD, rule_types::CROSS_CHECK, rule_types::PATTERN_MATCH]
    }

    fn validate(&self, rule: &RuleDefinition, ctx: &ValidationContext<'_>) -> ScreenResult<ValidationOutcome> {
        let a = ctx.applicant;
        let detail = match rule.code.as_str() {
            "HIGH_LOAN_TO_INCOME" => loan_to_income(a).and_then(|ratio| {
                let max = rule.param_f64("MAX_MULTIPLE", 20.0);
                (ratio > max).then(|| format!("Loan is {ratio:.1}x annual income (limit {max}x)"))
            }),
            "ELEVATED_LOAN_TO_INCOME" => loan_to_income(a).and_then(|ratio| {
                let min = rule.param_f64("MIN_MULTIPLE", 10.0);
                let max = rule.param_f64("MAX_MULTIPLE", 20.0);
                (ratio > min && ratio <= max)
                    .then(|| format!("Loan is {ratio:.1}x annual income (elevated above {min}x)"))
            }),
            "HIGH_DEBT_TO_INCOME" => debt_to_income(a).and_then(|dti| {
                let max = rule.param_f64("MAX_DTI_RATIO", 50.0);
                (dti > max).then(|| format!("EMI is {dti:.1}% of monthly income (limit {max}%)"))
            }),
            "ELEVATED_DEBT_TO_INCOME" => debt_to_income(a).and_then(|dti| {
                let min = rule.param_f64("MIN_DTI_RATIO", 40.0);
                let max = rule.param_f64("MAX_DTI_RATIO", 50.0);
                (dti > min && dti <= max)
                    .then(|| format!("EMI is {dti:.1}% of monthly income (elevated above {min}%)"))
            }),
            "CRITICAL_CREDIT_UTILIZATION" => utilization(a).and_then(|u| {
                let max = rule.param_f64("MAX_UTILIZATION", 90.0);
                (u > max).then(|| format!("Credit utilization {u:.1}% above {max}%"))
            }),
            "EXCESSIVE_CREDIT_UTILIZATION" => utilization(a).and_then(|u| {
                let min = rule.param_f64("MIN_UTILIZATION", 80.0);
                let max = rule.param_f64("MAX_UTILIZATION", 90.0);
                (u > min && u <= max).then(|| format!("Credit utilization {u:.1}% above {min}%"))
            }),
            "EXCESSIVE_ACTIVE_LOANS" => active_loans(a).and_then(|n| {
                let max = rule.param_f64("MAX_ACTIVE_LOANS", 5.0);
                (n as f64 >= max).then(|| format!("{n} active loans declared"))
            }),
            "MULTIPLE_ACTIVE_LOANS" => active_loans(a).and_then(|n| {
                let min = rule.param_f64("MIN_ACTIVE_LOANS", 3.0);
                let max = rule.param_f64("MAX_ACTIVE_LOANS", 5.0);
                (n as f64 >= min && (n as f64) < max).then(|| format!("{n} active loans declared"))
            }),
            "LOW_CREDIT_SCORE" => low_credit_score(a),
            "EXCESSIVE_LOAN_AMOUNT" => excessive_loan_amount(a),
            "SALARY_MISMATCH" => salary_mismatch(rule, a),
            "LOW_BALANCE_HIGH_LOAN" => low_balance_high_loan(rule, a),
            "FREQUENT_CHEQUE_BOUNCES" => a
                .financials
                .as_ref()
                .and_then(|f| f.anomalies.as_deref())
                .and_then(|text| first_keyword(text, CHEQUE_BOUNCE_KEYWORDS))
                .map(|kw| format!("Bank statement anomaly mentions '{kw}'")),
            "CASH_SALARY_DECLARATION" => a.employment.as_ref().and_then(|e| {
                [e.employer_name.as_deref(), e.employment_type.as_deref()]
                    .into_iter()
                    .flatten()
                    .find_map(|text| first_keyword(text, CASH_INCOME_KEYWORDS))
                    .map(|kw| format!("Income declared as '{kw}'"))
            }),
            other => {
                log::warn!("financial validator has no check for rule {other}, skipping");
                None
            }
        };
        Ok(match detail {
            Some(d) => ValidationOutcome::triggered(rule, d),
            None => ValidationOutcome::clear(rule),
        })
    }
}

// ── Inputs ───────────────────────────────────────────────────────────────────

fn monthly_income(a: &ApplicantProfile) -> Option<f64> {
    a.employment
        .as_ref()
        .and_then(|e| e.monthly_income)
        .filter(|m| *m > 0.0)
}

fn requested_amount(a: &ApplicantProfile) -> Option<f64> {
    a.loan_request.as_ref().map(|l| l.amount).filter(|v| *v > 0.0)
}

fn loan_to_income(a: &ApplicantProfile) -> Option<f64> {
    Some(requested_amount(a)? / (monthly_income(a)? * 12.0))
}

fn debt_to_income(a: &ApplicantProfile) -> Option<f64> {
    let emi = a.credit_history.as_ref()?.total_monthly_emi?;
    Some(emi / monthly_income(a)? * 100.0)
}

fn utilization(a: &ApplicantProfile) -> Option<f64> {
    a.credit_history.as_ref()?.credit_utilization_ratio
}

fn active_loans(a: &ApplicantProfile) -> Option<u32> {
    a.credit_history.as_ref()?.total_active_loans
}

fn first_keyword(text: &str, keywords: &[&'static str]) -> Option<&'static str> {
    let lower = text.to_lowercase();
    keywords.iter().copied().find(|kw| lower.contains(kw))
}

// ── Checks ───────────────────────────────────────────────────────────────────

fn low_credit_score(a: &ApplicantProfile) -> Option<String> {
    let score = a.credit_history.as_ref()?.credit_score?;
    let loan = a.loan_request.as_ref()?;
    let min = minimum_credit_score(loan.loan_type, loan.amount);
    (score < min).then(|| {
        format!(
            "Credit score {score} below minimum {min} for a {} loan of {:.0}",
            loan.loan_type.as_str(),
            loan.amount
        )
    })
}

fn excessive_loan_amount(a: &ApplicantProfile) -> Option<String> {
    let loan = a.loan_request.as_ref()?;
    let income = monthly_income(a)?;
    let multiple = max_income_multiple(loan.loan_type);
    let max = income * multiple;
    (loan.amount > max).then(|| {
        format!(
            "Requested {:.0} exceeds {:.0} ({multiple}x monthly income) for a {} loan",
            loan.amount,
            max,
            loan.loan_type.as_str()
        )
    })
}

fn salary_mismatch(rule: &RuleDefinition, a: &ApplicantProfile) -> Option<String> {
    let credit = a.financials.as_ref()?.total_credit_last_month?;
    let income = monthly_income(a)?;
    let ratio = credit / income * 100.0;
    let min = rule.param_f64("MIN_RATIO", 70.0);
    let max = rule.param_f64("MAX_RATIO", 130.0);
    (ratio < min || ratio > max).then(|| {
        format!("Bank credits {credit:.0} are {ratio:.0}% of declared income {income:.0} (expected {min}-{max}%)")
    })
}

fn low_balance_high_loan(rule: &RuleDefinition, a: &ApplicantProfile) -> Option<String> {
    let f = a.financials.as_ref()?;
    let balance = (f.total_credit_last_month? - f.total_debit_last_month?).abs();
    let amount = requested_amount(a)?;
    let pct = rule.param_f64("MIN_BALANCE_PERCENT", 1.0);
    let floor = rule.param_f64("MIN_BALANCE", 10_000.0);
    (balance < amount * pct / 100.0 && balance < floor)
        .then(|| format!("Net monthly balance {balance:.0} against a requested {amount:.0}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        applicant::{ApplicantSource, CreditHistory, EmploymentDetails, FinancialDetails, LoanRequest},
        identifiers::IdentifierKind,
        rule_catalogue::default_rules,
        types::ApplicantId,
    };
    use chrono::NaiveDate;

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

    fn fires(code: &str, applicant: &ApplicantProfile) -> bool {
        let rule = default_rules().unwrap().into_iter().find(|r| r.code == code).unwrap();
        let ctx = ValidationContext {
            applicant,
            applicants: &NoApplicants,
            today: NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
        };
        FinancialValidator.validate(&rule, &ctx).unwrap().triggered
    }

    /// Monthly income 10,000 with the given loan request and credit profile.
    fn applicant(amount: f64, emi: f64, utilization: f64) -> ApplicantProfile {
        ApplicantProfile {
            employment: Some(EmploymentDetails { monthly_income: Some(10_000.0), ..Default::default() }),
            credit_history: Some(CreditHistory {
                total_monthly_emi: Some(emi),
                credit_utilization_ratio: Some(utilization),
                ..Default::default()
            }),
            loan_request: Some(LoanRequest { loan_type: LoanType::Home, amount }),
            ..Default::default()
        }
    }

    /// Paired bands are (lower, upper]: each edge belongs to exactly one rule.
    #[test]
    fn ratio_bands_split_at_their_edges() {
        // (amount, emi, utilization) -> (high, elevated) per pair
        let cases: [(&str, &str, ApplicantProfile, (bool, bool)); 8] = [
            ("HIGH_LOAN_TO_INCOME", "ELEVATED_LOAN_TO_INCOME", applicant(2_400_000.0, 0.0, 0.0), (false, true)),
            ("HIGH_LOAN_TO_INCOME", "ELEVATED_LOAN_TO_INCOME", applicant(2_400_120.0, 0.0, 0.0), (true, false)),
            ("HIGH_LOAN_TO_INCOME", "ELEVATED_LOAN_TO_INCOME", applicant(1_200_000.0, 0.0, 0.0), (false, false)),
            ("HIGH_DEBT_TO_INCOME", "ELEVATED_DEBT_TO_INCOME", applicant(1.0, 5_000.0, 0.0), (false, true)),
            ("HIGH_DEBT_TO_INCOME", "ELEVATED_DEBT_TO_INCOME", applicant(1.0, 5_001.0, 0.0), (true, false)),
            ("HIGH_DEBT_TO_INCOME", "ELEVATED_DEBT_TO_INCOME", applicant(1.0, 4_000.0, 0.0), (false, false)),
            ("CRITICAL_CREDIT_UTILIZATION", "EXCESSIVE_CREDIT_UTILIZATION", applicant(1.0, 0.0, 90.0), (false, true)),
            ("CRITICAL_CREDIT_UTILIZATION", "EXCESSIVE_CREDIT_UTILIZATION", applicant(1.0, 0.0, 90.5), (true, false)),
        ];
        for (high, elevated, a, expected) in &cases {
            let got = (fires(high, a), fires(elevated, a));
            assert_eq!(got, *expected, "Expected {expected:?} for {high}/{elevated}, got {got:?}");
        }
        let at_lower_edge = applicant(1.0, 0.0, 80.0);
        assert!(!fires("EXCESSIVE_CREDIT_UTILIZATION", &at_lower_edge));
        assert!(!fires("CRITICAL_CREDIT_UTILIZATION", &at_lower_edge));
    }

    /// Fires only when the net balance is under both 1% of the request and the 10,000 floor.
    #[test]
    fn low_balance_needs_both_limits() {
        let with = |credit: f64, debit: f64, amount: f64| ApplicantProfile {
            financials: Some(FinancialDetails {
                total_credit_last_month: Some(credit),
                total_debit_last_month: Some(debit),
                ..Default::default()
            }),
            loan_request: Some(LoanRequest { loan_type: LoanType::Personal, amount }),
            ..Default::default()
        };
        assert!(fires("LOW_BALANCE_HIGH_LOAN", &with(50_000.0, 45_000.0, 1_000_000.0)));
        assert!(!fires("LOW_BALANCE_HIGH_LOAN", &with(50_000.0, 38_000.0, 1_000_000.0)));
        assert!(!fires("LOW_BALANCE_HIGH_LOAN", &with(50_000.0, 45_000.0, 400_000.0)));
    }

    #[test]
    fn credit_score_minimum_scales_with_amount() {
        assert_eq!(minimum_credit_score(LoanType::Personal, 500_000.0), 650);
        assert_eq!(minimum_credit_score(LoanType::Personal, 500_001.0), 700);
        assert_eq!(minimum_credit_score(LoanType::Home, 2_500_000.0), 750);
        assert_eq!(minimum_credit_score(LoanType::Gold, 10_000.0), 550);
    }

    #[test]
    fn keyword_match_is_case_insensitive() {
        assert_eq!(first_keyword("Two CHEQUE BOUNCES in May", CHEQUE_BOUNCE_KEYWORDS), Some("cheque bounce"));
        assert_eq!(first_keyword("salary credited", CHEQUE_BOUNCE_KEYWORDS), None);
    }
}
