//! Deterministic demo applicants and a matching registry drop.
//!
//! RULE: Same seed, same data. All randomness comes from `SeededRng`.
//!
//! Planted cases, by position, so even small populations exercise them:
//!   - every 7th applicant reuses the previous applicant's Aadhaar
//!   - every 11th applicant reuses a phone number from two places back
//!   - every 9th applicant (offset 4) is over-leveraged on paper
//!   - every 13th applicant uploaded a PAN card that disagrees with the form
//!
//! Every third applicant is also a registry person. Among those, by
//! registry position: 1 of 4 carries a conviction, 1 of 4 has defaults,
//! 1 of 5 an expired document, 1 of 6 too many active loans.

use crate::{
    applicant::{
        ApplicantProfile, CreditHistory, EmploymentDetails, ExtractedField, ExtractedFieldName,
        FinancialDetails, LoanRequest,
    },
    error::ScreenResult,
    identifiers::aadhaar_with_check_digit,
    name_generator::NameGenerator,
    registry::{
        BankAccount, CaseStatus, CriminalRecord, DocumentStatus, LoanStatus, RegistryDocument,
        RegistryImport, RegistryLoan, RegistryPerson,
    },
    rng::{SeededRng, Stream},
    store::ScreenStore,
    types::{ApplicantId, LoanType, PersonId},
};
use chrono::NaiveDate;
use serde::Serialize;

const REGISTRY_PERSON_BASE: PersonId = 5000;
const REGISTRY_ONLY_BASE: PersonId = 9000;
const LOAN_TYPES: &[LoanType] = &[LoanType::Personal, LoanType::Home, LoanType::Vehicle, LoanType::Education];

#[derive(Debug, Clone, Serialize)]
pub struct DemoPopulation {
    pub applicants: Vec<ApplicantProfile>,
    pub registry: RegistryImport,
}

impl DemoPopulation {
    /// Insert the applicants and import the registry. Returns the new
    /// applicant ids in generation order.
    pub fn load_into(&self, store: &ScreenStore) -> ScreenResult<Vec<ApplicantId>> {
        let ids = self
            .applicants
            .iter()
            .map(|a| store.insert_applicant(a))
            .collect::<ScreenResult<Vec<_>>>()?;
        store.import_registry(&self.registry)?;
        log::info!("demo population loaded: {} applicants", ids.len());
        Ok(ids)
    }
}

pub fn generate(seed: u64, count: usize) -> DemoPopulation {
    let mut rng = SeededRng::new(seed, Stream::Applicants);
    let mut applicants: Vec<ApplicantProfile> = Vec::with_capacity(count);
    for i in 0..count {
        let mut a = applicant(&mut rng, i);
        if i % 7 == 6 {
            a.aadhaar_number = applicants[i - 1].aadhaar_number.clone();
        }
        if i % 11 == 10 {
            a.phone = applicants[i - 2].phone.clone();
        }
        applicants.push(a);
    }

    let mut rng = SeededRng::new(seed, Stream::Registry);
    let mut registry = RegistryImport::default();
    for (k, a) in applicants.iter().step_by(3).enumerate() {
        let person_id = REGISTRY_PERSON_BASE + a.applicant_id;
        registry.persons.push(RegistryPerson {
            person_id,
            full_name: a.full_name(),
            date_of_birth: a.date_of_birth,
            pan_number: a.pan_number.clone(),
            aadhaar_number: a.aadhaar_number.clone(),
            phone: a.phone.clone(),
            email: a.email.clone(),
        });
        registry_history(&mut rng, &mut registry, person_id, k);
    }
    // A few people nobody applied as.
    for n in 0..count / 4 {
        let person_id = REGISTRY_ONLY_BASE + n as PersonId;
        let gender = if rng.chance(0.5) { "F" } else { "M" };
        let first = NameGenerator::first_name(&mut rng, gender);
        let last = NameGenerator::last_name(&mut rng);
        registry.persons.push(RegistryPerson {
            person_id,
            full_name: format!("{first} {last}"),
            date_of_birth: date_of_birth(&mut rng),
            pan_number: Some(pan(&mut rng, last)),
            aadhaar_number: aadhaar(&mut rng),
            phone: Some(phone(&mut rng)),
            email: None,
        });
        registry_history(&mut rng, &mut registry, person_id, n + 1);
    }

    log::debug!(
        "generated seed={seed}: {} applicants, {} registry persons",
        applicants.len(),
        registry.persons.len()
    );
    DemoPopulation { applicants, registry }
}

// ── Applicants ───────────────────────────────────────────────────────────────

fn applicant(rng: &mut SeededRng, i: usize) -> ApplicantProfile {
    let gender = if rng.chance(0.5) { "F" } else { "M" };
    let first = NameGenerator::first_name(rng, gender);
    let last = NameGenerator::last_name(rng);
    let dob = date_of_birth(rng);
    let pan_number = pan(rng, last);
    let aadhaar_number = aadhaar(rng);
    let email = format!(
        "{}.{}{}@{}",
        email_part(first),
        email_part(last),
        i + 1,
        NameGenerator::email_domain(rng)
    );

    let income = (rng.int_between(30, 200) * 1000) as f64;
    let (bank_name, ifsc_prefix) = NameGenerator::bank(rng);
    let credits = (income * rng.f64_between(0.9, 1.1)).round();
    let debits = (credits * rng.f64_between(0.5, 0.85)).round();
    let mut active_loans = rng.int_between(0, 2);
    let mut utilization = rng.f64_between(10.0, 60.0).round();
    let mut emi = (income * rng.f64_between(0.05, 0.3)).round();
    let mut observed_emi = active_loans;
    if i % 9 == 4 {
        active_loans = 5;
        utilization = 93.0;
        emi = (income * 0.55).round();
        observed_emi = 7;
    }

    let loan_type = *rng.pick(LOAN_TYPES);
    let amount = (income * rng.f64_between(3.0, 8.0) / 1000.0).round() * 1000.0;

    let mut fields = vec![
        extracted("PAN_CARD", ExtractedFieldName::Name, format!("{first} {last}")),
        extracted("PAN_CARD", ExtractedFieldName::Pan, pan_number.clone()),
        extracted("AADHAAR_CARD", ExtractedFieldName::Name, format!("{first} {last}")),
        extracted("AADHAAR_CARD", ExtractedFieldName::Gender, gender.to_string()),
    ];
    if let Some(d) = dob {
        fields.push(extracted_field_dob(d));
    }
    if let Some(a) = &aadhaar_number {
        fields.push(extracted("AADHAAR_CARD", ExtractedFieldName::Aadhaar, a.clone()));
    }
    if i % 13 == 12 {
        fields.push(extracted("PAN_CARD", ExtractedFieldName::Pan, pan(rng, last)));
    }

    ApplicantProfile {
        applicant_id: i as ApplicantId + 1,
        first_name: first.to_string(),
        last_name: Some(last.to_string()),
        date_of_birth: dob,
        gender: Some(gender.to_string()),
        phone: Some(phone(rng)),
        email: Some(email),
        pan_number: Some(pan_number),
        aadhaar_number,
        employment: Some(EmploymentDetails {
            employer_name: Some(NameGenerator::employer(rng).to_string()),
            employment_type: Some("Salaried".to_string()),
            monthly_income: Some(income),
            start_date: NaiveDate::from_ymd_opt(rng.int_between(2010, 2024) as i32, rng.int_between(1, 12), 1),
        }),
        financials: Some(FinancialDetails {
            bank_name: Some(bank_name.to_string()),
            ifsc_code: Some(format!("{ifsc_prefix}0{}", rng.digits(6))),
            total_credit_last_month: Some(credits),
            total_debit_last_month: Some(debits),
            anomalies: None,
            observed_emi_debits: Some(observed_emi),
        }),
        credit_history: Some(CreditHistory {
            credit_score: Some(rng.int_between(760, 850)),
            total_active_loans: Some(active_loans),
            total_monthly_emi: Some(emi),
            credit_utilization_ratio: Some(utilization),
            credit_card_count: Some(rng.int_between(0, 4)),
        }),
        loan_request: Some(LoanRequest { loan_type, amount }),
        extracted_fields: fields,
    }
}

fn extracted(document_type: &str, field: ExtractedFieldName, value: String) -> ExtractedField {
    ExtractedField { document_type: document_type.to_string(), field, value }
}

fn extracted_field_dob(d: NaiveDate) -> ExtractedField {
    extracted("AADHAAR_CARD", ExtractedFieldName::Dob, d.format("%d/%m/%Y").to_string())
}

fn email_part(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_lowercase()
}

fn date_of_birth(rng: &mut SeededRng) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(
        rng.int_between(1966, 2001) as i32,
        rng.int_between(1, 12),
        rng.int_between(1, 28),
    )
}

/// Individual PAN: holder type `P`, fifth letter from the surname.
fn pan(rng: &mut SeededRng, last_name: &str) -> String {
    let initial = last_name
        .chars()
        .next()
        .filter(char::is_ascii_alphabetic)
        .map(|c| c.to_ascii_uppercase())
        .unwrap_or('X');
    format!("{}P{initial}{}{}", rng.uppercase(3), rng.digits(4), rng.uppercase(1))
}

fn aadhaar(rng: &mut SeededRng) -> Option<String> {
    let prefix = format!("{}{}", rng.int_between(2, 9), rng.digits(10));
    aadhaar_with_check_digit(&prefix)
}

fn phone(rng: &mut SeededRng) -> String {
    format!("{}{}", rng.int_between(6, 9), rng.digits(9))
}

// ── Registry ─────────────────────────────────────────────────────────────────

fn registry_history(rng: &mut SeededRng, out: &mut RegistryImport, person_id: PersonId, k: usize) {
    for _ in 0..rng.int_between(1, 3) {
        let (bank_name, _) = NameGenerator::bank(rng);
        out.bank_accounts.push(BankAccount {
            person_id,
            bank_name: bank_name.to_string(),
            account_number: rng.digits(12),
            account_type: if rng.chance(0.7) { "SAVINGS" } else { "CURRENT" }.to_string(),
            balance: rng.f64_between(5_000.0, 400_000.0).round(),
            last_transaction_date: NaiveDate::from_ymd_opt(2025, rng.int_between(1, 12), rng.int_between(1, 28)),
            is_active: true,
        });
    }

    let loan = |rng: &mut SeededRng, status: LoanStatus| {
        let amount = (rng.int_between(50, 1500) * 1000) as f64;
        let outstanding = match status {
            LoanStatus::Closed => 0.0,
            _ => (amount * rng.f64_between(0.2, 0.9)).round(),
        };
        RegistryLoan {
            person_id,
            loan_type: rng.pick(LOAN_TYPES).as_str().to_string(),
            institution_name: NameGenerator::lender(rng).to_string(),
            loan_amount: amount,
            outstanding_balance: outstanding,
            status,
            default_flag: status == LoanStatus::Defaulted,
        }
    };
    for _ in 0..rng.int_between(0, 2) {
        let status = if rng.chance(0.5) { LoanStatus::Active } else { LoanStatus::Closed };
        out.loans.push(loan(rng, status));
    }
    if k % 4 == 2 {
        for _ in 0..(1 + k % 3) {
            out.loans.push(loan(rng, LoanStatus::Defaulted));
        }
    }
    if k % 6 == 5 {
        for _ in 0..6 {
            out.loans.push(loan(rng, LoanStatus::Active));
        }
    }

    if k % 4 == 1 {
        out.criminal_records.push(CriminalRecord {
            person_id,
            case_number: format!("CR/{}/{}", rng.int_between(2010, 2023), rng.digits(5)),
            case_type: "FRAUD".to_string(),
            court_name: Some(NameGenerator::court(rng).to_string()),
            status: CaseStatus::Convicted,
            verdict_date: NaiveDate::from_ymd_opt(rng.int_between(2012, 2024) as i32, rng.int_between(1, 12), 1),
        });
    }

    out.documents.push(RegistryDocument {
        person_id,
        document_type: "PAN".to_string(),
        document_number: format!("{}P{}", rng.uppercase(4), rng.digits(5)),
        issued_date: NaiveDate::from_ymd_opt(rng.int_between(2005, 2020) as i32, 1, 1),
        expiry_date: None,
        verification_status: DocumentStatus::Verified,
    });
    if k % 5 == 3 {
        out.documents.push(RegistryDocument {
            person_id,
            document_type: "PASSPORT".to_string(),
            document_number: format!("{}{}", rng.uppercase(1), rng.digits(7)),
            issued_date: NaiveDate::from_ymd_opt(2012, 3, 1),
            expiry_date: NaiveDate::from_ymd_opt(2022, 2, 28),
            verification_status: DocumentStatus::Expired,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifiers::{is_valid_aadhaar, is_valid_ifsc, is_valid_pan};

    #[test]
    fn same_seed_same_population() {
        let a = serde_json::to_string(&generate(42, 20)).unwrap();
        let b = serde_json::to_string(&generate(42, 20)).unwrap();
        assert_eq!(a, b);
        let c = serde_json::to_string(&generate(43, 20)).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn generated_identifiers_are_well_formed() {
        let pop = generate(7, 30);
        for a in &pop.applicants {
            let pan = a.pan_number.as_deref().unwrap();
            assert!(is_valid_pan(pan), "Bad PAN {pan}");
            let aadhaar = a.aadhaar_number.as_deref().unwrap();
            assert!(is_valid_aadhaar(aadhaar), "Bad Aadhaar for applicant {}", a.applicant_id);
            let phone = a.phone.as_deref().unwrap();
            assert!(phone.len() == 10 && phone.starts_with(['6', '7', '8', '9']), "Bad phone {phone}");
            let ifsc = a.financials.as_ref().and_then(|f| f.ifsc_code.as_deref()).unwrap();
            assert!(is_valid_ifsc(ifsc), "Bad IFSC {ifsc}");
        }
    }

    #[test]
    fn planted_cases_are_present() {
        let pop = generate(1, 12);
        assert_eq!(pop.applicants[6].aadhaar_number, pop.applicants[5].aadhaar_number);
        assert_eq!(pop.applicants[10].phone, pop.applicants[8].phone);
        assert!(pop.registry.criminal_records.iter().any(|c| c.status == CaseStatus::Convicted));
        assert!(pop.registry.loans.iter().any(|l| l.status == LoanStatus::Defaulted));
        assert!(pop
            .registry
            .documents
            .iter()
            .any(|d| d.verification_status == DocumentStatus::Expired));
    }
}
