//! Applicant data as supplied by the applicant-data store.
//!
//! The screening core only reads this. Sub-records are optional because
//! applications are screened at whatever stage of completion they are in.

use crate::{
    error::ScreenResult,
    identifiers::IdentifierKind,
    types::{ApplicantId, LoanType},
};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplicantProfile {
    pub applicant_id: ApplicantId,
    pub first_name: String,
    pub last_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub pan_number: Option<String>,
    pub aadhaar_number: Option<String>,
    pub employment: Option<EmploymentDetails>,
    pub financials: Option<FinancialDetails>,
    pub credit_history: Option<CreditHistory>,
    pub loan_request: Option<LoanRequest>,
    #[serde(default)]
    pub extracted_fields: Vec<ExtractedField>,
}

impl ApplicantProfile {
    pub fn full_name(&self) -> String {
        match &self.last_name {
            Some(last) if !last.trim().is_empty() => format!("{} {}", self.first_name.trim(), last.trim()),
            _ => self.first_name.trim().to_string(),
        }
    }

    pub fn identifier(&self, kind: IdentifierKind) -> Option<&str> {
        match kind {
            IdentifierKind::Pan => self.pan_number.as_deref(),
            IdentifierKind::Aadhaar => self.aadhaar_number.as_deref(),
            IdentifierKind::Phone => self.phone.as_deref(),
            IdentifierKind::Email => self.email.as_deref(),
        }
    }

    /// Extracted values for `field` across all uploaded documents.
    pub fn extracted(&self, field: ExtractedFieldName) -> impl Iterator<Item = &ExtractedField> {
        self.extracted_fields.iter().filter(move |f| f.field == field)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmploymentDetails {
    pub employer_name: Option<String>,
    pub employment_type: Option<String>,
    pub monthly_income: Option<f64>,
    pub start_date: Option<NaiveDate>,
}

/// Bank statement summary for the most recent month.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinancialDetails {
    pub bank_name: Option<String>,
    pub ifsc_code: Option<String>,
    pub total_credit_last_month: Option<f64>,
    pub total_debit_last_month: Option<f64>,
    /// Free text noted by the statement parser (bounces, failures, ...).
    pub anomalies: Option<String>,
    /// Distinct recurring EMI debits seen on the statement.
    pub observed_emi_debits: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreditHistory {
    pub credit_score: Option<u32>,
    pub total_active_loans: Option<u32>,
    pub total_monthly_emi: Option<f64>,
    /// Percentage, 0-100.
    pub credit_utilization_ratio: Option<f64>,
    pub credit_card_count: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanRequest {
    pub loan_type: LoanType,
    pub amount: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExtractedFieldName {
    Name,
    Dob,
    Gender,
    Pan,
    Aadhaar,
}

impl ExtractedFieldName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "NAME",
            Self::Dob => "DOB",
            Self::Gender => "GENDER",
            Self::Pan => "PAN",
            Self::Aadhaar => "AADHAAR",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NAME" => Some(Self::Name),
            "DOB" | "DATE_OF_BIRTH" => Some(Self::Dob),
            "GENDER" => Some(Self::Gender),
            "PAN" => Some(Self::Pan),
            "AADHAAR" => Some(Self::Aadhaar),
            _ => None,
        }
    }
}

/// A field read off an uploaded document (Aadhaar card, PAN card, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedField {
    pub document_type: String,
    pub field: ExtractedFieldName,
    pub value: String,
}

/// Whole years from `from` to `to`; negative when `to` is earlier.
pub fn whole_years_between(from: NaiveDate, to: NaiveDate) -> i32 {
    let mut years = to.year() - from.year();
    if (to.month(), to.day()) < (from.month(), from.day()) {
        years -= 1;
    }
    years
}

/// Read access to the applicant-data store.
pub trait ApplicantSource: Send + Sync {
    fn applicant_profile(&self, applicant_id: ApplicantId) -> ScreenResult<Option<ApplicantProfile>>;

    /// Every applicant holding a non-empty identifier of `kind`, raw values.
    fn identifier_holders(&self, kind: IdentifierKind) -> ScreenResult<Vec<(ApplicantId, String)>>;

    fn applicant_ids(&self) -> ScreenResult<Vec<ApplicantId>>;
}
