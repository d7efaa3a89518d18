use super::{date, date_text, identifier_column, parsed, ScreenStore};
use crate::{
    applicant::{
        ApplicantProfile, ApplicantSource, CreditHistory, EmploymentDetails, ExtractedField,
        ExtractedFieldName, FinancialDetails, LoanRequest,
    },
    error::ScreenResult,
    identifiers::IdentifierKind,
    types::ApplicantId,
};
use rusqlite::{params, OptionalExtension};

impl ApplicantSource for ScreenStore {
    fn applicant_profile(&self, applicant_id: ApplicantId) -> ScreenResult<Option<ApplicantProfile>> {
        let conn = self.conn()?;
        let profile = conn
            .query_row(
                "SELECT applicant_id, first_name, last_name, date_of_birth, gender,
                        phone, email, pan_number, aadhaar_number
                 FROM applicant WHERE applicant_id = ?1",
                params![applicant_id],
                |r| {
                    Ok(ApplicantProfile {
                        applicant_id: r.get(0)?,
                        first_name: r.get(1)?,
                        last_name: r.get(2)?,
                        date_of_birth: date(r, 3)?,
                        gender: r.get(4)?,
                        phone: r.get(5)?,
                        email: r.get(6)?,
                        pan_number: r.get(7)?,
                        aadhaar_number: r.get(8)?,
                        ..Default::default()
                    })
                },
            )
            .optional()?;
        let Some(mut profile) = profile else {
            return Ok(None);
        };

        profile.employment = conn
            .query_row(
                "SELECT employer_name, employment_type, monthly_income, start_date
                 FROM applicant_employment WHERE applicant_id = ?1",
                params![applicant_id],
                |r| {
                    Ok(EmploymentDetails {
                        employer_name: r.get(0)?,
                        employment_type: r.get(1)?,
                        monthly_income: r.get(2)?,
                        start_date: date(r, 3)?,
                    })
                },
            )
            .optional()?;

        profile.financials = conn
            .query_row(
                "SELECT bank_name, ifsc_code, total_credit_last_month, total_debit_last_month,
                        anomalies, observed_emi_debits
                 FROM applicant_financials WHERE applicant_id = ?1",
                params![applicant_id],
                |r| {
                    Ok(FinancialDetails {
                        bank_name: r.get(0)?,
                        ifsc_code: r.get(1)?,
                        total_credit_last_month: r.get(2)?,
                        total_debit_last_month: r.get(3)?,
                        anomalies: r.get(4)?,
                        observed_emi_debits: r.get(5)?,
                    })
                },
            )
            .optional()?;

        profile.credit_history = conn
            .query_row(
                "SELECT credit_score, total_active_loans, total_monthly_emi,
                        credit_utilization_ratio, credit_card_count
                 FROM applicant_credit_history WHERE applicant_id = ?1",
                params![applicant_id],
                |r| {
                    Ok(CreditHistory {
                        credit_score: r.get(0)?,
                        total_active_loans: r.get(1)?,
                        total_monthly_emi: r.get(2)?,
                        credit_utilization_ratio: r.get(3)?,
                        credit_card_count: r.get(4)?,
                    })
                },
            )
            .optional()?;

        profile.loan_request = conn
            .query_row(
                "SELECT loan_type, loan_amount FROM applicant_loan_request WHERE applicant_id = ?1",
                params![applicant_id],
                |r| {
                    Ok(LoanRequest {
                        loan_type: parsed(r, 0)?,
                        amount: r.get(1)?,
                    })
                },
            )
            .optional()?;

        let mut stmt = conn.prepare(
            "SELECT document_type, field_name, field_value
             FROM applicant_extracted_field WHERE applicant_id = ?1 ORDER BY field_id",
        )?;
        let rows = stmt
            .query_map(params![applicant_id], |r| {
                Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?, r.get::<_, String>(2)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        for (document_type, field_name, value) in rows {
            match ExtractedFieldName::parse(&field_name) {
                Some(field) => profile.extracted_fields.push(ExtractedField { document_type, field, value }),
                None => log::debug!("applicant={applicant_id}: ignoring extracted field {field_name}"),
            }
        }

        Ok(Some(profile))
    }

    fn identifier_holders(&self, kind: IdentifierKind) -> ScreenResult<Vec<(ApplicantId, String)>> {
        let col = identifier_column(kind);
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT applicant_id, {col} FROM applicant
             WHERE {col} IS NOT NULL AND TRIM({col}) <> ''
             ORDER BY applicant_id"
        ))?;
        let rows = stmt
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn applicant_ids(&self) -> ScreenResult<Vec<ApplicantId>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT applicant_id FROM applicant ORDER BY applicant_id")?;
        let ids = stmt
            .query_map([], |r| r.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }
}

impl ScreenStore {
    /// Insert an applicant and all present sub-records. `applicant_id` on
    /// the profile is ignored; the new id is returned.
    pub fn insert_applicant(&self, p: &ApplicantProfile) -> ScreenResult<ApplicantId> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO applicant (
                 first_name, last_name, date_of_birth, gender, phone, email,
                 pan_number, aadhaar_number
             ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8)",
            params![
                p.first_name, p.last_name, date_text(p.date_of_birth), p.gender,
                p.phone, p.email, p.pan_number, p.aadhaar_number,
            ],
        )?;
        let id = tx.last_insert_rowid();

        if let Some(e) = &p.employment {
            tx.execute(
                "INSERT INTO applicant_employment (
                     applicant_id, employer_name, employment_type, monthly_income, start_date
                 ) VALUES (?1,?2,?3,?4,?5)",
                params![id, e.employer_name, e.employment_type, e.monthly_income, date_text(e.start_date)],
            )?;
        }
        if let Some(f) = &p.financials {
            tx.execute(
                "INSERT INTO applicant_financials (
                     applicant_id, bank_name, ifsc_code, total_credit_last_month,
                     total_debit_last_month, anomalies, observed_emi_debits
                 ) VALUES (?1,?2,?3,?4,?5,?6,?7)",
                params![
                    id, f.bank_name, f.ifsc_code, f.total_credit_last_month,
                    f.total_debit_last_month, f.anomalies, f.observed_emi_debits,
                ],
            )?;
        }
        if let Some(c) = &p.credit_history {
            tx.execute(
                "INSERT INTO applicant_credit_history (
                     applicant_id, credit_score, total_active_loans, total_monthly_emi,
                     credit_utilization_ratio, credit_card_count
                 ) VALUES (?1,?2,?3,?4,?5,?6)",
                params![
                    id, c.credit_score, c.total_active_loans, c.total_monthly_emi,
                    c.credit_utilization_ratio, c.credit_card_count,
                ],
            )?;
        }
        if let Some(l) = &p.loan_request {
            tx.execute(
                "INSERT INTO applicant_loan_request (applicant_id, loan_type, loan_amount)
                 VALUES (?1,?2,?3)",
                params![id, l.loan_type.as_str(), l.amount],
            )?;
        }
        for f in &p.extracted_fields {
            tx.execute(
                "INSERT INTO applicant_extracted_field (applicant_id, document_type, field_name, field_value)
                 VALUES (?1,?2,?3,?4)",
                params![id, f.document_type, f.field.as_str(), f.value],
            )?;
        }
        tx.commit()?;
        Ok(id)
    }

    /// Number of stored applicants.
    pub fn applicant_count(&self) -> ScreenResult<i64> {
        let n: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM applicant", [], |r| r.get(0))?;
        Ok(n)
    }
}
