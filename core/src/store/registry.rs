use super::{date, date_text, identifier_column, parsed, ScreenStore};
use crate::{
    error::ScreenResult,
    identifiers::IdentifierKind,
    registry::{
        BankAccount, CriminalRecord, RegistryCounts, RegistryDocument, RegistryImport, RegistryLoan,
        RegistryPerson, RegistrySource,
    },
    types::PersonId,
};
use rusqlite::{params, Row};

const PERSON_COLUMNS: &str =
    "person_id, full_name, date_of_birth, pan_number, aadhaar_number, phone, email";

fn person_from_row(r: &Row<'_>) -> rusqlite::Result<RegistryPerson> {
    Ok(RegistryPerson {
        person_id: r.get(0)?,
        full_name: r.get(1)?,
        date_of_birth: date(r, 2)?,
        pan_number: r.get(3)?,
        aadhaar_number: r.get(4)?,
        phone: r.get(5)?,
        email: r.get(6)?,
    })
}

const HISTORY_TABLES: [&str; 4] = [
    "registry_criminal_record",
    "registry_loan",
    "registry_bank_account",
    "registry_document",
];

fn normalized(kind: IdentifierKind, raw: &Option<String>) -> Option<String> {
    raw.as_deref().and_then(|v| kind.normalize(v))
}

impl RegistrySource for ScreenStore {
    fn find_by_identifier(&self, kind: IdentifierKind, value: &str) -> ScreenResult<Vec<RegistryPerson>> {
        let col = identifier_column(kind);
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {PERSON_COLUMNS} FROM registry_person WHERE {col} = ?1 ORDER BY person_id"
        ))?;
        let rows = stmt
            .query_map(params![value], person_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn criminal_records(&self, person_id: PersonId) -> ScreenResult<Vec<CriminalRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT person_id, case_number, case_type, court_name, status, verdict_date
             FROM registry_criminal_record WHERE person_id = ?1 ORDER BY record_id",
        )?;
        let rows = stmt
            .query_map(params![person_id], |r| {
                Ok(CriminalRecord {
                    person_id: r.get(0)?,
                    case_number: r.get(1)?,
                    case_type: r.get(2)?,
                    court_name: r.get(3)?,
                    status: parsed(r, 4)?,
                    verdict_date: date(r, 5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn loans(&self, person_id: PersonId) -> ScreenResult<Vec<RegistryLoan>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT person_id, loan_type, institution_name, loan_amount,
                    outstanding_balance, status, default_flag
             FROM registry_loan WHERE person_id = ?1 ORDER BY loan_id",
        )?;
        let rows = stmt
            .query_map(params![person_id], |r| {
                Ok(RegistryLoan {
                    person_id: r.get(0)?,
                    loan_type: r.get(1)?,
                    institution_name: r.get(2)?,
                    loan_amount: r.get(3)?,
                    outstanding_balance: r.get(4)?,
                    status: parsed(r, 5)?,
                    default_flag: r.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn bank_accounts(&self, person_id: PersonId) -> ScreenResult<Vec<BankAccount>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT person_id, bank_name, account_number, account_type, balance,
                    last_transaction_date, is_active
             FROM registry_bank_account WHERE person_id = ?1 ORDER BY account_id",
        )?;
        let rows = stmt
            .query_map(params![person_id], |r| {
                Ok(BankAccount {
                    person_id: r.get(0)?,
                    bank_name: r.get(1)?,
                    account_number: r.get(2)?,
                    account_type: r.get(3)?,
                    balance: r.get(4)?,
                    last_transaction_date: date(r, 5)?,
                    is_active: r.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn documents(&self, person_id: PersonId) -> ScreenResult<Vec<RegistryDocument>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT person_id, document_type, document_number, issued_date,
                    expiry_date, verification_status
             FROM registry_document WHERE person_id = ?1 ORDER BY document_id",
        )?;
        let rows = stmt
            .query_map(params![person_id], |r| {
                Ok(RegistryDocument {
                    person_id: r.get(0)?,
                    document_type: r.get(1)?,
                    document_number: r.get(2)?,
                    issued_date: date(r, 3)?,
                    expiry_date: date(r, 4)?,
                    verification_status: parsed(r, 5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

impl ScreenStore {
    /// Load a registry data drop in one transaction. Person identifiers are
    /// stored normalized so lookups compare like with like.
    ///
    /// A person already in the registry is replaced wholesale: their row and
    /// every history row they own are dropped before the new data goes in, so
    /// importing the same drop twice leaves the registry unchanged.
    pub fn import_registry(&self, data: &RegistryImport) -> ScreenResult<RegistryCounts> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let mut replaced = 0usize;
        for p in &data.persons {
            let mut dropped = 0;
            for table in HISTORY_TABLES {
                dropped += tx.execute(&format!("DELETE FROM {table} WHERE person_id = ?1"), params![p.person_id])?;
            }
            if dropped > 0 {
                replaced += 1;
            }
        }
        for p in &data.persons {
            tx.execute(
                "INSERT OR REPLACE INTO registry_person (
                     person_id, full_name, date_of_birth, pan_number, aadhaar_number, phone, email
                 ) VALUES (?1,?2,?3,?4,?5,?6,?7)",
                params![
                    p.person_id,
                    p.full_name,
                    date_text(p.date_of_birth),
                    normalized(IdentifierKind::Pan, &p.pan_number),
                    normalized(IdentifierKind::Aadhaar, &p.aadhaar_number),
                    normalized(IdentifierKind::Phone, &p.phone),
                    normalized(IdentifierKind::Email, &p.email),
                ],
            )?;
        }
        for c in &data.criminal_records {
            tx.execute(
                "INSERT INTO registry_criminal_record (
                     person_id, case_number, case_type, court_name, status, verdict_date
                 ) VALUES (?1,?2,?3,?4,?5,?6)",
                params![
                    c.person_id, c.case_number, c.case_type, c.court_name,
                    c.status.as_str(), date_text(c.verdict_date),
                ],
            )?;
        }
        for l in &data.loans {
            tx.execute(
                "INSERT INTO registry_loan (
                     person_id, loan_type, institution_name, loan_amount,
                     outstanding_balance, status, default_flag
                 ) VALUES (?1,?2,?3,?4,?5,?6,?7)",
                params![
                    l.person_id, l.loan_type, l.institution_name, l.loan_amount,
                    l.outstanding_balance, l.status.as_str(), l.default_flag,
                ],
            )?;
        }
        for b in &data.bank_accounts {
            tx.execute(
                "INSERT INTO registry_bank_account (
                     person_id, bank_name, account_number, account_type, balance,
                     last_transaction_date, is_active
                 ) VALUES (?1,?2,?3,?4,?5,?6,?7)",
                params![
                    b.person_id, b.bank_name, b.account_number, b.account_type, b.balance,
                    date_text(b.last_transaction_date), b.is_active,
                ],
            )?;
        }
        for d in &data.documents {
            tx.execute(
                "INSERT INTO registry_document (
                     person_id, document_type, document_number, issued_date,
                     expiry_date, verification_status
                 ) VALUES (?1,?2,?3,?4,?5,?6)",
                params![
                    d.person_id, d.document_type, d.document_number, date_text(d.issued_date),
                    date_text(d.expiry_date), d.verification_status.as_str(),
                ],
            )?;
        }
        tx.commit()?;

        let counts = RegistryCounts {
            persons: data.persons.len(),
            criminal_records: data.criminal_records.len(),
            loans: data.loans.len(),
            bank_accounts: data.bank_accounts.len(),
            documents: data.documents.len(),
        };
        log::info!(
            "registry import: persons={} (history replaced for {replaced}) criminal={} loans={} accounts={} documents={}",
            counts.persons,
            counts.criminal_records,
            counts.loans,
            counts.bank_accounts,
            counts.documents
        );
        Ok(counts)
    }

    /// Row counts per registry table.
    pub fn registry_stats(&self) -> ScreenResult<RegistryCounts> {
        let conn = self.conn()?;
        let count = |table: &str| -> ScreenResult<usize> {
            let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))?;
            Ok(n.max(0) as usize)
        };
        Ok(RegistryCounts {
            persons: count("registry_person")?,
            criminal_records: count("registry_criminal_record")?,
            loans: count("registry_loan")?,
            bank_accounts: count("registry_bank_account")?,
            documents: count("registry_document")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::identifiers::IdentifierKind;
    use crate::registry::{
        CaseStatus, CriminalRecord, LoanStatus, RegistryImport, RegistryLoan, RegistryPerson,
        RegistrySource,
    };
    use crate::store::ScreenStore;

    fn person(id: i64, pan: &str, phone: &str) -> RegistryPerson {
        RegistryPerson {
            person_id: id,
            full_name: format!("Person {id}"),
            date_of_birth: None,
            pan_number: Some(pan.into()),
            aadhaar_number: None,
            phone: Some(phone.into()),
            email: None,
        }
    }

    fn store_with(data: &RegistryImport) -> ScreenStore {
        let s = ScreenStore::in_memory().unwrap();
        s.migrate().unwrap();
        s.import_registry(data).unwrap();
        s
    }

    /// Raw identifiers are normalized on the way in.
    #[test]
    fn import_normalizes_identifiers() {
        let data = RegistryImport {
            persons: vec![person(7, " abcde1234f ", "+91 98765-43210")],
            ..Default::default()
        };
        let s = store_with(&data);
        let by_pan = s.find_by_identifier(IdentifierKind::Pan, "ABCDE1234F").unwrap();
        assert_eq!(by_pan.len(), 1);
        let by_phone = s.find_by_identifier(IdentifierKind::Phone, "9876543210").unwrap();
        assert_eq!(by_phone[0].person_id, 7);
    }

    /// Shared identifiers come back in person_id order.
    #[test]
    fn multiple_matches_sorted_by_person_id() {
        let data = RegistryImport {
            persons: vec![person(9, "AAAAA1111A", "9000000001"), person(3, "BBBBB2222B", "9000000001")],
            ..Default::default()
        };
        let s = store_with(&data);
        let ids: Vec<i64> = s
            .find_by_identifier(IdentifierKind::Phone, "9000000001")
            .unwrap()
            .iter()
            .map(|p| p.person_id)
            .collect();
        assert_eq!(ids, vec![3, 9]);
    }

    /// Stats mirror what was imported and history rows read back typed.
    #[test]
    fn stats_and_history_round_trip() {
        let data = RegistryImport {
            persons: vec![person(1, "AAAAA1111A", "9000000001")],
            criminal_records: vec![CriminalRecord {
                person_id: 1,
                case_number: "CR-1".into(),
                case_type: "FRAUD".into(),
                court_name: None,
                status: CaseStatus::Convicted,
                verdict_date: None,
            }],
            loans: vec![RegistryLoan {
                person_id: 1,
                loan_type: "personal".into(),
                institution_name: "Bank".into(),
                loan_amount: 1000.0,
                outstanding_balance: 500.0,
                status: LoanStatus::Defaulted,
                default_flag: true,
            }],
            ..Default::default()
        };
        let s = store_with(&data);
        let stats = s.registry_stats().unwrap();
        assert_eq!(stats.persons, 1);
        assert_eq!(stats.criminal_records, 1);
        assert_eq!(stats.loans, 1);

        assert_eq!(s.criminal_records(1).unwrap()[0].status, CaseStatus::Convicted);
        assert!(s.loans(1).unwrap()[0].is_defaulted());
        assert!(s.loans(2).unwrap().is_empty());
    }

    /// Re-importing a drop replaces each person's history instead of doubling it.
    #[test]
    fn reimport_replaces_history() {
        let loan = RegistryLoan {
            person_id: 1,
            loan_type: "personal".into(),
            institution_name: "Bank".into(),
            loan_amount: 1000.0,
            outstanding_balance: 500.0,
            status: LoanStatus::Defaulted,
            default_flag: true,
        };
        let data = RegistryImport {
            persons: vec![person(1, "AAAAA1111A", "9000000001"), person(2, "BBBBB2222B", "9000000002")],
            loans: vec![loan.clone()],
            ..Default::default()
        };
        let s = store_with(&data);
        s.import_registry(&data).unwrap();

        let stats = s.registry_stats().unwrap();
        assert_eq!(stats.persons, 2, "Expected 2, got {}", stats.persons);
        assert_eq!(stats.loans, 1, "Expected 1, got {}", stats.loans);

        let corrected = RegistryImport {
            persons: vec![person(1, "AAAAA1111A", "9000000001")],
            loans: vec![RegistryLoan { status: LoanStatus::Closed, default_flag: false, ..loan }],
            ..Default::default()
        };
        s.import_registry(&corrected).unwrap();
        let loans = s.loans(1).unwrap();
        assert_eq!(loans.len(), 1, "Expected 1, got {}", loans.len());
        assert!(!loans[0].is_defaulted());
    }
}
