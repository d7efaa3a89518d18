//! Registry identity matching: priority order, ambiguity, fault handling.

use fraudscreen_core::{
    combiner::Combiner,
    config::{CombinerConfig, ScreeningConfig},
    error::{ScreenError, ScreenResult},
    external_engine::{CheckOptions, ExternalRuleEngine},
    identifiers::{aadhaar_with_check_digit, IdentifierKind, Identifiers},
    identity_matcher::{IdentityMatcher, MatchOutcome},
    registry::{
        BankAccount, CriminalRecord, RegistryDocument, RegistryImport, RegistryLoan, RegistryPerson,
        RegistrySource,
    },
    store::ScreenStore,
};

fn person(id: i64, pan: Option<&str>, aadhaar: Option<String>, phone: Option<&str>, email: Option<&str>) -> RegistryPerson {
    RegistryPerson {
        person_id: id,
        full_name: format!("Registry Person {id}"),
        date_of_birth: None,
        pan_number: pan.map(str::to_string),
        aadhaar_number: aadhaar,
        phone: phone.map(str::to_string),
        email: email.map(str::to_string),
    }
}

fn registry(persons: Vec<RegistryPerson>) -> ScreenStore {
    let store = ScreenStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    store
        .import_registry(&RegistryImport { persons, ..Default::default() })
        .expect("import");
    store
}

fn matched(outcome: MatchOutcome) -> fraudscreen_core::identity_matcher::RegistryMatch {
    match outcome {
        MatchOutcome::Matched(m) => m,
        MatchOutcome::NotFound => panic!("Expected a registry match"),
    }
}

/// PAN wins over every other identifier, even when they point elsewhere.
#[test]
fn pan_takes_priority_over_other_identifiers() {
    let aadhaar = aadhaar_with_check_digit("39876543210");
    let store = registry(vec![
        person(1, Some("ABCPK1234L"), None, None, None),
        person(2, None, aadhaar.clone(), Some("9812345678"), Some("k@example.com")),
    ]);
    let ids = Identifiers::new(Some("abcpk1234l"), aadhaar.as_deref(), Some("9812345678"), Some("k@example.com"));

    let m = matched(IdentityMatcher::new(&store).resolve(&ids).unwrap());
    assert_eq!(m.person.person_id, 1);
    assert_eq!(m.matched_by, IdentifierKind::Pan);
    assert!(!m.is_ambiguous());
}

/// Lookups fall through in order: PAN, Aadhaar, phone, email.
#[test]
fn falls_through_to_later_identifiers() {
    let aadhaar = aadhaar_with_check_digit("39876543210");
    let store = registry(vec![
        person(10, None, aadhaar.clone(), None, None),
        person(20, None, None, Some("9812345678"), None),
        person(30, None, None, None, Some("last@example.com")),
    ]);

    let by_aadhaar = Identifiers::new(Some("ZZZPZ0000Z"), aadhaar.as_deref(), Some("9812345678"), None);
    let m = matched(IdentityMatcher::new(&store).resolve(&by_aadhaar).unwrap());
    assert_eq!((m.person.person_id, m.matched_by), (10, IdentifierKind::Aadhaar));

    let by_phone = Identifiers::new(None, None, Some("+91 98123 45678"), Some("last@example.com"));
    let m = matched(IdentityMatcher::new(&store).resolve(&by_phone).unwrap());
    assert_eq!((m.person.person_id, m.matched_by), (20, IdentifierKind::Phone));

    let by_email = Identifiers::new(None, None, None, Some("  LAST@example.com "));
    let m = matched(IdentityMatcher::new(&store).resolve(&by_email).unwrap());
    assert_eq!((m.person.person_id, m.matched_by), (30, IdentifierKind::Email));
}

/// A shared phone picks the lowest person_id and is marked ambiguous.
#[test]
fn shared_phone_is_ambiguous_and_deterministic() {
    let store = registry(vec![
        person(42, None, None, Some("9700000001"), None),
        person(7, None, None, Some("9700000001"), None),
        person(19, None, None, Some("9700000001"), None),
    ]);
    let ids = Identifiers::new(None, None, Some("9700000001"), None);

    for _ in 0..3 {
        let m = matched(IdentityMatcher::new(&store).resolve(&ids).unwrap());
        assert_eq!(m.person.person_id, 7, "Expected lowest person_id, got {}", m.person.person_id);
        assert_eq!(m.candidates, 3);
        assert!(m.is_ambiguous());
    }
}

/// The ambiguity reaches the findings and the combined insights.
#[test]
fn ambiguous_match_surfaces_in_insights() {
    let store = registry(vec![
        person(3, None, None, None, Some("shared@example.com")),
        person(4, None, None, None, Some("shared@example.com")),
    ]);
    let engine = ExternalRuleEngine::from_config(&ScreeningConfig::default_test());
    let ids = Identifiers::new(None, None, None, Some("shared@example.com"));

    let external = engine.perform_check(&store, &ids, &CheckOptions::default());
    let findings = external.findings.as_ref().unwrap();
    assert!(findings.ambiguous_match);
    assert_eq!(findings.match_candidates, 2);
    assert_eq!(findings.person_id, Some(3));

    let internal = fraudscreen_core::scoring::ScoringResult::new(fraudscreen_core::scoring::Subject::Applicant(1));
    let v = Combiner::new(CombinerConfig::default()).combine(1, Ok(internal), Ok(external));
    assert!(
        v.insights.iter().any(|s| s.starts_with("Registry match chosen from 2 candidates by email")),
        "Insights: {:?}",
        v.insights
    );
}

/// No identifier matching anything is a clean not-found, not an error.
#[test]
fn nothing_matches_is_not_found() {
    let store = registry(vec![person(1, Some("ABCPK1234L"), None, None, None)]);
    let ids = Identifiers::new(Some("ABCPK9999L"), None, Some("9000000000"), None);
    assert_eq!(IdentityMatcher::new(&store).resolve(&ids).unwrap(), MatchOutcome::NotFound);
    assert_eq!(IdentityMatcher::new(&store).resolve(&Identifiers::default()).unwrap(), MatchOutcome::NotFound);
}

/// Lookup faults propagate instead of reading as "not found".
#[test]
fn lookup_fault_is_an_error() {
    let ids = Identifiers::new(Some("ABCPK1234L"), None, None, None);
    let err = IdentityMatcher::new(&Unavailable).resolve(&ids).unwrap_err();
    assert!(matches!(err, ScreenError::RegistryUnavailable(_)), "Got {err}");
}

struct Unavailable;

impl RegistrySource for Unavailable {
    fn find_by_identifier(&self, _: IdentifierKind, _: &str) -> ScreenResult<Vec<RegistryPerson>> {
        Err(ScreenError::RegistryUnavailable("maintenance window".into()))
    }
    fn criminal_records(&self, _: i64) -> ScreenResult<Vec<CriminalRecord>> {
        Ok(Vec::new())
    }
    fn loans(&self, _: i64) -> ScreenResult<Vec<RegistryLoan>> {
        Ok(Vec::new())
    }
    fn bank_accounts(&self, _: i64) -> ScreenResult<Vec<BankAccount>> {
        Ok(Vec::new())
    }
    fn documents(&self, _: i64) -> ScreenResult<Vec<RegistryDocument>> {
        Ok(Vec::new())
    }
}
