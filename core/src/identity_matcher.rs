//! Resolve an applicant's identifiers to at most one registry person.
//!
//! Lookup order is fixed: PAN, Aadhaar, phone, email. The first identifier
//! that yields any candidate decides the match; later identifiers are not
//! consulted. When that lookup returns several candidates the lowest
//! person_id is taken and the match is marked ambiguous so callers can
//! route it to manual review.

use crate::{
    error::ScreenResult,
    identifiers::{mask, IdentifierKind, Identifiers},
    registry::{RegistryPerson, RegistrySource},
};

#[derive(Debug, Clone, PartialEq)]
pub struct RegistryMatch {
    pub person: RegistryPerson,
    pub matched_by: IdentifierKind,
    /// Candidates returned by the deciding lookup (>= 1).
    pub candidates: usize,
}

impl RegistryMatch {
    pub fn is_ambiguous(&self) -> bool {
        self.candidates > 1
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    Matched(RegistryMatch),
    /// No identifier yielded a candidate. A clean outcome, not an error.
    NotFound,
}

pub struct IdentityMatcher<'a> {
    registry: &'a dyn RegistrySource,
}

impl<'a> IdentityMatcher<'a> {
    pub fn new(registry: &'a dyn RegistrySource) -> Self {
        Self { registry }
    }

    /// Lookup faults propagate; they are never read as "not found".
    pub fn resolve(&self, identifiers: &Identifiers) -> ScreenResult<MatchOutcome> {
        for kind in IdentifierKind::PRIORITY {
            let Some(value) = identifiers.get(kind) else {
                continue;
            };
            let mut candidates = self.registry.find_by_identifier(kind, value)?;
            if candidates.is_empty() {
                log::debug!("registry: no match by {} {}", kind.label(), mask(value));
                continue;
            }
            candidates.sort_by_key(|p| p.person_id);
            let count = candidates.len();
            if count > 1 {
                log::warn!(
                    "registry: {count} candidates for {} {}, taking person {}",
                    kind.label(),
                    mask(value),
                    candidates[0].person_id
                );
            }
            let person = candidates.swap_remove(0);
            return Ok(MatchOutcome::Matched(RegistryMatch {
                person,
                matched_by: kind,
                candidates: count,
            }));
        }
        Ok(MatchOutcome::NotFound)
    }
}
