//! Screening entry points: internal, external and combined.
//!
//! RULE: screen_combined never returns an error. Every fault on either side
//! ends up inside the verdict.
//!
//! RULE: Rules are read once per request. Nothing is cached between
//! screenings.
//!
//! Combined flow:
//!   1. Fetch the applicant profile
//!   2. Start external screening on its worker
//!   3. Run internal scoring on the calling thread
//!   4. Wait for the external result (bounded by the registry timeout)
//!   5. Combine

use crate::{
    applicant::{ApplicantProfile, ApplicantSource},
    combiner::{CombinedVerdict, Combiner},
    config::ScreeningConfig,
    error::{ScreenError, ScreenResult},
    external_aggregator::ExternalAggregator,
    external_engine::CheckOptions,
    identifiers::Identifiers,
    internal_aggregator::InternalAggregator,
    registry::RegistrySource,
    rule_catalogue::RuleCatalogue,
    scoring::ScoringResult,
    store::ScreenStore,
    types::ApplicantId,
};
use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use std::time::Instant;

pub struct FraudScreeningService {
    applicants: Arc<dyn ApplicantSource>,
    rules: Arc<dyn RuleCatalogue>,
    internal: InternalAggregator,
    external: ExternalAggregator,
    combiner: Combiner,
    reference_date: Option<NaiveDate>,
}

impl FraudScreeningService {
    pub fn new(
        cfg: &ScreeningConfig,
        applicants: Arc<dyn ApplicantSource>,
        rules: Arc<dyn RuleCatalogue>,
        registry: Arc<dyn RegistrySource>,
    ) -> Self {
        Self {
            applicants,
            rules,
            internal: InternalAggregator::from_config(cfg),
            external: ExternalAggregator::from_config(cfg, registry),
            combiner: Combiner::new(cfg.combiner.clone()),
            reference_date: None,
        }
    }

    /// One store serving applicants, rules and the registry.
    pub fn from_store(cfg: &ScreeningConfig, store: Arc<ScreenStore>) -> Self {
        Self::new(cfg, store.clone(), store.clone(), store)
    }

    /// Pin "today" for age and tenure rules.
    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self
    }

    fn today(&self) -> NaiveDate {
        self.reference_date.unwrap_or_else(|| Utc::now().date_naive())
    }

    fn profile(&self, applicant_id: ApplicantId) -> ScreenResult<ApplicantProfile> {
        self.applicants
            .applicant_profile(applicant_id)?
            .ok_or(ScreenError::ApplicantNotFound { applicant_id })
    }

    fn score_internal(&self, profile: &ApplicantProfile) -> ScreenResult<ScoringResult> {
        let snapshot = self.rules.rule_snapshot()?;
        self.internal
            .screen(profile, self.applicants.as_ref(), &snapshot, self.today())
    }

    pub fn screen_internal(&self, applicant_id: ApplicantId) -> ScreenResult<ScoringResult> {
        let profile = self.profile(applicant_id)?;
        self.score_internal(&profile)
    }

    pub fn screen_external(&self, identifiers: Identifiers, options: CheckOptions) -> ScreenResult<ScoringResult> {
        self.external.screen(identifiers, options)
    }

    /// External screening keyed by the identifiers on file for an applicant.
    pub fn screen_external_for_applicant(&self, applicant_id: ApplicantId) -> ScreenResult<ScoringResult> {
        let profile = self.profile(applicant_id)?;
        self.screen_external(Identifiers::from_profile(&profile), CheckOptions::default())
    }

    pub fn screen_combined(&self, applicant_id: ApplicantId) -> CombinedVerdict {
        let started = Instant::now();

        let (internal, external) = match self.profile(applicant_id) {
            Ok(profile) => {
                let identifiers = Identifiers::from_profile(&profile);
                log::info!("applicant={applicant_id} screening started ({})", identifiers.masked());
                match self.external.start(identifiers, CheckOptions::default()) {
                    Ok(pending) => {
                        let internal = self.score_internal(&profile);
                        (internal, pending.wait())
                    }
                    Err(e) => (self.score_internal(&profile), Err(e)),
                }
            }
            Err(e @ ScreenError::ApplicantNotFound { .. }) => {
                log::warn!("applicant={applicant_id} not found");
                (Err(e), Err(ScreenError::ApplicantNotFound { applicant_id }))
            }
            Err(e) => {
                log::error!("applicant={applicant_id} data unavailable: {e}");
                let external = Err(ScreenError::Other(anyhow::anyhow!("applicant data unavailable: {e}")));
                (Err(e), external)
            }
        };

        let mut verdict = self.combiner.combine(applicant_id, internal, external);
        verdict.elapsed_ms = started.elapsed().as_millis() as u64;

        let log_line = format!(
            "applicant={applicant_id} verdict: {} / {} combined={} errors={} elapsed={}ms",
            verdict.final_risk_level,
            verdict.final_recommendation,
            verdict.combined_score,
            verdict.has_errors,
            verdict.elapsed_ms
        );
        if verdict.has_errors {
            log::warn!("{log_line}");
        } else {
            log::info!("{log_line}");
        }
        verdict
    }

    /// Combined screening of every applicant on file, in id order.
    pub fn screen_all(&self) -> ScreenResult<Vec<CombinedVerdict>> {
        let ids = self.applicants.applicant_ids()?;
        Ok(ids.into_iter().map(|id| self.screen_combined(id)).collect())
    }
}
