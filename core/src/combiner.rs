//! Merge internal and external results into one verdict.
//!
//! Final level, first rule that applies:
//!   1. external found a conviction                         -> CRITICAL / REJECT
//!   2. either side CRITICAL, any loan default, or
//!      combined score >= critical band                     -> CRITICAL / REJECT
//!   3. combined score against the combiner bands           -> HIGH / MEDIUM / LOW / CLEAN
//!
//! If either side failed outright the verdict is HIGH / REVIEW with
//! has_errors set, unless rule 1 applies.
//!
//! RULE: combine never fails. Callers always get a verdict.

use crate::{
    config::CombinerConfig,
    error::ScreenResult,
    external_engine::SYSTEM_ERROR_CODE,
    scoring::{Flag, ScoringResult},
    types::{ApplicantId, FlagSource, Recommendation, RiskLevel},
};
use chrono::{DateTime, Utc};
use serde::Serialize;

// ── Insight text ─────────────────────────────────────────────────────────────

pub const INSIGHT_INTERNAL_DOMINANT: &str =
    "Internal fraud indicators significantly higher than external - possible data inconsistency";
pub const INSIGHT_EXTERNAL_DOMINANT: &str =
    "External fraud indicators significantly higher than internal - applicant may have hidden negative history";
pub const INSIGHT_REGISTRY_FOUND: &str =
    "Applicant found in external registry - comprehensive screening performed";
pub const INSIGHT_CRIMINAL_RECORD: &str = "Criminal record found - high risk applicant";
pub const INSIGHT_LOAN_DEFAULTS: &str = "Previous loan defaults detected - credit risk concern";
pub const INSIGHT_ACTIVE_LOANS: &str = "Multiple active loans detected - potential over-leveraging";
pub const INSIGHT_REGISTRY_NOT_FOUND: &str =
    "Applicant not found in external registry - limited external verification available";
pub const INSIGHT_REGISTRY_UNAVAILABLE: &str =
    "External registry unavailable - external verification incomplete";
pub const INSIGHT_MULTIPLE_HIGH_RISK: &str =
    "Multiple high-risk fraud indicators detected across internal and external sources";

const ACTIVE_LOANS_INSIGHT_THRESHOLD: u32 = 3;
const HIGH_RISK_FLAGS_INSIGHT_THRESHOLD: usize = 3;

/// A flag borrowed from one side of a verdict, tagged with that side.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TaggedFlag<'a> {
    pub source: FlagSource,
    #[serde(flatten)]
    pub flag: &'a Flag,
}

#[derive(Debug, Clone, Serialize)]
pub struct CombinedVerdict {
    pub screening_id: String,
    pub applicant_id: ApplicantId,
    pub internal: Option<ScoringResult>,
    pub external: Option<ScoringResult>,
    pub combined_score: u32,
    pub final_risk_level: RiskLevel,
    pub final_recommendation: Recommendation,
    pub insights: Vec<String>,
    pub has_errors: bool,
    pub error_message: Option<String>,
    pub screened_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

impl CombinedVerdict {
    /// Internal flags then external flags. No deduplication across sources.
    pub fn flags(&self) -> impl Iterator<Item = TaggedFlag<'_>> + '_ {
        tagged(FlagSource::Internal, self.internal.as_ref())
            .chain(tagged(FlagSource::External, self.external.as_ref()))
    }

    pub fn high_risk_flag_count(&self) -> usize {
        self.flags().filter(|t| t.flag.severity.is_high_risk()).count()
    }

    pub fn has_conviction(&self) -> bool {
        self.external.as_ref().is_some_and(|r| r.convicted_cases() > 0)
    }
}

fn tagged(source: FlagSource, result: Option<&ScoringResult>) -> impl Iterator<Item = TaggedFlag<'_>> {
    result
        .into_iter()
        .flat_map(|r| r.flags.iter())
        .map(move |flag| TaggedFlag { source, flag })
}

pub struct Combiner {
    cfg: CombinerConfig,
}

impl Combiner {
    pub fn new(cfg: CombinerConfig) -> Self {
        Self { cfg }
    }

    /// `round(internal x w_i + external x w_e)`
    pub fn combined_score(&self, internal: u32, external: u32) -> u32 {
        let weighted = internal as f64 * self.cfg.internal_weight + external as f64 * self.cfg.external_weight;
        weighted.round().max(0.0) as u32
    }

    pub fn combine(
        &self,
        applicant_id: ApplicantId,
        internal: ScreenResult<ScoringResult>,
        external: ScreenResult<ScoringResult>,
    ) -> CombinedVerdict {
        let mut errors = Vec::new();
        let internal = internal
            .map_err(|e| errors.push(format!("Internal screening failed: {e}")))
            .ok();
        let external = external
            .map_err(|e| errors.push(format!("External screening failed: {e}")))
            .ok();

        let internal_score = internal.as_ref().map(|r| r.total_score).unwrap_or(0);
        let external_score = external.as_ref().map(|r| r.total_score).unwrap_or(0);

        let mut verdict = CombinedVerdict {
            screening_id: uuid::Uuid::new_v4().to_string(),
            applicant_id,
            internal,
            external,
            combined_score: self.combined_score(internal_score, external_score),
            final_risk_level: RiskLevel::Clean,
            final_recommendation: Recommendation::Approve,
            insights: Vec::new(),
            has_errors: !errors.is_empty(),
            error_message: None,
            screened_at: Utc::now(),
            elapsed_ms: 0,
        };

        let (level, recommendation) = self.resolve(&verdict);
        verdict.final_risk_level = level;
        verdict.final_recommendation = recommendation;
        verdict.insights = self.insights(&verdict);
        verdict.insights.extend(errors.iter().cloned());
        if verdict.has_errors {
            verdict.error_message = Some(errors.join("; "));
        }
        verdict
    }

    fn resolve(&self, v: &CombinedVerdict) -> (RiskLevel, Recommendation) {
        if v.has_conviction() {
            return (RiskLevel::Critical, Recommendation::Reject);
        }
        if v.has_errors {
            return (RiskLevel::High, Recommendation::Review);
        }

        let side_critical = [&v.internal, &v.external]
            .into_iter()
            .flatten()
            .any(|r| r.risk_level == RiskLevel::Critical);
        let any_default = v.external.as_ref().is_some_and(|r| r.defaulted_loans() > 0);
        if side_critical || any_default || v.combined_score >= self.cfg.risk_bands.critical {
            return (RiskLevel::Critical, Recommendation::Reject);
        }

        let level = self.cfg.risk_bands.classify(v.combined_score);
        (level, level.recommendation())
    }

    fn insights(&self, v: &CombinedVerdict) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();

        if let (Some(i), Some(e)) = (&v.internal, &v.external) {
            let (i, e) = (i.total_score as u64, e.total_score as u64);
            if i > 2 * e {
                out.push(INSIGHT_INTERNAL_DOMINANT.into());
            } else if e > 2 * i {
                out.push(INSIGHT_EXTERNAL_DOMINANT.into());
            }
        }

        let registry_fault = v.external.as_ref().is_some_and(|r| r.has_flag(SYSTEM_ERROR_CODE));
        if registry_fault {
            out.push(INSIGHT_REGISTRY_UNAVAILABLE.into());
        }

        if let Some(findings) = v.external.as_ref().and_then(|r| r.findings.as_ref()) {
            if findings.person_found {
                out.push(INSIGHT_REGISTRY_FOUND.into());
                if findings.ambiguous_match {
                    let by = findings.matched_by.map(|k| k.label()).unwrap_or("identifier");
                    out.push(format!(
                        "Registry match chosen from {} candidates by {by} - confirm identity manually",
                        findings.match_candidates
                    ));
                }
                if findings.convicted_cases > 0 {
                    out.push(INSIGHT_CRIMINAL_RECORD.into());
                }
                if findings.defaulted_loans > 0 {
                    out.push(INSIGHT_LOAN_DEFAULTS.into());
                }
                if findings.active_loans >= ACTIVE_LOANS_INSIGHT_THRESHOLD {
                    out.push(INSIGHT_ACTIVE_LOANS.into());
                }
            } else if !registry_fault {
                out.push(INSIGHT_REGISTRY_NOT_FOUND.into());
            }
        }

        if v.high_risk_flag_count() >= HIGH_RISK_FLAGS_INSIGHT_THRESHOLD {
            out.push(INSIGHT_MULTIPLE_HIGH_RISK.into());
        }
        out
    }
}
