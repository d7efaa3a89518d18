//! Tunable thresholds and weights, loaded from `data/screening/screening_config.json`.
//!
//! Every section is `#[serde(default)]`: a file only has to name what it changes.

use crate::scoring::RiskBands;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InternalScoringConfig {
    pub risk_bands: RiskBands,
    /// Scores at or above this escalate to compliance.
    pub risk_score_threshold: u32,
}

impl Default for InternalScoringConfig {
    fn default() -> Self {
        Self {
            risk_bands: RiskBands { low: 10, medium: 30, high: 60, critical: 100 },
            risk_score_threshold: 70,
        }
    }
}

/// Weights and thresholds of the fixed external checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalRulesConfig {
    pub risk_bands: RiskBands,
    pub conviction_weight: u32,
    pub open_case_weight: u32,
    /// Weight for 1, 2 and 3+ defaulted loans.
    pub default_weights: [u32; 3],
    pub active_loans_threshold: u32,
    pub active_loans_weight: u32,
    pub high_debt_threshold: f64,
    pub high_debt_weight: u32,
    pub bank_accounts_threshold: u32,
    pub bank_accounts_weight: u32,
    pub inactive_accounts_threshold: u32,
    pub inactive_accounts_weight: u32,
    pub expired_document_weight: u32,
    pub unverified_document_weight: u32,
    pub system_error_weight: u32,
    /// Denominator for `risk_score_percentage`.
    pub max_possible_score: u32,
}

impl Default for ExternalRulesConfig {
    fn default() -> Self {
        Self {
            risk_bands: RiskBands { low: 20, medium: 100, high: 150, critical: 200 },
            conviction_weight: 100,
            open_case_weight: 60,
            default_weights: [40, 60, 80],
            active_loans_threshold: 5,
            active_loans_weight: 50,
            high_debt_threshold: 1_000_000.0,
            high_debt_weight: 45,
            bank_accounts_threshold: 10,
            bank_accounts_weight: 30,
            inactive_accounts_threshold: 5,
            inactive_accounts_weight: 25,
            expired_document_weight: 20,
            unverified_document_weight: 15,
            system_error_weight: 25,
            max_possible_score: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConnectionConfig {
    /// Upper bound on the whole external screening, retries included.
    pub timeout_ms: u64,
    /// Total attempts per registry call, including the first.
    pub retry_attempts: u32,
    pub retry_backoff_ms: u64,
}

impl Default for RegistryConnectionConfig {
    fn default() -> Self {
        Self { timeout_ms: 10_000, retry_attempts: 3, retry_backoff_ms: 100 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CombinerConfig {
    pub internal_weight: f64,
    pub external_weight: f64,
    pub risk_bands: RiskBands,
}

impl Default for CombinerConfig {
    fn default() -> Self {
        Self {
            internal_weight: 0.6,
            external_weight: 0.4,
            risk_bands: RiskBands { low: 25, medium: 50, high: 80, critical: 120 },
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreeningConfig {
    pub internal: InternalScoringConfig,
    pub external: ExternalRulesConfig,
    pub registry: RegistryConnectionConfig,
    pub combiner: CombinerConfig,
}

impl ScreeningConfig {
    /// Load from the data/ directory. A missing file means defaults.
    /// In tests, use ScreeningConfig::default_test().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/screening/screening_config.json");
        if !Path::new(&path).exists() {
            log::warn!("{path} not found, using built-in screening defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let cfg: Self = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Defaults with a short registry timeout and no retry backoff.
    pub fn default_test() -> Self {
        let mut cfg = Self::default();
        cfg.registry.timeout_ms = 2_000;
        cfg.registry.retry_backoff_ms = 0;
        cfg
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, bands) in [
            ("internal", &self.internal.risk_bands),
            ("external", &self.external.risk_bands),
            ("combiner", &self.combiner.risk_bands),
        ] {
            if !bands.is_increasing() {
                anyhow::bail!("{name} risk bands must be strictly increasing: {bands:?}");
            }
        }
        let c = &self.combiner;
        if !(c.internal_weight >= 0.0 && c.external_weight >= 0.0) {
            anyhow::bail!(
                "combiner weights must be non-negative: internal={} external={}",
                c.internal_weight,
                c.external_weight
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_other_defaults() {
        let cfg: ScreeningConfig =
            serde_json::from_str(r#"{ "internal": { "risk_score_threshold": 55 } }"#).unwrap();
        assert_eq!(cfg.internal.risk_score_threshold, 55);
        assert_eq!(cfg.internal.risk_bands.critical, 100);
        assert_eq!(cfg.external.conviction_weight, 100);
        assert!((cfg.combiner.internal_weight - 0.6).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_non_monotonic_bands() {
        let mut cfg = ScreeningConfig::default_test();
        cfg.combiner.risk_bands.high = 10;
        assert!(cfg.validate().is_err());
    }
}
