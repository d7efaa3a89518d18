//! Internal fraud rule definitions.
//!
//! RULE: Scoring reads rules through a `RuleSnapshot` taken once per
//! request. Nothing in the scoring path mutates a definition.

use crate::{
    error::{ScreenError, ScreenResult},
    types::{RuleCategory, Severity},
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Rule type discriminators understood by the built-in validators.
pub mod rule_types {
    pub const THRESHOLD: &str = "THRESHOLD";
    pub const PATTERN_MATCH: &str = "PATTERN_MATCH";
    pub const DUPLICATE_CHECK: &str = "DUPLICATE_CHECK";
    pub const CROSS_CHECK: &str = "CROSS_CHECK";
}

const DEFAULT_EXECUTION_ORDER: i32 = 100;

fn default_true() -> bool {
    true
}

fn default_execution_order() -> i32 {
    DEFAULT_EXECUTION_ORDER
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDefinition {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: RuleCategory,
    /// Kept as text so an unknown type is a skipped rule, not a load failure.
    pub rule_type: String,
    pub weight: u32,
    pub severity: Severity,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_execution_order")]
    pub execution_order: i32,
    #[serde(default)]
    pub parameters: BTreeMap<String, serde_json::Value>,
}

impl RuleDefinition {
    pub fn param_f64(&self, key: &str, default: f64) -> f64 {
        self.parameters
            .get(key)
            .and_then(|v| v.as_f64().or_else(|| v.as_str().and_then(|s| s.parse().ok())))
            .unwrap_or(default)
    }
}

/// Point-in-time view of the catalogue used for one screening.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RuleSnapshot {
    pub version: i64,
    pub rules: Vec<RuleDefinition>,
}

impl RuleSnapshot {
    pub fn new(version: i64, rules: Vec<RuleDefinition>) -> Self {
        Self { version, rules }
    }

    /// Enabled rules of one category, by execution order then code.
    pub fn enabled_in(&self, category: RuleCategory) -> Vec<&RuleDefinition> {
        let mut rules: Vec<&RuleDefinition> = self
            .rules
            .iter()
            .filter(|r| r.enabled && r.category == category)
            .collect();
        rules.sort_by(|a, b| {
            a.execution_order
                .cmp(&b.execution_order)
                .then_with(|| a.code.cmp(&b.code))
        });
        rules
    }

    pub fn get(&self, code: &str) -> Option<&RuleDefinition> {
        self.rules.iter().find(|r| r.code == code)
    }
}

/// Source of rule snapshots (the administrative configuration store).
pub trait RuleCatalogue: Send + Sync {
    fn rule_snapshot(&self) -> ScreenResult<RuleSnapshot>;
}

/// A fixed snapshot is its own catalogue.
impl RuleCatalogue for RuleSnapshot {
    fn rule_snapshot(&self) -> ScreenResult<RuleSnapshot> {
        Ok(self.clone())
    }
}

// ── Change audit ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleChangeType {
    Created,
    Updated,
    Activated,
    Deactivated,
    PointsChanged,
}

impl RuleChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Updated => "UPDATED",
            Self::Activated => "ACTIVATED",
            Self::Deactivated => "DEACTIVATED",
            Self::PointsChanged => "POINTS_CHANGED",
        }
    }

    pub fn for_enabled(enabled: bool) -> Self {
        if enabled {
            Self::Activated
        } else {
            Self::Deactivated
        }
    }
}

impl FromStr for RuleChangeType {
    type Err = ScreenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CREATED" => Ok(Self::Created),
            "UPDATED" => Ok(Self::Updated),
            "ACTIVATED" => Ok(Self::Activated),
            "DEACTIVATED" => Ok(Self::Deactivated),
            "POINTS_CHANGED" => Ok(Self::PointsChanged),
            _ => Err(ScreenError::InvalidValue { field: "rule change type", value: s.to_string() }),
        }
    }
}

impl fmt::Display for RuleChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who is changing the catalogue, and why. Every admin write carries one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleChange {
    pub changed_by: String,
    pub reason: Option<String>,
}

impl RuleChange {
    pub fn by(changed_by: impl Into<String>) -> Self {
        Self { changed_by: changed_by.into(), reason: None }
    }

    pub fn because(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// One row of a rule's change history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleAuditEntry {
    pub audit_id: i64,
    pub rule_code: String,
    pub change_type: RuleChangeType,
    /// Comma-separated names of the fields that changed; None on creation.
    pub field_name: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub changed_by: String,
    pub change_reason: Option<String>,
    /// Catalogue version the change produced.
    pub catalogue_version: i64,
    pub changed_at: String,
}

/// Names of the fields that differ between two versions of a rule.
pub fn changed_fields(old: &RuleDefinition, new: &RuleDefinition) -> Vec<&'static str> {
    let mut fields = Vec::new();
    if old.name != new.name {
        fields.push("name");
    }
    if old.description != new.description {
        fields.push("description");
    }
    if old.category != new.category {
        fields.push("category");
    }
    if old.rule_type != new.rule_type {
        fields.push("rule_type");
    }
    if old.weight != new.weight {
        fields.push("weight");
    }
    if old.severity != new.severity {
        fields.push("severity");
    }
    if old.enabled != new.enabled {
        fields.push("enabled");
    }
    if old.execution_order != new.execution_order {
        fields.push("execution_order");
    }
    if old.parameters != new.parameters {
        fields.push("parameters");
    }
    fields
}

// ── Default catalogue ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RulesFile {
    rules: Vec<RuleDefinition>,
}

fn parse_rules(content: &str) -> ScreenResult<Vec<RuleDefinition>> {
    let file: RulesFile = serde_json::from_str(content)?;
    check_unique_codes(&file.rules)?;
    Ok(file.rules)
}

/// The catalogue shipped with the crate.
pub fn default_rules() -> ScreenResult<Vec<RuleDefinition>> {
    parse_rules(include_str!("../../data/rules/fraud_rules.json"))
}

/// Load a catalogue from a JSON file shaped like `data/rules/fraud_rules.json`.
pub fn load_rule_file(path: &str) -> anyhow::Result<Vec<RuleDefinition>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
    Ok(parse_rules(&content)?)
}

pub fn check_unique_codes(rules: &[RuleDefinition]) -> ScreenResult<()> {
    let mut seen = BTreeSet::new();
    for rule in rules {
        if !seen.insert(rule.code.as_str()) {
            return Err(ScreenError::InvalidValue { field: "rule code", value: rule.code.clone() });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shipped_catalogue_parses_and_covers_every_category() {
        let rules = default_rules().unwrap();
        for category in RuleCategory::ALL {
            assert!(
                rules.iter().any(|r| r.category == category),
                "No default rule for {}",
                category.as_str()
            );
        }
    }

    #[test]
    fn enabled_in_orders_by_execution_order_then_code() {
        let mk = |code: &str, order: i32, enabled: bool| RuleDefinition {
            code: code.into(),
            name: code.into(),
            description: String::new(),
            category: RuleCategory::Financial,
            rule_type: rule_types::THRESHOLD.into(),
            weight: 10,
            severity: Severity::Low,
            enabled,
            execution_order: order,
            parameters: BTreeMap::new(),
        };
        let snap = RuleSnapshot::new(1, vec![mk("B", 10, true), mk("A", 10, true), mk("C", 5, true), mk("D", 1, false)]);
        let codes: Vec<&str> = snap
            .enabled_in(RuleCategory::Financial)
            .iter()
            .map(|r| r.code.as_str())
            .collect();
        assert_eq!(codes, vec!["C", "A", "B"]);
    }

    #[test]
    fn duplicate_codes_rejected() {
        let json = r#"{ "rules": [
            { "code": "X", "name": "x", "category": "IDENTITY", "rule_type": "THRESHOLD", "weight": 1, "severity": "LOW" },
            { "code": "X", "name": "x", "category": "IDENTITY", "rule_type": "THRESHOLD", "weight": 1, "severity": "LOW" }
        ] }"#;
        assert!(parse_rules(json).is_err());
    }

    #[test]
    fn changed_fields_lists_only_differences() {
        let base = default_rules().unwrap().into_iter().find(|r| r.code == "DUPLICATE_PAN").unwrap();
        assert!(changed_fields(&base, &base).is_empty());
        let mut edited = base.clone();
        edited.weight += 5;
        edited.parameters.insert("MIN".into(), serde_json::json!(1));
        assert_eq!(changed_fields(&base, &edited), vec!["weight", "parameters"]);
    }

    #[test]
    fn change_type_text_round_trips() {
        for t in [
            RuleChangeType::Created,
            RuleChangeType::Updated,
            RuleChangeType::Activated,
            RuleChangeType::Deactivated,
            RuleChangeType::PointsChanged,
        ] {
            assert_eq!(t.as_str().parse::<RuleChangeType>().unwrap(), t);
        }
        assert!("DELETED".parse::<RuleChangeType>().is_err());
    }
}
