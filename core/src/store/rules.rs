use super::{conversion_error, parsed, ScreenStore};
use crate::{
    error::{ScreenError, ScreenResult},
    rule_catalogue::{
        changed_fields, default_rules, RuleAuditEntry, RuleCatalogue, RuleChange, RuleChangeType,
        RuleDefinition, RuleSnapshot,
    },
};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeMap;

const RULE_COLUMNS: &str = "rule_code, rule_name, description, category, rule_type, weight,
                            severity, enabled, execution_order, parameters";

/// Author recorded for changes the store makes on its own.
const SYSTEM_USER: &str = "system";

impl RuleCatalogue for ScreenStore {
    fn rule_snapshot(&self) -> ScreenResult<RuleSnapshot> {
        let conn = self.conn()?;
        let version = catalogue_version(&conn)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {RULE_COLUMNS} FROM fraud_rule_definition ORDER BY execution_order, rule_code"
        ))?;
        let rules = stmt
            .query_map([], rule_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(RuleSnapshot::new(version, rules))
    }
}

fn rule_from_row(r: &Row<'_>) -> rusqlite::Result<RuleDefinition> {
    let raw_params: String = r.get(9)?;
    let parameters: BTreeMap<String, serde_json::Value> =
        serde_json::from_str(&raw_params).map_err(|e| conversion_error(9, e))?;
    Ok(RuleDefinition {
        code: r.get(0)?,
        name: r.get(1)?,
        description: r.get(2)?,
        category: parsed(r, 3)?,
        rule_type: r.get(4)?,
        weight: r.get(5)?,
        severity: parsed(r, 6)?,
        enabled: r.get(7)?,
        execution_order: r.get(8)?,
        parameters,
    })
}

fn catalogue_version(conn: &Connection) -> ScreenResult<i64> {
    let v: i64 = conn.query_row(
        "SELECT version FROM fraud_rule_catalogue_version WHERE id = 1",
        [],
        |r| r.get(0),
    )?;
    Ok(v)
}

fn bump_version(conn: &Connection) -> ScreenResult<()> {
    conn.execute(
        "UPDATE fraud_rule_catalogue_version SET version = version + 1 WHERE id = 1",
        [],
    )?;
    Ok(())
}

fn write_rule(conn: &Connection, rule: &RuleDefinition) -> ScreenResult<()> {
    let parameters = serde_json::to_string(&rule.parameters)?;
    conn.execute(
        "INSERT INTO fraud_rule_definition (
             rule_code, rule_name, description, category, rule_type, weight,
             severity, enabled, execution_order, parameters
         ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10)
         ON CONFLICT(rule_code) DO UPDATE SET
             rule_name       = excluded.rule_name,
             description     = excluded.description,
             category        = excluded.category,
             rule_type       = excluded.rule_type,
             weight          = excluded.weight,
             severity        = excluded.severity,
             enabled         = excluded.enabled,
             execution_order = excluded.execution_order,
             parameters      = excluded.parameters,
             updated_at      = datetime('now')",
        params![
            rule.code,
            rule.name,
            rule.description,
            rule.category.as_str(),
            rule.rule_type,
            rule.weight,
            rule.severity.as_str(),
            rule.enabled,
            rule.execution_order,
            parameters,
        ],
    )?;
    Ok(())
}

fn stored_rule(conn: &Connection, code: &str) -> ScreenResult<Option<RuleDefinition>> {
    let rule = conn
        .query_row(
            &format!("SELECT {RULE_COLUMNS} FROM fraud_rule_definition WHERE rule_code = ?1"),
            params![code],
            rule_from_row,
        )
        .optional()?;
    Ok(rule)
}

/// An audit row before the version and author are stamped on it.
struct AuditRow {
    rule_code: String,
    change_type: RuleChangeType,
    field_name: Option<String>,
    old_value: Option<String>,
    new_value: Option<String>,
}

/// Bump the catalogue version and append `rows` stamped with it.
fn record_change(conn: &Connection, rows: &[AuditRow], change: &RuleChange) -> ScreenResult<i64> {
    bump_version(conn)?;
    let version = catalogue_version(conn)?;
    for row in rows {
        conn.execute(
            "INSERT INTO fraud_rule_audit (
                 rule_code, change_type, field_name, old_value, new_value,
                 changed_by, change_reason, catalogue_version
             ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8)",
            params![
                row.rule_code,
                row.change_type.as_str(),
                row.field_name,
                row.old_value,
                row.new_value,
                change.changed_by,
                change.reason,
                version,
            ],
        )?;
    }
    Ok(version)
}

fn created_row(rule: &RuleDefinition) -> ScreenResult<AuditRow> {
    Ok(AuditRow {
        rule_code: rule.code.clone(),
        change_type: RuleChangeType::Created,
        field_name: None,
        old_value: None,
        new_value: Some(serde_json::to_string(rule)?),
    })
}

fn audit_from_row(r: &Row<'_>) -> rusqlite::Result<RuleAuditEntry> {
    Ok(RuleAuditEntry {
        audit_id: r.get(0)?,
        rule_code: r.get(1)?,
        change_type: parsed(r, 2)?,
        field_name: r.get(3)?,
        old_value: r.get(4)?,
        new_value: r.get(5)?,
        changed_by: r.get(6)?,
        change_reason: r.get(7)?,
        catalogue_version: r.get(8)?,
        changed_at: r.get(9)?,
    })
}

// ── Administration ───────────────────────────────────────────────────────────
// Every write bumps the catalogue version and appends its audit rows in the
// same transaction. A write that changes nothing is skipped entirely.

impl ScreenStore {
    pub fn rule_catalogue_version(&self) -> ScreenResult<i64> {
        let conn = self.conn()?;
        catalogue_version(&conn)
    }

    pub fn rule_count(&self) -> ScreenResult<i64> {
        let n: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM fraud_rule_definition", [], |r| r.get(0))?;
        Ok(n)
    }

    /// Insert or replace a rule definition. Returns false when the stored
    /// rule already matches and nothing was written.
    pub fn upsert_rule(&self, rule: &RuleDefinition, change: &RuleChange) -> ScreenResult<bool> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let row = match stored_rule(&tx, &rule.code)? {
            None => created_row(rule)?,
            Some(old) => {
                let fields = changed_fields(&old, rule);
                if fields.is_empty() {
                    log::info!("rule {} unchanged, nothing saved", rule.code);
                    return Ok(false);
                }
                AuditRow {
                    rule_code: rule.code.clone(),
                    change_type: RuleChangeType::Updated,
                    field_name: Some(fields.join(",")),
                    old_value: Some(serde_json::to_string(&old)?),
                    new_value: Some(serde_json::to_string(rule)?),
                }
            }
        };
        write_rule(&tx, rule)?;
        let version = record_change(&tx, &[row], change)?;
        tx.commit()?;
        log::info!(
            "rule {} saved by {} (weight={} enabled={} version={version})",
            rule.code,
            change.changed_by,
            rule.weight,
            rule.enabled
        );
        Ok(true)
    }

    /// Load the shipped catalogue into an empty table. Returns the number of
    /// rules written; an already populated catalogue is left alone.
    pub fn seed_default_rules(&self) -> ScreenResult<usize> {
        let rules = default_rules()?;
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let existing: i64 = tx.query_row("SELECT COUNT(*) FROM fraud_rule_definition", [], |r| r.get(0))?;
        if existing > 0 {
            return Ok(0);
        }
        let mut rows = Vec::with_capacity(rules.len());
        for rule in &rules {
            write_rule(&tx, rule)?;
            rows.push(created_row(rule)?);
        }
        record_change(&tx, &rows, &RuleChange::by(SYSTEM_USER).because("default catalogue"))?;
        tx.commit()?;
        log::info!("seeded {} default fraud rules", rules.len());
        Ok(rules.len())
    }

    /// Returns false when the rule was already in the requested state.
    pub fn set_rule_enabled(&self, code: &str, enabled: bool, change: &RuleChange) -> ScreenResult<bool> {
        let changed = self.edit_rule(code, change, |rule| {
            if rule.enabled == enabled {
                return None;
            }
            let row = AuditRow {
                rule_code: rule.code.clone(),
                change_type: RuleChangeType::for_enabled(enabled),
                field_name: Some("enabled".into()),
                old_value: Some(rule.enabled.to_string()),
                new_value: Some(enabled.to_string()),
            };
            rule.enabled = enabled;
            Some(row)
        })?;
        if changed {
            log::info!(
                "rule {code} {} by {}",
                if enabled { "enabled" } else { "disabled" },
                change.changed_by
            );
        }
        Ok(changed)
    }

    /// Returns false when the rule already carried `weight`.
    pub fn set_rule_weight(&self, code: &str, weight: u32, change: &RuleChange) -> ScreenResult<bool> {
        let changed = self.edit_rule(code, change, |rule| {
            if rule.weight == weight {
                return None;
            }
            let row = AuditRow {
                rule_code: rule.code.clone(),
                change_type: RuleChangeType::PointsChanged,
                field_name: Some("weight".into()),
                old_value: Some(rule.weight.to_string()),
                new_value: Some(weight.to_string()),
            };
            rule.weight = weight;
            Some(row)
        })?;
        if changed {
            log::info!("rule {code} weight set to {weight} by {}", change.changed_by);
        }
        Ok(changed)
    }

    /// Change history of one rule, newest first.
    pub fn rule_audit(&self, code: &str) -> ScreenResult<Vec<RuleAuditEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT audit_id, rule_code, change_type, field_name, old_value, new_value,
                    changed_by, change_reason, catalogue_version, changed_at
             FROM fraud_rule_audit WHERE rule_code = ?1
             ORDER BY audit_id DESC",
        )?;
        let rows = stmt
            .query_map(params![code], audit_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Read-modify-write of one stored rule. `edit` returns None when it
    /// made no change.
    fn edit_rule(
        &self,
        code: &str,
        change: &RuleChange,
        edit: impl FnOnce(&mut RuleDefinition) -> Option<AuditRow>,
    ) -> ScreenResult<bool> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let mut rule = stored_rule(&tx, code)?.ok_or_else(|| ScreenError::RuleNotFound { code: code.to_string() })?;
        let Some(row) = edit(&mut rule) else {
            return Ok(false);
        };
        write_rule(&tx, &rule)?;
        record_change(&tx, &[row], change)?;
        tx.commit()?;
        Ok(true)
    }
}
