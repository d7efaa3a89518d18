//! screen-runner: command-line driver for the fraud screening core.
//!
//! Usage:
//!   screen-runner --demo 25 --seed 7 --all
//!   screen-runner --db screening.db --import-registry registry.json --registry-stats
//!   screen-runner --db screening.db --applicant 3 --mode internal
//!   screen-runner --db screening.db --disable-rule CASH_SALARY_DECLARATION --list-rules
//!   screen-runner --db screening.db --load-rules custom_rules.json --list-rules
//!   screen-runner --db screening.db --set-weight DUPLICATE_PHONE=30 --changed-by asha --reason "pilot review"
//!   screen-runner --db screening.db --rule-history DUPLICATE_PHONE
//!
//! Results go to stdout as pretty JSON; logs go to stderr (RUST_LOG=info).

use anyhow::{anyhow, bail, Result};
use fraudscreen_core::{
    config::ScreeningConfig,
    demo_population,
    registry::RegistryImport,
    rule_catalogue::{self, RuleCatalogue, RuleChange},
    screening_service::FraudScreeningService,
    store::ScreenStore,
};
use serde::Serialize;
use std::env;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Internal,
    External,
    Combined,
}

impl std::str::FromStr for Mode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "internal" => Ok(Self::Internal),
            "external" => Ok(Self::External),
            "combined" => Ok(Self::Combined),
            other => Err(anyhow!("Unknown mode '{other}' (expected internal, external or combined)")),
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let db = arg_value(&args, "--db").unwrap_or(":memory:");
    let data_dir = arg_value(&args, "--data-dir").unwrap_or("./data");
    let seed = parse_arg(&args, "--seed", 42u64);
    let demo = parse_arg(&args, "--demo", 0usize);
    let mode: Mode = arg_value(&args, "--mode").unwrap_or("combined").parse()?;

    let cfg = ScreeningConfig::load(data_dir)?;
    let store = Arc::new(ScreenStore::open(db)?);
    store.migrate()?;
    store.seed_default_rules()?;
    log::info!("store ready: db={db} rules={}", store.rule_count()?);

    if demo > 0 {
        let population = demo_population::generate(seed, demo);
        population.load_into(&store)?;
    }
    if let Some(path) = arg_value(&args, "--import-registry") {
        let data = RegistryImport::from_json_file(path)?;
        print_json(&store.import_registry(&data)?)?;
    }

    // Rule administration runs before any screening so it applies to this run.
    let mut change = RuleChange::by(arg_value(&args, "--changed-by").unwrap_or("screen-runner"));
    if let Some(reason) = arg_value(&args, "--reason") {
        change = change.because(reason);
    }
    if let Some(path) = arg_value(&args, "--load-rules") {
        let rules = rule_catalogue::load_rule_file(path)?;
        let mut saved = 0;
        for rule in &rules {
            if store.upsert_rule(rule, &change)? {
                saved += 1;
            }
        }
        log::info!("loaded {} rule(s) from {path}, {saved} changed", rules.len());
    }
    if let Some(code) = arg_value(&args, "--enable-rule") {
        store.set_rule_enabled(code, true, &change)?;
    }
    if let Some(code) = arg_value(&args, "--disable-rule") {
        store.set_rule_enabled(code, false, &change)?;
    }
    if let Some(arg) = arg_value(&args, "--set-weight") {
        let (code, weight) = parse_weight(arg)?;
        store.set_rule_weight(code, weight, &change)?;
    }
    if let Some(code) = arg_value(&args, "--rule-history") {
        print_json(&store.rule_audit(code)?)?;
    }

    if has_flag(&args, "--list-rules") {
        print_json(&store.rule_snapshot()?)?;
    }
    if has_flag(&args, "--registry-stats") {
        print_json(&store.registry_stats()?)?;
    }

    let service = FraudScreeningService::from_store(&cfg, Arc::clone(&store));

    if let Some(raw) = arg_value(&args, "--applicant") {
        let applicant_id: i64 = raw
            .parse()
            .map_err(|e| anyhow!("Invalid applicant id '{raw}': {e}"))?;
        match mode {
            Mode::Internal => print_json(&service.screen_internal(applicant_id)?)?,
            Mode::External => print_json(&service.screen_external_for_applicant(applicant_id)?)?,
            Mode::Combined => print_json(&service.screen_combined(applicant_id))?,
        }
    }

    if has_flag(&args, "--all") {
        log::info!("screening {} applicant(s)", store.applicant_count()?);
        let verdicts = service.screen_all()?;
        print_json(&verdicts)?;
        print_summary(&verdicts);
    }

    Ok(())
}

fn print_summary(verdicts: &[fraudscreen_core::combiner::CombinedVerdict]) {
    let mut by_level = std::collections::BTreeMap::new();
    for v in verdicts {
        *by_level.entry(v.final_risk_level).or_insert(0usize) += 1;
    }
    eprintln!("=== SCREENING SUMMARY ===");
    eprintln!("  applicants screened: {}", verdicts.len());
    for (level, n) in by_level {
        eprintln!("  {:<9} {n}", level.as_str());
    }
    let errors = verdicts.iter().filter(|v| v.has_errors).count();
    if errors > 0 {
        eprintln!("  with errors: {errors}");
    }
    eprintln!("  finished:  {}", chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC"));
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// `CODE=N`
fn parse_weight(arg: &str) -> Result<(&str, u32)> {
    let Some((code, weight)) = arg.split_once('=') else {
        bail!("--set-weight expects CODE=N, got '{arg}'");
    };
    let weight = weight
        .trim()
        .parse()
        .map_err(|e| anyhow!("Invalid weight in '{arg}': {e}"))?;
    Ok((code.trim(), weight))
}

fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].as_str())
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
