//! `seon check` command implementation.
//!
//! Validates a topology configuration without emitting a plan:
//! - the file parses as YAML
//! - the document validates against the embedded JSON Schema
//! - the service catalog loads
//! - a dry resolution succeeds for the named environment (or every
//!   environment in order when none is named)

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;

use seon_core::catalog::ConfigCatalog;
use seon_core::config::TopologyConfig;
use seon_resolver::TopologyResolver;
use seon_topology::network::ProviderCapabilities;

/// JSON Schema for the topology file, compiled into the binary so
/// validation works without external files.
const TOPOLOGY_SCHEMA: &str = include_str!("../../../../schemas/topology-config.schema.json");

/// A single check finding.
#[derive(Debug, Clone)]
pub struct CheckFinding {
    pub passed: bool,
    pub category: &'static str,
    pub message: String,
}

/// Results from running all checks.
#[derive(Debug, Default)]
pub struct CheckResults {
    pub findings: Vec<CheckFinding>,
}

impl CheckResults {
    fn pass(&mut self, category: &'static str, message: impl Into<String>) {
        self.findings.push(CheckFinding {
            passed: true,
            category,
            message: message.into(),
        });
    }

    fn fail(&mut self, category: &'static str, message: impl Into<String>) {
        self.findings.push(CheckFinding {
            passed: false,
            category,
            message: message.into(),
        });
    }

    pub fn has_failures(&self) -> bool {
        self.findings.iter().any(|f| !f.passed)
    }

    pub fn failure_count(&self) -> usize {
        self.findings.iter().filter(|f| !f.passed).count()
    }

    fn print_summary(&self) {
        for finding in &self.findings {
            let icon = if finding.passed { "✔" } else { "✖" };
            println!("  {icon} [{}] {}", finding.category, finding.message);
        }
        println!();
        if self.has_failures() {
            println!(
                "Summary: {} of {} check(s) failed.",
                self.failure_count(),
                self.findings.len()
            );
        } else {
            println!("Summary: all {} check(s) passed.", self.findings.len());
        }
    }
}

pub fn run(config_path: &Path, env: Option<&str>, capabilities: ProviderCapabilities) -> Result<()> {
    let results = run_quiet(config_path, env, capabilities)?;
    results.print_summary();
    if results.has_failures() {
        bail!("configuration check failed");
    }
    Ok(())
}

/// Run all checks without printing. Stops early only when a later check
/// has nothing left to work on (e.g. the file did not parse).
pub fn run_quiet(
    config_path: &Path,
    env: Option<&str>,
    capabilities: ProviderCapabilities,
) -> Result<CheckResults> {
    let mut results = CheckResults::default();

    let content = fs::read_to_string(config_path)
        .with_context(|| format!("failed to read {}", config_path.display()))?;

    // 1. YAML parses.
    let document: serde_yaml::Value = match serde_yaml::from_str(&content) {
        Ok(v) => {
            results.pass("yaml", "document parses");
            v
        }
        Err(err) => {
            results.fail("yaml", format!("document does not parse: {err}"));
            return Ok(results);
        }
    };

    // 2. Document validates against the embedded schema.
    validate_schema(&document, &mut results)?;

    // 3. Catalog loads.
    let config = match TopologyConfig::from_yaml(&content) {
        Ok(config) => {
            results.pass("config", "topology model deserializes");
            config
        }
        Err(err) => {
            results.fail("config", format!("topology model rejected: {err}"));
            return Ok(results);
        }
    };
    match ConfigCatalog::load(&config) {
        Ok(catalog) => {
            results.pass("catalog", format!("{} service(s) validated", catalog.len()));
        }
        Err(err) => {
            results.fail("catalog", err.to_string());
            return Ok(results);
        }
    }

    // 4. Dry resolution per environment.
    let env_names: Vec<String> = match env {
        Some(name) => vec![name.to_string()],
        None => config.environments.keys().cloned().collect(),
    };
    for env_name in env_names {
        let mut resolver = TopologyResolver::new(capabilities.clone());
        match resolver.resolve_all(&config, &env_name) {
            Ok(plan) => results.pass(
                "resolve",
                format!("environment '{env_name}' resolves ({} resources)", plan.resources.len()),
            ),
            Err(err) => results.fail("resolve", format!("environment '{env_name}': {err}")),
        }
    }

    Ok(results)
}

fn validate_schema(document: &serde_yaml::Value, results: &mut CheckResults) -> Result<()> {
    let schema: serde_json::Value =
        serde_json::from_str(TOPOLOGY_SCHEMA).context("embedded schema must parse")?;
    let validator =
        jsonschema::validator_for(&schema).context("embedded schema must compile")?;

    let instance =
        serde_json::to_value(document).context("YAML document must convert to JSON")?;

    if validator.is_valid(&instance) {
        results.pass("schema", "document matches topology-config schema");
    } else {
        for err in validator.iter_errors(&instance).take(10) {
            results.fail("schema", err.to_string());
        }
    }
    Ok(())
}
