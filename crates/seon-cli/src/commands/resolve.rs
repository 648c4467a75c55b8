//! `seon resolve` command implementation.
//!
//! Loads the topology configuration, runs the full resolution pipeline
//! for one environment, and prints the provisioning plan to stdout.

use anyhow::{bail, Context, Result};
use std::path::Path;

use seon_core::config::TopologyConfig;
use seon_core::plan::ProvisioningPlan;
use seon_resolver::TopologyResolver;
use seon_topology::network::ProviderCapabilities;

use crate::OutputFormat;

pub fn run(
    config_path: &Path,
    env: &str,
    format: OutputFormat,
    capabilities: ProviderCapabilities,
) -> Result<()> {
    let config = TopologyConfig::from_file(config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;

    let mut resolver = TopologyResolver::new(capabilities);
    let plan = match resolver.resolve_all(&config, env) {
        Ok(plan) => plan,
        Err(err) => {
            eprintln!("✖ {err}");
            bail!("resolution failed for environment '{env}'");
        }
    };

    print!("{}", render_plan(&plan, format)?);
    Ok(())
}

fn render_plan(plan: &ProvisioningPlan, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Yaml => serde_yaml::to_string(plan)?,
        OutputFormat::Json => {
            let mut out = serde_json::to_string_pretty(plan)?;
            out.push('\n');
            out
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CONFIG: &str = r#"
project: seon
environments:
  dev:
    network:
      cidr: 10.0.0.0/16
    mesh: false
services:
  - name: federation
    image: seon/federation:latest
    port: 4000
    health_check: /health
    discovery:
      mode: dns
      host: dev.example.com
      priority: 10
"#;

    #[test]
    fn resolve_prints_a_plan_from_a_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CONFIG.as_bytes()).unwrap();

        run(
            file.path(),
            "dev",
            OutputFormat::Yaml,
            ProviderCapabilities::default(),
        )
        .unwrap();
    }

    #[test]
    fn rendered_yaml_contains_stable_identifiers() {
        let config = TopologyConfig::from_yaml(CONFIG).unwrap();
        let plan = TopologyResolver::new(ProviderCapabilities::default())
            .resolve_all(&config, "dev")
            .unwrap();
        let yaml = render_plan(&plan, OutputFormat::Yaml).unwrap();
        assert!(yaml.contains("network/vpc"));
        assert!(yaml.contains("discovery/listener-rule/federation"));
        assert!(yaml.contains("delivery/pipeline/federation"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = run(
            Path::new("/nonexistent/topology.yaml"),
            "dev",
            OutputFormat::Yaml,
            ProviderCapabilities::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("failed to load"));
    }
}
