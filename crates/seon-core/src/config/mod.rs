//! Raw configuration model for the SEON topology resolver.
//!
//! This module is the serde-facing view of the topology file: one document
//! (YAML) describing a project, its environments, and its services. Only
//! syntactic defaults are applied here; semantic validation (duplicate
//! names, port ranges, routing conflicts, ...) happens when the raw model
//! is turned into a [`crate::catalog::ConfigCatalog`] and resolved into
//! plans.
//!
//! # Configuration File
//!
//! ```yaml
//! project: seon
//! environments:
//!   dev:
//!     network:
//!       cidr: 10.0.0.0/16
//!     mesh: true
//! services:
//!   - name: federation
//!     image: seon/federation:latest
//!     port: 4000
//!     health_check: /.well-known/health
//!     discovery:
//!       mode: dns
//!       host: dev.example.com
//!       priority: 10
//! ```

pub mod service;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::ConfigError;

pub use service::{
    DeploymentConfig, DiscoveryConfig, PipelineConfig, RecordType, RouteConfig, ServiceConfig,
    SizingConfig,
};

/// Complete topology configuration loaded from a file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopologyConfig {
    /// Project name; prefixes shared resource identities (cluster, mesh).
    pub project: String,

    /// Configuration version.
    #[serde(default)]
    pub version: Option<String>,

    /// Environments by name. `BTreeMap` keeps iteration order stable.
    pub environments: BTreeMap<String, EnvironmentConfig>,

    /// Service descriptors in declaration order. The order is load-bearing:
    /// plan output follows it, which is what makes plan diffing stable.
    #[serde(default)]
    pub services: Vec<ServiceConfig>,
}

impl TopologyConfig {
    /// Load a topology configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse a topology configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(ConfigError::from)
    }

    /// Look up an environment by name. A miss is an error, not a default.
    pub fn environment(&self, name: &str) -> Result<&EnvironmentConfig, ConfigError> {
        self.environments
            .get(name)
            .ok_or_else(|| ConfigError::not_found("environment", name))
    }
}

/// Per-environment settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    /// Network parameters for the environment.
    pub network: NetworkConfig,

    /// Whether the service mesh is provisioned. When disabled, services
    /// bind to their discovery records directly and no proxy sidecar is
    /// injected.
    #[serde(default = "default_true")]
    pub mesh: bool,

    /// Whether a tracing sidecar is injected alongside each meshed
    /// service. Has no effect when the mesh is disabled.
    #[serde(default)]
    pub tracing: bool,

    /// Private discovery namespace. Defaults to `{env}.{project}.local`.
    #[serde(default)]
    pub namespace: Option<String>,

    /// Image for the injected proxy sidecar.
    #[serde(default = "default_proxy_image")]
    pub proxy_image: String,

    /// Image for the injected tracing sidecar.
    #[serde(default = "default_tracing_image")]
    pub tracing_image: String,
}

impl EnvironmentConfig {
    /// The effective private namespace for this environment.
    pub fn namespace_for(&self, env_name: &str, project: &str) -> String {
        match &self.namespace {
            Some(ns) => ns.clone(),
            None => format!("{env_name}.{project}.local"),
        }
    }
}

/// Network parameters for one environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Address block for the environment, e.g. `10.0.0.0/16`.
    pub cidr: String,

    /// Number of availability zones to span.
    #[serde(default = "default_az_count")]
    pub az_count: usize,

    /// Number of NAT gateways. Each gateway occupies a distinct zone.
    #[serde(default = "default_nat_gateways")]
    pub nat_gateways: usize,
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_az_count() -> usize {
    2
}

fn default_nat_gateways() -> usize {
    1
}

fn default_proxy_image() -> String {
    "envoyproxy/envoy:v1.29-latest".to_string()
}

fn default_tracing_image() -> String {
    "jaegertracing/jaeger-agent:1.55".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_topology_yaml() {
        let yaml = r#"
project: seon
environments:
  dev:
    network:
      cidr: 10.0.0.0/16
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
        let config = TopologyConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.project, "seon");

        let env = config.environment("dev").unwrap();
        assert!(env.mesh, "mesh defaults to enabled");
        assert!(!env.tracing, "tracing defaults to disabled");
        assert_eq!(env.network.az_count, 2);
        assert_eq!(env.network.nat_gateways, 1);
        assert_eq!(env.namespace_for("dev", "seon"), "dev.seon.local");

        assert_eq!(config.services.len(), 1);
        assert_eq!(config.services[0].name, "federation");
    }

    #[test]
    fn namespace_override_wins() {
        let env = EnvironmentConfig {
            network: NetworkConfig {
                cidr: "10.0.0.0/16".to_string(),
                az_count: 2,
                nat_gateways: 1,
            },
            mesh: true,
            tracing: false,
            namespace: Some("internal.seon".to_string()),
            proxy_image: default_proxy_image(),
            tracing_image: default_tracing_image(),
        };
        assert_eq!(env.namespace_for("prod", "seon"), "internal.seon");
    }

    #[test]
    fn unknown_environment_is_not_found() {
        let yaml = r#"
project: seon
environments:
  dev:
    network:
      cidr: 10.0.0.0/16
"#;
        let config = TopologyConfig::from_yaml(yaml).unwrap();
        let err = config.environment("prod").unwrap_err();
        assert_eq!(
            err,
            crate::error::ConfigError::NotFound {
                kind: "environment",
                name: "prod".to_string()
            }
        );
    }

    #[test]
    fn malformed_yaml_is_a_yaml_error() {
        let err = TopologyConfig::from_yaml("project: [unclosed").unwrap_err();
        assert!(matches!(err, crate::error::ConfigError::Yaml(_)));
    }
}
