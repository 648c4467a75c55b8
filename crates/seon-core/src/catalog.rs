//! Validated service catalog.
//!
//! [`ConfigCatalog::load`] turns the raw serde model into an immutable set
//! of [`ServiceDescriptor`]s, enforcing the structural rules that the
//! serde layer cannot: unique names, required fields present, ports in
//! range. Descriptors keep their declaration order; everything downstream
//! iterates the catalog in that order so plan output stays deterministic.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::config::{
    DeploymentConfig, DiscoveryConfig, PipelineConfig, RouteConfig, SizingConfig, TopologyConfig,
};
use crate::error::ConfigError;

/// Stable identifier for a service. Everything keyed per service is keyed
/// by this, never by position.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceName(String);

impl ServiceName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ServiceName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

/// Fully validated, immutable view of one service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub name: ServiceName,
    pub image: String,
    pub port: u16,
    pub health_check: String,
    pub env: BTreeMap<String, String>,
    pub discovery: DiscoveryConfig,
    pub sizing: SizingConfig,
    pub deployment: DeploymentConfig,
    pub backends: Vec<ServiceName>,
    pub routes: Vec<RouteConfig>,
    pub pipeline: Option<PipelineConfig>,
}

/// The validated set of service descriptors for one resolution run.
#[derive(Debug, Clone)]
pub struct ConfigCatalog {
    services: Vec<ServiceDescriptor>,
    index: BTreeMap<ServiceName, usize>,
}

impl ConfigCatalog {
    /// Validate the raw configuration into a catalog.
    ///
    /// Rejects duplicate service names, missing required fields (image,
    /// port, health-check path), and ports outside 1-65535. The first
    /// violation in declaration order is reported.
    pub fn load(config: &TopologyConfig) -> Result<Self, ConfigError> {
        let mut services = Vec::with_capacity(config.services.len());
        let mut index = BTreeMap::new();

        for raw in &config.services {
            let name = ServiceName::new(raw.name.clone());

            if index.contains_key(&name) {
                return Err(ConfigError::DuplicateServiceName(name));
            }

            let image = raw.image.clone().ok_or(ConfigError::MissingRequiredField {
                service: name.clone(),
                field: "image",
            })?;
            let port = raw.port.ok_or(ConfigError::MissingRequiredField {
                service: name.clone(),
                field: "port",
            })?;
            let health_check =
                raw.health_check
                    .clone()
                    .ok_or(ConfigError::MissingRequiredField {
                        service: name.clone(),
                        field: "health_check",
                    })?;

            if port == 0 || port > u32::from(u16::MAX) {
                return Err(ConfigError::InvalidPortRange {
                    service: name,
                    port,
                });
            }

            index.insert(name.clone(), services.len());
            services.push(ServiceDescriptor {
                name,
                image,
                port: port as u16,
                health_check,
                env: raw.env.clone(),
                discovery: raw.discovery.clone(),
                sizing: raw.sizing,
                deployment: raw.deployment,
                backends: raw.backends.iter().cloned().map(ServiceName::new).collect(),
                routes: raw.routes.clone(),
                pipeline: raw.pipeline.clone(),
            });
        }

        Ok(Self { services, index })
    }

    /// Look up a descriptor by name. A miss is a [`ConfigError::NotFound`].
    pub fn get(&self, name: &ServiceName) -> Result<&ServiceDescriptor, ConfigError> {
        self.index
            .get(name)
            .map(|&i| &self.services[i])
            .ok_or_else(|| ConfigError::not_found("service", name.as_str()))
    }

    /// All descriptors in declaration order.
    pub fn all(&self) -> impl Iterator<Item = &ServiceDescriptor> {
        self.services.iter()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_from_yaml(yaml: &str) -> TopologyConfig {
        TopologyConfig::from_yaml(yaml).unwrap()
    }

    const BASE: &str = r#"
project: seon
environments:
  dev:
    network:
      cidr: 10.0.0.0/16
"#;

    #[test]
    fn load_preserves_declaration_order() {
        let yaml = format!(
            "{BASE}services:
  - name: gateway
    image: seon/gateway:latest
    port: 8080
    health_check: /health
    discovery:
      mode: dns
      host: api.example.com
      priority: 1
  - name: alarms
    image: seon/alarms:latest
    port: 9000
    health_check: /health
    discovery:
      mode: registry
"
        );
        let catalog = ConfigCatalog::load(&config_from_yaml(&yaml)).unwrap();
        let names: Vec<_> = catalog.all().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["gateway", "alarms"]);
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get(&ServiceName::new("alarms")).unwrap().port, 9000);
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let yaml = format!(
            "{BASE}services:
  - name: gateway
    image: a:1
    port: 80
    health_check: /h
    discovery:
      mode: registry
  - name: gateway
    image: b:1
    port: 81
    health_check: /h
    discovery:
      mode: registry
"
        );
        let err = ConfigCatalog::load(&config_from_yaml(&yaml)).unwrap_err();
        assert_eq!(
            err,
            ConfigError::DuplicateServiceName(ServiceName::new("gateway"))
        );
    }

    #[test]
    fn missing_image_is_rejected() {
        let yaml = format!(
            "{BASE}services:
  - name: gateway
    port: 80
    health_check: /h
    discovery:
      mode: registry
"
        );
        let err = ConfigCatalog::load(&config_from_yaml(&yaml)).unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingRequiredField {
                service: ServiceName::new("gateway"),
                field: "image",
            }
        );
    }

    #[test]
    fn out_of_range_port_is_rejected() {
        let yaml = format!(
            "{BASE}services:
  - name: gateway
    image: a:1
    port: 70000
    health_check: /h
    discovery:
      mode: registry
"
        );
        let err = ConfigCatalog::load(&config_from_yaml(&yaml)).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidPortRange {
                service: ServiceName::new("gateway"),
                port: 70000,
            }
        );
    }

    #[test]
    fn lookup_miss_is_not_found() {
        let catalog = ConfigCatalog::load(&config_from_yaml(BASE)).unwrap();
        assert!(catalog.is_empty());
        let err = catalog.get(&ServiceName::new("ghost")).unwrap_err();
        assert_eq!(err, ConfigError::not_found("service", "ghost"));
    }
}
