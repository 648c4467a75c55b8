//! Discovery planning.
//!
//! Binds every service in the catalog to exactly one discovery mechanism:
//! a load-balancer listener rule (DNS mode) or a record in the
//! environment's private registry namespace (registry mode). Exact
//! listener-tuple ties and registry-name collisions are configuration
//! errors; ambiguous precedence is never resolved heuristically.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use seon_core::catalog::{ConfigCatalog, ServiceName};
use seon_core::config::{DiscoveryConfig, RecordType};
use seon_core::error::ConfigError;

/// Per-service binding to one discovery mechanism.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mechanism", rename_all = "snake_case")]
pub enum DiscoveryRecord {
    /// DNS discovery: a listener rule on the shared load balancer.
    ListenerRule {
        host: String,
        path: String,
        priority: u32,
        port: u16,
        health_check: String,
    },
    /// Registry discovery: a record in the private namespace.
    RegistryEntry {
        namespace: String,
        name: String,
        record_type: RecordType,
        port: u16,
    },
}

/// The environment's private registry namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceSpec {
    pub name: String,
}

/// The shared load balancer fronting DNS-discovered services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancerSpec {
    pub internet_facing: bool,
}

/// Discovery bindings for every service in the catalog.
#[derive(Debug, Clone)]
pub struct DiscoveryPlan {
    /// Present iff at least one service uses registry discovery.
    pub namespace: Option<NamespaceSpec>,

    /// Present iff at least one service uses DNS discovery.
    pub load_balancer: Option<LoadBalancerSpec>,

    records: BTreeMap<ServiceName, DiscoveryRecord>,
}

impl DiscoveryPlan {
    /// Bind each catalog service to its discovery mechanism.
    ///
    /// Walks descriptors in declaration order; the first collision is
    /// reported with both participating services.
    pub fn resolve(catalog: &ConfigCatalog, namespace: &str) -> Result<Self, ConfigError> {
        let mut records = BTreeMap::new();
        let mut listener_claims: BTreeMap<(String, String, u32), ServiceName> = BTreeMap::new();
        let mut registry_claims: BTreeMap<String, ServiceName> = BTreeMap::new();

        for descriptor in catalog.all() {
            match &descriptor.discovery {
                DiscoveryConfig::Dns { host, path, priority } => {
                    let key = (host.clone(), path.clone(), *priority);
                    if let Some(first) = listener_claims.get(&key) {
                        return Err(ConfigError::RoutingConflict {
                            first: first.clone(),
                            second: descriptor.name.clone(),
                            host: host.clone(),
                            path: path.clone(),
                            priority: *priority,
                        });
                    }
                    listener_claims.insert(key, descriptor.name.clone());

                    records.insert(
                        descriptor.name.clone(),
                        DiscoveryRecord::ListenerRule {
                            host: host.clone(),
                            path: path.clone(),
                            priority: *priority,
                            port: descriptor.port,
                            health_check: descriptor.health_check.clone(),
                        },
                    );
                }
                DiscoveryConfig::Registry { name, record_type } => {
                    let record_name = name
                        .clone()
                        .unwrap_or_else(|| descriptor.name.as_str().to_string());
                    if let Some(first) = registry_claims.get(&record_name) {
                        return Err(ConfigError::DuplicateRegistryName {
                            name: record_name,
                            first: first.clone(),
                            second: descriptor.name.clone(),
                        });
                    }
                    registry_claims.insert(record_name.clone(), descriptor.name.clone());

                    records.insert(
                        descriptor.name.clone(),
                        DiscoveryRecord::RegistryEntry {
                            namespace: namespace.to_string(),
                            name: record_name,
                            record_type: *record_type,
                            port: descriptor.port,
                        },
                    );
                }
            }
        }

        Ok(Self {
            namespace: (!registry_claims.is_empty()).then(|| NamespaceSpec {
                name: namespace.to_string(),
            }),
            load_balancer: (!listener_claims.is_empty()).then(|| LoadBalancerSpec {
                internet_facing: true,
            }),
            records,
        })
    }

    /// Look up a service's discovery record. A miss is an error; there is
    /// no default record.
    pub fn record(&self, service: &ServiceName) -> Result<&DiscoveryRecord, ConfigError> {
        self.records
            .get(service)
            .ok_or_else(|| ConfigError::not_found("discovery record", service.as_str()))
    }
}
