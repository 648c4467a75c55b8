//! Service mesh planning.
//!
//! When an environment enables the mesh, every service gets one virtual
//! node (mirroring its discovery record) and one router with weighted
//! routes. Backend declarations are validated for existence and for
//! acyclicity before any plan is emitted; a node may never be its own
//! transitive backend.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use seon_core::catalog::{ConfigCatalog, ServiceName};
use seon_core::error::ConfigError;
use seon_core::plan::{NodeDiscovery, WeightedRoute};

use crate::discovery::{DiscoveryPlan, DiscoveryRecord};
use crate::graph;

/// Per-service virtual identity in the mesh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshNode {
    pub service: ServiceName,
    pub discovery: NodeDiscovery,
    /// Services this node may call. Validated acyclic.
    pub backends: Vec<ServiceName>,
}

/// Per-service router fanning out to weighted routes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshRouter {
    pub service: ServiceName,
    pub routes: Vec<WeightedRoute>,
}

/// The mesh node/router graph for one environment.
#[derive(Debug, Clone)]
pub struct MeshPlan {
    pub mesh_name: String,
    nodes: Vec<MeshNode>,
    routers: Vec<MeshRouter>,
    index: BTreeMap<ServiceName, usize>,
}

impl MeshPlan {
    /// Build the mesh graph from the catalog and discovery bindings.
    ///
    /// Rejects backends and route targets that name unknown services,
    /// routers whose routes all carry weight zero, and any cycle in the
    /// backend graph.
    pub fn resolve(
        catalog: &ConfigCatalog,
        discovery: &DiscoveryPlan,
        mesh_name: &str,
    ) -> Result<Self, ConfigError> {
        let mut nodes = Vec::with_capacity(catalog.len());
        let mut routers = Vec::with_capacity(catalog.len());
        let mut index = BTreeMap::new();

        for descriptor in catalog.all() {
            for backend in &descriptor.backends {
                catalog.get(backend)?;
            }

            let node_discovery = match discovery.record(&descriptor.name)? {
                DiscoveryRecord::ListenerRule { host, .. } => NodeDiscovery::Dns {
                    hostname: host.clone(),
                },
                DiscoveryRecord::RegistryEntry { namespace, name, .. } => {
                    NodeDiscovery::Registry {
                        namespace: namespace.clone(),
                        service: name.clone(),
                    }
                }
            };

            let routes = if descriptor.routes.is_empty() {
                vec![WeightedRoute {
                    target: descriptor.name.clone(),
                    weight: 100,
                }]
            } else {
                let mut routes = Vec::with_capacity(descriptor.routes.len());
                for route in &descriptor.routes {
                    let target = ServiceName::new(route.service.clone());
                    catalog.get(&target)?;
                    routes.push(WeightedRoute {
                        target,
                        weight: route.weight,
                    });
                }
                routes
            };
            if routes.iter().all(|r| r.weight == 0) {
                return Err(ConfigError::DeadRoute(descriptor.name.clone()));
            }

            index.insert(descriptor.name.clone(), nodes.len());
            nodes.push(MeshNode {
                service: descriptor.name.clone(),
                discovery: node_discovery,
                backends: descriptor.backends.clone(),
            });
            routers.push(MeshRouter {
                service: descriptor.name.clone(),
                routes,
            });
        }

        let order: Vec<ServiceName> = nodes.iter().map(|n| n.service.clone()).collect();
        let edges: BTreeMap<ServiceName, Vec<ServiceName>> = nodes
            .iter()
            .map(|n| (n.service.clone(), n.backends.clone()))
            .collect();
        if let Some(chain) = graph::find_cycle(&order, &edges) {
            return Err(ConfigError::CyclicMeshBackend { chain });
        }

        Ok(Self {
            mesh_name: mesh_name.to_string(),
            nodes,
            routers,
            index,
        })
    }

    /// Look up a service's mesh node.
    pub fn node(&self, service: &ServiceName) -> Result<&MeshNode, ConfigError> {
        self.index
            .get(service)
            .map(|&i| &self.nodes[i])
            .ok_or_else(|| ConfigError::not_found("mesh node", service.as_str()))
    }

    /// Nodes in declaration order.
    pub fn nodes(&self) -> impl Iterator<Item = &MeshNode> {
        self.nodes.iter()
    }

    /// Routers in declaration order.
    pub fn routers(&self) -> impl Iterator<Item = &MeshRouter> {
        self.routers.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seon_core::config::TopologyConfig;

    fn plan_for(services_yaml: &str) -> Result<MeshPlan, ConfigError> {
        let yaml = format!(
            r#"
project: seon
environments:
  dev:
    network:
      cidr: 10.0.0.0/16
services:
{services_yaml}"#
        );
        let catalog = ConfigCatalog::load(&TopologyConfig::from_yaml(&yaml).unwrap()).unwrap();
        let discovery = DiscoveryPlan::resolve(&catalog, "dev.seon.local").unwrap();
        MeshPlan::resolve(&catalog, &discovery, "seon-dev")
    }

    const PAIR: &str = r#"
  - name: gateway
    image: a:1
    port: 80
    health_check: /h
    discovery:
      mode: dns
      host: api.example.com
      priority: 10
    backends:
      - ledger
  - name: ledger
    image: b:1
    port: 81
    health_check: /h
    discovery:
      mode: registry
"#;

    #[test]
    fn nodes_mirror_discovery_records() {
        let plan = plan_for(PAIR).unwrap();
        assert_eq!(plan.mesh_name, "seon-dev");

        let gateway = plan.node(&ServiceName::new("gateway")).unwrap();
        assert_eq!(
            gateway.discovery,
            NodeDiscovery::Dns {
                hostname: "api.example.com".to_string()
            }
        );
        assert_eq!(gateway.backends, vec![ServiceName::new("ledger")]);

        let ledger = plan.node(&ServiceName::new("ledger")).unwrap();
        assert_eq!(
            ledger.discovery,
            NodeDiscovery::Registry {
                namespace: "dev.seon.local".to_string(),
                service: "ledger".to_string()
            }
        );
    }

    #[test]
    fn default_router_is_a_self_route_at_full_weight() {
        let plan = plan_for(PAIR).unwrap();
        let routers: Vec<_> = plan.routers().collect();
        assert_eq!(routers.len(), 2);
        assert_eq!(
            routers[0].routes,
            vec![WeightedRoute {
                target: ServiceName::new("gateway"),
                weight: 100
            }]
        );
    }

    #[test]
    fn unknown_backend_is_not_found() {
        let err = plan_for(
            r#"
  - name: gateway
    image: a:1
    port: 80
    health_check: /h
    discovery:
      mode: registry
    backends:
      - ghost
"#,
        )
        .unwrap_err();
        assert_eq!(err, ConfigError::not_found("service", "ghost"));
    }

    #[test]
    fn all_zero_weights_are_a_dead_route() {
        let err = plan_for(
            r#"
  - name: gateway
    image: a:1
    port: 80
    health_check: /h
    discovery:
      mode: registry
    routes:
      - service: gateway
        weight: 0
"#,
        )
        .unwrap_err();
        assert_eq!(err, ConfigError::DeadRoute(ServiceName::new("gateway")));
    }

    #[test]
    fn mutual_backends_report_the_cycle_chain() {
        let err = plan_for(
            r#"
  - name: alpha
    image: a:1
    port: 80
    health_check: /h
    discovery:
      mode: registry
    backends:
      - beta
  - name: beta
    image: b:1
    port: 81
    health_check: /h
    discovery:
      mode: registry
    backends:
      - alpha
"#,
        )
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::CyclicMeshBackend {
                chain: vec![
                    ServiceName::new("alpha"),
                    ServiceName::new("beta"),
                    ServiceName::new("alpha"),
                ]
            }
        );
    }

    #[test]
    fn weighted_fanout_across_services_is_allowed() {
        let plan = plan_for(
            r#"
  - name: gateway
    image: a:1
    port: 80
    health_check: /h
    discovery:
      mode: registry
    routes:
      - service: gateway
        weight: 90
      - service: canary
        weight: 10
  - name: canary
    image: a:2
    port: 81
    health_check: /h
    discovery:
      mode: registry
"#,
        )
        .unwrap();
        let router = plan.routers().next().unwrap();
        assert_eq!(router.routes.len(), 2);
        assert_eq!(router.routes[1].weight, 10);
    }
}
