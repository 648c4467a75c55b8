//! Compute planning.
//!
//! Derives the per-service container set and startup ordering. The main
//! application container is always present. Sidecars are a mesh concern:
//! a meshed service gets a proxy sidecar (main waits for proxy health)
//! and, when the environment enables tracing, a tracing sidecar (main
//! and proxy wait for its start). Without a mesh there are no sidecars
//! at all. The resulting dependency relation is validated as a DAG even
//! though the fixed injection pattern cannot currently produce a cycle;
//! the guard protects future injection rules.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use seon_core::catalog::{ServiceDescriptor, ServiceName};
use seon_core::config::EnvironmentConfig;
use seon_core::error::ConfigError;
use seon_core::plan::{ContainerDependency, ContainerSpec, StartupCondition};

use crate::graph;
use crate::mesh::MeshNode;

/// Container names within a task.
const MAIN_CONTAINER: &str = "app";
const PROXY_CONTAINER: &str = "proxy";
const TRACING_CONTAINER: &str = "tracing";

/// Supported CPU/memory pairings: (cpu units, min MiB, max MiB).
/// Memory must be 512 at the low end of the 256 row, otherwise a
/// multiple of 1024 within the row's range.
const SUPPORTED_SIZINGS: &[(u32, u32, u32)] = &[
    (256, 512, 2048),
    (512, 1024, 4096),
    (1024, 2048, 8192),
    (2048, 4096, 16384),
    (4096, 8192, 30720),
];

fn sizing_supported(cpu: u32, memory: u32) -> bool {
    let Some(&(_, min, max)) = SUPPORTED_SIZINGS.iter().find(|&&(c, _, _)| c == cpu) else {
        return false;
    };
    if memory < min || memory > max {
        return false;
    }
    memory == 512 || memory % 1024 == 0
}

/// Sidecar injection policy derived from the environment.
#[derive(Debug, Clone)]
pub struct SidecarPolicy {
    pub mesh: bool,
    pub tracing: bool,
    pub proxy_image: String,
    pub tracing_image: String,
}

impl SidecarPolicy {
    pub fn for_environment(env: &EnvironmentConfig) -> Self {
        Self {
            mesh: env.mesh,
            tracing: env.tracing,
            proxy_image: env.proxy_image.clone(),
            tracing_image: env.tracing_image.clone(),
        }
    }
}

/// The container set and deployment parameters for one service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerPlan {
    pub service: ServiceName,
    pub cpu: u32,
    pub memory: u32,
    pub desired_count: u32,
    pub min_healthy_percent: u32,
    pub max_healthy_percent: u32,
    /// Containers in order: main, then proxy, then tracing.
    pub containers: Vec<ContainerSpec>,
}

impl ContainerPlan {
    /// Derive the container set for one service.
    ///
    /// `mesh_node` is present only when the environment runs a mesh; it
    /// carries the node identity the proxy announces.
    pub fn resolve(
        descriptor: &ServiceDescriptor,
        mesh_node: Option<&MeshNode>,
        policy: &SidecarPolicy,
    ) -> Result<Self, ConfigError> {
        let sizing = descriptor.sizing;
        if !sizing_supported(sizing.cpu, sizing.memory) {
            return Err(ConfigError::UnsupportedSizing {
                service: descriptor.name.clone(),
                cpu: sizing.cpu,
                memory: sizing.memory,
            });
        }

        let meshed = policy.mesh && mesh_node.is_some();
        // Tracing rides on the mesh; without a proxy there is nothing to
        // trace through.
        let traced = meshed && policy.tracing;

        let mut main_deps = Vec::new();
        if meshed {
            main_deps.push(ContainerDependency {
                container: PROXY_CONTAINER.to_string(),
                condition: StartupCondition::Healthy,
            });
        }
        if traced {
            main_deps.push(ContainerDependency {
                container: TRACING_CONTAINER.to_string(),
                condition: StartupCondition::Start,
            });
        }

        let mut containers = vec![ContainerSpec {
            name: MAIN_CONTAINER.to_string(),
            image: descriptor.image.clone(),
            port: Some(descriptor.port),
            env: descriptor.env.clone(),
            essential: true,
            depends_on: main_deps,
        }];

        if meshed {
            let node = mesh_node.expect("meshed implies a node");
            let mut proxy_deps = Vec::new();
            if traced {
                proxy_deps.push(ContainerDependency {
                    container: TRACING_CONTAINER.to_string(),
                    condition: StartupCondition::Start,
                });
            }
            let mut proxy_env = BTreeMap::new();
            proxy_env.insert("SERVICE_NODE".to_string(), node.service.to_string());
            containers.push(ContainerSpec {
                name: PROXY_CONTAINER.to_string(),
                image: policy.proxy_image.clone(),
                port: None,
                env: proxy_env,
                essential: true,
                depends_on: proxy_deps,
            });
        }

        if traced {
            containers.push(ContainerSpec {
                name: TRACING_CONTAINER.to_string(),
                image: policy.tracing_image.clone(),
                port: None,
                env: BTreeMap::new(),
                essential: false,
                depends_on: Vec::new(),
            });
        }

        // Structurally unreachable with the fixed injection pattern, but
        // the guard stays: future injection rules must not introduce a
        // container that transitively waits on itself.
        let order: Vec<String> = containers.iter().map(|c| c.name.clone()).collect();
        let edges: BTreeMap<String, Vec<String>> = containers
            .iter()
            .map(|c| {
                (
                    c.name.clone(),
                    c.depends_on.iter().map(|d| d.container.clone()).collect(),
                )
            })
            .collect();
        if let Some(chain) = graph::find_cycle(&order, &edges) {
            return Err(ConfigError::ContainerDependencyCycle {
                service: descriptor.name.clone(),
                chain,
            });
        }

        Ok(Self {
            service: descriptor.name.clone(),
            cpu: sizing.cpu,
            memory: sizing.memory,
            desired_count: descriptor.deployment.desired_count,
            min_healthy_percent: descriptor.deployment.min_healthy_percent,
            max_healthy_percent: descriptor.deployment.max_healthy_percent,
            containers,
        })
    }

    /// Look up a container by name within this plan.
    pub fn container(&self, name: &str) -> Option<&ContainerSpec> {
        self.containers.iter().find(|c| c.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seon_core::catalog::ConfigCatalog;
    use seon_core::config::TopologyConfig;
    use seon_core::plan::NodeDiscovery;

    fn descriptor(sizing_yaml: &str) -> ServiceDescriptor {
        let yaml = format!(
            r#"
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
      mode: registry
{sizing_yaml}"#
        );
        let catalog = ConfigCatalog::load(&TopologyConfig::from_yaml(&yaml).unwrap()).unwrap();
        catalog.all().next().unwrap().clone()
    }

    fn policy(mesh: bool, tracing: bool) -> SidecarPolicy {
        SidecarPolicy {
            mesh,
            tracing,
            proxy_image: "envoy:test".to_string(),
            tracing_image: "jaeger:test".to_string(),
        }
    }

    fn node() -> MeshNode {
        MeshNode {
            service: ServiceName::new("federation"),
            discovery: NodeDiscovery::Registry {
                namespace: "dev.seon.local".to_string(),
                service: "federation".to_string(),
            },
            backends: Vec::new(),
        }
    }

    #[test]
    fn bare_plan_has_single_main_container() {
        let plan = ContainerPlan::resolve(&descriptor(""), None, &policy(false, false)).unwrap();
        assert_eq!(plan.containers.len(), 1);
        let main = plan.container(MAIN_CONTAINER).unwrap();
        assert_eq!(main.image, "seon/federation:latest");
        assert_eq!(main.port, Some(4000));
        assert!(main.essential);
        assert!(main.depends_on.is_empty());
    }

    #[test]
    fn meshed_main_waits_for_proxy_health() {
        let node = node();
        let plan =
            ContainerPlan::resolve(&descriptor(""), Some(&node), &policy(true, false)).unwrap();
        assert_eq!(plan.containers.len(), 2);
        let main = plan.container(MAIN_CONTAINER).unwrap();
        assert_eq!(
            main.depends_on,
            vec![ContainerDependency {
                container: PROXY_CONTAINER.to_string(),
                condition: StartupCondition::Healthy,
            }]
        );
        let proxy = plan.container(PROXY_CONTAINER).unwrap();
        assert_eq!(proxy.image, "envoy:test");
        assert_eq!(proxy.env.get("SERVICE_NODE").unwrap(), "federation");
    }

    #[test]
    fn tracing_adds_start_dependencies_on_both_sides() {
        let node = node();
        let plan =
            ContainerPlan::resolve(&descriptor(""), Some(&node), &policy(true, true)).unwrap();
        assert_eq!(plan.containers.len(), 3);

        let main = plan.container(MAIN_CONTAINER).unwrap();
        assert!(main.depends_on.contains(&ContainerDependency {
            container: TRACING_CONTAINER.to_string(),
            condition: StartupCondition::Start,
        }));

        let proxy = plan.container(PROXY_CONTAINER).unwrap();
        assert_eq!(
            proxy.depends_on,
            vec![ContainerDependency {
                container: TRACING_CONTAINER.to_string(),
                condition: StartupCondition::Start,
            }]
        );

        let tracing = plan.container(TRACING_CONTAINER).unwrap();
        assert!(!tracing.essential);
        assert!(tracing.depends_on.is_empty());
    }

    #[test]
    fn tracing_without_a_mesh_injects_no_sidecar() {
        let plan = ContainerPlan::resolve(&descriptor(""), None, &policy(false, true)).unwrap();
        let names: Vec<_> = plan.containers.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec![MAIN_CONTAINER]);
        assert!(plan.containers[0].depends_on.is_empty());
    }

    #[test]
    fn unsupported_sizing_is_rejected() {
        let err = ContainerPlan::resolve(
            &descriptor("    sizing:\n      cpu: 256\n      memory: 4096\n"),
            None,
            &policy(false, false),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::UnsupportedSizing {
                service: ServiceName::new("federation"),
                cpu: 256,
                memory: 4096,
            }
        );
    }

    #[test]
    fn sizing_table_accepts_known_pairings() {
        assert!(sizing_supported(256, 512));
        assert!(sizing_supported(256, 2048));
        assert!(sizing_supported(512, 1024));
        assert!(sizing_supported(1024, 8192));
        assert!(sizing_supported(4096, 30720));

        assert!(!sizing_supported(256, 4096));
        assert!(!sizing_supported(512, 512));
        assert!(!sizing_supported(512, 1536));
        assert!(!sizing_supported(300, 1024));
    }

    #[test]
    fn deployment_parameters_carry_through() {
        let plan = ContainerPlan::resolve(
            &descriptor(
                "    deployment:\n      desired_count: 3\n      min_healthy_percent: 50\n",
            ),
            None,
            &policy(false, false),
        )
        .unwrap();
        assert_eq!(plan.desired_count, 3);
        assert_eq!(plan.min_healthy_percent, 50);
        assert_eq!(plan.max_healthy_percent, 200);
    }
}
