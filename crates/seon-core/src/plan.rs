//! Provisioning plan schema.
//!
//! A [`ProvisioningPlan`] is the sole artifact a resolution run hands to
//! the external provisioning backend: an ordered sequence of typed
//! resource declarations, each carrying a stable identifier and the
//! identifiers it depends on. Dependencies are always expressed by id,
//! never by position, so independent branches can be applied in parallel.
//!
//! The plan is created fresh per run and never mutated after handoff.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::catalog::ServiceName;
use crate::config::RecordType;

/// Stable identifier for one resource declaration.
///
/// Identifiers are slash paths, e.g. `network/vpc`,
/// `discovery/listener-rule/federation`, `compute/service/federation`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One typed resource declaration with explicit dependency edges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDecl {
    pub id: ResourceId,

    /// Identifiers of resources that must exist before this one.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<ResourceId>,

    pub spec: ResourceSpec,
}

/// The typed payload of a resource declaration, tagged by `kind`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ResourceSpec {
    Network {
        cidr: String,
        availability_zones: Vec<String>,
        nat_gateways: usize,
    },
    Subnet {
        tier: SubnetTier,
        availability_zone: String,
        cidr: String,
    },
    Cluster {
        name: String,
    },
    LoadBalancer {
        internet_facing: bool,
    },
    ListenerRule {
        service: ServiceName,
        host: String,
        path: String,
        priority: u32,
        port: u16,
        health_check: String,
    },
    RegistryNamespace {
        name: String,
    },
    RegistryRecord {
        service: ServiceName,
        name: String,
        record_type: RecordType,
        port: u16,
    },
    Mesh {
        name: String,
    },
    MeshNode {
        service: ServiceName,
        discovery: NodeDiscovery,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        backends: Vec<ServiceName>,
    },
    MeshRouter {
        service: ServiceName,
        routes: Vec<WeightedRoute>,
    },
    TaskDefinition {
        service: ServiceName,
        cpu: u32,
        memory: u32,
        containers: Vec<ContainerSpec>,
    },
    WorkloadService {
        service: ServiceName,
        desired_count: u32,
        min_healthy_percent: u32,
        max_healthy_percent: u32,
    },
    Pipeline {
        service: ServiceName,
        stages: Vec<StageSpec>,
    },
}

/// Subnet tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubnetTier {
    Public,
    Private,
}

/// How a mesh node is discovered, mirroring the service's discovery record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum NodeDiscovery {
    Dns { hostname: String },
    Registry { namespace: String, service: String },
}

/// One weighted route on a mesh router.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightedRoute {
    pub target: ServiceName,
    pub weight: u32,
}

/// One container inside a task definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    pub essential: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<ContainerDependency>,
}

/// Startup dependency of one container on another in the same task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerDependency {
    pub container: String,
    pub condition: StartupCondition,
}

/// Startup condition for a container dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StartupCondition {
    /// The dependency only needs to have started.
    Start,
    /// The dependency must report healthy first.
    Healthy,
}

/// Delivery pipeline stage name. Fixed across all services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageName {
    Source,
    Build,
    Approve,
    Deploy,
}

impl StageName {
    /// The invariant stage ordering.
    pub const ORDER: [StageName; 4] = [
        StageName::Source,
        StageName::Build,
        StageName::Approve,
        StageName::Deploy,
    ];
}

/// One delivery pipeline stage with its action parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageSpec {
    pub name: StageName,
    pub action: StageAction,
}

/// Stage action parameters, tagged by `type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StageAction {
    Source { repository: String, branch: String },
    Build { image: String },
    Approve {},
    Deploy { service: ServiceName, cluster: String },
}

/// The final ordered plan handed to the provisioning backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisioningPlan {
    pub project: String,
    pub environment: String,
    pub resources: Vec<ResourceDecl>,
}

impl ProvisioningPlan {
    /// Topologically sort the resources by their dependency edges.
    ///
    /// Kahn's algorithm with a stable tie-break on emission index: among
    /// resources whose dependencies are all satisfied, the one emitted
    /// first comes first. On a plan emitted in dependency order this
    /// reproduces the emission order exactly.
    pub fn topo_sort(&self) -> Vec<ResourceId> {
        let index: BTreeMap<&ResourceId, usize> = self
            .resources
            .iter()
            .enumerate()
            .map(|(i, r)| (&r.id, i))
            .collect();

        let mut indegree = vec![0usize; self.resources.len()];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); self.resources.len()];
        for (i, resource) in self.resources.iter().enumerate() {
            for dep in &resource.depends_on {
                // Edges to ids outside the plan are the backend's concern.
                if let Some(&d) = index.get(dep) {
                    indegree[i] += 1;
                    dependents[d].push(i);
                }
            }
        }

        let mut ready: BTreeSet<usize> = indegree
            .iter()
            .enumerate()
            .filter(|&(_, &deg)| deg == 0)
            .map(|(i, _)| i)
            .collect();

        let mut order = Vec::with_capacity(self.resources.len());
        while let Some(&next) = ready.iter().next() {
            ready.remove(&next);
            order.push(self.resources[next].id.clone());
            for &dependent in &dependents[next] {
                indegree[dependent] -= 1;
                if indegree[dependent] == 0 {
                    ready.insert(dependent);
                }
            }
        }

        order
    }

    /// True when every resource appears after everything it depends on.
    pub fn dependency_ordered(&self) -> bool {
        let mut seen: BTreeSet<&ResourceId> = BTreeSet::new();
        for resource in &self.resources {
            if !resource.depends_on.iter().all(|dep| seen.contains(dep)) {
                return false;
            }
            seen.insert(&resource.id);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decl(id: &str, deps: &[&str]) -> ResourceDecl {
        ResourceDecl {
            id: ResourceId::new(id),
            depends_on: deps.iter().map(|d| ResourceId::new(*d)).collect(),
            spec: ResourceSpec::Cluster {
                name: id.to_string(),
            },
        }
    }

    #[test]
    fn topo_sort_reproduces_emission_order() {
        let plan = ProvisioningPlan {
            project: "seon".to_string(),
            environment: "dev".to_string(),
            resources: vec![
                decl("network/vpc", &[]),
                decl("network/cluster", &["network/vpc"]),
                decl("discovery/load-balancer", &["network/vpc"]),
                decl(
                    "compute/service/a",
                    &["network/cluster", "discovery/load-balancer"],
                ),
            ],
        };

        assert!(plan.dependency_ordered());
        let sorted = plan.topo_sort();
        let emitted: Vec<_> = plan.resources.iter().map(|r| r.id.clone()).collect();
        assert_eq!(sorted, emitted);
    }

    #[test]
    fn independent_roots_sort_in_emission_order() {
        let plan = ProvisioningPlan {
            project: "seon".to_string(),
            environment: "dev".to_string(),
            resources: vec![
                decl("network/vpc", &[]),
                decl("mesh/mesh", &[]),
                decl("mesh/node/a", &["mesh/mesh"]),
                decl("network/cluster", &["network/vpc"]),
            ],
        };
        let emitted: Vec<_> = plan.resources.iter().map(|r| r.id.clone()).collect();
        assert_eq!(plan.topo_sort(), emitted);
    }

    #[test]
    fn dependency_ordered_detects_forward_reference() {
        let plan = ProvisioningPlan {
            project: "seon".to_string(),
            environment: "dev".to_string(),
            resources: vec![
                decl("network/cluster", &["network/vpc"]),
                decl("network/vpc", &[]),
            ],
        };
        assert!(!plan.dependency_ordered());
    }

    #[test]
    fn stage_order_is_invariant() {
        assert_eq!(
            StageName::ORDER,
            [
                StageName::Source,
                StageName::Build,
                StageName::Approve,
                StageName::Deploy
            ]
        );
    }
}
