//! Plan emission.
//!
//! Flattens the resolved layers into an ordered list of resource
//! declarations: network, then discovery, then mesh, then compute, then
//! delivery. Every declaration carries its dependencies by stable
//! identifier so the provisioning backend can parallelize independent
//! branches; within the plan, dependencies always point at
//! already-emitted resources.

use std::collections::BTreeSet;

use seon_core::catalog::{ConfigCatalog, ServiceName};
use seon_core::config::TopologyConfig;
use seon_core::plan::{ProvisioningPlan, ResourceDecl, ResourceId, ResourceSpec, SubnetTier};
use seon_topology::compute::ContainerPlan;
use seon_topology::delivery::DeliveryPlan;
use seon_topology::discovery::{DiscoveryPlan, DiscoveryRecord};
use seon_topology::mesh::MeshPlan;
use seon_topology::network::NetworkPlan;

const VPC_ID: &str = "network/vpc";
const CLUSTER_ID: &str = "network/cluster";
const LOAD_BALANCER_ID: &str = "discovery/load-balancer";
const NAMESPACE_ID: &str = "discovery/namespace";
const MESH_ID: &str = "mesh/mesh";

fn subnet_id(name: &str) -> ResourceId {
    ResourceId::new(format!("network/subnet/{name}"))
}

fn listener_rule_id(service: &ServiceName) -> ResourceId {
    ResourceId::new(format!("discovery/listener-rule/{service}"))
}

fn registry_record_id(service: &ServiceName) -> ResourceId {
    ResourceId::new(format!("discovery/registry-record/{service}"))
}

fn node_id(service: &ServiceName) -> ResourceId {
    ResourceId::new(format!("mesh/node/{service}"))
}

fn router_id(service: &ServiceName) -> ResourceId {
    ResourceId::new(format!("mesh/router/{service}"))
}

fn task_definition_id(service: &ServiceName) -> ResourceId {
    ResourceId::new(format!("compute/task-definition/{service}"))
}

fn workload_service_id(service: &ServiceName) -> ResourceId {
    ResourceId::new(format!("compute/service/{service}"))
}

fn pipeline_id(service: &ServiceName) -> ResourceId {
    ResourceId::new(format!("delivery/pipeline/{service}"))
}

/// The discovery-layer resource a service's bindings live in.
fn discovery_resource_id(service: &ServiceName, record: &DiscoveryRecord) -> ResourceId {
    match record {
        DiscoveryRecord::ListenerRule { .. } => listener_rule_id(service),
        DiscoveryRecord::RegistryEntry { .. } => registry_record_id(service),
    }
}

/// Accumulates declarations while enforcing the emission invariants:
/// unique ids, dependencies on already-emitted resources only.
struct PlanBuilder {
    resources: Vec<ResourceDecl>,
    emitted: BTreeSet<ResourceId>,
}

impl PlanBuilder {
    fn new() -> Self {
        Self {
            resources: Vec::new(),
            emitted: BTreeSet::new(),
        }
    }

    fn push(&mut self, id: ResourceId, depends_on: Vec<ResourceId>, spec: ResourceSpec) {
        // Plans are small; the guard is cheap enough to keep in release
        // builds.
        assert!(!self.emitted.contains(&id), "duplicate resource id {id}");
        for dep in &depends_on {
            assert!(
                self.emitted.contains(dep),
                "resource {id} depends on not-yet-emitted {dep}"
            );
        }
        self.emitted.insert(id.clone());
        self.resources.push(ResourceDecl {
            id,
            depends_on,
            spec,
        });
    }
}

/// Assemble the final plan from the resolved layers.
///
/// Per-service resources follow catalog declaration order, which is what
/// makes repeated runs byte-identical.
#[allow(clippy::too_many_arguments)]
pub(crate) fn assemble(
    config: &TopologyConfig,
    env_name: &str,
    catalog: &ConfigCatalog,
    network: &NetworkPlan,
    discovery: &DiscoveryPlan,
    mesh: Option<&MeshPlan>,
    computes: &[ContainerPlan],
    deliveries: &[DeliveryPlan],
) -> ProvisioningPlan {
    let mut builder = PlanBuilder::new();

    // Network layer.
    builder.push(
        ResourceId::new(VPC_ID),
        Vec::new(),
        ResourceSpec::Network {
            cidr: network.cidr.clone(),
            availability_zones: network.availability_zones.clone(),
            nat_gateways: network.nat_gateways,
        },
    );
    for subnet in &network.subnets {
        builder.push(
            subnet_id(&subnet.name),
            vec![ResourceId::new(VPC_ID)],
            ResourceSpec::Subnet {
                tier: subnet.tier,
                availability_zone: subnet.availability_zone.clone(),
                cidr: subnet.cidr.clone(),
            },
        );
    }
    builder.push(
        ResourceId::new(CLUSTER_ID),
        vec![ResourceId::new(VPC_ID)],
        ResourceSpec::Cluster {
            name: network.cluster_name.clone(),
        },
    );

    // Discovery layer.
    if let Some(lb) = &discovery.load_balancer {
        let mut deps = vec![ResourceId::new(VPC_ID)];
        deps.extend(
            network
                .subnets
                .iter()
                .filter(|s| s.tier == SubnetTier::Public)
                .map(|s| subnet_id(&s.name)),
        );
        builder.push(
            ResourceId::new(LOAD_BALANCER_ID),
            deps,
            ResourceSpec::LoadBalancer {
                internet_facing: lb.internet_facing,
            },
        );
    }
    if let Some(namespace) = &discovery.namespace {
        builder.push(
            ResourceId::new(NAMESPACE_ID),
            vec![ResourceId::new(VPC_ID)],
            ResourceSpec::RegistryNamespace {
                name: namespace.name.clone(),
            },
        );
    }
    for descriptor in catalog.all() {
        let record = discovery
            .record(&descriptor.name)
            .expect("every catalog service has a discovery record");
        match record {
            DiscoveryRecord::ListenerRule {
                host,
                path,
                priority,
                port,
                health_check,
            } => builder.push(
                listener_rule_id(&descriptor.name),
                vec![ResourceId::new(LOAD_BALANCER_ID)],
                ResourceSpec::ListenerRule {
                    service: descriptor.name.clone(),
                    host: host.clone(),
                    path: path.clone(),
                    priority: *priority,
                    port: *port,
                    health_check: health_check.clone(),
                },
            ),
            DiscoveryRecord::RegistryEntry {
                name,
                record_type,
                port,
                ..
            } => builder.push(
                registry_record_id(&descriptor.name),
                vec![ResourceId::new(NAMESPACE_ID)],
                ResourceSpec::RegistryRecord {
                    service: descriptor.name.clone(),
                    name: name.clone(),
                    record_type: *record_type,
                    port: *port,
                },
            ),
        }
    }

    // Mesh layer. Node-to-node edges are safe because the backend graph
    // was validated acyclic; routers depend on nodes, never the reverse.
    if let Some(mesh) = mesh {
        builder.push(
            ResourceId::new(MESH_ID),
            Vec::new(),
            ResourceSpec::Mesh {
                name: mesh.mesh_name.clone(),
            },
        );
        // Nodes must appear after the backend nodes they reference. The
        // backend graph is acyclic, so a post-order walk from each node
        // in declaration order yields a valid, deterministic emission
        // order.
        let mut node_order: Vec<&ServiceName> = Vec::new();
        let mut visited: BTreeSet<&ServiceName> = BTreeSet::new();
        for node in mesh.nodes() {
            let mut stack = vec![(&node.service, false)];
            while let Some((service, expanded)) = stack.pop() {
                if expanded {
                    node_order.push(service);
                    continue;
                }
                if !visited.insert(service) {
                    continue;
                }
                stack.push((service, true));
                let backends = &mesh
                    .node(service)
                    .expect("backend existence validated at mesh resolution")
                    .backends;
                for backend in backends.iter().rev() {
                    stack.push((backend, false));
                }
            }
        }

        for service in node_order {
            let node = mesh.node(service).expect("ordered from mesh nodes");
            let record = discovery
                .record(&node.service)
                .expect("every mesh node mirrors a discovery record");
            let mut deps = vec![
                ResourceId::new(MESH_ID),
                discovery_resource_id(&node.service, record),
            ];
            deps.extend(node.backends.iter().map(node_id));
            builder.push(
                node_id(&node.service),
                deps,
                ResourceSpec::MeshNode {
                    service: node.service.clone(),
                    discovery: node.discovery.clone(),
                    backends: node.backends.clone(),
                },
            );
        }
        for router in mesh.routers() {
            let mut deps = vec![node_id(&router.service)];
            for route in &router.routes {
                let target = node_id(&route.target);
                if !deps.contains(&target) {
                    deps.push(target);
                }
            }
            builder.push(
                router_id(&router.service),
                deps,
                ResourceSpec::MeshRouter {
                    service: router.service.clone(),
                    routes: router.routes.clone(),
                },
            );
        }
    }

    // Compute layer.
    for plan in computes {
        let task_deps = if mesh.is_some() {
            vec![node_id(&plan.service)]
        } else {
            Vec::new()
        };
        builder.push(
            task_definition_id(&plan.service),
            task_deps,
            ResourceSpec::TaskDefinition {
                service: plan.service.clone(),
                cpu: plan.cpu,
                memory: plan.memory,
                containers: plan.containers.clone(),
            },
        );

        let record = discovery
            .record(&plan.service)
            .expect("every compute plan has a discovery record");
        builder.push(
            workload_service_id(&plan.service),
            vec![
                ResourceId::new(CLUSTER_ID),
                task_definition_id(&plan.service),
                discovery_resource_id(&plan.service, record),
            ],
            ResourceSpec::WorkloadService {
                service: plan.service.clone(),
                desired_count: plan.desired_count,
                min_healthy_percent: plan.min_healthy_percent,
                max_healthy_percent: plan.max_healthy_percent,
            },
        );
    }

    // Delivery layer.
    for delivery in deliveries {
        builder.push(
            pipeline_id(&delivery.service),
            vec![workload_service_id(&delivery.service)],
            ResourceSpec::Pipeline {
                service: delivery.service.clone(),
                stages: delivery.stages.clone(),
            },
        );
    }

    let plan = ProvisioningPlan {
        project: config.project.clone(),
        environment: env_name.to_string(),
        resources: builder.resources,
    };
    debug_assert!(plan.dependency_ordered());
    plan
}
