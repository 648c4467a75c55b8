//! Topology resolution pipeline.
//!
//! [`TopologyResolver`] drives the per-layer plans in dependency order
//! and emits a single [`ProvisioningPlan`]. The pipeline is linear with
//! no branching back:
//!
//! ```text
//! Unresolved -> ConfigLoaded -> NetworkResolved -> DiscoveryResolved
//!            -> MeshResolved | MeshSkipped -> ComputeResolved
//!            -> DeliveryResolved -> Finalized
//! ```
//!
//! Any [`ConfigError`] aborts the run, leaves the resolver in the
//! terminal `Failed` state carrying the first error, and hands nothing
//! downstream. Resolution is synchronous and single-threaded; determinism
//! outranks parallelism.

mod emit;

use tracing::{debug, info};

use seon_core::catalog::ConfigCatalog;
use seon_core::config::TopologyConfig;
use seon_core::error::ConfigError;
use seon_core::plan::ProvisioningPlan;
use seon_topology::compute::{ContainerPlan, SidecarPolicy};
use seon_topology::delivery::DeliveryPlan;
use seon_topology::discovery::DiscoveryPlan;
use seon_topology::mesh::MeshPlan;
use seon_topology::network::{NetworkPlan, ProviderCapabilities};

/// Observable pipeline state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolverState {
    Unresolved,
    ConfigLoaded,
    NetworkResolved,
    DiscoveryResolved,
    MeshResolved,
    /// The environment runs without a mesh; compute binds to discovery
    /// records directly.
    MeshSkipped,
    ComputeResolved,
    DeliveryResolved,
    Finalized,
    /// Terminal state carrying the first error encountered.
    Failed(ConfigError),
}

/// Orchestrates the plan components into one provisioning plan.
pub struct TopologyResolver {
    capabilities: ProviderCapabilities,
    state: ResolverState,
}

impl TopologyResolver {
    pub fn new(capabilities: ProviderCapabilities) -> Self {
        Self {
            capabilities,
            state: ResolverState::Unresolved,
        }
    }

    pub fn state(&self) -> &ResolverState {
        &self.state
    }

    /// Resolve the whole topology for one environment.
    ///
    /// The only public entry point. On error the resolver is left in
    /// `Failed`; a later call starts over from `Unresolved`.
    pub fn resolve_all(
        &mut self,
        config: &TopologyConfig,
        env_name: &str,
    ) -> Result<ProvisioningPlan, ConfigError> {
        self.state = ResolverState::Unresolved;
        match self.run(config, env_name) {
            Ok(plan) => {
                self.state = ResolverState::Finalized;
                info!(
                    environment = env_name,
                    resources = plan.resources.len(),
                    "provisioning plan finalized"
                );
                Ok(plan)
            }
            Err(err) => {
                self.state = ResolverState::Failed(err.clone());
                Err(err)
            }
        }
    }

    fn run(
        &mut self,
        config: &TopologyConfig,
        env_name: &str,
    ) -> Result<ProvisioningPlan, ConfigError> {
        let env = config.environment(env_name)?;

        let catalog = ConfigCatalog::load(config)?;
        self.state = ResolverState::ConfigLoaded;
        debug!(services = catalog.len(), "configuration catalog loaded");

        let network =
            NetworkPlan::resolve(&config.project, env_name, &env.network, &self.capabilities)?;
        self.state = ResolverState::NetworkResolved;
        debug!(
            cluster = %network.cluster_name,
            subnets = network.subnets.len(),
            "network plan resolved"
        );

        let namespace = env.namespace_for(env_name, &config.project);
        let discovery = DiscoveryPlan::resolve(&catalog, &namespace)?;
        self.state = ResolverState::DiscoveryResolved;
        debug!(namespace = %namespace, "discovery plan resolved");

        let mesh = if env.mesh {
            let plan = MeshPlan::resolve(&catalog, &discovery, &network.cluster_name)?;
            self.state = ResolverState::MeshResolved;
            debug!(mesh = %plan.mesh_name, "mesh plan resolved");
            Some(plan)
        } else {
            self.state = ResolverState::MeshSkipped;
            debug!("mesh disabled for environment, skipping");
            None
        };

        let policy = SidecarPolicy::for_environment(env);
        let mut computes = Vec::with_capacity(catalog.len());
        for descriptor in catalog.all() {
            let node = match &mesh {
                Some(plan) => Some(plan.node(&descriptor.name)?),
                None => None,
            };
            computes.push(ContainerPlan::resolve(descriptor, node, &policy)?);
        }
        self.state = ResolverState::ComputeResolved;
        debug!(services = computes.len(), "compute plans resolved");

        let deliveries: Vec<DeliveryPlan> = catalog
            .all()
            .map(|d| DeliveryPlan::resolve(d, &config.project, &network.cluster_name))
            .collect();
        self.state = ResolverState::DeliveryResolved;
        debug!(pipelines = deliveries.len(), "delivery plans resolved");

        Ok(emit::assemble(
            config,
            env_name,
            &catalog,
            &network,
            &discovery,
            mesh.as_ref(),
            &computes,
            &deliveries,
        ))
    }
}
