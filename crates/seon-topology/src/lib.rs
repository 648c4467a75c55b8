//! Per-layer topology planning for SEON.
//!
//! Each module derives one layer of the provisioning plan as a pure
//! function of the validated catalog and the layers before it:
//! network -> discovery -> mesh -> compute -> delivery. Nothing here
//! performs I/O or mutates shared state; the resolver in `seon-resolver`
//! drives these in dependency order.

pub mod compute;
pub mod delivery;
pub mod discovery;
pub mod graph;
pub mod mesh;
pub mod network;

pub use compute::{ContainerPlan, SidecarPolicy};
pub use delivery::DeliveryPlan;
pub use discovery::{DiscoveryPlan, DiscoveryRecord, LoadBalancerSpec, NamespaceSpec};
pub use mesh::{MeshNode, MeshPlan, MeshRouter};
pub use network::{CidrBlock, NetworkPlan, ProviderCapabilities, SubnetSpec};
