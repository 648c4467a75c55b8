//! Core types for the SEON topology resolver.
//!
//! This crate holds the three vocabularies shared by every other SEON
//! crate: the raw configuration model ([`config`]), the validated service
//! catalog ([`catalog`]), and the provisioning plan schema ([`plan`]),
//! plus the closed [`error::ConfigError`] set.

pub mod catalog;
pub mod config;
pub mod error;
pub mod plan;

pub use catalog::{ConfigCatalog, ServiceDescriptor, ServiceName};
pub use config::{
    DeploymentConfig, DiscoveryConfig, EnvironmentConfig, NetworkConfig, PipelineConfig,
    RecordType, RouteConfig, ServiceConfig, SizingConfig, TopologyConfig,
};
pub use error::ConfigError;
pub use plan::{
    ContainerDependency, ContainerSpec, NodeDiscovery, ProvisioningPlan, ResourceDecl, ResourceId,
    ResourceSpec, StageAction, StageName, StageSpec, StartupCondition, SubnetTier, WeightedRoute,
};
