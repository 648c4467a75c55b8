//! Per-service declarative descriptors.
//!
//! A [`ServiceConfig`] is the raw, serde-level shape of one deployable
//! service. Discovery mode is an explicitly tagged enum rather than a set
//! of optional fields, so a descriptor can never carry two discovery
//! mechanisms at once.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Raw descriptor for one deployable service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Unique service name.
    pub name: String,

    /// Container image reference. Required; validated at catalog load.
    #[serde(default)]
    pub image: Option<String>,

    /// Container port. Parsed wide (u32) so an out-of-range value is
    /// reported as a configuration error rather than a parse failure.
    #[serde(default)]
    pub port: Option<u32>,

    /// Health-check path. Required; validated at catalog load.
    #[serde(default)]
    pub health_check: Option<String>,

    /// Environment variables for the main container.
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// How other services locate this one at runtime.
    pub discovery: DiscoveryConfig,

    /// CPU/memory sizing for the task.
    #[serde(default)]
    pub sizing: SizingConfig,

    /// Deployment parameters (task count, healthy percentages).
    #[serde(default)]
    pub deployment: DeploymentConfig,

    /// Names of services this one calls. Validated against the catalog
    /// and checked for cycles when the mesh is resolved.
    #[serde(default)]
    pub backends: Vec<String>,

    /// Weighted routes for this service's router. Empty means a single
    /// self-route at weight 100.
    #[serde(default)]
    pub routes: Vec<RouteConfig>,

    /// Delivery pipeline source. Defaults to `{project}/{name}` on `main`.
    #[serde(default)]
    pub pipeline: Option<PipelineConfig>,
}

/// Discovery mechanism selection, tagged by `mode`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum DiscoveryConfig {
    /// Public DNS discovery via a load-balancer listener rule.
    Dns {
        /// Host header to match.
        host: String,

        /// Path pattern to match.
        #[serde(default = "default_path_pattern")]
        path: String,

        /// Listener rule priority. Caller-supplied; exact ties with
        /// another service are rejected, never reordered.
        priority: u32,
    },

    /// Private registry discovery within the environment namespace.
    Registry {
        /// Record name override. Defaults to the service name.
        #[serde(default)]
        name: Option<String>,

        /// Registry record type.
        #[serde(default)]
        record_type: RecordType,
    },
}

/// Registry record type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    #[default]
    A,
    Srv,
}

/// Task CPU/memory sizing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SizingConfig {
    /// CPU units.
    #[serde(default = "default_cpu")]
    pub cpu: u32,

    /// Memory in MiB.
    #[serde(default = "default_memory")]
    pub memory: u32,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            cpu: default_cpu(),
            memory: default_memory(),
        }
    }
}

/// Deployment parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DeploymentConfig {
    /// Desired task count.
    #[serde(default = "default_desired_count")]
    pub desired_count: u32,

    /// Minimum healthy percent during deployments.
    #[serde(default = "default_min_healthy")]
    pub min_healthy_percent: u32,

    /// Maximum healthy percent during deployments.
    #[serde(default = "default_max_healthy")]
    pub max_healthy_percent: u32,
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            desired_count: default_desired_count(),
            min_healthy_percent: default_min_healthy(),
            max_healthy_percent: default_max_healthy(),
        }
    }
}

/// One weighted route on a service's router.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteConfig {
    /// Target service name.
    pub service: String,

    /// Integer traffic weight, >= 0. At least one route per router must
    /// carry a positive weight.
    #[serde(default = "default_route_weight")]
    pub weight: u32,
}

/// Delivery pipeline source parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Source repository.
    pub repository: String,

    /// Source branch.
    #[serde(default = "default_branch")]
    pub branch: String,
}

// Default value functions
fn default_path_pattern() -> String {
    "/*".to_string()
}

fn default_cpu() -> u32 {
    256
}

fn default_memory() -> u32 {
    512
}

fn default_desired_count() -> u32 {
    1
}

fn default_min_healthy() -> u32 {
    100
}

fn default_max_healthy() -> u32 {
    200
}

fn default_route_weight() -> u32 {
    100
}

fn default_branch() -> String {
    "main".to_string()
}
