//! The closed set of configuration errors surfaced during resolution.
//!
//! Every rejection the resolver can produce maps to exactly one variant of
//! [`ConfigError`]. Errors are detected synchronously while a plan is being
//! resolved, never while a plan is being applied, and the first error halts
//! the run. The enum is `Clone + PartialEq` so the resolver can store the
//! first error in its terminal state and tests can assert exact variants.

use crate::catalog::ServiceName;

/// Error type for configuration and resolution failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Two service descriptors share the same name.
    #[error("duplicate service name '{0}'")]
    DuplicateServiceName(ServiceName),

    /// A required descriptor field is absent.
    #[error("service '{service}' is missing required field '{field}'")]
    MissingRequiredField {
        service: ServiceName,
        field: &'static str,
    },

    /// Container port outside 1-65535.
    #[error("service '{service}' declares port {port}, outside the valid range 1-65535")]
    InvalidPortRange { service: ServiceName, port: u32 },

    /// Address block is malformed or too small for the requested layout.
    #[error("invalid CIDR block '{cidr}': {reason}")]
    InvalidCidr { cidr: String, reason: String },

    /// More availability zones (or zone-bound gateways) requested than the
    /// provider declares available.
    #[error("requested {requested} availability zone(s) but only {available} available")]
    InsufficientAzs { requested: usize, available: usize },

    /// Two services claim the same (host, path, priority) listener tuple.
    #[error(
        "routing conflict: services '{first}' and '{second}' both claim \
         host '{host}' path '{path}' at priority {priority}"
    )]
    RoutingConflict {
        first: ServiceName,
        second: ServiceName,
        host: String,
        path: String,
        priority: u32,
    },

    /// Two services resolve to the same registry record name.
    #[error("duplicate registry name '{name}' claimed by services '{first}' and '{second}'")]
    DuplicateRegistryName {
        name: String,
        first: ServiceName,
        second: ServiceName,
    },

    /// A router whose routes all carry weight zero would blackhole traffic.
    #[error("router for service '{0}' has no route with a positive weight")]
    DeadRoute(ServiceName),

    /// The mesh backend graph contains a cycle.
    #[error("cyclic mesh backend chain: {}", format_chain(.chain))]
    CyclicMeshBackend { chain: Vec<ServiceName> },

    /// The container dependency graph of one service contains a cycle.
    #[error("container dependency cycle in service '{service}': {}", .chain.join(" -> "))]
    ContainerDependencyCycle {
        service: ServiceName,
        chain: Vec<String>,
    },

    /// CPU/memory pair is not a supported task sizing.
    #[error("service '{service}' requests unsupported sizing (cpu={cpu}, memory={memory})")]
    UnsupportedSizing {
        service: ServiceName,
        cpu: u32,
        memory: u32,
    },

    /// A keyed lookup missed. Lookup misses are always errors, never
    /// silent defaults.
    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },

    /// File read failure while loading configuration.
    #[error("IO error: {0}")]
    Io(String),

    /// YAML deserialization failure while loading configuration.
    #[error("YAML parse error: {0}")]
    Yaml(String),
}

impl ConfigError {
    /// Shorthand for a lookup miss.
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }
}

// Messages, not sources: keeps the enum cloneable and comparable.
impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Yaml(err.to_string())
    }
}

fn format_chain(chain: &[ServiceName]) -> String {
    chain
        .iter()
        .map(|n| n.as_str())
        .collect::<Vec<_>>()
        .join(" -> ")
}
