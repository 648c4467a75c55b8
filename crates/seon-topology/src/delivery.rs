//! Delivery pipeline planning.
//!
//! Every service gets the same four-stage pipeline: Source, Build,
//! Approve, Deploy. Stage names and ordering are invariant across all
//! services and environments; only stage parameters vary.

use serde::{Deserialize, Serialize};

use seon_core::catalog::{ServiceDescriptor, ServiceName};
use seon_core::plan::{StageAction, StageName, StageSpec};

/// The CI/CD stage sequence for one service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryPlan {
    pub service: ServiceName,
    pub stages: Vec<StageSpec>,
}

impl DeliveryPlan {
    /// Derive the pipeline for one service.
    ///
    /// Source parameters come from the descriptor's `pipeline` section,
    /// defaulting to `{project}/{service}` on `main`. Infallible: the
    /// stage topology admits no invalid configuration.
    pub fn resolve(descriptor: &ServiceDescriptor, project: &str, cluster: &str) -> Self {
        let (repository, branch) = match &descriptor.pipeline {
            Some(pipeline) => (pipeline.repository.clone(), pipeline.branch.clone()),
            None => (
                format!("{project}/{}", descriptor.name),
                "main".to_string(),
            ),
        };

        let stages = StageName::ORDER
            .iter()
            .map(|&name| StageSpec {
                name,
                action: match name {
                    StageName::Source => StageAction::Source {
                        repository: repository.clone(),
                        branch: branch.clone(),
                    },
                    StageName::Build => StageAction::Build {
                        image: descriptor.image.clone(),
                    },
                    StageName::Approve => StageAction::Approve {},
                    StageName::Deploy => StageAction::Deploy {
                        service: descriptor.name.clone(),
                        cluster: cluster.to_string(),
                    },
                },
            })
            .collect();

        Self {
            service: descriptor.name.clone(),
            stages,
        }
    }
}
