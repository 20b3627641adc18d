//! Hand-off to the engine that creates and removes cluster containers
//!
//! Creation is all-or-nothing: when the engine fails halfway, whatever it
//! created is deleted again before the error is reported.

use thiserror::Error;
use tracing::{error, info};

use super::types::Cluster;

#[derive(Error, Debug, PartialEq)]
pub enum LifecycleError {
    #[error("Failed to create cluster '{0}' because a cluster with that name already exists")]
    AlreadyExists(String),

    #[error("Cluster creation FAILED, all changes have been rolled back: {0}")]
    CreateFailed(String),

    #[error("Cluster creation FAILED, also FAILED to rollback changes: {create} (rollback: {rollback})")]
    RollbackFailed { create: String, rollback: String },

    #[error("Engine error: {0}")]
    Engine(String),
}

/// Engine that turns a descriptor into running containers
pub trait ClusterLifecycle {
    fn cluster_exists(&self, name: &str) -> bool;

    fn create(&mut self, cluster: &Cluster) -> Result<(), LifecycleError>;

    fn delete(&mut self, cluster: &Cluster) -> Result<(), LifecycleError>;
}

/// Create a cluster, deleting it again if creation fails
pub fn create_with_rollback(
    engine: &mut dyn ClusterLifecycle,
    cluster: &Cluster,
) -> Result<(), LifecycleError> {
    if engine.cluster_exists(&cluster.name) {
        return Err(LifecycleError::AlreadyExists(cluster.name.clone()));
    }

    if let Err(create_err) = engine.create(cluster) {
        error!("{}", create_err);
        error!("Failed to create cluster >>> Rolling Back");

        if let Err(rollback_err) = engine.delete(cluster) {
            error!("{}", rollback_err);
            return Err(LifecycleError::RollbackFailed {
                create: create_err.to_string(),
                rollback: rollback_err.to_string(),
            });
        }
        return Err(LifecycleError::CreateFailed(create_err.to_string()));
    }

    info!("Cluster '{}' created successfully!", cluster.name);
    Ok(())
}
