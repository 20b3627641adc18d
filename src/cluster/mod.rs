//! # Cluster topology
//!
//! Turns cluster create options into a [`Cluster`] descriptor: a typed list of
//! master and worker nodes plus an optional load balancer, with volume and port
//! attachments resolved through node filters.
//!
//! ## Pipeline
//!
//! ```text
//! RawCreateOptions ──validate──▶ CreateOptions ──assemble──▶ Cluster ──▶ ClusterLifecycle
//!   (file + flags)               (+ attachment maps)          (descriptor)   (external engine)
//! ```
//!
//! Everything up to the descriptor is pure and synchronous. Creating the
//! containers is left to a [`ClusterLifecycle`] implementation.

pub mod assembler;
pub mod attachments;
pub mod filter;
pub mod lifecycle;
pub mod name;
pub mod port;
pub mod types;
pub mod version;
pub mod volume;

pub use assembler::{assemble, TopologyError};
pub use attachments::{build_port_map, build_volume_map, Attachment, AttachmentError, AttachmentMap};
pub use filter::{split_filters_from_flag, FilterError, NodeFilterResolver, RoleFilter};
pub use lifecycle::{create_with_rollback, ClusterLifecycle, LifecycleError};
pub use name::{check_name, NameError};
pub use port::{parse_api_port, validate_port_map, PortError};
pub use types::{
    ApiPort, Cluster, ClusterCreateOpts, ClusterNetwork, ExposeApi, MasterOpts, Node, Role,
};
pub use version::{default_image, k3s_image, PinnedVersion, VersionResolver};
pub use volume::{validate_volume_mount, NoNamedVolumes, VolumeError, VolumeLookup};

use thiserror::Error;

use crate::config::{validate_options, RawCreateOptions, ValidationError};

/// Cluster name used when none is given
pub const DEFAULT_CLUSTER_NAME: &str = "k3s-default";

/// Prefix for runtime objects and kubeconfig contexts
pub const DEFAULT_OBJECT_NAME_PREFIX: &str = "k3d";

pub const DEFAULT_K3S_IMAGE_REPO: &str = "docker.io/rancher/k3s";

/// Address the Kubernetes API is published on by default
pub const DEFAULT_API_HOST: &str = "0.0.0.0";

/// Kubernetes API port inside the node containers
pub const DEFAULT_API_PORT: u16 = 6443;

/// Network name that puts the node into the host network namespace
pub const HOST_NETWORK: &str = "host";

pub const MAX_CLUSTER_NAME_LEN: usize = 32;

/// k3s release this build is pinned to
pub const K3S_VERSION: &str = match option_env!("K3S_VERSION") {
    Some(v) => v,
    None => "v1.18.6-k3s1",
};

/// Collaborators consulted while building a descriptor
#[derive(Clone, Copy)]
pub struct BuildContext<'a> {
    pub versions: &'a dyn VersionResolver,
    pub volumes: &'a dyn VolumeLookup,
    pub filters: &'a dyn NodeFilterResolver,
}

impl Default for BuildContext<'static> {
    /// Offline context: pinned k3s version, no runtime volumes, role/index filters
    fn default() -> Self {
        Self {
            versions: &PinnedVersion,
            volumes: &NoNamedVolumes,
            filters: &RoleFilter,
        }
    }
}

/// Errors that abort a descriptor build
#[derive(Error, Debug, PartialEq)]
pub enum BuildError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Topology(#[from] TopologyError),
}

/// Validate raw options and assemble the cluster descriptor
pub fn build_cluster(raw: RawCreateOptions, ctx: &BuildContext<'_>) -> Result<Cluster, BuildError> {
    let options = validate_options(raw, ctx)?;
    let cluster = assemble(options, ctx.filters)?;
    Ok(cluster)
}
