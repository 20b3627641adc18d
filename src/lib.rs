//! # k3dforge
//!
//! Compiles `cluster create` options (node counts, image, network, volume and
//! port mappings with node filters) into a fully specified [`Cluster`]
//! descriptor for a k3s-in-docker lifecycle engine.
//!
//! ```
//! use k3dforge::cluster::{build_cluster, BuildContext};
//! use k3dforge::config::RawCreateOptions;
//!
//! let raw = RawCreateOptions {
//!     masters: Some(3),
//!     workers: Some(2),
//!     ports: vec!["8080:80@worker[0]".to_string()],
//!     ..Default::default()
//! };
//! let cluster = build_cluster(raw, &BuildContext::default()).unwrap();
//! assert_eq!(cluster.nodes().len(), 5);
//! assert!(cluster.init_node().is_some());
//! ```

pub mod cli;
pub mod cluster;
pub mod config;

pub use cluster::{build_cluster, BuildContext, BuildError, Cluster};
