//! Topology assembly - validated options in, cluster descriptor out
//!
//! Nodes are created in a fixed order (masters, then workers) and attachments
//! are resolved against that list afterwards. Volumes never target the load
//! balancer; ports do.

use thiserror::Error;
use tracing::debug;

use super::attachments::AttachmentMap;
use super::filter::{FilterError, NodeFilterResolver};
use super::types::{Cluster, Node};
use crate::config::CreateOptions;

#[derive(Error, Debug, PartialEq)]
pub enum TopologyError {
    #[error("Malformed port mapping '{0}' lacks a node filter, but there is more than one node (including the load balancer, if there is any)")]
    AmbiguousPort(String),

    #[error("Failed to attach '{spec}': {source}")]
    Filter { spec: String, source: FilterError },
}

/// Build the cluster descriptor for a set of validated options
pub fn assemble(
    options: CreateOptions,
    resolver: &dyn NodeFilterResolver,
) -> Result<Cluster, TopologyError> {
    let CreateOptions {
        name,
        image,
        masters,
        workers,
        network,
        token,
        expose_api,
        volumes,
        ports,
        create_opts,
        ..
    } = options;

    let master_load_balancer = (!create_opts.disable_load_balancer).then(Node::load_balancer);

    let mut nodes = Vec::new();
    let mut init_node = None;

    for i in 0..masters {
        let mut node = Node::master(image.clone(), create_opts.k3s_server_args.clone());

        // without an external datastore the first master initializes the cluster
        if i == 0 && masters > 1 {
            if let Some(opts) = node.master_opts.as_mut() {
                opts.is_init = true;
            }
            init_node = Some(nodes.len());
        }

        nodes.push(node);
    }

    for _ in 0..workers {
        nodes.push(Node::worker(image.clone(), create_opts.k3s_agent_args.clone()));
    }

    let mut cluster = Cluster {
        name,
        network,
        token,
        create_opts,
        expose_api,
        nodes,
        init_node,
        master_load_balancer,
    };

    attach_volumes(&mut cluster, &volumes, resolver)?;
    attach_ports(&mut cluster, &ports, resolver)?;

    Ok(cluster)
}

fn attach_volumes(
    cluster: &mut Cluster,
    volumes: &AttachmentMap,
    resolver: &dyn NodeFilterResolver,
) -> Result<(), TopologyError> {
    debug!("Volume attachments: {:?}", volumes);

    for attachment in volumes {
        let candidates: Vec<&Node> = cluster.nodes.iter().collect();
        let selected = resolver
            .resolve(&candidates, &attachment.filters)
            .map_err(|source| TopologyError::Filter {
                spec: attachment.spec.clone(),
                source,
            })?;

        for index in selected {
            if let Some(node) = cluster.nodes.get_mut(index) {
                node.volumes.push(attachment.spec.clone());
            }
        }
    }

    Ok(())
}

fn attach_ports(
    cluster: &mut Cluster,
    ports: &AttachmentMap,
    resolver: &dyn NodeFilterResolver,
) -> Result<(), TopologyError> {
    debug!("Port attachments: {:?}", ports);

    let node_count = cluster.nodes.len();
    let addressable = node_count + usize::from(cluster.master_load_balancer.is_some());

    for attachment in ports {
        if attachment.filters.is_empty() && addressable > 1 {
            return Err(TopologyError::AmbiguousPort(attachment.spec.clone()));
        }

        let candidates: Vec<&Node> = cluster.addressable_nodes().collect();
        let selected = resolver
            .resolve(&candidates, &attachment.filters)
            .map_err(|source| TopologyError::Filter {
                spec: attachment.spec.clone(),
                source,
            })?;

        for index in selected {
            let node = if index < node_count {
                cluster.nodes.get_mut(index)
            } else {
                cluster.master_load_balancer.as_mut()
            };
            if let Some(node) = node {
                node.ports.push(attachment.spec.clone());
            }
        }
    }

    Ok(())
}
