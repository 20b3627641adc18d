//! Cluster descriptor - the fully assembled topology handed to the lifecycle engine
//!
//! A descriptor is built once by [`super::build_cluster`] and never mutated
//! afterwards. Nodes keep their creation order: masters first, then workers.
//! The load balancer is owned separately and is not part of `nodes`.

use std::fmt;
use std::time::Duration;

use serde::{Serialize, Serializer};

use super::{DEFAULT_API_HOST, DEFAULT_API_PORT, HOST_NETWORK};

/// Role of a node in the cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// k3s server
    Master,
    /// k3s agent
    Worker,
    /// Proxy in front of the master nodes
    #[serde(rename = "loadbalancer")]
    LoadBalancer,
}

impl Role {
    /// Name used in node filter expressions
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Master => "master",
            Role::Worker => "worker",
            Role::LoadBalancer => "loadbalancer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Master-only node options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterOpts {
    /// Bootstraps the cluster state before the other masters join
    pub is_init: bool,
}

/// A single node of the cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub(crate) role: Role,
    pub(crate) image: String,
    pub(crate) args: Vec<String>,
    pub(crate) volumes: Vec<String>,
    pub(crate) ports: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) master_opts: Option<MasterOpts>,
}

impl Node {
    /// Create a master node running `k3s server` with the given extra args
    pub fn master(image: impl Into<String>, server_args: Vec<String>) -> Self {
        Self {
            role: Role::Master,
            image: image.into(),
            args: server_args,
            volumes: Vec::new(),
            ports: Vec::new(),
            master_opts: Some(MasterOpts::default()),
        }
    }

    /// Create a worker node running `k3s agent` with the given extra args
    pub fn worker(image: impl Into<String>, agent_args: Vec<String>) -> Self {
        Self {
            role: Role::Worker,
            image: image.into(),
            args: agent_args,
            volumes: Vec::new(),
            ports: Vec::new(),
            master_opts: None,
        }
    }

    /// Create the master load balancer. Its image is chosen by the lifecycle engine.
    pub fn load_balancer() -> Self {
        Self {
            role: Role::LoadBalancer,
            image: String::new(),
            args: Vec::new(),
            volumes: Vec::new(),
            ports: Vec::new(),
            master_opts: None,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    /// Extra args for the k3s process (server args on masters, agent args on workers)
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Volume mounts in `SRC:DEST[:MODE]` form
    pub fn volumes(&self) -> &[String] {
        &self.volumes
    }

    pub fn ports(&self) -> &[String] {
        &self.ports
    }

    pub fn master_opts(&self) -> Option<&MasterOpts> {
        self.master_opts.as_ref()
    }

    /// Whether this node is the init master of a multi-master cluster
    pub fn is_init(&self) -> bool {
        self.master_opts.as_ref().is_some_and(|m| m.is_init)
    }
}

/// Network the cluster nodes are attached to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClusterNetwork {
    /// Empty when a fresh network is created by the lifecycle engine
    pub name: String,
    /// The network already exists and is not owned by the cluster
    pub external: bool,
}

impl ClusterNetwork {
    /// Reference an existing network, or request a new one when `name` is empty
    pub fn from_name(name: &str) -> Self {
        if name.is_empty() {
            Self::default()
        } else {
            Self {
                name: name.to_string(),
                external: true,
            }
        }
    }

    pub fn is_host(&self) -> bool {
        self.name == HOST_NETWORK
    }
}

/// Host port the Kubernetes API is published on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiPort {
    /// A free host port is picked by the lifecycle engine
    Random,
    Fixed(u16),
}

impl fmt::Display for ApiPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiPort::Random => f.write_str("random"),
            ApiPort::Fixed(port) => write!(f, "{}", port),
        }
    }
}

impl Serialize for ApiPort {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// How the Kubernetes API is exposed on the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExposeApi {
    pub host: String,
    #[serde(rename = "hostIP")]
    pub host_ip: String,
    pub port: ApiPort,
}

impl Default for ExposeApi {
    fn default() -> Self {
        Self {
            host: DEFAULT_API_HOST.to_string(),
            host_ip: DEFAULT_API_HOST.to_string(),
            port: ApiPort::Fixed(DEFAULT_API_PORT),
        }
    }
}

/// Options carried in the descriptor for the lifecycle engine to enforce
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterCreateOpts {
    pub wait_for_master: bool,
    /// `None` means wait forever
    #[serde(serialize_with = "serialize_timeout")]
    pub timeout: Option<Duration>,
    pub disable_load_balancer: bool,
    pub disable_image_volume: bool,
    pub k3s_server_args: Vec<String>,
    pub k3s_agent_args: Vec<String>,
}

fn serialize_timeout<S: Serializer>(
    timeout: &Option<Duration>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match timeout {
        Some(d) => serializer.collect_str(&format_args!("{}ms", d.as_millis())),
        None => serializer.serialize_none(),
    }
}

/// The complete cluster descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    pub name: String,
    pub network: ClusterNetwork,
    /// Empty means the lifecycle engine generates one
    #[serde(skip_serializing_if = "String::is_empty")]
    pub token: String,
    pub create_opts: ClusterCreateOpts,
    #[serde(rename = "exposeAPI")]
    pub expose_api: ExposeApi,
    pub(crate) nodes: Vec<Node>,
    /// Index into `nodes`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) init_node: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) master_load_balancer: Option<Node>,
}

impl Cluster {
    /// Nodes in creation order (masters, then workers), load balancer excluded
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// The master elected to bootstrap a multi-master cluster
    pub fn init_node(&self) -> Option<&Node> {
        self.init_node.and_then(|i| self.nodes.get(i))
    }

    pub fn master_load_balancer(&self) -> Option<&Node> {
        self.master_load_balancer.as_ref()
    }

    pub fn nodes_with_role(&self, role: Role) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(move |n| n.role == role)
    }

    /// Nodes plus the load balancer, if any
    pub fn addressable_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().chain(self.master_load_balancer.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_names() {
        assert_eq!(Role::Master.to_string(), "master");
        assert_eq!(Role::LoadBalancer.as_str(), "loadbalancer");
        assert_eq!(
            serde_json::to_string(&Role::LoadBalancer).unwrap(),
            "\"loadbalancer\""
        );
    }

    #[test]
    fn test_node_constructors() {
        let master = Node::master("img", vec!["--tls-san=x".to_string()]);
        assert_eq!(master.role(), Role::Master);
        assert_eq!(master.args(), ["--tls-san=x".to_string()]);
        assert!(!master.is_init());
        assert!(master.master_opts().is_some());

        let worker = Node::worker("img", Vec::new());
        assert_eq!(worker.role(), Role::Worker);
        assert!(worker.master_opts().is_none());
        assert!(!worker.is_init());
    }

    #[test]
    fn test_network_from_name() {
        assert_eq!(ClusterNetwork::from_name(""), ClusterNetwork::default());

        let net = ClusterNetwork::from_name("host");
        assert!(net.external);
        assert!(net.is_host());
        assert!(!ClusterNetwork::from_name("bridge").is_host());
    }

    #[test]
    fn test_api_port_serialization() {
        assert_eq!(serde_json::to_string(&ApiPort::Random).unwrap(), "\"random\"");
        assert_eq!(serde_json::to_string(&ApiPort::Fixed(6443)).unwrap(), "\"6443\"");
    }

    #[test]
    fn test_timeout_serialization() {
        let opts = ClusterCreateOpts {
            timeout: Some(Duration::from_secs(90)),
            ..Default::default()
        };
        let json = serde_json::to_value(&opts).unwrap();
        assert_eq!(json["timeout"], "90000ms");

        let json = serde_json::to_value(ClusterCreateOpts::default()).unwrap();
        assert!(json["timeout"].is_null());
    }
}
