//! CLI module for k3dforge
//!
//! - `k3dforge create [NAME]` - compile create flags into a cluster descriptor

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

mod display;

pub use display::*;

use crate::config::RawCreateOptions;

const CREATE_DESCRIPTION: &str = "\
Create a new k3s cluster with containerized nodes (k3s in docker).
Every cluster will consist of one or more containers:
    - 1 (or more) master node container (k3s)
    - (optionally) 1 loadbalancer container as the entrypoint to the cluster (nginx)
    - (optionally) 1 (or more) worker node containers (k3s)";

#[derive(Parser, Debug)]
#[command(name = "k3dforge")]
#[command(about = "Compile k3s-in-docker cluster options into a cluster descriptor")]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging output (repeat for more detail; -v is taken by --volume)
    #[arg(long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Options file (YAML, or JSON with a .json extension; default: ~/.k3dforge/config.yaml)
    #[arg(long, global = true, env = "K3DFORGE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a new cluster
    #[command(long_about = CREATE_DESCRIPTION)]
    Create(CreateArgs),
}

/// Output format of the descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
    Table,
}

/// Arguments for the create command
#[derive(Parser, Debug)]
pub struct CreateArgs {
    /// Cluster name (default: k3s-default)
    pub name: Option<String>,

    /// Kubernetes API server port exposed on the LoadBalancer ([HOST:]HOSTPORT, default: random)
    #[arg(short = 'a', long, value_name = "[HOST:]HOSTPORT")]
    pub api_port: Option<String>,

    /// Number of master nodes (default: 1)
    #[arg(short, long, allow_negative_numbers = true)]
    pub masters: Option<i64>,

    /// Number of worker nodes (default: 0)
    #[arg(short, long, allow_negative_numbers = true)]
    pub workers: Option<i64>,

    /// k3s image for the nodes ("latest" resolves the newest release)
    #[arg(short, long)]
    pub image: Option<String>,

    /// Join an existing network
    #[arg(long)]
    pub network: Option<String>,

    /// Cluster token. By default, one is generated.
    #[arg(long)]
    pub token: Option<String>,

    /// Mount volumes into the nodes ([SOURCE:]DEST[@NODEFILTER[;NODEFILTER...]]),
    /// e.g. `-v /my/path@worker[0,1] -v /tmp/test:/tmp/other@master[0]`
    #[arg(short = 'v', long = "volume", value_name = "VOLUME")]
    pub volumes: Vec<String>,

    /// Map ports from the node containers to the host ([HOST:][HOSTPORT:]CONTAINERPORT[/PROTOCOL][@NODEFILTER]),
    /// e.g. `-p 8080:80@worker[0] -p 8081@worker[1]`
    #[arg(short = 'p', long = "port", value_name = "PORT")]
    pub ports: Vec<String>,

    /// Do not wait for the master(s) to be ready before returning
    #[arg(long)]
    pub no_wait: bool,

    /// Roll back if the cluster couldn't be created in the given duration
    #[arg(long, value_name = "DURATION", allow_hyphen_values = true)]
    pub timeout: Option<String>,

    /// Update the default kubeconfig with the new cluster's context
    #[arg(long)]
    pub update_kubeconfig: bool,

    /// Switch the default kubeconfig's current-context to the new cluster (implies --update-kubeconfig)
    #[arg(long = "switch")]
    pub switch_context: bool,

    /// Disable the creation of a LoadBalancer in front of the master nodes
    #[arg(long)]
    pub no_lb: bool,

    /// Disable the creation of a volume for importing images
    #[arg(long)]
    pub no_image_volume: bool,

    /// Additional arg passed to `k3s server` on master nodes (new flag per arg)
    #[arg(long = "k3s-server-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub k3s_server_args: Vec<String>,

    /// Additional arg passed to `k3s agent` on worker nodes (new flag per arg)
    #[arg(long = "k3s-agent-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub k3s_agent_args: Vec<String>,

    /// Output format of the descriptor
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
    pub output: OutputFormat,
}

impl CreateArgs {
    /// Options given on the command line; flags that were not passed stay unset
    pub fn to_raw_options(&self) -> RawCreateOptions {
        let set = |flag: bool| flag.then_some(true);

        RawCreateOptions {
            name: self.name.clone(),
            image: self.image.clone(),
            masters: self.masters,
            workers: self.workers,
            network: self.network.clone(),
            token: self.token.clone(),
            api_port: self.api_port.clone(),
            volumes: self.volumes.clone(),
            ports: self.ports.clone(),
            wait: self.no_wait.then_some(false),
            timeout: self.timeout.clone(),
            update_kubeconfig: set(self.update_kubeconfig),
            switch_context: set(self.switch_context),
            no_lb: set(self.no_lb),
            no_image_volume: set(self.no_image_volume),
            k3s_server_args: self.k3s_server_args.clone(),
            k3s_agent_args: self.k3s_agent_args.clone(),
        }
    }
}
