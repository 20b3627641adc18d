//! Option validation - raw create options into typed, checked values
//!
//! Every check here rejects malformed input with a message naming the offending
//! flag value. Nothing is coerced silently and there is no partial result: the
//! first failure aborts the build.

use std::time::Duration;

use regex::Regex;
use thiserror::Error;
use tracing::{debug, info};

use super::RawCreateOptions;
use crate::cluster::attachments::{build_port_map, build_volume_map, AttachmentError, AttachmentMap};
use crate::cluster::filter::{split_filters_from_flag, FilterError};
use crate::cluster::name::{check_name, NameError};
use crate::cluster::port::{parse_api_port, validate_port_map, PortError};
use crate::cluster::types::{ApiPort, ClusterCreateOpts, ClusterNetwork, ExposeApi};
use crate::cluster::version::{default_image, k3s_image};
use crate::cluster::volume::{validate_volume_mount, VolumeError};
use crate::cluster::{BuildContext, DEFAULT_API_HOST, DEFAULT_API_PORT, DEFAULT_CLUSTER_NAME};

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error(transparent)]
    Name(#[from] NameError),

    #[error("--{flag} must be >= 0, got {value}")]
    NegativeCount { flag: &'static str, value: i64 },

    #[error("Can only run a single node in hostnetwork mode, got {0} nodes")]
    HostNetworkMultipleNodes(usize),

    #[error("--timeout DURATION must be >= 1s, got '{0}'")]
    NonPositiveTimeout(String),

    #[error("Invalid --timeout '{value}': {reason}")]
    InvalidTimeout { value: String, reason: String },

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Volume(#[from] VolumeError),

    #[error(transparent)]
    Port(#[from] PortError),

    #[error(transparent)]
    Attachment(#[from] AttachmentError),
}

/// What to do with the kubeconfig once the cluster is up
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KubeconfigOpts {
    /// Add the new cluster's context to the default kubeconfig
    pub update: bool,
    /// Also make it the current context (implies `update`)
    pub switch_context: bool,
}

/// Validated create options, consumed by the topology assembler
#[derive(Debug, Clone, PartialEq)]
pub struct CreateOptions {
    pub name: String,
    pub image: String,
    pub masters: usize,
    pub workers: usize,
    pub network: ClusterNetwork,
    pub token: String,
    pub expose_api: ExposeApi,
    pub volumes: AttachmentMap,
    pub ports: AttachmentMap,
    pub create_opts: ClusterCreateOpts,
    pub kubeconfig: KubeconfigOpts,
}

// ============================================================================
// Pure parsing helpers
// ============================================================================

/// Parse a Go-style duration such as `90s`, `1m30s`, `1.5h` or `500ms`.
/// A bare number is taken as seconds.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration".to_string());
    }

    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    let pattern = Regex::new(r"(\d+(?:\.\d+)?)(ns|us|µs|ms|s|m|h)").map_err(|e| e.to_string())?;

    let mut total = Duration::ZERO;
    let mut consumed = 0;

    for caps in pattern.captures_iter(s) {
        let (Some(whole), Some(value), Some(unit)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        if whole.start() != consumed {
            return Err(format!("unexpected '{}'", &s[consumed..whole.start()]));
        }
        consumed = whole.end();

        let value: f64 = value
            .as_str()
            .parse()
            .map_err(|_| format!("invalid number '{}'", value.as_str()))?;
        let unit_nanos: u64 = match unit.as_str() {
            "ns" => 1,
            "us" | "µs" => 1_000,
            "ms" => 1_000_000,
            "s" => 1_000_000_000,
            "m" => 60_000_000_000,
            "h" => 3_600_000_000_000,
            other => return Err(format!("unknown unit '{}'", other)),
        };
        let nanos = (value * unit_nanos as f64).round();
        if !nanos.is_finite() || nanos >= u64::MAX as f64 {
            return Err(format!("'{}' is out of range", s));
        }
        total = total
            .checked_add(Duration::from_nanos(nanos as u64))
            .ok_or_else(|| format!("'{}' is out of range", s))?;
    }

    if consumed != s.len() {
        return Err(format!("unknown unit in '{}'", s));
    }

    Ok(total)
}

fn validate_timeout(value: &str) -> Result<Duration, ValidationError> {
    let trimmed = value.trim();
    let (negative, magnitude) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };

    let duration = parse_duration(magnitude).map_err(|reason| ValidationError::InvalidTimeout {
        value: value.to_string(),
        reason,
    })?;

    if negative || duration.is_zero() {
        return Err(ValidationError::NonPositiveTimeout(value.to_string()));
    }
    Ok(duration)
}

fn validate_count(flag: &'static str, value: i64) -> Result<usize, ValidationError> {
    usize::try_from(value).map_err(|_| ValidationError::NegativeCount { flag, value })
}

// ============================================================================
// Option validation
// ============================================================================

/// Validate raw options, applying defaults for everything left unset
pub fn validate_options(
    raw: RawCreateOptions,
    ctx: &BuildContext<'_>,
) -> Result<CreateOptions, ValidationError> {
    // name
    let name = raw.name.unwrap_or_else(|| DEFAULT_CLUSTER_NAME.to_string());
    check_name(&name)?;

    // --image
    let image = match raw.image {
        Some(image) if image == "latest" => {
            let image = k3s_image(&ctx.versions.resolve_latest());
            info!("Resolved image 'latest' to '{}'", image);
            image
        }
        Some(image) => image,
        None => default_image(),
    };

    // --masters / --workers
    let masters = validate_count("masters", raw.masters.unwrap_or(1))?;
    let workers = validate_count("workers", raw.workers.unwrap_or(0))?;

    // --network
    let network = ClusterNetwork::from_name(raw.network.as_deref().unwrap_or_default());
    let node_count = masters.saturating_add(workers);
    if network.is_host() && node_count > 1 {
        return Err(ValidationError::HostNetworkMultipleNodes(node_count));
    }

    // --token
    let token = raw.token.unwrap_or_default();

    // --timeout: only checked when given
    let timeout = raw.timeout.as_deref().map(validate_timeout).transpose()?;

    // --api-port
    let mut expose_api = parse_api_port(raw.api_port.as_deref().unwrap_or("random"))?;
    if expose_api.host.is_empty() {
        expose_api.host = DEFAULT_API_HOST.to_string();
    }
    if expose_api.host_ip.is_empty() {
        expose_api.host_ip = DEFAULT_API_HOST.to_string();
    }
    if network.is_host() {
        // no host port mapping in host network mode, the API listens on its own port
        expose_api.port = ApiPort::Fixed(DEFAULT_API_PORT);
    }

    // --volume
    let mut volume_entries = Vec::with_capacity(raw.volumes.len());
    for flag in &raw.volumes {
        let (volume, filters) = split_filters_from_flag(flag)?;
        let volume = validate_volume_mount(ctx.volumes, &volume)?;
        volume_entries.push((volume, filters));
    }
    let volumes = build_volume_map(volume_entries);

    // --port
    let mut port_entries = Vec::with_capacity(raw.ports.len());
    for flag in &raw.ports {
        let (portmap, filters) = split_filters_from_flag(flag)?;
        let portmap = validate_port_map(&portmap)?;
        port_entries.push((portmap, filters));
    }
    let ports = build_port_map(port_entries)?;

    // kubeconfig handling needs a ready master
    let switch_context = raw.switch_context.unwrap_or(false);
    let update = raw.update_kubeconfig.unwrap_or(false) || switch_context;
    let mut wait_for_master = raw.wait.unwrap_or(true);
    if update && !wait_for_master {
        debug!("'--update-kubeconfig' set: enabling wait-for-master");
        wait_for_master = true;
    }

    Ok(CreateOptions {
        name,
        image,
        masters,
        workers,
        network,
        token,
        expose_api,
        volumes,
        ports,
        create_opts: ClusterCreateOpts {
            wait_for_master,
            timeout,
            disable_load_balancer: raw.no_lb.unwrap_or(false),
            disable_image_volume: raw.no_image_volume.unwrap_or(false),
            k3s_server_args: raw.k3s_server_args,
            k3s_agent_args: raw.k3s_agent_args,
        },
        kubeconfig: KubeconfigOpts {
            update,
            switch_context,
        },
    })
}
