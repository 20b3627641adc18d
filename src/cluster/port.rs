//! Port mapping and API port parsing

use std::fmt;
use std::net::IpAddr;

use thiserror::Error;

use super::types::{ApiPort, ExposeApi};

#[derive(Error, Debug, PartialEq)]
pub enum PortError {
    #[error("Invalid port mapping '{0}': expected [HOST:][HOSTPORT:]CONTAINERPORT[/PROTOCOL]")]
    Format(String),

    #[error("Invalid port mapping '{mapping}': '{port}' is not a port (1-65535) or port range")]
    InvalidPort { mapping: String, port: String },

    #[error("Invalid port mapping '{mapping}': unknown protocol '{protocol}' (expected tcp, udp or sctp)")]
    InvalidProtocol { mapping: String, protocol: String },

    #[error("Invalid port mapping '{0}': host and container port ranges differ in size")]
    RangeMismatch(String),

    #[error("Failed to parse API port specification '{0}': expected [HOST:]PORT")]
    ApiFormat(String),

    #[error("API port value '{0}' is not a number")]
    ApiNotANumber(String),

    #[error("API port value '{0}' out of range")]
    ApiOutOfRange(i64),
}

/// A single port or an inclusive port range
#[derive(Debug, Clone, Copy, PartialEq)]
struct PortRange {
    start: u16,
    end: u16,
}

impl PortRange {
    fn len(&self) -> u16 {
        self.end - self.start
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

fn parse_port_range(mapping: &str, s: &str) -> Result<PortRange, PortError> {
    let invalid = || PortError::InvalidPort {
        mapping: mapping.to_string(),
        port: s.to_string(),
    };
    let port = |p: &str| match p.parse::<u16>() {
        Ok(0) | Err(_) => Err(invalid()),
        Ok(n) => Ok(n),
    };

    let range = match s.split_once('-') {
        Some((start, end)) => PortRange {
            start: port(start)?,
            end: port(end)?,
        },
        None => {
            let p = port(s)?;
            PortRange { start: p, end: p }
        }
    };

    if range.end < range.start {
        return Err(invalid());
    }
    Ok(range)
}

/// Validate a port mapping `[HOST:][HOSTPORT:]CONTAINERPORT[/PROTOCOL]`
///
/// Returns the mapping rebuilt from its parsed parts: ports without leading
/// zeros, protocol lowercased and the default `tcp` left out.
pub fn validate_port_map(mapping: &str) -> Result<String, PortError> {
    let format = || PortError::Format(mapping.to_string());

    let (ports, protocol) = match mapping.split_once('/') {
        Some((ports, protocol)) => {
            let protocol = protocol.to_lowercase();
            if !matches!(protocol.as_str(), "tcp" | "udp" | "sctp") {
                return Err(PortError::InvalidProtocol {
                    mapping: mapping.to_string(),
                    protocol,
                });
            }
            (ports, Some(protocol))
        }
        None => (mapping, None),
    };

    let parts: Vec<&str> = ports.split(':').collect();
    let (host, host_port, container_port) = match parts.as_slice() {
        [container] => (None, None, *container),
        [host_port, container] => (None, Some(*host_port), *container),
        [host, host_port, container] => (Some(*host), Some(*host_port), *container),
        _ => return Err(format()),
    };

    if host.is_some_and(str::is_empty) {
        return Err(format());
    }
    // HOSTPORT may only be left empty when HOST is given
    if host.is_none() && host_port.is_some_and(str::is_empty) {
        return Err(format());
    }

    let container = parse_port_range(mapping, container_port)?;
    let host_range = match host_port.filter(|p| !p.is_empty()) {
        Some(hp) => {
            let hp = parse_port_range(mapping, hp)?;
            if hp.len() > 0 && container.len() > 0 && hp.len() != container.len() {
                return Err(PortError::RangeMismatch(mapping.to_string()));
            }
            Some(hp)
        }
        None => None,
    };

    let mut normalized = String::new();
    if let Some(host) = host {
        normalized.push_str(host);
        normalized.push(':');
    }
    if host_port.is_some() {
        if let Some(hp) = host_range {
            normalized.push_str(&hp.to_string());
        }
        normalized.push(':');
    }
    normalized.push_str(&container.to_string());
    if let Some(protocol) = protocol.filter(|p| p != "tcp") {
        normalized.push('/');
        normalized.push_str(&protocol);
    }
    Ok(normalized)
}

/// Parse an API port specification `[HOST:]PORT`
///
/// `PORT` may be `random` (or empty), leaving the choice to the lifecycle engine.
/// Only IP literals fill in the host IP; host names are resolved downstream.
pub fn parse_api_port(spec: &str) -> Result<ExposeApi, PortError> {
    let parts: Vec<&str> = spec.split(':').collect();

    let (host, port) = match parts.as_slice() {
        [port] => ("", *port),
        [host, port] => (*host, *port),
        _ => return Err(PortError::ApiFormat(spec.to_string())),
    };

    let host_ip = match host.parse::<IpAddr>() {
        Ok(ip) => ip.to_string(),
        Err(_) => String::new(),
    };

    let port = if port.is_empty() || port == "random" {
        ApiPort::Random
    } else {
        let value: i64 = port
            .parse()
            .map_err(|_| PortError::ApiNotANumber(port.to_string()))?;
        let value = u16::try_from(value).map_err(|_| PortError::ApiOutOfRange(value))?;
        ApiPort::Fixed(value)
    };

    Ok(ExposeApi {
        host: host.to_string(),
        host_ip,
        port,
    })
}
