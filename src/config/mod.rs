pub mod validation;

pub use validation::{
    parse_duration, validate_options, CreateOptions, KubeconfigOpts, ValidationError,
};

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default options file location: ~/.k3dforge/config.yaml
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".k3dforge")
        .join("config.yaml")
}

/// Errors for option file handling
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse options: {0}")]
    ParseError(String),
}

/// Format of an options file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionsFormat {
    Yaml,
    Json,
}

impl OptionsFormat {
    /// Pick the format from the file extension, YAML unless it is `.json`
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => OptionsFormat::Json,
            _ => OptionsFormat::Yaml,
        }
    }
}

/// Cluster create options as given by the user, before validation
///
/// Unset fields stay `None` so that "not given" and "given as zero" can be
/// told apart (`timeout` relies on this).
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RawCreateOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub masters: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workers: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// `[HOST:]PORT` or `random`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_port: Option<String>,

    /// `[SRC:]DEST[:MODE][@NODEFILTER[;NODEFILTER...]]`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<String>,

    /// `[HOST:][HOSTPORT:]CONTAINERPORT[/PROTOCOL][@NODEFILTER]`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait: Option<bool>,

    /// Go-style duration, e.g. `90s` or `1m30s`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_kubeconfig: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub switch_context: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_lb: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_image_volume: Option<bool>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub k3s_server_args: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub k3s_agent_args: Vec<String>,
}

impl RawCreateOptions {
    /// Layer `overrides` on top of `self`
    ///
    /// Scalar values from `overrides` win; list values are appended.
    pub fn merge(self, overrides: RawCreateOptions) -> RawCreateOptions {
        fn append(mut base: Vec<String>, more: Vec<String>) -> Vec<String> {
            base.extend(more);
            base
        }

        RawCreateOptions {
            name: overrides.name.or(self.name),
            image: overrides.image.or(self.image),
            masters: overrides.masters.or(self.masters),
            workers: overrides.workers.or(self.workers),
            network: overrides.network.or(self.network),
            token: overrides.token.or(self.token),
            api_port: overrides.api_port.or(self.api_port),
            volumes: append(self.volumes, overrides.volumes),
            ports: append(self.ports, overrides.ports),
            wait: overrides.wait.or(self.wait),
            timeout: overrides.timeout.or(self.timeout),
            update_kubeconfig: overrides.update_kubeconfig.or(self.update_kubeconfig),
            switch_context: overrides.switch_context.or(self.switch_context),
            no_lb: overrides.no_lb.or(self.no_lb),
            no_image_volume: overrides.no_image_volume.or(self.no_image_volume),
            k3s_server_args: append(self.k3s_server_args, overrides.k3s_server_args),
            k3s_agent_args: append(self.k3s_agent_args, overrides.k3s_agent_args),
        }
    }
}

/// Parse an options document.
/// This is a pure function - no I/O.
pub fn parse_options(content: &str, format: OptionsFormat) -> Result<RawCreateOptions, ConfigError> {
    match format {
        OptionsFormat::Yaml => {
            if content.trim().is_empty() {
                return Ok(RawCreateOptions::default());
            }
            serde_yaml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
        }
        OptionsFormat::Json => {
            serde_json::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
        }
    }
}

/// Load an options file from disk.
/// This is the I/O boundary - it reads the file and delegates to `parse_options`.
pub fn load_options_file(path: &Path) -> Result<RawCreateOptions, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_options(&content, OptionsFormat::from_path(path))
}
