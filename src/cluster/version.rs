//! k3s version resolution for the `latest` image alias

use super::{DEFAULT_K3S_IMAGE_REPO, K3S_VERSION};

/// Resolves the newest k3s release tag
pub trait VersionResolver {
    fn resolve_latest(&self) -> String;
}

/// Offline resolver: the k3s version this build was pinned to
#[derive(Debug, Clone, Copy, Default)]
pub struct PinnedVersion;

impl VersionResolver for PinnedVersion {
    fn resolve_latest(&self) -> String {
        K3S_VERSION.to_string()
    }
}

/// Full image reference for a k3s version tag
pub fn k3s_image(version: &str) -> String {
    format!("{}:{}", DEFAULT_K3S_IMAGE_REPO, version)
}

/// Default image used when `--image` is not given
pub fn default_image() -> String {
    k3s_image(K3S_VERSION)
}
