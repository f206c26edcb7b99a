//! Utility functions

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Build metadata reported by `--version`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    pub git_revision: String,
    pub build_time: String,
    pub profile: String,
}

pub fn version_info() -> VersionInfo {
    VersionInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_revision: option_env!("OPSCONSOLE_GIT_REVISION")
            .unwrap_or("unknown")
            .to_string(),
        build_time: option_env!("OPSCONSOLE_BUILD_TIME")
            .unwrap_or("unknown")
            .to_string(),
        profile: option_env!("OPSCONSOLE_BUILD_PROFILE")
            .unwrap_or("unknown")
            .to_string(),
    }
}

/// Fresh id for the `X-Request-ID` header
pub fn request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// SHA-256 of a JSON document's serialized form, hex encoded.
///
/// `serde_json` keeps object keys sorted, so equal documents digest equally.
pub fn content_digest(value: &Value) -> String {
    let digest = Sha256::digest(value.to_string().as_bytes());
    format!("{:x}", digest)
}
