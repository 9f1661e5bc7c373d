use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::engine::EngineConfig;
use crate::resilience::CircuitConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub convert: ConvertConfig,
    #[serde(default)]
    pub circuit: CircuitConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub license: LicenseConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Upload limits, timeout and default options for the conversion endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConvertConfig {
    /// Largest accepted upload in bytes (default: 10 MiB).
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Wall-clock bound for a primary conversion attempt, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Options blob applied when a request carries no `options` field.
    #[serde(default = "default_options")]
    pub default_options: String,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            timeout_ms: default_timeout_ms(),
            default_options: default_options(),
        }
    }
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_options() -> String {
    "{}".to_string()
}

/// Engine license configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LicenseConfig {
    /// Path to the engine license file. Evaluation mode when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Sanitized config for API responses (license location redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub convert: ConvertConfig,
    pub circuit: CircuitConfig,
    pub engine: SanitizedEngineConfig,
    pub license_configured: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedEngineConfig {
    pub command: String,
    pub extra_args: usize,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            convert: config.convert.clone(),
            circuit: config.circuit.clone(),
            engine: SanitizedEngineConfig {
                command: config.engine.command.display().to_string(),
                extra_args: config.engine.extra_args.len(),
            },
            license_configured: config.license.path.is_some(),
        }
    }
}
