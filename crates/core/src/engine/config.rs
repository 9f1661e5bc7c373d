//! Configuration for the external conversion engine.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the command-line conversion engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Path to the engine executable.
    #[serde(default = "default_command")]
    pub command: PathBuf,

    /// Arguments placed before the generated ones on every invocation.
    #[serde(default)]
    pub extra_args: Vec<String>,

    /// Directory for per-job working directories.
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,
}

fn default_command() -> PathBuf {
    PathBuf::from("pdfconvert-engine")
}

fn default_temp_dir() -> PathBuf {
    std::env::temp_dir().join("pdfconvert")
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
            extra_args: Vec::new(),
            temp_dir: default_temp_dir(),
        }
    }
}

impl EngineConfig {
    pub fn with_command(command: PathBuf) -> Self {
        Self {
            command,
            ..Default::default()
        }
    }

    pub fn with_temp_dir(mut self, temp_dir: PathBuf) -> Self {
        self.temp_dir = temp_dir;
        self
    }

    pub fn with_extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }
}
