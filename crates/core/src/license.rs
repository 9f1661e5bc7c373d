//! Engine license installation at startup.
//!
//! A missing or broken license never stops the service: the engine keeps
//! running in evaluation mode and the problem is logged.

use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::engine::ConversionEngine;

/// Result of the startup license step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LicenseStatus {
    Licensed { path: PathBuf },
    Evaluation,
}

impl LicenseStatus {
    pub fn is_licensed(&self) -> bool {
        matches!(self, Self::Licensed { .. })
    }
}

/// Installs the configured license into the engine, if any.
pub async fn load_license(engine: &dyn ConversionEngine, path: Option<&Path>) -> LicenseStatus {
    let Some(path) = path else {
        warn!("No engine license configured, running in evaluation mode");
        return LicenseStatus::Evaluation;
    };

    match engine.install_license(path).await {
        Ok(()) => {
            info!(path = %path.display(), engine = engine.name(), "Engine license loaded");
            LicenseStatus::Licensed {
                path: path.to_path_buf(),
            }
        }
        Err(e) => {
            error!(
                path = %path.display(),
                error = %e,
                "Failed to load engine license, running in evaluation mode"
            );
            LicenseStatus::Evaluation
        }
    }
}
