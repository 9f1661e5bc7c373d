//! Trait definitions for the engine module.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::Path;

use super::error::EngineError;
use crate::convert::{ConversionOptions, TargetFormat};

/// The narrow capability interface to the external conversion engine.
///
/// Implementations may take arbitrarily long and may fail for any input; the
/// caller is responsible for bounding and guarding each call.
#[async_trait]
pub trait ConversionEngine: Send + Sync {
    /// Returns the name of this engine implementation.
    fn name(&self) -> &str;

    /// Converts a PDF document into the target format.
    async fn convert(
        &self,
        input: Bytes,
        target: TargetFormat,
        options: &ConversionOptions,
    ) -> Result<Vec<u8>, EngineError>;

    /// Checks that the engine is installed and able to run.
    async fn validate(&self) -> Result<(), EngineError>;

    /// Applies a license file. Engines without licensing accept any path.
    async fn install_license(&self, _path: &Path) -> Result<(), EngineError> {
        Ok(())
    }
}
