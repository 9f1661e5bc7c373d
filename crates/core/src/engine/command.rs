//! Conversion engine driven through an external executable.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::config::EngineConfig;
use super::error::EngineError;
use super::traits::ConversionEngine;
use crate::convert::{ConversionOptions, TargetFormat};

/// Environment variable through which the installed license reaches the engine.
pub const LICENSE_ENV: &str = "PDFCONVERT_LICENSE";

/// Upper bound on the `--version` self-check.
const VALIDATE_TIMEOUT: Duration = Duration::from_secs(5);

/// Engine that runs one child process per conversion.
///
/// Invocation shape:
/// `<command> [extra_args..] --format <ext> --mode <mode> [--recognize-bullets <bool>]
/// [--relative-horizontal-proximity <f64>] <input.pdf> <output.ext>`
pub struct CommandEngine {
    config: EngineConfig,
    license: RwLock<Option<PathBuf>>,
}

impl CommandEngine {
    /// Creates a new command engine with the given configuration.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            license: RwLock::new(None),
        }
    }

    /// Creates an engine with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(EngineConfig::default())
    }

    /// Currently installed license file, if any.
    pub async fn license_path(&self) -> Option<PathBuf> {
        self.license.read().await.clone()
    }

    /// Builds the engine arguments for one conversion.
    fn build_args(
        &self,
        input_path: &Path,
        output_path: &Path,
        target: TargetFormat,
        options: &ConversionOptions,
    ) -> Vec<String> {
        let mut args = self.config.extra_args.clone();

        args.extend([
            "--format".to_string(),
            target.extension().to_string(),
            "--mode".to_string(),
            options.mode.as_str().to_string(),
        ]);

        if let Some(bullets) = options.recognize_bullets {
            args.extend(["--recognize-bullets".to_string(), bullets.to_string()]);
        }

        if let Some(proximity) = options.relative_horizontal_proximity {
            args.extend([
                "--relative-horizontal-proximity".to_string(),
                proximity.to_string(),
            ]);
        }

        args.push(input_path.to_string_lossy().to_string());
        args.push(output_path.to_string_lossy().to_string());
        args
    }

    /// Runs `<command> --version`, requiring a zero exit within `limit`.
    async fn validate_within(&self, limit: Duration) -> Result<(), EngineError> {
        let check = Command::new(&self.config.command)
            .args(&self.config.extra_args)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(limit, check)
            .await
            .map_err(|_| EngineError::Unavailable {
                reason: format!("version check did not finish within {} ms", limit.as_millis()),
            })?
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(EngineError::Unavailable {
                reason: format!(
                    "version check exited with code {:?}{}",
                    output.status.code(),
                    if stderr.is_empty() { String::new() } else { format!(": {}", stderr) }
                ),
            });
        }
        Ok(())
    }

    fn spawn_error(&self, e: std::io::Error) -> EngineError {
        if e.kind() == std::io::ErrorKind::NotFound {
            EngineError::EngineNotFound {
                path: self.config.command.clone(),
            }
        } else {
            EngineError::Io(e)
        }
    }
}

#[async_trait]
impl ConversionEngine for CommandEngine {
    fn name(&self) -> &str {
        "command"
    }

    async fn convert(
        &self,
        input: Bytes,
        target: TargetFormat,
        options: &ConversionOptions,
    ) -> Result<Vec<u8>, EngineError> {
        tokio::fs::create_dir_all(&self.config.temp_dir).await?;
        // Removed when dropped, including when the call is abandoned
        let work_dir = tempfile::Builder::new()
            .prefix("job-")
            .tempdir_in(&self.config.temp_dir)?;

        let input_path = work_dir.path().join("input.pdf");
        let output_path = work_dir
            .path()
            .join(format!("output.{}", target.extension()));
        tokio::fs::write(&input_path, &input).await?;

        let args = self.build_args(&input_path, &output_path, target, options);
        debug!(command = %self.config.command.display(), ?args, "Running conversion engine");

        let mut command = Command::new(&self.config.command);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(license) = self.license.read().await.as_ref() {
            command.env(LICENSE_ENV, license);
        }

        let started = Instant::now();
        let output = command.output().await.map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(EngineError::conversion_failed(
                format!("Engine exited with code: {:?}", output.status.code()),
                if stderr.is_empty() { None } else { Some(stderr) },
            ));
        }

        let converted = tokio::fs::read(&output_path)
            .await
            .map_err(|_| EngineError::conversion_failed("Output file not created", None))?;
        if converted.is_empty() {
            return Err(EngineError::EmptyOutput);
        }

        debug!(
            pair = %target,
            input_bytes = input.len(),
            output_bytes = converted.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Engine conversion finished"
        );
        Ok(converted)
    }

    async fn validate(&self) -> Result<(), EngineError> {
        self.validate_within(VALIDATE_TIMEOUT).await
    }

    async fn install_license(&self, path: &Path) -> Result<(), EngineError> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| EngineError::license(format!("{}: {}", path.display(), e)))?;
        if !metadata.is_file() {
            return Err(EngineError::license(format!(
                "{} is not a file",
                path.display()
            )));
        }

        *self.license.write().await = Some(path.to_path_buf());
        info!(path = %path.display(), "Engine license installed");
        Ok(())
    }
}
