use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use pdfconvert_core::{
    Config, ConversionEngine, LicenseStatus, ResiliencePolicy, SanitizedConfig, TargetFormat,
    UploadValidator,
};

/// Shared application state
pub struct AppState {
    config: Config,
    engine: Arc<dyn ConversionEngine>,
    validator: UploadValidator,
    /// One policy, and so one breaker, per conversion operation.
    policies: HashMap<TargetFormat, Arc<ResiliencePolicy>>,
    license: LicenseStatus,
}

impl AppState {
    pub fn new(config: Config, engine: Arc<dyn ConversionEngine>, license: LicenseStatus) -> Self {
        let timeout = Duration::from_millis(config.convert.timeout_ms);
        let policies = TargetFormat::ALL
            .iter()
            .map(|target| {
                let policy = ResiliencePolicy::new(
                    *target,
                    Arc::clone(&engine),
                    timeout,
                    config.circuit.clone(),
                );
                (*target, Arc::new(policy))
            })
            .collect();

        Self {
            validator: UploadValidator::new(config.convert.max_file_size),
            config,
            engine,
            policies,
            license,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn engine(&self) -> &dyn ConversionEngine {
        self.engine.as_ref()
    }

    pub fn validator(&self) -> &UploadValidator {
        &self.validator
    }

    pub fn policy(&self, target: TargetFormat) -> Option<Arc<ResiliencePolicy>> {
        self.policies.get(&target).cloned()
    }

    /// Policies in a stable order.
    pub fn policies(&self) -> Vec<Arc<ResiliencePolicy>> {
        TargetFormat::ALL
            .iter()
            .filter_map(|target| self.policy(*target))
            .collect()
    }

    pub fn license(&self) -> &LicenseStatus {
        &self.license
    }
}
