pub mod config;
pub mod convert;
pub mod engine;
pub mod license;
pub mod metrics;
pub mod resilience;
pub mod testing;

pub use config::{
    load_config, load_config_from_env, load_config_from_str, validate_config, Config,
    ConfigError, ConvertConfig, LicenseConfig, SanitizedConfig, ServerConfig,
};
pub use convert::{
    output_file_name, parse_options, ConversionOptions, ConversionOutcome, ConversionRequest,
    RecognitionMode, TargetFormat, UploadValidator, ValidationError, PDF_MIME_TYPE,
};
pub use engine::{CommandEngine, ConversionEngine, EngineConfig, EngineError};
pub use license::{load_license, LicenseStatus};
pub use resilience::{CircuitConfig, CircuitSnapshot, CircuitState, ResiliencePolicy};
