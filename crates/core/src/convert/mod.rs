//! Conversion request model, option parsing and upload validation.
//!
//! These are the request-scoped pieces that run before a document is handed
//! to the [`ResiliencePolicy`](crate::resilience::ResiliencePolicy):
//!
//! - [`UploadValidator`] refuses oversized or non-PDF uploads
//! - [`parse_options`] turns the raw options blob into [`ConversionOptions`]
//! - [`ConversionRequest::output_file_name`] names the converted file

mod options;
mod types;
mod validator;

pub use options::parse_options;
pub use types::{
    output_file_name, ConversionOptions, ConversionOutcome, ConversionRequest, RecognitionMode,
    TargetFormat, PDF_MIME_TYPE,
};
pub use validator::{UploadValidator, ValidationError};
