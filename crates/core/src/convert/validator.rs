//! Upload admission checks run before any bytes reach the conversion path.

use thiserror::Error;

use super::types::PDF_MIME_TYPE;

/// Why an upload was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("File size exceeds maximum allowed ({} MB)", .max / (1024 * 1024))]
    TooLarge { size: u64, max: u64 },

    #[error("Only PDF files are supported")]
    WrongType { content_type: Option<String> },

    #[error("No file provided")]
    MissingFile,
}

/// Size and content-type predicate for incoming uploads.
#[derive(Debug, Clone, Copy)]
pub struct UploadValidator {
    max_file_size: u64,
}

impl UploadValidator {
    pub fn new(max_file_size: u64) -> Self {
        Self { max_file_size }
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// Checks declared length then declared content type.
    pub fn validate(&self, len: u64, content_type: Option<&str>) -> Result<(), ValidationError> {
        self.check_size(len)?;
        self.check_content_type(content_type)
    }

    pub fn check_size(&self, len: u64) -> Result<(), ValidationError> {
        if len > self.max_file_size {
            return Err(ValidationError::TooLarge {
                size: len,
                max: self.max_file_size,
            });
        }
        Ok(())
    }

    /// Exact, case-insensitive match on `application/pdf`.
    pub fn check_content_type(&self, content_type: Option<&str>) -> Result<(), ValidationError> {
        match content_type {
            Some(ct) if ct.eq_ignore_ascii_case(PDF_MIME_TYPE) => Ok(()),
            other => Err(ValidationError::WrongType {
                content_type: other.map(str::to_string),
            }),
        }
    }
}
