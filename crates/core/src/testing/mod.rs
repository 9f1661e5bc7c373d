//! Testing utilities and mock implementations.
//!
//! This module provides a scriptable [`MockEngine`] so the resilience layer
//! and the HTTP surface can be exercised without a real conversion engine.
//!
//! # Example
//!
//! ```rust,ignore
//! use pdfconvert_core::testing::{MockEngine, MockResponse};
//!
//! let engine = Arc::new(MockEngine::new());
//! engine.push_responses([MockResponse::Hang]).await;
//!
//! // Use in AppState...
//! ```

mod mock_engine;

pub use mock_engine::{MockEngine, MockResponse, RecordedCall};

/// Test fixtures and helper functions.
pub mod fixtures {
    /// Minimal bytes that look like a PDF document.
    pub fn pdf_bytes() -> Vec<u8> {
        b"%PDF-1.7\n1 0 obj\n<< /Type /Catalog >>\nendobj\ntrailer\n%%EOF\n".to_vec()
    }

    /// A PDF-looking payload padded to exactly `len` bytes.
    pub fn pdf_of_size(len: usize) -> Vec<u8> {
        let mut bytes = pdf_bytes();
        bytes.resize(len, b' ');
        bytes
    }
}
