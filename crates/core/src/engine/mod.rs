//! Interface to the external conversion engine.
//!
//! The engine is an opaque collaborator: given document bytes, a target
//! format and recognition options it returns converted bytes or fails. Nothing
//! in this module bounds latency or tracks failures; that is the job of
//! [`ResiliencePolicy`](crate::resilience::ResiliencePolicy).
//!
//! # Example
//!
//! ```ignore
//! use pdfconvert_core::engine::{CommandEngine, ConversionEngine, EngineConfig};
//!
//! let engine = CommandEngine::new(EngineConfig::default());
//! engine.validate().await?;
//!
//! let docx = engine
//!     .convert(pdf_bytes, TargetFormat::Docx, &ConversionOptions::default())
//!     .await?;
//! ```

mod command;
mod config;
mod error;
mod traits;

pub use command::{CommandEngine, LICENSE_ENV};
pub use config::EngineConfig;
pub use error::EngineError;
pub use traits::ConversionEngine;
