//! Resilience layer between the HTTP boundary and the conversion engine.
//!
//! A [`ResiliencePolicy`] composes three guarantees around every conversion:
//!
//! - a hard wall-clock timeout on the primary attempt
//! - a failure-ratio [`CircuitBreaker`] shared by all requests for the same
//!   conversion, which stops contacting a consistently failing engine
//! - a fallback attempt with reduced options when the primary attempt fails
//!
//! The fallback is scoped to the request, not gated by the breaker: a primary
//! failure is always followed by one degraded attempt, and the fallback never
//! changes breaker state. Only a breaker rejection skips it.
//!
//! # Example
//!
//! ```ignore
//! use pdfconvert_core::resilience::{CircuitConfig, ResiliencePolicy};
//!
//! let policy = ResiliencePolicy::new(
//!     TargetFormat::Docx,
//!     engine,
//!     Duration::from_secs(30),
//!     CircuitConfig::default(),
//! );
//!
//! match policy.execute(pdf_bytes, options).await {
//!     ConversionOutcome::Success(docx) => { /* ... */ }
//!     ConversionOutcome::CircuitOpen { retry_in } => { /* engine unhealthy */ }
//!     other => { /* terminal failure */ }
//! }
//! ```

mod breaker;
mod config;
mod policy;

pub use breaker::{
    CircuitBreaker, CircuitOpenError, CircuitSnapshot, CircuitState, Permit, Transition,
};
pub use config::CircuitConfig;
pub use policy::ResiliencePolicy;
