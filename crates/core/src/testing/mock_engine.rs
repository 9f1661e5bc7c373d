//! Mock conversion engine for testing.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::convert::{ConversionOptions, TargetFormat};
use crate::engine::{ConversionEngine, EngineError};

/// Scripted behavior for a single `convert` call.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Return these bytes.
    Output(Vec<u8>),
    /// Fail with `EngineError::ConversionFailed`.
    Failure(String),
    /// Never complete.
    Hang,
    /// Panic inside the engine.
    Panic,
}

impl MockResponse {
    pub fn output(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Output(bytes.into())
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure(reason.into())
    }
}

/// A recorded `convert` call for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub target: TargetFormat,
    pub options: ConversionOptions,
    pub input_len: usize,
}

/// Mock implementation of the ConversionEngine trait.
///
/// Provides controllable behavior for testing:
/// - Queue per-call responses, falling back to a default response
/// - Record every call with its options
/// - Simulate engine latency
/// - Toggle readiness for health checks
///
/// # Example
///
/// ```rust,ignore
/// use pdfconvert_core::testing::{MockEngine, MockResponse};
///
/// let engine = MockEngine::new();
/// engine.push_responses([MockResponse::failure("corrupt xref"), MockResponse::Hang]).await;
///
/// let result = engine.convert(pdf, TargetFormat::Docx, &options).await;
/// assert_eq!(engine.call_count().await, 1);
/// ```
#[derive(Debug)]
pub struct MockEngine {
    /// Responses consumed in order by `convert`.
    queue: Arc<RwLock<VecDeque<MockResponse>>>,
    /// Used once the queue is empty.
    default_response: Arc<RwLock<MockResponse>>,
    /// Recorded calls.
    calls: Arc<RwLock<Vec<RecordedCall>>>,
    /// Simulated latency before each response.
    delay: Arc<RwLock<Option<Duration>>>,
    /// Whether `validate` succeeds.
    ready: Arc<RwLock<bool>>,
    /// License files passed to `install_license`.
    licenses: Arc<RwLock<Vec<PathBuf>>>,
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEngine {
    /// Create a mock engine that answers every call with a small DOCX stub.
    pub fn new() -> Self {
        Self {
            queue: Arc::new(RwLock::new(VecDeque::new())),
            default_response: Arc::new(RwLock::new(MockResponse::Output(
                b"PK\x03\x04mock-docx".to_vec(),
            ))),
            calls: Arc::new(RwLock::new(Vec::new())),
            delay: Arc::new(RwLock::new(None)),
            ready: Arc::new(RwLock::new(true)),
            licenses: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Create a mock engine whose every call fails.
    pub fn failing(reason: &str) -> Self {
        Self {
            default_response: Arc::new(RwLock::new(MockResponse::failure(reason))),
            ..Self::new()
        }
    }

    /// Queue responses for the next calls.
    pub async fn push_responses(&self, responses: impl IntoIterator<Item = MockResponse>) {
        self.queue.write().await.extend(responses);
    }

    /// Set the response used once the queue is drained.
    pub async fn set_default_response(&self, response: MockResponse) {
        *self.default_response.write().await = response;
    }

    /// Set the simulated latency of each call.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = Some(delay);
    }

    /// Control the result of `validate`.
    pub async fn set_ready(&self, ready: bool) {
        *self.ready.write().await = ready;
    }

    /// Get all recorded calls.
    pub async fn recorded_calls(&self) -> Vec<RecordedCall> {
        self.calls.read().await.clone()
    }

    /// Get the number of `convert` calls made.
    pub async fn call_count(&self) -> usize {
        self.calls.read().await.len()
    }

    /// Clear recorded calls.
    pub async fn clear_recorded(&self) {
        self.calls.write().await.clear();
    }

    /// License files installed so far.
    pub async fn installed_licenses(&self) -> Vec<PathBuf> {
        self.licenses.read().await.clone()
    }

    async fn next_response(&self) -> MockResponse {
        match self.queue.write().await.pop_front() {
            Some(response) => response,
            None => self.default_response.read().await.clone(),
        }
    }
}

#[async_trait]
impl ConversionEngine for MockEngine {
    fn name(&self) -> &str {
        "mock"
    }

    async fn convert(
        &self,
        input: Bytes,
        target: TargetFormat,
        options: &ConversionOptions,
    ) -> Result<Vec<u8>, EngineError> {
        self.calls.write().await.push(RecordedCall {
            target,
            options: options.clone(),
            input_len: input.len(),
        });
        let response = self.next_response().await;

        let delay = *self.delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match response {
            MockResponse::Output(bytes) => Ok(bytes),
            MockResponse::Failure(reason) => Err(EngineError::conversion_failed(reason, None)),
            MockResponse::Hang => std::future::pending().await,
            MockResponse::Panic => panic!("mock engine panicked"),
        }
    }

    async fn validate(&self) -> Result<(), EngineError> {
        if *self.ready.read().await {
            Ok(())
        } else {
            Err(EngineError::EngineNotFound {
                path: PathBuf::from("mock-engine"),
            })
        }
    }

    async fn install_license(&self, path: &Path) -> Result<(), EngineError> {
        if !path.exists() {
            return Err(EngineError::license(format!(
                "{} does not exist",
                path.display()
            )));
        }
        self.licenses.write().await.push(path.to_path_buf());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_queue_then_default() {
        let engine = MockEngine::new();
        engine
            .push_responses([MockResponse::failure("first"), MockResponse::output(b"second".to_vec())])
            .await;

        let opts = ConversionOptions::default();
        let input = Bytes::from_static(b"%PDF");
        assert!(engine.convert(input.clone(), TargetFormat::Docx, &opts).await.is_err());
        assert_eq!(
            engine.convert(input.clone(), TargetFormat::Docx, &opts).await.unwrap(),
            b"second"
        );
        assert!(engine.convert(input, TargetFormat::Doc, &opts).await.is_ok());

        let calls = engine.recorded_calls().await;
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[2].target, TargetFormat::Doc);
        assert_eq!(calls[0].input_len, 4);
    }

    #[tokio::test]
    async fn test_readiness_toggle() {
        let engine = MockEngine::new();
        assert!(engine.validate().await.is_ok());
        engine.set_ready(false).await;
        assert!(engine.validate().await.is_err());
    }

    #[tokio::test]
    async fn test_failing_engine() {
        let engine = MockEngine::failing("broken");
        let err = engine
            .convert(Bytes::new(), TargetFormat::Docx, &ConversionOptions::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("broken"));
    }
}
