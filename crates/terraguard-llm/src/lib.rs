//! Generation backend: the [`TextGenerator`] seam and its Ollama implementation.
//!
//! The backend is an opaque oracle: prompt in, free text out. Nothing here
//! interprets the text; salvaging structure out of it is the caller's job.

mod error;
pub use error::LlmError;

#[cfg(feature = "http")]
pub mod ollama;

#[cfg(feature = "http")]
pub use ollama::OllamaClient;

use async_trait::async_trait;

/// A non-deterministic text generation backend.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Liveness check, issued once before any generation call.
    async fn probe(&self) -> Result<(), LlmError>;

    /// Run one completion and return the raw model text.
    async fn generate(&self, prompt: &str, temperature: f64) -> Result<String, LlmError>;

    /// Model identifier, for logging.
    fn model(&self) -> &str;
}
