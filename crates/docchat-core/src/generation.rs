//! Text-generation provider trait and the answer synthesizer.
//!
//! Concrete providers (OpenAI-compatible chat completions, Ollama) live in
//! the `docchat` app crate.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{RagError, Result};

/// A service that completes a prompt into text.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"gpt-4o-mini"`).
    fn model_name(&self) -> &str;

    /// Generate a completion for `prompt` at the given sampling temperature.
    ///
    /// # Errors
    ///
    /// [`RagError::GenerationService`] when the service is unreachable,
    /// rejects the request (auth, quota), or returns malformed output.
    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String>;
}

/// Turns an assembled prompt into an answer at a fixed temperature.
///
/// Failures are returned as-is; nothing is retried.
#[derive(Clone)]
pub struct AnswerSynthesizer {
    provider: Arc<dyn GenerationProvider>,
    temperature: f32,
}

impl std::fmt::Debug for AnswerSynthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnswerSynthesizer")
            .field("model", &self.provider.model_name())
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl AnswerSynthesizer {
    pub const DEFAULT_TEMPERATURE: f32 = 0.7;

    pub fn new(provider: Arc<dyn GenerationProvider>, temperature: f32) -> Result<Self> {
        if !(0.0..=2.0).contains(&temperature) {
            return Err(RagError::Configuration(format!(
                "generation.temperature must be in [0.0, 2.0], got {}",
                temperature
            )));
        }
        Ok(Self {
            provider,
            temperature,
        })
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    /// Generate the answer for `prompt`, trimmed of surrounding whitespace.
    pub async fn synthesize(&self, prompt: &str) -> Result<String> {
        let text = self.provider.generate(prompt, self.temperature).await?;
        Ok(text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Echo {
        seen: Mutex<Vec<(String, f32)>>,
        fail: bool,
    }

    #[async_trait]
    impl GenerationProvider for Echo {
        fn model_name(&self) -> &str {
            "echo"
        }
        async fn generate(&self, prompt: &str, temperature: f32) -> Result<String> {
            self.seen.lock().unwrap().push((prompt.to_string(), temperature));
            if self.fail {
                return Err(RagError::GenerationService("quota exceeded".into()));
            }
            Ok(format!("  answer to {prompt}\n\n"))
        }
    }

    fn echo(fail: bool) -> Arc<Echo> {
        Arc::new(Echo {
            seen: Mutex::new(Vec::new()),
            fail,
        })
    }

    #[tokio::test]
    async fn passes_temperature_and_trims() {
        let provider = echo(false);
        let synth = AnswerSynthesizer::new(provider.clone(), 0.7).unwrap();
        let answer = synth.synthesize("p").await.unwrap();
        assert_eq!(answer, "answer to p");
        assert_eq!(*provider.seen.lock().unwrap(), vec![("p".to_string(), 0.7)]);
    }

    #[tokio::test]
    async fn failure_surfaces_without_retry() {
        let provider = echo(true);
        let synth = AnswerSynthesizer::new(provider.clone(), 0.2).unwrap();
        let err = synth.synthesize("p").await.unwrap_err();
        assert!(matches!(err, RagError::GenerationService(_)));
        assert_eq!(provider.seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn rejects_out_of_range_temperature() {
        assert!(AnswerSynthesizer::new(echo(false), 2.5).is_err());
        assert!(AnswerSynthesizer::new(echo(false), -0.1).is_err());
    }
}
