//! Answer synthesis: grounding prompt plus one generation call

use std::sync::Arc;

use crate::error::Result;
use crate::processing::RetryPolicy;
use crate::providers::LlmProvider;

use super::prompt::PromptBuilder;

/// Builds the grounding prompt and returns the model output verbatim
pub struct AnswerSynthesizer {
    llm: Arc<dyn LlmProvider>,
    retry: RetryPolicy,
}

impl AnswerSynthesizer {
    pub fn new(llm: Arc<dyn LlmProvider>, retry: RetryPolicy) -> Self {
        Self { llm, retry }
    }

    /// Answer `question` from `context` with the given model and temperature
    pub async fn synthesize(
        &self,
        question: &str,
        context: &str,
        model: &str,
        temperature: f32,
    ) -> Result<String> {
        let prompt = PromptBuilder::build_rag_prompt(question, context);

        tracing::info!(
            "Generating answer with {} model {} (temperature {}, {} context chars)",
            self.llm.name(),
            model,
            temperature,
            context.len()
        );

        self.retry
            .run("generate", || self.llm.generate(&prompt, model, temperature))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingLlm {
        calls: Mutex<Vec<(String, String, f32)>>,
        failures_left: Mutex<u32>,
    }

    #[async_trait]
    impl LlmProvider for RecordingLlm {
        async fn generate(&self, prompt: &str, model: &str, temperature: f32) -> Result<String> {
            self.calls
                .lock()
                .push((prompt.to_string(), model.to_string(), temperature));
            let mut failures = self.failures_left.lock();
            if *failures > 0 {
                *failures -= 1;
                return Err(Error::llm("model loading"));
            }
            Ok("  It is blue.\n".to_string())
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    #[tokio::test]
    async fn test_output_is_verbatim_and_params_are_passed() {
        let llm = Arc::new(RecordingLlm::default());
        let synthesizer = AnswerSynthesizer::new(llm.clone(), RetryPolicy::default());

        let answer = synthesizer
            .synthesize("What color is the sky?", "The sky is blue.", "phi3", 0.7)
            .await
            .unwrap();
        assert_eq!(answer, "  It is blue.\n");

        let calls = llm.calls.lock();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].0.contains("Context: The sky is blue."));
        assert_eq!(calls[0].1, "phi3");
        assert_eq!(calls[0].2, 0.7);
    }

    #[tokio::test]
    async fn test_generation_is_retried() {
        let llm = Arc::new(RecordingLlm {
            failures_left: Mutex::new(1),
            ..RecordingLlm::default()
        });
        let retry = RetryPolicy::new(3, Duration::from_millis(1), Duration::from_secs(5));
        let synthesizer = AnswerSynthesizer::new(llm.clone(), retry);

        let answer = synthesizer.synthesize("q", "", "llama3.2", 0.1).await.unwrap();
        assert_eq!(answer, "  It is blue.\n");
        assert_eq!(llm.calls.lock().len(), 2);
    }
}
