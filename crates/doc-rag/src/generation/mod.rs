//! Answer generation: Ollama client, grounding prompt and synthesis

pub mod ollama;
pub mod prompt;
pub mod synthesizer;

pub use ollama::OllamaClient;
pub use prompt::PromptBuilder;
pub use synthesizer::AnswerSynthesizer;
