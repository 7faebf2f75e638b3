//! docqa-generate - grounded answer generation
//!
//! [`build_prompt`] turns retrieved chunks into a context block with source
//! references and a grounding instruction. The resulting prompt is sent to a
//! [`Generator`] backed by OpenAI, Gemini or a local Ollama server.

mod factory;
mod gemini;
mod http;
mod ollama;
mod openai;
mod prompt;

pub use factory::build_generator;
pub use gemini::GeminiGenerator;
pub use ollama::OllamaGenerator;
pub use openai::OpenAiGenerator;
pub use prompt::{build_prompt, CONTEXT_SEPARATOR, MAX_CONTEXT_CHARS, SYSTEM_INSTRUCTION};

pub use docqa_core::{GenerationOptions, Generator};
