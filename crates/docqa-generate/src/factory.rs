use std::sync::Arc;

use tracing::info;

use docqa_core::{GenerationConfig, GenerationProvider, Generator, RagError, Result};

use crate::gemini::GeminiGenerator;
use crate::ollama::OllamaGenerator;
use crate::openai::OpenAiGenerator;

/// Build the configured generator, reading API keys from the environment.
pub fn build_generator(config: &GenerationConfig) -> Result<Arc<dyn Generator>> {
    build_generator_with(config, |key| std::env::var(key).ok())
}

fn default_key_env(provider: GenerationProvider) -> Option<&'static str> {
    match provider {
        GenerationProvider::OpenAi => Some("OPENAI_API_KEY"),
        GenerationProvider::Gemini => Some("GOOGLE_API_KEY"),
        GenerationProvider::Ollama => None,
    }
}

fn build_generator_with<F>(config: &GenerationConfig, lookup: F) -> Result<Arc<dyn Generator>>
where
    F: Fn(&str) -> Option<String>,
{
    let key_env = config
        .api_key_env
        .as_deref()
        .or_else(|| default_key_env(config.provider));

    let api_key = match (config.provider, key_env) {
        (GenerationProvider::Ollama, _) | (_, None) => String::new(),
        (provider, Some(var)) => lookup(var).filter(|k| !k.is_empty()).ok_or_else(|| {
            RagError::config(format!("{} is not set; it is needed for {}", var, provider))
        })?,
    };

    let generator: Arc<dyn Generator> = match config.provider {
        GenerationProvider::OpenAi => {
            let mut generator = OpenAiGenerator::new(api_key, config.model.clone());
            if let Some(url) = &config.base_url {
                generator = generator.with_base_url(url.clone());
            }
            Arc::new(generator)
        }
        GenerationProvider::Gemini => {
            let mut generator = GeminiGenerator::new(api_key, config.model.clone());
            if let Some(url) = &config.base_url {
                generator = generator.with_base_url(url.clone());
            }
            Arc::new(generator)
        }
        GenerationProvider::Ollama => {
            let mut generator = OllamaGenerator::new(config.model.clone());
            if let Some(url) = &config.base_url {
                generator = generator.with_base_url(url.clone());
            }
            Arc::new(generator)
        }
    };

    info!(
        "Using {} model {}",
        generator.provider(),
        generator.model_name()
    );
    Ok(generator)
}
