//! Construction of models from configuration.

use std::sync::Arc;

use tracing::info;

use docqa_core::{
    CrossEncoder, Embedder, EmbeddingBackend, EmbeddingConfig, RagError, Result, RerankerBackend,
};

use crate::cross_encoder::{OnnxCrossEncoder, TermOverlapScorer};
use crate::hashing::HashEmbedder;
use crate::lazy::LazyCrossEncoder;
use crate::onnx::{model_name_from_path, OnnxEmbedder};
use crate::openai::OpenAiEmbedder;

/// Environment variable read for the OpenAI key unless configured otherwise.
const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Build the configured embedder.
///
/// ONNX models are loaded immediately; a missing key for a hosted provider
/// is a configuration error.
pub fn build_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    build_embedder_with(config, |key| std::env::var(key).ok())
}

fn build_embedder_with<F>(config: &EmbeddingConfig, lookup: F) -> Result<Arc<dyn Embedder>>
where
    F: Fn(&str) -> Option<String>,
{
    let embedder: Arc<dyn Embedder> = match &config.backend {
        EmbeddingBackend::Onnx {
            model_path,
            tokenizer_path,
            dimension,
            num_threads,
        } => Arc::new(OnnxEmbedder::new(
            model_path,
            tokenizer_path,
            *dimension,
            *num_threads,
        )?),
        EmbeddingBackend::OpenAi {
            model,
            base_url,
            api_key_env,
            dimension,
        } => {
            let key_env = api_key_env.as_deref().unwrap_or(DEFAULT_API_KEY_ENV);
            let api_key = lookup(key_env).filter(|k| !k.is_empty()).ok_or_else(|| {
                RagError::config(format!("{} is not set; it is needed for {}", key_env, model))
            })?;

            let mut embedder = OpenAiEmbedder::new(api_key).with_model(model.clone());
            if let Some(url) = base_url {
                embedder = embedder.with_base_url(url.clone());
            }
            if let Some(dim) = dimension {
                embedder = embedder.with_dimension(*dim);
            }
            Arc::new(embedder)
        }
        EmbeddingBackend::Hashing { dimension } => Arc::new(HashEmbedder::new(*dimension)?),
    };

    info!("Using embedding model {}", embedder.model_name());
    Ok(embedder)
}

/// Build the configured cross-encoder.
///
/// ONNX cross-encoders are wrapped in a [`LazyCrossEncoder`], so this never
/// touches the model files; the first rerank does.
pub fn build_cross_encoder(backend: &RerankerBackend) -> Arc<dyn CrossEncoder> {
    match backend {
        RerankerBackend::Onnx {
            model_path,
            tokenizer_path,
            max_length,
            num_threads,
        } => {
            let name = model_name_from_path(model_path);
            let model_path = model_path.clone();
            let tokenizer_path = tokenizer_path.clone();
            let max_length = *max_length;
            let num_threads = *num_threads;

            Arc::new(LazyCrossEncoder::new(name, move || {
                let model =
                    OnnxCrossEncoder::new(&model_path, &tokenizer_path, max_length, num_threads)?;
                Ok(Arc::new(model) as Arc<dyn CrossEncoder>)
            }))
        }
        RerankerBackend::TermOverlap => Arc::new(TermOverlapScorer::new()),
    }
}
