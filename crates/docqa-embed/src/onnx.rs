//! ONNX-based sentence embedding model.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ndarray::ArrayViewD;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::{Encoding, Tokenizer};
use tracing::{debug, info};

use docqa_core::{Embedder, RagError, Result};

/// Token budget for sentence-transformers style models.
const MAX_TOKENS: usize = 512;

/// Build an ONNX Runtime session, reporting failures as model load errors.
pub(crate) fn build_session(model_path: &Path, num_threads: usize, model: &str) -> Result<Session> {
    info!("Loading ONNX model from {:?}", model_path);

    Session::builder()
        .map_err(|e| RagError::model_load(model, format!("session builder: {}", e)))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| RagError::model_load(model, format!("optimization level: {}", e)))?
        .with_intra_threads(num_threads.max(1))
        .map_err(|e| RagError::model_load(model, format!("thread count: {}", e)))?
        .commit_from_file(model_path)
        .map_err(|e| RagError::model_load(model, format!("{}: {}", model_path.display(), e)))
}

/// Load a `tokenizer.json`, reporting failures as model load errors.
pub(crate) fn load_tokenizer(tokenizer_path: &Path, model: &str) -> Result<Tokenizer> {
    info!("Loading tokenizer from {:?}", tokenizer_path);

    Tokenizer::from_file(tokenizer_path).map_err(|e| {
        RagError::model_load(model, format!("{}: {}", tokenizer_path.display(), e))
    })
}

/// Padded `[batch, max_len]` model inputs for a batch of encodings.
pub(crate) struct BatchInputs {
    pub input_ids: Tensor<i64>,
    pub attention_mask: Tensor<i64>,
    pub token_type_ids: Tensor<i64>,

    /// Sequence length after padding and truncation.
    pub max_len: usize,
}

/// Build the three BERT-style input tensors, truncating to `max_tokens`.
pub(crate) fn batch_inputs(
    encodings: &[Encoding],
    max_tokens: usize,
    to_err: impl Fn(String) -> RagError,
) -> Result<BatchInputs> {
    let max_len = encodings
        .iter()
        .map(|e| e.get_ids().len())
        .max()
        .unwrap_or(0)
        .min(max_tokens);
    let shape = vec![encodings.len(), max_len];

    let tensor = |rows: Vec<i64>, what: &str| {
        Tensor::from_array((shape.clone(), rows))
            .map_err(|e| to_err(format!("Failed to create {} tensor: {}", what, e)))
    };

    Ok(BatchInputs {
        input_ids: tensor(pad_rows(encodings.iter().map(|e| e.get_ids()), max_len), "input")?,
        attention_mask: tensor(
            pad_rows(encodings.iter().map(|e| e.get_attention_mask()), max_len),
            "mask",
        )?,
        token_type_ids: tensor(
            pad_rows(encodings.iter().map(|e| e.get_type_ids()), max_len),
            "type",
        )?,
        max_len,
    })
}

/// Row-major `[rows, max_len]` buffer, zero padded, longer rows truncated.
pub(crate) fn pad_rows<'a>(
    rows: impl ExactSizeIterator<Item = &'a [u32]>,
    max_len: usize,
) -> Vec<i64> {
    let mut out = vec![0i64; rows.len() * max_len];
    for (i, row) in rows.enumerate() {
        for (j, &value) in row.iter().take(max_len).enumerate() {
            out[i * max_len + j] = value as i64;
        }
    }
    out
}

/// Model name for a model file: its directory name, or the file stem.
///
/// `models/all-MiniLM-L6-v2/model.onnx` is named `all-MiniLM-L6-v2`.
pub(crate) fn model_name_from_path(model_path: &Path) -> String {
    model_path
        .parent()
        .and_then(|p| p.file_name())
        .or_else(|| model_path.file_stem())
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "onnx".to_string())
}

/// L2 normalize a vector.
pub(crate) fn l2_normalize(mut v: Vec<f32>) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}

/// ONNX sentence embedder, e.g. all-MiniLM-L6-v2.
pub struct OnnxEmbedder {
    /// ONNX inference session (wrapped in Mutex for interior mutability).
    session: Mutex<Session>,

    /// Tokenizer for the model.
    tokenizer: Arc<Tokenizer>,

    /// Embedding dimension.
    dimension: usize,

    /// Maximum token count.
    max_tokens: usize,

    /// Name used for collection naming.
    model_name: String,
}

impl OnnxEmbedder {
    /// Load an embedder from model and tokenizer paths.
    pub fn new(
        model_path: impl AsRef<Path>,
        tokenizer_path: impl AsRef<Path>,
        dimension: usize,
        num_threads: usize,
    ) -> Result<Self> {
        let model_path = model_path.as_ref();
        let model_name = model_name_from_path(model_path);

        let session = build_session(model_path, num_threads, &model_name)?;
        let tokenizer = load_tokenizer(tokenizer_path.as_ref(), &model_name)?;

        info!(
            "Embedder {} initialized: dim={}, max_tokens={}",
            model_name, dimension, MAX_TOKENS
        );

        Ok(Self {
            session: Mutex::new(session),
            tokenizer: Arc::new(tokenizer),
            dimension,
            max_tokens: MAX_TOKENS,
            model_name,
        })
    }

    /// Embed a batch of texts.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| RagError::embedding(format!("Tokenization failed: {}", e)))?;

        let batch_size = encodings.len();
        let inputs = batch_inputs(&encodings, self.max_tokens, RagError::embedding)?;
        let max_len = inputs.max_len;

        debug!("Embedding batch: size={}, max_len={}", batch_size, max_len);

        let mut session = self
            .session
            .lock()
            .map_err(|e| RagError::embedding(format!("Failed to lock session: {}", e)))?;

        let outputs = session
            .run(ort::inputs![
                "input_ids" => inputs.input_ids,
                "attention_mask" => inputs.attention_mask,
                "token_type_ids" => inputs.token_type_ids
            ])
            .map_err(|e| RagError::embedding(format!("Inference failed: {}", e)))?;

        // Different exports name the hidden state output differently
        let (_, output) = outputs
            .iter()
            .next()
            .ok_or_else(|| RagError::embedding("No output tensor found"))?;

        let view = output
            .try_extract_array::<f32>()
            .map_err(|e| RagError::embedding(format!("Failed to extract tensor: {}", e)))?;

        let shape_dims: Vec<usize> = view.shape().to_vec();
        debug!("Output shape: {:?}", shape_dims);

        match shape_dims.len() {
            // (batch_size, seq_len, hidden_dim)
            3 => Ok(mean_pool(&view, &encodings, max_len)),
            // (batch_size, hidden_dim), already pooled
            2 => Ok((0..batch_size)
                .map(|i| l2_normalize((0..shape_dims[1]).map(|j| view[[i, j]]).collect()))
                .collect()),
            _ => Err(RagError::embedding(format!(
                "Unexpected output shape: {:?}",
                shape_dims
            ))),
        }
    }
}

/// Mean pooling over the sequence dimension with the attention mask.
fn mean_pool(
    tensor: &ArrayViewD<'_, f32>,
    encodings: &[tokenizers::Encoding],
    max_len: usize,
) -> Vec<Vec<f32>> {
    let shape = tensor.shape();
    let seq_len = shape[1];
    let hidden_dim = shape[2];

    encodings
        .iter()
        .enumerate()
        .map(|(i, encoding)| {
            let mask = encoding.get_attention_mask();
            let mut sum = vec![0.0f32; hidden_dim];
            let mut valid = 0usize;

            for (j, &m) in mask.iter().take(max_len.min(seq_len)).enumerate() {
                if m == 1 {
                    valid += 1;
                    for (k, s) in sum.iter_mut().enumerate() {
                        *s += tensor[[i, j, k]];
                    }
                }
            }

            if valid == 0 {
                return sum;
            }
            l2_normalize(sum.into_iter().map(|s| s / valid as f32).collect())
        })
        .collect()
}

#[async_trait]
impl Embedder for OnnxEmbedder {
    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.embed_batch(texts)
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text])?
            .into_iter()
            .next()
            .ok_or_else(|| RagError::embedding("No embedding returned"))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
