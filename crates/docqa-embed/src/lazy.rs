//! Lazily initialized, process-wide cross-encoder.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use docqa_core::{CrossEncoder, RagError, Result};

type Loader = Box<dyn Fn() -> Result<Arc<dyn CrossEncoder>> + Send + Sync>;

/// Cross-encoder that loads its model on the first scoring call.
///
/// Concurrent first calls wait on the same initialization, so the model is
/// loaded at most once. A failed load is reported as
/// [`RagError::ModelLoad`] and attempted again on the next call.
pub struct LazyCrossEncoder {
    name: String,
    loader: Loader,
    cell: OnceCell<Arc<dyn CrossEncoder>>,
}

impl LazyCrossEncoder {
    pub fn new<F>(name: impl Into<String>, loader: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn CrossEncoder>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            loader: Box::new(loader),
            cell: OnceCell::new(),
        }
    }

    /// Whether the model has been loaded.
    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }

    async fn get(&self) -> Result<&Arc<dyn CrossEncoder>> {
        self.cell
            .get_or_try_init(|| async {
                info!("Loading cross-encoder {}", self.name);
                (self.loader)().map_err(|e| match e {
                    RagError::ModelLoad { .. } => e,
                    other => RagError::model_load(&self.name, other.to_string()),
                })
            })
            .await
            .map_err(|e| {
                warn!("Cross-encoder {} unavailable: {}", self.name, e);
                e
            })
    }
}

#[async_trait]
impl CrossEncoder for LazyCrossEncoder {
    async fn score(&self, query: &str, passages: &[&str]) -> Result<Vec<f32>> {
        self.get().await?.score(query, passages).await
    }

    fn model_name(&self) -> &str {
        &self.name
    }
}
