//! The question answering service.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use tokio::sync::Mutex;
use tracing::info;

use docqa_chunk::{load_dir, load_path, ChunkConfig, RecursiveChunker, SourceDocument};
use docqa_core::{
    CrossEncoder, DocqaConfig, Embedder, Generator, IndexWriter, RagError, Result, VectorIndex,
};
use docqa_embed::{build_cross_encoder, build_embedder};
use docqa_generate::{build_generator, build_prompt};
use docqa_query::{Reranker, Retriever};
use docqa_store::SqliteStore;

use crate::ingest::{chunk_documents, summarize_sources};
use crate::params::{
    AskMetadata, AskRequest, AskResponse, HealthReport, IngestPayload,
    IngestReport, SearchHit, SearchRequest, SearchResponse, SourcesReport, RETRIEVAL_ENGINE,
};

/// Question answering over a persistent document index.
///
/// The index is opened on first use. Read operations never create it: until
/// something has been ingested they fail with [`RagError::UnavailableIndex`].
pub struct DocqaService {
    config: DocqaConfig,

    /// Shared by ingestion and query embedding.
    embedder: Arc<dyn Embedder>,

    scorer: Arc<dyn CrossEncoder>,

    generator: Arc<dyn Generator>,

    chunker: RecursiveChunker,

    /// Opened index, if any.
    store: Mutex<Option<Arc<SqliteStore>>>,
}

impl DocqaService {
    /// Build every collaborator from configuration.
    pub fn open(config: DocqaConfig) -> Result<Self> {
        info!("Initializing docqa with index at {:?}", config.store.path);

        let embedder = build_embedder(&config.embedding)?;
        let scorer = build_cross_encoder(&config.reranker);
        let generator = build_generator(&config.generation)?;

        Ok(Self::with_components(config, embedder, scorer, generator))
    }

    /// Assemble a service from explicit collaborators.
    pub fn with_components(
        config: DocqaConfig,
        embedder: Arc<dyn Embedder>,
        scorer: Arc<dyn CrossEncoder>,
        generator: Arc<dyn Generator>,
    ) -> Self {
        Self {
            config,
            embedder,
            scorer,
            generator,
            chunker: RecursiveChunker::new(),
            store: Mutex::new(None),
        }
    }

    /// Use an already opened store instead of the configured path.
    pub fn with_store(self, store: SqliteStore) -> Self {
        Self {
            store: Mutex::new(Some(Arc::new(store))),
            ..self
        }
    }

    pub fn config(&self) -> &DocqaConfig {
        &self.config
    }

    /// The index, opening it if needed. Only ingestion passes `create`.
    async fn index(&self, create: bool) -> Result<Arc<SqliteStore>> {
        let mut slot = self.store.lock().await;
        if let Some(store) = slot.as_ref() {
            return Ok(store.clone());
        }

        let path = &self.config.store.path;
        let store = if create {
            SqliteStore::open(path, self.embedder.clone())?
        } else {
            SqliteStore::open_existing(path, self.embedder.clone())?
        };
        let store = Arc::new(store.with_batch_size(self.config.embedding.batch_size));

        *slot = Some(store.clone());
        Ok(store)
    }

    fn retriever(&self, index: Arc<SqliteStore>) -> Retriever {
        Retriever::new(index, Reranker::new(self.scorer.clone()))
            .with_config(self.config.retrieval.clone())
    }

    /// Answer a question from the indexed documents.
    pub async fn ask(&self, request: AskRequest) -> Result<AskResponse> {
        let request = request.resolve(&self.config)?;
        let start = Instant::now();

        let index = self.index(false).await?;
        let retrieval = self
            .retriever(index)
            .retrieve(&request.question, request.top_k)
            .await?;

        let prompt = build_prompt(&request.question, retrieval.iter().map(|hit| &hit.chunk));
        let answer = self.generator.generate(&prompt, request.options).await?;

        let latency_ms = start.elapsed().as_millis() as u64;
        info!(
            "Answered with {} passages in {}ms",
            retrieval.len(),
            latency_ms
        );

        Ok(AskResponse {
            context_sources: retrieval.context_sources(),
            answer,
            metadata: AskMetadata {
                model: self.generator.model_name().to_string(),
                retrieval_engine: RETRIEVAL_ENGINE.to_string(),
                timestamp_ms: now_ms(),
                latency_ms,
                top_k: request.top_k,
                avg_similarity: round3(retrieval.average_score()),
                provider: self.generator.provider().to_string(),
            },
            question: request.question,
        })
    }

    /// Retrieval only: the best passages for a query with their scores.
    pub async fn search(&self, request: SearchRequest) -> Result<SearchResponse> {
        let top_k = request.resolve_top_k(&self.config)?;

        let index = self.index(false).await?;
        let retrieval = self
            .retriever(index)
            .retrieve(&request.query, top_k)
            .await?;

        let hits = retrieval
            .iter()
            .enumerate()
            .map(|(i, hit)| SearchHit {
                rank: i + 1,
                source: hit.chunk.source_label(),
                score: hit.score,
                content: hit.chunk.content.clone(),
            })
            .collect();

        Ok(SearchResponse {
            query: retrieval.query,
            hits,
            latency_ms: retrieval.latency_ms,
        })
    }

    /// Index files and directories. Directories are read one level deep.
    pub async fn ingest_paths(&self, paths: &[PathBuf]) -> Result<IngestReport> {
        let origin = paths
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");

        let mut documents = Vec::new();
        for path in paths {
            if path.is_dir() {
                documents.extend(load_dir(path)?);
            } else {
                documents.push(load_path(path)?);
            }
        }

        let config = self.config.chunking.to_chunk_config();
        self.index_documents(&documents, &config, &origin).await
    }

    /// Index uploaded `{filename, text}` documents.
    pub async fn ingest_payload(&self, payload: IngestPayload) -> Result<IngestReport> {
        let documents: Vec<SourceDocument> = payload
            .files
            .iter()
            .map(|f| SourceDocument::from_text(f.filename.clone(), &f.text))
            .collect();

        let mut config = self.config.chunking.to_chunk_config();
        if let Some(options) = &payload.options {
            if let Some(size) = options.chunk_size {
                config.chunk_size = size;
            }
            if let Some(overlap) = options.chunk_overlap {
                config.chunk_overlap = overlap;
            }
        }

        self.index_documents(&documents, &config, "payload").await
    }

    async fn index_documents(
        &self,
        documents: &[SourceDocument],
        config: &ChunkConfig,
        origin: &str,
    ) -> Result<IngestReport> {
        let chunks = chunk_documents(documents, &self.chunker, config)?;
        if chunks.is_empty() {
            return Err(RagError::load_failed(
                origin,
                "no chunks could be created; files may be empty or unreadable",
            ));
        }

        let index = self.index(true).await?;
        let written = index.add_chunks(&chunks).await?;

        info!(
            "Indexed {} chunks from {} files ({} new)",
            chunks.len(),
            documents.len(),
            written
        );

        Ok(IngestReport {
            status: "ok".to_string(),
            indexed_files: summarize_sources(&chunks),
            vector_store: RETRIEVAL_ENGINE.to_string(),
            total_chunks: chunks.len() as u64,
            new_chunks: written as u64,
        })
    }

    /// Chunk counts per indexed file. Empty when nothing has been indexed.
    pub async fn sources(&self) -> Result<SourcesReport> {
        let documents = match self.index(false).await {
            Ok(index) => index.sources().await?,
            Err(e) if e.is_unavailable() => Vec::new(),
            Err(e) => return Err(e),
        };

        Ok(SourcesReport {
            total_chunks: documents.iter().map(|d| d.chunks).sum(),
            documents,
            vector_store: RETRIEVAL_ENGINE.to_string(),
        })
    }

    pub async fn health(&self) -> HealthReport {
        HealthReport {
            status: "ok".to_string(),
            vector_index_ready: self.index(false).await.is_ok(),
            provider: self.generator.provider().to_string(),
            model: self.generator.model_name().to_string(),
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn round3(value: f32) -> f64 {
    (f64::from(value) * 1000.0).round() / 1000.0
}
