//! SQLite-based vector index implementation.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use rusqlite::{params, Connection, OpenFlags};
use tracing::{debug, info};
use ulid::Ulid;

use docqa_core::{
    Chunk, ChunkMetadata, Embedder, IndexWriter, MmrParams, RagError, Result, SourceSummary,
    VectorIndex,
};

use crate::mmr::mmr_select;
use crate::schema::{SCHEMA, SCHEMA_VERSION};

/// Default number of chunks embedded per request during ingestion.
const DEFAULT_BATCH_SIZE: usize = 32;

/// Collection name for an embedding model.
///
/// `docs_` followed by the model name, with every run of characters outside
/// `[A-Za-z0-9_]` collapsed to a single `_`. Indexes built with different
/// embedding models never share a collection.
pub fn collection_name(model: &str) -> String {
    let mut name = String::from("docs_");
    let mut in_run = false;
    for c in model.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            name.push(c);
            in_run = false;
        } else if !in_run {
            name.push('_');
            in_run = true;
        }
    }
    name
}

/// SQLite-backed vector index.
///
/// Uses a blocking Mutex around a single connection. Every chunk row carries
/// its embedding, so MMR search is computed in process over the collection.
pub struct SqliteStore {
    /// Connection wrapped in blocking Mutex.
    conn: Arc<Mutex<Connection>>,

    /// Embedder used for both documents and queries.
    embedder: Arc<dyn Embedder>,

    /// Collection derived from the embedder's model name.
    collection: String,

    /// Chunks embedded per request when adding.
    batch_size: usize,
}

/// A stored chunk together with its embedding.
struct StoredChunk {
    chunk: Chunk,
    embedding: Vec<f32>,
}

impl SqliteStore {
    /// Open or create an index at the given path.
    pub fn open(path: impl AsRef<Path>, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let path = path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| RagError::database(format!("Failed to open database: {}", e)))?;

        Self::init(conn, embedder, path)
    }

    /// Open an index that must already exist.
    ///
    /// A missing file is reported as [`RagError::UnavailableIndex`] so callers
    /// can tell "nothing ingested yet" apart from an empty search result.
    pub fn open_existing(path: impl AsRef<Path>, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(RagError::unavailable_index(format!(
                "no index at {}",
                path.display()
            )));
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| {
            RagError::unavailable_index(format!("cannot open {}: {}", path.display(), e))
        })?;

        Self::init(conn, embedder, path)
    }

    /// Open an in-memory index (for testing).
    pub fn open_memory(embedder: Arc<dyn Embedder>) -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| RagError::database(format!("Failed to open in-memory database: {}", e)))?;

        Self::init(conn, embedder, Path::new(":memory:"))
    }

    /// Initialize the store with a connection.
    fn init(conn: Connection, embedder: Arc<dyn Embedder>, path: &Path) -> Result<Self> {
        Self::configure_connection(&conn)?;

        conn.execute_batch(SCHEMA)
            .map_err(|e| RagError::database(format!("Failed to initialize schema: {}", e)))?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)
            .map_err(|e| RagError::database(e.to_string()))?;

        let collection = collection_name(embedder.model_name());
        info!("Index opened at {:?} (collection {})", path, collection);

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            embedder,
            collection,
            batch_size: DEFAULT_BATCH_SIZE,
        })
    }

    /// Set how many chunks are embedded per request.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Configure SQLite connection for optimal performance.
    fn configure_connection(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA cache_size = -64000;
            PRAGMA busy_timeout = 30000;
            PRAGMA temp_store = MEMORY;
            "#,
        )
        .map_err(|e| RagError::database(format!("Failed to configure connection: {}", e)))?;

        Ok(())
    }

    /// Collection this store reads and writes.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Name of the embedding model behind this index.
    pub fn embedding_model(&self) -> &str {
        self.embedder.model_name()
    }

    /// Execute a blocking operation on the connection.
    fn with_conn<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&Connection) -> Result<R>,
    {
        let conn = self.conn.lock().map_err(|e| RagError::database(e.to_string()))?;
        f(&conn)
    }

    /// Load every chunk of the collection in insertion order.
    fn load_chunks(&self, with_embeddings: bool) -> Result<Vec<StoredChunk>> {
        let collection = self.collection.clone();
        let rows = self.with_conn(|conn| {
            let sql = if with_embeddings {
                "SELECT content, metadata, embedding FROM chunks WHERE collection = ?1 ORDER BY rowid"
            } else {
                "SELECT content, metadata, NULL FROM chunks WHERE collection = ?1 ORDER BY rowid"
            };
            let mut stmt = conn
                .prepare(sql)
                .map_err(|e| RagError::database(e.to_string()))?;

            let rows = stmt
                .query_map(params![collection], |row| {
                    let content: String = row.get(0)?;
                    let metadata: String = row.get(1)?;
                    let embedding: Option<Vec<u8>> = row.get(2)?;
                    Ok((content, metadata, embedding))
                })
                .map_err(|e| RagError::database(e.to_string()))?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| RagError::database(e.to_string()))?;

            Ok(rows)
        })?;

        rows.into_iter()
            .map(|(content, metadata, embedding)| {
                let metadata: ChunkMetadata = serde_json::from_str(&metadata)?;
                Ok(StoredChunk {
                    chunk: Chunk::new(content, metadata),
                    embedding: embedding.map(|b| bytes_to_vec(&b)).unwrap_or_default(),
                })
            })
            .collect()
    }

    /// Content hashes already present in the collection.
    fn existing_hashes(&self) -> Result<HashSet<String>> {
        let collection = self.collection.clone();
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT content_hash FROM chunks WHERE collection = ?1")
                .map_err(|e| RagError::database(e.to_string()))?;

            let hashes = stmt
                .query_map(params![collection], |row| row.get::<_, String>(0))
                .map_err(|e| RagError::database(e.to_string()))?
                .collect::<std::result::Result<HashSet<_>, _>>()
                .map_err(|e| RagError::database(e.to_string()))?;

            Ok(hashes)
        })
    }
}

#[async_trait]
impl VectorIndex for SqliteStore {
    async fn mmr_search(&self, query: &str, params: MmrParams) -> Result<Vec<Chunk>> {
        if params.k == 0 {
            return Ok(Vec::new());
        }

        let stored = self.load_chunks(true)?;
        if stored.is_empty() {
            debug!("Collection {} is empty", self.collection);
            return Ok(Vec::new());
        }

        let query_vec = self.embedder.embed_query(query).await?;
        if let Some(bad) = stored.iter().find(|s| s.embedding.len() != query_vec.len()) {
            return Err(RagError::embedding(format!(
                "stored vectors have dimension {} but the query has {}",
                bad.embedding.len(),
                query_vec.len()
            )));
        }

        let (chunks, embeddings): (Vec<Chunk>, Vec<Vec<f32>>) =
            stored.into_iter().map(|s| (s.chunk, s.embedding)).unzip();

        let picked = mmr_select(
            &query_vec,
            &embeddings,
            params.k,
            params.fetch_k,
            params.lambda_mult,
        );

        debug!(
            "MMR selected {} of {} chunks (k={}, fetch_k={})",
            picked.len(),
            chunks.len(),
            params.k,
            params.fetch_k
        );

        let mut slots: Vec<Option<Chunk>> = chunks.into_iter().map(Some).collect();
        Ok(picked.into_iter().filter_map(|i| slots[i].take()).collect())
    }

    async fn snapshot(&self) -> Result<Vec<Chunk>> {
        Ok(self
            .load_chunks(false)?
            .into_iter()
            .map(|s| s.chunk)
            .collect())
    }

    async fn count(&self) -> Result<u64> {
        let collection = self.collection.clone();
        self.with_conn(|conn| {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM chunks WHERE collection = ?1",
                    params![collection],
                    |row| row.get(0),
                )
                .map_err(|e| RagError::database(e.to_string()))?;
            Ok(count as u64)
        })
    }

    async fn sources(&self) -> Result<Vec<SourceSummary>> {
        let collection = self.collection.clone();
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    r#"
                    SELECT source, COUNT(*)
                    FROM chunks
                    WHERE collection = ?1
                    GROUP BY source
                    ORDER BY source
                    "#,
                )
                .map_err(|e| RagError::database(e.to_string()))?;

            let sources = stmt
                .query_map(params![collection], |row| {
                    Ok(SourceSummary {
                        filename: row.get(0)?,
                        chunks: row.get::<_, i64>(1)? as u64,
                    })
                })
                .map_err(|e| RagError::database(e.to_string()))?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| RagError::database(e.to_string()))?;

            Ok(sources)
        })
    }
}

#[async_trait]
impl IndexWriter for SqliteStore {
    async fn add_chunks(&self, chunks: &[Chunk]) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let mut seen = self.existing_hashes()?;
        let mut fresh: Vec<(&Chunk, String, String)> = Vec::new();
        for chunk in chunks {
            let metadata = serde_json::to_string(&chunk.metadata)?;
            let hash = content_hash(&metadata, &chunk.content);
            if seen.insert(hash.clone()) {
                fresh.push((chunk, metadata, hash));
            }
        }

        let skipped = chunks.len() - fresh.len();
        if fresh.is_empty() {
            debug!("All {} chunks already indexed", skipped);
            return Ok(0);
        }

        let mut embeddings: Vec<Vec<f32>> = Vec::with_capacity(fresh.len());
        for batch in fresh.chunks(self.batch_size) {
            let texts: Vec<&str> = batch.iter().map(|(c, _, _)| c.content.as_str()).collect();
            let vectors = self.embedder.embed_documents(&texts).await?;
            if vectors.len() != texts.len() {
                return Err(RagError::embedding(format!(
                    "{} returned {} vectors for {} texts",
                    self.embedder.model_name(),
                    vectors.len(),
                    texts.len()
                )));
            }
            embeddings.extend(vectors);
        }

        let collection = self.collection.clone();
        let created_at = now_millis();

        let inserted = self.with_conn(|conn| {
            let tx = conn
                .unchecked_transaction()
                .map_err(|e| RagError::database(e.to_string()))?;

            let mut inserted = 0usize;
            {
                let mut stmt = tx
                    .prepare(
                        r#"
                        INSERT OR IGNORE INTO chunks (id, collection, source, content, metadata,
                                                      content_hash, embedding, dimension, created_at)
                        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                        "#,
                    )
                    .map_err(|e| RagError::database(e.to_string()))?;

                for ((chunk, metadata, hash), embedding) in fresh.iter().zip(&embeddings) {
                    inserted += stmt
                        .execute(params![
                            Ulid::new().to_string(),
                            collection,
                            chunk.metadata.source,
                            chunk.content,
                            metadata,
                            hash,
                            vec_to_bytes(embedding),
                            embedding.len() as i64,
                            created_at,
                        ])
                        .map_err(|e| {
                            RagError::database(format!("Failed to insert chunk: {}", e))
                        })?;
                }
            }

            tx.commit().map_err(|e| RagError::database(e.to_string()))?;
            Ok(inserted)
        })?;

        info!(
            "Indexed {} chunks into {} ({} already present)",
            inserted, self.collection, skipped
        );
        Ok(inserted)
    }
}

/// blake3 hash over serialized metadata and content.
fn content_hash(metadata: &str, content: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(metadata.as_bytes());
    hasher.update(&[0]);
    hasher.update(content.as_bytes());
    hasher.finalize().to_hex().to_string()
}

/// Convert f32 vector to bytes (little-endian).
fn vec_to_bytes(v: &[f32]) -> Vec<u8> {
    v.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Inverse of [`vec_to_bytes`].
fn bytes_to_vec(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
