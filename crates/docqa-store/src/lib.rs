//! docqa-store - SQLite-backed vector index
//!
//! Chunks, their metadata and their embeddings live in a single SQLite file.
//! Vector search is brute-force cosine similarity followed by maximal
//! marginal relevance selection, so no SQLite extension is required.

mod mmr;
mod schema;
mod sqlite;

pub use mmr::{cosine_similarity, mmr_select};
pub use sqlite::{collection_name, SqliteStore};

// Re-export schema for testing/migrations
pub use schema::{SCHEMA, SCHEMA_VERSION};
