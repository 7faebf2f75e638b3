//! docqa-service - question answering over an indexed document set
//!
//! [`DocqaService`] wires the collaborators together and validates requests
//! at the boundary.
//!
//! # Operations
//!
//! - `ask` - retrieve supporting passages and generate a grounded answer
//! - `search` - retrieval only, returning scored passages
//! - `ingest_paths` / `ingest_payload` - load, clean, chunk and index documents
//! - `sources` - chunk counts per indexed file
//! - `health` - index readiness and the configured language model

mod ingest;
mod params;
mod service;

pub use ingest::{chunk_documents, summarize_sources};
pub use params::{
    AskMetadata, AskRequest, AskResponse, HealthReport, IngestFile, IngestOptions, IngestPayload,
    IngestReport, SearchHit, SearchRequest, SearchResponse, SourcesReport, RETRIEVAL_ENGINE,
};
pub use service::DocqaService;
