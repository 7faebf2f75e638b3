//! docqa-core - Core types and traits for the docqa question answering service
//!
//! This crate provides the domain types, collaborator traits, configuration
//! and error taxonomy shared by the retrieval pipeline and its backends.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::*;
pub use error::{RagError, Result};
pub use traits::*;
pub use types::*;
