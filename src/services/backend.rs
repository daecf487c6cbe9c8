use std::future::Future;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::core::compiler::CompiledQuery;

/// Fields returned for a single matching document
pub type Hit = Map<String, Value>;

/// Errors raised by a search backend round-trip
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Search backend the retrieval engine talks to
///
/// Implementations are shared between requests and must not keep per-call
/// state; every call carries its own query and paging parameters.
pub trait SearchBackend {
    /// Total number of documents matching `query`
    fn count(&self, query: &CompiledQuery) -> impl Future<Output = Result<u64, BackendError>> + Send;

    /// One window of matching documents, restricted to `fields`
    fn search(
        &self,
        query: &CompiledQuery,
        offset: u64,
        limit: u64,
        fields: &[&str],
    ) -> impl Future<Output = Result<Vec<Hit>, BackendError>> + Send;
}
