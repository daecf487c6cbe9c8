use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::core::compiler::CompiledQuery;
use crate::services::backend::{BackendError, Hit, SearchBackend};

/// Default number of documents requested per page
pub const DEFAULT_PAGE_SIZE: u64 = 1000;

/// A retrieval aborted; no partial result is kept
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("Count request failed: {0}")]
    Count(#[source] BackendError),

    #[error("Page request at offset {offset} failed: {source}")]
    Page {
        offset: u64,
        #[source]
        source: BackendError,
    },
}

/// Harvests every target identifier matching a compiled query
///
/// Counts first, then walks pages in increasing offset order with one
/// request in flight. Count and pages are independent round-trips without a
/// snapshot, so documents written or removed mid-walk may be missed or seen
/// twice; duplicates collapse in the result set.
#[derive(Debug)]
pub struct RetrievalEngine<B> {
    backend: Arc<B>,
    page_size: u64,
    target_field: String,
}

impl<B> Clone for RetrievalEngine<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            page_size: self.page_size,
            target_field: self.target_field.clone(),
        }
    }
}

impl<B: SearchBackend> RetrievalEngine<B> {
    /// A `page_size` of zero is raised to one
    pub fn new(backend: Arc<B>, page_size: u64, target_field: impl Into<String>) -> Self {
        Self {
            backend,
            page_size: page_size.max(1),
            target_field: target_field.into(),
        }
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    pub fn target_field(&self) -> &str {
        &self.target_field
    }

    /// Same backend and field, different page size
    pub fn with_page_size(&self, page_size: u64) -> Self {
        Self::new(Arc::clone(&self.backend), page_size, self.target_field.clone())
    }

    /// Collect the distinct target identifiers of every matching document
    ///
    /// Hits without the identifier contribute an empty string; callers decide
    /// whether to keep it.
    pub async fn retrieve(&self, query: &CompiledQuery) -> Result<HashSet<String>, RetrievalError> {
        let total = self.backend.count(query).await.map_err(RetrievalError::Count)?;
        let fields = [self.target_field.as_str()];
        let mut identifiers = HashSet::new();
        let mut hits_seen: u64 = 0;
        let mut page: u64 = 0;

        while let Some(offset) = page.checked_mul(self.page_size).filter(|offset| *offset < total) {
            tracing::debug!("Fetching page {} (offset {}, limit {})", page, offset, self.page_size);

            let hits = self
                .backend
                .search(query, offset, self.page_size, &fields)
                .await
                .map_err(|source| RetrievalError::Page { offset, source })?;

            hits_seen += hits.len() as u64;
            identifiers.extend(hits.iter().map(|hit| extract_identifier(hit, &self.target_field)));
            page += 1;
        }

        if page.checked_mul(self.page_size).is_none() {
            tracing::warn!(
                "Stopped after {} pages: next offset exceeds the addressable range",
                page
            );
        }

        if hits_seen != total {
            tracing::debug!("Backend reported {} matches but returned {} hits", total, hits_seen);
        }

        tracing::info!(
            "Retrieved {} distinct identifiers from {} matches in {} pages",
            identifiers.len(),
            total,
            page
        );

        Ok(identifiers)
    }
}

/// Read `field` (dot separated for nested objects) from a hit
///
/// Strings are taken as-is and numbers are stringified. Anything else, or a
/// missing field, yields an empty string.
pub fn extract_identifier(hit: &Hit, field: &str) -> String {
    let mut segments = field.split('.');
    let mut current = segments.next().and_then(|first| hit.get(first));
    for segment in segments {
        current = current.and_then(|value| value.get(segment));
    }

    match current {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Number(number)) => number.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    /// Backend serving identifiers from a fixed list, recording page requests
    struct FixtureBackend {
        total: u64,
        ids: Vec<Option<&'static str>>,
        requests: Mutex<Vec<(u64, u64)>>,
        fail_at_offset: Option<u64>,
    }

    impl FixtureBackend {
        fn new(total: u64, ids: Vec<Option<&'static str>>) -> Self {
            Self {
                total,
                ids,
                requests: Mutex::new(Vec::new()),
                fail_at_offset: None,
            }
        }

        fn requests(&self) -> Vec<(u64, u64)> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl SearchBackend for FixtureBackend {
        async fn count(&self, _query: &CompiledQuery) -> Result<u64, BackendError> {
            Ok(self.total)
        }

        async fn search(
            &self,
            _query: &CompiledQuery,
            offset: u64,
            limit: u64,
            fields: &[&str],
        ) -> Result<Vec<Hit>, BackendError> {
            assert_eq!(fields, ["userId"]);
            self.requests.lock().unwrap().push((offset, limit));

            if self.fail_at_offset == Some(offset) {
                return Err(BackendError::Status {
                    status: 503,
                    body: "unavailable".to_string(),
                });
            }

            Ok(self
                .ids
                .iter()
                .skip(offset as usize)
                .take(limit as usize)
                .map(|id| {
                    let mut hit = Hit::new();
                    if let Some(id) = id {
                        hit.insert("userId".to_string(), json!(id));
                    }
                    hit
                })
                .collect())
        }
    }

    fn query() -> CompiledQuery {
        crate::core::compiler::QueryCompiler::default().compile(&Default::default())
    }

    #[tokio::test]
    async fn test_pages_until_total_is_covered() {
        let ids: Vec<Option<&'static str>> = (0..2500).map(|i| Some(if i % 2 == 0 { "a" } else { "b" })).collect();
        let backend = Arc::new(FixtureBackend::new(2500, ids));
        let engine = RetrievalEngine::new(Arc::clone(&backend), 1000, "userId");

        let result = engine.retrieve(&query()).await.unwrap();

        assert_eq!(backend.requests(), vec![(0, 1000), (1000, 1000), (2000, 1000)]);
        assert_eq!(result.len(), 2);
    }

    #[tokio::test]
    async fn test_zero_matches_issue_no_page_requests() {
        let backend = Arc::new(FixtureBackend::new(0, vec![]));
        let engine = RetrievalEngine::new(Arc::clone(&backend), 1000, "userId");

        let result = engine.retrieve(&query()).await.unwrap();

        assert!(result.is_empty());
        assert!(backend.requests().is_empty());
    }

    #[tokio::test]
    async fn test_duplicates_collapse_and_missing_ids_become_empty() {
        let backend = Arc::new(FixtureBackend::new(3, vec![Some("u1"), Some("u1"), None]));
        let engine = RetrievalEngine::new(backend, 10, "userId");

        let result = engine.retrieve(&query()).await.unwrap();

        assert_eq!(result, HashSet::from(["u1".to_string(), String::new()]));
    }

    #[tokio::test]
    async fn test_page_failure_aborts_retrieval() {
        let mut backend = FixtureBackend::new(30, vec![Some("u1"); 30]);
        backend.fail_at_offset = Some(20);
        let backend = Arc::new(backend);
        let engine = RetrievalEngine::new(Arc::clone(&backend), 10, "userId");

        let err = engine.retrieve(&query()).await.unwrap_err();

        assert!(matches!(err, RetrievalError::Page { offset: 20, .. }));
        assert_eq!(backend.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_zero_page_size_still_progresses() {
        let backend = Arc::new(FixtureBackend::new(2, vec![Some("u1"), Some("u2")]));
        let engine = RetrievalEngine::new(Arc::clone(&backend), 0, "userId");

        let result = engine.retrieve(&query()).await.unwrap();

        assert_eq!(engine.page_size(), 1);
        assert_eq!(result.len(), 2);
        assert_eq!(backend.requests(), vec![(0, 1), (1, 1)]);
    }

    #[tokio::test]
    async fn test_short_pages_still_cover_reported_count() {
        let ids: Vec<Option<&'static str>> = vec![
            Some("u1"), Some("u2"), Some("u3"), Some("u4"), Some("u5"), Some("u6"),
            Some("u7"), Some("u8"), Some("u9"), Some("u10"), Some("u11"), Some("u12"),
        ];
        let backend = Arc::new(FixtureBackend::new(25, ids));
        let engine = RetrievalEngine::new(Arc::clone(&backend), 10, "userId");

        let result = engine.retrieve(&query()).await.unwrap();

        assert_eq!(backend.requests(), vec![(0, 10), (10, 10), (20, 10)]);
        assert_eq!(result.len(), 12);
        assert!(result.contains("u12"));
    }

    #[tokio::test]
    async fn test_offset_overflow_ends_paging() {
        let page_size = u64::MAX / 2 + 1;
        let backend = Arc::new(FixtureBackend::new(u64::MAX, vec![]));
        let engine = RetrievalEngine::new(Arc::clone(&backend), page_size, "userId");

        let result = engine.retrieve(&query()).await.unwrap();

        assert!(result.is_empty());
        assert_eq!(backend.requests(), vec![(0, page_size), (page_size, page_size)]);
    }

    #[test]
    fn test_extract_identifier_variants() {
        let hit: Hit = serde_json::from_value(json!({
            "userId": 42,
            "owner": { "id": "nested" },
            "flag": true
        }))
        .unwrap();

        assert_eq!(extract_identifier(&hit, "userId"), "42");
        assert_eq!(extract_identifier(&hit, "owner.id"), "nested");
        assert_eq!(extract_identifier(&hit, "flag"), "");
        assert_eq!(extract_identifier(&hit, "missing"), "");
    }
}
