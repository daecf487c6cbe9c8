use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

use crate::core::compiler::{CompiledQuery, QueryCompiler};
use crate::core::parser::{ExpressionParser, ParseError};
use crate::core::retrieval::{RetrievalEngine, RetrievalError};
use crate::services::backend::SearchBackend;

/// Errors surfaced to callers of the targeting pipeline
#[derive(Debug, Error)]
pub enum TargetingError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Retrieval(#[from] RetrievalError),
}

/// Outcome of a successful targeting run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetOutcome {
    /// Non-empty identifiers of every matching submitter
    Found(HashSet<String>),
    /// The query ran but matched nobody
    NoTargets,
}

impl TargetOutcome {
    pub fn identifiers(&self) -> Option<&HashSet<String>> {
        match self {
            TargetOutcome::Found(ids) => Some(ids),
            TargetOutcome::NoTargets => None,
        }
    }
}

/// Parse, compile and retrieve in one call
///
/// This is the caller the retrieval engine hands its identifier set to;
/// empty identifiers are dropped here before results leave the service.
pub struct TargetingService<B> {
    parser: ExpressionParser,
    compiler: QueryCompiler,
    engine: RetrievalEngine<B>,
}

impl<B: SearchBackend> TargetingService<B> {
    pub fn new(parser: ExpressionParser, compiler: QueryCompiler, backend: Arc<B>, page_size: u64) -> Self {
        let engine = RetrievalEngine::new(backend, page_size, compiler.fields().target_id.clone());
        Self {
            parser,
            compiler,
            engine,
        }
    }

    pub fn default_page_size(&self) -> u64 {
        self.engine.page_size()
    }

    /// Validate and compile a document without touching the backend
    pub fn compile(&self, document: Value) -> Result<CompiledQuery, ParseError> {
        let expression = self.parser.parse_value(document)?;
        if expression.is_unrestricted() {
            tracing::warn!("Targeting expression has no restrictions and matches every submission");
        }
        Ok(self.compiler.compile(&expression))
    }

    /// Find every submitter matching `document`
    ///
    /// `page_size` overrides the configured page size for this call only.
    pub async fn find_targets(
        &self,
        document: Value,
        page_size: Option<u64>,
    ) -> Result<TargetOutcome, TargetingError> {
        let query = self.compile(document)?;

        let identifiers = match page_size {
            Some(size) => self.engine.with_page_size(size).retrieve(&query).await?,
            None => self.engine.retrieve(&query).await?,
        };

        let targets: HashSet<String> = identifiers
            .into_iter()
            .filter(|id| !id.trim().is_empty())
            .collect();

        if targets.is_empty() {
            tracing::info!("Targeting query matched no submitters");
            Ok(TargetOutcome::NoTargets)
        } else {
            tracing::info!("Targeting query matched {} submitters", targets.len());
            Ok(TargetOutcome::Found(targets))
        }
    }
}
