// Core algorithm exports
pub mod compiler;
pub mod parser;
pub mod retrieval;

pub use compiler::{CompiledQuery, FieldMapping, GeoQueryStyle, QueryCompiler};
pub use parser::{ExpressionParser, ParseError};
pub use retrieval::{RetrievalEngine, RetrievalError};
