//! Submission Targeting - compile operator targeting conditions into search
//! queries and harvest the distinct submitters that match them.
//!
//! A targeting document combines a time window, a geographic polygon and a
//! boolean tree of question/answer matches. It is validated into an
//! [`Expression`], compiled into a backend bool query and executed page by
//! page until every matching submitter identifier has been collected.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{CompiledQuery, ExpressionParser, ParseError, QueryCompiler, RetrievalEngine, RetrievalError};
pub use models::{Expression, Operation, Point, TimeSlot};
pub use services::{SearchBackend, TargetOutcome, TargetingService};
