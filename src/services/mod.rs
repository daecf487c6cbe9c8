// Service exports
pub mod backend;
pub mod elasticsearch;
pub mod targeting;

pub use backend::{BackendError, Hit, SearchBackend};
pub use elasticsearch::{ElasticsearchClient, ElasticsearchOptions};
pub use targeting::{TargetOutcome, TargetingError, TargetingService};
