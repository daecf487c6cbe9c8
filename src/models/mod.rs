// Model exports
pub mod expression;
pub mod requests;
pub mod responses;
pub mod wire;

pub use expression::{Expression, Operation, Point, TimeSlot};
pub use requests::TargetQueryParams;
pub use responses::{CompileResponse, ErrorResponse, HealthResponse, TargetResponse, TargetStatus};
pub use wire::RawExpression;
