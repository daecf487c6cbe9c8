use serde::Deserialize;
use serde_json::Value;

use crate::models::expression::{Point, TimeSlot};

/// Loosely typed form of an incoming targeting document
///
/// This only answers "can this JSON exist": the answer tree is kept as an
/// untyped value and checked by the parser before an [`Expression`] is built.
///
/// [`Expression`]: crate::models::Expression
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawExpression {
    #[serde(rename = "timeSlot", default)]
    pub time_slot: Option<TimeSlot>,
    #[serde(rename = "polygonPoints", default)]
    pub polygon_points: Option<Vec<Point>>,
    #[serde(rename = "answerQuery", default)]
    pub answer_query: Option<Value>,
}

/// Key names used inside the answer tree
pub mod keys {
    pub const AND: &str = "and";
    pub const OR: &str = "or";
    pub const MIN_MATCH: &str = "minMatch";
    pub const QUESTION_ID: &str = "questionId";
    pub const ANSWER: &str = "answer";
}
