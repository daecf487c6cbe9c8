use serde::{Deserialize, Serialize};

/// Validated targeting expression
///
/// Built once per request by [`crate::core::parser::ExpressionParser`] and
/// discarded after compilation. Every part is optional; an empty expression
/// matches every submission.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Expression {
    pub time_slot: Option<TimeSlot>,
    pub polygon: Vec<Point>,
    pub answer_query: Option<Operation>,
}

impl Expression {
    /// True when no clause would be emitted for this expression
    pub fn is_unrestricted(&self) -> bool {
        self.time_slot.is_none()
            && self.polygon.is_empty()
            && self.answer_query.is_none()
    }
}

/// Bounds on the server time of a submission
///
/// Values are passed through to the backend untouched, so date math such as
/// `now-1000m` works as well as absolute timestamps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gte: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lte: Option<String>,
}

/// Geographic point in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    lat: f64,
    lon: f64,
}

impl Point {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    #[inline]
    pub fn lat(&self) -> f64 {
        self.lat
    }

    #[inline]
    pub fn lon(&self) -> f64 {
        self.lon
    }
}

impl From<Point> for geo::Coord<f64> {
    fn from(point: Point) -> Self {
        geo::Coord {
            x: point.lon,
            y: point.lat,
        }
    }
}

/// Node of the boolean answer tree
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Every sub-operation must hold
    And { sub_operations: Vec<Operation> },
    /// At least one sub-operation, or `min_match` of them, must hold
    Or {
        sub_operations: Vec<Operation>,
        min_match: Option<String>,
    },
    /// A submission holds an answer record for `question_id` whose text
    /// matches `answer`. `label` is the wire key that named the leaf.
    Answer {
        label: String,
        question_id: String,
        answer: String,
    },
}

impl Operation {
    pub fn and(sub_operations: Vec<Operation>) -> Self {
        Operation::And { sub_operations }
    }

    pub fn or(sub_operations: Vec<Operation>, min_match: Option<String>) -> Self {
        Operation::Or {
            sub_operations,
            min_match,
        }
    }

    pub fn answer(
        label: impl Into<String>,
        question_id: impl Into<String>,
        answer: impl Into<String>,
    ) -> Self {
        Operation::Answer {
            label: label.into(),
            question_id: question_id.into(),
            answer: answer.into(),
        }
    }

    /// Number of operation levels below and including this node
    pub fn depth(&self) -> usize {
        match self {
            Operation::And { sub_operations } | Operation::Or { sub_operations, .. } => {
                1 + sub_operations.iter().map(Operation::depth).max().unwrap_or(0)
            }
            Operation::Answer { .. } => 1,
        }
    }

    /// Number of answer leaves in the tree
    pub fn leaf_count(&self) -> usize {
        match self {
            Operation::And { sub_operations } | Operation::Or { sub_operations, .. } => {
                sub_operations.iter().map(Operation::leaf_count).sum()
            }
            Operation::Answer { .. } => 1,
        }
    }
}
