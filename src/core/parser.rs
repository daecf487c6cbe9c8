use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::wire::{keys, RawExpression};
use crate::models::{Expression, Operation};

/// Default bound on answer tree nesting
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Structural errors found while reading a targeting document
///
/// `path` locates the offending node, e.g. `answerQuery.and[1]`.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Malformed document: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Expected an object at {path}")]
    NotAnObject { path: String },

    #[error("No operation found at {path}")]
    MissingOperation { path: String },

    #[error("Ambiguous operation at {path}: found {keys:?}, expected exactly one")]
    AmbiguousRoot { path: String, keys: Vec<String> },

    #[error("'{kind}' at {path} must hold a list of operations")]
    NotAList { path: String, kind: &'static str },

    #[error("'{kind}' at {path} needs at least 2 operations, found {found}")]
    TooFewOperands {
        path: String,
        kind: &'static str,
        found: usize,
    },

    #[error("Answer '{label}' at {path} is missing '{field}'")]
    IncompleteAnswer {
        path: String,
        label: String,
        field: &'static str,
    },

    #[error("minMatch at {path} is only allowed next to 'or'")]
    MisplacedMinMatch { path: String },

    #[error("minMatch at {path} must be a non-empty string")]
    InvalidMinMatch { path: String },

    #[error("Operation at {path} exceeds the maximum nesting depth of {max}")]
    TooDeep { path: String, max: usize },
}

/// Builds validated [`Expression`]s from wire documents
///
/// Parsing happens in two phases: serde reads the document into a
/// [`RawExpression`], then the answer tree is walked and checked for root
/// uniqueness, arity and leaf completeness before any typed node is built.
#[derive(Debug, Clone, Copy)]
pub struct ExpressionParser {
    max_depth: usize,
}

impl ExpressionParser {
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth: max_depth.max(1),
        }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Parse a document from its JSON text
    pub fn parse_str(&self, document: &str) -> Result<Expression, ParseError> {
        let raw: RawExpression = serde_json::from_str(document)?;
        self.parse_raw(raw)
    }

    /// Parse an already decoded JSON document
    pub fn parse_value(&self, document: Value) -> Result<Expression, ParseError> {
        if !document.is_object() {
            return Err(ParseError::NotAnObject {
                path: "$".to_string(),
            });
        }
        let raw: RawExpression = serde_json::from_value(document)?;
        self.parse_raw(raw)
    }

    pub fn parse_raw(&self, raw: RawExpression) -> Result<Expression, ParseError> {
        let answer_query = match raw.answer_query {
            None | Some(Value::Null) => None,
            Some(ref node) => Some(self.parse_operation(node, "answerQuery", 1)?),
        };

        Ok(Expression {
            time_slot: raw.time_slot,
            polygon: raw.polygon_points.unwrap_or_default(),
            answer_query,
        })
    }

    fn parse_operation(&self, node: &Value, path: &str, depth: usize) -> Result<Operation, ParseError> {
        if depth > self.max_depth {
            return Err(ParseError::TooDeep {
                path: path.to_string(),
                max: self.max_depth,
            });
        }

        let object = node.as_object().ok_or_else(|| ParseError::NotAnObject {
            path: path.to_string(),
        })?;

        let operation_keys: Vec<&String> = object
            .keys()
            .filter(|key| key.as_str() != keys::MIN_MATCH)
            .collect();

        let key = match operation_keys.as_slice() {
            [] => {
                return Err(ParseError::MissingOperation {
                    path: path.to_string(),
                })
            }
            [key] => key.as_str(),
            _ => {
                return Err(ParseError::AmbiguousRoot {
                    path: path.to_string(),
                    keys: operation_keys.into_iter().cloned().collect(),
                })
            }
        };

        let min_match = object.get(keys::MIN_MATCH);
        if min_match.is_some() && key != keys::OR {
            return Err(ParseError::MisplacedMinMatch {
                path: path.to_string(),
            });
        }

        let child_path = format!("{}.{}", path, key);
        match key {
            keys::AND => {
                let sub_operations =
                    self.parse_sub_operations(&object[key], &child_path, keys::AND, depth)?;
                Ok(Operation::And { sub_operations })
            }
            keys::OR => {
                let min_match = min_match
                    .map(|value| parse_min_match(value, &format!("{}.{}", path, keys::MIN_MATCH)))
                    .transpose()?;
                let sub_operations =
                    self.parse_sub_operations(&object[key], &child_path, keys::OR, depth)?;
                Ok(Operation::Or {
                    sub_operations,
                    min_match,
                })
            }
            label => parse_answer(label, &object[label], &child_path),
        }
    }

    fn parse_sub_operations(
        &self,
        node: &Value,
        path: &str,
        kind: &'static str,
        depth: usize,
    ) -> Result<Vec<Operation>, ParseError> {
        let items = node.as_array().ok_or_else(|| ParseError::NotAList {
            path: path.to_string(),
            kind,
        })?;

        if items.len() < 2 {
            return Err(ParseError::TooFewOperands {
                path: path.to_string(),
                kind,
                found: items.len(),
            });
        }

        items
            .iter()
            .enumerate()
            .map(|(index, item)| self.parse_operation(item, &format!("{}[{}]", path, index), depth + 1))
            .collect()
    }
}

impl Default for ExpressionParser {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

fn parse_min_match(value: &Value, path: &str) -> Result<String, ParseError> {
    match value.as_str().map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text.to_string()),
        _ => Err(ParseError::InvalidMinMatch {
            path: path.to_string(),
        }),
    }
}

fn parse_answer(label: &str, node: &Value, path: &str) -> Result<Operation, ParseError> {
    let object = node.as_object().ok_or_else(|| ParseError::NotAnObject {
        path: path.to_string(),
    })?;

    let question_id = required_text(object, keys::QUESTION_ID, label, path)?;
    let answer = required_text(object, keys::ANSWER, label, path)?;

    Ok(Operation::Answer {
        label: label.to_string(),
        question_id,
        answer,
    })
}

fn required_text(
    object: &Map<String, Value>,
    field: &'static str,
    label: &str,
    path: &str,
) -> Result<String, ParseError> {
    match object.get(field).and_then(Value::as_str) {
        Some(text) if !text.is_empty() => Ok(text.to_string()),
        _ => Err(ParseError::IncompleteAnswer {
            path: path.to_string(),
            label: label.to_string(),
            field,
        }),
    }
}
