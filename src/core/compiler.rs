use geo::{LineString, Polygon};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::models::{Expression, Operation, Point, TimeSlot};

/// Backend query produced from an [`Expression`]
///
/// Always a `{"bool": {"must": [...]}}` object; an empty `must` list matches
/// every document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CompiledQuery(Value);

impl CompiledQuery {
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// The top-level conjunction
    pub fn must_clauses(&self) -> &[Value] {
        self.0["bool"]["must"]
            .as_array()
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// How polygon containment is expressed to the backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeoQueryStyle {
    /// `geo_polygon` over a geo_point field
    #[default]
    GeoPolygon,
    /// `geo_shape` with a closed GeoJSON ring
    GeoShape,
}

/// Index field names the compiler targets
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FieldMapping {
    #[serde(default = "default_server_time")]
    pub server_time: String,
    #[serde(default = "default_geo_point")]
    pub geo_point: String,
    #[serde(default)]
    pub geo_query: GeoQueryStyle,
    #[serde(default = "default_answers_path")]
    pub answers_path: String,
    #[serde(default = "default_question_id")]
    pub question_id: String,
    #[serde(default = "default_answer")]
    pub answer: String,
    #[serde(default = "default_target_id")]
    pub target_id: String,
}

impl Default for FieldMapping {
    fn default() -> Self {
        Self {
            server_time: default_server_time(),
            geo_point: default_geo_point(),
            geo_query: GeoQueryStyle::default(),
            answers_path: default_answers_path(),
            question_id: default_question_id(),
            answer: default_answer(),
            target_id: default_target_id(),
        }
    }
}

fn default_server_time() -> String { "serverTime".to_string() }
fn default_geo_point() -> String { "location".to_string() }
fn default_answers_path() -> String { "answers".to_string() }
fn default_question_id() -> String { "answers.questionId".to_string() }
fn default_answer() -> String { "answers.answer".to_string() }
fn default_target_id() -> String { "userId".to_string() }

/// Translates expressions into backend queries
///
/// Compilation is a pure function of a validated expression and cannot fail.
#[derive(Debug, Clone, Default)]
pub struct QueryCompiler {
    fields: FieldMapping,
}

impl QueryCompiler {
    pub fn new(fields: FieldMapping) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &FieldMapping {
        &self.fields
    }

    /// Compile to `{"bool": {"must": [time?, polygon?, answers?]}}`
    pub fn compile(&self, expression: &Expression) -> CompiledQuery {
        let mut must: Vec<Value> = Vec::with_capacity(3);

        if let Some(slot) = &expression.time_slot {
            must.push(self.compile_time_slot(slot));
        }

        if !expression.polygon.is_empty() {
            must.push(self.compile_polygon(&expression.polygon));
        }

        if let Some(operation) = &expression.answer_query {
            must.push(operation.compile(&self.fields));
        }

        tracing::trace!("Compiled expression into {} top-level clauses", must.len());

        CompiledQuery(json!({ "bool": { "must": must } }))
    }

    /// A slot without bounds still requires the server-time field to exist
    fn compile_time_slot(&self, slot: &TimeSlot) -> Value {
        let mut range = Map::new();
        let bounds = [
            ("gt", &slot.gt),
            ("gte", &slot.gte),
            ("lt", &slot.lt),
            ("lte", &slot.lte),
        ];
        for (operator, bound) in bounds {
            if let Some(value) = bound {
                range.insert(operator.to_string(), json!(value));
            }
        }

        json!({ "range": { self.fields.server_time.as_str(): Value::Object(range) } })
    }

    fn compile_polygon(&self, points: &[Point]) -> Value {
        let field = self.fields.geo_point.as_str();
        match self.fields.geo_query {
            GeoQueryStyle::GeoPolygon => {
                let points: Vec<Value> = points
                    .iter()
                    .map(|p| json!({ "lat": p.lat(), "lon": p.lon() }))
                    .collect();
                json!({ "geo_polygon": { field: { "points": points } } })
            }
            GeoQueryStyle::GeoShape => {
                let ring: Vec<[f64; 2]> = closed_ring(points)
                    .exterior()
                    .coords()
                    .map(|c| [c.x, c.y])
                    .collect();
                json!({
                    "geo_shape": {
                        field: {
                            "shape": { "type": "polygon", "coordinates": [ring] },
                            "relation": "within"
                        }
                    }
                })
            }
        }
    }
}

/// Polygon whose exterior ring repeats its first point at the end
pub fn closed_ring(points: &[Point]) -> Polygon<f64> {
    let exterior: LineString<f64> = points.iter().copied().map(geo::Coord::from).collect();
    // Polygon::new closes the exterior ring
    Polygon::new(exterior, vec![])
}

impl Operation {
    /// Compile this node and its children
    pub fn compile(&self, fields: &FieldMapping) -> Value {
        match self {
            Operation::And { sub_operations } => {
                let must: Vec<Value> = sub_operations.iter().map(|op| op.compile(fields)).collect();
                json!({ "bool": { "must": must } })
            }
            Operation::Or {
                sub_operations,
                min_match,
            } => {
                let should: Vec<Value> =
                    sub_operations.iter().map(|op| op.compile(fields)).collect();
                let minimum = match min_match {
                    Some(threshold) => json!(threshold),
                    None => json!(1),
                };
                json!({ "bool": { "should": should, "minimum_should_match": minimum } })
            }
            Operation::Answer {
                question_id,
                answer,
                ..
            } => json!({
                "nested": {
                    "path": fields.answers_path,
                    "query": {
                        "bool": {
                            "must": [
                                { "term": { fields.question_id.as_str(): question_id } },
                                { "match": { fields.answer.as_str(): answer } }
                            ]
                        }
                    }
                }
            }),
        }
    }
}
