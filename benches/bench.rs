// Criterion benchmarks for the targeting pipeline

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::{json, Value};
use submission_targeting::core::{ExpressionParser, QueryCompiler};

fn leaf(i: usize) -> Value {
    json!({ format!("question{}", i): { "questionId": i.to_string(), "answer": "yes" } })
}

/// Balanced and/or tree with `leaves` answer leaves
fn answer_tree(leaves: usize, depth: usize) -> Value {
    if leaves <= 1 {
        return leaf(depth);
    }
    let left = leaves / 2;
    let kind = if depth % 2 == 0 { "and" } else { "or" };
    json!({ kind: [answer_tree(left, depth + 1), answer_tree(leaves - left, depth + 1)] })
}

fn document(leaves: usize) -> Value {
    json!({
        "timeSlot": { "gte": "now-1000m", "lt": "now" },
        "polygonPoints": [
            { "lat": 30, "lon": 70 },
            { "lat": 31, "lon": 70 },
            { "lat": 31, "lon": 71 },
            { "lat": 30, "lon": 71 }
        ],
        "answerQuery": answer_tree(leaves, 0)
    })
}

fn bench_parse(c: &mut Criterion) {
    let parser = ExpressionParser::default();
    let mut group = c.benchmark_group("parse_expression");

    for leaves in [2, 16, 128] {
        let doc = document(leaves);
        group.bench_with_input(BenchmarkId::from_parameter(leaves), &doc, |b, doc| {
            b.iter(|| parser.parse_value(black_box(doc.clone())).unwrap());
        });
    }

    group.finish();
}

fn bench_compile(c: &mut Criterion) {
    let parser = ExpressionParser::default();
    let compiler = QueryCompiler::default();
    let mut group = c.benchmark_group("compile_expression");

    for leaves in [2, 16, 128] {
        let expression = parser.parse_value(document(leaves)).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(leaves), &expression, |b, expression| {
            b.iter(|| compiler.compile(black_box(expression)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_parse, bench_compile);
criterion_main!(benches);
