//! Criterion benchmarks for the extraction cascade and schema coercion.
//!
//! Fixtures are plain `&str` literals defined inline — there is no schema
//! file format to load here; the "fixture" is the input text plus the
//! [`Schema`] built in code below.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use schema_salvage::{parse, Field, ParseOptions, Schema};

fn person_schema() -> Schema {
    Schema::Object {
        name: "Person".into(),
        fields: vec![
            Field::required("name", Schema::String),
            Field::required("age", Schema::Number { integer: true }),
            Field::optional("email", Schema::Nullable(Box::new(Schema::String))),
            Field::optional(
                "tags",
                Schema::Default(Box::new(Schema::Array(Box::new(Schema::String))), serde_json::json!([])),
            ),
        ],
    }
}

const CLEAN_JSON: &str = r#"{"name": "Ada Lovelace", "age": 36, "email": "ada@example.com", "tags": ["math", "computing"]}"#;

const MARKDOWN_FENCED: &str = "Here is the result:\n```json\n{\"name\": \"Ada Lovelace\", \"age\": 36, \"email\": \"ada@example.com\", \"tags\": [\"math\", \"computing\"]}\n```\nLet me know if you need anything else.";

const HEAVILY_MALFORMED: &str = "Sure thing! Here's the person:\n```\n{\n  name: 'Ada Lovelace', // full name\n  age: 36,\n  email: null,\n  tags: ['math', 'computing',]\n}\n```\nAnd for comparison, a duplicate reading: {name: \"Ada Lovelace\", age: \"36\", tags: \"math\"}";

fn bench_parse_clean_json(c: &mut Criterion) {
    let schema = person_schema();
    c.bench_function("parse/clean_json", |b| {
        b.iter(|| parse(black_box(CLEAN_JSON), black_box(&schema), ParseOptions::default()).unwrap())
    });
}

fn bench_parse_markdown_fenced(c: &mut Criterion) {
    let schema = person_schema();
    c.bench_function("parse/markdown_fenced", |b| {
        b.iter(|| parse(black_box(MARKDOWN_FENCED), black_box(&schema), ParseOptions::default()).unwrap())
    });
}

fn bench_parse_heavily_malformed(c: &mut Criterion) {
    let schema = person_schema();
    c.bench_function("parse/heavily_malformed", |b| {
        b.iter(|| parse(black_box(HEAVILY_MALFORMED), black_box(&schema), ParseOptions::default()).unwrap())
    });
}

fn bench_parse_string_schema_short_circuit(c: &mut Criterion) {
    c.bench_function("parse/string_schema_short_circuit", |b| {
        b.iter(|| parse(black_box(HEAVILY_MALFORMED), black_box(&Schema::String), ParseOptions::default()).unwrap())
    });
}

criterion_group!(
    benches,
    bench_parse_clean_json,
    bench_parse_markdown_fenced,
    bench_parse_heavily_malformed,
    bench_parse_string_schema_short_circuit,
);
criterion_main!(benches);
