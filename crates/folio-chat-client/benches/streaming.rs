//! Benchmarks for streaming response processing.
//!
//! These benchmarks measure splitting a response body into `data:` lines and
//! parsing each line into a delta, which runs for every event of a reply.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use serde_json::json;

use folio_chat_client::delta::parse_delta;
use folio_chat_client::sse::SseLineDecoder;

/// Create a typical content event line
fn create_content_line(text: &str) -> String {
    format!("data: {}\n", json!({ "content": text }))
}

/// Create the fragments of a streamed `leave_message` call
fn create_tool_call_lines() -> Vec<String> {
    let arguments = r#"{"fromName":"Ada","fromEmail":"ada@example.com","subject":"Hello","body":"I enjoyed your portfolio."}"#;
    let mut lines = vec![format!(
        "data: {}\n",
        json!({"toolCalls": [{"index": 0, "id": "call_1", "type": "function",
                              "function": {"name": "leave_message", "arguments": ""}}]})
    )];
    lines.extend(arguments.as_bytes().chunks(8).map(|piece| {
        format!(
            "data: {}\n",
            json!({"toolCalls": [{"index": 0, "function": {
                "arguments": String::from_utf8_lossy(piece)
            }}]})
        )
    }));
    lines
}

/// Create a full response body with `n` content events
fn create_body(n: usize) -> String {
    let mut body = String::from("data: {\"role\":\"assistant\"}\n");
    for i in 0..n {
        body.push_str(&create_content_line(&format!("token {i} ")));
    }
    body
}

/// Benchmark parsing a single content payload
#[allow(clippy::unwrap_used)]
fn bench_parse_content_delta(c: &mut Criterion) {
    let payload = r#"{"content":"Hello, how can I help you today?"}"#;

    c.bench_function("parse_content_delta", |b| {
        b.iter(|| {
            let delta = parse_delta(black_box(payload)).unwrap();
            black_box(delta);
        });
    });
}

/// Benchmark decoding bodies of growing size delivered in network-sized chunks
fn bench_decode_body(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_body");

    for events in &[16, 128, 1024] {
        let body = create_body(*events);

        group.bench_with_input(BenchmarkId::from_parameter(events), &body, |b, body| {
            b.iter(|| {
                let mut decoder = SseLineDecoder::new();
                let mut count = 0;
                for chunk in body.as_bytes().chunks(512) {
                    for payload in decoder.push(black_box(chunk)) {
                        if let Ok(Some(delta)) = parse_delta(&payload) {
                            black_box(delta);
                            count += 1;
                        }
                    }
                }
                black_box(count);
            });
        });
    }

    group.finish();
}

/// Benchmark the cumulative strategy, where every notification carries the
/// whole response so far
fn bench_decode_cumulative(c: &mut Criterion) {
    let body = create_body(256);

    c.bench_function("decode_cumulative", |b| {
        b.iter(|| {
            let mut decoder = SseLineDecoder::new();
            let bytes = body.as_bytes();
            let mut end = 0;
            while end < bytes.len() {
                end = (end + 512).min(bytes.len());
                black_box(decoder.push_cumulative(&bytes[..end]));
            }
            black_box(decoder.finish());
        });
    });
}

/// Benchmark decoding a streamed tool call
fn bench_decode_tool_call(c: &mut Criterion) {
    let body: String = create_tool_call_lines().concat();

    c.bench_function("decode_tool_call", |b| {
        b.iter(|| {
            let mut decoder = SseLineDecoder::new();
            for payload in decoder.push(black_box(body.as_bytes())) {
                black_box(parse_delta(&payload).ok());
            }
        });
    });
}

criterion_group!(
    benches,
    bench_parse_content_delta,
    bench_decode_body,
    bench_decode_cumulative,
    bench_decode_tool_call
);

criterion_main!(benches);
