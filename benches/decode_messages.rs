//! Benchmarks for chat message decoding.
//!
//! Every inserted row crosses this path before reaching subscribers, so the
//! decode cost bounds how fast a busy session can stream.

use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use serde_json::Value;
use talkbase_realtime_sdk::stream::ChatMessage;

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("stream/decode");

    let serial_id = r#"{
        "id": 4217,
        "session_id": "0b9c3c1e-8f43-4f89-9d3e-2f1a7d9f0c55",
        "role": "assistant",
        "content": "Happy to help with that.",
        "created_at": "2025-11-03T14:21:07.482910+00:00"
    }"#;

    let uuid_id = r#"{
        "id": "8d3f1b2a-5c6e-4f7a-9b8c-1d2e3f4a5b6c",
        "session_id": "0b9c3c1e-8f43-4f89-9d3e-2f1a7d9f0c55",
        "role": "owner",
        "content": "Taking over from the bot here.",
        "created_at": "2025-11-03T14:22:41.006318+00:00"
    }"#;

    let long_content = r#"{
        "id": 4218,
        "session_id": "0b9c3c1e-8f43-4f89-9d3e-2f1a7d9f0c55",
        "role": "assistant",
        "content": "Our standard plan includes unlimited chat sessions, up to three seats, and email support with a one business day response time. The growth plan adds custom branding, webhook integrations, priority support, and an uptime commitment. Annual billing takes twenty percent off either plan, and you can switch plans at any point in the billing cycle with a prorated adjustment on the next invoice.",
        "created_at": "2025-11-03T14:23:02.118733+00:00"
    }"#;

    for (name, json) in [
        ("serial_id", serial_id),
        ("uuid_id", uuid_id),
        ("long_content", long_content),
    ] {
        group.throughput(Throughput::Bytes(json.len() as u64));
        group.bench_with_input(BenchmarkId::new("ChatMessage", name), &json, |b, json| {
            b.iter(|| {
                let _: ChatMessage = serde_json::from_str(std::hint::black_box(json))
                    .expect("Deserialization should succeed");
            });
        });
    }

    group.finish();
}

fn bench_from_record(c: &mut Criterion) {
    let mut group = c.benchmark_group("stream/from_record");

    // Rows arrive from the transport as already-parsed JSON values, so this
    // measures the record-to-message step on its own
    let record: Value = serde_json::from_str(
        r#"{
            "id": 4217,
            "session_id": "0b9c3c1e-8f43-4f89-9d3e-2f1a7d9f0c55",
            "role": "user",
            "content": "What are your opening hours?",
            "created_at": "2025-11-03T14:21:07.482910+00:00"
        }"#,
    )
    .expect("record fixture should parse");

    let with_extras: Value = serde_json::from_str(
        r#"{
            "id": 4219,
            "session_id": "0b9c3c1e-8f43-4f89-9d3e-2f1a7d9f0c55",
            "role": "assistant",
            "content": "Let me check that for you.",
            "created_at": "2025-11-03T14:24:55.902661+00:00",
            "metadata": {"model": "tb-chat-2", "latency_ms": 412},
            "tokens": 18
        }"#,
    )
    .expect("record fixture should parse");

    for (name, record) in [("exact_fields", &record), ("extra_fields", &with_extras)] {
        group.bench_with_input(BenchmarkId::new("ChatMessage", name), record, |b, record| {
            b.iter_batched(
                || (*record).clone(),
                |record| {
                    ChatMessage::from_record(std::hint::black_box(record))
                        .expect("Decoding should succeed")
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(decode_benches, bench_decode, bench_from_record);
criterion_main!(decode_benches);
