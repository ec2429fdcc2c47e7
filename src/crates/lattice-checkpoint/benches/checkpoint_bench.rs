use criterion::{black_box, criterion_group, criterion_main, Criterion};
use lattice_checkpoint::{
    Checkpoint, CheckpointConfig, CheckpointMetadata, CheckpointSaver, InMemoryCheckpointSaver,
};
use std::collections::HashMap;

fn populated_checkpoint() -> Checkpoint {
    let mut checkpoint = Checkpoint::empty();
    checkpoint.channel_values.insert(
        "messages".to_string(),
        serde_json::json!([
            {"role": "user", "content": "what is the weather in sf"},
            {"role": "assistant", "content": "calling get_weather"},
        ]),
    );
    checkpoint.channel_versions.insert("messages".to_string(), 2);
    checkpoint
}

fn checkpoint_put_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("checkpoint put", |b| {
        b.to_async(&runtime).iter(|| async {
            let saver = InMemoryCheckpointSaver::new();
            let config = CheckpointConfig::new().with_thread_id("bench-thread");

            saver
                .put(
                    &config,
                    black_box(populated_checkpoint()),
                    black_box(CheckpointMetadata::new()),
                    HashMap::new(),
                )
                .await
                .unwrap();
        });
    });
}

fn checkpoint_get_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("checkpoint get", |b| {
        b.to_async(&runtime).iter(|| async {
            let saver = InMemoryCheckpointSaver::new();
            let config = CheckpointConfig::new().with_thread_id("bench-thread");

            let stored = saver
                .put(
                    &config,
                    populated_checkpoint(),
                    CheckpointMetadata::new(),
                    HashMap::new(),
                )
                .await
                .unwrap();

            saver.get_tuple(black_box(&stored)).await.unwrap();
        });
    });
}

fn checkpoint_list_benchmark(c: &mut Criterion) {
    use futures::StreamExt;

    let runtime = tokio::runtime::Runtime::new().unwrap();

    // History walks dominate state inspection, so measure a deep thread.
    let saver = InMemoryCheckpointSaver::new();
    let config = CheckpointConfig::new().with_thread_id("bench-thread");
    runtime.block_on(async {
        for _ in 0..100 {
            saver
                .put(
                    &config,
                    populated_checkpoint(),
                    CheckpointMetadata::new(),
                    HashMap::new(),
                )
                .await
                .unwrap();
        }
    });

    c.bench_function("checkpoint list 100", |b| {
        b.to_async(&runtime).iter(|| async {
            let stream = saver
                .list(black_box(Some(&config)), None, None, None)
                .await
                .unwrap();
            stream.count().await
        });
    });
}

criterion_group!(
    benches,
    checkpoint_put_benchmark,
    checkpoint_get_benchmark,
    checkpoint_list_benchmark
);
criterion_main!(benches);
