use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use agora_events::{CancellationToken, Event, EventBus, EventHandler, HandlerRegistryBuilder, InProcessEventBus};
use agora_infra::unit_of_work::{CompositeUnitOfWork, InMemoryParticipant, InMemoryTable};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug)]
struct PostLiked {
    post: u64,
}

impl Event for PostLiked {
    fn event_type(&self) -> &'static str {
        "feed.post_liked"
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Cheapest possible handler: the bench measures dispatch, not handler work.
struct Counter(Arc<AtomicU64>);

#[async_trait]
impl EventHandler<PostLiked> for Counter {
    async fn handle(&self, event: &PostLiked, _: &CancellationToken) -> anyhow::Result<()> {
        self.0.fetch_add(event.post, Ordering::Relaxed);
        Ok(())
    }
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime")
}

fn bench_publish_fan_out(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("publish_fan_out");
    group.throughput(Throughput::Elements(1));

    for handlers in [0usize, 1, 4, 16] {
        let hits = Arc::new(AtomicU64::new(0));
        let mut builder = HandlerRegistryBuilder::new();
        for _ in 0..handlers {
            builder.subscribe::<PostLiked, _>(Counter(hits.clone()));
        }
        let bus = InProcessEventBus::new(Arc::new(builder.build()));
        let cancel = CancellationToken::new();

        group.bench_with_input(BenchmarkId::from_parameter(handlers), &handlers, |b, _| {
            b.iter(|| {
                rt.block_on(bus.publish(black_box(&PostLiked { post: 1 }), &cancel))
                    .expect("publish")
            });
        });
    }

    group.finish();
}

fn bench_composite_commit(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("composite_commit");

    for participants in [1usize, 4, 16] {
        let tables: Vec<Arc<InMemoryTable<u64, u64>>> =
            (0..participants).map(|_| Arc::new(InMemoryTable::new())).collect();
        let cancel = CancellationToken::new();

        group.throughput(Throughput::Elements(participants as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(participants),
            &participants,
            |b, _| {
                let mut key = 0u64;
                b.iter(|| {
                    key += 1;
                    let mut uow = CompositeUnitOfWork::new();
                    for (i, table) in tables.iter().enumerate() {
                        let participant = InMemoryParticipant::new(format!("boundary-{i}"), table.clone());
                        participant.stage_upsert(key, key).expect("stage");
                        uow.attach(Arc::new(participant));
                    }
                    rt.block_on(uow.commit(&cancel)).expect("commit")
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_publish_fan_out, bench_composite_commit);
criterion_main!(benches);
