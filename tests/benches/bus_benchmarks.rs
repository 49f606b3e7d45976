//! # Channel Bridge Benchmarks
//!
//! | Area | Operation | Expectation |
//! |------|-----------|-------------|
//! | shared-bus | publish, N subscribers | linear in N |
//! | shared-bus | publish with monitors | one extra pass |
//! | cb-01 | frame ──► host event | same as a bus publish |
//! | cb-03 | page scan | linear in comment count |
//! | cb-04 | reschedule a pending draft | constant |

use cb_01_frame_bridge::FrameRegistry;
use cb_03_hst_comments::{DomTree, PageStructure};
use cb_04_draft_timer::{DraftSaver, DraftScheduler, SaveError};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::{json, Value};
use shared_bus::{Callback, MessageBus, MonitorCallback};
use std::time::Duration;

// ============================================================================
// SHARED-BUS: dispatch
// ============================================================================

fn bench_publish(c: &mut Criterion) {
    let mut group = c.benchmark_group("shared-bus-publish");
    let payload = [json!({"path": "/news", "channel": "live"})];

    for subscribers in [1usize, 10, 100] {
        let bus = MessageBus::new("bench");
        for _ in 0..subscribers {
            bus.subscribe("channel:changed", Callback::new(|_, args: &[Value]| {
                black_box(args.len());
            }), None);
        }

        group.throughput(Throughput::Elements(subscribers as u64));
        group.bench_with_input(
            BenchmarkId::new("subscribers", subscribers),
            &bus,
            |b, bus| b.iter(|| black_box(bus.publish("channel:changed", &payload))),
        );
    }

    let monitored = MessageBus::new("monitored");
    monitored.subscribe("channel:changed", Callback::new(|_, _| ()), None);
    for _ in 0..3 {
        monitored.monitor(
            MonitorCallback::new(|_, topic, _| {
                black_box(topic.len());
            }),
            None,
        );
    }
    group.bench_function("three_monitors", |b| {
        b.iter(|| black_box(monitored.publish("channel:changed", &payload)))
    });

    let vetoed = MessageBus::new("vetoed");
    vetoed.subscribe("document:save", Callback::new(|_, _| false), None);
    for _ in 0..99 {
        vetoed.subscribe("document:save", Callback::new(|_, _| ()), None);
    }
    group.bench_function("veto_first_of_100", |b| {
        b.iter(|| black_box(vetoed.publish("document:save", &payload)))
    });

    group.finish();
}

fn bench_subscribe_churn(c: &mut Criterion) {
    let bus = MessageBus::new("churn");
    let callback = Callback::new(|_, _| ());

    c.bench_function("shared-bus-subscribe-unsubscribe", |b| {
        b.iter(|| {
            bus.subscribe("t", callback.clone(), None);
            black_box(bus.unsubscribe("t", &callback, None))
        })
    });
}

// ============================================================================
// CB-01: frame bridge
// ============================================================================

fn bench_frame_bridge(c: &mut Criterion) {
    let registry = FrameRegistry::new();
    let Ok(handle) = registry.register("preview") else {
        return;
    };
    handle
        .host()
        .subscribe("page:rendered", Callback::new(|_, _| ()), None);
    let payload = [json!({"path": "/"})];

    c.bench_function("cb-01-frame-to-host", |b| {
        b.iter(|| black_box(handle.frame().publish("page:rendered", &payload)))
    });
}

// ============================================================================
// CB-03: HST comment scan
// ============================================================================

fn page_with_items(items: usize) -> DomTree {
    let mut tree = DomTree::new();
    let body = tree.append_element(tree.root(), "body");
    tree.append_comment(body, r#"{"HST-Type":"CONTAINER_COMPONENT","uuid":"main"}"#);
    for i in 0..items {
        let div = tree.append_element(body, "div");
        tree.append_comment(
            div,
            &format!(r#"{{"HST-Type":"CONTAINER_ITEM_COMPONENT","uuid":"item-{i}"}}"#),
        );
        tree.append_text(div, "content");
        tree.append_comment(div, &format!(r#"{{"HST-End":"true","uuid":"item-{i}"}}"#));
    }
    tree.append_comment(body, r#"{"HST-End":"true","uuid":"main"}"#);
    tree
}

fn bench_page_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("cb-03-page-scan");
    for items in [10usize, 100, 1000] {
        let tree = page_with_items(items);
        group.throughput(Throughput::Elements(items as u64));
        group.bench_with_input(BenchmarkId::new("items", items), &tree, |b, tree| {
            b.iter(|| black_box(PageStructure::scan(tree, tree.root()).item_count()))
        });
    }
    group.finish();
}

// ============================================================================
// CB-04: draft rescheduling
// ============================================================================

struct NullSaver;

#[async_trait::async_trait]
impl DraftSaver for NullSaver {
    type Key = u32;
    type Value = Value;

    async fn save(&self, _key: &u32, _value: Value) -> Result<(), SaveError> {
        Ok(())
    }
}

fn bench_draft_reschedule(c: &mut Criterion) {
    let Ok(runtime) = tokio::runtime::Runtime::new() else {
        return;
    };
    let drafts = runtime.block_on(async {
        DraftScheduler::new(NullSaver, Duration::from_secs(3600))
    });

    c.bench_function("cb-04-reschedule", |b| {
        b.to_async(&runtime)
            .iter(|| async { black_box(drafts.schedule(7, Value::Null)) })
    });
    drafts.shutdown();
}

criterion_group!(
    benches,
    bench_publish,
    bench_subscribe_churn,
    bench_frame_bridge,
    bench_page_scan,
    bench_draft_reschedule,
);

criterion_main!(benches);
