use criterion::{Criterion, criterion_group, criterion_main};
use persona_replay::InsightAggregator;
use persona_replay::core::{Action, Event, EventStatus, find_active, resolve};
use persona_replay::extensions::group_by_position;
use std::hint::black_box;

fn generated_events(count: u32) -> Vec<Event> {
    (0..count)
        .map(|i| {
            let status = match i % 4 {
                0 => EventStatus::Confused,
                1 => EventStatus::Blocked,
                2 => EventStatus::Delighted,
                _ => EventStatus::Success,
            };
            Event::new(
                "bench-run",
                format!("persona-{}", i % 7),
                i,
                format!("#element-{}", i % 50),
                Action::Click,
                status,
                1_704_110_400.0 + f64::from(i),
            )
            .with_reasoning("I can't find the button I expected here")
            .with_elapsed(f64::from(i) * 0.5)
        })
        .collect()
}

fn bench_find_active_10k(c: &mut Criterion) {
    let elapsed: Vec<f64> = (0..10_000).map(|i| f64::from(i) * 0.5).collect();

    c.bench_function("find_active_10k", |b| {
        b.iter(|| {
            let _ = find_active(black_box(&elapsed), black_box(4_321.05), black_box(0.1));
        })
    });
}

fn bench_resolve_10k(c: &mut Criterion) {
    let candidates: Vec<f64> = (0..10_000).map(|i| f64::from(i) * 0.5 + 0.2).collect();
    let anchor = 2_500.0_f64;

    c.bench_function("resolve_anchor_10k", |b| {
        b.iter(|| {
            let _ = resolve(
                black_box(Some(&anchor)),
                black_box(&candidates),
                black_box(2_500.3),
                black_box(0.5),
            );
        })
    });
}

fn bench_group_by_position_2k(c: &mut Criterion) {
    let elapsed: Vec<f64> = (0..2_000).map(|i| f64::from(i) * 0.37).collect();

    c.bench_function("group_by_position_2k", |b| {
        b.iter(|| {
            let _ = group_by_position(black_box(&elapsed), black_box(740.0), black_box(1.0))
                .expect("valid threshold");
        })
    });
}

fn bench_aggregate_5k(c: &mut Criterion) {
    let events = generated_events(5_000);

    c.bench_function("aggregate_events_5k", |b| {
        b.iter(|| {
            let mut aggregator = InsightAggregator::new();
            let produced = aggregator.process_events(black_box(&events));
            let _ = black_box(aggregator.insights_sorted().len() + produced);
        })
    });
}

criterion_group!(
    benches,
    bench_find_active_10k,
    bench_resolve_10k,
    bench_group_by_position_2k,
    bench_aggregate_5k
);
criterion_main!(benches);
