//! Compare the three schedulers on the same in-memory batch.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use image::Rgba;
use lockstep::prelude::*;

const TASKS: usize = 8;

fn batch() -> (Vec<TaskSpec>, MemoryStore) {
    let store = MemoryStore::new();
    let specs = (0..TASKS)
        .map(|index| {
            let plane = Plane::from_fn(256, 192, |x, y| {
                let v = ((x * 251 + y * 509 + index as u32 * 7) % 65_536) as u16;
                Rgba([v, v.wrapping_mul(3), u16::MAX - v, u16::MAX])
            });
            store.insert(format!("in/{index}.png"), plane);
            TaskSpec::new(
                index,
                format!("in/{index}.png"),
                format!("out/{index}.png"),
                vec!["S".into(), "B".into(), "E".into(), "G".into()],
            )
        })
        .collect();
    (specs, store)
}

fn bench_schedulers(c: &mut Criterion) {
    let (specs, store) = batch();
    let mut group = c.benchmark_group("schedulers");
    group.sample_size(10);

    group.bench_function("sequential", |b| {
        let scheduler = scheduler_for(Mode::Sequential, 1, FailurePolicy::Continue);
        b.iter(|| black_box(scheduler.run(&specs, &store, &ProgressTracker::default())))
    });

    for threads in [2, 4, 8] {
        for mode in [Mode::Bsp, Mode::Pipeline] {
            let scheduler = scheduler_for(mode, threads, FailurePolicy::Continue);
            group.bench_with_input(BenchmarkId::new(mode.to_string(), threads), &threads, |b, _| {
                b.iter(|| black_box(scheduler.run(&specs, &store, &ProgressTracker::default())))
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_schedulers);
criterion_main!(benches);
