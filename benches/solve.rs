use criterion::{black_box, criterion_group, criterion_main, Criterion};
use flowlink::{solve, Color, Deadline, Strategy};
use pprof::criterion::{Output, PProfProfiler};

/// Colors `1..=n` as parallel rows with endpoints pinned to the side columns.
fn lanes(n: usize) -> Vec<Vec<Color>> {
    (0..n)
        .map(|r| {
            let mut row = vec![0; n];
            row[0] = r as Color + 1;
            row[n - 1] = r as Color + 1;
            row
        })
        .collect()
}

fn criterion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("solve");
    group.sample_size(50);

    let board = lanes(5);

    for (name, strategy) in [
        ("path_enum_5x5", Strategy::PathEnum),
        ("heuristic_5x5", Strategy::Heuristic),
        ("sat_5x5", Strategy::Sat),
    ] {
        group.bench_function(name, |b| {
            b.iter(|| {
                let report = solve(
                    black_box(&board),
                    black_box(strategy),
                    Deadline::after_ms(15_000),
                );
                black_box(report);
            });
        });
    }

    let big = lanes(10);
    group.bench_function("heuristic_10x10", |b| {
        b.iter(|| {
            let report = solve(
                black_box(&big),
                black_box(Strategy::Heuristic),
                Deadline::after_ms(15_000),
            );
            black_box(report);
        });
    });

    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default().with_profiler(PProfProfiler::new(100, Output::Flamegraph(None)));
    targets = criterion_benchmark
}
criterion_main!(benches);
