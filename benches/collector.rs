#[macro_use]
extern crate criterion;

use criterion::{black_box, Criterion};
use minish::parser::pipelines::{parse, Collector, Limits};

const LINES: &[&str] = &[
    "ls -l -a",
    "cat < input.txt | grep -v 'needle in a haystack' | sort -r | uniq -c > output.txt",
    "find . -name \"*.rs\" | xargs wc -l | sort -n | tail -n 5 >> report &",
];

fn criterion_benchmark(c: &mut Criterion) {
    let limits = Limits::default();

    c.bench_function("collector", |b| {
        b.iter(|| {
            for stage in LINES[1].split('|') {
                let _ = black_box(Collector::new(stage.trim()).parse(&limits));
            }
        })
    });

    c.bench_function("pipelines", |b| {
        b.iter(|| {
            for line in LINES {
                let _ = black_box(parse(line, &limits));
            }
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
