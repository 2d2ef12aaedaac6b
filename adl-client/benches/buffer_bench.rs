use adl_client::{Mutation, PendingMutations};
use criterion::{Criterion, black_box, criterion_group, criterion_main};

fn stage_mixed(n: usize) -> PendingMutations {
    let mut buf = PendingMutations::new();
    for i in 0..n {
        let name = format!("attr{}", i % 16);
        buf.stage(match i % 4 {
            0 => Mutation::WriteProperty {
                name,
                value: i.to_string(),
            },
            1 => Mutation::IncrementCounter { name, delta: 1 },
            2 => Mutation::AddSetItem {
                name,
                member: format!("m{}", i % 32),
            },
            _ => Mutation::AddListItem {
                list: name,
                key: format!("{:08}", i),
                value: i.to_string(),
            },
        });
    }
    buf
}

fn bench_stage(c: &mut Criterion) {
    c.bench_function("stage 1k mixed mutations", |b| {
        b.iter(|| stage_mixed(black_box(1_000)))
    });
}

fn bench_drain(c: &mut Criterion) {
    c.bench_function("drain 1k mixed mutations", |b| {
        b.iter_batched(
            || stage_mixed(1_000),
            |mut buf| buf.drain(),
            criterion::BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_stage, bench_drain);
criterion_main!(benches);
