use core_sim::World;
use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use sim_schema::ScenarioFlag;

fn stressed_world(days: u32) -> World {
    let mut world = World::new(20251212);
    world.toggle_scenario(ScenarioFlag::DemandSpike);
    world.toggle_scenario(ScenarioFlag::DcOutage);
    for _ in 0..days {
        world.tick();
    }
    world
}

fn bench_derive(c: &mut Criterion) {
    let mut group = c.benchmark_group("derive");

    for days in [0u32, 3, 7] {
        let world = stressed_world(days);
        group.bench_with_input(BenchmarkId::new("day", days), &world, |b, world| {
            b.iter(|| world.derive())
        });
    }

    group.finish();
}

fn bench_tick(c: &mut Criterion) {
    c.bench_function("tick", |b| {
        b.iter_batched(
            || stressed_world(0),
            |mut world| {
                world.tick();
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_rebalance(c: &mut Criterion) {
    let world = stressed_world(3);
    let sku = world.baseline().skus[0].id.clone();
    c.bench_function("rebalance_proposals", |b| {
        b.iter(|| world.rebalance_proposals(&sku))
    });
}

criterion_group!(derive_benches, bench_derive, bench_tick, bench_rebalance);
criterion_main!(derive_benches);
