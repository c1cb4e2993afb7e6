//! Workflow engine benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use laundry_core::{CostAccountant, MachineRecord};
use laundry_server::{
    Config, IdentityBoundary, MachineControlBoundary, Request, SimulatedController, Simulation,
    TokenIdentityProvider, WorkflowEngine,
};
use laundry_storage::{MachineStore, ReadCache};
use std::sync::Arc;

const TOKEN: &str = "bench-token";

fn create_test_engine(machines: usize) -> WorkflowEngine {
    let accountant = Arc::new(CostAccountant::new());
    let store = Arc::new(MachineStore::with_machines(
        accountant.clone(),
        (0..machines).map(|i| MachineRecord::new(format!("machine-{}", i), "location-a")),
    ));
    let cache = Arc::new(ReadCache::new(64, accountant.clone()));
    let identity = IdentityBoundary::new(
        Arc::new(TokenIdentityProvider::with_tokens([TOKEN])),
        accountant.clone(),
    );
    let control = MachineControlBoundary::new(
        Arc::new(SimulatedController::reliable()),
        accountant.clone(),
    );
    WorkflowEngine::new(accountant, store, cache, identity, control)
}

fn bench_inspect(c: &mut Criterion) {
    let mut group = c.benchmark_group("workflow_inspect");
    group.throughput(Throughput::Elements(1));

    let engine = create_test_engine(1_000);
    let hit = Request::inspect(TOKEN, "machine-0");
    engine.handle(&hit).unwrap();

    group.bench_function("cache_hit", |b| {
        b.iter(|| black_box(engine.handle(&hit).unwrap()));
    });

    // Cycling through more ids than the cache holds keeps every lookup a miss.
    let misses: Vec<Request> = (0..128)
        .map(|i| Request::inspect(TOKEN, &format!("machine-{}", i)))
        .collect();
    group.bench_function("cache_miss", |b| {
        let mut i = 0usize;
        b.iter(|| {
            i = (i + 1) % misses.len();
            black_box(engine.handle(&misses[i]).unwrap())
        });
    });

    group.bench_function("invalid_token", |b| {
        let request = Request::inspect("wrong-token", "machine-0");
        b.iter(|| black_box(engine.handle(&request).is_err()));
    });

    group.finish();
}

fn bench_reserve_and_start(c: &mut Criterion) {
    let mut group = c.benchmark_group("workflow_reserve_start");

    for machines in [10, 100] {
        group.throughput(Throughput::Elements(machines as u64));
        group.bench_with_input(
            BenchmarkId::new("fill_location", machines),
            &machines,
            |b, &machines| {
                b.iter(|| {
                    let engine = create_test_engine(machines);
                    for i in 0..machines {
                        let reserved = engine
                            .handle(&Request::reserve(TOKEN, "location-a", format!("job-{}", i)))
                            .unwrap();
                        if let Some(machine) = reserved.machine {
                            black_box(
                                engine
                                    .handle(&Request::start(TOKEN, &machine.machine_id))
                                    .unwrap(),
                            );
                        }
                    }
                });
            },
        );
    }

    group.finish();
}

fn bench_simulation(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulation");
    group.sample_size(10);

    let mut config = Config::default();
    config.simulation.iterations = 1;
    config.simulation.runs = 1_000;
    let simulation = Simulation::from_config(&config);

    group.throughput(Throughput::Elements(1_000));
    group.bench_function("run_1000_requests", |b| {
        b.iter(|| black_box(simulation.run().unwrap()));
    });

    group.finish();
}

criterion_group!(benches, bench_inspect, bench_reserve_and_start, bench_simulation);
criterion_main!(benches);
