//! Benchmarks for the simulation step, session tick, and rollback paths.
//!
//! Run with: cargo bench --bench session

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use riposte_netcode::{
    state_checksum, step, Buttons, Frame, PlayerSide, RollbackSession, SimState,
};

fn bench_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("step");

    let state = SimState::new(1).unwrap();
    group.bench_function("neutral", |b| {
        b.iter(|| step(black_box(state), Buttons::NEUTRAL, Buttons::NEUTRAL));
    });
    group.bench_function("moving", |b| {
        b.iter(|| step(black_box(state), Buttons::RIGHT, Buttons::LEFT | Buttons::JUMP));
    });

    group.finish();
}

fn bench_state_checksum(c: &mut Criterion) {
    let state = SimState::new(1).unwrap();
    c.bench_function("state_checksum", |b| {
        b.iter(|| state_checksum(black_box(&state)));
    });
}

fn bench_tick(c: &mut Criterion) {
    c.bench_function("session tick", |b| {
        let mut session =
            RollbackSession::new(SimState::new(1).unwrap(), 128, PlayerSide::P1).unwrap();
        b.iter(|| session.tick(black_box(Buttons::RIGHT)));
    });
}

fn bench_rollback(c: &mut Criterion) {
    let mut group = c.benchmark_group("rollback");

    for depth in [2u32, 8, 32].iter() {
        group.bench_with_input(BenchmarkId::new("depth", depth), depth, |b, &depth| {
            b.iter_batched(
                || {
                    let mut session =
                        RollbackSession::new(SimState::new(1).unwrap(), 128, PlayerSide::P1)
                            .unwrap();
                    for _ in 0..depth {
                        session.tick(Buttons::RIGHT);
                    }
                    session
                },
                |mut session| {
                    // Contradicts the neutral prediction at frame 0, forcing
                    // a full-depth rewind and re-simulation.
                    session
                        .set_remote_input(Frame::new(0), Buttons::LEFT)
                        .unwrap();
                    session
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_step,
    bench_state_checksum,
    bench_tick,
    bench_rollback
);
criterion_main!(benches);
