use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use fleetops_cargo::{AddItem, CargoCommand, CargoId, CargoLedger};
use fleetops_core::Aggregate;

fn stocked_ledger(distinct_items: usize) -> CargoLedger {
    let (mut ledger, _) = CargoLedger::open(CargoId::generate(), "bench", f64::MAX / 2.0).unwrap();
    for i in 0..distinct_items {
        ledger.add_item(format!("item-{i}"), 10, 1.0).unwrap();
    }
    ledger
}

/// Add/remove cost grows with the number of distinct names (linear scan).
fn bench_add_remove_by_ledger_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("add_remove_by_ledger_size");

    for size in [1usize, 10, 100, 1000].iter() {
        group.throughput(Throughput::Elements(2));
        group.bench_with_input(BenchmarkId::new("last_item", size), size, |b, &size| {
            let mut ledger = stocked_ledger(size);
            let name = format!("ITEM-{}", size - 1);

            b.iter(|| {
                ledger.add_item(black_box(name.as_str()), 1, 1.0).unwrap();
                ledger.remove_item(black_box(name.as_str()), 1, 1.0).unwrap();
            });
        });
    }

    group.finish();
}

fn bench_replay(c: &mut Criterion) {
    let mut group = c.benchmark_group("ledger_replay");

    for history_len in [10usize, 100, 1000].iter() {
        group.throughput(Throughput::Elements(*history_len as u64));
        group.bench_with_input(
            BenchmarkId::new("events", history_len),
            history_len,
            |b, &len| {
                let id = CargoId::generate();
                let (mut ledger, mut history) = CargoLedger::open(id.clone(), "bench", 1e12).unwrap();
                for i in 0..len {
                    history.extend(ledger.add_item(format!("item-{}", i % 16), 1, 2.0).unwrap());
                }

                b.iter(|| {
                    let mut replayed = CargoLedger::empty(id.clone());
                    for event in black_box(&history) {
                        replayed.apply(event);
                    }
                    black_box(replayed);
                });
            },
        );
    }

    group.finish();
}

fn bench_capacity_rejection(c: &mut Criterion) {
    let mut ledger = stocked_ledger(50);
    ledger.resize_capacity(ledger.used_capacity()).unwrap();

    c.bench_function("capacity_rejection", |b| {
        b.iter(|| {
            let result = ledger.handle(&CargoCommand::AddItem(AddItem {
                name: "overflow".to_string(),
                amount: 1,
                unit_weight: 1.0,
                occurred_at: chrono::Utc::now(),
            }));
            black_box(result.is_err());
        });
    });
}

criterion_group!(
    benches,
    bench_add_remove_by_ledger_size,
    bench_replay,
    bench_capacity_rejection
);
criterion_main!(benches);
