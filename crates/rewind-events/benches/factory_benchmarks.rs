//! Change factory throughput.
//!
//! Measures how fast a price history is turned into change records, in arrival
//! order and in time order, and how fast the resulting chain replays onto an
//! entity. Histories are generated from a fixed seed so runs are comparable.
//!
//! Run with: `cargo bench --bench factory_benchmarks`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;

use rewind_events::prelude::*;
use rewind_reflect::prelude::*;

// ---------------------------------------------------------------------------
// Benchmark types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
struct Product {
    id: u64,
    price: f64,
}

impl Reflect for Product {
    fn describe(fields: &mut SchemaBuilder<Self>) {
        fields
            .field("id", |p| &p.id, |p| &mut p.id)
            .field("price", |p| &p.price, |p| &mut p.price);
    }
}

#[derive(Debug, Clone)]
struct PriceChange {
    id: u64,
    price: f64,
    at: u64,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// `len` observations with shuffled timestamps.
fn history(len: usize) -> Vec<PriceChange> {
    let mut rng = Pcg64::seed_from_u64(0x5eed);
    (0..len)
        .map(|_| PriceChange {
            id: 7,
            price: rng.gen_range(0.5..2.0),
            at: rng.gen_range(0..(len as u64 * 4)),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_factories(c: &mut Criterion) {
    let mut group = c.benchmark_group("factory");
    let by_macro = selector!(Product, price);
    let by_name = resolve_by_name::<Product, f64>(&Product::schema(), "price")
        .expect("price is declared");

    for &len in &[100usize, 10_000] {
        let input = history(len);

        group.bench_with_input(BenchmarkId::new("arrival_order", len), &input, |b, input| {
            b.iter(|| {
                to_change_events(&by_macro, 1.0, input.iter(), |o| o.id, |o| o.price)
                    .map(|c| *c.new_value())
                    .fold(0.0, |acc, v| acc + black_box(v))
            })
        });

        group.bench_with_input(BenchmarkId::new("time_order", len), &input, |b, input| {
            b.iter(|| {
                to_ordered_change_events(
                    &by_macro,
                    1.0,
                    input.iter(),
                    |o| o.id,
                    |o| o.price,
                    |o| o.at,
                )
                .count()
            })
        });

        let log: ChangeLog<_> =
            to_change_events(&by_name, 1.0, input.clone(), |o| o.id, |o| o.price).collect();
        group.bench_with_input(BenchmarkId::new("replay_rewind", len), &log, |b, log| {
            let mut product = Product { id: 7, price: 1.0 };
            b.iter(|| {
                log.replay(&mut product).expect("replay");
                log.rewind(&mut product).expect("rewind");
                black_box(product.price)
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_factories);
criterion_main!(benches);
