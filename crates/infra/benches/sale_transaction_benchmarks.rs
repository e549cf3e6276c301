use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use std::sync::{Arc, Barrier};
use std::thread;

use stockpos_core::{Money, ProductId};
use stockpos_infra::{InMemorySaleStorage, ProductStore, SaleTransaction};
use stockpos_products::NewProduct;

fn setup(products: usize, stock: u64) -> (Arc<SaleTransaction<InMemorySaleStorage>>, Vec<ProductId>) {
    let storage = InMemorySaleStorage::default();
    let ids = (0..products)
        .map(|i| {
            storage
                .products()
                .insert(NewProduct {
                    name: format!("bench-{i}"),
                    description: None,
                    price: Money::from_cents(250),
                    unit_cost: Money::from_cents(120),
                    stock,
                })
                .unwrap()
                .id_typed()
        })
        .collect();
    let tx = SaleTransaction::new(storage).with_max_attempts(u32::MAX);
    (Arc::new(tx), ids)
}

/// Single-threaded latency of one successful sale.
fn bench_sale_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("sale_latency");
    group.sample_size(1000);

    group.bench_function("create_sale", |b| {
        let (tx, ids) = setup(1, u64::MAX / 2);
        b.iter(|| black_box(tx.create_sale(ids[0], 1).unwrap()));
    });

    group.bench_function("rejected_insufficient_stock", |b| {
        let (tx, ids) = setup(1, 0);
        b.iter(|| black_box(tx.create_sale(ids[0], 1).unwrap_err()));
    });

    group.finish();
}

/// Many threads selling: all on one product vs. each on its own product.
fn bench_contention(c: &mut Criterion) {
    let mut group = c.benchmark_group("sale_contention");
    let sales_per_thread = 200u64;

    for threads in [2usize, 4, 8] {
        group.throughput(Throughput::Elements(threads as u64 * sales_per_thread));

        for (label, products) in [("one_product", 1usize), ("product_per_thread", threads)] {
            group.bench_with_input(BenchmarkId::new(label, threads), &threads, |b, &threads| {
                b.iter(|| {
                    let (tx, ids) = setup(products, u64::MAX / 2);
                    let barrier = Arc::new(Barrier::new(threads));
                    let handles: Vec<_> = (0..threads)
                        .map(|t| {
                            let tx = tx.clone();
                            let barrier = barrier.clone();
                            let id = ids[t % ids.len()];
                            thread::spawn(move || {
                                barrier.wait();
                                for _ in 0..sales_per_thread {
                                    tx.create_sale(id, 1).unwrap();
                                }
                            })
                        })
                        .collect();
                    for h in handles {
                        h.join().unwrap();
                    }
                });
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_sale_latency, bench_contention);
criterion_main!(benches);
