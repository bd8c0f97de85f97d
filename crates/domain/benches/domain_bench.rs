use common::{CategoryId, Money, ProductId, UserId};
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{CartLine, CartSnapshot, NewProduct};

fn snapshot_with_lines(count: u32) -> CartSnapshot {
    let lines = (0..count)
        .map(|i| {
            CartLine::new(
                ProductId::new(),
                format!("Product {i}"),
                Money::from_cents(100 + i as i64),
                (i % 5) + 1,
            )
        })
        .collect();
    CartSnapshot::new(UserId::new(), lines)
}

fn bench_cart_totals(c: &mut Criterion) {
    let small = snapshot_with_lines(3);
    let large = snapshot_with_lines(100);

    c.bench_function("domain/cart_totals_3_lines", |b| {
        b.iter(|| small.totals());
    });

    c.bench_function("domain/cart_totals_100_lines", |b| {
        b.iter(|| large.totals());
    });
}

fn bench_product_validation(c: &mut Criterion) {
    let category = CategoryId::new();

    c.bench_function("domain/new_product_validation", |b| {
        b.iter(|| {
            NewProduct::new(
                category,
                "Mechanical Keyboard",
                "Tactile switches",
                Money::from_cents(12_900),
            )
            .unwrap()
        });
    });
}

criterion_group!(benches, bench_cart_totals, bench_product_validation);
criterion_main!(benches);
