use common::{Money, UserId};
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{NewCategory, NewProduct, Product};
use store::{CheckoutTx, MemoryStore, Store};
use uuid::Uuid;

async fn seeded_store(product_count: usize) -> (MemoryStore, UserId, Vec<Product>) {
    let store = MemoryStore::new();
    let user = store
        .create_user("bench", "bench@example.com", "hash")
        .await
        .unwrap();
    let category = store
        .insert_category(&NewCategory::new("Bench", "").unwrap())
        .await
        .unwrap();

    let mut products = Vec::with_capacity(product_count);
    for i in 0..product_count {
        let product = store
            .insert_product(
                &NewProduct::new(
                    category.id,
                    &format!("Product {i:03}"),
                    "",
                    Money::from_cents(10_00),
                )
                .unwrap(),
            )
            .await
            .unwrap();
        products.push(product);
    }

    (store, user.id, products)
}

fn bench_cart_snapshot(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    let (store, user_id) = rt.block_on(async {
        let (store, user_id, products) = seeded_store(10).await;
        for product in &products {
            store.add_cart_line(user_id, product.id, 2).await.unwrap();
        }
        (store, user_id)
    });

    c.bench_function("store/cart_snapshot_10_lines", |b| {
        b.iter(|| {
            rt.block_on(async {
                store.cart_snapshot(user_id).await.unwrap();
            });
        });
    });
}

fn bench_add_cart_line(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    let (store, user_id, products) = rt.block_on(seeded_store(1));
    let product_id = products[0].id;

    c.bench_function("store/add_cart_line_merge", |b| {
        b.iter(|| {
            rt.block_on(async {
                store.add_cart_line(user_id, product_id, 1).await.unwrap();
            });
        });
    });
}

fn bench_checkout_tx_rollback(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    let (store, user_id) = rt.block_on(async {
        let (store, user_id, products) = seeded_store(3).await;
        for product in &products {
            store.add_cart_line(user_id, product.id, 1).await.unwrap();
        }
        (store, user_id)
    });

    c.bench_function("store/checkout_tx_rollback", |b| {
        b.iter(|| {
            rt.block_on(async {
                let mut tx = store.begin().await.unwrap();
                let snapshot = tx.lock_cart_snapshot(user_id).await.unwrap();
                let order_id = tx
                    .insert_order(user_id, snapshot.totals().total_price, Uuid::new_v4())
                    .await
                    .unwrap();
                for line in &snapshot.lines {
                    tx.insert_order_line(order_id, line).await.unwrap();
                }
                tx.rollback().await.unwrap();
            });
        });
    });
}

fn bench_checkout_tx_commit(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("store/checkout_tx_commit", |b| {
        b.iter(|| {
            rt.block_on(async {
                let (store, user_id, products) = seeded_store(1).await;
                store
                    .add_cart_line(user_id, products[0].id, 2)
                    .await
                    .unwrap();

                let mut tx = store.begin().await.unwrap();
                let snapshot = tx.lock_cart_snapshot(user_id).await.unwrap();
                let order_id = tx
                    .insert_order(user_id, snapshot.totals().total_price, Uuid::new_v4())
                    .await
                    .unwrap();
                for line in &snapshot.lines {
                    tx.insert_order_line(order_id, line).await.unwrap();
                }
                tx.mark_order_paid(order_id).await.unwrap();
                tx.clear_cart(user_id).await.unwrap();
                tx.commit().await.unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_cart_snapshot,
    bench_add_cart_line,
    bench_checkout_tx_rollback,
    bench_checkout_tx_commit,
);
criterion_main!(benches);
