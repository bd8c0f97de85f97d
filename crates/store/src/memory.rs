use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use common::{CategoryId, Money, OrderId, ProductId, UserId};
use domain::{
    CartLine, CartSnapshot, Category, CategoryUpdate, NewCategory, NewProduct, Order, OrderLine,
    OrderStatus, PlacedOrder, Product, ProductUpdate, User,
};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use uuid::Uuid;

use crate::{
    Result, StoreError,
    store::{CheckoutTx, Store},
};

#[derive(Debug, Clone)]
struct StoredCartLine {
    product_id: ProductId,
    quantity: u32,
}

#[derive(Debug, Clone)]
struct StoredOrderLine {
    product_id: ProductId,
    quantity: u32,
    unit_price: Money,
}

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    carts: HashMap<UserId, Vec<StoredCartLine>>,
    categories: HashMap<CategoryId, Category>,
    products: HashMap<ProductId, Product>,
    orders: Vec<Order>,
    order_lines: HashMap<OrderId, Vec<StoredOrderLine>>,
}

#[derive(Default)]
struct Toggles {
    fail_on_begin: AtomicBool,
    fail_on_insert_order: AtomicBool,
    fail_on_commit: AtomicBool,
    begin_count: AtomicUsize,
}

/// In-memory store implementation for testing.
///
/// Mirrors the PostgreSQL implementation, including checkout
/// transactions: writes made through a [`MemoryTx`] are staged and
/// applied atomically on commit, and concurrent checkouts for one user
/// serialize on a per-user cart lock.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
    cart_locks: Arc<Mutex<HashMap<UserId, Arc<Mutex<()>>>>>,
    toggles: Arc<Toggles>,
}

impl MemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `begin` calls fail, as a closed pool would.
    pub fn set_fail_on_begin(&self, fail: bool) {
        self.toggles.fail_on_begin.store(fail, Ordering::SeqCst);
    }

    /// Makes order inserts fail mid-transaction.
    pub fn set_fail_on_insert_order(&self, fail: bool) {
        self.toggles
            .fail_on_insert_order
            .store(fail, Ordering::SeqCst);
    }

    /// Makes commits fail after every write succeeded.
    pub fn set_fail_on_commit(&self, fail: bool) {
        self.toggles.fail_on_commit.store(fail, Ordering::SeqCst);
    }

    /// Number of checkout transactions opened so far.
    pub fn begin_count(&self) -> usize {
        self.toggles.begin_count.load(Ordering::SeqCst)
    }

    /// Total number of order rows.
    pub async fn order_count(&self) -> usize {
        self.tables.read().await.orders.len()
    }

    /// Returns every stored order for the user, newest first.
    pub async fn orders_for_user(&self, user_id: UserId) -> Vec<Order> {
        let tables = self.tables.read().await;
        let mut orders: Vec<Order> = tables
            .orders
            .iter()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        orders
    }

    async fn cart_lock(&self, user_id: UserId) -> Arc<Mutex<()>> {
        let mut locks = self.cart_locks.lock().await;
        locks.entry(user_id).or_default().clone()
    }

    fn resolve_lines(tables: &Tables, stored: &[StoredCartLine]) -> Vec<CartLine> {
        let mut lines: Vec<CartLine> = stored
            .iter()
            .filter_map(|line| {
                tables.products.get(&line.product_id).map(|product| {
                    CartLine::new(line.product_id, &product.name, product.price, line.quantity)
                })
            })
            .collect();
        lines.sort_by(|a, b| {
            a.name
                .cmp(&b.name)
                .then(a.product_id.as_uuid().cmp(&b.product_id.as_uuid()))
        });
        lines
    }

    fn snapshot_inner(tables: &Tables, user_id: UserId) -> Result<CartSnapshot> {
        let stored = tables
            .carts
            .get(&user_id)
            .ok_or(StoreError::CartMissing(user_id))?;
        Ok(CartSnapshot::new(
            user_id,
            Self::resolve_lines(tables, stored),
        ))
    }
}

#[async_trait]
impl Store for MemoryStore {
    type Tx = MemoryTx;

    async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User> {
        let mut tables = self.tables.write().await;

        if tables.users.iter().any(|u| u.username == username) {
            return Err(StoreError::Duplicate("username"));
        }
        if tables.users.iter().any(|u| u.email == email) {
            return Err(StoreError::Duplicate("email"));
        }

        let user = User::new(username, email, password_hash);
        tables.carts.insert(user.id, Vec::new());
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn user_by_username(&self, username: &str) -> Result<User> {
        let tables = self.tables.read().await;
        tables
            .users
            .iter()
            .find(|u| u.username == username)
            .cloned()
            .ok_or_else(|| StoreError::not_found("user", username))
    }

    async fn insert_category(&self, input: &NewCategory) -> Result<Category> {
        let mut tables = self.tables.write().await;

        if tables.categories.values().any(|c| c.name == input.name) {
            return Err(StoreError::Duplicate("category name"));
        }

        let category = Category::new(&input.name, &input.description);
        tables.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn category(&self, id: CategoryId) -> Result<Category> {
        let tables = self.tables.read().await;
        tables
            .categories
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("category", id))
    }

    async fn categories(&self) -> Result<Vec<Category>> {
        let tables = self.tables.read().await;
        let mut categories: Vec<Category> = tables.categories.values().cloned().collect();
        categories.sort_by(|a, b| {
            a.name
                .cmp(&b.name)
                .then(a.id.as_uuid().cmp(&b.id.as_uuid()))
        });
        Ok(categories)
    }

    async fn update_category(&self, id: CategoryId, update: &CategoryUpdate) -> Result<Category> {
        let mut tables = self.tables.write().await;

        if !tables.categories.contains_key(&id) {
            return Err(StoreError::not_found("category", id));
        }
        if tables
            .categories
            .values()
            .any(|c| c.id != id && c.name == update.name)
        {
            return Err(StoreError::Duplicate("category name"));
        }

        let category = tables
            .categories
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("category", id))?;
        category.name = update.name.clone();
        category.description = update.description.clone();
        Ok(category.clone())
    }

    async fn delete_category(&self, id: CategoryId) -> Result<()> {
        let mut tables = self.tables.write().await;

        if tables.products.values().any(|p| p.category_id == id) {
            return Err(StoreError::Conflict("Category still has products".into()));
        }
        if tables.categories.remove(&id).is_none() {
            return Err(StoreError::not_found("category", id));
        }
        Ok(())
    }

    async fn insert_product(&self, input: &NewProduct) -> Result<Product> {
        let mut tables = self.tables.write().await;

        if !tables.categories.contains_key(&input.category_id) {
            return Err(StoreError::not_found("category", input.category_id));
        }

        let product = Product::new(
            input.category_id,
            &input.name,
            &input.description,
            input.price,
        );
        tables.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn product(&self, id: ProductId) -> Result<Product> {
        let tables = self.tables.read().await;
        tables
            .products
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("product", id))
    }

    async fn products(&self) -> Result<Vec<Product>> {
        let tables = self.tables.read().await;
        let mut products: Vec<Product> = tables.products.values().cloned().collect();
        products.sort_by(|a, b| {
            a.name
                .cmp(&b.name)
                .then(a.id.as_uuid().cmp(&b.id.as_uuid()))
        });
        Ok(products)
    }

    async fn products_by_category(&self, category_id: CategoryId) -> Result<Vec<Product>> {
        let tables = self.tables.read().await;

        if !tables.categories.contains_key(&category_id) {
            return Err(StoreError::not_found("category", category_id));
        }

        let mut products: Vec<Product> = tables
            .products
            .values()
            .filter(|p| p.category_id == category_id)
            .cloned()
            .collect();
        products.sort_by(|a, b| {
            a.name
                .cmp(&b.name)
                .then(a.id.as_uuid().cmp(&b.id.as_uuid()))
        });
        Ok(products)
    }

    async fn update_product(&self, id: ProductId, update: &ProductUpdate) -> Result<Product> {
        let mut tables = self.tables.write().await;

        let product = tables
            .products
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("product", id))?;
        product.name = update.name.clone();
        product.description = update.description.clone();
        product.price = update.price;
        Ok(product.clone())
    }

    async fn delete_product(&self, id: ProductId) -> Result<()> {
        let mut tables = self.tables.write().await;

        let referenced = tables
            .order_lines
            .values()
            .flatten()
            .any(|line| line.product_id == id);
        if referenced {
            return Err(StoreError::Conflict(
                "Product appears in order history".into(),
            ));
        }

        if tables.products.remove(&id).is_none() {
            return Err(StoreError::not_found("product", id));
        }

        // Cart lines cascade with the product.
        for lines in tables.carts.values_mut() {
            lines.retain(|line| line.product_id != id);
        }
        Ok(())
    }

    async fn cart_snapshot(&self, user_id: UserId) -> Result<CartSnapshot> {
        let tables = self.tables.read().await;
        Self::snapshot_inner(&tables, user_id)
    }

    async fn add_cart_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartSnapshot> {
        let mut tables = self.tables.write().await;

        if !tables.carts.contains_key(&user_id) {
            return Err(StoreError::CartMissing(user_id));
        }
        if !tables.products.contains_key(&product_id) {
            return Err(StoreError::not_found("product", product_id));
        }

        let stored = tables
            .carts
            .get_mut(&user_id)
            .ok_or(StoreError::CartMissing(user_id))?;
        match stored.iter_mut().find(|line| line.product_id == product_id) {
            Some(line) => line.quantity += quantity,
            None => stored.push(StoredCartLine {
                product_id,
                quantity,
            }),
        }

        Self::snapshot_inner(&tables, user_id)
    }

    async fn set_cart_line_quantity(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartSnapshot> {
        let mut tables = self.tables.write().await;

        let stored = tables
            .carts
            .get_mut(&user_id)
            .ok_or(StoreError::CartMissing(user_id))?;
        match stored.iter_mut().find(|line| line.product_id == product_id) {
            Some(line) => line.quantity = quantity,
            None => return Err(StoreError::not_found("cart item", product_id)),
        }

        Self::snapshot_inner(&tables, user_id)
    }

    async fn remove_cart_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<CartSnapshot> {
        let mut tables = self.tables.write().await;

        let stored = tables
            .carts
            .get_mut(&user_id)
            .ok_or(StoreError::CartMissing(user_id))?;
        let before = stored.len();
        stored.retain(|line| line.product_id != product_id);
        if stored.len() == before {
            return Err(StoreError::not_found("cart item", product_id));
        }

        Self::snapshot_inner(&tables, user_id)
    }

    async fn empty_cart(&self, user_id: UserId) -> Result<()> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .carts
            .get_mut(&user_id)
            .ok_or(StoreError::CartMissing(user_id))?;
        stored.clear();
        Ok(())
    }

    async fn order_history(&self, user_id: UserId) -> Result<Vec<PlacedOrder>> {
        let tables = self.tables.read().await;

        let mut orders: Vec<&Order> = tables
            .orders
            .iter()
            .filter(|o| o.user_id == user_id)
            .collect();
        orders.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(a.id.as_uuid().cmp(&b.id.as_uuid()))
        });

        Ok(orders
            .into_iter()
            .map(|order| {
                let mut lines: Vec<OrderLine> = tables
                    .order_lines
                    .get(&order.id)
                    .map(|stored| {
                        stored
                            .iter()
                            .map(|line| {
                                let product = tables.products.get(&line.product_id);
                                OrderLine {
                                    product_id: line.product_id,
                                    name: product
                                        .map(|p| p.name.clone())
                                        .unwrap_or_default(),
                                    description: product
                                        .map(|p| p.description.clone())
                                        .unwrap_or_default(),
                                    unit_price: line.unit_price,
                                    quantity: line.quantity,
                                }
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                lines.sort_by(|a, b| a.product_id.as_uuid().cmp(&b.product_id.as_uuid()));

                PlacedOrder {
                    id: order.id,
                    status: order.status,
                    total: order.total,
                    created_at: order.created_at,
                    lines,
                }
            })
            .collect())
    }

    async fn begin(&self) -> Result<Self::Tx> {
        if self.toggles.fail_on_begin.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolClosed));
        }
        self.toggles.begin_count.fetch_add(1, Ordering::SeqCst);

        Ok(MemoryTx {
            store: self.clone(),
            staged: Vec::new(),
            cart_guard: None,
        })
    }
}

enum StagedWrite {
    InsertOrder(Order),
    InsertOrderLine(OrderId, StoredOrderLine),
    MarkPaid(OrderId),
    ClearCart(UserId),
}

/// A staged checkout transaction over the in-memory store.
///
/// Holds the per-user cart lock from `lock_cart_snapshot` until the
/// transaction ends, mirroring a row lock held to commit or rollback.
pub struct MemoryTx {
    store: MemoryStore,
    staged: Vec<StagedWrite>,
    cart_guard: Option<OwnedMutexGuard<()>>,
}

#[async_trait]
impl CheckoutTx for MemoryTx {
    async fn lock_cart_snapshot(&mut self, user_id: UserId) -> Result<CartSnapshot> {
        if self.cart_guard.is_none() {
            let lock = self.store.cart_lock(user_id).await;
            self.cart_guard = Some(lock.lock_owned().await);
        }

        let tables = self.store.tables.read().await;
        MemoryStore::snapshot_inner(&tables, user_id)
    }

    async fn insert_order(
        &mut self,
        user_id: UserId,
        total: Money,
        payment_key: Uuid,
    ) -> Result<OrderId> {
        if self
            .store
            .toggles
            .fail_on_insert_order
            .load(Ordering::SeqCst)
        {
            return Err(StoreError::Database(sqlx::Error::PoolClosed));
        }

        let order = Order::new(user_id, total, payment_key);
        let id = order.id;
        self.staged.push(StagedWrite::InsertOrder(order));
        Ok(id)
    }

    async fn insert_order_line(&mut self, order_id: OrderId, line: &CartLine) -> Result<()> {
        self.staged.push(StagedWrite::InsertOrderLine(
            order_id,
            StoredOrderLine {
                product_id: line.product_id,
                quantity: line.quantity,
                unit_price: line.unit_price,
            },
        ));
        Ok(())
    }

    async fn mark_order_paid(&mut self, order_id: OrderId) -> Result<()> {
        let staged_here = self
            .staged
            .iter()
            .any(|w| matches!(w, StagedWrite::InsertOrder(o) if o.id == order_id));
        if !staged_here {
            let tables = self.store.tables.read().await;
            if !tables.orders.iter().any(|o| o.id == order_id) {
                return Err(StoreError::not_found("order", order_id));
            }
        }

        self.staged.push(StagedWrite::MarkPaid(order_id));
        Ok(())
    }

    async fn clear_cart(&mut self, user_id: UserId) -> Result<()> {
        self.staged.push(StagedWrite::ClearCart(user_id));
        Ok(())
    }

    async fn commit(self) -> Result<()> {
        if self.store.toggles.fail_on_commit.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolClosed));
        }

        let mut tables = self.store.tables.write().await;
        for write in self.staged {
            match write {
                StagedWrite::InsertOrder(order) => tables.orders.push(order),
                StagedWrite::InsertOrderLine(order_id, line) => {
                    tables.order_lines.entry(order_id).or_default().push(line);
                }
                StagedWrite::MarkPaid(order_id) => {
                    if let Some(order) = tables.orders.iter_mut().find(|o| o.id == order_id) {
                        order.status = OrderStatus::Paid;
                    }
                }
                StagedWrite::ClearCart(user_id) => {
                    if let Some(lines) = tables.carts.get_mut(&user_id) {
                        lines.clear();
                    }
                }
            }
        }
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        Ok(())
    }
}
