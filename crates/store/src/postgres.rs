use async_trait::async_trait;
use common::{CartId, CategoryId, Money, OrderId, ProductId, UserId};
use domain::{
    CartLine, CartSnapshot, Category, CategoryUpdate, NewCategory, NewProduct, Order, OrderLine,
    OrderStatus, PlacedOrder, Product, ProductUpdate, User,
};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use crate::{
    Result, StoreError,
    store::{CheckoutTx, Store},
};

/// PostgreSQL-backed store implementation.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Creates a new PostgreSQL store over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to the database and returns a store over a fresh pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_user(row: PgRow) -> Result<User> {
        Ok(User {
            id: UserId::from_uuid(row.try_get::<Uuid, _>("id")?),
            username: row.try_get("username")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_category(row: PgRow) -> Result<Category> {
        Ok(Category {
            id: CategoryId::from_uuid(row.try_get::<Uuid, _>("id")?),
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        Ok(Product {
            id: ProductId::from_uuid(row.try_get::<Uuid, _>("id")?),
            category_id: CategoryId::from_uuid(row.try_get::<Uuid, _>("category_id")?),
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            price: Money::from_cents(row.try_get("price_cents")?),
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_cart_line(row: PgRow) -> Result<CartLine> {
        Ok(CartLine {
            product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
            name: row.try_get("name")?,
            unit_price: Money::from_cents(row.try_get("price_cents")?),
            quantity: row.try_get::<i32, _>("quantity")? as u32,
        })
    }

    async fn cart_id_for_user(&self, user_id: UserId) -> Result<Uuid> {
        let row = sqlx::query("SELECT id FROM carts WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(row.try_get("id")?),
            None => Err(StoreError::CartMissing(user_id)),
        }
    }
}

const CART_LINES_SQL: &str = r#"
    SELECT ci.product_id, p.name, p.price_cents, ci.quantity
    FROM cart_items ci
    JOIN products p ON p.id = ci.product_id
    WHERE ci.cart_id = $1
    ORDER BY p.name ASC, ci.product_id ASC
"#;

#[async_trait]
impl Store for PgStore {
    type Tx = PgCheckoutTx;

    async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User> {
        let user = User::new(username, email, password_hash);

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, password_hash, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e {
                if db_err.constraint() == Some("users_username_key") {
                    return StoreError::Duplicate("username");
                }
                if db_err.constraint() == Some("users_email_key") {
                    return StoreError::Duplicate("email");
                }
            }
            StoreError::Database(e)
        })?;

        // The cart is created with the user, so cart reads never race
        // registration.
        sqlx::query("INSERT INTO carts (id, user_id, created_at) VALUES ($1, $2, $3)")
            .bind(CartId::new().as_uuid())
            .bind(user.id.as_uuid())
            .bind(user.created_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(user)
    }

    async fn user_by_username(&self, username: &str) -> Result<User> {
        let row = sqlx::query(
            "SELECT id, username, email, password_hash, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::row_to_user(row),
            None => Err(StoreError::not_found("user", username)),
        }
    }

    async fn insert_category(&self, input: &NewCategory) -> Result<Category> {
        let category = Category::new(&input.name, &input.description);

        sqlx::query(
            r#"
            INSERT INTO categories (id, name, description, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(category.id.as_uuid())
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("categories_name_key")
            {
                return StoreError::Duplicate("category name");
            }
            StoreError::Database(e)
        })?;

        Ok(category)
    }

    async fn category(&self, id: CategoryId) -> Result<Category> {
        let row =
            sqlx::query("SELECT id, name, description, created_at FROM categories WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some(row) => Self::row_to_category(row),
            None => Err(StoreError::not_found("category", id)),
        }
    }

    async fn categories(&self) -> Result<Vec<Category>> {
        let rows = sqlx::query(
            "SELECT id, name, description, created_at FROM categories ORDER BY name ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_category).collect()
    }

    async fn update_category(&self, id: CategoryId, update: &CategoryUpdate) -> Result<Category> {
        let row = sqlx::query(
            r#"
            UPDATE categories
            SET name = $2, description = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, description, created_at
            "#,
        )
        .bind(id.as_uuid())
        .bind(&update.name)
        .bind(&update.description)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("categories_name_key")
            {
                return StoreError::Duplicate("category name");
            }
            StoreError::Database(e)
        })?;

        match row {
            Some(row) => Self::row_to_category(row),
            None => Err(StoreError::not_found("category", id)),
        }
    }

    async fn delete_category(&self, id: CategoryId) -> Result<()> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.constraint() == Some("products_category_id_fkey")
                {
                    return StoreError::Conflict("Category still has products".into());
                }
                StoreError::Database(e)
            })?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("category", id));
        }
        Ok(())
    }

    async fn insert_product(&self, input: &NewProduct) -> Result<Product> {
        let product = Product::new(
            input.category_id,
            &input.name,
            &input.description,
            input.price,
        );

        sqlx::query(
            r#"
            INSERT INTO products (id, name, description, price_cents, category_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price.cents())
        .bind(product.category_id.as_uuid())
        .bind(product.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("products_category_id_fkey")
            {
                return StoreError::not_found("category", input.category_id);
            }
            StoreError::Database(e)
        })?;

        Ok(product)
    }

    async fn product(&self, id: ProductId) -> Result<Product> {
        let row = sqlx::query(
            r#"
            SELECT id, category_id, name, description, price_cents, created_at
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::row_to_product(row),
            None => Err(StoreError::not_found("product", id)),
        }
    }

    async fn products(&self) -> Result<Vec<Product>> {
        let rows = sqlx::query(
            r#"
            SELECT id, category_id, name, description, price_cents, created_at
            FROM products
            ORDER BY name ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_product).collect()
    }

    async fn products_by_category(&self, category_id: CategoryId) -> Result<Vec<Product>> {
        let category = sqlx::query("SELECT id FROM categories WHERE id = $1")
            .bind(category_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        if category.is_none() {
            return Err(StoreError::not_found("category", category_id));
        }

        let rows = sqlx::query(
            r#"
            SELECT id, category_id, name, description, price_cents, created_at
            FROM products
            WHERE category_id = $1
            ORDER BY name ASC, id ASC
            "#,
        )
        .bind(category_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_product).collect()
    }

    async fn update_product(&self, id: ProductId, update: &ProductUpdate) -> Result<Product> {
        let row = sqlx::query(
            r#"
            UPDATE products
            SET name = $2, description = $3, price_cents = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING id, category_id, name, description, price_cents, created_at
            "#,
        )
        .bind(id.as_uuid())
        .bind(&update.name)
        .bind(&update.description)
        .bind(update.price.cents())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::row_to_product(row),
            None => Err(StoreError::not_found("product", id)),
        }
    }

    async fn delete_product(&self, id: ProductId) -> Result<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.constraint() == Some("order_items_product_id_fkey")
                {
                    return StoreError::Conflict("Product appears in order history".into());
                }
                StoreError::Database(e)
            })?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("product", id));
        }
        Ok(())
    }

    async fn cart_snapshot(&self, user_id: UserId) -> Result<CartSnapshot> {
        let cart_id = self.cart_id_for_user(user_id).await?;

        let rows = sqlx::query(CART_LINES_SQL)
            .bind(cart_id)
            .fetch_all(&self.pool)
            .await?;

        let lines = rows
            .into_iter()
            .map(Self::row_to_cart_line)
            .collect::<Result<Vec<_>>>()?;
        Ok(CartSnapshot::new(user_id, lines))
    }

    async fn add_cart_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartSnapshot> {
        let cart_id = self.cart_id_for_user(user_id).await?;

        sqlx::query(
            r#"
            INSERT INTO cart_items (cart_id, product_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (cart_id, product_id)
            DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity
            "#,
        )
        .bind(cart_id)
        .bind(product_id.as_uuid())
        .bind(quantity as i32)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("cart_items_product_id_fkey")
            {
                return StoreError::not_found("product", product_id);
            }
            StoreError::Database(e)
        })?;

        self.cart_snapshot(user_id).await
    }

    async fn set_cart_line_quantity(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartSnapshot> {
        let cart_id = self.cart_id_for_user(user_id).await?;

        let result = sqlx::query(
            "UPDATE cart_items SET quantity = $3 WHERE cart_id = $1 AND product_id = $2",
        )
        .bind(cart_id)
        .bind(product_id.as_uuid())
        .bind(quantity as i32)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("cart item", product_id));
        }

        self.cart_snapshot(user_id).await
    }

    async fn remove_cart_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<CartSnapshot> {
        let cart_id = self.cart_id_for_user(user_id).await?;

        let result =
            sqlx::query("DELETE FROM cart_items WHERE cart_id = $1 AND product_id = $2")
                .bind(cart_id)
                .bind(product_id.as_uuid())
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("cart item", product_id));
        }

        self.cart_snapshot(user_id).await
    }

    async fn empty_cart(&self, user_id: UserId) -> Result<()> {
        let cart_id = self.cart_id_for_user(user_id).await?;

        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(cart_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn order_history(&self, user_id: UserId) -> Result<Vec<PlacedOrder>> {
        let order_rows = sqlx::query(
            r#"
            SELECT id, status, total_cents, created_at
            FROM orders
            WHERE user_id = $1
            ORDER BY created_at DESC, id ASC
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        let mut orders = Vec::with_capacity(order_rows.len());
        for row in order_rows {
            let status_raw: String = row.try_get("status")?;
            let status = OrderStatus::parse(&status_raw).ok_or_else(|| {
                StoreError::Decode(format!("unknown order status: {status_raw}"))
            })?;

            orders.push(PlacedOrder {
                id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
                status,
                total: Money::from_cents(row.try_get("total_cents")?),
                created_at: row.try_get("created_at")?,
                lines: Vec::new(),
            });
        }

        if orders.is_empty() {
            return Ok(orders);
        }

        // Display fields come from the live catalog; COALESCE keeps history
        // readable if a product row ever disappears outside the api.
        let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id.as_uuid()).collect();
        let line_rows = sqlx::query(
            r#"
            SELECT oi.order_id, oi.product_id, COALESCE(p.name, '') AS name,
                   COALESCE(p.description, '') AS description,
                   oi.unit_price_cents, oi.quantity
            FROM order_items oi
            LEFT JOIN products p ON p.id = oi.product_id
            WHERE oi.order_id = ANY($1)
            ORDER BY oi.product_id ASC
            "#,
        )
        .bind(&order_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut lines_by_order: std::collections::HashMap<Uuid, Vec<OrderLine>> =
            std::collections::HashMap::new();
        for row in line_rows {
            let order_id: Uuid = row.try_get("order_id")?;
            lines_by_order
                .entry(order_id)
                .or_default()
                .push(OrderLine {
                    product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
                    name: row.try_get("name")?,
                    description: row.try_get("description")?,
                    unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
                    quantity: row.try_get::<i32, _>("quantity")? as u32,
                });
        }

        for order in &mut orders {
            if let Some(lines) = lines_by_order.remove(&order.id.as_uuid()) {
                order.lines = lines;
            }
        }

        Ok(orders)
    }

    async fn begin(&self) -> Result<Self::Tx> {
        let tx = self.pool.begin().await?;
        Ok(PgCheckoutTx { tx })
    }
}

/// A checkout transaction over a PostgreSQL connection.
pub struct PgCheckoutTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl CheckoutTx for PgCheckoutTx {
    async fn lock_cart_snapshot(&mut self, user_id: UserId) -> Result<CartSnapshot> {
        // FOR UPDATE serializes checkouts per user; the lock is held until
        // the transaction ends.
        let row = sqlx::query("SELECT id FROM carts WHERE user_id = $1 FOR UPDATE")
            .bind(user_id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?;

        let cart_id: Uuid = match row {
            Some(row) => row.try_get("id")?,
            None => return Err(StoreError::CartMissing(user_id)),
        };

        let rows = sqlx::query(CART_LINES_SQL)
            .bind(cart_id)
            .fetch_all(&mut *self.tx)
            .await?;

        let lines = rows
            .into_iter()
            .map(PgStore::row_to_cart_line)
            .collect::<Result<Vec<_>>>()?;
        Ok(CartSnapshot::new(user_id, lines))
    }

    async fn insert_order(
        &mut self,
        user_id: UserId,
        total: Money,
        payment_key: Uuid,
    ) -> Result<OrderId> {
        let order = Order::new(user_id, total, payment_key);

        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, status, total_cents, payment_key, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.user_id.as_uuid())
        .bind(order.status.as_str())
        .bind(order.total.cents())
        .bind(order.payment_key)
        .bind(order.created_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(order.id)
    }

    async fn insert_order_line(&mut self, order_id: OrderId, line: &CartLine) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO order_items (id, order_id, product_id, quantity, unit_price_cents)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(order_id.as_uuid())
        .bind(line.product_id.as_uuid())
        .bind(line.quantity as i32)
        .bind(line.unit_price.cents())
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn mark_order_paid(&mut self, order_id: OrderId) -> Result<()> {
        let result =
            sqlx::query("UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1")
                .bind(order_id.as_uuid())
                .bind(OrderStatus::Paid.as_str())
                .execute(&mut *self.tx)
                .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("order", order_id));
        }
        Ok(())
    }

    async fn clear_cart(&mut self, user_id: UserId) -> Result<()> {
        sqlx::query(
            "DELETE FROM cart_items WHERE cart_id IN (SELECT id FROM carts WHERE user_id = $1)",
        )
        .bind(user_id.as_uuid())
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
