use async_trait::async_trait;
use common::{CategoryId, Money, OrderId, ProductId, UserId};
use domain::{
    CartLine, CartSnapshot, Category, CategoryUpdate, NewCategory, NewProduct, PlacedOrder,
    Product, ProductUpdate, User,
};
use uuid::Uuid;

use crate::Result;

/// Core trait for store implementations.
///
/// Covers account, catalog, and cart persistence plus the entry point
/// into a checkout transaction. All implementations must be thread-safe
/// (Send + Sync).
#[async_trait]
pub trait Store: Send + Sync {
    /// Transaction handle for a checkout attempt.
    type Tx: CheckoutTx;

    /// Inserts a user and their empty cart atomically.
    ///
    /// Fails with `Duplicate` if the username or email is already taken.
    async fn create_user(&self, username: &str, email: &str, password_hash: &str)
    -> Result<User>;

    /// Looks a user up by username, for login.
    async fn user_by_username(&self, username: &str) -> Result<User>;

    /// Inserts a category.
    ///
    /// Fails with `Duplicate` if the name is already taken.
    async fn insert_category(&self, input: &NewCategory) -> Result<Category>;

    /// Fetches one category by id.
    async fn category(&self, id: CategoryId) -> Result<Category>;

    /// Lists all categories, ordered by name.
    async fn categories(&self) -> Result<Vec<Category>>;

    /// Replaces a category's display fields.
    async fn update_category(&self, id: CategoryId, update: &CategoryUpdate) -> Result<Category>;

    /// Deletes a category.
    ///
    /// Fails with `Conflict` while products still reference it.
    async fn delete_category(&self, id: CategoryId) -> Result<()>;

    /// Inserts a product into an existing category.
    async fn insert_product(&self, input: &NewProduct) -> Result<Product>;

    /// Fetches one product by id.
    async fn product(&self, id: ProductId) -> Result<Product>;

    /// Lists all products, ordered by name.
    async fn products(&self) -> Result<Vec<Product>>;

    /// Lists the products of one category, ordered by name.
    ///
    /// Fails with `NotFound` if the category itself does not exist, so
    /// an unknown id is distinguishable from an empty category.
    async fn products_by_category(&self, category_id: CategoryId) -> Result<Vec<Product>>;

    /// Updates a product's name, description, and price. The owning
    /// category cannot be changed.
    async fn update_product(&self, id: ProductId, update: &ProductUpdate) -> Result<Product>;

    /// Deletes a product and drops it from every cart.
    ///
    /// Fails with `Conflict` if the product appears on a placed order.
    async fn delete_product(&self, id: ProductId) -> Result<()>;

    /// Reads the user's cart with names and prices resolved from the
    /// live catalog, ordered by product name.
    async fn cart_snapshot(&self, user_id: UserId) -> Result<CartSnapshot>;

    /// Adds a product to the cart. If the product is already in the
    /// cart, the quantities are merged.
    ///
    /// Returns the updated snapshot.
    async fn add_cart_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartSnapshot>;

    /// Replaces the quantity of an existing cart line.
    ///
    /// Returns the updated snapshot. Fails with `NotFound` if the
    /// product is not in the cart.
    async fn set_cart_line_quantity(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartSnapshot>;

    /// Removes one product from the cart.
    ///
    /// Returns the updated snapshot. Fails with `NotFound` if the
    /// product is not in the cart.
    async fn remove_cart_line(&self, user_id: UserId, product_id: ProductId)
    -> Result<CartSnapshot>;

    /// Deletes every line in the user's cart.
    async fn empty_cart(&self, user_id: UserId) -> Result<()>;

    /// Returns the user's orders, newest first, with their lines.
    ///
    /// Line names are joined from the live catalog; unit prices are the
    /// ones frozen at checkout.
    async fn order_history(&self, user_id: UserId) -> Result<Vec<PlacedOrder>>;

    /// Opens a checkout transaction.
    async fn begin(&self) -> Result<Self::Tx>;
}

/// A transaction scoped to one checkout attempt.
///
/// Writes made through the handle are invisible to other readers until
/// `commit`. Dropping the handle, or calling `rollback`, leaves no trace
/// of the attempt.
#[async_trait]
pub trait CheckoutTx: Send {
    /// Takes a row-level lock on the user's cart and re-reads the lines
    /// under that lock.
    ///
    /// Concurrent checkouts for the same user serialize here; the loser
    /// observes whatever cart the winner left behind.
    async fn lock_cart_snapshot(&mut self, user_id: UserId) -> Result<CartSnapshot>;

    /// Inserts a pending order row and returns its id.
    async fn insert_order(
        &mut self,
        user_id: UserId,
        total: Money,
        payment_key: Uuid,
    ) -> Result<OrderId>;

    /// Copies one cart line onto the order, freezing its unit price.
    async fn insert_order_line(&mut self, order_id: OrderId, line: &CartLine) -> Result<()>;

    /// Marks the order as paid.
    async fn mark_order_paid(&mut self, order_id: OrderId) -> Result<()>;

    /// Deletes every line in the user's cart.
    async fn clear_cart(&mut self, user_id: UserId) -> Result<()>;

    /// Commits the transaction, making all writes visible at once.
    async fn commit(self) -> Result<()>;

    /// Rolls the transaction back explicitly.
    async fn rollback(self) -> Result<()>;
}
