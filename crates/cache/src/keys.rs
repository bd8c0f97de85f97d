//! Cache key layout.
//!
//! Every cached view of an entity has exactly one key, and every mutation
//! deletes the full set of keys that could hold a stale view of it,
//! including the list keys and the cross-entity products-by-category key.

use common::{CategoryId, ProductId};

/// Key holding the full product list.
pub const PRODUCTS: &str = "products";

/// Key holding the full category list.
pub const CATEGORIES: &str = "categories";

/// Key holding a single product.
pub fn product(id: ProductId) -> String {
    format!("product:{id}")
}

/// Key holding a single category.
pub fn category(id: CategoryId) -> String {
    format!("category:{id}")
}

/// Key holding the products of one category.
pub fn category_products(id: CategoryId) -> String {
    format!("category:{id}:products")
}

/// Keys to delete when a product is created under `category_id`.
pub fn product_create_keys(category_id: CategoryId) -> Vec<String> {
    vec![PRODUCTS.to_string(), category_products(category_id)]
}

/// Keys to delete when a product is updated or deleted.
pub fn product_write_keys(id: ProductId, category_id: CategoryId) -> Vec<String> {
    vec![
        PRODUCTS.to_string(),
        product(id),
        category_products(category_id),
    ]
}

/// Keys to delete when a category is created.
pub fn category_create_keys() -> Vec<String> {
    vec![CATEGORIES.to_string()]
}

/// Keys to delete when a category is updated.
pub fn category_update_keys(id: CategoryId) -> Vec<String> {
    vec![CATEGORIES.to_string(), category(id)]
}

/// Keys to delete when a category is deleted.
pub fn category_delete_keys(id: CategoryId) -> Vec<String> {
    vec![
        CATEGORIES.to_string(),
        category(id),
        category_products(id),
    ]
}
