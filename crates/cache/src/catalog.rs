use std::time::Duration;

use common::{CategoryId, ProductId};
use domain::{Category, CategoryUpdate, NewCategory, NewProduct, Product, ProductUpdate};
use serde::Serialize;
use serde::de::DeserializeOwned;
use store::{Store, StoreError};
use thiserror::Error;

use crate::{Cache, CacheError, keys};

/// Error from a cached catalog operation.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The authoritative store rejected or failed the operation.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The mutation persisted but its invalidation did not, so reads may
    /// serve a stale view until the TTL expires.
    #[error("cache invalidation failed: {0}")]
    Invalidation(#[source] CacheError),
}

type Result<T> = std::result::Result<T, CatalogError>;

/// Read-through cache over the catalog portion of a [`Store`].
///
/// Reads try the cache first and fall back to the store, populating the
/// cache on the way out. A cache failure on the read path degrades to a
/// plain store read. Mutations write the store first and then delete
/// every key that could hold a stale view; a mutation does not count as
/// complete until that delete succeeds.
#[derive(Clone)]
pub struct CachedCatalog<S, C> {
    store: S,
    cache: C,
    ttl: Duration,
}

impl<S, C> CachedCatalog<S, C> {
    /// Wraps `store` with `cache`, caching entries for `ttl`.
    pub fn new(store: S, cache: C, ttl: Duration) -> Self {
        Self { store, cache, ttl }
    }
}

impl<S: Store, C: Cache> CachedCatalog<S, C> {
    #[tracing::instrument(skip(self))]
    pub async fn categories(&self) -> Result<Vec<Category>> {
        if let Some(cached) = self.lookup::<Vec<Category>>(keys::CATEGORIES).await {
            return Ok(cached);
        }

        let categories = self.store.categories().await?;
        self.populate(keys::CATEGORIES, &categories).await;
        Ok(categories)
    }

    #[tracing::instrument(skip(self))]
    pub async fn category(&self, id: CategoryId) -> Result<Category> {
        let key = keys::category(id);
        if let Some(cached) = self.lookup::<Category>(&key).await {
            return Ok(cached);
        }

        let category = self.store.category(id).await?;
        self.populate(&key, &category).await;
        Ok(category)
    }

    #[tracing::instrument(skip(self))]
    pub async fn products(&self) -> Result<Vec<Product>> {
        if let Some(cached) = self.lookup::<Vec<Product>>(keys::PRODUCTS).await {
            return Ok(cached);
        }

        let products = self.store.products().await?;
        self.populate(keys::PRODUCTS, &products).await;
        Ok(products)
    }

    #[tracing::instrument(skip(self))]
    pub async fn product(&self, id: ProductId) -> Result<Product> {
        let key = keys::product(id);
        if let Some(cached) = self.lookup::<Product>(&key).await {
            return Ok(cached);
        }

        let product = self.store.product(id).await?;
        self.populate(&key, &product).await;
        Ok(product)
    }

    #[tracing::instrument(skip(self))]
    pub async fn products_by_category(&self, id: CategoryId) -> Result<Vec<Product>> {
        let key = keys::category_products(id);
        if let Some(cached) = self.lookup::<Vec<Product>>(&key).await {
            return Ok(cached);
        }

        let products = self.store.products_by_category(id).await?;
        self.populate(&key, &products).await;
        Ok(products)
    }

    #[tracing::instrument(skip(self, input))]
    pub async fn create_category(&self, input: &NewCategory) -> Result<Category> {
        let category = self.store.insert_category(input).await?;
        self.invalidate(keys::category_create_keys()).await?;
        Ok(category)
    }

    #[tracing::instrument(skip(self, update))]
    pub async fn update_category(
        &self,
        id: CategoryId,
        update: &CategoryUpdate,
    ) -> Result<Category> {
        let category = self.store.update_category(id, update).await?;
        self.invalidate(keys::category_update_keys(id)).await?;
        Ok(category)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_category(&self, id: CategoryId) -> Result<()> {
        self.store.delete_category(id).await?;
        self.invalidate(keys::category_delete_keys(id)).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self, input))]
    pub async fn create_product(&self, input: &NewProduct) -> Result<Product> {
        let product = self.store.insert_product(input).await?;
        self.invalidate(keys::product_create_keys(product.category_id))
            .await?;
        Ok(product)
    }

    #[tracing::instrument(skip(self, update))]
    pub async fn update_product(&self, id: ProductId, update: &ProductUpdate) -> Result<Product> {
        let product = self.store.update_product(id, update).await?;
        self.invalidate(keys::product_write_keys(id, product.category_id))
            .await?;
        Ok(product)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_product(&self, id: ProductId) -> Result<()> {
        // The category id is needed for the cross-entity key, so the
        // product is read before the row goes away.
        let product = self.store.product(id).await?;
        self.store.delete_product(id).await?;
        self.invalidate(keys::product_write_keys(id, product.category_id))
            .await?;
        Ok(())
    }

    async fn lookup<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.cache.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                metrics::counter!("cache_misses_total").increment(1);
                return None;
            }
            Err(err) => {
                tracing::warn!(key, error = %err, "cache read failed, serving from store");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                metrics::counter!("cache_hits_total").increment(1);
                Some(value)
            }
            Err(err) => {
                tracing::warn!(key, error = %err, "dropping undecodable cache entry");
                let _ = self.cache.delete(&[key.to_string()]).await;
                None
            }
        }
    }

    async fn populate<T: Serialize>(&self, key: &str, value: &T) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!(key, error = %err, "skipping cache write for unencodable value");
                return;
            }
        };

        if let Err(err) = self.cache.set(key, &raw, self.ttl).await {
            tracing::warn!(key, error = %err, "cache write failed");
        }
    }

    async fn invalidate(&self, keys: Vec<String>) -> Result<()> {
        self.cache
            .delete(&keys)
            .await
            .map_err(CatalogError::Invalidation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Money;
    use store::MemoryStore;

    use crate::MemoryCache;

    async fn setup() -> (
        MemoryStore,
        MemoryCache,
        CachedCatalog<MemoryStore, MemoryCache>,
    ) {
        let store = MemoryStore::new();
        let cache = MemoryCache::new();
        let catalog = CachedCatalog::new(store.clone(), cache.clone(), Duration::from_secs(120));
        (store, cache, catalog)
    }

    async fn seed_product(catalog: &CachedCatalog<MemoryStore, MemoryCache>) -> Product {
        let category = catalog
            .create_category(&NewCategory::new("Peripherals", "Desk gear").unwrap())
            .await
            .unwrap();
        catalog
            .create_product(
                &NewProduct::new(category.id, "Keyboard", "Tactile", Money::from_cents(10_00))
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn read_populates_cache() {
        let (_, cache, catalog) = setup().await;
        let product = seed_product(&catalog).await;

        assert!(!cache.contains(keys::PRODUCTS).await);
        catalog.products().await.unwrap();
        assert!(cache.contains(keys::PRODUCTS).await);

        catalog.product(product.id).await.unwrap();
        assert!(cache.contains(&keys::product(product.id)).await);
    }

    #[tokio::test]
    async fn cached_read_skips_store() {
        let (store, _, catalog) = setup().await;
        let product = seed_product(&catalog).await;

        catalog.product(product.id).await.unwrap();

        // A write that bypasses the catalog leaves the cache stale.
        store
            .update_product(
                product.id,
                &ProductUpdate::new("Keyboard", "Tactile", Money::from_cents(99_00)).unwrap(),
            )
            .await
            .unwrap();

        let cached = catalog.product(product.id).await.unwrap();
        assert_eq!(cached.price, Money::from_cents(10_00));
    }

    #[tokio::test]
    async fn update_product_invalidates_stale_keys() {
        let (_, cache, catalog) = setup().await;
        let product = seed_product(&catalog).await;

        catalog.products().await.unwrap();
        catalog.product(product.id).await.unwrap();
        catalog
            .products_by_category(product.category_id)
            .await
            .unwrap();

        catalog
            .update_product(
                product.id,
                &ProductUpdate::new("Keyboard", "Tactile", Money::from_cents(12_00)).unwrap(),
            )
            .await
            .unwrap();

        assert!(!cache.contains(keys::PRODUCTS).await);
        assert!(!cache.contains(&keys::product(product.id)).await);
        assert!(
            !cache
                .contains(&keys::category_products(product.category_id))
                .await
        );

        // The next read refetches the new price.
        let fresh = catalog.product(product.id).await.unwrap();
        assert_eq!(fresh.price, Money::from_cents(12_00));
    }

    #[tokio::test]
    async fn delete_product_invalidates_and_removes() {
        let (_, cache, catalog) = setup().await;
        let product = seed_product(&catalog).await;

        catalog.product(product.id).await.unwrap();
        catalog.delete_product(product.id).await.unwrap();

        assert!(!cache.contains(&keys::product(product.id)).await);

        let err = catalog.product(product.id).await.unwrap_err();
        assert!(matches!(err, CatalogError::Store(e) if e.is_not_found()));
    }

    #[tokio::test]
    async fn category_mutations_invalidate() {
        let (_, cache, catalog) = setup().await;

        let category = catalog
            .create_category(&NewCategory::new("Audio", "Sound gear").unwrap())
            .await
            .unwrap();

        catalog.categories().await.unwrap();
        catalog.category(category.id).await.unwrap();
        assert!(cache.contains(keys::CATEGORIES).await);

        catalog
            .update_category(
                category.id,
                &CategoryUpdate::new("Audio & Video", "Renamed").unwrap(),
            )
            .await
            .unwrap();
        assert!(!cache.contains(keys::CATEGORIES).await);
        assert!(!cache.contains(&keys::category(category.id)).await);

        let fresh = catalog.category(category.id).await.unwrap();
        assert_eq!(fresh.name, "Audio & Video");

        catalog.delete_category(category.id).await.unwrap();
        assert!(!cache.contains(&keys::category(category.id)).await);
    }

    #[tokio::test]
    async fn corrupt_entry_falls_back_to_store() {
        let (_, cache, catalog) = setup().await;
        let product = seed_product(&catalog).await;

        let key = keys::product(product.id);
        cache
            .set(&key, "not json", Duration::from_secs(120))
            .await
            .unwrap();

        let read = catalog.product(product.id).await.unwrap();
        assert_eq!(read.id, product.id);

        // The bad entry was replaced by a decodable one.
        let raw = cache.get(&key).await.unwrap().unwrap();
        assert!(serde_json::from_str::<Product>(&raw).is_ok());
    }

    #[tokio::test]
    async fn unknown_product_is_not_cached() {
        let (_, cache, catalog) = setup().await;
        seed_product(&catalog).await;

        let missing = ProductId::new();
        let err = catalog.product(missing).await.unwrap_err();
        assert!(matches!(err, CatalogError::Store(e) if e.is_not_found()));
        assert!(!cache.contains(&keys::product(missing)).await);
    }

    #[tokio::test]
    async fn products_by_category_round_trip() {
        let (_, cache, catalog) = setup().await;
        let product = seed_product(&catalog).await;

        let listed = catalog
            .products_by_category(product.category_id)
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert!(
            cache
                .contains(&keys::category_products(product.category_id))
                .await
        );

        // Served from cache on the second read.
        let listed = catalog
            .products_by_category(product.category_id)
            .await
            .unwrap();
        assert_eq!(listed[0].id, product.id);
    }
}
