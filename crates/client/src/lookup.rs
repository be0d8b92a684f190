//! Remote stock and catalog lookups.
//!
//! Both are read-only request/response calls. The cart store treats any
//! `LookupError` as a failed operation; nothing is retried.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use thiserror::Error;

use storefront_cart::{Product, Stock};
use storefront_core::ProductId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("network error: {0}")]
    Network(String),
    #[error("API error ({0}): {1}")]
    Api(u16, String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("product {0} not found")]
    NotFound(ProductId),
}

/// Available-quantity lookup for a product.
#[async_trait::async_trait]
pub trait StockLookup: Send + Sync {
    async fn stock(&self, product_id: ProductId) -> Result<Stock, LookupError>;
}

/// Catalog record lookup for a product (display fields).
#[async_trait::async_trait]
pub trait CatalogLookup: Send + Sync {
    async fn product(&self, product_id: ProductId) -> Result<Product, LookupError>;
}

#[async_trait::async_trait]
impl<T: StockLookup + ?Sized> StockLookup for Arc<T> {
    async fn stock(&self, product_id: ProductId) -> Result<Stock, LookupError> {
        (**self).stock(product_id).await
    }
}

#[async_trait::async_trait]
impl<T: CatalogLookup + ?Sized> CatalogLookup for Arc<T> {
    async fn product(&self, product_id: ProductId) -> Result<Product, LookupError> {
        (**self).product(product_id).await
    }
}

/// In-memory stock and catalog source.
///
/// Intended for tests/dev. Products without a registered stock level report
/// zero; unknown products are `NotFound` for the catalog.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    products: RwLock<HashMap<ProductId, Product>>,
    stock: RwLock<HashMap<ProductId, i64>>,
    failing: RwLock<Option<LookupError>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a catalog record together with its stock level.
    pub fn insert(&self, product: Product, stock: i64) {
        let id = product.id;
        if let Ok(mut products) = self.products.write() {
            products.insert(id, product);
        }
        self.set_stock(id, stock);
    }

    pub fn set_stock(&self, product_id: ProductId, amount: i64) {
        if let Ok(mut stock) = self.stock.write() {
            stock.insert(product_id, amount);
        }
    }

    /// Make every subsequent lookup fail with `err` (until cleared with `None`).
    pub fn fail_with(&self, err: Option<LookupError>) {
        if let Ok(mut failing) = self.failing.write() {
            *failing = err;
        }
    }

    fn check_failing(&self) -> Result<(), LookupError> {
        let failing = self
            .failing
            .read()
            .map_err(|_| LookupError::Network("lock poisoned".to_string()))?;
        match failing.as_ref() {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl StockLookup for InMemoryCatalog {
    async fn stock(&self, product_id: ProductId) -> Result<Stock, LookupError> {
        self.check_failing()?;
        let stock = self
            .stock
            .read()
            .map_err(|_| LookupError::Network("lock poisoned".to_string()))?;
        let amount = stock.get(&product_id).copied().unwrap_or(0);
        Ok(Stock::new(product_id, amount))
    }
}

#[async_trait::async_trait]
impl CatalogLookup for InMemoryCatalog {
    async fn product(&self, product_id: ProductId) -> Result<Product, LookupError> {
        self.check_failing()?;
        let products = self
            .products
            .read()
            .map_err(|_| LookupError::Network("lock poisoned".to_string()))?;
        products
            .get(&product_id)
            .cloned()
            .ok_or(LookupError::NotFound(product_id))
    }
}
