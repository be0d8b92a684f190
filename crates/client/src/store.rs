//! Cart store: the orchestration layer around the pure cart aggregate.
//!
//! Every operation follows the same pipeline:
//!
//! ```text
//! lock cart (single writer)
//!   ↓
//! 1. Look up stock (and the catalog record for a first add)
//!   ↓
//! 2. Decide and apply events on a copy (pure, `execute`)
//!   ↓
//! 3. Serialize the copy, write the storage slot
//!   ↓
//! 4. Swap the copy in as the current cart
//! ```
//!
//! A failure at any step leaves both the slot and the in-memory cart as they
//! were, and is reported once through the `Notifier`.

use thiserror::Error;
use tokio::sync::Mutex;

use storefront_cart::{
    AddProduct, Cart, CartCommand, CartId, CartLine, RemoveProduct, UpdateProductAmount,
};
use storefront_core::aggregate::execute;
use storefront_core::{DomainError, ProductId};

use crate::lookup::{CatalogLookup, LookupError, StockLookup};
use crate::notify::{
    MSG_ADD_FAILED, MSG_OUT_OF_STOCK, MSG_REMOVE_FAILED, MSG_UPDATE_FAILED, Notifier,
};
use crate::storage::{CART_STORAGE_KEY, CartStorage, StorageError};

/// Consumer-facing cart operation, used to pick the failure message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    AddProduct,
    RemoveProduct,
    UpdateProductAmount,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::AddProduct => "add_product",
            Operation::RemoveProduct => "remove_product",
            Operation::UpdateProductAmount => "update_product_amount",
        }
    }

    /// Generic message shown for any failure other than a stock shortfall.
    pub fn failure_message(&self) -> &'static str {
        match self {
            Operation::AddProduct => MSG_ADD_FAILED,
            Operation::RemoveProduct => MSG_REMOVE_FAILED,
            Operation::UpdateProductAmount => MSG_UPDATE_FAILED,
        }
    }
}

/// Why a cart operation did not go through.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Rejected by the cart rules (out of stock, unknown line, bad input).
    #[error(transparent)]
    Domain(#[from] DomainError),
    /// The stock or catalog lookup failed.
    #[error("lookup failed: {0}")]
    Lookup(#[from] LookupError),
    /// Writing the storage slot failed.
    #[error("storage failed: {0}")]
    Storage(#[from] StorageError),
}

impl StoreError {
    pub fn is_out_of_stock(&self) -> bool {
        matches!(self, StoreError::Domain(err) if err.is_out_of_stock())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::Domain(DomainError::NotFound(_)))
    }

    /// Message the user sees for this error during `op`.
    pub fn user_message(&self, op: Operation) -> &'static str {
        if self.is_out_of_stock() {
            MSG_OUT_OF_STOCK
        } else {
            op.failure_message()
        }
    }
}

/// Cart state holder with write-through persistence.
///
/// The cart sits behind an async mutex that is held for the whole operation,
/// lookups included, so overlapping calls are applied one after the other.
#[derive(Debug)]
pub struct CartStore<L, S, N> {
    lookup: L,
    storage: S,
    notifier: N,
    key: String,
    cart: Mutex<Cart>,
}

impl<L, S, N> CartStore<L, S, N>
where
    L: StockLookup + CatalogLookup,
    S: CartStorage,
    N: Notifier,
{
    /// Load the cart persisted under the default key.
    pub fn load(lookup: L, storage: S, notifier: N) -> Self {
        Self::load_with_key(lookup, storage, notifier, CART_STORAGE_KEY)
    }

    /// Load the cart persisted under `key`.
    ///
    /// An absent, unreadable or invalid slot yields an empty cart.
    pub fn load_with_key(lookup: L, storage: S, notifier: N, key: impl Into<String>) -> Self {
        let key = key.into();
        let cart = read_persisted(&storage, &key);
        tracing::info!(key = %key, lines = cart.len(), "cart loaded");

        Self {
            lookup,
            storage,
            notifier,
            key,
            cart: Mutex::new(cart),
        }
    }

    /// Snapshot of the current cart.
    pub async fn cart(&self) -> Cart {
        self.cart.lock().await.clone()
    }

    /// Add one unit of a product, fetching its catalog record on first add.
    #[tracing::instrument(skip(self), fields(op = "add_product"))]
    pub async fn add_product(&self, product_id: ProductId) -> Result<(), StoreError> {
        let mut cart = self.cart.lock().await;
        let result = self.try_add_product(&mut cart, product_id).await;
        self.report(Operation::AddProduct, result)
    }

    /// Drop a product's line entirely.
    #[tracing::instrument(skip(self), fields(op = "remove_product"))]
    pub async fn remove_product(&self, product_id: ProductId) -> Result<(), StoreError> {
        let mut cart = self.cart.lock().await;
        let command = CartCommand::RemoveProduct(RemoveProduct { product_id });
        let result = self.commit(&mut cart, &command);
        self.report(Operation::RemoveProduct, result)
    }

    /// Set a product's amount, bounded by the reported stock.
    ///
    /// Amounts of zero or below are ignored without a notification.
    #[tracing::instrument(skip(self), fields(op = "update_product_amount"))]
    pub async fn update_product_amount(
        &self,
        product_id: ProductId,
        amount: i64,
    ) -> Result<(), StoreError> {
        let mut cart = self.cart.lock().await;
        let result = self.try_update_amount(&mut cart, product_id, amount).await;
        self.report(Operation::UpdateProductAmount, result)
    }

    async fn try_add_product(
        &self,
        cart: &mut Cart,
        product_id: ProductId,
    ) -> Result<(), StoreError> {
        let stock = self.lookup.stock(product_id).await?;

        // Only a first add needs display fields, and only when there is stock.
        let product = if stock.amount > 0 && !cart.contains(product_id) {
            Some(self.lookup.product(product_id).await?)
        } else {
            None
        };

        let command = CartCommand::AddProduct(AddProduct {
            product_id,
            stock,
            product,
        });
        self.commit(cart, &command)
    }

    async fn try_update_amount(
        &self,
        cart: &mut Cart,
        product_id: ProductId,
        amount: i64,
    ) -> Result<(), StoreError> {
        let stock = self.lookup.stock(product_id).await?;
        let command = CartCommand::UpdateProductAmount(UpdateProductAmount {
            product_id,
            amount,
            stock,
        });
        self.commit(cart, &command)
    }

    /// Decide, persist, then swap in the new cart.
    fn commit(&self, cart: &mut Cart, command: &CartCommand) -> Result<(), StoreError> {
        let mut next = cart.clone();
        let events = execute(&mut next, command)?;
        if events.is_empty() {
            tracing::debug!("command produced no changes");
            return Ok(());
        }

        let payload = serde_json::to_string(next.lines())
            .map_err(|e| StorageError::Serialize(e.to_string()))?;
        self.storage.set(&self.key, &payload)?;

        for ev in &events {
            tracing::info!(
                event = ev.event_type(),
                product_id = %ev.product_id(),
                units = next.total_units(),
                "cart updated"
            );
        }

        *cart = next;
        Ok(())
    }

    fn report(&self, op: Operation, result: Result<(), StoreError>) -> Result<(), StoreError> {
        if let Err(err) = &result {
            if err.is_out_of_stock() {
                tracing::warn!(op = op.as_str(), error = %err, "cart operation rejected");
            } else {
                tracing::error!(op = op.as_str(), error = %err, "cart operation failed");
            }
            self.notifier.error(err.user_message(op));
        }
        result
    }
}

fn read_persisted<S: CartStorage>(storage: &S, key: &str) -> Cart {
    let id = CartId::new(key);

    let raw = match storage.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Cart::empty(id),
        Err(err) => {
            tracing::warn!(key, error = %err, "failed to read persisted cart; starting empty");
            return Cart::empty(id);
        }
    };

    let lines: Vec<CartLine> = match serde_json::from_str(&raw) {
        Ok(lines) => lines,
        Err(err) => {
            tracing::warn!(key, error = %err, "persisted cart is not valid JSON; starting empty");
            return Cart::empty(id);
        }
    };

    match Cart::from_lines(id.clone(), lines) {
        Ok(cart) => cart,
        Err(err) => {
            tracing::warn!(key, error = %err, "persisted cart breaks cart invariants; starting empty");
            Cart::empty(id)
        }
    }
}
