//! Domain error model.

use thiserror::Error;

use crate::id::ProductId;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants, stock shortfalls). Lookup and storage failures belong to the
/// orchestration layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A domain invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// The targeted product has no line in the cart.
    #[error("product {0} not found in cart")]
    NotFound(ProductId),

    /// The requested quantity exceeds what the stock source reports.
    #[error("product {product_id}: requested {requested}, available {available}")]
    OutOfStock {
        product_id: ProductId,
        requested: i64,
        available: i64,
    },
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn not_found(product_id: ProductId) -> Self {
        Self::NotFound(product_id)
    }

    pub fn out_of_stock(product_id: ProductId, requested: i64, available: i64) -> Self {
        Self::OutOfStock {
            product_id,
            requested,
            available,
        }
    }

    /// Whether this error is a stock shortfall (reported with its own message).
    pub fn is_out_of_stock(&self) -> bool {
        matches!(self, Self::OutOfStock { .. })
    }
}
