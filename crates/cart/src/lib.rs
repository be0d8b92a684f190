//! Shopping cart domain module.
//!
//! This crate contains the cart's business rules, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage). Stock levels and
//! catalog records are looked up by the caller and handed in with each
//! command.

pub mod cart;
pub mod line;

pub use cart::{
    AddProduct, AmountChanged, Cart, CartCommand, CartError, CartEvent, CartId, LineAdded,
    LineRemoved, RemoveProduct, UpdateProductAmount,
};
pub use line::{CartLine, DisplayFields, Product, Stock};
