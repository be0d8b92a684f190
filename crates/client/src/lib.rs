//! `storefront-client`
//!
//! **Responsibility:** cart state for a storefront front-end.
//!
//! This crate provides:
//! - `CartStore`: write-through cart state over a persisted slot
//! - Stock/catalog lookups (HTTP adapter + in-memory source)
//! - Storage slots (file-backed + in-memory)
//! - User notifications
//!
//! The cart rules themselves live in `storefront-cart`; this crate only does
//! the IO around them.

pub mod config;
pub mod http;
pub mod lookup;
pub mod notify;
pub mod storage;
pub mod store;

pub use config::ClientConfig;
pub use http::HttpCatalog;
pub use lookup::{CatalogLookup, InMemoryCatalog, LookupError, StockLookup};
pub use notify::{Notifier, RecordingNotifier, StderrNotifier, TracingNotifier};
pub use storage::{CART_STORAGE_KEY, CartStorage, FileStorage, InMemoryStorage, StorageError};
pub use store::{CartStore, Operation, StoreError};
