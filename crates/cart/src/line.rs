use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use storefront_core::ProductId;

/// Product display fields (title, price, image, ...).
///
/// The cart never interprets these; they are carried from the catalog into
/// the persisted cart verbatim.
pub type DisplayFields = Map<String, Value>;

/// Catalog record as returned by the catalog lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    #[serde(flatten)]
    pub fields: DisplayFields,
}

impl Product {
    pub fn new(id: ProductId) -> Self {
        Self {
            id,
            fields: DisplayFields::new(),
        }
    }

    /// Builder-style helper to attach a display field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

/// Available quantity reported by the stock source for `id`.
///
/// `amount` may be zero or negative; both mean nothing can be added.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stock {
    pub id: ProductId,
    pub amount: i64,
}

impl Stock {
    pub fn new(id: ProductId, amount: i64) -> Self {
        Self { id, amount }
    }
}

/// One product/quantity pairing held in the cart, plus its display data.
///
/// Serialized flat: `{"id": 1, "title": "...", "price": 179.9, "amount": 2}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub id: ProductId,
    #[serde(flatten)]
    pub fields: DisplayFields,
    pub amount: i64,
}

impl CartLine {
    /// First line for a product: amount 1, display fields from the catalog.
    ///
    /// A stray `amount` key in the catalog payload is dropped so it cannot
    /// shadow the line's own quantity when serialized.
    pub fn from_product(product: Product) -> Self {
        let Product { id, mut fields } = product;
        fields.remove("amount");
        Self {
            id,
            fields,
            amount: 1,
        }
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Display title, when the catalog provides one.
    pub fn title(&self) -> Option<&str> {
        self.field("title").and_then(Value::as_str)
    }
}
