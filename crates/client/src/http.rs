//! REST adapter for the stock and catalog lookups.
//!
//! Talks to a storefront API exposing `GET /stock/{id}` and
//! `GET /products/{id}`.

use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use storefront_cart::{Product, Stock};
use storefront_core::ProductId;

use crate::lookup::{CatalogLookup, LookupError, StockLookup};

/// Body of `GET /stock/{id}`. Only `amount` is required; an `id`, when
/// present, must name the requested product.
#[derive(Debug, Deserialize)]
struct StockPayload {
    #[serde(default)]
    id: Option<ProductId>,
    amount: i64,
}

/// HTTP client for the storefront API.
#[derive(Debug, Clone)]
pub struct HttpCatalog {
    api_url: String,
    client: reqwest::Client,
}

impl HttpCatalog {
    pub fn new(api_url: impl Into<String>) -> Result<Self, LookupError> {
        Self::with_timeout(api_url, None)
    }

    /// Build a client; `timeout` bounds each request when set.
    pub fn with_timeout(
        api_url: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, LookupError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| LookupError::Network(e.to_string()))?;

        Ok(Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn get_json<T>(&self, path: &str, product_id: ProductId) -> Result<T, LookupError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}/{}/{}", self.api_url, path, product_id);
        tracing::debug!(%url, "lookup request");

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| LookupError::Network(e.to_string()))?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(LookupError::NotFound(product_id));
        }
        if !status.is_success() {
            return Err(LookupError::Api(
                status.as_u16(),
                resp.text().await.unwrap_or_default(),
            ));
        }

        resp.json::<T>()
            .await
            .map_err(|e| LookupError::Parse(e.to_string()))
    }
}

#[async_trait::async_trait]
impl StockLookup for HttpCatalog {
    async fn stock(&self, product_id: ProductId) -> Result<Stock, LookupError> {
        let payload: StockPayload = self.get_json("stock", product_id).await?;
        match payload.id {
            Some(id) if id != product_id => Err(LookupError::Parse(format!(
                "stock reported for product {id} instead of {product_id}"
            ))),
            _ => Ok(Stock::new(product_id, payload.amount)),
        }
    }
}

#[async_trait::async_trait]
impl CatalogLookup for HttpCatalog {
    async fn product(&self, product_id: ProductId) -> Result<Product, LookupError> {
        self.get_json("products", product_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_trimmed_from_api_url() {
        let catalog = HttpCatalog::new("http://localhost:3333/").unwrap();
        assert_eq!(catalog.api_url, "http://localhost:3333");
    }

    #[test]
    fn stock_payload_needs_only_an_amount() {
        let payload: StockPayload = serde_json::from_str(r#"{"amount":5}"#).unwrap();
        assert_eq!(payload.id, None);
        assert_eq!(payload.amount, 5);

        let payload: StockPayload = serde_json::from_str(r#"{"id":2,"amount":0}"#).unwrap();
        assert_eq!(payload.id, Some(ProductId::new(2)));
    }
}
