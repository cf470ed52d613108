//! HTTP backend of [`RemoteStore`].
//!
//! Talks JSON to the persistence API under `{base_url}/api`. Every request carries
//! the tunnel bypass header and is bounded by the client timeout.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};

use super::records::{self, error_reason};
use super::{OrderScope, RemoteError, RemoteResult, RemoteStore};
use crate::app_system::StoreConfig;
use crate::domain::{
    AddonSettings, Credentials, GlobalFinancials, NewOrderRecord, Order, OrderPatch, Product,
    Registration, User, UserPatch,
};

#[derive(Debug, Clone)]
pub struct HttpRemoteStore {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpRemoteStore {
    pub fn new(config: &StoreConfig) -> RemoteResult<Self> {
        let base_url = config
            .api_base_url
            .clone()
            .ok_or_else(|| RemoteError::Configuration("no API base URL configured".to_string()))?;

        let (name, value) = &config.bypass_header;
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| RemoteError::Configuration(format!("bypass header name: {}", e)))?,
            HeaderValue::from_str(value)
                .map_err(|e| RemoteError::Configuration(format!("bypass header value: {}", e)))?,
        );

        let client = Client::builder()
            .timeout(config.request_timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| RemoteError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: config.request_timeout,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path)
    }

    fn transport_error(&self, error: reqwest::Error) -> RemoteError {
        if error.is_timeout() {
            RemoteError::Timeout(self.timeout)
        } else {
            RemoteError::Unreachable(error.to_string())
        }
    }

    async fn send(&self, request: RequestBuilder) -> RemoteResult<Response> {
        let response = request.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        debug!(status = status.as_u16(), body = %body, "Store rejected request");
        Err(RemoteError::rejected(status.as_u16(), error_reason(&body)))
    }

    async fn send_json(&self, request: RequestBuilder) -> RemoteResult<Value> {
        self.send(request)
            .await?
            .json::<Value>()
            .await
            .map_err(|e| RemoteError::InvalidResponse(e.to_string()))
    }

    async fn get_json(&self, path: &str) -> RemoteResult<Value> {
        self.send_json(self.client.get(self.url(path))).await
    }

    async fn post_json<B: Serialize + Sync>(&self, path: &str, body: &B) -> RemoteResult<Value> {
        self.send_json(self.client.post(self.url(path)).json(body)).await
    }

    async fn put<B: Serialize + Sync>(&self, path: &str, body: &B) -> RemoteResult<()> {
        self.send(self.client.put(self.url(path)).json(body)).await?;
        Ok(())
    }

    async fn delete(&self, path: &str) -> RemoteResult<()> {
        self.send(self.client.delete(self.url(path))).await?;
        Ok(())
    }
}

/// Product body without the internal identifier; the store assigns its own.
fn product_body(product: &Product) -> RemoteResult<Value> {
    let mut value =
        serde_json::to_value(product).map_err(|e| RemoteError::InvalidResponse(e.to_string()))?;
    if let Value::Object(map) = &mut value {
        map.remove("id");
    }
    Ok(value)
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    #[instrument(skip(self))]
    async fn list_products(&self) -> RemoteResult<Vec<Product>> {
        records::ingest_list(self.get_json("products").await?, records::ingest_product)
    }

    #[instrument(skip(self, product), fields(name = %product.name))]
    async fn create_product(&self, product: &Product) -> RemoteResult<String> {
        records::ingest_created_id(self.post_json("products", &product_body(product)?).await?)
    }

    #[instrument(skip(self, product))]
    async fn update_product(&self, id: &str, product: &Product) -> RemoteResult<()> {
        self.put(&format!("products/{}", id), &product_body(product)?).await
    }

    #[instrument(skip(self))]
    async fn delete_product(&self, id: &str) -> RemoteResult<()> {
        self.delete(&format!("products/{}", id)).await
    }

    #[instrument(skip(self))]
    async fn list_orders(&self, scope: &OrderScope) -> RemoteResult<Vec<Order>> {
        let mut request = self.client.get(self.url("orders"));
        if let OrderScope::OwnedBy(user_id) = scope {
            request = request.query(&[("userId", user_id.as_str())]);
        }
        let orders = records::ingest_list(self.send_json(request).await?, records::ingest_order)?;
        Ok(orders.into_iter().filter(|order| scope.includes(order)).collect())
    }

    #[instrument(skip(self, order), fields(user_id = %order.user_id, product_id = %order.product_id))]
    async fn create_order(&self, order: &NewOrderRecord) -> RemoteResult<String> {
        records::ingest_created_id(self.post_json("orders", order).await?)
    }

    #[instrument(skip(self, patch))]
    async fn update_order(&self, id: &str, patch: &OrderPatch) -> RemoteResult<()> {
        self.put(&format!("orders/{}", id), patch).await
    }

    #[instrument(skip(self))]
    async fn delete_order(&self, id: &str) -> RemoteResult<()> {
        self.delete(&format!("orders/{}", id)).await
    }

    #[instrument(skip(self))]
    async fn list_users(&self) -> RemoteResult<Vec<User>> {
        records::ingest_list(self.get_json("users/details").await?, |value| {
            records::ingest_user(value, None)
        })
    }

    #[instrument(skip(self, registration), fields(email = %registration.email))]
    async fn create_user(&self, registration: &Registration) -> RemoteResult<String> {
        records::ingest_created_id(self.post_json("users", registration).await?)
    }

    #[instrument(skip(self, patch))]
    async fn update_user(&self, id: &str, patch: &UserPatch) -> RemoteResult<()> {
        self.put(&format!("users/{}", id), patch).await
    }

    #[instrument(skip(self))]
    async fn delete_user(&self, id: &str) -> RemoteResult<()> {
        self.delete(&format!("users/{}", id)).await
    }

    #[instrument(skip(self, credentials), fields(email = %credentials.email, role = ?credentials.role))]
    async fn login(&self, credentials: &Credentials) -> RemoteResult<User> {
        records::ingest_login(self.post_json("users/login", credentials).await?, credentials.role)
    }

    #[instrument(skip(self))]
    async fn id_proof(&self, user_id: &str) -> RemoteResult<Vec<u8>> {
        let response = self
            .send(self.client.get(self.url(&format!("users/{}/id-proof", user_id))))
            .await?;
        let bytes = response.bytes().await.map_err(|e| self.transport_error(e))?;
        Ok(bytes.to_vec())
    }

    #[instrument(skip(self))]
    async fn addon_settings(&self) -> RemoteResult<AddonSettings> {
        serde_json::from_value(self.get_json("settings/addons").await?)
            .map_err(|e| RemoteError::InvalidResponse(e.to_string()))
    }

    #[instrument(skip(self))]
    async fn put_addon_settings(&self, settings: &AddonSettings) -> RemoteResult<()> {
        self.put("settings/addons", settings).await
    }

    #[instrument(skip(self))]
    async fn financials(&self) -> RemoteResult<GlobalFinancials> {
        serde_json::from_value(self.get_json("settings/financials").await?)
            .map_err(|e| RemoteError::InvalidResponse(e.to_string()))
    }

    #[instrument(skip(self))]
    async fn put_financials(&self, financials: &GlobalFinancials) -> RemoteResult<()> {
        self.put("settings/financials", financials).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_base_url_is_a_configuration_error() {
        let config = StoreConfig::default();
        assert!(matches!(
            HttpRemoteStore::new(&config),
            Err(RemoteError::Configuration(_))
        ));
    }

    #[test]
    fn urls_are_rooted_under_api() {
        let config = StoreConfig::default().with_api_base_url("https://store.example.com/");
        let store = HttpRemoteStore::new(&config).unwrap();
        assert_eq!(store.url("orders/o1"), "https://store.example.com/api/orders/o1");
    }

    #[test]
    fn product_body_omits_internal_id() {
        let body = product_body(&Product::new("local-1", "PS5", 50.0, 150.0, 5)).unwrap();
        assert!(body.get("id").is_none());
        assert_eq!(body["pricePerWeek"], 50.0);
    }
}
