//! In-process backend of [`RemoteStore`].
//!
//! Keeps raw JSON documents keyed by the store's native `_id`, the way the real
//! store does, and hands them back through the same ingestion functions as the
//! HTTP backend. Used by the demo binary when no API is configured and by tests,
//! which can also take the store offline or slow it down.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tokio::sync::Mutex;
use tracing::debug;

use super::records::{self, NATIVE_ID_FIELD};
use super::{OrderScope, RemoteError, RemoteResult, RemoteStore, USER_NOT_FOUND};
use crate::domain::{
    AddonSettings, Credentials, GlobalFinancials, NewOrderRecord, Order, OrderPatch, Product,
    Registration, User, UserPatch,
};

/// Document collections held by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Products,
    Orders,
    Users,
}

#[derive(Debug, Default)]
struct StoreState {
    products: Vec<Value>,
    orders: Vec<Value>,
    users: Vec<Value>,
    passwords: HashMap<String, String>,
    id_proofs: HashMap<String, Vec<u8>>,
    addons: Option<Value>,
    financials: Option<Value>,
    next_id: u64,
    offline: bool,
    latency: Option<Duration>,
}

impl StoreState {
    fn collection(&self, collection: Collection) -> &Vec<Value> {
        match collection {
            Collection::Products => &self.products,
            Collection::Orders => &self.orders,
            Collection::Users => &self.users,
        }
    }

    fn collection_mut(&mut self, collection: Collection) -> &mut Vec<Value> {
        match collection {
            Collection::Products => &mut self.products,
            Collection::Orders => &mut self.orders,
            Collection::Users => &mut self.users,
        }
    }

    fn allocate_id(&mut self) -> String {
        self.next_id += 1;
        format!("{:024x}", self.next_id)
    }

    fn position(&self, collection: Collection, id: &str) -> Option<usize> {
        self.collection(collection)
            .iter()
            .position(|doc| native_id(doc).as_deref() == Some(id))
    }

    /// Stores `body` under a fresh (or supplied) native id and returns the id.
    fn insert(&mut self, collection: Collection, body: Value, id: Option<String>) -> RemoteResult<String> {
        let mut map = match body {
            Value::Object(map) => map,
            other => return Err(RemoteError::rejected(400, format!("expected object, got {}", other))),
        };
        let id = match id.filter(|id| !id.is_empty()) {
            Some(id) => id,
            None => self.allocate_id(),
        };
        map.remove("id");
        let native = match collection {
            Collection::Products => json!({ "$oid": id }),
            Collection::Orders | Collection::Users => Value::String(id.clone()),
        };
        map.insert(NATIVE_ID_FIELD.to_string(), native);
        self.collection_mut(collection).push(Value::Object(map));
        Ok(id)
    }

    /// Shallow merge of `patch` into the document, the way the store applies `PUT`.
    fn merge(&mut self, collection: Collection, id: &str, patch: Value) -> RemoteResult<()> {
        let index = self
            .position(collection, id)
            .ok_or_else(|| RemoteError::rejected(404, "Not found"))?;
        let Value::Object(fields) = patch else {
            return Err(RemoteError::rejected(400, "expected object"));
        };
        if let Some(Value::Object(doc)) = self.collection_mut(collection).get_mut(index) {
            for (key, value) in fields {
                if key != "id" && key != NATIVE_ID_FIELD {
                    doc.insert(key, value);
                }
            }
        }
        Ok(())
    }

    fn remove(&mut self, collection: Collection, id: &str) -> RemoteResult<Value> {
        let index = self
            .position(collection, id)
            .ok_or_else(|| RemoteError::rejected(404, "Not found"))?;
        Ok(self.collection_mut(collection).remove(index))
    }

    fn user_by_email(&self, email: &str) -> Option<&Value> {
        self.users
            .iter()
            .find(|doc| doc.get("email").and_then(Value::as_str) == Some(email))
    }
}

fn native_id(doc: &Value) -> Option<String> {
    let mut map: Map<String, Value> = doc.as_object()?.clone();
    records::normalize_id(&mut map).ok()
}

fn to_document<T: Serialize>(value: &T) -> RemoteResult<Value> {
    serde_json::to_value(value).map_err(|e| RemoteError::InvalidResponse(e.to_string()))
}

#[derive(Debug, Default)]
pub struct InMemoryRemoteStore {
    state: Mutex<StoreState>,
    calls: AtomicU64,
}

impl InMemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following call fail as unreachable until switched back.
    pub async fn set_offline(&self, offline: bool) {
        self.state.lock().await.offline = offline;
    }

    /// Delays every following call.
    pub async fn set_latency(&self, latency: Option<Duration>) {
        self.state.lock().await.latency = latency;
    }

    /// Number of calls received so far, including failed ones.
    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Adds an account directly, bypassing registration. Returns its id.
    pub async fn seed_user(&self, user: &User, password: &str) -> RemoteResult<String> {
        let mut state = self.state.lock().await;
        state.passwords.insert(user.email.clone(), password.to_string());
        state.insert(Collection::Users, to_document(user)?, Some(user.id.clone()))
    }

    pub async fn seed_product(&self, product: &Product) -> RemoteResult<String> {
        let mut state = self.state.lock().await;
        state.insert(Collection::Products, to_document(product)?, Some(product.id.clone()))
    }

    pub async fn seed_order(&self, order: &Order) -> RemoteResult<String> {
        let mut state = self.state.lock().await;
        state.insert(Collection::Orders, to_document(order)?, Some(order.id.clone()))
    }

    /// Inserts a document verbatim, for exercising ingestion of sparse records.
    pub async fn seed_raw(&self, collection: Collection, document: Value) {
        self.state.lock().await.collection_mut(collection).push(document);
    }

    pub async fn set_id_proof(&self, user_id: &str, bytes: Vec<u8>) {
        self.state.lock().await.id_proofs.insert(user_id.to_string(), bytes);
    }

    pub async fn document(&self, collection: Collection, id: &str) -> Option<Value> {
        let state = self.state.lock().await;
        state
            .position(collection, id)
            .map(|index| state.collection(collection)[index].clone())
    }

    pub async fn count(&self, collection: Collection) -> usize {
        self.state.lock().await.collection(collection).len()
    }

    pub async fn stored_financials(&self) -> Option<GlobalFinancials> {
        let state = self.state.lock().await;
        state
            .financials
            .clone()
            .and_then(|value| serde_json::from_value(value).ok())
    }

    pub async fn stored_addons(&self) -> Option<AddonSettings> {
        let state = self.state.lock().await;
        state
            .addons
            .clone()
            .and_then(|value| serde_json::from_value(value).ok())
    }

    /// Entry point of every call: counts it, applies latency, fails when offline.
    async fn enter(&self) -> RemoteResult<tokio::sync::MutexGuard<'_, StoreState>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let latency = self.state.lock().await.latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        let state = self.state.lock().await;
        if state.offline {
            return Err(RemoteError::Unreachable("store offline".to_string()));
        }
        Ok(state)
    }
}

#[async_trait]
impl RemoteStore for InMemoryRemoteStore {
    async fn list_products(&self) -> RemoteResult<Vec<Product>> {
        let state = self.enter().await?;
        Ok(records::ingest_each(state.products.iter().cloned(), records::ingest_product))
    }

    async fn create_product(&self, product: &Product) -> RemoteResult<String> {
        let mut state = self.enter().await?;
        let id = state.insert(Collection::Products, to_document(product)?, None)?;
        debug!(product_id = %id, "Stored product");
        Ok(id)
    }

    async fn update_product(&self, id: &str, product: &Product) -> RemoteResult<()> {
        let mut state = self.enter().await?;
        state.merge(Collection::Products, id, to_document(product)?)
    }

    async fn delete_product(&self, id: &str) -> RemoteResult<()> {
        let mut state = self.enter().await?;
        state.remove(Collection::Products, id).map(|_| ())
    }

    async fn list_orders(&self, scope: &OrderScope) -> RemoteResult<Vec<Order>> {
        let state = self.enter().await?;
        let orders = records::ingest_each(state.orders.iter().cloned(), records::ingest_order);
        Ok(orders.into_iter().filter(|order| scope.includes(order)).collect())
    }

    async fn create_order(&self, order: &NewOrderRecord) -> RemoteResult<String> {
        let mut state = self.enter().await?;
        let id = state.insert(Collection::Orders, to_document(order)?, None)?;
        debug!(order_id = %id, "Stored order");
        Ok(id)
    }

    async fn update_order(&self, id: &str, patch: &OrderPatch) -> RemoteResult<()> {
        let mut state = self.enter().await?;
        state.merge(Collection::Orders, id, to_document(patch)?)
    }

    async fn delete_order(&self, id: &str) -> RemoteResult<()> {
        let mut state = self.enter().await?;
        state.remove(Collection::Orders, id).map(|_| ())
    }

    async fn list_users(&self) -> RemoteResult<Vec<User>> {
        let state = self.enter().await?;
        Ok(records::ingest_each(state.users.iter().cloned(), |doc| {
            records::ingest_user(doc, None)
        }))
    }

    async fn create_user(&self, registration: &Registration) -> RemoteResult<String> {
        let mut state = self.enter().await?;
        if state.user_by_email(&registration.email).is_some() {
            return Err(RemoteError::rejected(409, "User already exists"));
        }
        let document = json!({
            "name": registration.name,
            "email": registration.email,
            "role": registration.role,
        });
        let id = state.insert(Collection::Users, document, None)?;
        state
            .passwords
            .insert(registration.email.clone(), registration.password.clone());
        debug!(user_id = %id, "Stored user");
        Ok(id)
    }

    async fn update_user(&self, id: &str, patch: &UserPatch) -> RemoteResult<()> {
        let mut state = self.enter().await?;
        let mut document = to_document(patch)?;
        if patch.id_proof_url.is_some() {
            if let Value::Object(map) = &mut document {
                map.insert("hasIdProof".to_string(), Value::Bool(true));
            }
        }
        state.merge(Collection::Users, id, document)
    }

    async fn delete_user(&self, id: &str) -> RemoteResult<()> {
        let mut state = self.enter().await?;
        let removed = state.remove(Collection::Users, id)?;
        if let Some(email) = removed.get("email").and_then(Value::as_str) {
            state.passwords.remove(email);
        }
        state.id_proofs.remove(id);
        Ok(())
    }

    async fn login(&self, credentials: &Credentials) -> RemoteResult<User> {
        let state = self.enter().await?;
        let document = state
            .user_by_email(&credentials.email)
            .cloned()
            .ok_or_else(|| RemoteError::rejected(401, USER_NOT_FOUND))?;

        let password_matches = state.passwords.get(&credentials.email).map(String::as_str)
            == Some(credentials.password.as_deref().unwrap_or_default());
        let user = records::ingest_user(document, Some(credentials.role))?;
        if !password_matches || user.role != credentials.role {
            return Err(RemoteError::rejected(401, "Invalid credentials"));
        }
        Ok(user)
    }

    async fn id_proof(&self, user_id: &str) -> RemoteResult<Vec<u8>> {
        let state = self.enter().await?;
        if let Some(bytes) = state.id_proofs.get(user_id) {
            return Ok(bytes.clone());
        }
        state
            .position(Collection::Users, user_id)
            .and_then(|index| state.users[index].get("idProofUrl").and_then(Value::as_str))
            .map(|url| url.as_bytes().to_vec())
            .ok_or_else(|| RemoteError::rejected(404, "ID proof not found"))
    }

    async fn addon_settings(&self) -> RemoteResult<AddonSettings> {
        let state = self.enter().await?;
        let value = state
            .addons
            .clone()
            .ok_or_else(|| RemoteError::rejected(404, "Settings not found"))?;
        serde_json::from_value(value).map_err(|e| RemoteError::InvalidResponse(e.to_string()))
    }

    async fn put_addon_settings(&self, settings: &AddonSettings) -> RemoteResult<()> {
        let mut state = self.enter().await?;
        state.addons = Some(to_document(settings)?);
        Ok(())
    }

    async fn financials(&self) -> RemoteResult<GlobalFinancials> {
        let state = self.enter().await?;
        let value = state
            .financials
            .clone()
            .ok_or_else(|| RemoteError::rejected(404, "Settings not found"))?;
        serde_json::from_value(value).map_err(|e| RemoteError::InvalidResponse(e.to_string()))
    }

    async fn put_financials(&self, financials: &GlobalFinancials) -> RemoteResult<()> {
        let mut state = self.enter().await?;
        state.financials = Some(to_document(financials)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;

    fn registration(email: &str) -> Registration {
        Registration {
            name: "Ana".into(),
            email: email.into(),
            password: "secret".into(),
            role: Role::Customer,
        }
    }

    #[tokio::test]
    async fn products_round_trip_through_native_ids() {
        let store = InMemoryRemoteStore::new();
        let id = store
            .create_product(&Product::new("local-1", "PS5", 50.0, 150.0, 5))
            .await
            .unwrap();

        let document = store.document(Collection::Products, &id).await.unwrap();
        assert_eq!(document[NATIVE_ID_FIELD]["$oid"], id.as_str());
        assert!(document.get("id").is_none());

        let products = store.list_products().await.unwrap();
        assert_eq!(products[0].id, id);
        assert_eq!(products[0].name, "PS5");
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let store = InMemoryRemoteStore::new();
        store.create_user(&registration("ana@example.com")).await.unwrap();
        let result = store.create_user(&registration("ana@example.com")).await;
        assert_eq!(result, Err(RemoteError::rejected(409, "User already exists")));
    }

    #[tokio::test]
    async fn login_distinguishes_unknown_user_from_bad_password() {
        let store = InMemoryRemoteStore::new();
        store.create_user(&registration("ana@example.com")).await.unwrap();

        let unknown = store
            .login(&Credentials {
                email: "bob@example.com".into(),
                password: Some("secret".into()),
                role: Role::Customer,
            })
            .await
            .unwrap_err();
        assert!(unknown.is_user_not_found());

        let wrong = store
            .login(&Credentials {
                email: "ana@example.com".into(),
                password: Some("nope".into()),
                role: Role::Customer,
            })
            .await
            .unwrap_err();
        assert!(!wrong.is_user_not_found());
    }

    #[tokio::test]
    async fn order_patch_merges_only_supplied_fields() {
        let store = InMemoryRemoteStore::new();
        store
            .seed_raw(
                Collection::Orders,
                json!({ "_id": "o1", "userId": "u1", "productId": "p1", "totalPrice": 100, "status": "PENDING" }),
            )
            .await;

        store
            .update_order("o1", &OrderPatch::status(crate::domain::OrderStatus::Confirmed))
            .await
            .unwrap();

        let document = store.document(Collection::Orders, "o1").await.unwrap();
        assert_eq!(document["status"], "CONFIRMED");
        assert_eq!(document["totalPrice"], 100);
    }

    #[tokio::test]
    async fn listing_skips_malformed_documents() {
        let store = InMemoryRemoteStore::new();
        store
            .seed_raw(Collection::Orders, json!({ "_id": "o1", "userId": "u1", "productId": "p1" }))
            .await;
        store
            .seed_raw(Collection::Orders, json!({ "_id": "o2", "productId": "p1" }))
            .await;

        let orders = store.list_orders(&OrderScope::All).await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].id, "o1");
        assert_eq!(store.count(Collection::Orders).await, 2);
    }

    #[tokio::test]
    async fn offline_store_is_unreachable() {
        let store = InMemoryRemoteStore::new();
        store.set_offline(true).await;
        let result = store.list_products().await;
        assert!(matches!(result, Err(RemoteError::Unreachable(_))));
        assert_eq!(store.call_count(), 1);
    }
}
