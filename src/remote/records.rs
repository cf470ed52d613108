//! Typed ingestion of store records.
//!
//! The store may name the identifier `id` or `_id` (plain string or `{"$oid": ..}`)
//! and may omit any optional field. Each `ingest_*` function maps one raw record to
//! the internal entity, defaulting every optional field explicitly.

use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::warn;

use super::{RemoteError, RemoteResult};
use crate::domain::{
    Order, OrderExpense, OrderStatus, Product, RentalPeriod, Role, SavedLocation, User,
    VerificationStatus,
};

/// Field name the store uses for its own identifier.
pub const NATIVE_ID_FIELD: &str = "_id";

fn id_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => map.get("$oid").and_then(id_from_value),
        _ => None,
    }
}

/// Copies the store identifier into the internal `id` field and drops `_id`.
pub fn normalize_id(record: &mut Map<String, Value>) -> RemoteResult<String> {
    let id = record
        .get("id")
        .and_then(id_from_value)
        .or_else(|| record.get(NATIVE_ID_FIELD).and_then(id_from_value))
        .ok_or_else(|| RemoteError::InvalidResponse("record without identifier".to_string()))?;
    record.remove(NATIVE_ID_FIELD);
    record.insert("id".to_string(), Value::String(id.clone()));
    Ok(id)
}

fn into_object(value: Value, kind: &str) -> RemoteResult<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(RemoteError::InvalidResponse(format!(
            "expected {} object, got {}",
            kind, other
        ))),
    }
}

fn parse<T: for<'de> Deserialize<'de>>(map: Map<String, Value>, kind: &str) -> RemoteResult<T> {
    serde_json::from_value(Value::Object(map))
        .map_err(|e| RemoteError::InvalidResponse(format!("malformed {}: {}", kind, e)))
}

/// Accepts numbers sent as JSON numbers or numeric strings.
fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s.trim().parse().map(Some).map_err(de::Error::custom),
        Some(other) => Err(de::Error::custom(format!("expected number, got {}", other))),
    }
}

// =============================================================================
// Users
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct LocationRecord {
    id: Option<String>,
    name: Option<String>,
    address: Option<String>,
    pincode: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    lat: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    lng: Option<f64>,
}

impl LocationRecord {
    fn into_location(self, fallback_id: usize) -> SavedLocation {
        SavedLocation {
            id: self.id.unwrap_or_else(|| format!("loc-{}", fallback_id)),
            name: self.name.unwrap_or_else(|| "Home".to_string()),
            address: self.address.unwrap_or_default(),
            pincode: self.pincode.unwrap_or_default(),
            lat: self.lat.unwrap_or(0.0),
            lng: self.lng.unwrap_or(0.0),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserRecord {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    role: Option<Role>,
    #[serde(default)]
    age: Option<u32>,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    saved_locations: Option<Vec<LocationRecord>>,
    #[serde(default)]
    id_verification_status: Option<VerificationStatus>,
    #[serde(default)]
    id_proof_url: Option<String>,
    #[serde(default)]
    has_id_proof: Option<bool>,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    is_primary: Option<bool>,
}

/// Maps a store user to a complete [`User`]. `role_hint` fills a missing role.
pub fn ingest_user(value: Value, role_hint: Option<Role>) -> RemoteResult<User> {
    let mut map = into_object(value, "user")?;
    normalize_id(&mut map)?;
    let record: UserRecord = parse(map, "user")?;
    let role = record.role.or(role_hint).unwrap_or_default();

    Ok(User {
        id: record.id,
        name: record
            .name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| role.default_display_name().to_string()),
        email: record.email.unwrap_or_default(),
        role,
        age: record.age,
        phone: record.phone.filter(|phone| !phone.is_empty()),
        saved_locations: record
            .saved_locations
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(index, location)| location.into_location(index))
            .collect(),
        id_verification_status: record.id_verification_status.unwrap_or_default(),
        id_proof_url: record.id_proof_url.filter(|url| !url.is_empty()),
        has_id_proof: record.has_id_proof,
        notes: record.notes,
        is_primary: record.is_primary.unwrap_or(false),
    })
}

// =============================================================================
// Products
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductRecord {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    price_per_week: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    price_per_month: Option<f64>,
    #[serde(default)]
    stock: Option<u32>,
    #[serde(default)]
    total_stock: Option<u32>,
}

/// Maps a store product to a [`Product`], repairing `stock > total_stock`.
pub fn ingest_product(value: Value) -> RemoteResult<Product> {
    let mut map = into_object(value, "product")?;
    normalize_id(&mut map)?;
    let record: ProductRecord = parse(map, "product")?;
    let stock = record.stock.unwrap_or(0);

    Ok(Product {
        id: record.id,
        name: record.name.unwrap_or_default(),
        category: record.category.unwrap_or_default(),
        description: record.description.unwrap_or_default(),
        image: record.image.filter(|image| !image.is_empty()),
        image_url: record.image_url.filter(|url| !url.is_empty()),
        price_per_week: record.price_per_week.unwrap_or(0.0),
        price_per_month: record.price_per_month.unwrap_or(0.0),
        stock,
        total_stock: record.total_stock.unwrap_or(stock).max(stock),
    })
}

// =============================================================================
// Orders
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExpenseRecord {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    label: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    amount: Option<f64>,
    #[serde(default)]
    date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderRecord {
    id: String,
    user_id: String,
    product_id: String,
    #[serde(default)]
    product_name: Option<String>,
    #[serde(default)]
    product_image: Option<String>,
    #[serde(default)]
    duration: Option<u32>,
    #[serde(default)]
    period: Option<RentalPeriod>,
    #[serde(default, deserialize_with = "lenient_f64")]
    total_price: Option<f64>,
    #[serde(default)]
    status: Option<OrderStatus>,
    #[serde(default)]
    delivery_location: Option<LocationRecord>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    rental_start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    rental_end_date: Option<DateTime<Utc>>,
    #[serde(default, rename = "psPlusExtra")]
    subscription_extra: Option<bool>,
    #[serde(default)]
    extra_controller: Option<bool>,
    #[serde(default)]
    expenses: Option<Vec<ExpenseRecord>>,
}

/// Maps a store order to an [`Order`].
pub fn ingest_order(value: Value) -> RemoteResult<Order> {
    let mut map = into_object(value, "order")?;
    normalize_id(&mut map)?;
    let record: OrderRecord = parse(map, "order")?;

    let expenses = record
        .expenses
        .unwrap_or_default()
        .into_iter()
        .map(|expense| OrderExpense {
            id: expense.id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            label: expense.label.unwrap_or_default(),
            amount: expense.amount.unwrap_or(0.0),
            date: expense.date.unwrap_or_default(),
        })
        .collect();

    Ok(Order {
        id: record.id,
        user_id: record.user_id,
        product_id: record.product_id,
        product_name: record.product_name.unwrap_or_default(),
        product_image: record.product_image.unwrap_or_default(),
        duration: record.duration.unwrap_or(1),
        period: record.period.unwrap_or_default(),
        total_price: record.total_price.unwrap_or(0.0),
        status: record.status.unwrap_or_default(),
        delivery_location: record
            .delivery_location
            .unwrap_or_default()
            .into_location(0),
        created_at: record.created_at.unwrap_or_default(),
        rental_start_date: record.rental_start_date,
        rental_end_date: record.rental_end_date,
        subscription_extra: record.subscription_extra.unwrap_or(false),
        extra_controller: record.extra_controller.unwrap_or(false),
        expenses,
    })
}

// =============================================================================
// Envelopes
// =============================================================================

/// Ingests each record on its own; malformed records are logged and skipped.
pub fn ingest_each<T>(
    records: impl IntoIterator<Item = Value>,
    ingest: impl Fn(Value) -> RemoteResult<T>,
) -> Vec<T> {
    records
        .into_iter()
        .enumerate()
        .filter_map(|(index, record)| {
            let record_id = record
                .get("id")
                .or_else(|| record.get(NATIVE_ID_FIELD))
                .and_then(id_from_value);
            match ingest(record) {
                Ok(entity) => Some(entity),
                Err(e) => {
                    warn!(index, record_id = ?record_id, error = %e, "Skipping malformed record");
                    None
                }
            }
        })
        .collect()
}

/// Ingests a JSON array. Only a non-array body fails the whole fetch.
pub fn ingest_list<T>(value: Value, ingest: impl Fn(Value) -> RemoteResult<T>) -> RemoteResult<Vec<T>> {
    match value {
        Value::Array(items) => Ok(ingest_each(items, ingest)),
        other => Err(RemoteError::InvalidResponse(format!("expected array, got {}", other))),
    }
}

/// Reads the identifier out of a create answer (`{"id": ..}` or `{"_id": ..}`).
pub fn ingest_created_id(value: Value) -> RemoteResult<String> {
    let mut map = into_object(value, "create response")?;
    normalize_id(&mut map)
}

/// Unwraps the `{"user": {..}}` login envelope.
pub fn ingest_login(value: Value, role_hint: Role) -> RemoteResult<User> {
    let mut map = into_object(value, "login response")?;
    let user = map
        .remove("user")
        .ok_or_else(|| RemoteError::InvalidResponse("login response without user".to_string()))?;
    ingest_user(user, Some(role_hint))
}

/// Extracts the machine-readable reason from an error body, falling back to raw text.
pub fn error_reason(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("error")
                .or_else(|| value.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn native_object_id_is_copied_into_id() {
        let product = ingest_product(json!({
            "_id": { "$oid": "694e949f046ce9f947da4880" },
            "name": "PlayStation 5 Console",
            "pricePerWeek": 50,
            "pricePerMonth": "150",
            "stock": 5
        }))
        .unwrap();

        assert_eq!(product.id, "694e949f046ce9f947da4880");
        assert_eq!(product.price_per_month, 150.0);
        assert_eq!(product.total_stock, 5);
    }

    #[test]
    fn internal_id_wins_over_native_id() {
        let mut map = json!({ "id": "p1", "_id": "abc" }).as_object().cloned().unwrap();
        assert_eq!(normalize_id(&mut map).unwrap(), "p1");
        assert!(!map.contains_key(NATIVE_ID_FIELD));
    }

    #[test]
    fn record_without_identifier_is_invalid() {
        let result = ingest_product(json!({ "name": "Ghost" }));
        assert!(matches!(result, Err(RemoteError::InvalidResponse(_))));
    }

    #[test]
    fn sparse_user_gets_explicit_defaults() {
        let user = ingest_user(json!({ "_id": "u1", "email": "a@b.com" }), Some(Role::Admin)).unwrap();

        assert_eq!(user.id, "u1");
        assert_eq!(user.name, "Admin");
        assert_eq!(user.role, Role::Admin);
        assert!(user.saved_locations.is_empty());
        assert_eq!(user.id_verification_status, VerificationStatus::None);
        assert!(!user.is_primary);
    }

    #[test]
    fn order_expenses_accept_string_amounts() {
        let order = ingest_order(json!({
            "_id": "o1",
            "userId": "u1",
            "productId": "p1",
            "totalPrice": 100,
            "status": "CONFIRMED",
            "expenses": [{ "id": "e1", "label": "Shipping", "amount": "10" }]
        }))
        .unwrap();

        assert_eq!(order.status, OrderStatus::Confirmed);
        assert_eq!(order.expenses_total(), 10.0);
        assert_eq!(order.duration, 1);
    }

    #[test]
    fn malformed_record_does_not_hide_the_rest() {
        let orders = ingest_list(
            json!([
                { "_id": "o1", "userId": "u1", "productId": "p1" },
                { "_id": "o2", "productId": "p1" },
                { "userId": "u3", "productId": "p1" },
                { "id": "o4", "userId": "u4", "productId": "p2" }
            ]),
            ingest_order,
        )
        .unwrap();

        let ids: Vec<_> = orders.iter().map(|order| order.id.as_str()).collect();
        assert_eq!(ids, vec!["o1", "o4"]);
    }

    #[test]
    fn non_array_body_is_invalid() {
        let result = ingest_list(json!({ "error": "nope" }), ingest_product);
        assert!(matches!(result, Err(RemoteError::InvalidResponse(_))));
    }

    #[test]
    fn error_reason_prefers_structured_field() {
        assert_eq!(error_reason(r#"{"error":"User not found"}"#), "User not found");
        assert_eq!(error_reason("Bad Gateway"), "Bad Gateway");
    }
}
