use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::user::SavedLocation;

/// Unit a rental duration is counted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RentalPeriod {
    #[default]
    Weeks,
    Months,
}

/// Fulfillment status of a rental order.
///
/// Orders only move forward along
/// `Pending -> Confirmed -> Delivered -> Returned -> Completed`.
/// `Rejected` is terminal and only appears on records read back from the store,
/// since rejecting a pending order deletes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Delivered,
    Returned,
    Completed,
    Rejected,
}

impl OrderStatus {
    /// Statuses whose price has been earned.
    pub fn counts_as_revenue(self) -> bool {
        matches!(
            self,
            OrderStatus::Confirmed
                | OrderStatus::Delivered
                | OrderStatus::Returned
                | OrderStatus::Completed
        )
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Returned => "RETURNED",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Rejected => "REJECTED",
        };
        f.write_str(name)
    }
}

/// Admin-triggered status moves. Each one is legal from exactly one status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    Approve,
    MarkDelivered,
    MarkReturned,
    Settle,
}

impl Transition {
    pub fn from_status(self) -> OrderStatus {
        match self {
            Transition::Approve => OrderStatus::Pending,
            Transition::MarkDelivered => OrderStatus::Confirmed,
            Transition::MarkReturned => OrderStatus::Delivered,
            Transition::Settle => OrderStatus::Returned,
        }
    }

    pub fn to_status(self) -> OrderStatus {
        match self {
            Transition::Approve => OrderStatus::Confirmed,
            Transition::MarkDelivered => OrderStatus::Delivered,
            Transition::MarkReturned => OrderStatus::Returned,
            Transition::Settle => OrderStatus::Completed,
        }
    }

    /// The transition that moves an order to `target`, if any.
    pub fn into_status(target: OrderStatus) -> Option<Self> {
        match target {
            OrderStatus::Confirmed => Some(Transition::Approve),
            OrderStatus::Delivered => Some(Transition::MarkDelivered),
            OrderStatus::Returned => Some(Transition::MarkReturned),
            OrderStatus::Completed => Some(Transition::Settle),
            OrderStatus::Pending | OrderStatus::Rejected => None,
        }
    }
}

/// A cost booked against a single order (shipping, repairs, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderExpense {
    pub id: String,
    pub label: String,
    pub amount: f64,
    pub date: DateTime<Utc>,
}

impl OrderExpense {
    pub fn new(label: impl Into<String>, amount: f64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            label: label.into(),
            amount,
            date: Utc::now(),
        }
    }
}

/// Represents a customer rental order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub user_id: String,
    pub product_id: String,
    pub product_name: String,
    #[serde(default)]
    pub product_image: String,
    pub duration: u32,
    pub period: RentalPeriod,
    pub total_price: f64,
    pub status: OrderStatus,
    /// Snapshot of the address at placement time, not a live reference.
    pub delivery_location: SavedLocation,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rental_start_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rental_end_date: Option<DateTime<Utc>>,
    #[serde(default, rename = "psPlusExtra")]
    pub subscription_extra: bool,
    #[serde(default)]
    pub extra_controller: bool,
    #[serde(default)]
    pub expenses: Vec<OrderExpense>,
}

impl Order {
    pub fn expenses_total(&self) -> f64 {
        self.expenses.iter().map(|expense| expense.amount).sum()
    }

    /// Whether the rental window covers `day` (inclusive on both ends).
    pub fn covers_day(&self, day: chrono::NaiveDate) -> bool {
        match (self.rental_start_date, self.rental_end_date) {
            (Some(start), Some(end)) => start.date_naive() <= day && day <= end.date_naive(),
            _ => false,
        }
    }
}

/// Body of `POST /orders`: everything but the identifier and the expense list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderRecord {
    pub user_id: String,
    pub product_id: String,
    pub product_name: String,
    pub product_image: String,
    pub duration: u32,
    pub period: RentalPeriod,
    pub total_price: f64,
    pub status: OrderStatus,
    pub delivery_location: SavedLocation,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rental_start_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rental_end_date: Option<DateTime<Utc>>,
    #[serde(rename = "psPlusExtra")]
    pub subscription_extra: bool,
    pub extra_controller: bool,
}

impl From<&Order> for NewOrderRecord {
    fn from(order: &Order) -> Self {
        Self {
            user_id: order.user_id.clone(),
            product_id: order.product_id.clone(),
            product_name: order.product_name.clone(),
            product_image: order.product_image.clone(),
            duration: order.duration,
            period: order.period,
            total_price: order.total_price,
            status: order.status,
            delivery_location: order.delivery_location.clone(),
            created_at: order.created_at,
            rental_start_date: order.rental_start_date,
            rental_end_date: order.rental_end_date,
            subscription_extra: order.subscription_extra,
            extra_controller: order.extra_controller,
        }
    }
}

/// Checkout form submitted by a customer.
///
/// `phone` and `id_proof` are written to the profile alongside the order when supplied.
#[derive(Debug, Clone, PartialEq)]
pub struct RentalRequest {
    pub product_id: String,
    pub duration: u32,
    pub period: RentalPeriod,
    pub total_price: f64,
    pub delivery_location: SavedLocation,
    pub rental_start_date: Option<DateTime<Utc>>,
    pub rental_end_date: Option<DateTime<Utc>>,
    pub subscription_extra: bool,
    pub extra_controller: bool,
    pub phone: Option<String>,
    pub id_proof: Option<String>,
}

impl RentalRequest {
    pub fn new(
        product_id: impl Into<String>,
        duration: u32,
        period: RentalPeriod,
        total_price: f64,
        delivery_location: SavedLocation,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            duration,
            period,
            total_price,
            delivery_location,
            rental_start_date: None,
            rental_end_date: None,
            subscription_extra: false,
            extra_controller: false,
            phone: None,
            id_proof: None,
        }
    }

    pub fn with_dates(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.rental_start_date = Some(start);
        self.rental_end_date = Some(end);
        self
    }

    pub fn with_addons(mut self, subscription_extra: bool, extra_controller: bool) -> Self {
        self.subscription_extra = subscription_extra;
        self.extra_controller = extra_controller;
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_id_proof(mut self, id_proof: impl Into<String>) -> Self {
        self.id_proof = Some(id_proof.into());
        self
    }
}

/// Partial update for `PUT /orders/{id}`. Only supplied fields change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expenses: Option<Vec<OrderExpense>>,
}

impl OrderPatch {
    pub fn status(status: OrderStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn expenses(expenses: Vec<OrderExpense>) -> Self {
        Self {
            expenses: Some(expenses),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions_form_a_single_forward_chain() {
        let mut status = OrderStatus::Pending;
        for transition in [
            Transition::Approve,
            Transition::MarkDelivered,
            Transition::MarkReturned,
            Transition::Settle,
        ] {
            assert_eq!(transition.from_status(), status);
            status = transition.to_status();
        }
        assert_eq!(status, OrderStatus::Completed);
    }

    #[test]
    fn no_transition_leads_back_to_pending() {
        assert_eq!(Transition::into_status(OrderStatus::Pending), None);
        assert_eq!(Transition::into_status(OrderStatus::Rejected), None);
        assert_eq!(
            Transition::into_status(OrderStatus::Delivered),
            Some(Transition::MarkDelivered)
        );
    }

    #[test]
    fn revenue_statuses_exclude_pending_and_rejected() {
        assert!(!OrderStatus::Pending.counts_as_revenue());
        assert!(!OrderStatus::Rejected.counts_as_revenue());
        assert!(OrderStatus::Confirmed.counts_as_revenue());
        assert!(OrderStatus::Completed.counts_as_revenue());
    }

    #[test]
    fn status_patch_serializes_only_supplied_fields() {
        let patch = OrderPatch::status(OrderStatus::Confirmed);
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json, serde_json::json!({ "status": "CONFIRMED" }));
    }
}
