use std::collections::HashSet;

use chrono::Utc;
use tracing::{error, info, instrument, warn};

use crate::actor_framework::{CacheClient, InsertAt};
use crate::clients::{ProductClient, SyncClient, UserClient};
use crate::domain::{
    is_valid_phone, NewOrderRecord, Order, OrderExpense, OrderPatch, OrderStatus, RentalRequest,
    Transition, User, UserPatch, VerificationStatus,
};
use crate::order_actor::{OrderAction, OrderActionResult, OrderError};
use crate::sync::{provisional_id, SyncJob};

/// Outcome of a successful checkout.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub order: Order,
    /// The customer's profile after the phone/proof batched with the order, if it changed.
    pub profile: Option<User>,
}

/// Client for the Orders cache and the order lifecycle.
///
/// Validates against the Users and Products caches before touching anything,
/// mutates the Orders cache, then queues the matching remote write.
#[derive(Clone)]
pub struct OrderClient {
    inner: CacheClient<Order>,
    users: UserClient,
    products: ProductClient,
    sync: SyncClient,
}

impl_cache_methods!(OrderClient, Order, OrderError, order);

impl OrderClient {
    pub fn new(inner: CacheClient<Order>, users: UserClient, products: ProductClient, sync: SyncClient) -> Self {
        Self {
            inner,
            users,
            products,
            sync,
        }
    }

    async fn enqueue(&self, job: SyncJob) {
        if let Err(e) = self.sync.submit(job).await {
            error!(error = %e, "Could not queue remote write");
        }
    }

    /// Creates a PENDING order for `user` with a provisional id.
    ///
    /// Every precondition is checked before any cache changes. A phone that differs
    /// from the profile, and an attached id proof, are written to the profile in the
    /// same step; attaching a proof to an unreviewed or rejected account puts it
    /// back into review.
    #[instrument(
        skip(self, user, request),
        fields(user_id = %user.id, product_id = %request.product_id, duration = request.duration)
    )]
    pub async fn place_order(&self, user: &User, request: RentalRequest) -> Result<Placement, OrderError> {
        info!("Processing place_order request");

        // Step 1: Delivery address
        if user.saved_locations.is_empty() {
            warn!("No saved location");
            return Err(OrderError::MissingLocation);
        }

        // Step 2: Product and stock
        let product = match self.products.get_product(&request.product_id).await {
            Ok(Some(product)) => product,
            Ok(None) => {
                error!("Product not found");
                return Err(OrderError::InvalidProduct(request.product_id.clone()));
            }
            Err(e) => {
                error!(error = %e, "Product validation failed");
                return Err(OrderError::InvalidProduct(format!("Product validation failed: {}", e)));
            }
        };
        if !product.in_stock() {
            warn!(product_name = %product.name, "Product out of stock");
            return Err(OrderError::OutOfStock(product.id));
        }

        // Step 3: Contact phone
        let phone = request
            .phone
            .clone()
            .or_else(|| user.phone.clone())
            .unwrap_or_default();
        if !is_valid_phone(&phone) {
            return Err(OrderError::InvalidPhone(phone));
        }

        // Step 4: Identity proof
        if !user.has_id_proof_on_file() && request.id_proof.is_none() {
            return Err(OrderError::MissingIdProof);
        }

        if request.duration < 1 {
            return Err(OrderError::InvalidDuration(request.duration));
        }

        // Step 5: Optimistic insert
        let order = Order {
            id: provisional_id(),
            user_id: user.id.clone(),
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            product_image: product.display_image().unwrap_or_default().to_string(),
            duration: request.duration,
            period: request.period,
            total_price: request.total_price,
            status: OrderStatus::Pending,
            delivery_location: request.delivery_location,
            created_at: Utc::now(),
            rental_start_date: request.rental_start_date,
            rental_end_date: request.rental_end_date,
            subscription_extra: request.subscription_extra,
            extra_controller: request.extra_controller,
            expenses: Vec::new(),
        };
        self.inner.insert(order.clone(), InsertAt::Front).await?;

        // Step 6: Profile changes batched with the order
        let mut patch = UserPatch::default();
        if user.phone.as_deref() != Some(phone.as_str()) {
            patch.phone = Some(phone);
        }
        if let Some(proof) = &request.id_proof {
            patch.id_proof_url = Some(proof.clone());
            if user.id_verification_status.accepts_new_proof() {
                patch.id_verification_status = Some(VerificationStatus::Pending);
            }
        }
        let profile = if patch.is_empty() {
            None
        } else {
            if let Err(e) = self.users.update_if_cached(&user.id, patch.clone()).await {
                error!(error = %e, "Profile update failed, withdrawing order");
                if let Err(e) = self.inner.delete(&order.id).await {
                    warn!(error = %e, "Could not withdraw order");
                }
                return Err(OrderError::InvalidUser(e.to_string()));
            }
            let mut updated = user.clone();
            updated.apply_patch(&patch);
            self.enqueue(SyncJob::UpdateUser {
                id: user.id.clone(),
                patch,
            })
            .await;
            Some(updated)
        };

        // Step 7: Remote create
        self.enqueue(SyncJob::CreateOrder {
            provisional_id: order.id.clone(),
            record: NewOrderRecord::from(&order),
        })
        .await;

        info!(order_id = %order.id, total_price = order.total_price, "Order placed");
        Ok(Placement { order, profile })
    }

    async fn advance(&self, id: &str, transition: Transition) -> Result<OrderStatus, OrderError> {
        match self.inner.perform_action(id, OrderAction::Advance(transition)).await? {
            OrderActionResult::Advance { from, to } => {
                info!(order_id = %id, %from, %to, "Order status changed");
                self.enqueue(SyncJob::UpdateOrder {
                    id: id.to_string(),
                    patch: OrderPatch::status(to),
                })
                .await;
                Ok(to)
            }
            other => Err(OrderError::ActorCommunicationError(format!("Unexpected result: {:?}", other))),
        }
    }

    async fn require_order(&self, id: &str) -> Result<Order, OrderError> {
        self.inner
            .get(id)
            .await?
            .ok_or_else(|| OrderError::NotFound(id.to_string()))
    }

    /// PENDING -> CONFIRMED, only for owners with a verified identity.
    #[instrument(skip(self))]
    pub async fn approve(&self, id: &str) -> Result<OrderStatus, OrderError> {
        let order = self.require_order(id).await?;
        let owner = self
            .users
            .get_user(&order.user_id)
            .await
            .map_err(|e| OrderError::InvalidUser(format!("User validation failed: {}", e)))?
            .ok_or_else(|| OrderError::InvalidUser(order.user_id.clone()))?;

        if owner.id_verification_status != VerificationStatus::Verified {
            warn!(user_id = %owner.id, status = ?owner.id_verification_status, "Approval blocked");
            return Err(OrderError::UserNotVerified(owner.id));
        }
        self.advance(id, Transition::Approve).await
    }

    #[instrument(skip(self))]
    pub async fn mark_delivered(&self, id: &str) -> Result<OrderStatus, OrderError> {
        self.advance(id, Transition::MarkDelivered).await
    }

    #[instrument(skip(self))]
    pub async fn mark_returned(&self, id: &str) -> Result<OrderStatus, OrderError> {
        self.advance(id, Transition::MarkReturned).await
    }

    #[instrument(skip(self))]
    pub async fn settle(&self, id: &str) -> Result<OrderStatus, OrderError> {
        self.advance(id, Transition::Settle).await
    }

    /// Rejecting removes a PENDING order outright; nothing records the rejection.
    #[instrument(skip(self))]
    pub async fn reject(&self, id: &str) -> Result<Order, OrderError> {
        let order = self.require_order(id).await?;
        if order.status != OrderStatus::Pending {
            return Err(OrderError::InvalidTransition {
                from: order.status,
                to: OrderStatus::Rejected,
            });
        }
        self.delete(id)
            .await?
            .ok_or_else(|| OrderError::NotFound(id.to_string()))
    }

    /// Idempotent: deleting a missing order returns `None` and queues nothing.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<Option<Order>, OrderError> {
        let removed = self.inner.delete(id).await?;
        if removed.is_some() {
            info!("Order deleted");
            self.enqueue(SyncJob::DeleteOrder { id: id.to_string() }).await;
        }
        Ok(removed)
    }

    #[instrument(skip(self, label), fields(label = %label))]
    pub async fn add_expense(&self, id: &str, label: String, amount: f64) -> Result<OrderExpense, OrderError> {
        let expense = OrderExpense::new(label, amount);
        match self
            .inner
            .perform_action(id, OrderAction::AddExpense(expense.clone()))
            .await?
        {
            OrderActionResult::AddExpense(expenses) => {
                self.enqueue(SyncJob::UpdateOrder {
                    id: id.to_string(),
                    patch: OrderPatch::expenses(expenses),
                })
                .await;
                Ok(expense)
            }
            other => Err(OrderError::ActorCommunicationError(format!("Unexpected result: {:?}", other))),
        }
    }

    #[instrument(skip(self))]
    pub async fn remove_expense(&self, id: &str, expense_id: &str) -> Result<Vec<OrderExpense>, OrderError> {
        match self
            .inner
            .perform_action(id, OrderAction::RemoveExpense(expense_id.to_string()))
            .await?
        {
            OrderActionResult::RemoveExpense(expenses) => {
                self.enqueue(SyncJob::UpdateOrder {
                    id: id.to_string(),
                    patch: OrderPatch::expenses(expenses.clone()),
                })
                .await;
                Ok(expenses)
            }
            other => Err(OrderError::ActorCommunicationError(format!("Unexpected result: {:?}", other))),
        }
    }

    /// Deletes every cached order whose owner is missing from the Users cache.
    #[instrument(skip(self))]
    pub async fn purge_orphans(&self) -> Result<Vec<String>, OrderError> {
        let known: HashSet<String> = self
            .users
            .list_users()
            .await
            .map_err(|e| OrderError::InvalidUser(e.to_string()))?
            .into_iter()
            .map(|user| user.id)
            .collect();

        let mut purged = Vec::new();
        for order in self.inner.list().await? {
            if !known.contains(&order.user_id) && self.delete(&order.id).await?.is_some() {
                purged.push(order.id);
            }
        }
        info!(purged = purged.len(), "Orphan orders purged");
        Ok(purged)
    }
}
