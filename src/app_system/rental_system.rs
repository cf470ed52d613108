use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};

use super::config::StoreConfig;
use super::error::StoreError;
use crate::actor_framework::{CacheActor, InsertAt};
use crate::availability::{self, BookedCounts};
use crate::catalog;
use crate::clients::{OrderClient, ProductClient, SettingsClient, SyncClient, UserClient};
use crate::domain::{
    AddonSettings, GlobalFinancials, Order, OrderExpense, OrderStatus, OverheadBucket, Product,
    ProductDraft, Registration, RentalPeriod, RentalRequest, Role, SavedLocation, User, UserPatch,
    VerificationStatus,
};
use crate::finance::{self, FinancialSummary};
use crate::pricing::{self, AddonSelection, Quote};
use crate::product_actor::{validate_draft, ProductError, ProductPatch};
use crate::remote::{bounded, OrderScope, RemoteError, RemoteStore};
use crate::session::{SessionManager, SessionStorage, SocialProvider};
use crate::settings_actor::SettingsService;
use crate::sync::{provisional_id, SyncFailure, SyncJob, SyncWorker};
use crate::user_actor::{validate_patch, UserError};

/// Everything a reconciliation pass needs. Cheap to clone.
#[derive(Clone)]
struct SystemContext {
    orders: OrderClient,
    users: UserClient,
    products: ProductClient,
    settings: SettingsClient,
    sync: SyncClient,
    session: Arc<SessionManager>,
    remote: Arc<dyn RemoteStore>,
    timeout: Duration,
    /// Generation of the latest reconciliation pass.
    passes: Arc<AtomicU64>,
}

impl SystemContext {
    async fn enqueue(&self, job: SyncJob) {
        if let Err(e) = self.sync.submit(job).await {
            error!(error = %e, "Could not queue remote write");
        }
    }

    /// Fetches the catalog, posting the starter products first when the store has none.
    /// `since` tags a reconciliation load so tracked local changes survive it.
    async fn load_products(&self, seed: bool, since: Option<u64>) -> Result<usize, StoreError> {
        let mut products = bounded(self.timeout, self.remote.list_products()).await?;
        if products.is_empty() && seed {
            info!("Store has no products, seeding starter catalog");
            for product in catalog::default_products() {
                bounded(self.timeout, self.remote.create_product(&product)).await?;
            }
            products = bounded(self.timeout, self.remote.list_products()).await?;
        }
        Ok(match since {
            Some(generation) => self.products.reload_products(products, generation).await?,
            None => self.products.load_products(products).await?,
        })
    }

    /// Settings the store has not stored yet keep their local values; missing
    /// addon pricing is seeded with the starter prices when `seed` is set.
    async fn load_settings(&self, seed: bool) -> Result<(), StoreError> {
        let mut addons = self.settings.get_addons().await?;
        let mut financials = self.settings.get_financials().await?;

        match bounded(self.timeout, self.remote.addon_settings()).await {
            Ok(stored) => addons = stored,
            Err(RemoteError::Rejected { status: 404, .. }) if seed => {
                info!("No addon settings stored, seeding starter prices");
                addons = catalog::default_addons();
                self.enqueue(SyncJob::PutAddons(addons)).await;
            }
            Err(e) => warn!(error = %e, "Addon settings not loaded"),
        }
        match bounded(self.timeout, self.remote.financials()).await {
            Ok(stored) => financials = stored,
            Err(e) => warn!(error = %e, "Financials not loaded"),
        }

        Ok(self.settings.load(addons, financials).await?)
    }

    async fn load_orders(&self, orders: Vec<Order>, since: Option<u64>) -> Result<usize, StoreError> {
        Ok(match since {
            Some(generation) => self.orders.reload_orders(orders, generation).await?,
            None => self.orders.load_orders(orders).await?,
        })
    }

    /// Admins see every order and user; customers only their own orders.
    async fn load_role_scoped(&self, user: &User, since: Option<u64>) -> Result<(), StoreError> {
        if user.is_admin() {
            let orders = bounded(self.timeout, self.remote.list_orders(&OrderScope::All)).await?;
            let users = bounded(self.timeout, self.remote.list_users()).await?;
            self.load_orders(orders, since).await?;
            match since {
                Some(generation) => self.users.reload_users(users, generation).await?,
                None => self.users.load_users(users).await?,
            };
        } else {
            let scope = OrderScope::OwnedBy(user.id.clone());
            let orders = bounded(self.timeout, self.remote.list_orders(&scope))
                .await?
                .into_iter()
                .filter(|order| scope.includes(order))
                .collect();
            self.load_orders(orders, since).await?;
            self.users.clear_users().await?;
        }
        Ok(())
    }

    async fn clear_role_scoped(&self) -> Result<(), StoreError> {
        self.orders.clear_orders().await?;
        self.users.clear_users().await?;
        Ok(())
    }

    /// Drains pending writes, then replaces every cache with the store's view.
    /// Entries changed locally once the pass has started keep their local state:
    /// their writes may still be queued behind the fetch.
    #[instrument(skip(self))]
    async fn reconcile(&self) -> Result<(), StoreError> {
        let generation = self.passes.fetch_add(1, Ordering::SeqCst) + 1;
        self.products.track_product_changes(generation).await?;
        self.orders.track_order_changes(generation).await?;
        self.users.track_user_changes(generation).await?;

        self.sync.flush().await?;
        self.load_products(false, Some(generation)).await?;
        self.load_settings(false).await?;
        match self.session.current_user().await {
            Some(user) => self.load_role_scoped(&user, Some(generation)).await?,
            None => self.clear_role_scoped().await?,
        }
        info!("Caches reconciled with store");
        Ok(())
    }
}

/// The rental store core: caches, settings, the sync worker and the session,
/// started together and shut down together.
pub struct RentalSystem {
    ctx: SystemContext,
    handles: Vec<JoinHandle<()>>,
    reconciler: Option<JoinHandle<()>>,
}

impl RentalSystem {
    /// Spawns every actor, restores any persisted session, then loads the
    /// catalog and settings followed by the collections the session may see.
    /// Load failures are logged; the system starts with whatever it could fetch.
    #[instrument(skip(config, remote))]
    pub async fn start(config: StoreConfig, remote: Arc<dyn RemoteStore>) -> Result<Self, StoreError> {
        info!("Starting rental system");
        let buffer = config.channel_buffer;

        let (user_actor, user_cache) = CacheActor::<User>::new(buffer);
        let (product_actor, product_cache) = CacheActor::<Product>::new(buffer);
        let (order_actor, order_cache) = CacheActor::<Order>::new(buffer);
        let (settings_service, settings) = SettingsService::new(buffer);
        let (sync_worker, sync) = SyncWorker::new(
            buffer,
            Arc::clone(&remote),
            config.request_timeout,
            product_cache.clone(),
            order_cache.clone(),
        );

        let handles = vec![
            tokio::spawn(user_actor.run()),
            tokio::spawn(product_actor.run()),
            tokio::spawn(order_actor.run()),
            tokio::spawn(settings_service.run()),
            tokio::spawn(sync_worker.run()),
        ];

        let users = UserClient::new(user_cache);
        let products = ProductClient::new(product_cache);
        let orders = OrderClient::new(order_cache, users.clone(), products.clone(), sync.clone());

        let storage = match &config.session_dir {
            Some(dir) => SessionStorage::in_dir(dir),
            None => SessionStorage::ephemeral(),
        };
        let session = Arc::new(SessionManager::new(Arc::clone(&remote), storage, config.request_timeout));

        let ctx = SystemContext {
            orders,
            users,
            products,
            settings,
            sync,
            session,
            remote,
            timeout: config.request_timeout,
            passes: Arc::new(AtomicU64::new(0)),
        };

        // Step 1: Session, without touching the network
        let restored = ctx.session.restore().await;

        // Step 2: Catalog and settings
        if let Err(e) = ctx.load_products(config.seed_catalog, None).await {
            warn!(error = %e, "Products not loaded");
        }
        if let Err(e) = ctx.load_settings(config.seed_catalog).await {
            warn!(error = %e, "Settings not loaded");
        }

        // Step 3: Role-scoped collections
        if let Some(user) = restored {
            if let Err(e) = ctx.load_role_scoped(&user, None).await {
                warn!(error = %e, "Orders and users not loaded");
            }
        }

        let reconciler = config.reconcile_interval.map(|interval| {
            let ctx = ctx.clone();
            info!(?interval, "Periodic reconciliation enabled");
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    if let Err(e) = ctx.reconcile().await {
                        warn!(error = %e, "Reconciliation pass failed");
                    }
                }
            })
        });

        info!("Rental system started");
        Ok(Self {
            ctx,
            handles,
            reconciler,
        })
    }

    // --- Session ---

    #[instrument(skip(self, password))]
    pub async fn login(
        &self,
        email: &str,
        role: Role,
        password: Option<String>,
        social: Option<SocialProvider>,
    ) -> Result<User, StoreError> {
        let user = self.ctx.session.login(email, role, password, social).await?;
        self.ctx.load_role_scoped(&user, None).await?;
        Ok(user)
    }

    #[instrument(skip(self, password))]
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<User, StoreError> {
        let user = self.ctx.session.register(name, email, password).await?;
        self.ctx.load_role_scoped(&user, None).await?;
        Ok(user)
    }

    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), StoreError> {
        self.ctx.session.logout().await?;
        self.ctx.clear_role_scoped().await
    }

    pub async fn current_user(&self) -> Option<User> {
        self.ctx.session.current_user().await
    }

    // --- Reads ---

    pub async fn products(&self) -> Result<Vec<Product>, StoreError> {
        Ok(self.ctx.products.list_products().await?)
    }

    pub async fn orders(&self) -> Result<Vec<Order>, StoreError> {
        Ok(self.ctx.orders.list_orders().await?)
    }

    pub async fn order(&self, id: &str) -> Result<Option<Order>, StoreError> {
        Ok(self.ctx.orders.get_order(id).await?)
    }

    pub async fn users(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.ctx.users.list_users().await?)
    }

    pub async fn addon_settings(&self) -> Result<AddonSettings, StoreError> {
        Ok(self.ctx.settings.get_addons().await?)
    }

    pub async fn financials(&self) -> Result<GlobalFinancials, StoreError> {
        Ok(self.ctx.settings.get_financials().await?)
    }

    /// Prices a rental of a cached product with the current addon settings.
    pub async fn quote(
        &self,
        product_id: &str,
        duration: u32,
        period: RentalPeriod,
        selection: AddonSelection,
    ) -> Result<Quote, StoreError> {
        let product = self
            .ctx
            .products
            .get_product(product_id)
            .await?
            .ok_or_else(|| ProductError::NotFound(product_id.to_string()))?;
        let addons = self.ctx.settings.get_addons().await?;
        Ok(pricing::quote(&product, &addons, duration, period, selection)?)
    }

    /// Per-day confirmed bookings of a product, from the cached orders.
    pub async fn booked_counts(&self, product_id: &str) -> Result<BookedCounts, StoreError> {
        let product = self
            .ctx
            .products
            .get_product(product_id)
            .await?
            .ok_or_else(|| ProductError::NotFound(product_id.to_string()))?;
        let orders = self.ctx.orders.list_orders().await?;
        Ok(availability::booked_counts(&orders, &product))
    }

    // --- Orders ---

    /// Places an order for the signed-in user. Profile changes batched with
    /// the order are mirrored into the session.
    #[instrument(skip(self, request), fields(product_id = %request.product_id))]
    pub async fn place_order(&self, request: RentalRequest) -> Result<Order, StoreError> {
        let user = self.ctx.session.require_user().await?;
        let placement = self.ctx.orders.place_order(&user, request).await?;
        if let Some(profile) = placement.profile {
            self.ctx.session.replace_current(profile).await?;
        }
        Ok(placement.order)
    }

    #[instrument(skip(self))]
    pub async fn approve_order(&self, id: &str) -> Result<OrderStatus, StoreError> {
        self.ctx.session.require_admin().await?;
        Ok(self.ctx.orders.approve(id).await?)
    }

    #[instrument(skip(self))]
    pub async fn reject_order(&self, id: &str) -> Result<Order, StoreError> {
        self.ctx.session.require_admin().await?;
        Ok(self.ctx.orders.reject(id).await?)
    }

    #[instrument(skip(self))]
    pub async fn mark_delivered(&self, id: &str) -> Result<OrderStatus, StoreError> {
        self.ctx.session.require_admin().await?;
        Ok(self.ctx.orders.mark_delivered(id).await?)
    }

    #[instrument(skip(self))]
    pub async fn mark_returned(&self, id: &str) -> Result<OrderStatus, StoreError> {
        self.ctx.session.require_admin().await?;
        Ok(self.ctx.orders.mark_returned(id).await?)
    }

    #[instrument(skip(self))]
    pub async fn settle_order(&self, id: &str) -> Result<OrderStatus, StoreError> {
        self.ctx.session.require_admin().await?;
        Ok(self.ctx.orders.settle(id).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete_order(&self, id: &str) -> Result<Option<Order>, StoreError> {
        self.ctx.session.require_admin().await?;
        Ok(self.ctx.orders.delete(id).await?)
    }

    #[instrument(skip(self, label))]
    pub async fn add_order_expense(&self, id: &str, label: &str, amount: f64) -> Result<OrderExpense, StoreError> {
        self.ctx.session.require_admin().await?;
        Ok(self.ctx.orders.add_expense(id, label.to_string(), amount).await?)
    }

    #[instrument(skip(self))]
    pub async fn remove_order_expense(&self, id: &str, expense_id: &str) -> Result<Vec<OrderExpense>, StoreError> {
        self.ctx.session.require_admin().await?;
        Ok(self.ctx.orders.remove_expense(id, expense_id).await?)
    }

    #[instrument(skip(self))]
    pub async fn purge_orphan_orders(&self) -> Result<Vec<String>, StoreError> {
        self.ctx.session.require_admin().await?;
        Ok(self.ctx.orders.purge_orphans().await?)
    }

    pub async fn financial_summary(&self) -> Result<FinancialSummary, StoreError> {
        self.ctx.session.require_admin().await?;
        let orders = self.ctx.orders.list_orders().await?;
        let financials = self.ctx.settings.get_financials().await?;
        Ok(finance::summarize(&orders, &financials))
    }

    // --- Users ---

    async fn patch_everywhere(&self, user_id: &str, patch: UserPatch) -> Result<Option<User>, StoreError> {
        validate_patch(&patch)?;
        let cached = self.ctx.users.update_if_cached(user_id, patch.clone()).await?;
        let current = self.ctx.session.patch_if_current(user_id, &patch).await?;
        self.ctx
            .enqueue(SyncJob::UpdateUser {
                id: user_id.to_string(),
                patch,
            })
            .await;
        Ok(current.or(cached))
    }

    /// Applies a profile edit to the signed-in user.
    #[instrument(skip(self, patch))]
    pub async fn update_profile(&self, patch: UserPatch) -> Result<User, StoreError> {
        let user = self.ctx.session.require_user().await?;
        let updated = self.patch_everywhere(&user.id, patch).await?;
        Ok(updated.unwrap_or(user))
    }

    #[instrument(skip(self, location), fields(location = %location.name))]
    pub async fn add_location(&self, location: SavedLocation) -> Result<User, StoreError> {
        let user = self.ctx.session.require_user().await?;
        let mut locations = user.saved_locations.clone();
        locations.push(location);
        let patch = UserPatch {
            saved_locations: Some(locations),
            ..UserPatch::default()
        };
        let updated = self.patch_everywhere(&user.id, patch).await?;
        Ok(updated.unwrap_or(user))
    }

    async fn admin_patch(&self, user_id: &str, patch: UserPatch) -> Result<User, StoreError> {
        self.ctx.session.require_admin().await?;
        if self.ctx.users.get_user(user_id).await?.is_none() {
            return Err(UserError::NotFound(user_id.to_string()).into());
        }
        self.patch_everywhere(user_id, patch)
            .await?
            .ok_or_else(|| UserError::NotFound(user_id.to_string()).into())
    }

    #[instrument(skip(self))]
    pub async fn verify_user_id(&self, user_id: &str) -> Result<User, StoreError> {
        self.admin_patch(user_id, UserPatch::verification(VerificationStatus::Verified)).await
    }

    #[instrument(skip(self))]
    pub async fn reject_user_id(&self, user_id: &str) -> Result<User, StoreError> {
        self.admin_patch(user_id, UserPatch::verification(VerificationStatus::Rejected)).await
    }

    #[instrument(skip(self, notes))]
    pub async fn update_user_notes(&self, user_id: &str, notes: &str) -> Result<User, StoreError> {
        self.admin_patch(user_id, UserPatch::notes(notes)).await
    }

    /// Creates an admin account and refreshes the Users cache. Awaited.
    #[instrument(skip(self, password))]
    pub async fn create_admin(&self, name: &str, email: &str, password: &str) -> Result<String, StoreError> {
        self.ctx.session.require_admin().await?;
        let registration = Registration {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            role: Role::Admin,
        };
        let id = bounded(self.ctx.timeout, self.ctx.remote.create_user(&registration)).await?;
        let users = bounded(self.ctx.timeout, self.ctx.remote.list_users()).await?;
        self.ctx.users.load_users(users).await?;
        info!(user_id = %id, "Admin created");
        Ok(id)
    }

    /// Removes a user locally and remotely. Deleting yourself signs you out.
    #[instrument(skip(self))]
    pub async fn delete_user(&self, user_id: &str) -> Result<Option<User>, StoreError> {
        let admin = self.ctx.session.require_admin().await?;
        let removed = self.ctx.users.remove_user(user_id).await?;
        if admin.id == user_id {
            self.logout().await?;
        }
        if removed.is_some() {
            self.ctx
                .enqueue(SyncJob::DeleteUser {
                    id: user_id.to_string(),
                })
                .await;
        }
        Ok(removed)
    }

    /// Hands the primary-admin flag to another admin. Returns `false` and changes
    /// nothing unless the caller is the primary admin and `target_id` is a
    /// different, known admin.
    #[instrument(skip(self))]
    pub async fn transfer_primary_status(&self, target_id: &str) -> Result<bool, StoreError> {
        let caller = self.ctx.session.require_user().await?;
        if !caller.is_admin() || !caller.is_primary || caller.id == target_id {
            warn!(caller_id = %caller.id, "Primary transfer refused");
            return Ok(false);
        }
        match self.ctx.users.get_user(target_id).await? {
            Some(target) if target.is_admin() => {}
            _ => {
                warn!("Primary transfer target is not a known admin");
                return Ok(false);
            }
        }

        self.patch_everywhere(&caller.id, UserPatch::primary(false)).await?;
        self.patch_everywhere(target_id, UserPatch::primary(true)).await?;
        info!(from = %caller.id, to = %target_id, "Primary status transferred");
        Ok(true)
    }

    /// Downloads a user's identity document. Awaited.
    #[instrument(skip(self))]
    pub async fn fetch_id_proof(&self, user_id: &str) -> Result<Vec<u8>, StoreError> {
        self.ctx.session.require_admin().await?;
        Ok(bounded(self.ctx.timeout, self.ctx.remote.id_proof(user_id)).await?)
    }

    // --- Products ---

    /// Adds a product under a provisional id; the id is swapped once the store assigns one.
    #[instrument(skip(self, draft), fields(name = %draft.name))]
    pub async fn add_product(&self, draft: ProductDraft) -> Result<Product, StoreError> {
        self.ctx.session.require_admin().await?;
        validate_draft(&draft)?;
        let product = Product::from_draft(provisional_id(), draft);
        self.ctx.products.insert_product(product.clone(), InsertAt::Back).await?;
        self.ctx
            .enqueue(SyncJob::CreateProduct {
                provisional_id: product.id.clone(),
                product: product.clone(),
            })
            .await;
        Ok(product)
    }

    #[instrument(skip(self, patch))]
    pub async fn update_product(&self, id: &str, patch: ProductPatch) -> Result<Product, StoreError> {
        self.ctx.session.require_admin().await?;
        let product = self.ctx.products.edit_product(id, patch).await?;
        self.ctx
            .enqueue(SyncJob::UpdateProduct {
                id: id.to_string(),
                product: product.clone(),
            })
            .await;
        Ok(product)
    }

    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: &str) -> Result<Option<Product>, StoreError> {
        self.ctx.session.require_admin().await?;
        let removed = self.ctx.products.remove_product(id).await?;
        if removed.is_some() {
            self.ctx.enqueue(SyncJob::DeleteProduct { id: id.to_string() }).await;
        }
        Ok(removed)
    }

    // --- Settings ---

    #[instrument(skip(self, settings))]
    pub async fn update_addon_settings(&self, settings: AddonSettings) -> Result<AddonSettings, StoreError> {
        self.ctx.session.require_admin().await?;
        let settings = self.ctx.settings.replace_addons(settings).await?;
        self.ctx.enqueue(SyncJob::PutAddons(settings)).await;
        Ok(settings)
    }

    #[instrument(skip(self))]
    pub async fn adjust_financials(&self, bucket: OverheadBucket, delta: f64) -> Result<GlobalFinancials, StoreError> {
        self.ctx.session.require_admin().await?;
        let financials = self.ctx.settings.adjust_financials(bucket, delta).await?;
        self.ctx.enqueue(SyncJob::PutFinancials(financials)).await;
        Ok(financials)
    }

    #[instrument(skip(self, financials))]
    pub async fn replace_financials(&self, financials: GlobalFinancials) -> Result<GlobalFinancials, StoreError> {
        self.ctx.session.require_admin().await?;
        let financials = self.ctx.settings.replace_financials(financials).await?;
        self.ctx.enqueue(SyncJob::PutFinancials(financials)).await;
        Ok(financials)
    }

    // --- Sync ---

    /// Waits until every remote write queued so far has finished.
    pub async fn flush(&self) -> Result<(), StoreError> {
        Ok(self.ctx.sync.flush().await?)
    }

    pub async fn sync_failures(&self) -> Result<Vec<SyncFailure>, StoreError> {
        Ok(self.ctx.sync.failures().await?)
    }

    pub async fn clear_sync_failures(&self) -> Result<usize, StoreError> {
        Ok(self.ctx.sync.clear_failures().await?)
    }

    pub async fn reconcile(&self) -> Result<(), StoreError> {
        self.ctx.reconcile().await
    }

    /// Stops the reconciler, closes every channel and waits for the actors to exit.
    pub async fn shutdown(self) -> Result<(), String> {
        info!("Shutting down rental system");
        if let Some(reconciler) = self.reconciler {
            reconciler.abort();
            let _ = reconciler.await;
        }
        drop(self.ctx);

        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Actor task failed: {:?}", e);
                return Err(format!("Actor task failed: {:?}", e));
            }
        }

        info!("Rental system shutdown complete");
        Ok(())
    }
}
