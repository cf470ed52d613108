use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn, Instrument};

use console_rental::app_system::{setup_tracing, RentalSystem, StoreConfig, StoreError};
use console_rental::domain::{RentalPeriod, RentalRequest, Role, SavedLocation, User};
use console_rental::pricing::{rental_end, AddonSelection};
use console_rental::remote::{HttpRemoteStore, InMemoryRemoteStore, RemoteStore};

const DEMO_ADMIN_EMAIL: &str = "admin@example.com";
const DEMO_ADMIN_PASS: &str = "admin123";

/// Network trouble is worth retrying; anything else is a real failure.
fn report(step: &str, e: &StoreError) {
    if e.is_transient() {
        warn!(step, error = %e, "Store unreachable, try again later");
    } else {
        error!(step, error = %e, "Step failed");
    }
}

/// Walks one rental from checkout to a confirmed order against the in-memory store.
async fn demo_rental(system: &RentalSystem) -> Result<(), StoreError> {
    let customer = system.register("Riya", "riya@example.com", "riya-pass").await?;
    info!(user_id = %customer.id, "Customer registered");

    let home = SavedLocation::new("Home", "221 MG Road", "560001", 12.9716, 77.5946);
    let customer = system.add_location(home.clone()).await?;

    let product = system
        .products()
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| console_rental::product_actor::ProductError::NotFound("catalog".to_string()))?;
    let selection = AddonSelection {
        subscription_extra: true,
        extra_controller: false,
    };
    let quote = system.quote(&product.id, 2, RentalPeriod::Weeks, selection).await?;
    info!(product = %product.name, total = quote.total, "Quoted rental");

    let start = Utc::now();
    let mut request = RentalRequest::new(&product.id, 2, RentalPeriod::Weeks, quote.total, home)
        .with_addons(selection.subscription_extra, selection.extra_controller)
        .with_phone("9876543210")
        .with_id_proof("data:image/png;base64,iVBORw0KGgo=");
    if let Some(end) = rental_end(start, 2, RentalPeriod::Weeks) {
        request = request.with_dates(start, end);
    }

    let span = tracing::info_span!("checkout", user_id = %customer.id);
    let order = system.place_order(request).instrument(span).await?;
    info!(order_id = %order.id, status = %order.status, "Order placed");
    system.flush().await?;
    system.logout().await?;

    system
        .login(DEMO_ADMIN_EMAIL, Role::Admin, Some(DEMO_ADMIN_PASS.to_string()), None)
        .await?;
    let order = system
        .orders()
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| console_rental::order_actor::OrderError::NotFound(order.id.clone()))?;

    system.verify_user_id(&order.user_id).await?;
    let status = system.approve_order(&order.id).await?;
    info!(order_id = %order.id, %status, "Order approved");
    system.add_order_expense(&order.id, "Delivery", 150.0).await?;

    let summary = system.financial_summary().await?;
    info!(
        revenue = summary.revenue,
        direct_expenses = summary.direct_expenses,
        overheads = summary.overheads,
        net_profit = summary.net_profit,
        "Financial summary"
    );

    system.flush().await?;
    for failure in system.sync_failures().await? {
        warn!(operation = failure.operation, entity_id = %failure.entity_id, error = %failure.error, "Unsynced write");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), String> {
    setup_tracing();

    let config = StoreConfig::from_env().map_err(|e| e.to_string())?;
    let in_memory = config.api_base_url.is_none();
    let remote: Arc<dyn RemoteStore> = if in_memory {
        info!("No API base URL configured, using the in-memory store");
        let store = InMemoryRemoteStore::new();
        let mut admin = User::new("System Admin", DEMO_ADMIN_EMAIL);
        admin.role = Role::Admin;
        admin.is_primary = true;
        store
            .seed_user(&admin, DEMO_ADMIN_PASS)
            .await
            .map_err(|e| e.to_string())?;
        Arc::new(store)
    } else {
        Arc::new(HttpRemoteStore::new(&config).map_err(|e| e.to_string())?)
    };

    let system = RentalSystem::start(config, remote)
        .await
        .map_err(|e| e.to_string())?;

    if in_memory {
        if let Err(e) = demo_rental(&system).await {
            report("demo rental", &e);
        }
    } else {
        if let Err(e) = system.reconcile().await {
            report("reconcile", &e);
        }
        let products = system.products().await.map_err(|e| e.to_string())?;
        info!(count = products.len(), "Catalog loaded");
        match system.current_user().await {
            Some(user) => info!(user_id = %user.id, role = ?user.role, "Signed in from saved session"),
            None => info!("No saved session"),
        }
    }

    system.shutdown().await?;
    info!("Application completed successfully");
    Ok(())
}
