use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};

use super::{SyncError, SyncFailure, SyncJob};
use crate::actor_framework::CacheClient;
use crate::clients::SyncClient;
use crate::domain::{Order, Product};
use crate::messages::{ServiceResponse, SyncRequest};
use crate::remote::{bounded, RemoteStore};

/// Sequential executor of remote writes.
///
/// Keeps the provisional-to-authoritative id map for every create it completed,
/// and rewrites the matching cache entry in place once the store has answered.
pub struct SyncWorker {
    receiver: mpsc::Receiver<SyncRequest>,
    remote: Arc<dyn RemoteStore>,
    timeout: Duration,
    products: CacheClient<Product>,
    orders: CacheClient<Order>,
    aliases: HashMap<String, String>,
    orphaned: HashSet<String>,
    failures: Vec<SyncFailure>,
}

impl SyncWorker {
    pub fn new(
        buffer_size: usize,
        remote: Arc<dyn RemoteStore>,
        timeout: Duration,
        products: CacheClient<Product>,
        orders: CacheClient<Order>,
    ) -> (Self, SyncClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let worker = Self {
            receiver,
            remote,
            timeout,
            products,
            orders,
            aliases: HashMap::new(),
            orphaned: HashSet::new(),
            failures: Vec::new(),
        };
        (worker, SyncClient::new(sender))
    }

    #[instrument(name = "sync_worker", skip(self))]
    pub async fn run(mut self) {
        info!("SyncWorker starting");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                SyncRequest::Submit { job } => self.handle_job(job).await,
                SyncRequest::Flush { respond_to } => {
                    debug!("Queue drained");
                    let _ = respond_to.send(Ok(()));
                }
                SyncRequest::Failures { respond_to } => {
                    let _ = respond_to.send(Ok(self.failures.clone()));
                }
                SyncRequest::ClearFailures { respond_to } => self.handle_clear(respond_to),
            }
        }

        info!(pending_failures = self.failures.len(), "SyncWorker stopped");
    }

    #[instrument(skip(self, job), fields(operation = job.operation(), entity_id = %job.entity_id()))]
    async fn handle_job(&mut self, job: SyncJob) {
        let operation = job.operation();
        let entity_id = job.entity_id().to_string();

        match self.execute(job).await {
            Ok(()) => debug!("Remote write applied"),
            Err(e) => {
                match &e {
                    SyncError::OrphanedProvisional(_) => warn!(error = %e, "Remote write skipped"),
                    _ => error!(error = %e, "Remote write failed"),
                }
                self.failures.push(SyncFailure {
                    operation,
                    entity_id,
                    error: e,
                    at: Utc::now(),
                });
            }
        }
    }

    fn handle_clear(&mut self, respond_to: ServiceResponse<usize, SyncError>) {
        let cleared = self.failures.len();
        self.failures.clear();
        let _ = respond_to.send(Ok(cleared));
    }

    /// Maps an id known at submission time onto the id the store knows.
    fn resolve(&self, id: &str) -> Result<String, SyncError> {
        if let Some(real) = self.aliases.get(id) {
            return Ok(real.clone());
        }
        if self.orphaned.contains(id) {
            return Err(SyncError::OrphanedProvisional(id.to_string()));
        }
        Ok(id.to_string())
    }

    async fn execute(&mut self, job: SyncJob) -> Result<(), SyncError> {
        let timeout = self.timeout;
        let remote = Arc::clone(&self.remote);

        match job {
            SyncJob::CreateProduct { provisional_id, product } => {
                match bounded(timeout, remote.create_product(&product)).await {
                    Ok(id) => {
                        info!(product_id = %id, "Product stored");
                        match self.products.rekey(&provisional_id, &id).await {
                            Ok(true) => {}
                            Ok(false) => warn!("Stored product is no longer cached"),
                            Err(e) => warn!(error = %e, "Could not rekey cached product"),
                        }
                        self.aliases.insert(provisional_id, id);
                        Ok(())
                    }
                    Err(e) => {
                        self.orphaned.insert(provisional_id);
                        Err(e.into())
                    }
                }
            }
            SyncJob::UpdateProduct { id, mut product } => {
                let id = self.resolve(&id)?;
                product.id = id.clone();
                Ok(bounded(timeout, remote.update_product(&id, &product)).await?)
            }
            SyncJob::DeleteProduct { id } => {
                let id = self.resolve(&id)?;
                Ok(bounded(timeout, remote.delete_product(&id)).await?)
            }
            SyncJob::CreateOrder { provisional_id, record } => {
                match bounded(timeout, remote.create_order(&record)).await {
                    Ok(id) => {
                        info!(order_id = %id, "Order stored");
                        match self.orders.rekey(&provisional_id, &id).await {
                            Ok(true) => {}
                            Ok(false) => warn!("Stored order is no longer cached"),
                            Err(e) => warn!(error = %e, "Could not rekey cached order"),
                        }
                        self.aliases.insert(provisional_id, id);
                        Ok(())
                    }
                    Err(e) => {
                        self.orphaned.insert(provisional_id);
                        Err(e.into())
                    }
                }
            }
            SyncJob::UpdateOrder { id, patch } => {
                let id = self.resolve(&id)?;
                Ok(bounded(timeout, remote.update_order(&id, &patch)).await?)
            }
            SyncJob::DeleteOrder { id } => {
                let id = self.resolve(&id)?;
                Ok(bounded(timeout, remote.delete_order(&id)).await?)
            }
            SyncJob::UpdateUser { id, patch } => {
                Ok(bounded(timeout, remote.update_user(&id, &patch)).await?)
            }
            SyncJob::DeleteUser { id } => Ok(bounded(timeout, remote.delete_user(&id)).await?),
            SyncJob::PutAddons(settings) => {
                Ok(bounded(timeout, remote.put_addon_settings(&settings)).await?)
            }
            SyncJob::PutFinancials(financials) => {
                Ok(bounded(timeout, remote.put_financials(&financials)).await?)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor_framework::{CacheActor, InsertAt};
    use crate::domain::{OrderPatch, OrderStatus};
    use crate::remote::memory::Collection;
    use crate::remote::{InMemoryRemoteStore, RemoteError};
    use crate::sync::provisional_id;

    struct Harness {
        remote: Arc<InMemoryRemoteStore>,
        products: CacheClient<Product>,
        sync: SyncClient,
    }

    fn start(timeout: Duration) -> Harness {
        let remote = Arc::new(InMemoryRemoteStore::new());
        let (product_actor, products) = CacheActor::<Product>::new(10);
        let (order_actor, orders) = CacheActor::<Order>::new(10);
        tokio::spawn(product_actor.run());
        tokio::spawn(order_actor.run());
        let (worker, sync) = SyncWorker::new(10, remote.clone(), timeout, products.clone(), orders);
        tokio::spawn(worker.run());
        Harness { remote, products, sync }
    }

    #[tokio::test]
    async fn test_create_rekeys_cache_and_redirects_later_jobs() {
        let harness = start(Duration::from_secs(1));
        let provisional = provisional_id();
        let product = Product::new(provisional.clone(), "PS5", 50.0, 150.0, 5);
        harness.products.insert(product.clone(), InsertAt::Back).await.unwrap();

        harness
            .sync
            .submit(SyncJob::CreateProduct { provisional_id: provisional.clone(), product: product.clone() })
            .await
            .unwrap();
        let mut edited = product.clone();
        edited.stock = 3;
        harness
            .sync
            .submit(SyncJob::UpdateProduct { id: provisional.clone(), product: edited })
            .await
            .unwrap();
        harness.sync.flush().await.unwrap();

        let cached = harness.products.list().await.unwrap();
        assert_eq!(cached.len(), 1);
        assert_ne!(cached[0].id, provisional);

        let stored = harness.remote.document(Collection::Products, &cached[0].id).await.unwrap();
        assert_eq!(stored["stock"], 3);
        assert!(harness.sync.failures().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_jobs_behind_failed_create_are_skipped() {
        let harness = start(Duration::from_secs(1));
        harness.remote.set_offline(true).await;

        let provisional = provisional_id();
        let product = Product::new(provisional.clone(), "PS5", 50.0, 150.0, 5);
        harness.products.insert(product.clone(), InsertAt::Back).await.unwrap();
        harness
            .sync
            .submit(SyncJob::CreateProduct { provisional_id: provisional.clone(), product })
            .await
            .unwrap();
        harness.sync.flush().await.unwrap();

        harness.remote.set_offline(false).await;
        harness
            .sync
            .submit(SyncJob::DeleteProduct { id: provisional.clone() })
            .await
            .unwrap();
        harness.sync.flush().await.unwrap();

        let failures = harness.sync.failures().await.unwrap();
        assert_eq!(failures.len(), 2);
        assert!(matches!(failures[0].error, SyncError::Remote(RemoteError::Unreachable(_))));
        assert_eq!(failures[1].error, SyncError::OrphanedProvisional(provisional.clone()));

        // Optimistic entry stays in place.
        assert_eq!(harness.products.get(&provisional).await.unwrap().map(|p| p.id), Some(provisional));
        assert_eq!(harness.sync.clear_failures().await.unwrap(), 2);
        assert!(harness.sync.failures().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_slow_store_is_reported_as_timeout() {
        let harness = start(Duration::from_millis(20));
        harness.remote.set_latency(Some(Duration::from_millis(200))).await;

        harness
            .sync
            .submit(SyncJob::UpdateOrder {
                id: "o1".into(),
                patch: OrderPatch::status(OrderStatus::Confirmed),
            })
            .await
            .unwrap();
        harness.sync.flush().await.unwrap();

        let failures = harness.sync.failures().await.unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].operation, "update_order");
        assert_eq!(
            failures[0].error,
            SyncError::Remote(RemoteError::Timeout(Duration::from_millis(20)))
        );
    }
}
