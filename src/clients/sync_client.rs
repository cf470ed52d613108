use tokio::sync::mpsc;
use tracing::{debug, instrument};

use crate::messages::SyncRequest;
use crate::sync::{SyncError, SyncFailure, SyncJob};

/// Client for the sync worker.
#[derive(Clone)]
pub struct SyncClient {
    sender: mpsc::Sender<SyncRequest>,
}

impl SyncClient {
    pub fn new(sender: mpsc::Sender<SyncRequest>) -> Self {
        Self { sender }
    }

    /// Queues a remote write without waiting for it.
    #[instrument(skip(self, job), fields(operation = job.operation(), entity_id = %job.entity_id()))]
    pub async fn submit(&self, job: SyncJob) -> Result<(), SyncError> {
        debug!("Queueing remote write");
        self.sender
            .send(SyncRequest::Submit { job })
            .await
            .map_err(|_| SyncError::ActorCommunicationError("Actor closed".to_string()))
    }
}

client_method!(SyncClient => fn flush() -> () as SyncRequest::Flush, Error = SyncError);
client_method!(SyncClient => fn failures() -> Vec<SyncFailure> as SyncRequest::Failures, Error = SyncError);
client_method!(SyncClient => fn clear_failures() -> usize as SyncRequest::ClearFailures, Error = SyncError);
