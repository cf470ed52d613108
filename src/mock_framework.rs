//! # Mock Framework
//!
//! Utilities for testing clients in isolation.
//!
//! Use [`create_mock_client`] to get a client and a receiver.
//! Then use helpers like [`expect_get`] or [`expect_insert`] to script the cache's answers.

use tokio::sync::{mpsc, oneshot};

use crate::actor_framework::{CacheClient, CacheRequest, Entity, FrameworkError, InsertAt};

type Reply<R, T> = oneshot::Sender<Result<R, FrameworkError<<T as Entity>::Error>>>;

/// Creates a cache client whose requests land on a receiver the test controls,
/// so the test plays the cache actor (success, failure, missing entries).
pub fn create_mock_client<T: Entity>(buffer_size: usize) -> (CacheClient<T>, mpsc::Receiver<CacheRequest<T>>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (CacheClient::new(sender), receiver)
}

/// Helper to verify that the next message is a Get request
pub async fn expect_get<T: Entity>(
    receiver: &mut mpsc::Receiver<CacheRequest<T>>,
) -> Option<(String, Reply<Option<T>, T>)> {
    match receiver.recv().await {
        Some(CacheRequest::Get { id, respond_to }) => Some((id, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is an Insert request
pub async fn expect_insert<T: Entity>(
    receiver: &mut mpsc::Receiver<CacheRequest<T>>,
) -> Option<(T, InsertAt, Reply<(), T>)> {
    match receiver.recv().await {
        Some(CacheRequest::Insert { item, at, respond_to }) => Some((item, at, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a Delete request
pub async fn expect_delete<T: Entity>(
    receiver: &mut mpsc::Receiver<CacheRequest<T>>,
) -> Option<(String, Reply<Option<T>, T>)> {
    match receiver.recv().await {
        Some(CacheRequest::Delete { id, respond_to }) => Some((id, respond_to)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::User;

    #[tokio::test]
    async fn test_mock_client() {
        let (client, mut receiver) = create_mock_client::<User>(10);

        let get_task = tokio::spawn(async move { client.get("user_1").await });

        let (id, responder) = expect_get(&mut receiver).await.expect("Expected Get request");
        assert_eq!(id, "user_1");
        responder.send(Ok(Some(User::new("Test", "test@example.com")))).unwrap();

        let result = get_task.await.unwrap().unwrap();
        assert_eq!(result.map(|user| user.name), Some("Test".to_string()));
    }
}
