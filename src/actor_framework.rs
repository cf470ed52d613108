use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, instrument};

// =============================================================================
// 1. THE ABSTRACTION (Entity trait with hooks and actions)
// =============================================================================

/// Trait that any cached entity must implement to be managed by [`CacheActor`].
///
/// Identifiers are strings because the store may hand out provisional ids that are
/// later swapped for authoritative ones.
pub trait Entity: Clone + Debug + Send + Sync + 'static {
    type Patch: Send + Debug;
    type Action: Send + Debug;
    type ActionResult: Send + Debug;
    type Error: std::error::Error + Clone + Send + Sync + 'static;

    /// Name used in logs and not-found errors.
    const KIND: &'static str;

    fn id(&self) -> &str;
    fn set_id(&mut self, id: String);

    // --- Lifecycle Hooks ---

    fn on_update(&mut self, patch: Self::Patch) -> Result<(), Self::Error>;

    // --- Action Handler ---

    /// Handle a domain-specific action. On error the entity must be left untouched.
    fn handle_action(&mut self, action: Self::Action) -> Result<Self::ActionResult, Self::Error>;
}

/// Errors surfaced by a cache client.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FrameworkError<E> {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
    #[error("{0}")]
    Entity(E),
    #[error("Actor closed")]
    ActorClosed,
    #[error("Actor dropped")]
    ActorDropped,
}

// =============================================================================
// 2. THE GENERIC MESSAGES
// =============================================================================

pub type Response<T, E> = oneshot::Sender<Result<T, FrameworkError<E>>>;

/// Where an inserted entity lands in the display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertAt {
    Front,
    Back,
}

#[derive(Debug)]
pub enum CacheRequest<T: Entity> {
    Load {
        items: Vec<T>,
        /// Generation passed to `TrackChanges` when the fetch started, if any.
        since: Option<u64>,
        respond_to: Response<usize, T::Error>,
    },
    Insert {
        item: T,
        at: InsertAt,
        respond_to: Response<(), T::Error>,
    },
    Get {
        id: String,
        respond_to: Response<Option<T>, T::Error>,
    },
    List {
        respond_to: Response<Vec<T>, T::Error>,
    },
    Update {
        id: String,
        patch: T::Patch,
        respond_to: Response<T, T::Error>,
    },
    Delete {
        id: String,
        respond_to: Response<Option<T>, T::Error>,
    },
    Action {
        id: String,
        action: T::Action,
        respond_to: Response<T::ActionResult, T::Error>,
    },
    Rekey {
        from: String,
        to: String,
        respond_to: Response<bool, T::Error>,
    },
    Clear {
        respond_to: Response<usize, T::Error>,
    },
    /// Starts recording which ids change before the `Load` of the same generation.
    TrackChanges {
        generation: u64,
        respond_to: Response<(), T::Error>,
    },
}

/// Ids changed locally since `TrackChanges`. Their local state survives the
/// matching load.
#[derive(Debug)]
struct Tracking {
    generation: u64,
    touched: HashSet<String>,
}

// =============================================================================
// 3. THE GENERIC ACTOR SERVER
// =============================================================================

/// Owns one ordered collection. Being the only task that touches it, every
/// request is applied in arrival order and the last write wins.
pub struct CacheActor<T: Entity> {
    receiver: mpsc::Receiver<CacheRequest<T>>,
    store: Vec<T>,
    tracking: Option<Tracking>,
}

impl<T: Entity> CacheActor<T> {
    pub fn new(buffer_size: usize) -> (Self, CacheClient<T>) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let actor = Self {
            receiver,
            store: Vec::new(),
            tracking: None,
        };
        let client = CacheClient { sender };
        (actor, client)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.store.iter().position(|item| item.id() == id)
    }

    fn not_found<E>(id: String) -> FrameworkError<E> {
        FrameworkError::NotFound { kind: T::KIND, id }
    }

    fn touch(&mut self, id: &str) {
        if let Some(tracking) = &mut self.tracking {
            tracking.touched.insert(id.to_string());
        }
    }

    /// Replaces the collection with `incoming`. A load tagged with the tracked
    /// generation keeps the local state of every id changed since tracking
    /// started, including deletion; local-only entries go back to the front
    /// if they led the old order. A tagged load whose generation is no longer
    /// tracked was superseded (cleared or retracked) and is dropped.
    fn load(&mut self, incoming: Vec<T>, since: Option<u64>) {
        let tracking = self.tracking.take();
        let Some(generation) = since else {
            self.store = incoming;
            return;
        };
        let touched = match tracking {
            Some(tracking) if tracking.generation == generation => tracking.touched,
            other => {
                debug!(generation, "Dropping superseded load");
                self.tracking = other;
                return;
            }
        };

        let incoming_ids: HashSet<String> = incoming.iter().map(|item| item.id().to_string()).collect();
        let local = std::mem::take(&mut self.store);
        let first_known = local
            .iter()
            .position(|item| incoming_ids.contains(item.id()))
            .unwrap_or(local.len());

        let mut kept = HashMap::new();
        let (mut front, mut back) = (Vec::new(), Vec::new());
        for (index, item) in local.into_iter().enumerate() {
            if !touched.contains(item.id()) {
                continue;
            }
            if incoming_ids.contains(item.id()) {
                kept.insert(item.id().to_string(), item);
            } else if index < first_known {
                front.push(item);
            } else {
                back.push(item);
            }
        }
        if !touched.is_empty() {
            debug!(touched = touched.len(), "Keeping locally changed entries");
        }

        let merged = incoming.into_iter().filter_map(|item| {
            if touched.contains(item.id()) {
                kept.remove(item.id())
            } else {
                Some(item)
            }
        });
        self.store = front.into_iter().chain(merged).chain(back).collect();
    }

    #[instrument(name = "cache_actor", skip(self), fields(kind = T::KIND))]
    pub async fn run(mut self) {
        info!("Cache starting");
        while let Some(msg) = self.receiver.recv().await {
            match msg {
                CacheRequest::Load { items, since, respond_to } => {
                    debug!(count = items.len(), "Replacing collection");
                    self.load(items, since);
                    let _ = respond_to.send(Ok(self.store.len()));
                }
                CacheRequest::Insert { item, at, respond_to } => {
                    self.touch(item.id());
                    match self.position(item.id()) {
                        Some(index) => self.store[index] = item,
                        None => match at {
                            InsertAt::Front => self.store.insert(0, item),
                            InsertAt::Back => self.store.push(item),
                        },
                    }
                    let _ = respond_to.send(Ok(()));
                }
                CacheRequest::Get { id, respond_to } => {
                    let item = self.position(&id).map(|index| self.store[index].clone());
                    let _ = respond_to.send(Ok(item));
                }
                CacheRequest::List { respond_to } => {
                    let _ = respond_to.send(Ok(self.store.clone()));
                }
                CacheRequest::Update { id, patch, respond_to } => {
                    self.touch(&id);
                    let result = match self.position(&id) {
                        Some(index) => {
                            let mut item = self.store[index].clone();
                            match item.on_update(patch) {
                                Ok(()) => {
                                    self.store[index] = item.clone();
                                    Ok(item)
                                }
                                Err(e) => Err(FrameworkError::Entity(e)),
                            }
                        }
                        None => Err(Self::not_found(id)),
                    };
                    let _ = respond_to.send(result);
                }
                CacheRequest::Delete { id, respond_to } => {
                    self.touch(&id);
                    let removed = self.position(&id).map(|index| self.store.remove(index));
                    let _ = respond_to.send(Ok(removed));
                }
                CacheRequest::Action { id, action, respond_to } => {
                    self.touch(&id);
                    let result = match self.position(&id) {
                        Some(index) => {
                            let mut item = self.store[index].clone();
                            match item.handle_action(action) {
                                Ok(outcome) => {
                                    self.store[index] = item;
                                    Ok(outcome)
                                }
                                Err(e) => Err(FrameworkError::Entity(e)),
                            }
                        }
                        None => Err(Self::not_found(id)),
                    };
                    let _ = respond_to.send(result);
                }
                CacheRequest::Rekey { from, to, respond_to } => {
                    self.touch(&from);
                    self.touch(&to);
                    let result = match (self.position(&from), self.position(&to)) {
                        (Some(index), None) => {
                            self.store[index].set_id(to);
                            true
                        }
                        // Authoritative record already present, drop the provisional twin.
                        (Some(index), Some(_)) => {
                            self.store.remove(index);
                            true
                        }
                        (None, _) => false,
                    };
                    let _ = respond_to.send(Ok(result));
                }
                CacheRequest::Clear { respond_to } => {
                    let count = self.store.len();
                    self.store.clear();
                    self.tracking = None;
                    let _ = respond_to.send(Ok(count));
                }
                CacheRequest::TrackChanges { generation, respond_to } => {
                    self.tracking = Some(Tracking {
                        generation,
                        touched: HashSet::new(),
                    });
                    let _ = respond_to.send(Ok(()));
                }
            }
        }
        info!("Cache stopped");
    }
}

// =============================================================================
// 4. THE GENERIC CLIENT
// =============================================================================

pub struct CacheClient<T: Entity> {
    sender: mpsc::Sender<CacheRequest<T>>,
}

impl<T: Entity> Clone for CacheClient<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

type CacheResult<T, E> = Result<T, FrameworkError<E>>;

impl<T: Entity> CacheClient<T> {
    pub fn new(sender: mpsc::Sender<CacheRequest<T>>) -> Self {
        Self { sender }
    }

    async fn request<R>(
        &self,
        build: impl FnOnce(Response<R, T::Error>) -> CacheRequest<T>,
    ) -> CacheResult<R, T::Error> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(build(respond_to))
            .await
            .map_err(|_| FrameworkError::ActorClosed)?;
        response.await.map_err(|_| FrameworkError::ActorDropped)?
    }

    pub async fn load(&self, items: Vec<T>) -> CacheResult<usize, T::Error> {
        self.request(|respond_to| CacheRequest::Load { items, since: None, respond_to }).await
    }

    /// Load for a fetch that started after `track_changes(generation)`.
    pub async fn load_since(&self, items: Vec<T>, generation: u64) -> CacheResult<usize, T::Error> {
        let since = Some(generation);
        self.request(|respond_to| CacheRequest::Load { items, since, respond_to }).await
    }

    pub async fn insert(&self, item: T, at: InsertAt) -> CacheResult<(), T::Error> {
        self.request(|respond_to| CacheRequest::Insert { item, at, respond_to }).await
    }

    pub async fn get(&self, id: impl Into<String>) -> CacheResult<Option<T>, T::Error> {
        let id = id.into();
        self.request(|respond_to| CacheRequest::Get { id, respond_to }).await
    }

    pub async fn list(&self) -> CacheResult<Vec<T>, T::Error> {
        self.request(|respond_to| CacheRequest::List { respond_to }).await
    }

    pub async fn update(&self, id: impl Into<String>, patch: T::Patch) -> CacheResult<T, T::Error> {
        let id = id.into();
        self.request(|respond_to| CacheRequest::Update { id, patch, respond_to }).await
    }

    pub async fn delete(&self, id: impl Into<String>) -> CacheResult<Option<T>, T::Error> {
        let id = id.into();
        self.request(|respond_to| CacheRequest::Delete { id, respond_to }).await
    }

    pub async fn perform_action(
        &self,
        id: impl Into<String>,
        action: T::Action,
    ) -> CacheResult<T::ActionResult, T::Error> {
        let id = id.into();
        self.request(|respond_to| CacheRequest::Action { id, action, respond_to }).await
    }

    pub async fn rekey(&self, from: impl Into<String>, to: impl Into<String>) -> CacheResult<bool, T::Error> {
        let (from, to) = (from.into(), to.into());
        self.request(|respond_to| CacheRequest::Rekey { from, to, respond_to }).await
    }

    pub async fn clear(&self) -> CacheResult<usize, T::Error> {
        self.request(|respond_to| CacheRequest::Clear { respond_to }).await
    }

    pub async fn track_changes(&self, generation: u64) -> CacheResult<(), T::Error> {
        self.request(|respond_to| CacheRequest::TrackChanges { generation, respond_to }).await
    }
}

// =============================================================================
// 5. EXAMPLE USAGE (Test)
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Counter {
        id: String,
        value: u32,
    }

    #[derive(Debug, Clone, PartialEq, Error)]
    enum CounterError {
        #[error("would underflow")]
        Underflow,
    }

    #[derive(Debug)]
    enum CounterAction {
        Decrement,
    }

    impl Entity for Counter {
        type Patch = u32;
        type Action = CounterAction;
        type ActionResult = u32;
        type Error = CounterError;

        const KIND: &'static str = "Counter";

        fn id(&self) -> &str {
            &self.id
        }

        fn set_id(&mut self, id: String) {
            self.id = id;
        }

        fn on_update(&mut self, patch: u32) -> Result<(), CounterError> {
            self.value = patch;
            Ok(())
        }

        fn handle_action(&mut self, action: CounterAction) -> Result<u32, CounterError> {
            match action {
                CounterAction::Decrement => {
                    self.value = self.value.checked_sub(1).ok_or(CounterError::Underflow)?;
                    Ok(self.value)
                }
            }
        }
    }

    fn counter(id: &str, value: u32) -> Counter {
        Counter { id: id.into(), value }
    }

    #[tokio::test]
    async fn test_insert_order_and_rekey_in_place() {
        let (actor, client) = CacheActor::<Counter>::new(10);
        tokio::spawn(actor.run());

        client.insert(counter("a", 1), InsertAt::Back).await.unwrap();
        client.insert(counter("b", 2), InsertAt::Back).await.unwrap();
        client.insert(counter("tmp", 3), InsertAt::Front).await.unwrap();

        assert!(client.rekey("tmp", "c").await.unwrap());
        assert!(!client.rekey("tmp", "d").await.unwrap());

        let ids: Vec<String> = client.list().await.unwrap().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[tokio::test]
    async fn test_rekey_onto_existing_id_drops_provisional_twin() {
        let (actor, client) = CacheActor::<Counter>::new(10);
        tokio::spawn(actor.run());

        client.load(vec![counter("tmp", 1), counter("real", 1)]).await.unwrap();
        assert!(client.rekey("tmp", "real").await.unwrap());

        assert_eq!(client.list().await.unwrap(), vec![counter("real", 1)]);
    }

    #[tokio::test]
    async fn test_failed_action_leaves_entity_untouched() {
        let (actor, client) = CacheActor::<Counter>::new(10);
        tokio::spawn(actor.run());

        client.insert(counter("a", 1), InsertAt::Back).await.unwrap();
        assert_eq!(client.perform_action("a", CounterAction::Decrement).await, Ok(0));
        assert_eq!(
            client.perform_action("a", CounterAction::Decrement).await,
            Err(FrameworkError::Entity(CounterError::Underflow))
        );
        assert_eq!(client.get("a").await.unwrap(), Some(counter("a", 0)));
    }

    #[tokio::test]
    async fn test_load_keeps_entries_changed_since_tracking() {
        let (actor, client) = CacheActor::<Counter>::new(10);
        tokio::spawn(actor.run());

        client.load(vec![counter("a", 1), counter("b", 1), counter("c", 1)]).await.unwrap();
        client.track_changes(1).await.unwrap();

        client.insert(counter("tmp", 7), InsertAt::Front).await.unwrap();
        client.update("a", 9).await.unwrap();
        client.delete("b").await.unwrap();

        // Fetched before any of the local changes reached the store.
        let count = client
            .load_since(vec![counter("a", 1), counter("b", 1), counter("c", 2)], 1)
            .await
            .unwrap();

        assert_eq!(count, 3);
        assert_eq!(
            client.list().await.unwrap(),
            vec![counter("tmp", 7), counter("a", 9), counter("c", 2)]
        );

        // Tracking ends with the load.
        client.load(vec![counter("c", 3)]).await.unwrap();
        assert_eq!(client.list().await.unwrap(), vec![counter("c", 3)]);
    }

    #[tokio::test]
    async fn test_rekeyed_entry_survives_stale_load() {
        let (actor, client) = CacheActor::<Counter>::new(10);
        tokio::spawn(actor.run());

        client.load(vec![counter("a", 1)]).await.unwrap();
        client.track_changes(4).await.unwrap();
        client.insert(counter("tmp", 2), InsertAt::Back).await.unwrap();
        assert!(client.rekey("tmp", "real").await.unwrap());

        client.load_since(vec![counter("a", 1)], 4).await.unwrap();
        assert_eq!(client.list().await.unwrap(), vec![counter("a", 1), counter("real", 2)]);
    }

    #[tokio::test]
    async fn test_superseded_load_is_dropped() {
        let (actor, client) = CacheActor::<Counter>::new(10);
        tokio::spawn(actor.run());

        client.load(vec![counter("a", 1)]).await.unwrap();
        client.track_changes(1).await.unwrap();
        client.clear().await.unwrap();
        assert_eq!(client.load_since(vec![counter("a", 1)], 1).await.unwrap(), 0);

        client.track_changes(2).await.unwrap();
        assert_eq!(client.load_since(vec![counter("b", 1)], 1).await.unwrap(), 0);
        assert_eq!(client.load_since(vec![counter("b", 1)], 2).await.unwrap(), 1);

        // Untagged loads always replace.
        client.load(vec![counter("c", 1)]).await.unwrap();
        assert_eq!(client.list().await.unwrap(), vec![counter("c", 1)]);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (actor, client) = CacheActor::<Counter>::new(10);
        tokio::spawn(actor.run());

        client.insert(counter("a", 1), InsertAt::Back).await.unwrap();
        assert_eq!(client.delete("a").await.unwrap(), Some(counter("a", 1)));
        assert_eq!(client.delete("a").await.unwrap(), None);
        assert_eq!(
            client.update("a", 5).await,
            Err(FrameworkError::NotFound { kind: "Counter", id: "a".into() })
        );
    }
}
