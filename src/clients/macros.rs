/// Generates a request/response client method for a hand-written service.
///
/// The service's error type must provide an `ActorCommunicationError(String)` variant.
#[macro_export]
macro_rules! client_method {
    ($client:ty => fn $method:ident($($param:ident: $param_type:ty),*) -> $return_type:ty as $request:ident::$variant:ident, Error = $error_type:ty) => {
        impl $client {
            #[tracing::instrument(skip(self))]
            pub async fn $method(&self, $($param: $param_type),*) -> Result<$return_type, $error_type> {
                tracing::debug!("Sending request");
                let (respond_to, response) = tokio::sync::oneshot::channel();
                self.sender.send($request::$variant {
                    $($param,)*
                    respond_to,
                }).await.map_err(|_| <$error_type>::ActorCommunicationError("Actor closed".to_string()))?;

                response.await.map_err(|_| <$error_type>::ActorCommunicationError("Actor dropped".to_string()))?
            }
        }
    };
}

/// Read and bulk methods shared by every cache-backed client.
#[macro_export]
macro_rules! impl_cache_methods {
    ($client_name:ident, $entity:ty, $error:ty, $entity_name_snake:ident) => {
        paste::paste! {
            impl $client_name {
                #[tracing::instrument(skip(self))]
                pub async fn [<get_ $entity_name_snake>](&self, id: &str) -> Result<Option<$entity>, $error> {
                    tracing::debug!("Sending request");
                    self.inner.get(id).await.map_err(<$error>::from)
                }

                #[tracing::instrument(skip(self))]
                pub async fn [<list_ $entity_name_snake s>](&self) -> Result<Vec<$entity>, $error> {
                    tracing::debug!("Sending request");
                    self.inner.list().await.map_err(<$error>::from)
                }

                /// Replaces the whole cached collection with a fresh fetch.
                #[tracing::instrument(skip(self, items), fields(count = items.len()))]
                pub async fn [<load_ $entity_name_snake s>](&self, items: Vec<$entity>) -> Result<usize, $error> {
                    tracing::debug!("Sending request");
                    self.inner.load(items).await.map_err(<$error>::from)
                }

                /// Local changes made from now on survive the reload of the same generation.
                #[tracing::instrument(skip(self))]
                pub async fn [<track_ $entity_name_snake _changes>](&self, generation: u64) -> Result<(), $error> {
                    tracing::debug!("Sending request");
                    self.inner.track_changes(generation).await.map_err(<$error>::from)
                }

                #[tracing::instrument(skip(self, items), fields(count = items.len()))]
                pub async fn [<reload_ $entity_name_snake s>](&self, items: Vec<$entity>, generation: u64) -> Result<usize, $error> {
                    tracing::debug!("Sending request");
                    self.inner.load_since(items, generation).await.map_err(<$error>::from)
                }

                #[tracing::instrument(skip(self))]
                pub async fn [<clear_ $entity_name_snake s>](&self) -> Result<usize, $error> {
                    tracing::debug!("Sending request");
                    self.inner.clear().await.map_err(<$error>::from)
                }
            }
        }
    };
}

#[macro_export]
macro_rules! impl_client_new {
    ($client_name:ident, $entity:ty) => {
        impl $client_name {
            pub fn new(inner: $crate::actor_framework::CacheClient<$entity>) -> Self {
                Self { inner }
            }
        }
    };
}

#[macro_export]
macro_rules! impl_basic_client {
    ($client_name:ident, $entity:ty, $error:ty, $entity_name_snake:ident) => {
        $crate::impl_client_new!($client_name, $entity);
        $crate::impl_cache_methods!($client_name, $entity, $error, $entity_name_snake);
    };
}
