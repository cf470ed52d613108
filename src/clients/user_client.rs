use tracing::{debug, instrument};

use crate::actor_framework::CacheClient;
use crate::domain::{User, UserPatch};
use crate::user_actor::UserError;

/// Client for the Users cache.
#[derive(Clone)]
pub struct UserClient {
    inner: CacheClient<User>,
}

impl_basic_client!(UserClient, User, UserError, user);

impl UserClient {
    #[instrument(skip(self, patch))]
    pub async fn update_user(&self, id: &str, patch: UserPatch) -> Result<User, UserError> {
        debug!("Sending request");
        Ok(self.inner.update(id, patch).await?)
    }

    /// Like [`update_user`](Self::update_user) but a user missing from the cache is not an error.
    /// Customer sessions never load the Users collection.
    #[instrument(skip(self, patch))]
    pub async fn update_if_cached(&self, id: &str, patch: UserPatch) -> Result<Option<User>, UserError> {
        match self.update_user(id, patch).await {
            Ok(user) => Ok(Some(user)),
            Err(UserError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self))]
    pub async fn remove_user(&self, id: &str) -> Result<Option<User>, UserError> {
        debug!("Sending request");
        Ok(self.inner.delete(id).await?)
    }
}
