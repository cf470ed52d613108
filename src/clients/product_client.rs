use tracing::{debug, instrument};

use crate::actor_framework::{CacheClient, InsertAt};
use crate::domain::Product;
use crate::product_actor::{ProductError, ProductPatch};

/// Client for the Products cache.
#[derive(Clone)]
pub struct ProductClient {
    inner: CacheClient<Product>,
}

impl_basic_client!(ProductClient, Product, ProductError, product);

impl ProductClient {
    #[instrument(skip(self, product), fields(product_id = %product.id, name = %product.name))]
    pub async fn insert_product(&self, product: Product, at: InsertAt) -> Result<(), ProductError> {
        debug!("Sending request");
        Ok(self.inner.insert(product, at).await?)
    }

    #[instrument(skip(self, patch))]
    pub async fn edit_product(&self, id: &str, patch: ProductPatch) -> Result<Product, ProductError> {
        debug!("Sending request");
        Ok(self.inner.update(id, patch).await?)
    }

    #[instrument(skip(self))]
    pub async fn remove_product(&self, id: &str) -> Result<Option<Product>, ProductError> {
        debug!("Sending request");
        Ok(self.inner.delete(id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_framework::{create_mock_client, expect_delete, expect_insert};

    #[tokio::test]
    async fn test_insert_forwards_position() {
        let (inner, mut receiver) = create_mock_client::<Product>(10);
        let client = ProductClient::new(inner);
        let product = Product::new("local-1", "PS5", 50.0, 150.0, 5);

        let task = tokio::spawn({
            let product = product.clone();
            async move { client.insert_product(product, InsertAt::Back).await }
        });

        let (item, at, responder) = expect_insert(&mut receiver).await.expect("Expected Insert request");
        assert_eq!(item.id, product.id);
        assert_eq!(at, InsertAt::Back);
        responder.send(Ok(())).unwrap();

        assert_eq!(task.await.unwrap(), Ok(()));
    }

    #[tokio::test]
    async fn test_closed_cache_surfaces_as_product_error() {
        let (inner, mut receiver) = create_mock_client::<Product>(10);
        let client = ProductClient::new(inner);

        let task = tokio::spawn(async move { client.remove_product("p1").await });

        let (id, responder) = expect_delete(&mut receiver).await.expect("Expected Delete request");
        assert_eq!(id, "p1");
        drop(responder);

        assert!(task.await.unwrap().is_err());
    }
}
