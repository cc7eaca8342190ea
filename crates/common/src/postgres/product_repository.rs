use crate::domain::{DomainError, DomainResult, Product, ProductRepository};
use crate::postgres::PostgresClient;
use async_trait::async_trait;
use tracing::instrument;

/// PostgreSQL implementation of ProductRepository over `iot_product`
#[derive(Clone)]
pub struct PostgresProductRepository {
    client: PostgresClient,
}

impl PostgresProductRepository {
    pub fn new(client: PostgresClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ProductRepository for PostgresProductRepository {
    #[instrument(skip(self))]
    async fn get_product(&self, product_id: i64) -> DomainResult<Option<Product>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let row = conn
            .query_opt(
                "SELECT id, product_key, name FROM iot_product WHERE id = $1 AND deleted = FALSE",
                &[&product_id],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        Ok(row.map(|row| Product {
            id: row.get(0),
            product_key: row.get(1),
            name: row.get(2),
        }))
    }
}
