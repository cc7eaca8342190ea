use crate::domain::{
    DataType, DomainError, DomainResult, PropertySpec, ThingModel, ThingModelKind,
    ThingModelRepository,
};
use crate::postgres::PostgresClient;
use anyhow::anyhow;
use async_trait::async_trait;
use serde::Deserialize;
use tokio_postgres::Row;
use tracing::{debug, instrument};

const THING_MODEL_COLUMNS: &str = "id, product_id, product_key, identifier, name, type, property";

/// Shape of the `property` JSON column
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PropertyJson {
    data_type: String,
    #[serde(default)]
    data_specs: Option<DataSpecsJson>,
}

#[derive(Debug, Deserialize)]
struct DataSpecsJson {
    #[serde(default)]
    length: Option<u32>,
}

/// Parse the `property` JSON column into a typed spec
///
/// An unknown data type is a data defect and fails the whole read.
pub fn parse_property_spec(property: &serde_json::Value) -> DomainResult<PropertySpec> {
    let parsed: PropertyJson = serde_json::from_value(property.clone())
        .map_err(|e| DomainError::RepositoryError(anyhow!("malformed thing model property: {}", e)))?;

    let data_type = parsed
        .data_type
        .parse::<DataType>()
        .map_err(|e| DomainError::RepositoryError(anyhow!("{}", e)))?;

    Ok(PropertySpec {
        data_type,
        length: parsed.data_specs.and_then(|specs| specs.length),
    })
}

fn thing_model_from_row(row: &Row) -> DomainResult<ThingModel> {
    let id: i64 = row.get(0);
    let code: i32 = row.get(5);
    let kind = ThingModelKind::from_code(code).ok_or_else(|| {
        DomainError::RepositoryError(anyhow!("thing model {} has unknown type {}", id, code))
    })?;

    let property = match (kind, row.get::<_, Option<serde_json::Value>>(6)) {
        (ThingModelKind::Property, Some(json)) => Some(parse_property_spec(&json)?),
        _ => None,
    };

    Ok(ThingModel {
        id,
        product_id: row.get(1),
        product_key: row.get(2),
        identifier: row.get(3),
        name: row.get(4),
        kind,
        property,
    })
}

/// PostgreSQL implementation of ThingModelRepository over `iot_thing_model`
#[derive(Clone)]
pub struct PostgresThingModelRepository {
    client: PostgresClient,
}

impl PostgresThingModelRepository {
    pub fn new(client: PostgresClient) -> Self {
        Self { client }
    }

    async fn list_where(
        &self,
        filter: &str,
        param: &(dyn tokio_postgres::types::ToSql + Sync),
    ) -> DomainResult<Vec<ThingModel>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let sql = format!(
            "SELECT {} FROM iot_thing_model WHERE {} AND deleted = FALSE ORDER BY id",
            THING_MODEL_COLUMNS, filter
        );

        let rows = conn
            .query(sql.as_str(), &[param])
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        let models = rows
            .iter()
            .map(thing_model_from_row)
            .collect::<DomainResult<Vec<_>>>()?;

        debug!(count = models.len(), "listed thing models");
        Ok(models)
    }
}

#[async_trait]
impl ThingModelRepository for PostgresThingModelRepository {
    #[instrument(skip(self))]
    async fn list_by_product_id(&self, product_id: i64) -> DomainResult<Vec<ThingModel>> {
        self.list_where("product_id = $1", &product_id).await
    }

    #[instrument(skip(self))]
    async fn list_by_product_key(&self, product_key: &str) -> DomainResult<Vec<ThingModel>> {
        self.list_where("product_key = $1", &product_key).await
    }
}
