use crate::clickhouse::{alter_table_sql, create_table_sql, parse_column};
use crate::domain::product_table_name;
use async_trait::async_trait;
use clickhouse::sql::Identifier;
use clickhouse::Row;
use common::clickhouse::ClickHouseClient;
use common::domain::{
    DomainError, DomainResult, HistoryQuery, HistoryRow, PhysicalColumn, PropertyTableStore,
    SchemaDiff, TableColumns, DEVICE_NAME_COLUMN,
};
use serde::Deserialize;
use tracing::{debug, error, instrument};

#[derive(Debug, Row, Deserialize)]
struct ColumnRow {
    name: String,
    column_type: String,
    comment: String,
}

#[derive(Debug, Row, Deserialize)]
struct HistoryRecord {
    /// Epoch milliseconds of `ts`
    time: i64,
    /// Column value rendered by `toJSONString`
    data: String,
}

impl From<HistoryRecord> for HistoryRow {
    fn from(record: HistoryRecord) -> Self {
        let data = serde_json::from_str(&record.data)
            .unwrap_or(serde_json::Value::String(record.data));

        let mut row = HistoryRow::new();
        row.insert("time".to_string(), serde_json::Value::from(record.time));
        row.insert("data".to_string(), data);
        row
    }
}

/// Binds: device name, window start, window end
const DEVICE_WINDOW: &str = "device_name = ? \
     AND ts BETWEEN fromUnixTimestamp64Milli(toInt64(?)) AND fromUnixTimestamp64Milli(toInt64(?))";

/// ClickHouse implementation of PropertyTableStore
#[derive(Clone)]
pub struct ClickHousePropertyTableStore {
    client: ClickHouseClient,
}

impl ClickHousePropertyTableStore {
    pub fn new(client: ClickHouseClient) -> Self {
        Self { client }
    }

    async fn execute_ddl(&self, sql: &str) -> DomainResult<()> {
        self.client
            .get_client()
            .query(sql)
            .execute()
            .await
            .map_err(|e| {
                error!("Failed to apply DDL: {}", e);
                DomainError::SchemaWriteError(e.into())
            })
    }
}

#[async_trait]
impl PropertyTableStore for ClickHousePropertyTableStore {
    #[instrument(skip(self))]
    async fn get_columns(&self, product_key: &str) -> DomainResult<TableColumns> {
        let table = product_table_name(product_key)?;
        let client = self.client.get_client();

        let exists = client
            .query("SELECT count() FROM system.tables WHERE database = ? AND name = ?")
            .bind(self.client.database())
            .bind(&table)
            .fetch_one::<u64>()
            .await
            .map_err(|e| DomainError::SchemaReadError(e.into()))?;

        if exists == 0 {
            debug!(table = %table, "property table does not exist");
            return Ok(TableColumns::Absent);
        }

        let rows = client
            .query(
                "SELECT name, type AS column_type, comment FROM system.columns \
                 WHERE database = ? AND table = ? AND name != ? ORDER BY position",
            )
            .bind(self.client.database())
            .bind(&table)
            .bind(DEVICE_NAME_COLUMN)
            .fetch_all::<ColumnRow>()
            .await
            .map_err(|e| DomainError::SchemaReadError(e.into()))?;

        let columns: Vec<PhysicalColumn> = rows
            .iter()
            .filter_map(|row| parse_column(&row.name, &row.column_type, &row.comment))
            .collect();

        debug!(table = %table, column_count = columns.len(), "read property table columns");
        Ok(TableColumns::Present(columns))
    }

    #[instrument(skip(self, columns), fields(column_count = columns.len()))]
    async fn create_table(&self, product_key: &str, columns: &[PhysicalColumn]) -> DomainResult<()> {
        let table = product_table_name(product_key)?;
        let sql = create_table_sql(self.client.database(), &table, columns);
        self.execute_ddl(&sql).await?;

        debug!(table = %table, "created property table");
        Ok(())
    }

    #[instrument(skip(self, diff), fields(added = diff.added.len(), modified = diff.modified.len()))]
    async fn alter_table(&self, product_key: &str, diff: &SchemaDiff) -> DomainResult<()> {
        let table = product_table_name(product_key)?;
        let Some(sql) = alter_table_sql(self.client.database(), &table, diff) else {
            return Ok(());
        };
        self.execute_ddl(&sql).await?;

        debug!(table = %table, "altered property table");
        Ok(())
    }

    #[instrument(skip(self, query), fields(table = %query.table, device_name = %query.device_name, column = %query.column))]
    async fn query_page(&self, query: &HistoryQuery) -> DomainResult<Vec<HistoryRow>> {
        let sql = format!(
            "SELECT toUnixTimestamp64Milli(ts) AS time, toJSONString(?) AS data FROM ?.? \
             WHERE {} ORDER BY ts LIMIT ? OFFSET ?",
            DEVICE_WINDOW
        );

        let records = self
            .client
            .get_client()
            .query(&sql)
            .bind(Identifier(&query.column))
            .bind(Identifier(&query.database))
            .bind(Identifier(&query.table))
            .bind(&query.device_name)
            .bind(query.start_ms)
            .bind(query.end_ms)
            .bind(query.limit)
            .bind(query.offset)
            .fetch_all::<HistoryRecord>()
            .await
            .map_err(|e| {
                error!("Failed to query history page: {}", e);
                DomainError::RepositoryError(e.into())
            })?;

        Ok(records.into_iter().map(HistoryRow::from).collect())
    }

    #[instrument(skip(self, query), fields(table = %query.table, device_name = %query.device_name))]
    async fn query_count(&self, query: &HistoryQuery) -> DomainResult<u64> {
        let sql = format!("SELECT count() FROM ?.? WHERE {}", DEVICE_WINDOW);

        self.client
            .get_client()
            .query(&sql)
            .bind(Identifier(&query.database))
            .bind(Identifier(&query.table))
            .bind(&query.device_name)
            .bind(query.start_ms)
            .bind(query.end_ms)
            .fetch_one::<u64>()
            .await
            .map_err(|e| {
                error!("Failed to count history rows: {}", e);
                DomainError::RepositoryError(e.into())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_history_record_to_row() {
        let row = HistoryRow::from(HistoryRecord {
            time: 1_700_000_000_000,
            data: "21.5".to_string(),
        });

        let keys: Vec<_> = row.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["time", "data"]);
        assert_eq!(row["time"], json!(1_700_000_000_000i64));
        assert_eq!(row["data"], json!(21.5));
    }

    #[test]
    fn test_null_and_text_values() {
        let null = HistoryRow::from(HistoryRecord {
            time: 1,
            data: "null".to_string(),
        });
        assert_eq!(null["data"], serde_json::Value::Null);

        let text = HistoryRow::from(HistoryRecord {
            time: 1,
            data: "\"{\\\"mode\\\":1}\"".to_string(),
        });
        assert_eq!(text["data"], json!("{\"mode\":1}"));
    }
}
