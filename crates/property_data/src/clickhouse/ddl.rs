use common::domain::{
    PhysicalColumn, SchemaDiff, StorageType, DEVICE_NAME_COLUMN, TIMESTAMP_COLUMN,
};
use tracing::warn;

/// Backtick-quote an identifier for ClickHouse
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('\\', "\\\\").replace('`', "\\`"))
}

/// ClickHouse type backing a column; only the timestamp column is non-nullable
pub fn clickhouse_column_type(column: &PhysicalColumn) -> String {
    let inner = match column.storage_type {
        StorageType::Int => "Int32",
        StorageType::Float => "Float32",
        StorageType::Double => "Float64",
        StorageType::TinyInt => "Int8",
        StorageType::NChar => "String",
        StorageType::Timestamp => "DateTime64(3)",
    };

    if column.name == TIMESTAMP_COLUMN {
        inner.to_string()
    } else {
        format!("Nullable({})", inner)
    }
}

/// `name Type COMMENT 'DECLARED'`; the comment keeps the declared type and length
pub fn column_definition(column: &PhysicalColumn) -> String {
    format!(
        "{} {} COMMENT '{}'",
        quote_identifier(&column.name),
        clickhouse_column_type(column),
        column.declared_type()
    )
}

/// `CREATE TABLE` for a product table
///
/// Every device of the product shares the table; rows are keyed by a
/// `device_name` column placed right after the timestamp, and sorted by
/// device then time.
pub fn create_table_sql(database: &str, table: &str, columns: &[PhysicalColumn]) -> String {
    let mut definitions: Vec<String> = columns.iter().map(column_definition).collect();
    let device_at = columns
        .iter()
        .position(|column| column.name == TIMESTAMP_COLUMN)
        .map_or(0, |i| i + 1);
    definitions.insert(
        device_at,
        format!("{} LowCardinality(String)", quote_identifier(DEVICE_NAME_COLUMN)),
    );

    format!(
        "CREATE TABLE IF NOT EXISTS {}.{} ({}) ENGINE = MergeTree ORDER BY ({}, {})",
        quote_identifier(database),
        quote_identifier(table),
        definitions.join(", "),
        quote_identifier(DEVICE_NAME_COLUMN),
        quote_identifier(TIMESTAMP_COLUMN)
    )
}

/// Single `ALTER TABLE` for the diff, or `None` when there is nothing to apply
pub fn alter_table_sql(database: &str, table: &str, diff: &SchemaDiff) -> Option<String> {
    if diff.is_empty() {
        return None;
    }

    let clauses = diff
        .added
        .iter()
        .map(|column| format!("ADD COLUMN IF NOT EXISTS {}", column_definition(column)))
        .chain(
            diff.modified
                .iter()
                .map(|change| format!("MODIFY COLUMN {}", column_definition(&change.target))),
        )
        .collect::<Vec<_>>()
        .join(", ");

    Some(format!(
        "ALTER TABLE {}.{} {}",
        quote_identifier(database),
        quote_identifier(table),
        clauses
    ))
}

/// Rebuild a column from `system.columns`
///
/// The comment wins when it holds a declared type; otherwise the type is
/// inferred from the ClickHouse type. Columns of any other type are skipped.
pub fn parse_column(name: &str, clickhouse_type: &str, comment: &str) -> Option<PhysicalColumn> {
    if let Ok((storage_type, length)) = PhysicalColumn::parse_declared_type(comment) {
        return Some(PhysicalColumn::new(name, storage_type).with_length(length));
    }

    let inner = clickhouse_type
        .strip_prefix("Nullable(")
        .and_then(|rest| rest.strip_suffix(')'))
        .unwrap_or(clickhouse_type);

    let storage_type = match inner {
        "Int32" => StorageType::Int,
        "Float32" => StorageType::Float,
        "Float64" => StorageType::Double,
        "Int8" => StorageType::TinyInt,
        "String" => StorageType::NChar,
        t if t.starts_with("DateTime64") => StorageType::Timestamp,
        _ => {
            warn!(column = %name, clickhouse_type = %clickhouse_type, "skipping column of unknown type");
            return None;
        }
    };

    Some(PhysicalColumn::new(name, storage_type))
}
