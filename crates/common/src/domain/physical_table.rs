use crate::domain::result::{DomainError, DomainResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the implicit leading timestamp column
pub const TIMESTAMP_COLUMN: &str = "ts";

/// Name of the store column keying each row of a product table to its device
pub const DEVICE_NAME_COLUMN: &str = "device_name";

/// Column type in the time-series store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageType {
    Int,
    Float,
    Double,
    TinyInt,
    NChar,
    Timestamp,
}

impl StorageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageType::Int => "INT",
            StorageType::Float => "FLOAT",
            StorageType::Double => "DOUBLE",
            StorageType::TinyInt => "TINYINT",
            StorageType::NChar => "NCHAR",
            StorageType::Timestamp => "TIMESTAMP",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "INT" => Some(StorageType::Int),
            "FLOAT" => Some(StorageType::Float),
            "DOUBLE" => Some(StorageType::Double),
            "TINYINT" => Some(StorageType::TinyInt),
            "NCHAR" => Some(StorageType::NChar),
            "TIMESTAMP" => Some(StorageType::Timestamp),
            _ => None,
        }
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A column materialized in a product's property table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalColumn {
    pub name: String,
    pub storage_type: StorageType,
    pub length: Option<u32>,
}

impl PhysicalColumn {
    pub fn new(name: impl Into<String>, storage_type: StorageType) -> Self {
        Self {
            name: name.into(),
            storage_type,
            length: None,
        }
    }

    pub fn with_length(mut self, length: Option<u32>) -> Self {
        self.length = length;
        self
    }

    /// The implicit leading `ts TIMESTAMP` column
    pub fn timestamp() -> Self {
        Self::new(TIMESTAMP_COLUMN, StorageType::Timestamp)
    }

    /// Declared type text, e.g. `INT` or `NCHAR(64)`
    pub fn declared_type(&self) -> String {
        match self.length {
            Some(length) => format!("{}({})", self.storage_type, length),
            None => self.storage_type.to_string(),
        }
    }

    /// Parse declared type text produced by `declared_type`
    pub fn parse_declared_type(declared: &str) -> DomainResult<(StorageType, Option<u32>)> {
        let declared = declared.trim();
        let (name, length) = match declared.split_once('(') {
            Some((name, rest)) => {
                let digits = rest.strip_suffix(')').ok_or_else(|| {
                    DomainError::ValidationError(format!("Malformed column type: {}", declared))
                })?;
                let length = digits.trim().parse::<u32>().map_err(|_| {
                    DomainError::ValidationError(format!("Malformed column length: {}", declared))
                })?;
                (name.trim(), Some(length))
            }
            None => (declared, None),
        };

        let storage_type = StorageType::from_name(&name.to_ascii_uppercase()).ok_or_else(|| {
            DomainError::ValidationError(format!("Unknown column type: {}", declared))
        })?;

        Ok((storage_type, length))
    }
}

/// Result of reading a table's columns; absence is a state, not an error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableColumns {
    Absent,
    Present(Vec<PhysicalColumn>),
}

/// A column present in both schemas whose definition must change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnChange {
    pub previous: PhysicalColumn,
    pub target: PhysicalColumn,
}

/// Additive changes needed to bring an existing table up to the target columns
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaDiff {
    pub added: Vec<PhysicalColumn>,
    pub modified: Vec<ColumnChange>,
}

impl SchemaDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty()
    }
}

/// Bounded time-window query against one device's rows of a product table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryQuery {
    pub database: String,
    /// Product table holding the device's rows
    pub table: String,
    pub device_name: String,
    pub column: String,
    /// Inclusive lower bound, epoch milliseconds
    pub start_ms: i64,
    /// Inclusive upper bound, epoch milliseconds
    pub end_ms: i64,
    pub limit: u64,
    pub offset: u64,
}

/// One stored row as column name to value, in storage column order
pub type HistoryRow = serde_json::Map<String, serde_json::Value>;

/// A page of history rows plus the total under the same filter
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryPage {
    pub rows: Vec<HistoryRow>,
    pub total: u64,
}

/// Driver for the physical time-series store
///
/// Implementations should:
/// - Report a missing table as `TableColumns::Absent`, never as an error
/// - Map read failures to `SchemaReadError` and DDL failures to `SchemaWriteError`
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait PropertyTableStore: Send + Sync {
    /// Current property columns of a product's property table
    ///
    /// The store's device key column is not a property column and is not listed.
    async fn get_columns(&self, product_key: &str) -> DomainResult<TableColumns>;

    /// Create a product's property table with the given columns, in order
    async fn create_table(&self, product_key: &str, columns: &[PhysicalColumn]) -> DomainResult<()>;

    /// Apply an additive diff to an existing product table
    async fn alter_table(&self, product_key: &str, diff: &SchemaDiff) -> DomainResult<()>;

    /// One page of rows for a history query
    async fn query_page(&self, query: &HistoryQuery) -> DomainResult<Vec<HistoryRow>>;

    /// Row count under the same filter as `query_page`, ignoring limit/offset
    async fn query_count(&self, query: &HistoryQuery) -> DomainResult<u64>;
}
