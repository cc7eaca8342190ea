use crate::domain::{storage_type_for, to_column_name, ProductLocks};
use common::domain::{
    property_definitions, with_deadline, ColumnChange, DataType, DomainError, DomainResult,
    PhysicalColumn, ProductRepository, PropertyDefinition, PropertyTableStore, SchemaDiff,
    StorageType, TableColumns, ThingModelRepository, DEFAULT_CALL_TIMEOUT,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// What a synchronization did to the physical table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaSyncOutcome {
    /// No table and no property definitions yet
    NothingToDefine,
    Created { columns: usize },
    Altered { added: usize, modified: usize },
    UpToDate,
}

/// Target columns for a product's property definitions, in definition order
///
/// Two identifiers that collapse to the same column name are rejected.
pub fn build_target_columns(definitions: &[PropertyDefinition]) -> DomainResult<Vec<PhysicalColumn>> {
    let mut seen = HashSet::new();
    let mut columns = Vec::with_capacity(definitions.len());

    for definition in definitions {
        let name = to_column_name(&definition.identifier)?;
        if !seen.insert(name.clone()) {
            return Err(DomainError::ValidationError(format!(
                "identifier {:?} maps to column {} which is already taken",
                definition.identifier, name
            )));
        }

        let length = match definition.data_type {
            DataType::Text => definition.length,
            _ => None,
        };
        columns.push(
            PhysicalColumn::new(name, storage_type_for(definition.data_type)).with_length(length),
        );
    }

    Ok(columns)
}

/// Additive diff from `existing` to `target`
///
/// Columns missing from `target` are kept. NCHAR columns are only ever widened.
pub fn diff_columns(existing: &[PhysicalColumn], target: &[PhysicalColumn]) -> SchemaDiff {
    let existing_by_name: HashMap<&str, &PhysicalColumn> = existing
        .iter()
        .map(|column| (column.name.as_str(), column))
        .collect();

    let mut diff = SchemaDiff::default();
    for column in target {
        let Some(previous) = existing_by_name.get(column.name.as_str()) else {
            diff.added.push(column.clone());
            continue;
        };

        if previous.storage_type != column.storage_type {
            diff.modified.push(ColumnChange {
                previous: (*previous).clone(),
                target: column.clone(),
            });
        } else if column.storage_type == StorageType::NChar && previous.length != column.length {
            match (previous.length, column.length) {
                (Some(old), Some(new)) if new > old => diff.modified.push(ColumnChange {
                    previous: (*previous).clone(),
                    target: column.clone(),
                }),
                (Some(_), None) => diff.modified.push(ColumnChange {
                    previous: (*previous).clone(),
                    target: column.clone(),
                }),
                _ => warn!(
                    column = %column.name,
                    existing_length = ?previous.length,
                    target_length = ?column.length,
                    "not narrowing text column"
                ),
            }
        }
    }

    diff
}

/// Keeps a product's property table in line with its thing model
///
/// Flow:
/// 1. Load the product and its property definitions
/// 2. Read the table's current columns (an absent table is an empty schema)
/// 3. Create the table, or apply the additive diff, or do nothing
pub struct SchemaSynchronizer {
    product_repository: Arc<dyn ProductRepository>,
    thing_model_repository: Arc<dyn ThingModelRepository>,
    table_store: Arc<dyn PropertyTableStore>,
    locks: ProductLocks,
    call_timeout: Duration,
}

impl SchemaSynchronizer {
    pub fn new(
        product_repository: Arc<dyn ProductRepository>,
        thing_model_repository: Arc<dyn ThingModelRepository>,
        table_store: Arc<dyn PropertyTableStore>,
    ) -> Self {
        Self {
            product_repository,
            thing_model_repository,
            table_store,
            locks: ProductLocks::new(),
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    #[instrument(skip(self))]
    pub async fn synchronize(&self, product_id: i64) -> DomainResult<SchemaSyncOutcome> {
        let _guard = self.locks.acquire(product_id).await;

        let product = with_deadline(
            "get_product",
            self.call_timeout,
            self.product_repository.get_product(product_id),
        )
        .await?
        .ok_or_else(|| DomainError::ProductNotFound(product_id.to_string()))?;

        let thing_models = with_deadline(
            "list_thing_models",
            self.call_timeout,
            self.thing_model_repository.list_by_product_id(product_id),
        )
        .await?;
        let definitions = property_definitions(&thing_models);
        let target = build_target_columns(&definitions)?;

        let existing = with_deadline(
            "get_columns",
            self.call_timeout,
            self.table_store.get_columns(&product.product_key),
        )
        .await?;

        match existing {
            TableColumns::Absent if target.is_empty() => {
                info!(product_key = %product.product_key, "no properties to define");
                Ok(SchemaSyncOutcome::NothingToDefine)
            }
            TableColumns::Absent => {
                let mut columns = Vec::with_capacity(target.len() + 1);
                columns.push(PhysicalColumn::timestamp());
                columns.extend(target);

                with_deadline(
                    "create_table",
                    self.call_timeout,
                    self.table_store.create_table(&product.product_key, &columns),
                )
                .await?;

                info!(
                    product_key = %product.product_key,
                    column_count = columns.len(),
                    "created property table"
                );
                Ok(SchemaSyncOutcome::Created {
                    columns: columns.len(),
                })
            }
            TableColumns::Present(existing) => {
                let diff = diff_columns(&existing, &target);
                if diff.is_empty() {
                    debug!(product_key = %product.product_key, "property table up to date");
                    return Ok(SchemaSyncOutcome::UpToDate);
                }

                with_deadline(
                    "alter_table",
                    self.call_timeout,
                    self.table_store.alter_table(&product.product_key, &diff),
                )
                .await?;

                info!(
                    product_key = %product.product_key,
                    added = diff.added.len(),
                    modified = diff.modified.len(),
                    "altered property table"
                );
                Ok(SchemaSyncOutcome::Altered {
                    added: diff.added.len(),
                    modified: diff.modified.len(),
                })
            }
        }
    }
}
