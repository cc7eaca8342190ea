use crate::domain::{product_table_name, to_column_name};
use chrono::{LocalResult, NaiveDateTime, TimeZone};
use common::domain::{
    with_deadline, DeviceRepository, DomainError, DomainResult, HistoryPage, HistoryQuery,
    PropertyTableStore, DEFAULT_CALL_TIMEOUT,
};
use common::garde::validate_struct;
use garde::Validate;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// Time-windowed page of one property of one device
#[derive(Debug, Clone, Validate)]
pub struct HistoryQueryInput {
    #[garde(range(min = 1))]
    pub device_id: i64,
    #[garde(length(min = 1))]
    pub identifier: String,
    /// Inclusive, wall-clock time in the service's zone
    #[garde(skip)]
    pub start_time: NaiveDateTime,
    /// Inclusive, wall-clock time in the service's zone
    #[garde(skip)]
    pub end_time: NaiveDateTime,
    #[garde(range(min = 1))]
    pub page_no: u64,
    #[garde(range(min = 1))]
    pub page_size: u64,
}

impl HistoryQueryInput {
    pub fn offset(&self) -> u64 {
        self.page_no.saturating_sub(1).saturating_mul(self.page_size)
    }
}

/// Epoch milliseconds of a wall-clock time in `tz`
///
/// Ambiguous times (DST fold) resolve to the earlier instant; times that do
/// not exist (DST gap) are rejected.
pub fn to_epoch_millis<Tz: TimeZone>(tz: &Tz, local: NaiveDateTime) -> DomainResult<i64> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(at) => Ok(at.timestamp_millis()),
        LocalResult::Ambiguous(earliest, _) => Ok(earliest.timestamp_millis()),
        LocalResult::None => Err(DomainError::ValidationError(format!(
            "{} does not exist in the local time zone",
            local
        ))),
    }
}

/// Paginated reads of a device's property history
pub struct HistoryQueryService {
    device_repository: Arc<dyn DeviceRepository>,
    table_store: Arc<dyn PropertyTableStore>,
    database: String,
    call_timeout: Duration,
}

impl HistoryQueryService {
    pub fn new(
        device_repository: Arc<dyn DeviceRepository>,
        table_store: Arc<dyn PropertyTableStore>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            device_repository,
            table_store,
            database: database.into(),
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    /// History with start/end read as system-local time
    pub async fn history(&self, input: &HistoryQueryInput) -> DomainResult<HistoryPage> {
        self.history_in(input, &chrono::Local).await
    }

    #[instrument(skip(self, input, tz), fields(device_id = input.device_id, identifier = %input.identifier))]
    pub async fn history_in<Tz: TimeZone>(
        &self,
        input: &HistoryQueryInput,
        tz: &Tz,
    ) -> DomainResult<HistoryPage> {
        validate_struct(input)?;

        let start_ms = to_epoch_millis(tz, input.start_time)?;
        let end_ms = to_epoch_millis(tz, input.end_time)?;
        if start_ms > end_ms {
            return Err(DomainError::ValidationError(format!(
                "start time {} is after end time {}",
                input.start_time, input.end_time
            )));
        }
        let column = to_column_name(&input.identifier)?;

        let device = with_deadline(
            "get_device",
            self.call_timeout,
            self.device_repository.get_device(input.device_id),
        )
        .await?
        .ok_or_else(|| DomainError::DeviceNotFound(input.device_id.to_string()))?;

        let query = HistoryQuery {
            database: self.database.clone(),
            table: product_table_name(&device.product_key)?,
            device_name: device.device_name.clone(),
            column,
            start_ms,
            end_ms,
            limit: input.page_size,
            offset: input.offset(),
        };

        let (rows, total) = tokio::try_join!(
            with_deadline("query_page", self.call_timeout, self.table_store.query_page(&query)),
            with_deadline("query_count", self.call_timeout, self.table_store.query_count(&query)),
        )?;

        debug!(
            table = %query.table,
            device_name = %query.device_name,
            row_count = rows.len(),
            total = total,
            offset = query.offset,
            "history page read"
        );
        Ok(HistoryPage { rows, total })
    }
}
