use crate::domain::{DomainError, DomainResult};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Default deadline for a single collaborator call (registry, store, cache, dispatch)
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(5);

/// Run a collaborator call under a deadline.
///
/// Expiry maps to `DomainError::Timeout` carrying the operation name.
pub async fn with_deadline<T, F>(operation: &str, timeout: Duration, call: F) -> DomainResult<T>
where
    F: Future<Output = DomainResult<T>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => {
            warn!(
                operation = %operation,
                timeout_ms = timeout.as_millis() as u64,
                "collaborator call exceeded deadline"
            );
            Err(DomainError::Timeout(format!(
                "{} did not complete within {}ms",
                operation,
                timeout.as_millis()
            )))
        }
    }
}
