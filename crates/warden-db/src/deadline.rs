//! Bounded database calls.

use std::time::Duration;

use crate::error::DbError;

/// Default upper bound for a single repository operation.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Run `fut`, failing with [`DbError::Timeout`] once `limit` elapses.
pub(crate) async fn bounded<T, F>(limit: Duration, fut: F) -> Result<T, DbError>
where
    F: Future<Output = Result<T, DbError>>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| DbError::Timeout(limit))?
}
