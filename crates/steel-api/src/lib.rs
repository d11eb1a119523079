pub mod access;
pub mod auth;
pub mod campaigns;
pub mod characters;
pub mod encounters;
pub mod error;
pub mod middleware;
pub mod projects;
pub mod users;

use chrono::{DateTime, Utc};
use tracing::{error, warn};
use uuid::Uuid;

use crate::error::ApiError;

/// Run blocking DB work off the async runtime.
pub(crate) async fn run_blocking<F, T>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result,
        Err(err) => {
            error!("spawn_blocking join error: {}", err);
            Err(ApiError::Internal(anyhow::anyhow!(
                "blocking task failed: {}",
                err
            )))
        }
    }
}

/// Stored ids are uuid strings; a row that fails to parse is corrupt data,
/// not a caller error.
pub(crate) fn parse_uuid(value: &str, what: &str) -> Result<Uuid, ApiError> {
    value
        .parse()
        .map_err(|_| ApiError::Corrupt(format!("{} '{}' is not a valid uuid", what, value)))
}

pub(crate) fn db_timestamp(value: &str, what: &str) -> DateTime<Utc> {
    steel_types::time::parse_timestamp(value).unwrap_or_else(|| {
        warn!("Corrupt {} timestamp '{}'", what, value);
        DateTime::default()
    })
}
