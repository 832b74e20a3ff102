//! Error classification for client results.
//!
//! Operations whose contract has a "no" answer turn the distinguished
//! client error kind into that answer. All other failures propagate, with
//! the underlying [`BacktoryError`] reachable through `downcast_ref`.

use anyhow::{Context, Result};

use crate::client::BacktoryError;

/// Classify a client result.
///
/// Returns `Ok(Some(value))` on success and `Ok(None)` when the client
/// raised the distinguished kind. Any other error propagates.
pub(crate) fn recover<T>(
    operation: &str,
    path: &str,
    result: Result<T, BacktoryError>,
) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_distinguished() => {
            tracing::debug!(operation, path, error = %err, "Backtory reported a negative answer");
            Ok(None)
        }
        Err(err) => Err(err).with_context(|| format!("{} failed for '{}'", operation, path)),
    }
}
