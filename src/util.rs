//! Small shared helpers

use crate::error::{RelayError, RelayResult};

use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Sleep that aborts early if the token is cancelled.
///
/// Returns `RelayError::Cancelled` when the token fires before the delay
/// elapses, so retry and polling loops can bail out without issuing another
/// network call.
pub(crate) async fn sleep_or_cancel(ctx: &CancellationToken, delay: Duration) -> RelayResult<()> {
    tokio::select! {
        _ = ctx.cancelled() => Err(RelayError::Cancelled),
        _ = tokio::time::sleep(delay) => Ok(()),
    }
}

/// Bail out with `RelayError::Cancelled` if the token has already fired.
pub(crate) fn check_cancelled(ctx: &CancellationToken) -> RelayResult<()> {
    if ctx.is_cancelled() {
        return Err(RelayError::Cancelled);
    }
    Ok(())
}
