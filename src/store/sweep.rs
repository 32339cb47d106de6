use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;

use super::RefreshTokenStore;

/// Periodically purge refresh-token records whose expiry has passed.
///
/// Expired tokens already fail signature verification; the sweep keeps the
/// table from growing without bound. Errors are logged and the loop carries on.
/// A zero interval is refused and the task exits immediately.
pub fn spawn_refresh_token_sweep(
    store: Arc<dyn RefreshTokenStore>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if interval.is_zero() {
            tracing::error!("Refresh token sweep interval is zero; sweep not started");
            return;
        }

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match store.delete_expired(Utc::now()).await {
                Ok(0) => tracing::debug!("Refresh token sweep found nothing to remove"),
                Ok(removed) => {
                    tracing::info!(removed = removed, "Removed expired refresh tokens")
                }
                Err(e) => tracing::error!(error = %e, "Refresh token sweep failed"),
            }
        }
    })
}
