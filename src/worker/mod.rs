use std::time::Duration;

use time::OffsetDateTime;
use tokio::time::sleep;
use tracing::{error, info};

use crate::state::AppState;

/// Periodic SLA sweep. The scan itself is a storage-level conditional
/// update, so overlap with live ticket mutation or a manually triggered
/// scan is harmless.
pub async fn start_background_workers(state: AppState, interval_secs: u64) {
    tokio::spawn(async move {
        let interval = Duration::from_secs(interval_secs.max(1));
        loop {
            match state.engine.run_breach_scan(OffsetDateTime::now_utc()).await {
                Ok(0) => {}
                Ok(count) => info!(count, "background sweep recorded SLA breaches"),
                Err(err) => error!(error = %err, "background SLA sweep failed"),
            }
            sleep(interval).await;
        }
    });
}
