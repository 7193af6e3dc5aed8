//! Background jobs. Call `spawn_all` once during startup.

use crate::services::PayoutService;
use std::time::Duration;

/// Spawn all background tasks.
///
/// The payout worker takes per-row locks, so running it on several
/// instances at once is fine.
pub fn spawn_all(payout_service: PayoutService, payout_interval_secs: u64) {
    tokio::spawn(async move {
        let period = Duration::from_secs(payout_interval_secs.max(1));
        loop {
            match payout_service.process_pending_batch().await {
                Ok(report) if report.examined > 0 => {
                    log::debug!("Payout worker pass: {report:?}");
                }
                Ok(_) => {}
                Err(e) => log::error!("Payout worker pass failed: {e:?}"),
            }
            tokio::time::sleep(period).await;
        }
    });
}
