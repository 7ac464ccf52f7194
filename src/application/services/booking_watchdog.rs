//! Background task that sweeps stuck bookings.
//!
//! Runs in a tokio::spawn loop. Each tick cancels bookings that never
//! reached a signature within the TTL and paid bookings whose renter
//! never showed up for pickup.

use std::sync::Arc;

use tokio::time::Duration;
use tracing::{info, warn};

use crate::application::services::booking_lifecycle::BookingLifecycleService;
use crate::shared::shutdown::ShutdownSignal;

/// Start the booking watchdog background task.
///
/// Both sweeps run on every tick; each one logs and carries on when the
/// other fails, so a database hiccup never silently stops half the
/// watchdog.
pub fn start_booking_watchdog_task(
    lifecycle: Arc<BookingLifecycleService>,
    shutdown: ShutdownSignal,
    check_interval_secs: u64,
) {
    tokio::spawn(async move {
        info!(
            check_interval = check_interval_secs,
            "📅 Booking watchdog task started"
        );

        let mut interval = tokio::time::interval(Duration::from_secs(check_interval_secs));

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = lifecycle.expire_stale_pending().await {
                        warn!(error = %e, "Stale booking sweep error");
                    }
                    if let Err(e) = lifecycle.cancel_no_shows().await {
                        warn!(error = %e, "No-show sweep error");
                    }
                }
                _ = shutdown.wait() => {
                    info!("📅 Booking watchdog task shutting down");
                    break;
                }
            }
        }

        info!("📅 Booking watchdog task stopped");
    });
}
