//! Background task that expires overdue unsigned contracts.
//!
//! Runs in a tokio::spawn loop, periodically marking Pending contracts
//! whose signing token passed its deadline as Expired. Renters who hit
//! an expired link get the same answer either way; the sweep keeps the
//! stored state honest for staff views and re-issuance.

use std::sync::Arc;

use chrono::Utc;
use tokio::time::Duration;
use tracing::{info, warn};

use crate::application::services::contract_gate::ContractGateService;
use crate::shared::shutdown::ShutdownSignal;

/// Start the contract expiry background task.
pub fn start_contract_expiry_task(
    contracts: Arc<ContractGateService>,
    shutdown: ShutdownSignal,
    check_interval_secs: u64,
) {
    tokio::spawn(async move {
        info!(
            check_interval = check_interval_secs,
            "📅 Contract expiry task started"
        );

        let mut interval = tokio::time::interval(Duration::from_secs(check_interval_secs));

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = contracts.expire_overdue(Utc::now()).await {
                        warn!(error = %e, "Contract expiry sweep error");
                    }
                }
                _ = shutdown.wait() => {
                    info!("📅 Contract expiry task shutting down");
                    break;
                }
            }
        }

        info!("📅 Contract expiry task stopped");
    });
}
