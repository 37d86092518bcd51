// service/background_jobs.rs
use std::sync::Arc;
use chrono::Utc;
use tokio::time::{interval, Duration};

use crate::AppState;

/// Jobs expired per sweep; the rest wait for the next tick.
const EXPIRY_BATCH_SIZE: i64 = 500;

/// Start background job that expires overdue jobs
pub async fn start_expiry_sweep(app_state: Arc<AppState>) {
    let mut interval = interval(Duration::from_secs(app_state.env.expiry_sweep_secs));

    loop {
        interval.tick().await;

        let now = Utc::now();
        tracing::debug!("Running expiry sweep at {}", now);

        match app_state
            .lifecycle_service
            .expire_overdue(now, EXPIRY_BATCH_SIZE)
            .await
        {
            Ok(0) => {}
            Ok(count) => tracing::info!("Expiry sweep completed: {} jobs expired", count),
            Err(e) => tracing::error!("Expiry sweep failed: {}", e),
        }
    }
}
