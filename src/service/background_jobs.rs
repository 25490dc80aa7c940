// service/background_jobs.rs
use std::sync::Arc;

use chrono::Utc;
use tokio::time::{interval, Duration};

use crate::AppState;

/// `interval` panics on a zero period.
fn job_period(app_state: &AppState) -> Duration {
    Duration::from_secs(app_state.env.job_interval_secs.max(1))
}

/// Periodically moves overdue pending/countered negotiations to `expired`.
pub async fn start_negotiation_expiry_job(app_state: Arc<AppState>) {
    let mut interval = interval(job_period(&app_state));

    loop {
        interval.tick().await;

        let now = Utc::now();
        tracing::info!("Running negotiation expiry job at {}", now);

        match app_state.negotiation_service.expire_overdue(now).await {
            Ok(expired) => tracing::info!(
                "Negotiation expiry job completed: {} negotiations expired",
                expired
            ),
            Err(e) => tracing::error!("Negotiation expiry job failed: {}", e),
        }
    }
}

/// Creates bookings for accepted negotiations whose booking step failed.
pub async fn start_booking_reconciliation_job(app_state: Arc<AppState>) {
    let mut interval = interval(job_period(&app_state));

    loop {
        interval.tick().await;

        tracing::info!("Running booking reconciliation job at {}", Utc::now());

        match app_state.booking_service.reconcile_missing_bookings().await {
            Ok(0) => tracing::debug!("Booking reconciliation job found nothing to do"),
            Ok(created) => tracing::info!(
                "Booking reconciliation job completed: {} bookings created",
                created
            ),
            Err(e) => tracing::error!("Booking reconciliation job failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Config, db::memory::MemoryStore};

    fn app_state(job_interval_secs: u64) -> AppState {
        AppState::new(
            Arc::new(MemoryStore::new()),
            Config {
                database_url: "postgres://localhost/unused".to_string(),
                jwt_secret: "job-test-secret".to_string(),
                port: 0,
                negotiation_expiry_days: 7,
                job_interval_secs,
                allowed_origins: vec![],
            },
        )
    }

    #[tokio::test]
    async fn zero_interval_still_yields_a_usable_period() {
        let state = app_state(0);
        assert_eq!(job_period(&state), Duration::from_secs(1));

        // Would panic with a zero period.
        let mut ticker = interval(job_period(&state));
        ticker.tick().await;
    }

    #[test]
    fn configured_interval_is_used() {
        assert_eq!(job_period(&app_state(900)), Duration::from_secs(900));
    }
}
