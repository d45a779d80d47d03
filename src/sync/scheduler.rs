//! Fixed-time daily scheduler. Syncs fire at 06:00, 12:00 and 18:00 local
//! time; between ticks the task sleeps until the next boundary or a
//! shutdown signal arrives.

use crate::providers::StockProvider;
use crate::store::stock::StockCacheRepo;
use crate::sync::engine::{SyncEngine, SyncOutcome};
use chrono::{Local, NaiveDateTime, NaiveTime, TimeDelta};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time::{sleep_until, Instant};
use tracing::{error, info};

pub const SYNC_HOURS: [u32; 3] = [6, 12, 18];

/// Next scheduled boundary strictly after `now`. Exactly-on-a-boundary input
/// rolls to the following slot so a tick never fires twice.
fn next_tick(now: NaiveDateTime) -> NaiveDateTime {
    for hour in SYNC_HOURS {
        let candidate = now
            .date()
            .and_time(NaiveTime::from_hms_opt(hour, 0, 0).expect("valid sync hour"));
        if candidate > now {
            return candidate;
        }
    }
    let first = NaiveTime::from_hms_opt(SYNC_HOURS[0], 0, 0).expect("valid sync hour");
    (now.date() + TimeDelta::days(1)).and_time(first)
}

fn sleep_duration_until_next_tick() -> (std::time::Duration, NaiveDateTime) {
    let now = Local::now().naive_local();
    let tick = next_tick(now);
    let wait = (tick - now).to_std().unwrap_or_default();
    (wait, tick)
}

/// Runs the engine at every scheduled boundary until shutdown is signalled.
pub async fn run<P, R>(engine: Arc<SyncEngine<P, R>>, mut shutdown: broadcast::Receiver<()>)
where
    P: StockProvider + 'static,
    R: StockCacheRepo + 'static,
{
    info!(hours = ?SYNC_HOURS, "stock sync scheduler started");
    loop {
        let (wait, tick) = sleep_duration_until_next_tick();
        info!(next_tick = %tick, wait_secs = wait.as_secs(), "scheduler sleeping");

        tokio::select! {
            _ = sleep_until(Instant::now() + wait) => {
                info!(tick = %tick, "scheduled sync starting");
                match engine.run_sync().await {
                    SyncOutcome::Success { total_listings } => {
                        info!(total_listings, "scheduled sync completed");
                    }
                    SyncOutcome::Skipped => {
                        info!("scheduled sync skipped, another run in progress");
                    }
                    SyncOutcome::Failed { error } => {
                        error!(%error, "scheduled sync failed");
                    }
                }
            }
            _ = shutdown.recv() => {
                info!("scheduler shutting down");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 15)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn morning_rolls_to_first_slot() {
        assert_eq!(next_tick(at(4, 30)), at(6, 0));
    }

    #[test]
    fn midday_rolls_to_next_slot() {
        assert_eq!(next_tick(at(9, 15)), at(12, 0));
        assert_eq!(next_tick(at(13, 0)), at(18, 0));
    }

    #[test]
    fn exact_boundary_advances() {
        assert_eq!(next_tick(at(6, 0)), at(12, 0));
        assert_eq!(next_tick(at(18, 0)), at(6, 0) + TimeDelta::days(1));
    }

    #[test]
    fn evening_wraps_to_next_day() {
        let tick = next_tick(at(19, 0));
        assert_eq!(
            tick,
            NaiveDate::from_ymd_opt(2025, 6, 16)
                .unwrap()
                .and_hms_opt(6, 0, 0)
                .unwrap()
        );
    }
}
