//! Long-running mode: periodic scrapes, optional comment refreshes and the serving API
//!
//! A scrape runs at startup and then every day at `schedule.daily-at` local time. The
//! comment refresher, when enabled, runs every `comment-refresh-minutes`. Both write the
//! same catalog file, so each holds the catalog lock for its whole pass.

use crate::config::{parse_daily_at, Config};
use crate::crawler::{run_comment_refresh, run_scrape};
use crate::transport::{build_transport, Transport, TransportKind};
use crate::LinkError;
use chrono::{Duration as ChronoDuration, Local, NaiveDateTime, NaiveTime};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// First moment strictly after `now` whose wall-clock time is `at`
pub fn next_run_after(now: NaiveDateTime, at: NaiveTime) -> NaiveDateTime {
    let today = now.date().and_time(at);
    if today > now {
        today
    } else {
        today + ChronoDuration::days(1)
    }
}

fn refresh_period(minutes: u64) -> Duration {
    Duration::from_secs(minutes.saturating_mul(60))
}

fn until(next: NaiveDateTime) -> Duration {
    (next - Local::now().naive_local())
        .to_std()
        .unwrap_or(Duration::ZERO)
}

async fn scrape_loop(
    config: Arc<Config>,
    transport: Arc<dyn Transport>,
    at: NaiveTime,
    catalog_lock: Arc<Mutex<()>>,
) {
    loop {
        {
            let _guard = catalog_lock.lock().await;
            if let Err(e) = run_scrape(Arc::clone(&config), Arc::clone(&transport)).await {
                tracing::error!("Scrape failed: {}", e);
            }
        }

        let next = next_run_after(Local::now().naive_local(), at);
        tracing::info!("Next scrape at {}", next);
        tokio::time::sleep(until(next)).await;
    }
}

async fn comment_loop(
    config: Arc<Config>,
    transport: Arc<dyn Transport>,
    period: Duration,
    catalog_lock: Arc<Mutex<()>>,
) {
    let start = tokio::time::Instant::now() + period;
    let mut ticker = tokio::time::interval_at(start, period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let _guard = catalog_lock.lock().await;
        run_comment_refresh(&config, transport.as_ref()).await;
    }
}

/// Runs the scheduler loops and the serving API until the server stops
pub async fn serve(config: Arc<Config>, kind: TransportKind) -> Result<(), LinkError> {
    let at = parse_daily_at(&config.schedule.daily_at)?;
    let transport = build_transport(&config, kind)?;
    let catalog_lock = Arc::new(Mutex::new(()));

    let scraper = tokio::spawn(scrape_loop(
        Arc::clone(&config),
        Arc::clone(&transport),
        at,
        Arc::clone(&catalog_lock),
    ));

    let refresher = match config.schedule.comment_refresh_minutes {
        Some(minutes) => {
            tracing::info!("Refreshing comment numbers every {} minutes", minutes);
            Some(tokio::spawn(comment_loop(
                Arc::clone(&config),
                Arc::clone(&transport),
                refresh_period(minutes),
                Arc::clone(&catalog_lock),
            )))
        }
        None => None,
    };

    let result = crate::server::serve(&config.server, &config.output.catalog_path).await;

    scraper.abort();
    if let Some(refresher) = refresher {
        refresher.abort();
    }
    result
}
