//! Clock-aligned job loops.
//!
//! Each job runs in its own spawned task: sleep until the next scheduled
//! UTC occurrence, run, log failures, repeat. A failing run never kills
//! the loop.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Datelike, TimeZone, Utc, Weekday};
use tracing::{error, info};

/// Duration until the next `hh:mm` UTC, strictly in the future.
pub fn until_next_daily(now: DateTime<Utc>, hour: u32, minute: u32) -> Duration {
    let today = Utc
        .with_ymd_and_hms(now.year(), now.month(), now.day(), hour, minute, 0)
        .unwrap();
    let next = if today > now {
        today
    } else {
        today + chrono::Duration::days(1)
    };
    (next - now).to_std().unwrap_or(Duration::ZERO)
}

/// Duration until the next `weekday hh:mm` UTC, strictly in the future.
pub fn until_next_weekly(
    now: DateTime<Utc>,
    weekday: Weekday,
    hour: u32,
    minute: u32,
) -> Duration {
    let days_ahead = (7 + weekday.num_days_from_monday() as i64
        - now.weekday().num_days_from_monday() as i64)
        % 7;
    let candidate = Utc
        .with_ymd_and_hms(now.year(), now.month(), now.day(), hour, minute, 0)
        .unwrap()
        + chrono::Duration::days(days_ahead);
    let next = if candidate > now {
        candidate
    } else {
        candidate + chrono::Duration::days(7)
    };
    (next - now).to_std().unwrap_or(Duration::ZERO)
}

pub fn spawn_daily<F, Fut>(label: &'static str, hour: u32, minute: u32, job: F)
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send,
{
    tokio::spawn(async move {
        loop {
            let wait = until_next_daily(Utc::now(), hour, minute);
            info!(job = label, wait_secs = wait.as_secs(), "job sleeping until next run");
            tokio::time::sleep(wait).await;

            if let Err(e) = job().await {
                error!(job = label, error = ?e, "scheduled job failed");
            }
        }
    });
}

pub fn spawn_weekly<F, Fut>(label: &'static str, weekday: Weekday, hour: u32, job: F)
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send,
{
    tokio::spawn(async move {
        loop {
            let wait = until_next_weekly(Utc::now(), weekday, hour, 0);
            info!(job = label, wait_secs = wait.as_secs(), "job sleeping until next run");
            tokio::time::sleep(wait).await;

            if let Err(e) = job().await {
                error!(job = label, error = ?e, "scheduled job failed");
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn daily_rolls_to_tomorrow_when_past() {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
        // 00:05 already passed today.
        let wait = until_next_daily(now, 0, 5);
        assert_eq!(wait, Duration::from_secs((14 * 60 + 5) * 60));

        // 23:00 is still ahead.
        let wait = until_next_daily(now, 23, 0);
        assert_eq!(wait, Duration::from_secs(13 * 3600));
    }

    #[test]
    fn weekly_hits_the_right_weekday() {
        // 2024-01-15 is a Monday.
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();

        // Monday 09:00 already passed: next week.
        let wait = until_next_weekly(now, Weekday::Mon, 9, 0);
        assert_eq!(wait, Duration::from_secs(7 * 86_400 - 3_600));

        // Wednesday is two days out.
        let wait = until_next_weekly(now, Weekday::Wed, 10, 0);
        assert_eq!(wait, Duration::from_secs(2 * 86_400));
    }
}
