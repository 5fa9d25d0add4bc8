//! Quiet-hours evaluation, in the user's own timezone.
//!
//! A window is (start minute, end minute) of the local day and may wrap
//! midnight (22:00 → 07:00). Alerts created inside the window are deferred
//! by exactly the time remaining, never dropped.

use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;
use store::User;
use tracing::warn;

fn local_minute(now: DateTime<Utc>, tz: &str) -> Option<u32> {
    let tz: Tz = match tz.parse() {
        Ok(tz) => tz,
        Err(_) => {
            warn!(timezone = tz, "unparseable user timezone; quiet hours skipped");
            return None;
        }
    };
    let local = now.with_timezone(&tz);
    Some(local.hour() * 60 + local.minute())
}

fn window(user: &User) -> Option<(u32, u32)> {
    match (user.quiet_start_min, user.quiet_end_min) {
        (Some(s), Some(e)) if s != e => Some((s as u32 % 1440, e as u32 % 1440)),
        _ => None,
    }
}

fn minute_in_window(minute: u32, start: u32, end: u32) -> bool {
    if start < end {
        (start..end).contains(&minute)
    } else {
        // Wraps midnight.
        minute >= start || minute < end
    }
}

pub fn in_quiet_hours(user: &User, now: DateTime<Utc>) -> bool {
    let Some((start, end)) = window(user) else {
        return false;
    };
    let Some(minute) = local_minute(now, &user.timezone) else {
        return false;
    };
    minute_in_window(minute, start, end)
}

/// Milliseconds until the quiet window ends, or 0 when outside it. Second
/// precision is deliberate: the property contract allows ±1 s.
pub fn delay_until_end_ms(user: &User, now: DateTime<Utc>) -> i64 {
    let Some((start, end)) = window(user) else {
        return 0;
    };
    let Some(minute) = local_minute(now, &user.timezone) else {
        return 0;
    };
    if !minute_in_window(minute, start, end) {
        return 0;
    }

    let minute = minute as i64;
    let end = end as i64;
    let second_of_minute = now.second() as i64;

    let minutes_left = if minute < end {
        end - minute
    } else {
        // Window wraps; end is tomorrow.
        1440 - minute + end
    };

    (minutes_left * 60 - second_of_minute) * 1000
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use model::Country;

    use super::*;

    fn user(tz: &str, start: Option<i32>, end: Option<i32>) -> User {
        User {
            user_id: "u".into(),
            country: Country::De,
            timezone: tz.into(),
            telegram_chat_id: None,
            quiet_start_min: start,
            quiet_end_min: end,
            digest_enabled: false,
            scan_priority: 0,
            created_ms: 0,
        }
    }

    #[test]
    fn no_window_means_never_quiet() {
        let u = user("Europe/Berlin", None, None);
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 23, 0, 0).unwrap();
        assert!(!in_quiet_hours(&u, now));
        assert_eq!(delay_until_end_ms(&u, now), 0);
    }

    #[test]
    fn wrap_around_window_covers_night() {
        // 22:00–07:00 local. 23:00 UTC on Jan 15 is 00:00 Berlin (CET+1).
        let u = user("Europe/Berlin", Some(22 * 60), Some(7 * 60));
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 23, 0, 0).unwrap();
        assert!(in_quiet_hours(&u, now));

        // 7 hours until 07:00 local.
        assert_eq!(delay_until_end_ms(&u, now), 7 * 3600 * 1000);

        let midday = Utc.with_ymd_and_hms(2024, 1, 15, 11, 0, 0).unwrap();
        assert!(!in_quiet_hours(&u, midday));
    }

    #[test]
    fn timezone_matters() {
        // 02:00 UTC is quiet in Berlin (03:00) but daytime in New York (21:00 prev day)?
        // Use a window of 02:00–04:00 local.
        let berlin = user("Europe/Berlin", Some(2 * 60), Some(4 * 60));
        let ny = user("America/New_York", Some(2 * 60), Some(4 * 60));
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 1, 0, 0).unwrap();

        // Berlin is UTC+2 in June: local 03:00, inside.
        assert!(in_quiet_hours(&berlin, now));
        // New York is UTC-4: local 21:00, outside.
        assert!(!in_quiet_hours(&ny, now));
    }

    #[test]
    fn delay_accounts_for_seconds() {
        let u = user("Europe/Berlin", Some(0), Some(7 * 60));
        // 05:30:30 Berlin (04:30:30 UTC in winter).
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 4, 30, 30).unwrap();
        assert!(in_quiet_hours(&u, now));
        let delay = delay_until_end_ms(&u, now);
        // 89.5 minutes to 07:00.
        assert_eq!(delay, (90 * 60 - 30) * 1000);
    }
}
