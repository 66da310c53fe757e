use crate::Runner;
use time::{Duration, OffsetDateTime, Time};

/// Compute the next fire time: the top of the next sixth hour (00:00,
/// 06:00, 12:00, 18:00 UTC), or the top of the next minute in debug
/// mode.
fn next_fire(now: OffsetDateTime, debug: bool) -> OffsetDateTime {
    if debug {
        let next = now + Duration::minutes(1);
        return next.replace_time(
            Time::from_hms(next.hour(), next.minute(), 0).unwrap_or(Time::MIDNIGHT),
        );
    }

    let hour = (now.hour() / 6 + 1) * 6;
    if hour >= 24 {
        (now + Duration::days(1)).replace_time(Time::MIDNIGHT)
    } else {
        now.replace_time(Time::from_hms(hour, 0, 0).unwrap_or(Time::MIDNIGHT))
    }
}

/// Run the update loop forever.
///
/// Connectivity was verified by the caller; this loop only sleeps,
/// updates, and logs. Update cycles never abort the daemon.
pub async fn daemon(runner: Runner, debug: bool) -> anyhow::Result<()> {
    if debug {
        log::info!("daemon started in debug mode, updating every minute");
    } else {
        log::info!("daemon started, updating every 6 hours (00:00, 06:00, 12:00, 18:00)");
    }

    loop {
        let now = OffsetDateTime::now_utc();
        let next = next_fire(now, debug);
        log::info!("next scheduled update: {next}");

        let wait = (next - now).max(Duration::ZERO);
        tokio::time::sleep(wait.try_into().unwrap_or_default()).await;

        let started = OffsetDateTime::now_utc();
        log::info!("starting scheduled knowledge update");
        runner.run_all().await;
        log::info!(
            "scheduled knowledge update completed in {}",
            OffsetDateTime::now_utc() - started
        );
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn fires_at_the_top_of_every_sixth_hour() {
        assert_eq!(
            next_fire(datetime!(2024-06-01 04:15 UTC), false),
            datetime!(2024-06-01 06:00 UTC)
        );
        assert_eq!(
            next_fire(datetime!(2024-06-01 06:00:01 UTC), false),
            datetime!(2024-06-01 12:00 UTC)
        );
        assert_eq!(
            next_fire(datetime!(2024-06-01 23:59 UTC), false),
            datetime!(2024-06-02 00:00 UTC)
        );
    }

    #[test]
    fn debug_mode_fires_every_minute() {
        assert_eq!(
            next_fire(datetime!(2024-06-01 04:15:30 UTC), true),
            datetime!(2024-06-01 04:16 UTC)
        );
    }
}
