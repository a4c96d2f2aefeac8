//! Once-a-day digest gate, evaluated on a fixed UTC+5:30 clock

use chrono::{DateTime, FixedOffset, NaiveDate, Timelike, Utc};

const LOCAL_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

/// Decides whether the daily digest should fire this cycle.
///
/// Fires at most once per local calendar day, during the configured
/// hour. A process that polls at least hourly hits the window every
/// day; coarser polling can miss a day entirely, which is accepted.
#[derive(Debug, Clone, Copy)]
pub struct DigestScheduler {
    hour: u32,
    offset: FixedOffset,
}

impl DigestScheduler {
    pub fn new(hour: u32) -> Self {
        let offset = FixedOffset::east_opt(LOCAL_OFFSET_SECS).expect("static offset is in range");
        Self {
            hour: hour.min(23),
            offset,
        }
    }

    /// Returns the local date to persist when the digest is due, None
    /// otherwise.
    pub fn due(&self, now: DateTime<Utc>, last_fired: Option<NaiveDate>) -> Option<NaiveDate> {
        let local = now.with_timezone(&self.offset);
        if local.hour() != self.hour {
            return None;
        }

        let today = local.date_naive();
        if last_fired == Some(today) {
            return None;
        }

        Some(today)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).single().unwrap()
    }

    #[test]
    fn fires_once_within_the_trigger_hour() {
        let scheduler = DigestScheduler::new(21);

        // 15:35 UTC is 21:05 local
        let first = scheduler.due(utc(2026, 8, 7, 15, 35), None);
        let today = NaiveDate::from_ymd_opt(2026, 8, 7).unwrap();
        assert_eq!(first, Some(today));

        // Second cycle in the same hour, after the date was persisted
        let second = scheduler.due(utc(2026, 8, 7, 16, 10), first);
        assert_eq!(second, None);
    }

    #[test]
    fn does_not_fire_outside_the_trigger_hour() {
        let scheduler = DigestScheduler::new(21);
        // 14:35 UTC is 20:05 local
        assert_eq!(scheduler.due(utc(2026, 8, 7, 14, 35), None), None);
    }

    #[test]
    fn fires_again_on_the_next_local_day() {
        let scheduler = DigestScheduler::new(21);
        let yesterday = NaiveDate::from_ymd_opt(2026, 8, 6).unwrap();
        let fired = scheduler.due(utc(2026, 8, 7, 15, 40), Some(yesterday));
        assert_eq!(fired, Some(NaiveDate::from_ymd_opt(2026, 8, 7).unwrap()));
    }

    #[test]
    fn local_offset_shifts_the_calendar_day() {
        let scheduler = DigestScheduler::new(0);
        // 19:00 UTC on the 7th is 00:30 local on the 8th
        let fired = scheduler.due(utc(2026, 8, 7, 19, 0), None);
        assert_eq!(fired, Some(NaiveDate::from_ymd_opt(2026, 8, 8).unwrap()));
    }
}
