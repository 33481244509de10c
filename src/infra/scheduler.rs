// src/infra/scheduler.rs — Daily wall-clock trigger for the reminder job

use chrono::{Days, NaiveDateTime, NaiveTime};

/// Parse "HH:MM" (24-hour). Surrounding whitespace is ignored.
pub fn parse_daily_time(s: &str) -> Option<NaiveTime> {
    let (hour, minute) = s.trim().split_once(':')?;
    let hour = hour.trim().parse::<u32>().ok()?;
    let minute = minute.trim().parse::<u32>().ok()?;
    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// Fires once per day at a fixed local time.
///
/// The trigger is polled from a coarse interval, so it fires on the first
/// poll at or after the scheduled instant rather than on an exact minute
/// match. A process that was down across several scheduled times fires once,
/// not once per missed day.
#[derive(Debug, Clone)]
pub struct DailyTrigger {
    time: NaiveTime,
    next: NaiveDateTime,
}

impl DailyTrigger {
    /// A trigger created after today's time has passed first fires tomorrow.
    pub fn new(time: NaiveTime, now: NaiveDateTime) -> Self {
        Self {
            time,
            next: next_after(time, now),
        }
    }

    pub fn next_fire(&self) -> NaiveDateTime {
        self.next
    }

    /// `true` when the scheduled instant has been reached since the last fire.
    pub fn poll(&mut self, now: NaiveDateTime) -> bool {
        if now < self.next {
            return false;
        }
        self.next = next_after(self.time, now);
        true
    }
}

/// The first `time` strictly after `now`.
fn next_after(time: NaiveTime, now: NaiveDateTime) -> NaiveDateTime {
    let today = now.date().and_time(time);
    if today > now {
        today
    } else {
        now.date()
            .checked_add_days(Days::new(1))
            .map_or(NaiveDateTime::MAX, |d| d.and_time(time))
    }
}
