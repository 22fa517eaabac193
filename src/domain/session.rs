//! Trading Sessions
//!
//! Maps UTC timestamps into the exchange's local trading calendar: the
//! coarse session (overnight / European / regular hours) and the intraday
//! time-of-day bucket used by the adaptive threshold calculator.
//!
//! The exchange offset is configured, not baked in, so the engine works
//! across DST changes by reloading config rather than guessing.

use chrono::{DateTime, FixedOffset, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Coarse trading session, by exchange-local wall clock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradingSession {
    /// Globex overnight (low participation)
    Overnight,
    /// European morning overlap
    European,
    /// Regular trading hours
    Regular,
}

/// Intraday bucket within regular hours
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeOfDay {
    /// First hour after the open
    OpeningHour,
    /// Late morning
    Morning,
    /// Lunch chop
    Midday,
    /// Early afternoon
    Afternoon,
    /// Last hour before the close
    PowerHour,
    /// Outside regular hours
    Closed,
}

/// Exchange calendar configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Exchange-local offset from UTC in hours (e.g. -5 for CME/ET in winter)
    pub utc_offset_hours: i32,
    /// Regular session open, exchange-local (e.g. 09:30)
    pub session_open: NaiveTime,
    /// Regular session close, exchange-local (e.g. 16:00)
    pub session_close: NaiveTime,
    /// European session start, exchange-local (e.g. 02:00)
    pub european_open: NaiveTime,
    /// Opening-range formation window in minutes after the open
    pub opening_range_minutes: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            utc_offset_hours: -5,
            session_open: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            session_close: NaiveTime::from_hms_opt(16, 0, 0).unwrap(),
            european_open: NaiveTime::from_hms_opt(2, 0, 0).unwrap(),
            opening_range_minutes: 15,
        }
    }
}

impl SessionConfig {
    fn offset(&self) -> FixedOffset {
        // Offset is validated at config load to be within +/-14h
        FixedOffset::east_opt(self.utc_offset_hours * 3600)
            .unwrap_or_else(|| FixedOffset::east_opt(0).unwrap())
    }

    /// Exchange-local wall-clock time for a UTC timestamp
    pub fn local_time(&self, time: DateTime<Utc>) -> NaiveTime {
        time.with_timezone(&self.offset()).time()
    }

    /// Classify the coarse session for a timestamp
    pub fn session(&self, time: DateTime<Utc>) -> TradingSession {
        let local = self.local_time(time);
        if local >= self.session_open && local < self.session_close {
            TradingSession::Regular
        } else if local >= self.european_open && local < self.session_open {
            TradingSession::European
        } else {
            TradingSession::Overnight
        }
    }

    /// Classify the intraday bucket for a timestamp
    pub fn time_of_day(&self, time: DateTime<Utc>) -> TimeOfDay {
        let local = self.local_time(time);
        if local < self.session_open || local >= self.session_close {
            return TimeOfDay::Closed;
        }
        let minutes_in = minutes_between(self.session_open, local);
        let minutes_total = minutes_between(self.session_open, self.session_close);
        if minutes_in < 60 {
            TimeOfDay::OpeningHour
        } else if minutes_total.saturating_sub(minutes_in) <= 60 {
            TimeOfDay::PowerHour
        } else if minutes_in < 120 {
            TimeOfDay::Morning
        } else if minutes_in < 270 {
            TimeOfDay::Midday
        } else {
            TimeOfDay::Afternoon
        }
    }

    /// True while the opening range is still forming
    pub fn in_opening_range_formation(&self, time: DateTime<Utc>) -> bool {
        let local = self.local_time(time);
        if local < self.session_open {
            return false;
        }
        minutes_between(self.session_open, local) < self.opening_range_minutes
    }

    /// True if the timestamp falls on the same exchange-local calendar day
    /// within the regular session.
    pub fn is_regular_hours(&self, time: DateTime<Utc>) -> bool {
        self.session(time) == TradingSession::Regular
    }

    /// End of the opening-range formation window, exchange-local
    pub fn opening_range_end(&self) -> NaiveTime {
        self.session_open + chrono::Duration::minutes(self.opening_range_minutes as i64)
    }
}

fn minutes_between(start: NaiveTime, end: NaiveTime) -> u32 {
    let s = start.num_seconds_from_midnight();
    let e = end.num_seconds_from_midnight();
    e.saturating_sub(s) / 60
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn cfg() -> SessionConfig {
        SessionConfig::default()
    }

    fn at_local(hour: u32, minute: u32) -> DateTime<Utc> {
        // Config offset is -5, so local 09:30 == 14:30 UTC
        Utc.with_ymd_and_hms(2025, 3, 10, hour + 5, minute, 0).unwrap()
    }

    #[test]
    fn test_regular_session() {
        assert_eq!(cfg().session(at_local(10, 0)), TradingSession::Regular);
        assert_eq!(cfg().session(at_local(15, 59)), TradingSession::Regular);
    }

    #[test]
    fn test_overnight_session() {
        let t = Utc.with_ymd_and_hms(2025, 3, 10, 3, 0, 0).unwrap(); // 22:00 local
        assert_eq!(cfg().session(t), TradingSession::Overnight);
    }

    #[test]
    fn test_european_session() {
        let t = Utc.with_ymd_and_hms(2025, 3, 10, 8, 0, 0).unwrap(); // 03:00 local
        assert_eq!(cfg().session(t), TradingSession::European);
    }

    #[test]
    fn test_time_of_day_buckets() {
        assert_eq!(cfg().time_of_day(at_local(9, 45)), TimeOfDay::OpeningHour);
        assert_eq!(cfg().time_of_day(at_local(10, 45)), TimeOfDay::Morning);
        assert_eq!(cfg().time_of_day(at_local(12, 30)), TimeOfDay::Midday);
        assert_eq!(cfg().time_of_day(at_local(14, 30)), TimeOfDay::Afternoon);
        assert_eq!(cfg().time_of_day(at_local(15, 30)), TimeOfDay::PowerHour);
        assert_eq!(cfg().time_of_day(at_local(18, 0)), TimeOfDay::Closed);
    }

    #[test]
    fn test_opening_range_formation() {
        assert!(cfg().in_opening_range_formation(at_local(9, 40)));
        assert!(!cfg().in_opening_range_formation(at_local(9, 46)));
        assert!(!cfg().in_opening_range_formation(at_local(8, 0)));
    }
}
