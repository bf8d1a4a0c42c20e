//! Ban durations and lapse checks

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Longest temporary ban accepted, about a century
pub const MAX_BAN_DAYS: i64 = 36_500;

/// How long a ban lasts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BanDuration {
    Days(i64),
    Permanent,
}

impl BanDuration {
    /// Parse `"N days"` or `"permanent"`.
    ///
    /// Only the leading integer of a temporary duration is read, so `"7"`
    /// and `"7 days"` are the same ban. Day counts above [`MAX_BAN_DAYS`]
    /// are rejected.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("permanent") {
            return Some(BanDuration::Permanent);
        }

        let digits: String = raw.chars().take_while(|c| c.is_ascii_digit()).collect();
        digits
            .parse::<i64>()
            .ok()
            .filter(|days| *days <= MAX_BAN_DAYS)
            .map(BanDuration::Days)
    }

    pub fn is_permanent(&self) -> bool {
        matches!(self, BanDuration::Permanent)
    }

    /// When a ban starting at `start` ends; `None` for permanent bans and
    /// for expiries past the representable calendar
    pub fn expires_at(&self, start: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            BanDuration::Days(days) => TimeDelta::try_days(*days)
                .and_then(|delta| start.checked_add_signed(delta)),
            BanDuration::Permanent => None,
        }
    }
}

impl fmt::Display for BanDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BanDuration::Days(days) => write!(f, "{} days", days),
            BanDuration::Permanent => f.write_str("permanent"),
        }
    }
}

/// True when a temporary ban created at `created_at` has run out.
///
/// Permanent bans, missing durations and durations that do not parse never lapse.
pub fn is_lapsed(ban_duration: Option<&str>, created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    match ban_duration.and_then(BanDuration::parse) {
        Some(duration) => duration
            .expires_at(created_at)
            .is_some_and(|expiry| now > expiry),
        None => false,
    }
}

/// Result of a ban lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BanStatus {
    pub is_banned: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banned_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ban_duration: Option<String>,
}

impl BanStatus {
    pub fn not_banned() -> Self {
        Self {
            is_banned: false,
            reason: None,
            banned_by: None,
            ban_duration: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_durations() {
        assert_eq!(BanDuration::parse("30 days"), Some(BanDuration::Days(30)));
        assert_eq!(BanDuration::parse("7"), Some(BanDuration::Days(7)));
        assert_eq!(BanDuration::parse("permanent"), Some(BanDuration::Permanent));
        assert_eq!(BanDuration::parse("forever"), None);
        assert_eq!(BanDuration::parse(""), None);
    }

    #[test]
    fn test_parse_rejects_oversized_day_counts() {
        assert_eq!(
            BanDuration::parse("36500 days"),
            Some(BanDuration::Days(MAX_BAN_DAYS))
        );
        assert_eq!(BanDuration::parse("36501 days"), None);
        assert_eq!(BanDuration::parse("999999999999999999 days"), None);
        assert_eq!(BanDuration::parse("99999999999999999999999"), None);
    }

    #[test]
    fn test_huge_stored_duration_does_not_panic() {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();

        assert_eq!(BanDuration::Days(i64::MAX).expires_at(created), None);
        assert_eq!(BanDuration::Days(200_000_000).expires_at(created), None);
        assert!(!is_lapsed(Some("999999999999999999 days"), created, now));
    }

    #[test]
    fn test_display_round_trips_format() {
        assert_eq!(BanDuration::Days(30).to_string(), "30 days");
        assert_eq!(BanDuration::Permanent.to_string(), "permanent");
    }

    #[test]
    fn test_temporary_ban_lapses() {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let during = created + TimeDelta::days(6);
        let after = created + TimeDelta::days(8);

        assert!(!is_lapsed(Some("7 days"), created, during));
        assert!(is_lapsed(Some("7 days"), created, after));
    }

    #[test]
    fn test_permanent_and_unknown_never_lapse() {
        let created = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();

        assert!(!is_lapsed(Some("permanent"), created, now));
        assert!(!is_lapsed(None, created, now));
        assert!(!is_lapsed(Some("a while"), created, now));
    }
}
