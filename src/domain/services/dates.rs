use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

static DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y, %I:%M:%S %p",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
];

static DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%b %d, %Y", "%B %d, %Y", "%d %b %Y"];

/// Parses the date strings found in membership exports and filter bounds.
///
/// Offsets are dropped after parsing: the wall clock written in the string is
/// what counts, so `2024-03-01T23:00:00-05:00` stays on March 1st.
pub fn parse_date(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_local());
    }

    for fmt in DATE_TIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(dt);
        }
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Some(date.and_time(NaiveTime::MIN));
        }
    }

    None
}

pub fn parse_calendar_date(value: &str) -> Option<NaiveDate> {
    parse_date(value).map(|dt| dt.date())
}

/// Expiry instant with an explicit "unknown" sentinel.
///
/// `Unknown` orders before every real instant, so a missing or unreadable
/// date always loses a "latest wins" comparison and sorts first ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Expiry {
    Unknown,
    At(NaiveDateTime),
}

impl Expiry {
    pub fn from_field(value: Option<&str>) -> Self {
        value.and_then(parse_date).map_or(Expiry::Unknown, Expiry::At)
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Expiry::At(_))
    }
}

/// Whole days from the expiry date to `today`; positive once expired.
pub fn days_lapsed(expires_at: &str, today: NaiveDate) -> Option<i64> {
    parse_calendar_date(expires_at).map(|date| (today - date).num_days())
}

pub fn describe_days_lapsed(days: Option<i64>) -> String {
    match days {
        None => "Unknown".to_string(),
        Some(0) => "Today".to_string(),
        Some(d) if d < 0 => format!("In {} days", d.abs()),
        Some(1) => "Yesterday".to_string(),
        Some(d) => format!("{} days ago", d),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_supported_formats() {
        let expected = ymd(2024, 3, 1);
        for input in [
            "2024-03-01",
            "2024-03-01 10:15:00",
            "2024-03-01T10:15:00",
            "2024-03-01T10:15:00.000Z",
            "2024-03-01T23:30:00-05:00",
            "03/01/2024",
            "3/1/2024",
            "3/1/2024 10:15",
            "Mar 1, 2024",
            "March 1, 2024",
        ] {
            assert_eq!(parse_calendar_date(input), Some(expected), "input {input}");
        }
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("   "), None);
        assert_eq!(parse_date("not a date"), None);
        assert_eq!(parse_date("2024-13-45"), None);
    }

    #[test]
    fn test_days_lapsed_sign_and_midnight_normalization() {
        let today = ymd(2024, 6, 10);
        assert_eq!(days_lapsed("2024-06-01 23:59:59", today), Some(9));
        assert_eq!(days_lapsed("2024-06-10T18:00:00", today), Some(0));
        assert_eq!(days_lapsed("2024-06-20", today), Some(-10));
        assert_eq!(days_lapsed("soon", today), None);
    }

    #[test]
    fn test_expiry_sentinel_orders_first() {
        let known = Expiry::from_field(Some("2020-01-01"));
        assert!(Expiry::Unknown < known);
        assert_eq!(Expiry::from_field(Some("garbage")), Expiry::Unknown);
        assert_eq!(Expiry::from_field(None), Expiry::Unknown);
        assert!(known.is_known());
    }

    #[test]
    fn test_describe_days_lapsed() {
        assert_eq!(describe_days_lapsed(None), "Unknown");
        assert_eq!(describe_days_lapsed(Some(0)), "Today");
        assert_eq!(describe_days_lapsed(Some(-4)), "In 4 days");
        assert_eq!(describe_days_lapsed(Some(1)), "Yesterday");
        assert_eq!(describe_days_lapsed(Some(12)), "12 days ago");
    }
}
