use crate::domain::model::{Grouped, MembershipRecord, PeriodGrouping, PeriodKey};
use crate::domain::services::dates;
use chrono::{Datelike, NaiveDate};

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

fn month_name(month: u32) -> &'static str {
    MONTH_NAMES[(month as usize - 1) % 12]
}

/// ISO-8601 week number (weeks belong to the year of their Thursday).
pub fn iso_week_number(date: NaiveDate) -> u32 {
    date.iso_week().week()
}

/// Bucket key for one calendar date.
///
/// Week keys carry the calendar year of the date itself, not the ISO
/// week-year, so 2024-12-30 lands in "W1, 2024".
pub fn period_key(date: NaiveDate, grouping: PeriodGrouping) -> PeriodKey {
    let year = date.year();
    let (ordinal, label) = match grouping {
        PeriodGrouping::Week => {
            let week = iso_week_number(date);
            (week, format!("W{}, {}", week, year))
        }
        PeriodGrouping::Month => (
            date.month(),
            format!("{} {}", month_name(date.month()), year),
        ),
        PeriodGrouping::Quarter => {
            let quarter = date.month0() / 3 + 1;
            (quarter, format!("Q{} {}", quarter, year))
        }
        PeriodGrouping::Year => (0, year.to_string()),
    };
    PeriodKey {
        year,
        ordinal,
        label,
    }
}

/// Month-name key with no year, ordered January to December.
pub fn month_key(date: NaiveDate) -> PeriodKey {
    PeriodKey {
        year: 0,
        ordinal: date.month(),
        label: month_name(date.month()).to_string(),
    }
}

fn group_by_date<F>(records: &[MembershipRecord], key_of: F) -> Grouped<PeriodKey>
where
    F: Fn(NaiveDate) -> PeriodKey,
{
    let mut groups = Grouped::new();
    for record in records {
        let Some(date) = record
            .expires_at
            .as_deref()
            .and_then(dates::parse_calendar_date)
        else {
            continue;
        };
        groups.entry(key_of(date)).or_default().push(record.clone());
    }
    groups
}

/// Buckets records by expiry period; records without a readable expiry are left out.
pub fn group_by_period(records: &[MembershipRecord], grouping: PeriodGrouping) -> Grouped<PeriodKey> {
    group_by_date(records, |date| period_key(date, grouping))
}

pub fn group_by_month_name(records: &[MembershipRecord]) -> Grouped<PeriodKey> {
    group_by_date(records, month_key)
}
