use crate::domain::model::MembershipRecord;
use once_cell::sync::Lazy;
use regex::Regex;

pub const TAG_ANNUAL: &str = "annual";
pub const TAG_MONTHLY: &str = "monthly";
pub const TAG_UPCOMING: &str = "upcoming";
pub const TAG_TODAY: &str = "today";
pub const TAG_RECENT: &str = "recent";
pub const TAG_30_DAYS: &str = "30-days";
pub const TAG_90_DAYS: &str = "90-days";
pub const TAG_OLD: &str = "old";
pub const LOCATION_PREFIX: &str = "location:";

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// The single recency bucket for a days-lapsed value.
pub fn lapse_bucket(days: i64) -> &'static str {
    match days {
        d if d < 0 => TAG_UPCOMING,
        0 => TAG_TODAY,
        1..=7 => TAG_RECENT,
        8..=30 => TAG_30_DAYS,
        31..=90 => TAG_90_DAYS,
        _ => TAG_OLD,
    }
}

pub fn location_tag(home_location: &str) -> String {
    format!(
        "{}{}",
        LOCATION_PREFIX,
        WHITESPACE.replace_all(&home_location.to_lowercase(), "-")
    )
}

pub fn tag(record: &MembershipRecord) -> Vec<String> {
    let mut tags = Vec::with_capacity(3);

    let name = record.membership_name.to_lowercase();
    if name.contains(TAG_ANNUAL) {
        tags.push(TAG_ANNUAL.to_string());
    } else if name.contains(TAG_MONTHLY) {
        tags.push(TAG_MONTHLY.to_string());
    }

    if let Some(days) = record.days_lapsed {
        tags.push(lapse_bucket(days).to_string());
    }

    if !record.home_location.is_empty() {
        tags.push(location_tag(&record.home_location));
    }

    tags
}

pub fn apply_tags(records: Vec<MembershipRecord>) -> Vec<MembershipRecord> {
    records
        .into_iter()
        .map(|mut record| {
            record.tags = tag(&record);
            record
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, days: Option<i64>, location: &str) -> MembershipRecord {
        let mut record = MembershipRecord::new("Jane", "jane@x.com", name);
        record.days_lapsed = days;
        record.home_location = location.to_string();
        record
    }

    #[test]
    fn test_tags_in_rule_order() {
        let tags = tag(&record("Studio Annual Unlimited", Some(-3), "Kemps Corner"));
        assert_eq!(tags, vec!["annual", "upcoming", "location:kemps-corner"]);
    }

    #[test]
    fn test_annual_beats_monthly() {
        let tags = tag(&record("Annual or Monthly", None, ""));
        assert_eq!(tags, vec!["annual"]);
        let tags = tag(&record("Monthly Flex", None, ""));
        assert_eq!(tags, vec!["monthly"]);
    }

    #[test]
    fn test_lapse_buckets_are_exclusive() {
        let cases = [
            (-1, TAG_UPCOMING),
            (0, TAG_TODAY),
            (1, TAG_RECENT),
            (7, TAG_RECENT),
            (8, TAG_30_DAYS),
            (15, TAG_30_DAYS),
            (30, TAG_30_DAYS),
            (31, TAG_90_DAYS),
            (90, TAG_90_DAYS),
            (91, TAG_OLD),
        ];
        for (days, expected) in cases {
            let tags = tag(&record("Session", Some(days), ""));
            assert_eq!(tags, vec![expected.to_string()], "days {days}");
        }
    }

    #[test]
    fn test_no_days_lapsed_means_no_recency_tag() {
        let tags = tag(&record("Session", None, "N/A"));
        assert_eq!(tags, vec!["location:n/a"]);
    }

    #[test]
    fn test_location_whitespace_collapses_to_hyphen() {
        assert_eq!(location_tag("Supreme  HQ\tBandra"), "location:supreme-hq-bandra");
    }
}
