use crate::domain::model::{MembershipRecord, RawRow, SourceType};
use crate::domain::services::{classifier, dates};
use chrono::NaiveDate;

pub const CUSTOMER_NAME: &str = "Customer name";
pub const CUSTOMER_EMAIL: &str = "Customer email";
pub const MEMBERSHIP_NAME: &str = "Membership name";
pub const HOME_LOCATION: &str = "Home location";
pub const EXPIRES_AT: &str = "Expires at";
pub const FROZEN_AT: &str = "Frozen at";
pub const UNFROZEN_AT: &str = "Unfrozen at";
pub const BOUGHT_AT: &str = "Bought at";

pub const DEFAULT_HOME_LOCATION: &str = "N/A";

const MEMBER_ID_COLUMNS: &[&str] = &["Member ID", "Customer ID", "Member id", "Customer id"];
const CATEGORY_COLUMNS: &[&str] = &["Category", "Item type", "Type"];

/// Maps raw report rows onto `MembershipRecord`s.
///
/// Rows that cannot be identified (no member id and no email) are dropped
/// here so they never reach the dedup stage.
pub fn standardize(rows: &[RawRow], source: SourceType, today: NaiveDate) -> Vec<MembershipRecord> {
    let records: Vec<MembershipRecord> = rows
        .iter()
        .filter_map(|row| standardize_row(row, source, today))
        .collect();

    let skipped = rows.len() - records.len();
    if skipped > 0 {
        tracing::warn!(
            "Skipped {} unidentifiable {} rows (no member id or email)",
            skipped,
            source
        );
    }
    records
}

pub fn standardize_row(row: &RawRow, source: SourceType, today: NaiveDate) -> Option<MembershipRecord> {
    // 到期報表的表頭名稱不可靠，改用欄位位置
    let (customer_name, customer_email) = match source {
        SourceType::Expirations => (row.value_at(0), row.value_at(1)),
        SourceType::Frozen | SourceType::NotActivated => {
            (row.get(CUSTOMER_NAME), row.get(CUSTOMER_EMAIL))
        }
    };

    let raw_name = row.get(MEMBERSHIP_NAME).unwrap_or_default();
    let category = row.get_any(CATEGORY_COLUMNS).map(str::to_lowercase);
    let member_id = row.get_any(MEMBER_ID_COLUMNS).or(customer_email);

    let membership_name = classifier::classify(raw_name, category.as_deref(), member_id);
    if membership_name.is_empty() {
        return None;
    }
    // dedup keys on email, a row without one cannot take part
    let customer_email = customer_email?;

    let mut record = MembershipRecord::new(
        customer_name.unwrap_or_default(),
        customer_email,
        membership_name,
    );
    record.raw_membership_name = raw_name.to_string();
    record.home_location = row
        .get(HOME_LOCATION)
        .unwrap_or(DEFAULT_HOME_LOCATION)
        .to_string();

    match source {
        SourceType::Expirations => {
            record.expires_at = row.get(EXPIRES_AT).map(str::to_string);
            record.days_lapsed = record
                .expires_at
                .as_deref()
                .and_then(|expires| dates::days_lapsed(expires, today));
        }
        SourceType::Frozen => {
            record.frozen_at = row.get(FROZEN_AT).map(str::to_string);
            record.unfrozen_at = row.get(UNFROZEN_AT).map(str::to_string);
        }
        SourceType::NotActivated => {
            record.bought_at = row.get(BOUGHT_AT).map(str::to_string);
        }
    }

    Some(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 11).unwrap()
    }

    #[test]
    fn test_expirations_use_positional_identity_columns() {
        let row = RawRow::from_pairs([
            ("Customer", "Alice Smith"),
            ("E-mail address", "Alice@X.com"),
            ("Membership name", "Studio 3 Class Package"),
            ("Home location", "Downtown"),
            ("Expires at", "2024-03-01"),
        ]);

        let records = standardize(&[row], SourceType::Expirations, today());
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.customer_name, "Alice Smith");
        assert_eq!(record.customer_email, "Alice@X.com");
        assert_eq!(record.membership_name, "Studio 3 Class Package");
        assert_eq!(record.raw_membership_name, "Studio 3 Class Package");
        assert_eq!(record.home_location, "Downtown");
        assert_eq!(record.expires_at.as_deref(), Some("2024-03-01"));
        assert_eq!(record.days_lapsed, Some(10));
        assert!(record.frozen_at.is_none());
    }

    #[test]
    fn test_frozen_and_not_activated_use_named_columns() {
        let frozen = RawRow::from_pairs([
            ("Membership name", "Barre 57 Studio"),
            ("Customer name", "Bob"),
            ("Customer email", "bob@y.com"),
            ("Frozen at", "2024-01-05"),
            ("Unfrozen at", "2024-02-05"),
        ]);
        let records = standardize(&[frozen], SourceType::Frozen, today());
        assert_eq!(records[0].customer_email, "bob@y.com");
        assert_eq!(records[0].frozen_at.as_deref(), Some("2024-01-05"));
        assert_eq!(records[0].unfrozen_at.as_deref(), Some("2024-02-05"));
        assert_eq!(records[0].home_location, DEFAULT_HOME_LOCATION);
        assert!(records[0].expires_at.is_none());
        assert!(records[0].days_lapsed.is_none());

        let pending = RawRow::from_pairs([
            ("Customer name", "Cara"),
            ("Customer email", "cara@z.com"),
            ("Membership name", "Gift"),
            ("Bought at", "2024-02-29"),
        ]);
        let records = standardize(&[pending], SourceType::NotActivated, today());
        assert_eq!(records[0].bought_at.as_deref(), Some("2024-02-29"));
        assert_eq!(records[0].membership_name, classifier::OTHERS);
    }

    #[test]
    fn test_rows_without_identity_are_dropped() {
        let rows = vec![
            RawRow::from_pairs([("Customer name", "Nobody"), ("Membership name", "Studio Sweat")]),
            RawRow::from_pairs([
                ("Customer name", "Has Id"),
                ("Member ID", "42"),
                ("Membership name", "Studio Sweat"),
            ]),
        ];
        // the second row has an id but no email, dedup cannot key it
        assert!(standardize(&rows, SourceType::Frozen, today()).is_empty());
    }

    #[test]
    fn test_unparseable_expiry_has_no_days_lapsed() {
        let row = RawRow::from_pairs([
            ("Name", "Dee"),
            ("Email", "dee@x.com"),
            ("Membership name", "Private"),
            ("Expires at", "someday"),
        ]);
        let records = standardize(&[row], SourceType::Expirations, today());
        assert_eq!(records[0].expires_at.as_deref(), Some("someday"));
        assert_eq!(records[0].days_lapsed, None);
    }

    #[test]
    fn test_category_hint_is_case_insensitive() {
        let row = RawRow::from_pairs([
            ("Name", "Eve"),
            ("Email", "eve@x.com"),
            ("Membership name", "Studio Socks"),
            ("Category", "Product"),
        ]);
        let records = standardize(&[row], SourceType::Expirations, today());
        assert_eq!(records[0].membership_name, classifier::RETAIL);
    }
}
