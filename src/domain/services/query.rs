use crate::domain::model::{FilterOptions, MembershipRecord, SortDirection, SortField, SortSpec};
use crate::domain::services::dates::{self, Expiry};
use chrono::NaiveDateTime;
use std::cmp::Ordering;

/// Case-folded comparison with the exact text as tie-break, so "alice" and
/// "Alice" sit together but still order deterministically.
pub fn collate(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Filter predicates resolved once per query instead of once per record.
struct Predicates<'a> {
    options: &'a FilterOptions,
    search: Option<String>,
    after: Option<NaiveDateTime>,
    before: Option<NaiveDateTime>,
}

impl<'a> Predicates<'a> {
    fn new(options: &'a FilterOptions) -> Self {
        Self {
            options,
            search: options
                .search
                .as_deref()
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty()),
            after: options.expires_after.as_deref().and_then(dates::parse_date),
            before: options.expires_before.as_deref().and_then(dates::parse_date),
        }
    }

    fn within_bounds(&self, record: &MembershipRecord) -> bool {
        if self.after.is_none() && self.before.is_none() {
            return true;
        }
        match Expiry::from_field(record.expires_at.as_deref()) {
            Expiry::At(expires) => {
                self.after.map_or(true, |after| expires >= after)
                    && self.before.map_or(true, |before| expires <= before)
            }
            Expiry::Unknown => !self.options.require_expiry,
        }
    }

    fn accepts(&self, record: &MembershipRecord) -> bool {
        let opts = self.options;

        if let Some(needle) = &self.search {
            if !record.customer_name.to_lowercase().contains(needle)
                && !record.customer_email.to_lowercase().contains(needle)
            {
                return false;
            }
        }
        if !opts.membership_name.is_empty() && !opts.membership_name.contains(&record.membership_name)
        {
            return false;
        }
        if !opts.home_location.is_empty() && !opts.home_location.contains(&record.home_location) {
            return false;
        }
        if !opts.tags.is_empty() && !record.tags.iter().any(|tag| opts.tags.contains(tag)) {
            return false;
        }
        if let Some(assignee) = &opts.assigned_to {
            if record.assigned_to.as_ref() != Some(assignee) {
                return false;
            }
        }
        self.within_bounds(record)
    }
}

/// Records passing every supplied predicate, in input order.
pub fn filter(records: &[MembershipRecord], options: &FilterOptions) -> Vec<MembershipRecord> {
    let predicates = Predicates::new(options);
    records
        .iter()
        .filter(|record| predicates.accepts(record))
        .cloned()
        .collect()
}

fn compare(a: &MembershipRecord, b: &MembershipRecord, field: SortField) -> Ordering {
    match field {
        SortField::CustomerName => collate(&a.customer_name, &b.customer_name),
        SortField::MembershipName => collate(&a.membership_name, &b.membership_name),
        SortField::HomeLocation => collate(&a.home_location, &b.home_location),
        SortField::ExpiresAt => Expiry::from_field(a.expires_at.as_deref())
            .cmp(&Expiry::from_field(b.expires_at.as_deref())),
        SortField::DaysLapsed => a.days_lapsed.unwrap_or(0).cmp(&b.days_lapsed.unwrap_or(0)),
    }
}

/// Stable sort; equal keys keep their input order in both directions.
pub fn sort(mut records: Vec<MembershipRecord>, spec: &SortSpec) -> Vec<MembershipRecord> {
    records.sort_by(|a, b| match spec.direction {
        SortDirection::Asc => compare(a, b, spec.field),
        SortDirection::Desc => compare(b, a, spec.field),
    });
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, email: &str, location: &str) -> MembershipRecord {
        let mut record = MembershipRecord::new(name, email, "Session");
        record.home_location = location.to_string();
        record
    }

    fn names(records: &[MembershipRecord]) -> Vec<&str> {
        records.iter().map(|r| r.customer_name.as_str()).collect()
    }

    #[test]
    fn test_filter_conjunction() {
        let records = vec![
            record("Jane Doe", "a@x.com", "Downtown"),
            record("Jane Doe", "b@x.com", "Uptown"),
            record("Bob", "c@x.com", "Downtown"),
        ];
        let options = FilterOptions {
            search: Some("jane".to_string()),
            home_location: vec!["Downtown".to_string()],
            ..FilterOptions::default()
        };
        let filtered = filter(&records, &options);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].customer_email, "a@x.com");
    }

    #[test]
    fn test_search_matches_email_case_insensitively() {
        let records = vec![record("Bob", "Bob.Smith@Example.com", "N/A")];
        let options = FilterOptions {
            search: Some("SMITH@".to_string()),
            ..FilterOptions::default()
        };
        assert_eq!(filter(&records, &options).len(), 1);
    }

    #[test]
    fn test_tags_require_any_overlap_and_assignee_exact() {
        let mut a = record("A", "a@x.com", "N/A");
        a.tags = vec!["recent".to_string(), "location:n/a".to_string()];
        a.assigned_to = Some("Sam".to_string());
        let mut b = record("B", "b@x.com", "N/A");
        b.tags = vec!["old".to_string()];
        b.assigned_to = Some("Samantha".to_string());

        let options = FilterOptions {
            tags: vec!["recent".to_string(), "upcoming".to_string()],
            ..FilterOptions::default()
        };
        assert_eq!(names(&filter(&[a.clone(), b.clone()], &options)), vec!["A"]);

        let options = FilterOptions {
            assigned_to: Some("Sam".to_string()),
            ..FilterOptions::default()
        };
        assert_eq!(names(&filter(&[a, b], &options)), vec!["A"]);
    }

    #[test]
    fn test_date_bounds_pass_missing_expiry_unless_required() {
        let mut early = record("Early", "e@x.com", "N/A");
        early.expires_at = Some("2024-01-10".to_string());
        let mut late = record("Late", "l@x.com", "N/A");
        late.expires_at = Some("2024-05-10".to_string());
        let open = record("Open", "o@x.com", "N/A");
        let records = vec![early, late, open];

        let mut options = FilterOptions {
            expires_after: Some("2024-02-01T00:00:00.000Z".to_string()),
            expires_before: Some("2024-12-31".to_string()),
            ..FilterOptions::default()
        };
        assert_eq!(names(&filter(&records, &options)), vec!["Late", "Open"]);

        options.require_expiry = true;
        assert_eq!(names(&filter(&records, &options)), vec!["Late"]);
    }

    #[test]
    fn test_sort_missing_expiry_first_asc_last_desc() {
        let mut a = record("A", "a@x.com", "N/A");
        a.expires_at = Some("2024-03-01".to_string());
        let b = record("B", "b@x.com", "N/A");
        let mut c = record("C", "c@x.com", "N/A");
        c.expires_at = Some("2024-01-01".to_string());
        let records = vec![a, b, c];

        let asc = sort(
            records.clone(),
            &SortSpec {
                field: SortField::ExpiresAt,
                direction: SortDirection::Asc,
            },
        );
        assert_eq!(names(&asc), vec!["B", "C", "A"]);

        let desc = sort(
            records,
            &SortSpec {
                field: SortField::ExpiresAt,
                direction: SortDirection::Desc,
            },
        );
        assert_eq!(names(&desc), vec!["A", "C", "B"]);
    }

    #[test]
    fn test_sort_days_lapsed_treats_missing_as_zero_and_is_stable() {
        let mut a = record("A", "a@x.com", "N/A");
        a.days_lapsed = Some(5);
        let b = record("B", "b@x.com", "N/A");
        let mut c = record("C", "c@x.com", "N/A");
        c.days_lapsed = Some(-2);
        let mut d = record("D", "d@x.com", "N/A");
        d.days_lapsed = Some(0);

        let sorted = sort(
            vec![a, b, c, d],
            &SortSpec {
                field: SortField::DaysLapsed,
                direction: SortDirection::Asc,
            },
        );
        assert_eq!(names(&sorted), vec!["C", "B", "D", "A"]);
    }

    #[test]
    fn test_sort_names_case_insensitive() {
        let records = vec![
            record("bob", "1@x.com", "N/A"),
            record("Alice", "2@x.com", "N/A"),
            record("alice", "3@x.com", "N/A"),
        ];
        let sorted = sort(
            records,
            &SortSpec {
                field: SortField::CustomerName,
                direction: SortDirection::Asc,
            },
        );
        assert_eq!(names(&sorted), vec!["Alice", "alice", "bob"]);
    }
}
