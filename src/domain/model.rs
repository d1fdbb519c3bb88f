use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// One parsed CSV row, columns kept in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    columns: Vec<(String, String)>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            columns: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn push(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.columns.push((column.into(), value.into()));
    }

    /// Named lookup; blank cells count as absent.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.trim())
            .filter(|value| !value.is_empty())
    }

    /// First present value among several candidate headers.
    pub fn get_any(&self, columns: &[&str]) -> Option<&str> {
        columns.iter().find_map(|column| self.get(column))
    }

    /// Positional lookup; blank cells count as absent.
    pub fn value_at(&self, index: usize) -> Option<&str> {
        self.columns
            .get(index)
            .map(|(_, value)| value.trim())
            .filter(|value| !value.is_empty())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Expirations,
    Frozen,
    #[serde(rename = "notactivated")]
    NotActivated,
}

impl SourceType {
    /// Detects the report type from the file's base name.
    pub fn from_file_name(file_name: &str, prefixes: &SourcePrefixes) -> Option<Self> {
        let base = std::path::Path::new(file_name)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(file_name);

        if base.starts_with(&prefixes.expirations) {
            Some(SourceType::Expirations)
        } else if base.starts_with(&prefixes.frozen) {
            Some(SourceType::Frozen)
        } else if base.starts_with(&prefixes.not_activated) {
            Some(SourceType::NotActivated)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Expirations => "expirations",
            SourceType::Frozen => "frozen",
            SourceType::NotActivated => "notactivated",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcePrefixes {
    pub expirations: String,
    pub frozen: String,
    pub not_activated: String,
}

impl Default for SourcePrefixes {
    fn default() -> Self {
        Self {
            expirations: "momence-memberships-expiration-report".to_string(),
            frozen: "frozen-memberships-report".to_string(),
            not_activated: "not-activated-memberships-report".to_string(),
        }
    }
}

/// Rows of every uploaded report, grouped by report type.
#[derive(Debug, Clone, Default)]
pub struct SourceBatch {
    pub expirations: Vec<RawRow>,
    pub frozen: Vec<RawRow>,
    pub not_activated: Vec<RawRow>,
}

impl SourceBatch {
    pub fn rows_mut(&mut self, source: SourceType) -> &mut Vec<RawRow> {
        match source {
            SourceType::Expirations => &mut self.expirations,
            SourceType::Frozen => &mut self.frozen,
            SourceType::NotActivated => &mut self.not_activated,
        }
    }

    pub fn total_rows(&self) -> usize {
        self.expirations.len() + self.frozen.len() + self.not_activated.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUp {
    pub id: String,
    pub date: String,
    pub comment: String,
    pub created_at: String,
}

impl FollowUp {
    pub fn new(date: impl Into<String>, comment: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            date: date.into(),
            comment: comment.into(),
            created_at: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipRecord {
    pub customer_name: String,
    pub customer_email: String,
    pub membership_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub raw_membership_name: String,
    pub home_location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frozen_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unfrozen_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bought_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_lapsed: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub follow_ups: Vec<FollowUp>,
}

impl MembershipRecord {
    pub fn new(
        customer_name: impl Into<String>,
        customer_email: impl Into<String>,
        membership_name: impl Into<String>,
    ) -> Self {
        Self {
            customer_name: customer_name.into(),
            customer_email: customer_email.into(),
            membership_name: membership_name.into(),
            raw_membership_name: String::new(),
            home_location: "N/A".to_string(),
            expires_at: None,
            frozen_at: None,
            unfrozen_at: None,
            bought_at: None,
            days_lapsed: None,
            tags: Vec::new(),
            assigned_to: None,
            follow_ups: Vec::new(),
        }
    }

    /// Identity key: trimmed, lower-cased email.
    pub fn email_key(&self) -> String {
        email_key(&self.customer_email)
    }
}

pub fn email_key(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodGrouping {
    Week,
    #[default]
    Month,
    Quarter,
    Year,
}

impl FromStr for PeriodGrouping {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "week" => Ok(PeriodGrouping::Week),
            "month" => Ok(PeriodGrouping::Month),
            "quarter" => Ok(PeriodGrouping::Quarter),
            "year" => Ok(PeriodGrouping::Year),
            other => Err(format!(
                "unknown grouping '{}', expected week, month, quarter or year",
                other
            )),
        }
    }
}

/// Bucket key for time-series views.
///
/// Ordering is chronological (year, then ordinal within the year); the
/// label is what consumers display and what the key serializes as.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PeriodKey {
    pub year: i32,
    pub ordinal: u32,
    pub label: String,
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

impl Serialize for PeriodKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.label)
    }
}

pub type Grouped<K> = BTreeMap<K, Vec<MembershipRecord>>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterOptions {
    pub search: Option<String>,
    pub membership_name: Vec<String>,
    pub home_location: Vec<String>,
    pub tags: Vec<String>,
    pub expires_after: Option<String>,
    pub expires_before: Option<String>,
    pub assigned_to: Option<String>,
    /// Treat a missing or unreadable expiry as failing the date bounds.
    pub require_expiry: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    CustomerName,
    #[default]
    ExpiresAt,
    MembershipName,
    HomeLocation,
    DaysLapsed,
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "customerName" | "customer-name" | "name" => Ok(SortField::CustomerName),
            "expiresAt" | "expires-at" | "expires" => Ok(SortField::ExpiresAt),
            "membershipName" | "membership-name" | "membership" => Ok(SortField::MembershipName),
            "homeLocation" | "home-location" | "location" => Ok(SortField::HomeLocation),
            "daysLapsed" | "days-lapsed" => Ok(SortField::DaysLapsed),
            other => Err(format!("unknown sort field '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(format!("unknown sort direction '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SortSpec {
    pub field: SortField,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    #[serde(alias = "tsv", alias = "xlsx")]
    Excel,
    Pdf,
    Json,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Excel => "excel",
            ExportFormat::Pdf => "pdf",
            ExportFormat::Json => "json",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Excel => "tsv",
            ExportFormat::Pdf => "pdf",
            ExportFormat::Json => "json",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "excel" | "xlsx" | "tsv" => Ok(ExportFormat::Excel),
            "pdf" => Ok(ExportFormat::Pdf),
            "json" => Ok(ExportFormat::Json),
            other => Err(format!("unknown export format '{}'", other)),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user edit to the annotation fields of one customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotationEdit {
    Assign {
        email: String,
        assignee: Option<String>,
    },
    FollowUp {
        email: String,
        comment: String,
    },
}

impl AnnotationEdit {
    pub fn email(&self) -> &str {
        match self {
            AnnotationEdit::Assign { email, .. } | AnnotationEdit::FollowUp { email, .. } => email,
        }
    }

    /// `EMAIL=NAME`; an empty name clears the assignment.
    pub fn parse_assignment(s: &str) -> std::result::Result<Self, String> {
        let (email, assignee) = split_edit(s)?;
        Ok(AnnotationEdit::Assign {
            email,
            assignee: (!assignee.is_empty()).then_some(assignee),
        })
    }

    /// `EMAIL=COMMENT`
    pub fn parse_follow_up(s: &str) -> std::result::Result<Self, String> {
        let (email, comment) = split_edit(s)?;
        if comment.is_empty() {
            return Err(format!("follow-up for {} has no comment", email));
        }
        Ok(AnnotationEdit::FollowUp { email, comment })
    }
}

fn split_edit(s: &str) -> std::result::Result<(String, String), String> {
    let (email, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected EMAIL=VALUE, got '{}'", s))?;
    let email = email.trim();
    if email.is_empty() {
        return Err(format!("missing email in '{}'", s));
    }
    Ok((email.to_string(), value.trim().to_string()))
}

/// Counts shown on the dashboard metric cards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSummary {
    pub total: usize,
    pub upcoming: usize,
    pub today: usize,
    pub recent: usize,
    pub within_30_days: usize,
    pub within_90_days: usize,
    pub old: usize,
    pub without_expiry: usize,
    pub assigned: usize,
    pub unassigned: usize,
    pub follow_ups: usize,
}

/// Option lists for the filter dropdowns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterFacets {
    pub membership_names: Vec<String>,
    pub home_locations: Vec<String>,
    pub tags: Vec<String>,
    pub assignees: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedData {
    pub by_membership_name: Grouped<String>,
    pub by_period: Grouped<PeriodKey>,
    pub by_month: Grouped<PeriodKey>,
    pub by_home_location: Grouped<String>,
    pub all_records: Vec<MembershipRecord>,
    pub summary: RecordSummary,
    pub facets: FilterFacets,
}

/// Everything the pure stages need besides the rows themselves.
#[derive(Debug, Clone)]
pub struct ProcessingOptions {
    pub today: NaiveDate,
    pub grouping: PeriodGrouping,
    pub filter: FilterOptions,
    pub sort: SortSpec,
    pub exclusion: crate::domain::services::dedup::ExclusionPolicy,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            today: chrono::Local::now().date_naive(),
            grouping: PeriodGrouping::default(),
            filter: FilterOptions::default(),
            sort: SortSpec::default(),
            exclusion: Default::default(),
        }
    }
}
