use crate::domain::model::MembershipRecord;
use crate::domain::services::dates::Expiry;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

pub const DEFAULT_EXCLUSION_TERMS: &[&str] = &[
    "2 for 1",
    "open barre",
    "comp",
    "complimentary",
    "hosted",
    "x",
    "p57",
    "physique",
    "birthday",
    "bridal",
    "influencer",
    "staff",
    "family",
    "free",
    "referral",
    "link",
    "sign",
    "sign-up",
];

/// Which membership text the exclusion terms are tested against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExclusionTarget {
    /// Canonical category only (legacy behavior).
    Classified,
    /// Raw export text only.
    Raw,
    /// Either one matching excludes the record.
    #[default]
    Both,
}

impl std::str::FromStr for ExclusionTarget {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "classified" => Ok(ExclusionTarget::Classified),
            "raw" => Ok(ExclusionTarget::Raw),
            "both" => Ok(ExclusionTarget::Both),
            other => Err(format!(
                "unknown exclusion target '{}', expected classified, raw or both",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExclusionPolicy {
    pub terms: Vec<String>,
    pub target: ExclusionTarget,
}

impl Default for ExclusionPolicy {
    fn default() -> Self {
        Self {
            terms: DEFAULT_EXCLUSION_TERMS.iter().map(|t| t.to_string()).collect(),
            target: ExclusionTarget::default(),
        }
    }
}

impl ExclusionPolicy {
    /// Compiles the terms once for a whole dedup pass.
    pub fn matcher(&self) -> ExclusionMatcher {
        let lowered: Vec<String> = self
            .terms
            .iter()
            .filter(|t| !t.trim().is_empty())
            .map(|t| t.to_lowercase())
            .collect();
        let raw_patterns = lowered
            .iter()
            .filter_map(|term| Regex::new(&word_pattern(term)).ok())
            .collect();
        ExclusionMatcher {
            target: self.target,
            substrings: lowered,
            raw_patterns,
        }
    }

    pub fn is_excluded(&self, record: &MembershipRecord) -> bool {
        self.matcher().is_excluded(record)
    }
}

/// `\b` only where the term itself starts or ends with a word character.
fn word_pattern(term: &str) -> String {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let start = if term.starts_with(is_word) { r"\b" } else { "" };
    let end = if term.ends_with(is_word) { r"\b" } else { "" };
    format!("(?i){}{}{}", start, regex::escape(term), end)
}

/// Compiled form of an [`ExclusionPolicy`].
///
/// Canonical categories are matched by substring. Raw export text is
/// free-form, so terms there must stand as whole words: `x` excludes
/// "Studio X Pass" but not "Flexi".
pub struct ExclusionMatcher {
    target: ExclusionTarget,
    substrings: Vec<String>,
    raw_patterns: Vec<Regex>,
}

impl ExclusionMatcher {
    fn matches_classified(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        self.substrings.iter().any(|term| lowered.contains(term.as_str()))
    }

    fn matches_raw(&self, text: &str) -> bool {
        self.raw_patterns.iter().any(|re| re.is_match(text))
    }

    pub fn is_excluded(&self, record: &MembershipRecord) -> bool {
        let classified = || self.matches_classified(&record.membership_name);
        let raw = || self.matches_raw(&record.raw_membership_name);
        match self.target {
            ExclusionTarget::Classified => classified(),
            ExclusionTarget::Raw => raw(),
            ExclusionTarget::Both => classified() || raw(),
        }
    }
}

fn email_set(records: &[MembershipRecord]) -> HashSet<String> {
    records.iter().map(MembershipRecord::email_key).collect()
}

/// Keeps one record per customer email: the one expiring last.
///
/// Excluded memberships and customers present in the frozen or
/// not-activated reports are dropped first. Ties (including two
/// unreadable dates) keep the record seen first. Output follows the order
/// in which each surviving email was first seen.
pub fn resolve(
    expirations: Vec<MembershipRecord>,
    frozen: &[MembershipRecord],
    not_activated: &[MembershipRecord],
    policy: &ExclusionPolicy,
) -> Vec<MembershipRecord> {
    let matcher = policy.matcher();
    let frozen_emails = email_set(frozen);
    let not_activated_emails = email_set(not_activated);

    let mut index: HashMap<String, usize> = HashMap::new();
    let mut latest: Vec<(Expiry, MembershipRecord)> = Vec::new();
    let mut excluded = 0usize;
    let mut inactive = 0usize;

    for record in expirations {
        if matcher.is_excluded(&record) {
            excluded += 1;
            continue;
        }

        let email = record.email_key();
        if frozen_emails.contains(&email) || not_activated_emails.contains(&email) {
            inactive += 1;
            continue;
        }

        let expiry = Expiry::from_field(record.expires_at.as_deref());
        match index.get(&email) {
            Some(&slot) => {
                if expiry > latest[slot].0 {
                    latest[slot] = (expiry, record);
                }
            }
            None => {
                index.insert(email, latest.len());
                latest.push((expiry, record));
            }
        }
    }

    tracing::debug!(
        "Dedup kept {} customers ({} excluded memberships, {} frozen/not activated)",
        latest.len(),
        excluded,
        inactive
    );

    latest.into_iter().map(|(_, record)| record).collect()
}
