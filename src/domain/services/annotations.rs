use crate::domain::model::{email_key, FollowUp, MembershipRecord};
use crate::utils::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// User-entered fields for one customer, kept apart from the derived record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Annotation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub follow_ups: Vec<FollowUp>,
}

impl Annotation {
    pub fn is_empty(&self) -> bool {
        self.assigned_to.is_none() && self.follow_ups.is_empty()
    }
}

/// Annotations keyed by lower-cased email, joined onto records at read time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationStore {
    entries: BTreeMap<String, Annotation>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    pub fn get(&self, email: &str) -> Option<&Annotation> {
        self.entries.get(&email_key(email))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stores the annotation fields of `record`; everything else is ignored.
    pub fn set_from_record(&mut self, record: &MembershipRecord) {
        let annotation = Annotation {
            assigned_to: record
                .assigned_to
                .clone()
                .filter(|assignee| !assignee.trim().is_empty()),
            follow_ups: record.follow_ups.clone(),
        };
        let key = record.email_key();
        if annotation.is_empty() {
            self.entries.remove(&key);
        } else {
            self.entries.insert(key, annotation);
        }
    }

    /// Left join: records without an entry keep empty annotation fields.
    pub fn annotate(&self, records: &[MembershipRecord]) -> Vec<MembershipRecord> {
        records
            .iter()
            .map(|record| {
                let mut joined = record.clone();
                if let Some(annotation) = self.entries.get(&record.email_key()) {
                    joined.assigned_to = annotation.assigned_to.clone();
                    joined.follow_ups = annotation.follow_ups.clone();
                }
                joined
            })
            .collect()
    }
}
