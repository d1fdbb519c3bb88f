use crate::domain::model::{
    email_key, AnnotationEdit, FilterFacets, FollowUp, Grouped, MembershipRecord, ProcessedData,
    ProcessingOptions, RecordSummary, SourceBatch, SourceType,
};
use crate::domain::services::annotations::AnnotationStore;
use crate::domain::services::{dedup, periods, query, standardizer, tagging};
use crate::utils::error::{EtlError, Result};
use std::collections::{BTreeSet, HashMap};

/// The resolved customer set plus the annotations layered on top of it.
///
/// Identity, classification and derived fields are fixed when the set is
/// built; later edits only touch the annotation store.
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    base: Vec<MembershipRecord>,
    index: HashMap<String, usize>,
    annotations: AnnotationStore,
}

impl RecordSet {
    /// standardize → resolve → tag
    pub fn from_sources(batch: &SourceBatch, options: &ProcessingOptions) -> Self {
        let expirations =
            standardizer::standardize(&batch.expirations, SourceType::Expirations, options.today);
        let frozen = standardizer::standardize(&batch.frozen, SourceType::Frozen, options.today);
        let not_activated =
            standardizer::standardize(&batch.not_activated, SourceType::NotActivated, options.today);

        tracing::debug!(
            "Standardized {} expiration, {} frozen, {} not-activated records",
            expirations.len(),
            frozen.len(),
            not_activated.len()
        );

        let resolved = dedup::resolve(expirations, &frozen, &not_activated, &options.exclusion);
        Self::from_records(tagging::apply_tags(resolved))
    }

    /// Wraps records that are already unique per email; later duplicates are ignored.
    pub fn from_records(records: Vec<MembershipRecord>) -> Self {
        let mut base = Vec::with_capacity(records.len());
        let mut index = HashMap::with_capacity(records.len());
        for mut record in records {
            let key = record.email_key();
            if index.contains_key(&key) {
                tracing::warn!("Ignoring duplicate record for {}", record.customer_email);
                continue;
            }
            record.assigned_to = None;
            record.follow_ups.clear();
            index.insert(key, base.len());
            base.push(record);
        }
        Self {
            base,
            index,
            annotations: AnnotationStore::new(),
        }
    }

    pub fn with_annotations(mut self, annotations: AnnotationStore) -> Self {
        self.annotations = annotations;
        self
    }

    pub fn len(&self) -> usize {
        self.base.len()
    }

    pub fn is_empty(&self) -> bool {
        self.base.is_empty()
    }

    pub fn annotations(&self) -> &AnnotationStore {
        &self.annotations
    }

    /// Records with annotations joined, in resolution order.
    pub fn records(&self) -> Vec<MembershipRecord> {
        self.annotations.annotate(&self.base)
    }

    pub fn get(&self, email: &str) -> Option<MembershipRecord> {
        self.index
            .get(&email_key(email))
            .map(|&slot| self.annotations.annotate(&self.base[slot..=slot]).remove(0))
    }

    /// Accepts a full replacement record from the presentation layer.
    ///
    /// Only `assigned_to` and `follow_ups` are taken from it.
    pub fn submit_update(&mut self, record: &MembershipRecord) -> Result<()> {
        if !self.index.contains_key(&record.email_key()) {
            return Err(EtlError::UnknownRecord {
                email: record.customer_email.clone(),
            });
        }
        self.annotations.set_from_record(record);
        Ok(())
    }

    pub fn apply_edit(&mut self, edit: &AnnotationEdit, today: chrono::NaiveDate) -> Result<()> {
        let mut record = self.get(edit.email()).ok_or_else(|| EtlError::UnknownRecord {
            email: edit.email().to_string(),
        })?;
        match edit {
            AnnotationEdit::Assign { assignee, .. } => record.assigned_to = assignee.clone(),
            AnnotationEdit::FollowUp { comment, .. } => record
                .follow_ups
                .push(FollowUp::new(today.format("%Y-%m-%d").to_string(), comment.clone())),
        }
        self.submit_update(&record)
    }

    pub fn processed(&self, options: &ProcessingOptions) -> ProcessedData {
        build_processed_data(self.records(), options)
    }
}

fn group_by<F>(records: &[MembershipRecord], key_of: F) -> Grouped<String>
where
    F: Fn(&MembershipRecord) -> &str,
{
    let mut groups = Grouped::new();
    for record in records {
        groups
            .entry(key_of(record).to_string())
            .or_default()
            .push(record.clone());
    }
    groups
}

pub fn summarize(records: &[MembershipRecord]) -> RecordSummary {
    let mut summary = RecordSummary {
        total: records.len(),
        ..RecordSummary::default()
    };
    for record in records {
        match record.days_lapsed.map(tagging::lapse_bucket) {
            Some(tagging::TAG_UPCOMING) => summary.upcoming += 1,
            Some(tagging::TAG_TODAY) => summary.today += 1,
            Some(tagging::TAG_RECENT) => summary.recent += 1,
            Some(tagging::TAG_30_DAYS) => summary.within_30_days += 1,
            Some(tagging::TAG_90_DAYS) => summary.within_90_days += 1,
            Some(_) => summary.old += 1,
            None => summary.without_expiry += 1,
        }
        if record.assigned_to.is_some() {
            summary.assigned += 1;
        } else {
            summary.unassigned += 1;
        }
        summary.follow_ups += record.follow_ups.len();
    }
    summary
}

pub fn facets(records: &[MembershipRecord]) -> FilterFacets {
    let mut names = BTreeSet::new();
    let mut locations = BTreeSet::new();
    let mut tags = BTreeSet::new();
    let mut assignees = BTreeSet::new();
    for record in records {
        names.insert(record.membership_name.clone());
        locations.insert(record.home_location.clone());
        tags.extend(record.tags.iter().cloned());
        if let Some(assignee) = &record.assigned_to {
            assignees.insert(assignee.clone());
        }
    }
    FilterFacets {
        membership_names: names.into_iter().collect(),
        home_locations: locations.into_iter().collect(),
        tags: tags.into_iter().collect(),
        assignees: assignees.into_iter().collect(),
    }
}

/// filter → sort → group, over a fresh snapshot of the record set.
pub fn build_processed_data(records: Vec<MembershipRecord>, options: &ProcessingOptions) -> ProcessedData {
    let facets = facets(&records);
    let all_records = query::sort(query::filter(&records, &options.filter), &options.sort);

    ProcessedData {
        by_membership_name: group_by(&all_records, |r| &r.membership_name),
        by_period: periods::group_by_period(&all_records, options.grouping),
        by_month: periods::group_by_month_name(&all_records),
        by_home_location: group_by(&all_records, |r| &r.home_location),
        summary: summarize(&all_records),
        facets,
        all_records,
    }
}
