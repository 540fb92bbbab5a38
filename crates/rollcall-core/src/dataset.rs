//! In-memory dataset of profile records and the merge rules applied to
//! freshly scraped batches.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt;
use std::str::FromStr;

use crate::models::{MergeStats, ProfileRecord};

/// How a scraped batch is reconciled with the existing dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    /// Only add keys not seen before; existing entries are never overwritten.
    Fresh,
    /// Only enrich keys already present; never introduce new keys.
    Update,
}

impl MergeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeMode::Fresh => "fresh",
            MergeMode::Update => "update",
        }
    }
}

impl fmt::Display for MergeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MergeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fresh" => Ok(MergeMode::Fresh),
            "update" => Ok(MergeMode::Update),
            _ => Err(format!("Unknown merge mode: {}", s)),
        }
    }
}

/// Threshold deciding when a stored record no longer needs enrichment.
///
/// The default treats a record as complete once it has a non-empty
/// description and a non-empty company.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletenessPolicy {
    /// Minimum description length, in characters.
    pub min_description_chars: usize,
    pub require_company: bool,
}

impl Default for CompletenessPolicy {
    fn default() -> Self {
        Self {
            min_description_chars: 1,
            require_company: true,
        }
    }
}

impl CompletenessPolicy {
    pub fn is_complete(&self, record: &ProfileRecord) -> bool {
        let description_ok = record.description.chars().count() >= self.min_description_chars;
        let company_ok = !self.require_company || !record.company.is_empty();
        description_ok && company_ok
    }
}

/// Ordered mapping from profile URL to record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    records: BTreeMap<String, ProfileRecord>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, profile_url: &str) -> Option<&ProfileRecord> {
        self.records.get(profile_url)
    }

    pub fn contains(&self, profile_url: &str) -> bool {
        self.records.contains_key(profile_url)
    }

    /// Records in ascending key order.
    pub fn records(&self) -> impl Iterator<Item = &ProfileRecord> {
        self.records.values()
    }

    /// Number of records the policy does not consider complete.
    pub fn incomplete_count(&self, policy: &CompletenessPolicy) -> usize {
        self.records
            .values()
            .filter(|r| !policy.is_complete(r))
            .count()
    }

    /// Merge a scraped batch into the dataset.
    ///
    /// Entries with an empty URL are ignored and not counted.
    pub fn merge<I>(&mut self, batch: I, mode: MergeMode) -> MergeStats
    where
        I: IntoIterator<Item = ProfileRecord>,
    {
        let mut stats = MergeStats::default();

        for incoming in batch {
            let incoming = canonical(incoming);
            if incoming.profile_url.is_empty() {
                tracing::debug!("Ignoring scraped record without a profile URL");
                continue;
            }

            match (self.records.entry(incoming.profile_url.clone()), mode) {
                (Entry::Vacant(slot), MergeMode::Fresh) => {
                    slot.insert(incoming);
                    stats.new += 1;
                }
                (Entry::Occupied(mut slot), MergeMode::Update) => {
                    if enrich(slot.get_mut(), &incoming) {
                        stats.updated += 1;
                    } else {
                        stats.skipped += 1;
                    }
                }
                // fresh: first write wins; update: unknown keys are out of scope
                (Entry::Occupied(_), MergeMode::Fresh) | (Entry::Vacant(_), MergeMode::Update) => {
                    stats.skipped += 1;
                }
            }
        }

        stats
    }
}

impl FromIterator<ProfileRecord> for Dataset {
    /// Later duplicates of a key replace earlier ones.
    fn from_iter<T: IntoIterator<Item = ProfileRecord>>(iter: T) -> Self {
        let records = iter
            .into_iter()
            .map(canonical)
            .map(|r| (r.profile_url.clone(), r))
            .collect();
        Self { records }
    }
}

/// Strips surrounding whitespace from every field so stored values survive a
/// save and reload unchanged.
fn canonical(mut record: ProfileRecord) -> ProfileRecord {
    for field in [
        &mut record.profile_url,
        &mut record.description,
        &mut record.company,
    ] {
        let trimmed = field.trim();
        if trimmed.len() != field.len() {
            *field = trimmed.to_string();
        }
    }
    record
}

/// Completeness-preferring field merge. Returns true if anything changed.
fn enrich(existing: &mut ProfileRecord, incoming: &ProfileRecord) -> bool {
    let mut changed = false;

    if !incoming.description.is_empty()
        && (existing.description.is_empty()
            || incoming.description.chars().count() > existing.description.chars().count())
    {
        existing.description = incoming.description.clone();
        changed = true;
    }

    if !incoming.company.is_empty() && existing.company.is_empty() {
        existing.company = incoming.company.clone();
        changed = true;
    }

    changed
}
