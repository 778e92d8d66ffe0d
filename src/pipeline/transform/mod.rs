//! Entity transformers: raw OOREP rows to knowledge-base records.
//!
//! Every transformer is a pure function returning either a record or the
//! [`DropReason`] it was rejected for. Batch helpers fold those outcomes into
//! [`TransformStats`]; nothing here touches the datastore.

pub mod chapter_index;
pub mod mapping;
pub mod remedy;
pub mod rubric;

pub use chapter_index::{ChapterIndex, UNKNOWN_CHAPTER};
pub use mapping::{clamp_grade, transform_mapping, transform_mappings};
pub use remedy::{transform_remedies, transform_remedy};
pub use rubric::{transform_rubric, transform_rubrics};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::TARGET_REPERTORY;

/// Why a raw row did not become a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DropReason {
    NonTargetLocale,
    EmptyRubricText,
    EmptyRemedyName,
    UnresolvedRubric,
    UnresolvedRemedy,
    DuplicateMapping,
}

impl DropReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NonTargetLocale => "non-target-locale",
            Self::EmptyRubricText => "empty-rubric-text",
            Self::EmptyRemedyName => "empty-remedy-name",
            Self::UnresolvedRubric => "unresolved-rubric",
            Self::UnresolvedRemedy => "unresolved-remedy",
            Self::DuplicateMapping => "duplicate-mapping",
        }
    }
}

impl std::fmt::Display for DropReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepted / dropped-by-reason counters for one entity type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformStats {
    pub accepted: usize,
    pub dropped: BTreeMap<DropReason, usize>,
}

impl TransformStats {
    pub fn record_accepted(&mut self) {
        self.accepted += 1;
    }

    pub fn record_dropped(&mut self, reason: DropReason) {
        *self.dropped.entry(reason).or_insert(0) += 1;
    }

    pub fn dropped_for(&self, reason: DropReason) -> usize {
        self.dropped.get(&reason).copied().unwrap_or(0)
    }

    pub fn dropped_total(&self) -> usize {
        self.dropped.values().sum()
    }
}

/// A transformed record still tagged with the source id it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Staged<T> {
    pub external_id: i64,
    pub record: T,
}

/// Rows outside the target repertory never get past a transformer.
pub(crate) fn is_target_locale(repertory_abbrev: &str) -> bool {
    repertory_abbrev.trim() == TARGET_REPERTORY.as_str()
}
