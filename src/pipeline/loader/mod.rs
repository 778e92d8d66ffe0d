//! Idempotent loader.
//!
//! Rubrics and remedies go through natural-key lookup then insert, one
//! transaction per batch, and populate the [`IdentityResolver`](crate::pipeline::identity::IdentityResolver)
//! once each batch commits. Mappings go through batched upserts with a
//! per-row fallback when a batch fails.

pub mod entity;
pub mod mapping;

pub use entity::{insert_or_recover, load_entities, EntityOutcome, KnowledgeEntity};
pub use mapping::load_mappings;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadSettings {
    /// Rubric/remedy records per transaction.
    pub entity_batch_size: usize,
    /// Mapping records per batched upsert.
    pub mapping_batch_size: usize,
}

impl Default for LoadSettings {
    fn default() -> Self {
        Self {
            entity_batch_size: 1000,
            mapping_batch_size: 5000,
        }
    }
}

/// Per-entity load outcome counters.
///
/// `skipped` counts records that already existed unchanged; `updated` counts
/// mappings whose grade was rewritten.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadStats {
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl LoadStats {
    pub fn merge(&mut self, other: &LoadStats) {
        self.inserted += other.inserted;
        self.updated += other.updated;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }

    pub fn total(&self) -> usize {
        self.inserted + self.updated + self.skipped + self.failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_adds_every_counter() {
        let mut total = LoadStats { inserted: 1, updated: 0, skipped: 2, failed: 0 };
        total.merge(&LoadStats { inserted: 3, updated: 1, skipped: 0, failed: 1 });
        assert_eq!(total, LoadStats { inserted: 4, updated: 1, skipped: 2, failed: 1 });
        assert_eq!(total.total(), 8);
    }

    #[test]
    fn default_batch_sizes() {
        let settings = LoadSettings::default();
        assert_eq!(settings.entity_batch_size, 1000);
        assert_eq!(settings.mapping_batch_size, 5000);
    }
}
