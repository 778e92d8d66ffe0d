//! Run-scoped external-id → internal-id maps.
//!
//! The orchestrator owns one resolver per run and lends it out: the loader
//! writes entries as rubrics and remedies are persisted or found, the mapping
//! transformer only reads them.

use std::collections::HashMap;

use uuid::Uuid;

#[derive(Debug, Default)]
pub struct IdentityResolver {
    rubrics: HashMap<i64, Uuid>,
    remedies: HashMap<i64, Uuid>,
}

impl IdentityResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve_rubric(&self, external_id: i64) -> Option<Uuid> {
        self.rubrics.get(&external_id).copied()
    }

    pub fn resolve_remedy(&self, external_id: i64) -> Option<Uuid> {
        self.remedies.get(&external_id).copied()
    }

    pub(crate) fn register_rubric(&mut self, external_id: i64, internal_id: Uuid) {
        self.rubrics.insert(external_id, internal_id);
    }

    pub(crate) fn register_remedy(&mut self, external_id: i64, internal_id: Uuid) {
        self.remedies.insert(external_id, internal_id);
    }

    pub fn rubric_count(&self) -> usize {
        self.rubrics.len()
    }

    pub fn remedy_count(&self) -> usize {
        self.remedies.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rubric_and_remedy_spaces_are_separate() {
        let mut resolver = IdentityResolver::new();
        let rubric = Uuid::new_v4();
        resolver.register_rubric(10, rubric);

        assert_eq!(resolver.resolve_rubric(10), Some(rubric));
        assert_eq!(resolver.resolve_remedy(10), None);
        assert_eq!(resolver.rubric_count(), 1);
        assert_eq!(resolver.remedy_count(), 0);
    }

    #[test]
    fn several_external_ids_may_share_an_internal_id() {
        let mut resolver = IdentityResolver::new();
        let shared = Uuid::new_v4();
        resolver.register_remedy(1, shared);
        resolver.register_remedy(2, shared);
        assert_eq!(resolver.resolve_remedy(1), resolver.resolve_remedy(2));
    }
}
