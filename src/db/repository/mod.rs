//! Repository layer: entity-scoped knowledge-base operations.
//!
//! One sub-module per persisted collection; all public functions are
//! re-exported here.

mod mapping;
mod remedy;
mod rubric;

use chrono::Utc;
use uuid::Uuid;

use super::DatabaseError;

pub use mapping::*;
pub use remedy::*;
pub use rubric::*;

pub(crate) fn now_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

pub(crate) fn parse_id(id: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(id).map_err(|e| DatabaseError::ConstraintViolation(format!("bad id {id}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;
    use crate::models::enums::*;
    use crate::models::*;
    use rusqlite::Connection;

    fn test_db() -> Connection {
        open_memory_database().unwrap()
    }

    fn make_rubric(text: &str) -> RubricRecord {
        RubricRecord {
            id: Uuid::new_v4(),
            repertory_type: RepertoryType::Publicum,
            chapter_name: "Mind".into(),
            rubric_text: text.into(),
            modality: CLASSICAL_HOMEOPATHY.into(),
            is_global: true,
        }
    }

    fn make_remedy(name: &str) -> RemedyRecord {
        RemedyRecord {
            id: Uuid::new_v4(),
            name: name.into(),
            abbreviation: Some("Nat-m".into()),
            category: RemedyCategory::Unknown,
            modality: CLASSICAL_HOMEOPATHY.into(),
            is_global: true,
            keynotes: vec![],
            pathogenesis: String::new(),
            clinical_notes: String::new(),
            supported_potencies: DEFAULT_POTENCIES.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn insert_and_find_rubric_by_natural_key() {
        let conn = test_db();
        let rubric = make_rubric("Ailments from grief");
        insert_rubric(&conn, &rubric).unwrap();

        let found = find_rubric_id(&conn, "Ailments from grief", RepertoryType::Publicum).unwrap();
        assert_eq!(found, Some(rubric.id));

        let other_repertory = find_rubric_id(&conn, "Ailments from grief", RepertoryType::Kent).unwrap();
        assert!(other_repertory.is_none());
    }

    #[test]
    fn get_rubric_round_trips_fields() {
        let conn = test_db();
        let rubric = make_rubric("Anxiety, night");
        insert_rubric(&conn, &rubric).unwrap();

        let loaded = get_rubric(&conn, &rubric.id).unwrap().unwrap();
        assert_eq!(loaded, rubric);
        assert!(get_rubric(&conn, &Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn duplicate_rubric_natural_key_is_unique_violation() {
        let conn = test_db();
        insert_rubric(&conn, &make_rubric("Fear of death")).unwrap();

        let err = insert_rubric(&conn, &make_rubric("Fear of death")).unwrap_err();
        assert!(err.is_unique_violation());
        assert!(!err.is_fatal());
        assert_eq!(count_rubrics(&conn).unwrap(), 1);
    }

    #[test]
    fn empty_rubric_text_rejected_by_schema() {
        let conn = test_db();
        let err = insert_rubric(&conn, &make_rubric("")).unwrap_err();
        assert!(!err.is_unique_violation());
    }

    #[test]
    fn remedy_collections_stored_as_json() {
        let conn = test_db();
        let remedy = make_remedy("Natrum Muriaticum");
        insert_remedy(&conn, &remedy).unwrap();

        let loaded = get_remedy(&conn, &remedy.id).unwrap().unwrap();
        assert_eq!(loaded.supported_potencies, vec!["6C", "30C", "200C", "1M"]);
        assert!(loaded.keynotes.is_empty());
        assert_eq!(loaded.category, RemedyCategory::Unknown);
        assert_eq!(
            find_remedy_id(&conn, "Natrum Muriaticum", CLASSICAL_HOMEOPATHY).unwrap(),
            Some(remedy.id)
        );
    }

    #[test]
    fn duplicate_remedy_is_unique_violation() {
        let conn = test_db();
        insert_remedy(&conn, &make_remedy("Sepia")).unwrap();
        let err = insert_remedy(&conn, &make_remedy("Sepia")).unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[test]
    fn upsert_mapping_inserts_then_updates_grade() {
        let conn = test_db();
        let rubric = make_rubric("Weeping");
        let remedy = make_remedy("Pulsatilla");
        insert_rubric(&conn, &rubric).unwrap();
        insert_remedy(&conn, &remedy).unwrap();

        let mut mapping = MappingRecord {
            rubric_id: rubric.id,
            remedy_id: remedy.id,
            grade: 2,
            repertory_type: RepertoryType::Publicum,
        };
        assert_eq!(upsert_mapping(&conn, &mapping).unwrap(), MappingWrite::Inserted);
        // Same grade again: no write.
        assert_eq!(upsert_mapping(&conn, &mapping).unwrap(), MappingWrite::Unchanged);

        mapping.grade = 3;
        assert_eq!(upsert_mapping(&conn, &mapping).unwrap(), MappingWrite::Updated);

        let stored = get_mappings_for_rubric(&conn, &rubric.id).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].grade, 3);
        assert_eq!(count_mappings(&conn).unwrap(), 1);
        assert_eq!(count_orphaned_mappings(&conn).unwrap(), 0);
    }

    #[test]
    fn batch_upsert_rolls_back_on_bad_row() {
        let conn = test_db();
        let good = MappingRecord {
            rubric_id: Uuid::new_v4(),
            remedy_id: Uuid::new_v4(),
            grade: 1,
            repertory_type: RepertoryType::Publicum,
        };
        let bad = MappingRecord { grade: 9, remedy_id: Uuid::new_v4(), ..good.clone() };

        assert!(upsert_mappings(&conn, &[good.clone(), bad]).is_err());
        assert_eq!(count_mappings(&conn).unwrap(), 0);

        let counts = upsert_mappings(&conn, &[good]).unwrap();
        assert_eq!(counts, MappingWriteCounts { inserted: 1, ..MappingWriteCounts::default() });
        assert_eq!(count_mappings(&conn).unwrap(), 1);
    }

    #[test]
    fn batch_upsert_reports_each_outcome() {
        let conn = test_db();
        let rubric_id = Uuid::new_v4();
        let stored: Vec<_> = (1..=3)
            .map(|grade| MappingRecord {
                rubric_id,
                remedy_id: Uuid::new_v4(),
                grade,
                repertory_type: RepertoryType::Publicum,
            })
            .collect();
        upsert_mappings(&conn, &stored).unwrap();

        let mut next = stored.clone();
        next[0].grade = 4;
        next.push(MappingRecord { remedy_id: Uuid::new_v4(), ..stored[0].clone() });

        let counts = upsert_mappings(&conn, &next).unwrap();
        assert_eq!(counts, MappingWriteCounts { inserted: 1, updated: 1, unchanged: 2 });
        assert_eq!(count_mappings(&conn).unwrap(), 4);
    }

    #[test]
    fn orphaned_mappings_are_detected() {
        let conn = test_db();
        let mapping = MappingRecord {
            rubric_id: Uuid::new_v4(),
            remedy_id: Uuid::new_v4(),
            grade: 4,
            repertory_type: RepertoryType::Publicum,
        };
        upsert_mapping(&conn, &mapping).unwrap();
        assert_eq!(count_orphaned_mappings(&conn).unwrap(), 1);
    }
}
