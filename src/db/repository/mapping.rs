use std::str::FromStr;

use rusqlite::{params, Connection, ToSql};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::RepertoryType;
use crate::models::MappingRecord;

use super::{now_timestamp, parse_id};

const INSERT_MAPPING_SQL: &str =
    "INSERT INTO kb_rubric_remedies (rubric_id, remedy_id, grade, repertory_type, updated_at)
     VALUES (?1, ?2, ?3, ?4, ?5)
     ON CONFLICT (rubric_id, remedy_id, repertory_type) DO NOTHING";

// Unchanged rows are left alone so their change count stays 0.
const UPDATE_GRADE_SQL: &str =
    "UPDATE kb_rubric_remedies SET grade = ?3, updated_at = ?5
     WHERE rubric_id = ?1 AND remedy_id = ?2 AND repertory_type = ?4 AND grade <> ?3";

/// What a single mapping upsert did to the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingWrite {
    Inserted,
    Updated,
    Unchanged,
}

/// Per-outcome tally of a batched upsert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MappingWriteCounts {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
}

impl MappingWriteCounts {
    pub fn record(&mut self, write: MappingWrite) {
        match write {
            MappingWrite::Inserted => self.inserted += 1,
            MappingWrite::Updated => self.updated += 1,
            MappingWrite::Unchanged => self.unchanged += 1,
        }
    }
}

fn write_mapping(
    conn: &Connection,
    mapping: &MappingRecord,
    timestamp: &str,
) -> Result<MappingWrite, DatabaseError> {
    let rubric_id = mapping.rubric_id.to_string();
    let remedy_id = mapping.remedy_id.to_string();
    let repertory_type = mapping.repertory_type.as_str();
    let row: [&dyn ToSql; 5] = [&rubric_id, &remedy_id, &mapping.grade, &repertory_type, &timestamp];

    if conn.prepare_cached(INSERT_MAPPING_SQL)?.execute(&row[..])? > 0 {
        return Ok(MappingWrite::Inserted);
    }
    if conn.prepare_cached(UPDATE_GRADE_SQL)?.execute(&row[..])? > 0 {
        return Ok(MappingWrite::Updated);
    }
    Ok(MappingWrite::Unchanged)
}

/// Upsert one mapping keyed by `(rubric_id, remedy_id, repertory_type)`.
/// A stored row whose grade already matches is not rewritten.
pub fn upsert_mapping(conn: &Connection, mapping: &MappingRecord) -> Result<MappingWrite, DatabaseError> {
    write_mapping(conn, mapping, &now_timestamp())
}

/// Upsert a whole batch inside one transaction. Any failing row rolls back the batch.
pub fn upsert_mappings(
    conn: &Connection,
    mappings: &[MappingRecord],
) -> Result<MappingWriteCounts, DatabaseError> {
    let tx = conn.unchecked_transaction()?;
    let timestamp = now_timestamp();
    let mut counts = MappingWriteCounts::default();

    for mapping in mappings {
        counts.record(write_mapping(&tx, mapping, &timestamp)?);
    }

    tx.commit()?;
    Ok(counts)
}

pub fn get_mappings_for_rubric(
    conn: &Connection,
    rubric_id: &Uuid,
) -> Result<Vec<MappingRecord>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT rubric_id, remedy_id, grade, repertory_type
         FROM kb_rubric_remedies WHERE rubric_id = ?1
         ORDER BY grade DESC, remedy_id",
    )?;

    let rows = stmt.query_map(params![rubric_id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, u8>(2)?,
            row.get::<_, String>(3)?,
        ))
    })?;

    let mut mappings = Vec::new();
    for row in rows {
        let (rubric_id, remedy_id, grade, repertory_type) = row?;
        mappings.push(MappingRecord {
            rubric_id: parse_id(&rubric_id)?,
            remedy_id: parse_id(&remedy_id)?,
            grade,
            repertory_type: RepertoryType::from_str(&repertory_type)?,
        });
    }
    Ok(mappings)
}

pub fn count_mappings(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row("SELECT COUNT(*) FROM kb_rubric_remedies", [], |row| row.get(0))?;
    Ok(count)
}

/// Mappings whose rubric or remedy row does not exist.
pub fn count_orphaned_mappings(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM kb_rubric_remedies m
         WHERE NOT EXISTS (SELECT 1 FROM kb_rubrics r WHERE r.id = m.rubric_id)
            OR NOT EXISTS (SELECT 1 FROM kb_remedies d WHERE d.id = m.remedy_id)",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}
