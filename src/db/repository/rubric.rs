use std::str::FromStr;

use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::RepertoryType;
use crate::models::RubricRecord;

use super::{now_timestamp, parse_id};

pub fn insert_rubric(conn: &Connection, rubric: &RubricRecord) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO kb_rubrics (id, repertory_type, chapter_name, rubric_text, modality,
         is_global, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            rubric.id.to_string(),
            rubric.repertory_type.as_str(),
            rubric.chapter_name,
            rubric.rubric_text,
            rubric.modality,
            rubric.is_global as i32,
            now_timestamp(),
        ],
    )?;
    Ok(())
}

/// Look up a rubric by its natural key `(rubric_text, repertory_type)`.
pub fn find_rubric_id(
    conn: &Connection,
    rubric_text: &str,
    repertory_type: RepertoryType,
) -> Result<Option<Uuid>, DatabaseError> {
    let result = conn.query_row(
        "SELECT id FROM kb_rubrics WHERE rubric_text = ?1 AND repertory_type = ?2",
        params![rubric_text, repertory_type.as_str()],
        |row| row.get::<_, String>(0),
    );

    match result {
        Ok(id) => Ok(Some(parse_id(&id)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_rubric(conn: &Connection, id: &Uuid) -> Result<Option<RubricRecord>, DatabaseError> {
    let result = conn.query_row(
        "SELECT id, repertory_type, chapter_name, rubric_text, modality, is_global
         FROM kb_rubrics WHERE id = ?1",
        params![id.to_string()],
        |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, i32>(5)?,
            ))
        },
    );

    match result {
        Ok((id, repertory_type, chapter_name, rubric_text, modality, is_global)) => {
            Ok(Some(RubricRecord {
                id: parse_id(&id)?,
                repertory_type: RepertoryType::from_str(&repertory_type)?,
                chapter_name,
                rubric_text,
                modality,
                is_global: is_global != 0,
            }))
        }
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn count_rubrics(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row("SELECT COUNT(*) FROM kb_rubrics", [], |row| row.get(0))?;
    Ok(count)
}

pub fn count_rubrics_by_repertory(
    conn: &Connection,
    repertory_type: RepertoryType,
) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM kb_rubrics WHERE repertory_type = ?1",
        params![repertory_type.as_str()],
        |row| row.get(0),
    )?;
    Ok(count)
}
