use std::str::FromStr;

use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::RemedyCategory;
use crate::models::RemedyRecord;

use super::{now_timestamp, parse_id};

pub fn insert_remedy(conn: &Connection, remedy: &RemedyRecord) -> Result<(), DatabaseError> {
    let keynotes = serde_json::to_string(&remedy.keynotes)?;
    let potencies = serde_json::to_string(&remedy.supported_potencies)?;

    conn.execute(
        "INSERT INTO kb_remedies (id, name, abbreviation, category, modality, is_global,
         keynotes, pathogenesis, clinical_notes, supported_potencies, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            remedy.id.to_string(),
            remedy.name,
            remedy.abbreviation,
            remedy.category.as_str(),
            remedy.modality,
            remedy.is_global as i32,
            keynotes,
            remedy.pathogenesis,
            remedy.clinical_notes,
            potencies,
            now_timestamp(),
        ],
    )?;
    Ok(())
}

/// Look up a remedy by its natural key `(name, modality)`.
pub fn find_remedy_id(
    conn: &Connection,
    name: &str,
    modality: &str,
) -> Result<Option<Uuid>, DatabaseError> {
    let result = conn.query_row(
        "SELECT id FROM kb_remedies WHERE name = ?1 AND modality = ?2",
        params![name, modality],
        |row| row.get::<_, String>(0),
    );

    match result {
        Ok(id) => Ok(Some(parse_id(&id)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

struct RemedyRow {
    id: String,
    name: String,
    abbreviation: Option<String>,
    category: String,
    modality: String,
    is_global: i32,
    keynotes: String,
    pathogenesis: String,
    clinical_notes: String,
    supported_potencies: String,
}

pub fn get_remedy(conn: &Connection, id: &Uuid) -> Result<Option<RemedyRecord>, DatabaseError> {
    let result = conn.query_row(
        "SELECT id, name, abbreviation, category, modality, is_global, keynotes,
         pathogenesis, clinical_notes, supported_potencies
         FROM kb_remedies WHERE id = ?1",
        params![id.to_string()],
        |row| {
            Ok(RemedyRow {
                id: row.get(0)?,
                name: row.get(1)?,
                abbreviation: row.get(2)?,
                category: row.get(3)?,
                modality: row.get(4)?,
                is_global: row.get(5)?,
                keynotes: row.get(6)?,
                pathogenesis: row.get(7)?,
                clinical_notes: row.get(8)?,
                supported_potencies: row.get(9)?,
            })
        },
    );

    match result {
        Ok(row) => Ok(Some(remedy_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn remedy_from_row(row: RemedyRow) -> Result<RemedyRecord, DatabaseError> {
    Ok(RemedyRecord {
        id: parse_id(&row.id)?,
        name: row.name,
        abbreviation: row.abbreviation,
        category: RemedyCategory::from_str(&row.category)?,
        modality: row.modality,
        is_global: row.is_global != 0,
        keynotes: serde_json::from_str(&row.keynotes)?,
        pathogenesis: row.pathogenesis,
        clinical_notes: row.clinical_notes,
        supported_potencies: serde_json::from_str(&row.supported_potencies)?,
    })
}

pub fn count_remedies(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row("SELECT COUNT(*) FROM kb_remedies", [], |row| row.get(0))?;
    Ok(count)
}
