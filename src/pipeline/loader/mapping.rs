use rusqlite::Connection;

use super::LoadStats;
use crate::db::repository::{upsert_mapping, upsert_mappings, MappingWriteCounts};
use crate::db::DatabaseError;
use crate::models::MappingRecord;

fn batch_stats(counts: MappingWriteCounts, failed: usize) -> LoadStats {
    LoadStats {
        inserted: counts.inserted,
        updated: counts.updated,
        skipped: counts.unchanged,
        failed,
    }
}

/// Upsert one batch row by row after the batched write failed.
fn salvage_batch(conn: &Connection, batch: &[MappingRecord]) -> Result<LoadStats, DatabaseError> {
    let mut counts = MappingWriteCounts::default();
    let mut failed = 0;
    for mapping in batch {
        match upsert_mapping(conn, mapping) {
            Ok(write) => counts.record(write),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                failed += 1;
                tracing::warn!(
                    rubric_id = %mapping.rubric_id,
                    remedy_id = %mapping.remedy_id,
                    grade = mapping.grade,
                    error = %e,
                    "Mapping failed to load"
                );
            }
        }
    }
    Ok(batch_stats(counts, failed))
}

/// Load mappings in batches keyed by `(rubric_id, remedy_id, repertory_type)`.
///
/// A failing batch is rolled back and retried one record at a time so only
/// the offending records are lost.
pub fn load_mappings(
    conn: &Connection,
    mappings: &[MappingRecord],
    batch_size: usize,
) -> Result<LoadStats, DatabaseError> {
    let mut stats = LoadStats::default();

    for (batch_index, batch) in mappings.chunks(batch_size.max(1)).enumerate() {
        let committed = match upsert_mappings(conn, batch) {
            Ok(counts) => batch_stats(counts, 0),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                tracing::warn!(
                    batch = batch_index + 1,
                    size = batch.len(),
                    error = %e,
                    "Mapping batch failed, falling back to per-record upserts"
                );
                salvage_batch(conn, batch)?
            }
        };

        tracing::info!(
            entity = "mapping",
            batch = batch_index + 1,
            inserted = committed.inserted,
            updated = committed.updated,
            skipped = committed.skipped,
            failed = committed.failed,
            "Batch committed"
        );
        stats.merge(&committed);
    }

    Ok(stats)
}
