use rusqlite::Connection;
use uuid::Uuid;

use super::LoadStats;
use crate::db::repository::{find_remedy_id, find_rubric_id, insert_remedy, insert_rubric};
use crate::db::DatabaseError;
use crate::models::{RemedyRecord, RubricRecord};
use crate::pipeline::identity::IdentityResolver;
use crate::pipeline::transform::Staged;

/// A record deduplicated by natural key and tracked in the identity maps.
pub trait KnowledgeEntity {
    const KIND: &'static str;

    fn id(&self) -> Uuid;

    /// Internal id of the stored record sharing this one's natural key.
    fn find_existing(&self, conn: &Connection) -> Result<Option<Uuid>, DatabaseError>;

    fn insert(&self, conn: &Connection) -> Result<(), DatabaseError>;

    fn register(resolver: &mut IdentityResolver, external_id: i64, internal_id: Uuid);
}

impl KnowledgeEntity for RubricRecord {
    const KIND: &'static str = "rubric";

    fn id(&self) -> Uuid {
        self.id
    }

    fn find_existing(&self, conn: &Connection) -> Result<Option<Uuid>, DatabaseError> {
        find_rubric_id(conn, &self.rubric_text, self.repertory_type)
    }

    fn insert(&self, conn: &Connection) -> Result<(), DatabaseError> {
        insert_rubric(conn, self)
    }

    fn register(resolver: &mut IdentityResolver, external_id: i64, internal_id: Uuid) {
        resolver.register_rubric(external_id, internal_id);
    }
}

impl KnowledgeEntity for RemedyRecord {
    const KIND: &'static str = "remedy";

    fn id(&self) -> Uuid {
        self.id
    }

    fn find_existing(&self, conn: &Connection) -> Result<Option<Uuid>, DatabaseError> {
        find_remedy_id(conn, &self.name, &self.modality)
    }

    fn insert(&self, conn: &Connection) -> Result<(), DatabaseError> {
        insert_remedy(conn, self)
    }

    fn register(resolver: &mut IdentityResolver, external_id: i64, internal_id: Uuid) {
        resolver.register_remedy(external_id, internal_id);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityOutcome {
    Inserted(Uuid),
    Existing(Uuid),
}

/// Look up by natural key, insert when absent. A unique violation on insert
/// means another writer got there first; the winner's id is returned instead.
pub fn insert_or_recover<T: KnowledgeEntity>(
    conn: &Connection,
    record: &T,
) -> Result<EntityOutcome, DatabaseError> {
    if let Some(id) = record.find_existing(conn)? {
        return Ok(EntityOutcome::Existing(id));
    }

    match record.insert(conn) {
        Ok(()) => Ok(EntityOutcome::Inserted(record.id())),
        Err(e) if e.is_unique_violation() => match record.find_existing(conn)? {
            Some(id) => {
                tracing::debug!(entity = T::KIND, "Insert raced an existing record, reusing it");
                Ok(EntityOutcome::Existing(id))
            }
            None => Err(e),
        },
        Err(e) => Err(e),
    }
}

/// Load staged rubrics or remedies in sequential batches.
///
/// Ids reach the resolver only after their batch commits. Fatal errors abort
/// the load (the open batch rolls back); other per-record errors are counted
/// as failed and the batch carries on.
pub fn load_entities<T: KnowledgeEntity>(
    conn: &Connection,
    staged: &[Staged<T>],
    batch_size: usize,
    resolver: &mut IdentityResolver,
) -> Result<LoadStats, DatabaseError> {
    let mut stats = LoadStats::default();

    for (batch_index, batch) in staged.chunks(batch_size.max(1)).enumerate() {
        let tx = conn.unchecked_transaction()?;
        let mut batch_stats = LoadStats::default();
        let mut resolved = Vec::with_capacity(batch.len());

        for item in batch {
            match insert_or_recover(&tx, &item.record) {
                Ok(EntityOutcome::Inserted(id)) => {
                    batch_stats.inserted += 1;
                    resolved.push((item.external_id, id));
                }
                Ok(EntityOutcome::Existing(id)) => {
                    batch_stats.skipped += 1;
                    resolved.push((item.external_id, id));
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    batch_stats.failed += 1;
                    tracing::warn!(
                        entity = T::KIND,
                        external_id = item.external_id,
                        error = %e,
                        "Record failed to load"
                    );
                }
            }
        }

        tx.commit()?;
        for (external_id, internal_id) in resolved {
            T::register(resolver, external_id, internal_id);
        }

        tracing::info!(
            entity = T::KIND,
            batch = batch_index + 1,
            inserted = batch_stats.inserted,
            skipped = batch_stats.skipped,
            failed = batch_stats.failed,
            "Batch committed"
        );
        stats.merge(&batch_stats);
    }

    Ok(stats)
}
