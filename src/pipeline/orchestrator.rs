//! Pipeline orchestrator.
//!
//! ```text
//! open target → extract → chapter index → rubrics (transform+load)
//!   → remedies (transform+load) → mappings (transform, needs resolver)
//!   → mappings (load) → summary → close target
//! ```
//! Stages run strictly in order: mapping transformation reads the identity
//! maps the rubric and remedy loads fill in.

use std::path::Path;
use std::time::Instant;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use super::error::PipelineError;
use super::identity::IdentityResolver;
use super::loader::{load_entities, load_mappings, KnowledgeEntity, LoadSettings, LoadStats};
use super::source::{DumpFileSource, RelationalSource, ScanStats, SourceAdapter};
use super::transform::{
    transform_mappings, transform_remedies, transform_rubrics, ChapterIndex, Staged,
    TransformStats,
};
use crate::config::{ImportConfig, SourceConfig};
use crate::db::sqlite::open_database;

/// Transform and load outcome for one entity type. `load` is `None` on a dry run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySummary {
    pub transform: TransformStats,
    pub load: Option<LoadStats>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub source: String,
    pub dry_run: bool,
    pub scan: ScanStats,
    pub chapters: usize,
    pub rubrics: EntitySummary,
    pub remedies: EntitySummary,
    pub mappings: EntitySummary,
    pub elapsed_ms: u64,
}

impl ImportSummary {
    pub fn entities(&self) -> [(&'static str, &EntitySummary); 3] {
        [
            ("rubric", &self.rubrics),
            ("remedy", &self.remedies),
            ("mapping", &self.mappings),
        ]
    }

    pub fn total_failed(&self) -> usize {
        self.entities()
            .iter()
            .filter_map(|(_, entity)| entity.load.map(|l| l.failed))
            .sum()
    }

    /// Emit the final counts to the log stream.
    pub fn log(&self) {
        for (entity, summary) in self.entities() {
            let load = summary.load.unwrap_or_default();
            tracing::info!(
                entity,
                accepted = summary.transform.accepted,
                dropped = summary.transform.dropped_total(),
                inserted = load.inserted,
                updated = load.updated,
                skipped = load.skipped,
                failed = load.failed,
                dry_run = self.dry_run,
                "Import summary"
            );
            for (reason, count) in &summary.transform.dropped {
                tracing::info!(entity, reason = reason.as_str(), count, "Dropped during transform");
            }
        }
        tracing::info!(
            source = %self.source,
            chapters = self.chapters,
            malformed_lines = self.scan.malformed_total(),
            elapsed_ms = self.elapsed_ms,
            "Import finished"
        );
    }

    pub fn write_json(&self, path: &Path) -> Result<(), PipelineError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| PipelineError::Summary(e.to_string()))?;
        std::fs::write(path, json)
            .map_err(|e| PipelineError::Summary(format!("{}: {e}", path.display())))
    }
}

/// Load into `target`, or on a dry run (`None`) give every accepted record a
/// provisional id so mapping counts match a run against an empty target.
fn stage_entities<T: KnowledgeEntity>(
    target: Option<&Connection>,
    staged: &[Staged<T>],
    batch_size: usize,
    resolver: &mut IdentityResolver,
) -> Result<Option<LoadStats>, PipelineError> {
    match target {
        Some(conn) => Ok(Some(load_entities(conn, staged, batch_size, resolver)?)),
        None => {
            for item in staged {
                T::register(resolver, item.external_id, item.record.id());
            }
            Ok(None)
        }
    }
}

/// Run every stage against an already-open target. `None` means dry run.
pub async fn run_import(
    source: &mut dyn SourceAdapter,
    target: Option<&Connection>,
    settings: &LoadSettings,
) -> Result<ImportSummary, PipelineError> {
    let start = Instant::now();
    let source_name = source.source_name();

    let extraction = source.extract().await?;
    let data = extraction.data;

    let chapters = ChapterIndex::build(&data.chapters);
    let mut resolver = IdentityResolver::new();

    let (rubrics, rubric_stats) = transform_rubrics(&data.rubrics, &chapters);
    tracing::info!(accepted = rubric_stats.accepted, dropped = rubric_stats.dropped_total(), "Rubrics transformed");
    let rubric_load = stage_entities(target, &rubrics, settings.entity_batch_size, &mut resolver)?;
    drop(rubrics);

    let (remedies, remedy_stats) = transform_remedies(&data.remedies);
    tracing::info!(accepted = remedy_stats.accepted, dropped = remedy_stats.dropped_total(), "Remedies transformed");
    let remedy_load = stage_entities(target, &remedies, settings.entity_batch_size, &mut resolver)?;
    drop(remedies);

    let (mappings, mapping_stats) = transform_mappings(&data.mappings, &resolver);
    tracing::info!(
        accepted = mapping_stats.accepted,
        dropped = mapping_stats.dropped_total(),
        resolved_rubrics = resolver.rubric_count(),
        resolved_remedies = resolver.remedy_count(),
        "Mappings transformed"
    );
    let mapping_load = match target {
        Some(conn) => Some(load_mappings(conn, &mappings, settings.mapping_batch_size)?),
        None => None,
    };

    Ok(ImportSummary {
        source: source_name,
        dry_run: target.is_none(),
        scan: extraction.stats,
        chapters: chapters.len(),
        rubrics: EntitySummary { transform: rubric_stats, load: rubric_load },
        remedies: EntitySummary { transform: remedy_stats, load: remedy_load },
        mappings: EntitySummary { transform: mapping_stats, load: mapping_load },
        elapsed_ms: start.elapsed().as_millis() as u64,
    })
}

fn build_source(config: &ImportConfig) -> Box<dyn SourceAdapter> {
    match &config.source {
        SourceConfig::DumpFile(path) => Box::new(DumpFileSource::new(path.clone())),
        SourceConfig::Relational(pg) => {
            Box::new(RelationalSource::new(pg.clone(), config.retry.clone()))
        }
    }
}

/// Full run: open the knowledge base (unless dry-run), import, close, report.
pub async fn run(config: &ImportConfig) -> Result<ImportSummary, PipelineError> {
    config.validate()?;
    let mut source = build_source(config);
    tracing::info!(
        mode = config.source.mode(),
        source = %source.source_name(),
        dry_run = config.dry_run,
        "Starting OOREP import"
    );

    let summary = if config.dry_run {
        run_import(source.as_mut(), None, &config.load).await?
    } else {
        tracing::info!(path = %config.database_path.display(), "Opening knowledge base");
        let conn = open_database(&config.database_path, config.busy_timeout)?;
        let result = run_import(source.as_mut(), Some(&conn), &config.load).await;
        if let Err((_, e)) = conn.close() {
            tracing::warn!(error = %e, "Knowledge base did not close cleanly");
        }
        result?
    };

    summary.log();
    if let Some(path) = &config.summary_json {
        summary.write_json(path)?;
        tracing::info!(path = %path.display(), "Summary written");
    }
    Ok(summary)
}
