use std::collections::HashSet;

use super::{is_target_locale, DropReason, TransformStats};
use crate::models::{MappingRecord, RawMapping, TARGET_REPERTORY};
use crate::pipeline::identity::IdentityResolver;

/// Source weights are clamped into the 1..=4 grade range as-is; out-of-range
/// weights are not otherwise validated.
pub fn clamp_grade(weight: i64) -> u8 {
    weight.clamp(1, 4) as u8
}

/// Needs a resolver already filled by the rubric and remedy loads.
pub fn transform_mapping(
    raw: &RawMapping,
    resolver: &IdentityResolver,
) -> Result<MappingRecord, DropReason> {
    if !is_target_locale(&raw.repertory_abbrev) {
        return Err(DropReason::NonTargetLocale);
    }
    let rubric_id = resolver
        .resolve_rubric(raw.rubric_external_id)
        .ok_or(DropReason::UnresolvedRubric)?;
    let remedy_id = resolver
        .resolve_remedy(raw.remedy_external_id)
        .ok_or(DropReason::UnresolvedRemedy)?;

    Ok(MappingRecord {
        rubric_id,
        remedy_id,
        grade: clamp_grade(raw.weight),
        repertory_type: TARGET_REPERTORY,
    })
}

/// Transform every row, keeping the first mapping seen for each
/// `(rubric_id, remedy_id, repertory_type)` key. Later rows with the same key
/// are dropped as duplicates.
pub fn transform_mappings(
    raws: &[RawMapping],
    resolver: &IdentityResolver,
) -> (Vec<MappingRecord>, TransformStats) {
    let mut stats = TransformStats::default();
    let mut records = Vec::with_capacity(raws.len());
    let mut seen = HashSet::with_capacity(raws.len());

    for raw in raws {
        let outcome = transform_mapping(raw, resolver).and_then(|record| {
            if seen.insert((record.rubric_id, record.remedy_id, record.repertory_type)) {
                Ok(record)
            } else {
                Err(DropReason::DuplicateMapping)
            }
        });

        match outcome {
            Ok(record) => {
                stats.record_accepted();
                records.push(record);
            }
            Err(reason) => {
                tracing::debug!(
                    rubric_id = raw.rubric_external_id,
                    remedy_id = raw.remedy_external_id,
                    reason = %reason,
                    "Mapping dropped"
                );
                stats.record_dropped(reason);
            }
        }
    }

    (records, stats)
}
