use uuid::Uuid;

use super::{is_target_locale, ChapterIndex, DropReason, Staged, TransformStats};
use crate::models::{RawRubric, RubricRecord, CLASSICAL_HOMEOPATHY, TARGET_REPERTORY};

/// First non-blank of `fullpath`, `path`, `text`, trimmed. `text` holds only
/// the last path segment, which many rubrics share.
fn pick_rubric_text(raw: &RawRubric) -> Option<String> {
    [&raw.fullpath, &raw.path, &raw.text]
        .into_iter()
        .filter_map(|candidate| candidate.as_deref())
        .map(str::trim)
        .find(|candidate| !candidate.is_empty())
        .map(str::to_string)
}

pub fn transform_rubric(raw: &RawRubric, chapters: &ChapterIndex) -> Result<RubricRecord, DropReason> {
    if !is_target_locale(&raw.repertory_abbrev) {
        return Err(DropReason::NonTargetLocale);
    }
    let rubric_text = pick_rubric_text(raw).ok_or(DropReason::EmptyRubricText)?;

    Ok(RubricRecord {
        id: Uuid::new_v4(),
        repertory_type: TARGET_REPERTORY,
        chapter_name: chapters.name_for(raw.chapter_external_id).to_string(),
        rubric_text,
        modality: CLASSICAL_HOMEOPATHY.to_string(),
        is_global: true,
    })
}

pub fn transform_rubrics(
    raws: &[RawRubric],
    chapters: &ChapterIndex,
) -> (Vec<Staged<RubricRecord>>, TransformStats) {
    let mut stats = TransformStats::default();
    let mut staged = Vec::with_capacity(raws.len());

    for raw in raws {
        match transform_rubric(raw, chapters) {
            Ok(record) => {
                stats.record_accepted();
                staged.push(Staged { external_id: raw.external_id, record });
            }
            Err(reason) => {
                tracing::debug!(rubric_id = raw.external_id, reason = %reason, "Rubric dropped");
                stats.record_dropped(reason);
            }
        }
    }

    (staged, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::RepertoryType;
    use crate::models::RawChapter;

    fn index() -> ChapterIndex {
        ChapterIndex::build(&[RawChapter { external_id: 5, text: "Mind".into() }])
    }

    fn raw(abbrev: &str, text: Option<&str>, fullpath: Option<&str>, path: Option<&str>) -> RawRubric {
        RawRubric {
            external_id: 100,
            repertory_abbrev: abbrev.into(),
            chapter_external_id: Some(5),
            fullpath: fullpath.map(String::from),
            path: path.map(String::from),
            text: text.map(String::from),
        }
    }

    #[test]
    fn publicum_rubric_is_normalized() {
        let record =
            transform_rubric(&raw("publicum", Some("Ailments from grief"), None, None), &index())
                .unwrap();
        assert_eq!(record.repertory_type, RepertoryType::Publicum);
        assert_eq!(record.chapter_name, "Mind");
        assert_eq!(record.rubric_text, "Ailments from grief");
        assert_eq!(record.modality, "classical_homeopathy");
        assert!(record.is_global);
    }

    #[test]
    fn other_locales_are_dropped() {
        let err = transform_rubric(&raw("kent-de", Some("Kummer"), None, None), &index()).unwrap_err();
        assert_eq!(err, DropReason::NonTargetLocale);
    }

    #[test]
    fn fullpath_wins_then_path_then_text() {
        let from_fullpath = transform_rubric(
            &raw("publicum", Some("night"), Some("Mind, anxiety, night"), Some("anxiety, night")),
            &index(),
        )
        .unwrap();
        assert_eq!(from_fullpath.rubric_text, "Mind, anxiety, night");

        let from_path = transform_rubric(
            &raw("publicum", Some("night"), Some("  "), Some(" anxiety, night ")),
            &index(),
        )
        .unwrap();
        assert_eq!(from_path.rubric_text, "anxiety, night");

        let from_text = transform_rubric(&raw("publicum", Some(" night "), None, None), &index()).unwrap();
        assert_eq!(from_text.rubric_text, "night");
    }

    #[test]
    fn shared_leaf_text_keeps_rubrics_apart() {
        let mind = raw("publicum", Some("night"), Some("Mind, anxiety, night"), None);
        let mut sleep = raw("publicum", Some("night"), Some("Sleep, restless, night"), None);
        sleep.external_id = 200;

        let (staged, _) = transform_rubrics(&[mind, sleep], &index());
        assert_eq!(staged.len(), 2);
        assert_ne!(staged[0].record.rubric_text, staged[1].record.rubric_text);
    }

    #[test]
    fn all_text_empty_is_dropped() {
        let err = transform_rubric(&raw("publicum", Some(""), None, Some("   ")), &index()).unwrap_err();
        assert_eq!(err, DropReason::EmptyRubricText);
    }

    #[test]
    fn missing_chapter_defaults_to_unknown() {
        let mut row = raw("publicum", Some("Vertigo"), None, None);
        row.chapter_external_id = Some(42);
        assert_eq!(transform_rubric(&row, &index()).unwrap().chapter_name, "Unknown");
    }

    #[test]
    fn batch_keeps_external_ids_and_counts() {
        let mut second = raw("kent-de", Some("Angst"), None, None);
        second.external_id = 101;
        let mut third = raw("publicum", Some("Anxiety"), None, None);
        third.external_id = 102;

        let (staged, stats) =
            transform_rubrics(&[raw("publicum", Some("Grief"), None, None), second, third], &index());

        assert_eq!(staged.iter().map(|s| s.external_id).collect::<Vec<_>>(), vec![100, 102]);
        assert_eq!(stats.accepted, 2);
        assert_eq!(stats.dropped_for(DropReason::NonTargetLocale), 1);
        assert_ne!(staged[0].record.id, staged[1].record.id);
    }
}
