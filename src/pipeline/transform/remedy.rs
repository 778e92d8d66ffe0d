use uuid::Uuid;

use super::{DropReason, Staged, TransformStats};
use crate::models::enums::RemedyCategory;
use crate::models::{RawRemedy, RemedyRecord, CLASSICAL_HOMEOPATHY, DEFAULT_POTENCIES};

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Remedies are global reference data: no locale filter applies.
pub fn transform_remedy(raw: &RawRemedy) -> Result<RemedyRecord, DropReason> {
    let abbreviation = non_blank(Some(raw.abbrev.as_str()));
    let name = non_blank(raw.long_name.as_deref())
        .or(abbreviation)
        .ok_or(DropReason::EmptyRemedyName)?;

    let category = raw
        .kingdom
        .as_deref()
        .map(RemedyCategory::from_kingdom_token)
        .unwrap_or(RemedyCategory::Unknown);

    Ok(RemedyRecord {
        id: Uuid::new_v4(),
        name: name.to_string(),
        abbreviation: abbreviation.map(str::to_string),
        category,
        modality: CLASSICAL_HOMEOPATHY.to_string(),
        is_global: true,
        keynotes: Vec::new(),
        pathogenesis: String::new(),
        clinical_notes: String::new(),
        supported_potencies: DEFAULT_POTENCIES.iter().map(|p| p.to_string()).collect(),
    })
}

pub fn transform_remedies(raws: &[RawRemedy]) -> (Vec<Staged<RemedyRecord>>, TransformStats) {
    let mut stats = TransformStats::default();
    let mut staged = Vec::with_capacity(raws.len());

    for raw in raws {
        match transform_remedy(raw) {
            Ok(record) => {
                stats.record_accepted();
                staged.push(Staged { external_id: raw.external_id, record });
            }
            Err(reason) => {
                tracing::debug!(remedy_id = raw.external_id, reason = %reason, "Remedy dropped");
                stats.record_dropped(reason);
            }
        }
    }

    (staged, stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(abbrev: &str, long_name: Option<&str>, kingdom: Option<&str>) -> RawRemedy {
        RawRemedy {
            external_id: 10,
            abbrev: abbrev.into(),
            long_name: long_name.map(String::from),
            kingdom: kingdom.map(String::from),
        }
    }

    #[test]
    fn long_name_is_preferred() {
        let record = transform_remedy(&raw("Nat-m", Some("Natrum Muriaticum"), None)).unwrap();
        assert_eq!(record.name, "Natrum Muriaticum");
        assert_eq!(record.abbreviation.as_deref(), Some("Nat-m"));
        assert_eq!(record.category, RemedyCategory::Unknown);
    }

    #[test]
    fn abbreviation_stands_in_for_missing_name() {
        let record = transform_remedy(&raw("Sep", None, None)).unwrap();
        assert_eq!(record.name, "Sep");

        let blank = transform_remedy(&raw("Sep", Some("  "), None)).unwrap();
        assert_eq!(blank.name, "Sep");
    }

    #[test]
    fn nameless_remedy_is_dropped() {
        assert_eq!(transform_remedy(&raw("", None, None)).unwrap_err(), DropReason::EmptyRemedyName);
    }

    #[test]
    fn kingdom_maps_to_category() {
        let record = transform_remedy(&raw("Puls", Some("Pulsatilla"), Some("plant"))).unwrap();
        assert_eq!(record.category.as_str(), "Plant Kingdom");

        let odd = transform_remedy(&raw("X", Some("X-ray"), Some("radiation"))).unwrap();
        assert_eq!(odd.category, RemedyCategory::Unknown);
    }

    #[test]
    fn collections_are_defaulted() {
        let record = transform_remedy(&raw("Sulph", Some("Sulphur"), None)).unwrap();
        assert!(record.keynotes.is_empty());
        assert!(record.pathogenesis.is_empty());
        assert!(record.clinical_notes.is_empty());
        assert_eq!(record.supported_potencies, vec!["6C", "30C", "200C", "1M"]);
        assert_eq!(record.modality, CLASSICAL_HOMEOPATHY);
        assert!(record.is_global);
    }

    #[test]
    fn batch_counts_drops() {
        let (staged, stats) = transform_remedies(&[raw("Sep", Some("Sepia"), None), raw(" ", None, None)]);
        assert_eq!(staged.len(), 1);
        assert_eq!(stats.accepted, 1);
        assert_eq!(stats.dropped_for(DropReason::EmptyRemedyName), 1);
    }
}
