use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{RemedyCategory, RepertoryType};

/// Modality tag carried by every imported rubric and remedy.
pub const CLASSICAL_HOMEOPATHY: &str = "classical_homeopathy";

/// The only repertory this import persists (the English OOREP repertory).
pub const TARGET_REPERTORY: RepertoryType = RepertoryType::Publicum;

/// Potencies offered for every imported remedy until a clinic narrows them.
pub const DEFAULT_POTENCIES: [&str; 4] = ["6C", "30C", "200C", "1M"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RubricRecord {
    pub id: Uuid,
    pub repertory_type: RepertoryType,
    pub chapter_name: String,
    pub rubric_text: String,
    pub modality: String,
    pub is_global: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemedyRecord {
    pub id: Uuid,
    pub name: String,
    pub abbreviation: Option<String>,
    pub category: RemedyCategory,
    pub modality: String,
    pub is_global: bool,
    pub keynotes: Vec<String>,
    pub pathogenesis: String,
    pub clinical_notes: String,
    pub supported_potencies: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingRecord {
    pub rubric_id: Uuid,
    pub remedy_id: Uuid,
    /// Strength of association, 1..=4.
    pub grade: u8,
    pub repertory_type: RepertoryType,
}
