//! Source-shaped rows, as extracted from an OOREP dump or database.
//!
//! These live only for the duration of one import run: every adapter parses
//! into them right after reading, and the transformers consume them.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawChapter {
    pub external_id: i64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRemedy {
    pub external_id: i64,
    pub abbrev: String,
    pub long_name: Option<String>,
    /// Lowercase kingdom token; OOREP itself does not ship one.
    pub kingdom: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRubric {
    pub external_id: i64,
    pub repertory_abbrev: String,
    pub chapter_external_id: Option<i64>,
    pub fullpath: Option<String>,
    pub path: Option<String>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMapping {
    pub repertory_abbrev: String,
    pub rubric_external_id: i64,
    pub remedy_external_id: i64,
    pub weight: i64,
}

/// One typed row, tagged by the table it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawRecord {
    Chapter(RawChapter),
    Remedy(RawRemedy),
    Rubric(RawRubric),
    Mapping(RawMapping),
}

/// Everything one extraction produced, grouped per entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawDataset {
    pub chapters: Vec<RawChapter>,
    pub remedies: Vec<RawRemedy>,
    pub rubrics: Vec<RawRubric>,
    pub mappings: Vec<RawMapping>,
}

impl RawDataset {
    pub fn push(&mut self, record: RawRecord) {
        match record {
            RawRecord::Chapter(c) => self.chapters.push(c),
            RawRecord::Remedy(r) => self.remedies.push(r),
            RawRecord::Rubric(r) => self.rubrics.push(r),
            RawRecord::Mapping(m) => self.mappings.push(m),
        }
    }

    pub fn total_rows(&self) -> usize {
        self.chapters.len() + self.remedies.len() + self.rubrics.len() + self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total_rows() == 0
    }
}
