use std::collections::HashMap;

use crate::models::RawChapter;

/// Chapter name used when a rubric's chapter is missing or unknown.
pub const UNKNOWN_CHAPTER: &str = "Unknown";

/// External chapter id to display text, built once per run.
#[derive(Debug, Clone, Default)]
pub struct ChapterIndex {
    names: HashMap<i64, String>,
}

impl ChapterIndex {
    pub fn build(chapters: &[RawChapter]) -> Self {
        let mut names = HashMap::with_capacity(chapters.len());
        for chapter in chapters {
            let text = chapter.text.trim();
            if text.is_empty() {
                continue;
            }
            // First occurrence wins
            names.entry(chapter.external_id).or_insert_with(|| text.to_string());
        }
        tracing::debug!(chapters = names.len(), "Chapter index built");
        Self { names }
    }

    pub fn name_for(&self, chapter_id: Option<i64>) -> &str {
        chapter_id
            .and_then(|id| self.names.get(&id))
            .map(String::as_str)
            .unwrap_or(UNKNOWN_CHAPTER)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
