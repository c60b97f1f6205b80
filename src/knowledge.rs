//! The loaded document and the sections currently used as knowledge.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::doc_processor;
use crate::error::ParseError;

/// Sections active right after a load: qualifications, bidding, bid security
/// and evaluation criteria of a Thai e-bidding document.
pub const DEFAULT_SECTIONS: [u32; 4] = [2, 4, 5, 6];

/// Placed between rendered sections in the knowledge context.
pub const SECTION_SEPARATOR: &str = "\n\n";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Section {
    pub index: u32,
    pub title: String,
    pub body: String,
}

impl Section {
    pub fn new(index: u32, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            index,
            title: title.into(),
            body: body.into(),
        }
    }

    /// `Section 5: title` followed by the body.
    pub fn render(&self) -> String {
        if self.title.is_empty() {
            format!("Section {}\n\n{}", self.index, self.body)
        } else {
            format!("Section {}: {}\n\n{}", self.index, self.title, self.body)
        }
    }
}

/// Extracted text and its sections, in source order with strictly
/// increasing indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    raw_text: String,
    sections: Vec<Section>,
}

impl Document {
    fn new(raw_text: String, sections: Vec<Section>) -> Result<Self, ParseError> {
        if sections.is_empty()
            || sections
                .iter()
                .all(|s| s.body.trim().is_empty() && s.title.trim().is_empty())
        {
            return Err(ParseError::Empty);
        }
        let mut last = 0;
        for section in &sections {
            if section.index == 0 {
                return Err(ParseError::InvalidSections(
                    "section indices start at 1".into(),
                ));
            }
            if section.index <= last {
                return Err(ParseError::InvalidSections(format!(
                    "section {} follows section {}",
                    section.index, last
                )));
            }
            last = section.index;
        }
        Ok(Self { raw_text, sections })
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, index: u32) -> Option<&Section> {
        self.sections.iter().find(|s| s.index == index)
    }

    pub fn contains(&self, index: u32) -> bool {
        self.section(index).is_some()
    }

    /// Numbers between 1 and the last index that have no section.
    pub fn missing_sections(&self) -> Vec<u32> {
        let max = self.sections.last().map_or(0, |s| s.index);
        (1..=max).filter(|i| !self.contains(*i)).collect()
    }
}

/// Holds at most one document plus the selection of active sections.
#[derive(Debug, Default)]
pub struct DocumentStore {
    document: Option<Document>,
    selection: BTreeSet<u32>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Split `raw_text` into sections and make it the current document.
    ///
    /// The selection falls back to [`DEFAULT_SECTIONS`]. On error the
    /// previous document and selection are kept.
    pub fn load(&mut self, raw_text: &str) -> Result<&Document, ParseError> {
        let sections = doc_processor::split_sections(raw_text);
        self.install(raw_text.to_string(), sections)
    }

    /// Like [`load`](Self::load) with sections already identified by the caller.
    pub fn load_sections(
        &mut self,
        raw_text: &str,
        sections: Vec<Section>,
    ) -> Result<&Document, ParseError> {
        self.install(raw_text.to_string(), sections)
    }

    fn install(
        &mut self,
        raw_text: String,
        sections: Vec<Section>,
    ) -> Result<&Document, ParseError> {
        let document = Document::new(raw_text, sections)?;
        self.selection = DEFAULT_SECTIONS
            .iter()
            .copied()
            .filter(|i| document.contains(*i))
            .collect();
        tracing::info!(
            sections = document.sections().len(),
            missing = ?document.missing_sections(),
            selected = ?self.selection,
            "document loaded"
        );
        Ok(self.document.insert(document))
    }

    /// Replace the selection. Indices the document does not have are dropped.
    pub fn select_sections(&mut self, indices: impl IntoIterator<Item = u32>) {
        let document = self.document.as_ref();
        self.selection = indices
            .into_iter()
            .filter(|i| document.is_some_and(|d| d.contains(*i)))
            .collect();
        tracing::debug!(selected = ?self.selection, "selection changed");
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    pub fn selection(&self) -> &BTreeSet<u32> {
        &self.selection
    }

    pub fn is_selected(&self, index: u32) -> bool {
        self.selection.contains(&index)
    }

    /// Rendered selected sections in ascending index order, or `""`.
    pub fn active_knowledge_text(&self) -> String {
        let Some(document) = &self.document else {
            return String::new();
        };
        document
            .sections()
            .iter()
            .filter(|s| self.selection.contains(&s.index))
            .map(Section::render)
            .collect::<Vec<_>>()
            .join(SECTION_SEPARATOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> String {
        (1..=7)
            .map(|i| format!("{}. Title {}\nbody {}", i, i, i))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_load_selects_default_sections() {
        let mut store = DocumentStore::new();
        store.load(&sample()).unwrap();
        assert_eq!(
            store.selection().iter().copied().collect::<Vec<_>>(),
            vec![2, 4, 5, 6]
        );
    }

    #[test]
    fn test_default_selection_limited_to_present_sections() {
        let mut store = DocumentStore::new();
        store.load("1. One\na\n2. Two\nb\n3. Three\nc\n4. Four\nd").unwrap();
        assert_eq!(
            store.selection().iter().copied().collect::<Vec<_>>(),
            vec![2, 4]
        );
    }

    #[test]
    fn test_new_document_resets_selection() {
        let mut store = DocumentStore::new();
        store.load(&sample()).unwrap();
        store.select_sections([1, 7]);
        store.load(&sample()).unwrap();
        assert_eq!(
            store.selection().iter().copied().collect::<Vec<_>>(),
            vec![2, 4, 5, 6]
        );
    }

    #[test]
    fn test_empty_text_is_parse_error_and_keeps_previous() {
        let mut store = DocumentStore::new();
        assert!(matches!(store.load("   \n "), Err(ParseError::Empty)));
        assert!(store.document().is_none());

        store.load(&sample()).unwrap();
        store.select_sections([3]);
        assert!(store.load("").is_err());
        assert_eq!(store.document().unwrap().sections().len(), 7);
        assert!(store.is_selected(3));
    }

    #[test]
    fn test_empty_selection_gives_empty_knowledge() {
        let mut store = DocumentStore::new();
        store.load(&sample()).unwrap();
        store.select_sections([]);
        assert_eq!(store.active_knowledge_text(), "");
    }

    #[test]
    fn test_no_document_gives_empty_knowledge() {
        let mut store = DocumentStore::new();
        assert_eq!(store.active_knowledge_text(), "");
        store.select_sections([2, 4]);
        assert!(store.selection().is_empty());
    }

    #[test]
    fn test_knowledge_in_ascending_order_regardless_of_selection_order() {
        let mut store = DocumentStore::new();
        store.load(&sample()).unwrap();
        store.select_sections([6, 1, 3]);
        assert_eq!(
            store.active_knowledge_text(),
            "Section 1: Title 1\n\nbody 1\n\nSection 3: Title 3\n\nbody 3\n\nSection 6: Title 6\n\nbody 6"
        );

        store.select_sections([3, 6, 1]);
        let reordered = store.active_knowledge_text();
        store.select_sections([1, 3, 6]);
        assert_eq!(store.active_knowledge_text(), reordered);
    }

    #[test]
    fn test_unknown_indices_ignored() {
        let mut store = DocumentStore::new();
        store.load(&sample()).unwrap();
        store.select_sections([2, 42, 0]);
        assert_eq!(store.selection().iter().copied().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn test_load_sections_validates_order() {
        let mut store = DocumentStore::new();
        let err = store
            .load_sections(
                "raw",
                vec![Section::new(3, "C", "c"), Section::new(2, "B", "b")],
            )
            .unwrap_err();
        assert!(matches!(err, ParseError::InvalidSections(_)));

        let err = store
            .load_sections("raw", vec![Section::new(0, "Z", "z")])
            .unwrap_err();
        assert!(matches!(err, ParseError::InvalidSections(_)));

        let doc = store
            .load_sections(
                "raw",
                vec![Section::new(2, "B", "b"), Section::new(5, "E", "e")],
            )
            .unwrap();
        assert_eq!(doc.missing_sections(), vec![1, 3, 4]);
        assert_eq!(store.selection().iter().copied().collect::<Vec<_>>(), vec![2, 5]);
    }

    #[test]
    fn test_preamble_kept_only_in_raw_text() {
        let mut store = DocumentStore::new();
        let text = "ประกาศจังหวัด\n1. One\na\n2. Two\nb";
        let doc = store.load(text).unwrap();
        assert_eq!(doc.raw_text(), text);
        assert_eq!(doc.sections().len(), 2);

        store.select_sections([1, 2]);
        assert!(!store.active_knowledge_text().contains("ประกาศจังหวัด"));
    }

    #[test]
    fn test_untitled_section_render() {
        assert_eq!(Section::new(1, "", "text").render(), "Section 1\n\ntext");
    }
}
