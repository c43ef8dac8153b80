use std::collections::BTreeMap;

/// One excerpt of a CV (a project, a job, ...) that an interview is about.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SectionRecord {
    pub title: String,
    pub text: String,
}

impl SectionRecord {
    pub fn new(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
        }
    }
}

/// Sections extracted from a CV, grouped by category ("projects", "experience", ...).
///
/// The ingestion service decides which categories exist, so this is a map rather
/// than a fixed struct. A `BTreeMap` keeps the listing order stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct CvSections {
    categories: BTreeMap<String, Vec<SectionRecord>>,
}

impl CvSections {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_category(mut self, name: &str, sections: Vec<SectionRecord>) -> Self {
        self.categories.insert(name.to_string(), sections);
        self
    }

    pub fn categories(&self) -> impl Iterator<Item = (&str, &[SectionRecord])> {
        self.categories
            .iter()
            .map(|(name, sections)| (name.as_str(), sections.as_slice()))
    }

    /// All sections in listing order, tagged with their category.
    pub fn flatten(&self) -> Vec<(&str, &SectionRecord)> {
        self.categories
            .iter()
            .flat_map(|(name, sections)| sections.iter().map(move |s| (name.as_str(), s)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
