use anyhow::{Context, Result};
use rehearsal_types::{CvSections, SectionRecord};
use std::fs;
use std::path::Path;

/// Reads a JSON file of CV sections, in the shape the CV ingestion endpoint
/// returns (`{"projects": [{"title": ..., "text": ...}], ...}`).
pub fn load_sections(path: &Path) -> Result<CvSections> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read sections file: {}", path.display()))?;
    let sections: CvSections = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse sections file: {}", path.display()))?;
    if sections.is_empty() {
        anyhow::bail!("Sections file contains no sections: {}", path.display());
    }
    Ok(sections)
}

/// Numbered listing of every section, grouped by category. Numbers start at 1
/// and follow `CvSections::flatten` order.
pub fn listing(sections: &CvSections) -> String {
    let mut lines = Vec::new();
    let mut number = 1;
    for (category, records) in sections.categories() {
        if records.is_empty() {
            continue;
        }
        lines.push(format!("{category}:"));
        for record in records {
            lines.push(format!("  {number:>2}. {}", record.title));
            number += 1;
        }
    }
    lines.join("\n")
}

/// Resolves a 1-based choice typed by the user.
pub fn choose<'a>(sections: &'a [(&'a str, &'a SectionRecord)], input: &str) -> Option<&'a SectionRecord> {
    let number: usize = input.trim().parse().ok()?;
    let index = number.checked_sub(1)?;
    sections.get(index).map(|(_, record)| *record)
}
