//! Template catalog
//!
//! In-memory index of named interview templates, grouped by category. The
//! catalog is read-only after construction; lookup is deterministic and
//! stable in declaration order.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// A named, categorized bundle of interview parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    #[serde(default, rename = "subTitle")]
    pub sub_title: String,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub questions: Vec<String>,
}

/// Mapping of category name to templates, preserving the declaration order
/// of the source JSON.
#[derive(Debug, Clone, Default)]
pub struct TemplateCatalog {
    categories: Vec<(String, Vec<Template>)>,
}

impl TemplateCatalog {
    pub fn new(categories: Vec<(String, Vec<Template>)>) -> Self {
        Self { categories }
    }

    /// Parse a catalog from its JSON representation: an object mapping
    /// category name to an array of templates.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let map: serde_json::Map<String, serde_json::Value> = serde_json::from_str(raw)?;
        let mut categories = Vec::with_capacity(map.len());
        for (category, value) in map {
            let templates: Vec<Template> = serde_json::from_value(value)?;
            categories.push((category, templates));
        }
        Ok(Self { categories })
    }

    /// Load a catalog from a JSON file. A missing or malformed file
    /// degrades to an empty catalog rather than failing the session.
    pub fn load(path: &Path) -> Self {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Could not read templates {}: {}", path.display(), e);
                return Self::default();
            }
        };
        match Self::from_json(&raw) {
            Ok(catalog) => catalog,
            Err(e) => {
                warn!("Could not parse templates {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.categories.iter().all(|(_, templates)| templates.is_empty())
    }

    pub fn categories(&self) -> impl Iterator<Item = (&str, &[Template])> {
        self.categories
            .iter()
            .map(|(name, templates)| (name.as_str(), templates.as_slice()))
    }

    /// Find a template whose subtitle matches the query.
    ///
    /// Matching order, all case-insensitive and stable in declaration
    /// order: an exact subtitle match wins over any substring match; a
    /// substring match (in either direction) wins over the fallback; the
    /// fallback is the first template with a non-empty subtitle.
    pub fn find_by_subtitle(&self, query: &str) -> Option<(&str, &Template)> {
        let target = query.trim().to_lowercase();
        if target.is_empty() {
            return None;
        }

        let mut fallback: Option<(&str, &Template)> = None;
        let mut substring: Option<(&str, &Template)> = None;

        for (category, templates) in &self.categories {
            for template in templates {
                let sub = template.sub_title.trim();
                if sub.is_empty() {
                    continue;
                }
                let sub_lower = sub.to_lowercase();
                if sub_lower == target {
                    return Some((category, template));
                }
                if substring.is_none()
                    && (sub_lower.contains(&target) || target.contains(&sub_lower))
                {
                    substring = Some((category, template));
                }
                if fallback.is_none() {
                    fallback = Some((category, template));
                }
            }
        }

        substring.or(fallback)
    }

    /// Pick the default template for a fresh session.
    ///
    /// If a preferred subtitle is configured it takes precedence; otherwise
    /// the first template of the preferred category, then the first
    /// template of the first non-empty category.
    pub fn default_template(
        &self,
        preferred_category: &str,
        preferred_subtitle: Option<&str>,
    ) -> Option<(&str, &Template)> {
        if let Some(subtitle) = preferred_subtitle {
            if !subtitle.trim().is_empty() {
                if let Some(found) = self.find_by_subtitle(subtitle) {
                    return Some(found);
                }
            }
        }

        if let Some((category, templates)) = self
            .categories
            .iter()
            .find(|(name, _)| name == preferred_category)
        {
            if let Some(first) = templates.first() {
                return Some((category, first));
            }
        }

        self.categories
            .iter()
            .find_map(|(category, templates)| {
                templates.first().map(|first| (category.as_str(), first))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> TemplateCatalog {
        TemplateCatalog::from_json(
            r#"{
                "Software": [
                    {"subTitle": "Backend Engineer", "difficulty": "medium", "duration_minutes": 30, "questions": ["Q1"]},
                    {"subTitle": "Frontend Engineer", "questions": ["Q2"]}
                ],
                "Design": [
                    {"subTitle": "Product Designer", "questions": []}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn finds_by_substring() {
        let catalog = catalog();
        let (category, template) = catalog.find_by_subtitle("backend").unwrap();
        assert_eq!(category, "Software");
        assert_eq!(template.sub_title, "Backend Engineer");
    }

    #[test]
    fn exact_match_preferred_over_substring() {
        let catalog = TemplateCatalog::from_json(
            r#"{
                "A": [{"subTitle": "Senior Backend Engineer"}],
                "B": [{"subTitle": "Backend"}]
            }"#,
        )
        .unwrap();

        // "Senior Backend Engineer" contains "backend" and appears first,
        // but the exact match in category B must win.
        let (category, template) = catalog.find_by_subtitle("Backend").unwrap();
        assert_eq!(category, "B");
        assert_eq!(template.sub_title, "Backend");
    }

    #[test]
    fn substring_matches_either_direction() {
        let catalog = catalog();
        // Query containing the subtitle also matches.
        let (_, template) = catalog
            .find_by_subtitle("experienced frontend engineer position")
            .unwrap();
        assert_eq!(template.sub_title, "Frontend Engineer");
    }

    #[test]
    fn falls_back_to_first_nonempty_subtitle() {
        let catalog = catalog();
        let (category, template) = catalog.find_by_subtitle("nonexistent role").unwrap();
        assert_eq!(category, "Software");
        assert_eq!(template.sub_title, "Backend Engineer");
    }

    #[test]
    fn empty_query_and_empty_catalog_return_none() {
        let catalog = catalog();
        assert!(catalog.find_by_subtitle("").is_none());
        assert!(catalog.find_by_subtitle("   ").is_none());

        let empty = TemplateCatalog::default();
        assert!(empty.find_by_subtitle("backend").is_none());
    }

    #[test]
    fn default_template_prefers_subtitle_then_category() {
        let catalog = catalog();

        let (_, template) = catalog
            .default_template("Design", Some("frontend"))
            .unwrap();
        assert_eq!(template.sub_title, "Frontend Engineer");

        let (category, template) = catalog.default_template("Design", None).unwrap();
        assert_eq!(category, "Design");
        assert_eq!(template.sub_title, "Product Designer");

        // Unknown preferred category falls back to the first non-empty one.
        let (category, _) = catalog.default_template("Finance", None).unwrap();
        assert_eq!(category, "Software");
    }

    #[test]
    fn declaration_order_is_preserved() {
        let catalog = TemplateCatalog::from_json(
            r#"{"Zeta": [{"subTitle": "Z"}], "Alpha": [{"subTitle": "A"}]}"#,
        )
        .unwrap();
        let names: Vec<&str> = catalog.categories().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["Zeta", "Alpha"]);
    }

    #[test]
    fn malformed_file_degrades_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("templates.json");
        std::fs::write(&path, "{not json").unwrap();

        let catalog = TemplateCatalog::load(&path);
        assert!(catalog.is_empty());

        let missing = TemplateCatalog::load(&dir.path().join("absent.json"));
        assert!(missing.is_empty());
    }
}
