use std::collections::{BTreeMap, BTreeSet};

use crate::analyzer::scanner::ProjectListing;
use crate::catalog::{Catalog, Side};
use crate::constants::walk::DESCRIPTOR_MARKERS;
use crate::types::{
    Category, FileStats, FrameworkMatch, Language, ProjectRoot, ProjectType, ServiceFacts,
};

/// Signature ids that describe container or orchestration descriptors
const CONTAINER_SIGNATURES: &[&str] = &["docker", "docker-compose", "kubernetes"];


/// Code languages by file count
pub fn language_histogram(stats: &FileStats) -> BTreeMap<Language, usize> {
    let mut histogram = BTreeMap::new();
    for (ext, count) in &stats.extensions {
        if let Some(lang) = Language::from_extension(ext) {
            *histogram.entry(lang).or_insert(0) += count;
        }
    }
    histogram
}

/// Primary language of a project
///
/// The highest-ranked match that names a language wins; JavaScript is refined to
/// TypeScript when TypeScript files dominate. Without such a match the extension
/// histogram decides, preferring code over markup.
pub fn primary_language(ranked: &[FrameworkMatch], stats: &FileStats) -> Language {
    let histogram = language_histogram(stats);

    if let Some(lang) = ranked.iter().find_map(|m| m.language) {
        let count = |l: Language| histogram.get(&l).copied().unwrap_or(0);
        if lang.shares_ecosystem(Language::TypeScript)
            && count(Language::TypeScript) > count(Language::JavaScript)
        {
            return Language::TypeScript;
        }
        return lang;
    }

    let best = |markup: bool| {
        histogram
            .iter()
            .filter(|(lang, _)| lang.is_markup() == markup)
            .max_by(|(la, ca), (lb, cb)| ca.cmp(cb).then_with(|| lb.cmp(la)))
            .map(|(lang, _)| *lang)
    };
    best(false).or_else(|| best(true)).unwrap_or_default()
}

/// Languages present in the project, used to filter language-specific sub-passes
pub fn present_languages(stats: &FileStats, primary: Language) -> BTreeSet<Language> {
    let mut present: BTreeSet<Language> = language_histogram(stats).into_keys().collect();
    if primary != Language::Unknown {
        present.insert(primary);
    }
    present
}

pub fn language_applies(signature_language: Option<Language>, present: &BTreeSet<Language>) -> bool {
    match signature_language {
        None => true,
        Some(lang) => present.iter().any(|p| p.shares_ecosystem(lang)),
    }
}

/// Project type from matches, markers and extracted facts
pub fn project_type(
    root: &ProjectRoot,
    matches: &[FrameworkMatch],
    catalog: &Catalog,
    facts: &ServiceFacts,
    primary: Language,
    listing: &ProjectListing,
) -> ProjectType {
    let side = |m: &FrameworkMatch| catalog.get(&m.signature_id).and_then(|s| s.side);

    let server = matches
        .iter()
        .any(|m| side(m) == Some(Side::Server) || m.category == Category::Messaging);
    let client = matches
        .iter()
        .any(|m| side(m) == Some(Side::Client) || m.category == Category::Frontend);
    let container = matches
        .iter()
        .any(|m| CONTAINER_SIGNATURES.contains(&m.signature_id.as_str()))
        || DESCRIPTOR_MARKERS.iter().any(|f| listing.has_file(f));
    let server_code = primary != Language::Unknown && !primary.is_markup();

    if server && (facts.has_entry_point || (container && server_code)) {
        return ProjectType::Service;
    }
    if client {
        return ProjectType::Frontend;
    }
    if root
        .markers
        .iter()
        .any(|m| !DESCRIPTOR_MARKERS.contains(&m.as_str()))
    {
        return ProjectType::Library;
    }
    ProjectType::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProjectId;
    use std::path::PathBuf;

    fn stats(exts: &[(&str, usize)]) -> FileStats {
        FileStats {
            extensions: exts.iter().map(|(e, c)| (e.to_string(), *c)).collect(),
            ..Default::default()
        }
    }

    fn matched(id: &str, category: Category, language: Option<Language>) -> FrameworkMatch {
        FrameworkMatch {
            signature_id: id.to_string(),
            name: id.to_string(),
            category,
            language,
            confidence: 0.5,
            evidence: vec![],
        }
    }

    fn root(markers: &[&str]) -> ProjectRoot {
        ProjectRoot {
            id: ProjectId::new(0),
            path: PathBuf::from("/p"),
            relative_path: "p".to_string(),
            markers: markers.iter().map(|m| m.to_string()).collect(),
            depth: 1,
        }
    }

    #[test]
    fn test_language_from_match() {
        let ranked = vec![matched("flask", Category::Web, Some(Language::Python))];
        assert_eq!(primary_language(&ranked, &stats(&[("js", 10)])), Language::Python);
    }

    #[test]
    fn test_typescript_refinement() {
        let ranked = vec![matched("react", Category::Web, Some(Language::JavaScript))];
        let s = stats(&[("tsx", 12), ("ts", 4), ("js", 2)]);
        assert_eq!(primary_language(&ranked, &s), Language::TypeScript);
    }

    #[test]
    fn test_histogram_fallback_prefers_code() {
        let s = stats(&[("html", 20), ("go", 3), ("md", 40)]);
        assert_eq!(primary_language(&[], &s), Language::Go);
        assert_eq!(primary_language(&[], &stats(&[("css", 2)])), Language::Css);
        assert_eq!(primary_language(&[], &stats(&[("md", 2)])), Language::Unknown);
    }

    #[test]
    fn test_language_applies() {
        let present: BTreeSet<_> = [Language::TypeScript].into_iter().collect();
        assert!(language_applies(None, &present));
        assert!(language_applies(Some(Language::JavaScript), &present));
        assert!(!language_applies(Some(Language::Python), &present));
    }

    #[test]
    fn test_project_types() {
        let catalog = Catalog::builtin().unwrap();
        let listing = ProjectListing::default();
        let mut facts = ServiceFacts::default();

        let react = vec![matched("react", Category::Web, Some(Language::JavaScript))];
        assert_eq!(
            project_type(&root(&["package.json"]), &react, &catalog, &facts, Language::JavaScript, &listing),
            ProjectType::Frontend
        );

        let flask = vec![matched("flask", Category::Web, Some(Language::Python))];
        assert_eq!(
            project_type(&root(&["requirements.txt"]), &flask, &catalog, &facts, Language::Python, &listing),
            ProjectType::Library
        );

        facts.has_entry_point = true;
        assert_eq!(
            project_type(&root(&["requirements.txt"]), &flask, &catalog, &facts, Language::Python, &listing),
            ProjectType::Service
        );

        assert_eq!(
            project_type(&root(&["Dockerfile"]), &[], &catalog, &ServiceFacts::default(), Language::Unknown, &listing),
            ProjectType::Unknown
        );
    }
}
