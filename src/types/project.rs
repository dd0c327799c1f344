//! Project-level type definitions
//!
//! Contains types used for project discovery and classification.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use super::ProjectId;
use super::error::ScanIssue;
use super::service::ServiceFacts;

// =============================================================================
// Language
// =============================================================================

/// Programming language or markup family of a project
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    Java,
    Kotlin,
    Scala,
    Go,
    Rust,
    Ruby,
    Php,
    CSharp,
    Swift,
    Dart,
    Elixir,
    C,
    Cpp,
    Html,
    Css,
    Shell,
    #[default]
    Unknown,
}

impl Language {
    /// Map a file extension (without dot, any case) to a language
    pub fn from_extension(ext: &str) -> Option<Self> {
        let lang = match ext.to_ascii_lowercase().as_str() {
            "py" | "pyi" => Self::Python,
            "js" | "jsx" | "mjs" | "cjs" => Self::JavaScript,
            "ts" | "tsx" | "mts" | "cts" => Self::TypeScript,
            "java" => Self::Java,
            "kt" | "kts" => Self::Kotlin,
            "scala" | "sc" => Self::Scala,
            "go" => Self::Go,
            "rs" => Self::Rust,
            "rb" => Self::Ruby,
            "php" => Self::Php,
            "cs" => Self::CSharp,
            "swift" => Self::Swift,
            "dart" => Self::Dart,
            "ex" | "exs" => Self::Elixir,
            "c" | "h" => Self::C,
            "cpp" | "cc" | "cxx" | "hpp" | "hh" => Self::Cpp,
            "html" | "htm" | "vue" | "svelte" => Self::Html,
            "css" | "scss" | "sass" | "less" => Self::Css,
            "sh" | "bash" | "zsh" => Self::Shell,
            _ => return None,
        };
        Some(lang)
    }

    /// Markup and stylesheet languages never win the primary-language vote over code
    pub fn is_markup(&self) -> bool {
        matches!(self, Self::Html | Self::Css)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::JavaScript => "javascript",
            Self::TypeScript => "typescript",
            Self::Java => "java",
            Self::Kotlin => "kotlin",
            Self::Scala => "scala",
            Self::Go => "go",
            Self::Rust => "rust",
            Self::Ruby => "ruby",
            Self::Php => "php",
            Self::CSharp => "csharp",
            Self::Swift => "swift",
            Self::Dart => "dart",
            Self::Elixir => "elixir",
            Self::C => "c",
            Self::Cpp => "cpp",
            Self::Html => "html",
            Self::Css => "css",
            Self::Shell => "shell",
            Self::Unknown => "unknown",
        }
    }

    /// Languages sharing an ecosystem (TypeScript projects use JavaScript tooling)
    pub fn shares_ecosystem(&self, other: Language) -> bool {
        *self == other
            || matches!(
                (self, other),
                (Self::JavaScript, Self::TypeScript) | (Self::TypeScript, Self::JavaScript)
            )
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Signature category
// =============================================================================

/// Category of a signature, used for grouping and tie-breaking
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Web,
    Frontend,
    Api,
    Database,
    DataScience,
    Messaging,
    /// Architecture indicators: discovery, gateways, health checks, circuit breakers
    Microservice,
    Testing,
    Devops,
    BuildTool,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Self::Web,
        Self::Frontend,
        Self::Api,
        Self::Database,
        Self::DataScience,
        Self::Messaging,
        Self::Microservice,
        Self::Testing,
        Self::Devops,
        Self::BuildTool,
    ];

    /// Tie-break tier: frameworks (0) before libraries (1) before tooling (2)
    pub fn tier(&self) -> u8 {
        match self {
            Self::Web | Self::Frontend | Self::Api => 0,
            Self::Database | Self::DataScience | Self::Messaging => 1,
            Self::Microservice | Self::Testing | Self::Devops | Self::BuildTool => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::Frontend => "frontend",
            Self::Api => "api",
            Self::Database => "database",
            Self::DataScience => "data-science",
            Self::Messaging => "messaging",
            Self::Microservice => "microservice",
            Self::Testing => "testing",
            Self::Devops => "devops",
            Self::BuildTool => "build-tool",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|c| c.as_str() == s.to_lowercase())
            .copied()
            .ok_or_else(|| {
                format!(
                    "Unknown category: {}. Valid values: {}",
                    s,
                    Self::ALL.map(|c| c.as_str()).join(", ")
                )
            })
    }
}

// =============================================================================
// Project type & confidence level
// =============================================================================

/// Project type classification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectType {
    Library,
    Service,
    Frontend,
    #[default]
    Unknown,
}

impl std::fmt::Display for ProjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Library => write!(f, "library"),
            Self::Service => write!(f, "service"),
            Self::Frontend => write!(f, "frontend"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Textual bucket for a confidence score
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum ConfidenceLevel {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl ConfidenceLevel {
    pub fn from_score(score: f32) -> Self {
        if score >= 0.9 {
            Self::VeryHigh
        } else if score >= 0.75 {
            Self::High
        } else if score >= 0.5 {
            Self::Medium
        } else if score >= 0.25 {
            Self::Low
        } else {
            Self::VeryLow
        }
    }
}

impl std::fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::VeryHigh => write!(f, "Very High"),
            Self::High => write!(f, "High"),
            Self::Medium => write!(f, "Medium"),
            Self::Low => write!(f, "Low"),
            Self::VeryLow => write!(f, "Very Low"),
        }
    }
}

// =============================================================================
// Discovery & classification results
// =============================================================================

/// A directory boundary discovered by the walker
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectRoot {
    pub id: ProjectId,
    /// Absolute path of the project directory
    pub path: PathBuf,
    /// Path relative to the scan root ("" for the root itself)
    pub relative_path: String,
    /// Marker files that identified the directory
    pub markers: Vec<String>,
    /// Depth below the scan root (root = 0)
    pub depth: usize,
}

impl ProjectRoot {
    /// Display name: directory name, or the relative path for the scan root
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.to_string_lossy().to_string())
    }

    pub fn has_marker(&self, marker: &str) -> bool {
        self.markers.iter().any(|m| m == marker)
    }
}

/// One matched signature for a project
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FrameworkMatch {
    pub signature_id: String,
    pub name: String,
    pub category: Category,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,
    /// Normalized score in (0, 1]
    pub confidence: f32,
    /// Relative paths of files that satisfied rules
    pub evidence: Vec<String>,
}

impl FrameworkMatch {
    pub fn level(&self) -> ConfidenceLevel {
        ConfidenceLevel::from_score(self.confidence)
    }
}

/// File and line statistics for one project
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileStats {
    pub file_count: usize,
    pub total_bytes: u64,
    /// Lines counted in text files that were read (bounded by the read limit)
    pub line_count: usize,
    /// Lowercase extension (without dot) to file count
    pub extensions: BTreeMap<String, usize>,
    pub skipped_files: usize,
}

/// Classification outcome for one project root
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectResult {
    pub id: ProjectId,
    pub root: ProjectRoot,
    pub name: String,
    pub primary_language: Language,
    pub project_type: ProjectType,
    /// Descending confidence; consumers must keep this order
    pub matches: Vec<FrameworkMatch>,
    pub stats: FileStats,
    pub facts: ServiceFacts,
    /// Per-project warnings (skipped files and similar)
    pub issues: Vec<ScanIssue>,
    /// Set when classification failed and the result carries no matches
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ScanIssue>,
}

impl ProjectResult {
    /// Minimal result for a project whose classification failed
    pub fn failed(root: ProjectRoot, error: ScanIssue) -> Self {
        Self {
            id: root.id,
            name: root.name(),
            root,
            primary_language: Language::Unknown,
            project_type: ProjectType::Unknown,
            matches: Vec::new(),
            stats: FileStats::default(),
            facts: ServiceFacts::default(),
            issues: Vec::new(),
            error: Some(error),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    pub fn top_match(&self) -> Option<&FrameworkMatch> {
        self.matches.first()
    }

    pub fn find_match(&self, signature_id: &str) -> Option<&FrameworkMatch> {
        self.matches.iter().find(|m| m.signature_id == signature_id)
    }

    pub fn has_category(&self, category: Category) -> bool {
        self.matches.iter().any(|m| m.category == category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_from_extension() {
        assert_eq!(Language::from_extension("py"), Some(Language::Python));
        assert_eq!(Language::from_extension("TSX"), Some(Language::TypeScript));
        assert_eq!(Language::from_extension("md"), None);
    }

    #[test]
    fn test_category_tiers() {
        assert!(Category::Web.tier() < Category::Database.tier());
        assert!(Category::Messaging.tier() < Category::BuildTool.tier());
        assert_eq!(Category::Frontend.tier(), Category::Api.tier());
    }

    #[test]
    fn test_category_from_str() {
        assert_eq!("data-science".parse::<Category>(), Ok(Category::DataScience));
        assert!("orm".parse::<Category>().is_err());
    }

    #[test]
    fn test_confidence_levels() {
        assert_eq!(ConfidenceLevel::from_score(0.95), ConfidenceLevel::VeryHigh);
        assert_eq!(ConfidenceLevel::from_score(0.8), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_score(0.5), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_score(0.3), ConfidenceLevel::Low);
        assert_eq!(ConfidenceLevel::from_score(0.1), ConfidenceLevel::VeryLow);
        assert_eq!(ConfidenceLevel::VeryHigh.to_string(), "Very High");
    }

    #[test]
    fn test_failed_result_is_minimal() {
        let root = ProjectRoot {
            id: ProjectId::new(3),
            path: PathBuf::from("/work/orders"),
            relative_path: "orders".to_string(),
            markers: vec!["package.json".to_string()],
            depth: 1,
        };
        let issue = ScanIssue::new(super::super::ErrorKind::ProjectUnreadable, "gone");
        let result = ProjectResult::failed(root, issue);
        assert!(result.is_failed());
        assert!(result.matches.is_empty());
        assert_eq!(result.name, "orders");
        assert_eq!(result.id, ProjectId::new(3));
    }
}
