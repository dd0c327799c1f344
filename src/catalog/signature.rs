//! Signature definitions
//!
//! Catalog files are deserialized into [`SignatureSpec`] and compiled into
//! [`Signature`]s. Compilation is where every glob and regex is validated, so a
//! compiled signature can be evaluated without further error handling.

use glob::Pattern;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{Category, Language, Result, ScanError};

// =============================================================================
// Rule groups and sides
// =============================================================================

/// Group a rule belongs to; `require` lists groups that must each be satisfied
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum RuleGroup {
    File,
    Path,
    Content,
}

impl fmt::Display for RuleGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Path => write!(f, "path"),
            Self::Content => write!(f, "content"),
        }
    }
}

/// Where a framework runs; drives the project-type decision
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Server,
    Client,
}

// =============================================================================
// Raw catalog entries
// =============================================================================

/// One rule as written in a catalog file
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RuleSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
    /// Candidate file globs for content and regex rules
    #[serde(default, rename = "in", skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f32>,
}

/// One signature as written in a catalog file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SignatureSpec {
    pub id: String,
    pub name: String,
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side: Option<Side>,
    pub weight: f32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub require: Vec<RuleGroup>,
    pub rules: Vec<RuleSpec>,
}

// =============================================================================
// Compiled rules
// =============================================================================

#[derive(Debug, Clone)]
pub enum ContentPattern {
    Substring(String),
    Regex(Regex),
}

impl ContentPattern {
    pub fn is_match(&self, text: &str) -> bool {
        match self {
            Self::Substring(needle) => text.contains(needle.as_str()),
            Self::Regex(re) => re.is_match(text),
        }
    }
}

/// File-name glob, matched against the relative path when it contains `/`
#[derive(Debug, Clone)]
pub struct FileGlob {
    pattern: Pattern,
    whole_path: bool,
}

impl FileGlob {
    pub fn new(raw: &str) -> std::result::Result<Self, glob::PatternError> {
        Ok(Self {
            pattern: Pattern::new(raw)?,
            whole_path: raw.contains('/'),
        })
    }

    /// Match a file given its relative path (`/`-separated)
    pub fn matches(&self, relative_path: &str) -> bool {
        if self.whole_path {
            self.pattern.matches(relative_path)
        } else {
            let name = relative_path.rsplit('/').next().unwrap_or(relative_path);
            self.pattern.matches(name)
        }
    }

    pub fn as_str(&self) -> &str {
        self.pattern.as_str()
    }
}

/// A compiled match rule
#[derive(Debug, Clone)]
pub enum MatchRule {
    FileGlob {
        glob: FileGlob,
        weight: f32,
    },
    PathSubstring {
        needle: String,
        weight: f32,
    },
    Content {
        pattern: ContentPattern,
        candidates: Vec<FileGlob>,
        weight: f32,
    },
}

impl MatchRule {
    pub fn group(&self) -> RuleGroup {
        match self {
            Self::FileGlob { .. } => RuleGroup::File,
            Self::PathSubstring { .. } => RuleGroup::Path,
            Self::Content { .. } => RuleGroup::Content,
        }
    }

    pub fn weight(&self) -> f32 {
        match self {
            Self::FileGlob { weight, .. }
            | Self::PathSubstring { weight, .. }
            | Self::Content { weight, .. } => *weight,
        }
    }

    fn compile(spec: &RuleSpec, signature_id: &str) -> Result<Self> {
        let weight = spec.weight.unwrap_or(1.0);
        if !(weight.is_finite() && weight > 0.0) {
            return Err(ScanError::catalog(format!(
                "signature '{}': rule weight must be positive, got {}",
                signature_id, weight
            )));
        }

        let forms = [&spec.file, &spec.path, &spec.content, &spec.regex]
            .iter()
            .filter(|f| f.is_some())
            .count();
        if forms != 1 {
            return Err(ScanError::catalog(format!(
                "signature '{}': each rule needs exactly one of file, path, content, regex",
                signature_id
            )));
        }

        let bad_glob = |raw: &str, e: glob::PatternError| {
            ScanError::catalog(format!(
                "signature '{}': invalid glob '{}': {}",
                signature_id, raw, e
            ))
        };

        if let Some(raw) = &spec.file {
            let glob = FileGlob::new(raw).map_err(|e| bad_glob(raw, e))?;
            return Ok(Self::FileGlob { glob, weight });
        }

        if let Some(needle) = &spec.path {
            if needle.is_empty() {
                return Err(ScanError::catalog(format!(
                    "signature '{}': empty path rule",
                    signature_id
                )));
            }
            return Ok(Self::PathSubstring {
                needle: needle.clone(),
                weight,
            });
        }

        if spec.candidates.is_empty() {
            return Err(ScanError::catalog(format!(
                "signature '{}': content rules must list candidate files with `in`",
                signature_id
            )));
        }
        let candidates = spec
            .candidates
            .iter()
            .map(|raw| FileGlob::new(raw).map_err(|e| bad_glob(raw, e)))
            .collect::<Result<Vec<_>>>()?;

        let pattern = match (&spec.content, &spec.regex) {
            (Some(needle), _) if !needle.is_empty() => ContentPattern::Substring(needle.clone()),
            (_, Some(raw)) => ContentPattern::Regex(Regex::new(raw).map_err(|e| {
                ScanError::catalog(format!(
                    "signature '{}': invalid regex '{}': {}",
                    signature_id, raw, e
                ))
            })?),
            _ => {
                return Err(ScanError::catalog(format!(
                    "signature '{}': empty content rule",
                    signature_id
                )));
            }
        };

        Ok(Self::Content {
            pattern,
            candidates,
            weight,
        })
    }
}

impl fmt::Display for MatchRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FileGlob { glob, .. } => write!(f, "file {}", glob.as_str()),
            Self::PathSubstring { needle, .. } => write!(f, "path {}", needle),
            Self::Content {
                pattern,
                candidates,
                ..
            } => {
                let scope = candidates
                    .iter()
                    .map(|c| c.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                match pattern {
                    ContentPattern::Substring(s) => write!(f, "content {:?} in [{}]", s, scope),
                    ContentPattern::Regex(re) => write!(f, "regex /{}/ in [{}]", re.as_str(), scope),
                }
            }
        }
    }
}

// =============================================================================
// Signature
// =============================================================================

/// A compiled, immutable signature
#[derive(Debug, Clone)]
pub struct Signature {
    pub id: String,
    pub name: String,
    pub category: Category,
    pub language: Option<Language>,
    pub side: Option<Side>,
    /// Confidence ceiling in (0, 1]
    pub weight: f32,
    pub require: Vec<RuleGroup>,
    pub rules: Vec<MatchRule>,
}

impl Signature {
    pub fn compile(spec: &SignatureSpec) -> Result<Self> {
        let id = spec.id.trim();
        if id.is_empty() {
            return Err(ScanError::catalog("signature with empty id"));
        }
        if !(spec.weight > 0.0 && spec.weight <= 1.0) {
            return Err(ScanError::catalog(format!(
                "signature '{}': weight must be in (0, 1], got {}",
                id, spec.weight
            )));
        }
        if spec.rules.is_empty() {
            return Err(ScanError::catalog(format!(
                "signature '{}': at least one rule is required",
                id
            )));
        }

        let rules = spec
            .rules
            .iter()
            .map(|rule| MatchRule::compile(rule, id))
            .collect::<Result<Vec<_>>>()?;

        let mut require = spec.require.clone();
        require.sort();
        require.dedup();
        for group in &require {
            if !rules.iter().any(|r| r.group() == *group) {
                return Err(ScanError::catalog(format!(
                    "signature '{}': required group '{}' has no rules",
                    id, group
                )));
            }
        }

        Ok(Self {
            id: id.to_string(),
            name: spec.name.clone(),
            category: spec.category,
            language: spec.language,
            side: spec.side,
            weight: spec.weight,
            require,
            rules,
        })
    }

    pub fn total_rule_weight(&self) -> f32 {
        self.rules.iter().map(MatchRule::weight).sum()
    }

    pub fn has_content_rules(&self) -> bool {
        self.rules.iter().any(|r| r.group() == RuleGroup::Content)
    }
}
