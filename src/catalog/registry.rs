use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::{Arc, RwLock};

use tracing::{debug, info};

use super::signature::{Signature, SignatureSpec};
use crate::config::CatalogConfig;
use crate::types::{Category, Result, ScanError};

const BUILTIN_CATALOG: &str = include_str!("builtin.yaml");

/// On-disk catalog layout (YAML `signatures:` list or TOML `[[signatures]]`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub signatures: Vec<SignatureSpec>,
}

impl CatalogFile {
    pub fn from_yaml_str(source: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(source)?)
    }

    pub fn from_toml_str(source: &str) -> Result<Self> {
        toml::from_str(source).map_err(|e| ScanError::catalog(format!("invalid TOML: {}", e)))
    }

    /// Read a catalog file; the format is chosen by extension (`.toml`, else YAML)
    pub fn read(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|e| {
            ScanError::catalog(format!("cannot read {}: {}", path.display(), e))
        })?;
        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        let parsed = if is_toml {
            Self::from_toml_str(&source)
        } else {
            Self::from_yaml_str(&source)
        };
        parsed.map_err(|e| ScanError::catalog(format!("{}: {}", path.display(), e)))
    }

    fn builtin() -> Result<Self> {
        Self::from_yaml_str(BUILTIN_CATALOG)
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// Immutable, validated set of signatures
///
/// Built once and shared by `Arc`; a reload builds a new catalog and swaps it in
/// through [`SharedCatalog`].
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    signatures: Vec<Signature>,
    by_category: BTreeMap<Category, Vec<usize>>,
}

impl Catalog {
    /// Built-in signatures only
    pub fn builtin() -> Result<Self> {
        Self::from_specs(CatalogFile::builtin()?.signatures)
    }

    pub fn from_yaml_str(source: &str) -> Result<Self> {
        Self::from_specs(CatalogFile::from_yaml_str(source)?.signatures)
    }

    /// Assemble the run catalog: built-ins (when enabled) overridden by the extra file
    pub fn load(config: &CatalogConfig) -> Result<Self> {
        let mut specs = if config.builtin {
            CatalogFile::builtin()?.signatures
        } else {
            Vec::new()
        };

        if let Some(extra) = &config.extra {
            let user = CatalogFile::read(extra)?;
            check_unique(&user.signatures)?;
            info!(
                "Loaded {} signatures from {}",
                user.signatures.len(),
                extra.display()
            );
            specs = merge_by_id(specs, user.signatures);
        }

        if specs.is_empty() {
            return Err(ScanError::catalog("catalog contains no signatures"));
        }

        Self::from_specs(specs)
    }

    /// Compile and index specs; ids must be unique
    pub fn from_specs(specs: Vec<SignatureSpec>) -> Result<Self> {
        check_unique(&specs)?;

        let signatures = specs
            .iter()
            .map(Signature::compile)
            .collect::<Result<Vec<_>>>()?;

        let mut by_category: BTreeMap<Category, Vec<usize>> = BTreeMap::new();
        for (idx, sig) in signatures.iter().enumerate() {
            by_category.entry(sig.category).or_default().push(idx);
        }

        debug!("Catalog compiled: {} signatures", signatures.len());
        Ok(Self {
            signatures,
            by_category,
        })
    }

    /// All signatures in catalog order
    pub fn all_signatures(&self) -> &[Signature] {
        &self.signatures
    }

    pub fn by_category(&self, category: Category) -> impl Iterator<Item = &Signature> {
        self.by_category
            .get(&category)
            .into_iter()
            .flatten()
            .map(|&idx| &self.signatures[idx])
    }

    pub fn get(&self, id: &str) -> Option<&Signature> {
        self.signatures.iter().find(|s| s.id == id)
    }

    pub fn categories(&self) -> impl Iterator<Item = Category> + '_ {
        self.by_category.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }
}

fn check_unique(specs: &[SignatureSpec]) -> Result<()> {
    let mut seen = HashSet::new();
    for spec in specs {
        if !seen.insert(spec.id.trim()) {
            return Err(ScanError::catalog(format!(
                "duplicate signature id '{}'",
                spec.id
            )));
        }
    }
    Ok(())
}

/// Overrides replace same-id entries in place; new ids are appended
fn merge_by_id(mut base: Vec<SignatureSpec>, overrides: Vec<SignatureSpec>) -> Vec<SignatureSpec> {
    for spec in overrides {
        match base.iter_mut().find(|s| s.id == spec.id) {
            Some(existing) => {
                debug!("Signature '{}' overridden", spec.id);
                *existing = spec;
            }
            None => base.push(spec),
        }
    }
    base
}

// =============================================================================
// Shared handle
// =============================================================================

/// Shared catalog handle with whole-catalog swap on reload
///
/// Readers take an `Arc` snapshot and never observe a partially replaced catalog.
#[derive(Debug, Clone)]
pub struct SharedCatalog {
    inner: Arc<RwLock<Arc<Catalog>>>,
}

impl SharedCatalog {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(catalog))),
        }
    }

    pub fn snapshot(&self) -> Arc<Catalog> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Swap in a new catalog; returns the previous snapshot
    pub fn replace(&self, catalog: Catalog) -> Arc<Catalog> {
        let mut guard = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::replace(&mut *guard, Arc::new(catalog))
    }

    /// Rebuild from config; the current catalog stays in place on failure
    pub fn reload(&self, config: &CatalogConfig) -> Result<()> {
        let catalog = Catalog::load(config)?;
        info!("Catalog reloaded: {} signatures", catalog.len());
        self.replace(catalog);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_builtin_catalog_compiles() {
        let catalog = Catalog::builtin().unwrap();
        assert!(catalog.len() > 50);
        for id in [
            "react", "flask", "kafka", "pytest", "docker", "npm", "bottle", "keras", "peewee",
            "jasmine", "circleci", "aws", "eslint", "grunt", "circuit-breaker", "health-endpoint",
        ] {
            assert!(catalog.get(id).is_some(), "missing builtin signature {}", id);
        }
        for category in Category::ALL {
            assert!(
                catalog.by_category(category).next().is_some(),
                "no builtin signature in {}",
                category
            );
        }
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let yaml = r#"
signatures:
  - id: a
    name: A
    category: web
    weight: 0.5
    rules: [{file: a.txt}]
  - id: a
    name: A again
    category: web
    weight: 0.5
    rules: [{file: b.txt}]
"#;
        let err = Catalog::from_yaml_str(yaml).unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let yaml = r#"
signatures:
  - id: a
    name: A
    category: web
    weight: 0.5
    rules: [{glob: a.txt}]
"#;
        assert!(Catalog::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn test_user_catalog_overrides_and_extends() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("extra.toml");
        std::fs::write(
            &path,
            r#"
[[signatures]]
id = "react"
name = "React (custom)"
category = "web"
language = "javascript"
weight = 1.0
rules = [{ file = "react.marker" }]

[[signatures]]
id = "acme-rpc"
name = "Acme RPC"
category = "api"
weight = 0.5
rules = [{ content = "acme.rpc", in = ["*.py"] }]
"#,
        )
        .unwrap();

        let builtin_len = Catalog::builtin().unwrap().len();
        let catalog = Catalog::load(&CatalogConfig {
            builtin: true,
            extra: Some(path),
        })
        .unwrap();

        assert_eq!(catalog.len(), builtin_len + 1);
        assert_eq!(catalog.get("react").unwrap().name, "React (custom)");
        assert!(catalog.get("acme-rpc").is_some());
    }

    #[test]
    fn test_missing_user_catalog_is_fatal() {
        let err = Catalog::load(&CatalogConfig {
            builtin: true,
            extra: Some("/nonexistent/catalog.yaml".into()),
        })
        .unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_snapshot_survives_reload() {
        let shared = SharedCatalog::new(Catalog::builtin().unwrap());
        let before = shared.snapshot();

        let replacement = Catalog::from_yaml_str(
            "signatures:\n  - {id: only, name: Only, category: web, weight: 1.0, rules: [{file: x}]}\n",
        )
        .unwrap();
        shared.replace(replacement);

        assert!(before.get("react").is_some());
        assert_eq!(shared.snapshot().len(), 1);
        assert!(shared.snapshot().get("react").is_none());
    }
}
