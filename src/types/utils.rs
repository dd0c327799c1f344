//! Shared utility functions for paths, names and manifest JSON.

use std::path::Path;

// =============================================================================
// JSON Value Extraction Helpers
// =============================================================================

/// Extract string from JSON value by key.
#[inline]
pub fn json_string(value: &serde_json::Value, key: &str) -> Option<String> {
    value.get(key)?.as_str().map(String::from)
}

/// Collect the keys of a JSON object stored under `key`.
pub fn json_object_keys(value: &serde_json::Value, key: &str) -> Vec<String> {
    value
        .get(key)
        .and_then(|v| v.as_object())
        .map(|obj| obj.keys().cloned().collect())
        .unwrap_or_default()
}

// =============================================================================
// Paths & Names
// =============================================================================

/// Path of `path` relative to `root`, with `/` separators ("" for the root itself).
pub fn relative_string(path: &Path, root: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Canonical form used to compare service names across naming conventions.
///
/// `Order-Service`, `order_service` and `orderservice` all normalize to `orderservice`.
pub fn normalize_service_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_relative_string() {
        let root = PathBuf::from("/scan");
        assert_eq!(relative_string(&root.join("a").join("b"), &root), "a/b");
        assert_eq!(relative_string(&root, &root), "");
    }

    #[test]
    fn test_normalize_service_name() {
        assert_eq!(normalize_service_name("Order-Service"), "orderservice");
        assert_eq!(normalize_service_name("order_service"), "orderservice");
        assert_eq!(normalize_service_name("@acme/orders"), "acmeorders");
    }

    #[test]
    fn test_json_helpers() {
        let value: serde_json::Value =
            serde_json::from_str(r#"{"name": "web", "dependencies": {"react": "^18"}}"#).unwrap();
        assert_eq!(json_string(&value, "name"), Some("web".to_string()));
        assert_eq!(json_object_keys(&value, "dependencies"), vec!["react"]);
        assert!(json_object_keys(&value, "devDependencies").is_empty());
    }
}
