//! Signatures Command
//!
//! List the effective signature catalog, optionally for one category.
//!
//! Usage:
//!   stackscope signatures [--category web] [--format json]

use std::path::Path;

use console::style;
use serde::Serialize;

use crate::catalog::{Catalog, Signature};
use crate::cli::ui::{Output, OutputFormat};
use crate::cli::util::load_config;
use crate::types::{Category, Result, ScanError};

#[derive(Debug, Serialize, PartialEq)]
struct SignatureRow<'a> {
    id: &'a str,
    name: &'a str,
    category: Category,
    #[serde(skip_serializing_if = "Option::is_none")]
    language: Option<&'static str>,
    weight: f32,
    rules: usize,
}

impl<'a> From<&'a Signature> for SignatureRow<'a> {
    fn from(sig: &'a Signature) -> Self {
        Self {
            id: &sig.id,
            name: &sig.name,
            category: sig.category,
            language: sig.language.map(|l| l.as_str()),
            weight: sig.weight,
            rules: sig.rules.len(),
        }
    }
}

pub fn run(config_path: Option<&Path>, category: Option<&str>, format: &str) -> Result<()> {
    let format: OutputFormat = format.parse()?;
    let category = category
        .map(|c| c.parse::<Category>().map_err(ScanError::Config))
        .transpose()?;

    let config = load_config(config_path)?;
    let catalog = Catalog::load(&config.catalog)?;
    let rows = rows(&catalog, category);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
        OutputFormat::Text => print_table(&catalog, &rows),
    }
    Ok(())
}

fn rows(catalog: &Catalog, category: Option<Category>) -> Vec<SignatureRow<'_>> {
    match category {
        Some(cat) => catalog.by_category(cat).map(SignatureRow::from).collect(),
        None => catalog
            .categories()
            .flat_map(|cat| catalog.by_category(cat))
            .map(SignatureRow::from)
            .collect(),
    }
}

fn print_table(catalog: &Catalog, rows: &[SignatureRow<'_>]) {
    let output = Output::new();
    output.header("Signature catalog");
    let mut current = None;
    for row in rows {
        if current != Some(row.category) {
            current = Some(row.category);
            output.section(row.category.as_str());
        }
        println!(
            "  {:<22} {:<28} {:<11} {:.2}  {} rules",
            style(row.id).bold(),
            row.name,
            row.language.unwrap_or("-"),
            row.weight,
            row.rules
        );
    }
    println!();
    println!("{} of {} signatures", rows.len(), catalog.len());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_filter() {
        let catalog = Catalog::builtin().unwrap();
        let testing = rows(&catalog, Some(Category::Testing));
        assert!(!testing.is_empty());
        assert!(testing.iter().all(|r| r.category == Category::Testing));
        assert!(testing.iter().any(|r| r.id == "pytest"));
        assert_eq!(rows(&catalog, None).len(), catalog.len());
    }
}
