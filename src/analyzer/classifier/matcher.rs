//! Generic signature matcher
//!
//! One evaluator for every rule kind. A signature matches when each required
//! rule group has a satisfied rule (or, without required groups, when any rule
//! is satisfied). Confidence is the signature weight scaled by the satisfied
//! share of total rule weight.

use std::cmp::Ordering;
use std::path::Path;

use super::content::ContentCache;
use crate::analyzer::scanner::ProjectListing;
use crate::catalog::{MatchRule, RuleGroup, Signature};
use crate::constants::classify::{MAX_CANDIDATES_PER_RULE, MAX_EVIDENCE_PER_MATCH};
use crate::engine::Budget;
use crate::types::{FrameworkMatch, Result};

/// Inputs shared by every signature evaluation of one project
pub struct MatchContext<'a> {
    pub root: &'a Path,
    pub listing: &'a ProjectListing,
    pub cache: &'a mut ContentCache,
    pub budget: &'a Budget,
}

impl MatchContext<'_> {
    /// Evidence path for the first file or directory satisfying `rule`
    fn satisfy(&mut self, rule: &MatchRule) -> Result<Option<String>> {
        match rule {
            MatchRule::FileGlob { glob, .. } => Ok(self
                .listing
                .files
                .iter()
                .find(|f| glob.matches(&f.relative))
                .map(|f| f.relative.clone())),
            MatchRule::PathSubstring { needle, .. } => {
                let in_file = self
                    .listing
                    .files
                    .iter()
                    .map(|f| f.relative.as_str())
                    .find(|p| p.contains(needle.as_str()));
                let found = in_file.map(str::to_string).or_else(|| {
                    self.listing
                        .dirs
                        .iter()
                        .find(|d| format!("{}/", d).contains(needle.as_str()))
                        .cloned()
                });
                Ok(found)
            }
            MatchRule::Content {
                pattern,
                candidates,
                ..
            } => {
                let listing = self.listing;
                let files = listing
                    .files
                    .iter()
                    .filter(|f| candidates.iter().any(|c| c.matches(&f.relative)))
                    .take(MAX_CANDIDATES_PER_RULE);
                for file in files {
                    self.budget.check(self.root)?;
                    if let Some(text) = self.cache.get(file)
                        && pattern.is_match(text)
                    {
                        return Ok(Some(file.relative.clone()));
                    }
                }
                Ok(None)
            }
        }
    }
}

/// Evaluate one signature; `None` when it does not match
pub fn evaluate(signature: &Signature, ctx: &mut MatchContext<'_>) -> Result<Option<FrameworkMatch>> {
    let mut satisfied_weight = 0.0f32;
    let mut satisfied_groups: Vec<RuleGroup> = Vec::new();
    let mut evidence: Vec<String> = Vec::new();

    for rule in &signature.rules {
        if let Some(path) = ctx.satisfy(rule)? {
            satisfied_weight += rule.weight();
            satisfied_groups.push(rule.group());
            if !evidence.contains(&path) && evidence.len() < MAX_EVIDENCE_PER_MATCH {
                evidence.push(path);
            }
        }
    }

    if satisfied_groups.is_empty() {
        return Ok(None);
    }
    if !signature
        .require
        .iter()
        .all(|group| satisfied_groups.contains(group))
    {
        return Ok(None);
    }

    let confidence = confidence(signature.weight, satisfied_weight, signature.total_rule_weight());
    if confidence <= 0.0 {
        return Ok(None);
    }

    Ok(Some(FrameworkMatch {
        signature_id: signature.id.clone(),
        name: signature.name.clone(),
        category: signature.category,
        language: signature.language,
        confidence,
        evidence,
    }))
}

/// `weight × satisfied ÷ total`, clipped to [0, 1]
pub fn confidence(weight: f32, satisfied: f32, total: f32) -> f32 {
    if total <= 0.0 || !satisfied.is_finite() {
        return 0.0;
    }
    (weight * (satisfied / total)).clamp(0.0, 1.0)
}

/// Descending confidence, then category tier, then signature id
pub fn compare_matches(a: &FrameworkMatch, b: &FrameworkMatch) -> Ordering {
    b.confidence
        .total_cmp(&a.confidence)
        .then_with(|| a.category.tier().cmp(&b.category.tier()))
        .then_with(|| a.signature_id.cmp(&b.signature_id))
}

pub fn rank_matches(matches: &mut [FrameworkMatch]) {
    matches.sort_by(compare_matches);
}
