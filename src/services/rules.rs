//! Edge inference rules
//!
//! Each rule looks at the facts of the candidate projects through the
//! [`ServiceIndex`] and adds evidence to an [`EdgeSet`]. Rules never see the
//! filesystem.

use std::collections::{BTreeMap, BTreeSet};

use url::Url;

use super::index::ServiceIndex;
use crate::constants::services::MIN_SERVICE_NAME_LEN;
use crate::types::{
    CommunicationStyle, EdgeEvidence, EdgeKey, EdgeKind, EvidenceSource, ProjectId, Result,
    ServiceEdge, ServiceFacts, TopicRole, normalize_service_name,
};

/// Hosts that say nothing about which service is called
const LOOPBACK_HOSTS: &[&str] = &["localhost", "127.0.0.1", "0.0.0.0", "::1", "[::1]"];

// =============================================================================
// Edge accumulation
// =============================================================================

/// Edges keyed by (source, target, kind); evidence for the same key is merged
#[derive(Debug, Default, Clone)]
pub struct EdgeSet {
    edges: BTreeMap<EdgeKey, BTreeSet<EdgeEvidence>>,
}

impl EdgeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record evidence for an edge; self-edges are dropped
    pub fn add(&mut self, source: ProjectId, target: ProjectId, kind: EdgeKind, evidence: EdgeEvidence) {
        if source == target {
            return;
        }
        self.edges
            .entry(EdgeKey { source, target, kind })
            .or_default()
            .insert(evidence);
    }

    pub fn merge(&mut self, other: EdgeSet) {
        for (key, evidence) in other.edges {
            self.edges.entry(key).or_default().extend(evidence);
        }
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Edges ordered by key
    pub fn into_edges(self) -> Vec<ServiceEdge> {
        self.edges
            .into_iter()
            .map(|(key, evidence)| ServiceEdge {
                source: key.source,
                target: key.target,
                kind: key.kind,
                evidence,
            })
            .collect()
    }
}

// =============================================================================
// Rule trait
// =============================================================================

/// One way of inferring relationships between candidate projects
pub trait InferenceRule: Send + Sync {
    /// Name used in logs and failure reports
    fn name(&self) -> &'static str;

    fn infer(&self, index: &ServiceIndex<'_>, edges: &mut EdgeSet) -> Result<()>;
}

/// The built-in rules in evaluation order
pub fn default_rules() -> Vec<Box<dyn InferenceRule>> {
    vec![
        Box::new(UrlReferenceRule),
        Box::new(ConfigTokenRule),
        Box::new(SharedInfrastructureRule),
        Box::new(DeclaredDependencyRule),
    ]
}

// =============================================================================
// Textual references
// =============================================================================

/// Outbound URLs that name, address or call into another candidate → `rest-call`
///
/// Tried in order: host name, loopback port, path segment naming a service,
/// path under an endpoint only one other candidate declares.
pub struct UrlReferenceRule;

impl UrlReferenceRule {
    fn resolve(
        index: &ServiceIndex<'_>,
        source: ProjectId,
        raw: &str,
    ) -> Option<(ProjectId, EvidenceSource)> {
        let url = Url::parse(raw).ok()?;
        let host = url.host_str().unwrap_or("").to_ascii_lowercase();

        if LOOPBACK_HOSTS.contains(&host.as_str()) {
            if let Some(port) = url.port()
                && let Some(target) = index.resolve_port(port, source)
            {
                return Some((target, EvidenceSource::UrlPort));
            }
        } else if !host.is_empty() {
            let label = host.split('.').next().unwrap_or(&host);
            if let Some(target) = index.resolve_name(label, source) {
                return Some((target, EvidenceSource::UrlHost));
            }
        }

        let path = url.path();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            if let Some(target) = index.resolve_token(segment, source) {
                return Some((target, EvidenceSource::UrlPath));
            }
        }

        index
            .resolve_endpoint(path, source)
            .map(|(target, _)| (target, EvidenceSource::EndpointPath))
    }
}

impl InferenceRule for UrlReferenceRule {
    fn name(&self) -> &'static str {
        "url-reference"
    }

    fn infer(&self, index: &ServiceIndex<'_>, edges: &mut EdgeSet) -> Result<()> {
        for project in index.candidates() {
            for (url, files) in &project.facts.outbound_urls {
                let Some((target, source)) = Self::resolve(index, project.id, url) else {
                    continue;
                };
                let protocol = call_protocol(&project.facts, url);
                for file in files {
                    edges.add(
                        project.id,
                        target,
                        EdgeKind::RestCall,
                        EdgeEvidence::new(source, url.clone())
                            .in_file(file.clone())
                            .with_protocol(protocol),
                    );
                }
            }
        }
        Ok(())
    }
}

/// URL scheme or path first, then the caller's dominant request-response style, else REST
pub fn call_protocol(facts: &ServiceFacts, url: &str) -> CommunicationStyle {
    CommunicationStyle::from_url(url)
        .or_else(|| facts.primary_communication().filter(|s| s.is_request_response()))
        .unwrap_or(CommunicationStyle::Rest)
}

/// Another candidate's name among a project's configuration values → `config-reference`
pub struct ConfigTokenRule;

impl InferenceRule for ConfigTokenRule {
    fn name(&self) -> &'static str {
        "config-token"
    }

    fn infer(&self, index: &ServiceIndex<'_>, edges: &mut EdgeSet) -> Result<()> {
        for project in index.candidates() {
            let tokens: BTreeSet<String> = project
                .facts
                .config_tokens
                .iter()
                .map(|t| normalize_service_name(t))
                .collect();
            for target in index.candidates() {
                if target.id == project.id {
                    continue;
                }
                let named = index.names_of(target.id).find(|name| {
                    name.len() >= MIN_SERVICE_NAME_LEN
                        && tokens.contains(*name)
                        && index.resolve_name(name, project.id) == Some(target.id)
                });
                if let Some(name) = named {
                    edges.add(
                        project.id,
                        target.id,
                        EdgeKind::ConfigReference,
                        EdgeEvidence::new(EvidenceSource::ConfigToken, name),
                    );
                }
            }
        }
        Ok(())
    }
}

// =============================================================================
// Shared infrastructure
// =============================================================================

/// Same topic/queue name → `message-broker`; same database → `shared-db`
///
/// Broker edges run producer → consumer when the roles are visible, otherwise
/// from the lower project id to the higher one. Database edges always run from
/// the lower id.
pub struct SharedInfrastructureRule;

impl SharedInfrastructureRule {
    fn broker_edges(index: &ServiceIndex<'_>, edges: &mut EdgeSet) {
        let mut users: BTreeMap<&str, Vec<(ProjectId, &BTreeSet<TopicRole>)>> = BTreeMap::new();
        for project in index.candidates() {
            for (topic, roles) in &project.facts.topics {
                users.entry(topic.as_str()).or_default().push((project.id, roles));
            }
        }

        for (topic, users) in users {
            for (i, (a, a_roles)) in users.iter().enumerate() {
                for (b, b_roles) in &users[i + 1..] {
                    let (low, high, low_roles, high_roles) = if a < b {
                        (*a, *b, *a_roles, *b_roles)
                    } else {
                        (*b, *a, *b_roles, *a_roles)
                    };
                    let evidence = EdgeEvidence::new(EvidenceSource::SharedTopic, topic);

                    let forward = low_roles.contains(&TopicRole::Producer)
                        && high_roles.contains(&TopicRole::Consumer);
                    let backward = high_roles.contains(&TopicRole::Producer)
                        && low_roles.contains(&TopicRole::Consumer);
                    if forward {
                        edges.add(low, high, EdgeKind::MessageBroker, evidence.clone());
                    }
                    if backward {
                        edges.add(high, low, EdgeKind::MessageBroker, evidence.clone());
                    }
                    if !forward && !backward {
                        edges.add(low, high, EdgeKind::MessageBroker, evidence);
                    }
                }
            }
        }
    }

    fn database_edges(index: &ServiceIndex<'_>, edges: &mut EdgeSet) {
        let mut users: BTreeMap<&str, BTreeSet<ProjectId>> = BTreeMap::new();
        for project in index.candidates() {
            for url in &project.facts.database_urls {
                users.entry(url.as_str()).or_default().insert(project.id);
            }
        }

        for (url, ids) in users {
            let ids: Vec<ProjectId> = ids.into_iter().collect();
            for (i, low) in ids.iter().enumerate() {
                for high in &ids[i + 1..] {
                    edges.add(
                        *low,
                        *high,
                        EdgeKind::SharedDb,
                        EdgeEvidence::new(EvidenceSource::SharedDatabase, url),
                    );
                }
            }
        }
    }
}

impl InferenceRule for SharedInfrastructureRule {
    fn name(&self) -> &'static str {
        "shared-infrastructure"
    }

    fn infer(&self, index: &ServiceIndex<'_>, edges: &mut EdgeSet) -> Result<()> {
        Self::broker_edges(index, edges);
        Self::database_edges(index, edges);
        Ok(())
    }
}

// =============================================================================
// Declared dependencies
// =============================================================================

/// Compose `depends_on`/`links` and manifest dependencies naming another
/// candidate → `config-reference`
pub struct DeclaredDependencyRule;

impl InferenceRule for DeclaredDependencyRule {
    fn name(&self) -> &'static str {
        "declared-dependency"
    }

    fn infer(&self, index: &ServiceIndex<'_>, edges: &mut EdgeSet) -> Result<()> {
        let declared = index.compose_services();
        for service in declared {
            let Some(source) = index.resolve_compose(service) else {
                continue;
            };
            for dependency in &service.service.depends_on {
                // A dependency names a sibling service of the same compose file
                let sibling = declared.iter().find(|d| {
                    d.owner == service.owner
                        && d.service.file == service.service.file
                        && &d.service.name == dependency
                });
                let target = match sibling {
                    Some(sibling) => index.resolve_compose(sibling),
                    None => index.resolve_name(dependency, source),
                };
                if let Some(target) = target {
                    edges.add(
                        source,
                        target,
                        EdgeKind::ConfigReference,
                        EdgeEvidence::new(
                            EvidenceSource::DeclaredDependency,
                            format!("{} -> {}", service.service.name, dependency),
                        )
                        .in_file(join_file(&service.base, &service.service.file)),
                    );
                }
            }
        }

        for project in index.candidates() {
            for dependency in &project.facts.declared_dependencies {
                if let Some(target) = index.resolve_token(dependency, project.id) {
                    edges.add(
                        project.id,
                        target,
                        EdgeKind::ConfigReference,
                        EdgeEvidence::new(EvidenceSource::DeclaredDependency, dependency.clone()),
                    );
                }
            }
        }
        Ok(())
    }
}

/// Compose file path relative to the scan root
fn join_file(base: &str, relative_file: &str) -> String {
    let name = relative_file.rsplit('/').next().unwrap_or(relative_file);
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", base, name)
    }
}
