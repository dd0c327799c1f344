use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use super::index::ServiceIndex;
use super::rules::{EdgeSet, InferenceRule, default_rules};
use crate::types::{ErrorKind, ProjectId, ProjectResult, ScanIssue, ServiceEdge};

/// Edges and nodes of the inferred service graph
#[derive(Debug, Clone, Default)]
pub struct DetectionOutcome {
    /// Unique per (source, target, kind), ordered by that key
    pub edges: Vec<ServiceEdge>,
    /// Candidate projects, whether or not they have edges
    pub nodes: BTreeSet<ProjectId>,
    /// Rules that failed; their edges are omitted
    pub issues: Vec<ScanIssue>,
}

/// Infers service boundaries and communication edges from classified projects
///
/// The graph is heuristic. Projects are linked by names, ports, paths, topics
/// and connection strings found in their files, so inconsistent naming across
/// projects leaves edges out and coincidental names add edges that do not
/// exist. Consumers should present it as a best-effort picture.
pub struct MicroserviceDetector {
    rules: Vec<Box<dyn InferenceRule>>,
}

impl Default for MicroserviceDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl MicroserviceDetector {
    pub fn new() -> Self {
        Self {
            rules: default_rules(),
        }
    }

    pub fn with_rules(rules: Vec<Box<dyn InferenceRule>>) -> Self {
        Self { rules }
    }

    pub fn detect(&self, projects: &[ProjectResult]) -> DetectionOutcome {
        let index = ServiceIndex::build(projects);
        let nodes = index.node_ids();
        debug!("{} of {} projects are service candidates", nodes.len(), projects.len());

        let mut edges = EdgeSet::new();
        let mut issues = Vec::new();
        for rule in &self.rules {
            // Rules write into their own set so a failure drops only their edges
            let mut found = EdgeSet::new();
            match rule.infer(&index, &mut found) {
                Ok(()) => {
                    debug!("Rule '{}' produced {} edges", rule.name(), found.len());
                    edges.merge(found);
                }
                Err(e) => {
                    warn!("Detection rule '{}' failed: {}", rule.name(), e);
                    issues.push(ScanIssue::new(
                        ErrorKind::DetectionHeuristicFailure,
                        format!("rule '{}' failed: {}", rule.name(), e),
                    ));
                }
            }
        }

        let edges = edges.into_edges();
        info!("Service graph: {} nodes, {} edges", nodes.len(), edges.len());
        DetectionOutcome {
            edges,
            nodes,
            issues,
        }
    }
}

/// Run the built-in rules over `projects`
pub fn detect(projects: &[ProjectResult]) -> DetectionOutcome {
    MicroserviceDetector::new().detect(projects)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        Category, CommunicationStyle, ComposeService, EdgeKind, Endpoint, EndpointKind, EvidenceSource,
        FrameworkMatch, ProjectRoot, ProjectType, Result, ScanError, ServiceFacts, TopicRole,
    };
    use std::path::PathBuf;

    fn project(id: usize, rel: &str, project_type: ProjectType, facts: ServiceFacts) -> ProjectResult {
        let root = ProjectRoot {
            id: ProjectId::new(id),
            path: PathBuf::from("/scan").join(rel),
            relative_path: rel.to_string(),
            markers: vec!["package.json".to_string()],
            depth: 1,
        };
        let mut result = ProjectResult::failed(root, ScanIssue::new(ErrorKind::Io, "placeholder"));
        result.error = None;
        result.project_type = project_type;
        result.facts = facts;
        result
    }

    fn service(id: usize, rel: &str, facts: ServiceFacts) -> ProjectResult {
        project(id, rel, ProjectType::Service, facts)
    }

    fn kinds(outcome: &DetectionOutcome) -> Vec<(usize, usize, EdgeKind)> {
        outcome
            .edges
            .iter()
            .map(|e| (e.source.index(), e.target.index(), e.kind))
            .collect()
    }

    #[test]
    fn test_shared_topic_yields_one_broker_edge() {
        let mut a = ServiceFacts::default();
        a.record_topic("orders-queue", TopicRole::Unknown);
        let mut b = ServiceFacts::default();
        b.record_topic("orders-queue", TopicRole::Unknown);

        let forward = detect(&[service(0, "a", a.clone()), service(1, "b", b.clone())]);
        let reversed = detect(&[service(1, "b", b), service(0, "a", a)]);

        assert_eq!(kinds(&forward), vec![(0, 1, EdgeKind::MessageBroker)]);
        assert_eq!(forward.edges, reversed.edges);
    }

    #[test]
    fn test_topic_roles_set_direction() {
        let mut producer = ServiceFacts::default();
        producer.record_topic("billing", TopicRole::Producer);
        let mut consumer = ServiceFacts::default();
        consumer.record_topic("billing", TopicRole::Consumer);

        let outcome = detect(&[service(0, "consumer", consumer), service(1, "producer", producer)]);
        assert_eq!(kinds(&outcome), vec![(1, 0, EdgeKind::MessageBroker)]);
    }

    #[test]
    fn test_url_host_and_port_references() {
        let mut web = ServiceFacts::default();
        web.record_url("http://inventory:8080/stock", "src/api.js");
        web.record_url("http://localhost:9100/charge", "src/pay.js");
        let inventory = ServiceFacts::default();
        let payments = ServiceFacts {
            exposed_ports: [9100].into_iter().collect(),
            ..Default::default()
        };

        let outcome = detect(&[
            service(0, "web", web),
            service(1, "inventory", inventory),
            service(2, "payments", payments),
        ]);
        assert_eq!(
            kinds(&outcome),
            vec![(0, 1, EdgeKind::RestCall), (0, 2, EdgeKind::RestCall)]
        );
        let sources: Vec<_> = outcome
            .edges
            .iter()
            .flat_map(|e| e.evidence.iter().map(|ev| ev.source))
            .collect();
        assert_eq!(sources, vec![EvidenceSource::UrlHost, EvidenceSource::UrlPort]);
    }

    #[test]
    fn test_endpoint_path_reference() {
        let mut gateway = ServiceFacts::default();
        gateway.record_url("http://10.0.0.5/api/invoices/17", "gateway.py");
        let mut billing = ServiceFacts::default();
        billing.endpoints.insert(Endpoint {
            method: "GET".to_string(),
            path: "/api/invoices/<id>".to_string(),
            kind: EndpointKind::Resource,
            file: "app.py".to_string(),
        });

        let outcome = detect(&[service(0, "gw", gateway), service(1, "bill", billing)]);
        assert_eq!(kinds(&outcome), vec![(0, 1, EdgeKind::RestCall)]);
    }

    #[test]
    fn test_shared_database_and_compose_dependencies() {
        let compose = ServiceFacts {
            compose_services: vec![
                ComposeService {
                    name: "api".to_string(),
                    build: Some("./orders".to_string()),
                    depends_on: vec!["stock".to_string()],
                    file: "docker-compose.yml".to_string(),
                    ..Default::default()
                },
                ComposeService {
                    name: "stock".to_string(),
                    build: Some("./inventory".to_string()),
                    file: "docker-compose.yml".to_string(),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        let db = |url: &str| ServiceFacts {
            database_urls: [url.to_string()].into_iter().collect(),
            ..Default::default()
        };

        let outcome = detect(&[
            // Root project holding the compose file is not a service candidate
            project(0, "", ProjectType::Library, compose),
            service(1, "orders", db("postgres://db:5432/shop")),
            service(2, "inventory", db("postgres://db:5432/shop")),
        ]);
        assert_eq!(
            kinds(&outcome),
            vec![(1, 2, EdgeKind::SharedDb), (1, 2, EdgeKind::ConfigReference)]
        );
        assert_eq!(outcome.nodes.len(), 2);
    }

    #[test]
    fn test_config_token_reference_needs_long_names() {
        let web = ServiceFacts {
            config_tokens: ["catalog-service".to_string(), "db".to_string()].into_iter().collect(),
            ..Default::default()
        };

        let outcome = detect(&[
            service(0, "web", web),
            service(1, "catalog-service", ServiceFacts::default()),
            service(2, "db", ServiceFacts::default()),
        ]);
        assert_eq!(kinds(&outcome), vec![(0, 1, EdgeKind::ConfigReference)]);
    }

    #[test]
    fn test_non_candidates_are_not_nodes() {
        let mut a = ServiceFacts::default();
        a.record_topic("events", TopicRole::Unknown);
        let mut lib = project(1, "lib", ProjectType::Library, a.clone());
        lib.matches.push(FrameworkMatch {
            signature_id: "jest".to_string(),
            name: "Jest".to_string(),
            category: Category::Testing,
            language: None,
            confidence: 0.5,
            evidence: vec![],
        });

        let outcome = detect(&[service(0, "svc", a), lib]);
        assert!(outcome.edges.is_empty());
        assert_eq!(outcome.nodes.into_iter().collect::<Vec<_>>(), vec![ProjectId::new(0)]);
    }

    #[test]
    fn test_microservice_indicators_make_a_node() {
        let indicator = |id: &str| FrameworkMatch {
            signature_id: id.to_string(),
            name: id.to_string(),
            category: Category::Microservice,
            language: None,
            confidence: 0.6,
            evidence: vec![],
        };
        let mut worker = project(0, "worker", ProjectType::Library, ServiceFacts::default());
        worker.matches.push(indicator("circuit-breaker"));
        let mut ui = project(1, "ui", ProjectType::Frontend, ServiceFacts::default());
        ui.matches.push(indicator("health-endpoint"));

        let outcome = detect(&[worker, ui]);
        assert_eq!(outcome.nodes.into_iter().collect::<Vec<_>>(), vec![ProjectId::new(0)]);
    }

    #[test]
    fn test_rest_call_evidence_carries_protocol() {
        let mut web = ServiceFacts::default();
        web.record_url("grpc://pricing:50051", "src/quote.go");
        web.record_url("http://inventory:8080/stock", "src/api.go");

        let outcome = detect(&[
            service(0, "web", web),
            service(1, "inventory", ServiceFacts::default()),
            service(2, "pricing", ServiceFacts::default()),
        ]);
        let protocols: Vec<_> = outcome.edges.iter().map(|e| e.protocols()).collect();
        assert_eq!(
            protocols,
            vec![
                [CommunicationStyle::Rest].into_iter().collect(),
                [CommunicationStyle::Grpc].into_iter().collect(),
            ]
        );
    }

    struct FailingRule;

    impl InferenceRule for FailingRule {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn infer(&self, _: &ServiceIndex<'_>, edges: &mut EdgeSet) -> Result<()> {
            edges.add(
                ProjectId::new(0),
                ProjectId::new(1),
                EdgeKind::RestCall,
                crate::types::EdgeEvidence::new(EvidenceSource::UrlHost, "partial"),
            );
            Err(ScanError::heuristic("failing", "broken descriptor"))
        }
    }

    #[test]
    fn test_failed_rule_is_reported_and_its_edges_dropped() {
        let mut a = ServiceFacts::default();
        a.record_topic("orders-queue", TopicRole::Unknown);
        let mut rules = default_rules();
        rules.push(Box::new(FailingRule));

        let outcome = MicroserviceDetector::with_rules(rules)
            .detect(&[service(0, "a", a.clone()), service(1, "b", a)]);
        assert_eq!(kinds(&outcome), vec![(0, 1, EdgeKind::MessageBroker)]);
        assert_eq!(outcome.issues.len(), 1);
        assert_eq!(outcome.issues[0].kind, ErrorKind::DetectionHeuristicFailure);
    }
}
