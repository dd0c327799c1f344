//! Service facts extracted from project content
//!
//! The classifier records what a project declares and references (endpoints, outbound
//! URLs, broker topics, database URLs, compose services). The microservice detector
//! works only from these facts, never from the filesystem.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Kind of an API endpoint, guessed from its path
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum EndpointKind {
    Health,
    Metrics,
    Auth,
    Webhook,
    Config,
    Admin,
    Resource,
    Other,
}

impl EndpointKind {
    pub fn from_path(path: &str) -> Self {
        let lower = path.to_lowercase();
        let has_any = |terms: &[&str]| terms.iter().any(|t| lower.contains(t));

        if has_any(&["/health", "/ping", "/status", "/heartbeat", "/alive"]) {
            Self::Health
        } else if has_any(&["/metrics", "/stats", "/telemetry", "/monitor"]) {
            Self::Metrics
        } else if has_any(&["/auth", "/login", "/token", "/oauth", "/session"]) {
            Self::Auth
        } else if has_any(&["webhook", "callback"]) {
            Self::Webhook
        } else if has_any(&["/config", "/settings", "/properties"]) {
            Self::Config
        } else if lower.contains("/admin") {
            Self::Admin
        } else if lower.trim_matches('/').chars().any(|c| c.is_alphanumeric()) {
            Self::Resource
        } else {
            Self::Other
        }
    }

    /// Operational endpoints exist on most services and identify nobody
    pub fn is_generic(&self) -> bool {
        matches!(self, Self::Health | Self::Metrics | Self::Other)
    }
}

/// Declared HTTP endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Endpoint {
    pub method: String,
    pub path: String,
    pub kind: EndpointKind,
    /// Relative path of the declaring file
    pub file: String,
}

/// Direction of topic usage, when visible from the code
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum TopicRole {
    Producer,
    Consumer,
    Unknown,
}

/// How a service talks to others
///
/// Ordered from request-response styles to event streams; the order breaks ties
/// when two styles are equally common in a project.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum CommunicationStyle {
    Rest,
    Grpc,
    Graphql,
    Soap,
    WebSocket,
    EventBased,
}

impl CommunicationStyle {
    /// Style implied by a call URL alone, when its scheme or path is specific
    pub fn from_url(url: &str) -> Option<Self> {
        let lower = url.to_ascii_lowercase();
        if lower.starts_with("grpc://") || lower.starts_with("grpcs://") {
            Some(Self::Grpc)
        } else if lower.starts_with("ws://") || lower.starts_with("wss://") {
            Some(Self::WebSocket)
        } else if lower.contains("graphql") {
            Some(Self::Graphql)
        } else if lower.contains("soap") || lower.contains("wsdl") {
            Some(Self::Soap)
        } else {
            None
        }
    }

    /// Whether a call in this style has a caller and a callee
    pub fn is_request_response(&self) -> bool {
        !matches!(self, Self::EventBased)
    }
}

impl std::fmt::Display for CommunicationStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rest => write!(f, "REST"),
            Self::Grpc => write!(f, "gRPC"),
            Self::Graphql => write!(f, "GraphQL"),
            Self::Soap => write!(f, "SOAP"),
            Self::WebSocket => write!(f, "WebSocket"),
            Self::EventBased => write!(f, "event-based"),
        }
    }
}

/// A service container declared in a compose file
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComposeService {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Build context relative to the compose file's project
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<String>,
    pub depends_on: Vec<String>,
    /// Relative path of the declaring file
    pub file: String,
}

/// Everything a project declares or references that hints at service boundaries
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceFacts {
    /// Name from the package manifest, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declared_name: Option<String>,
    pub endpoints: BTreeSet<Endpoint>,
    /// Outbound URLs that look like internal service calls, mapped to declaring files
    pub outbound_urls: BTreeMap<String, BTreeSet<String>>,
    /// Topic or queue name to observed roles
    pub topics: BTreeMap<String, BTreeSet<TopicRole>>,
    /// Normalized database connection strings
    pub database_urls: BTreeSet<String>,
    pub exposed_ports: BTreeSet<u16>,
    pub compose_services: Vec<ComposeService>,
    /// Package names the manifests depend on
    pub declared_dependencies: BTreeSet<String>,
    /// Lowercase identifiers seen in configuration files
    pub config_tokens: BTreeSet<String>,
    /// True when a runnable entry point (main module, server start) was seen
    pub has_entry_point: bool,
    /// Files showing each communication style
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub communication: BTreeMap<CommunicationStyle, usize>,
}

impl ServiceFacts {
    pub fn record_topic(&mut self, topic: impl Into<String>, role: TopicRole) {
        self.topics.entry(topic.into()).or_default().insert(role);
    }

    pub fn record_url(&mut self, url: impl Into<String>, file: impl Into<String>) {
        self.outbound_urls
            .entry(url.into())
            .or_default()
            .insert(file.into());
    }

    pub fn topic_roles(&self, topic: &str) -> Option<&BTreeSet<TopicRole>> {
        self.topics.get(topic)
    }

    pub fn record_style(&mut self, style: CommunicationStyle) {
        *self.communication.entry(style).or_insert(0) += 1;
    }

    /// Most frequent style; ties go to the earlier style
    pub fn primary_communication(&self) -> Option<CommunicationStyle> {
        self.communication
            .iter()
            .filter(|(_, count)| **count > 0)
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(style, _)| *style)
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
            && self.outbound_urls.is_empty()
            && self.topics.is_empty()
            && self.database_urls.is_empty()
            && self.compose_services.is_empty()
    }
}
