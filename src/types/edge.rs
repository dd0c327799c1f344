use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::ProjectId;
use super::service::CommunicationStyle;

/// Directed relationship between two projects in one analysis result
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceEdge {
    pub source: ProjectId,
    pub target: ProjectId,
    pub kind: EdgeKind,
    pub evidence: BTreeSet<EdgeEvidence>,
}

impl ServiceEdge {
    /// Protocols named by this edge's evidence, in style order
    pub fn protocols(&self) -> BTreeSet<CommunicationStyle> {
        self.evidence.iter().filter_map(|e| e.protocol).collect()
    }

    pub fn key(&self) -> EdgeKey {
        EdgeKey {
            source: self.source,
            target: self.target,
            kind: self.kind,
        }
    }
}

/// Deduplication key: one edge per (source, target, kind)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeKey {
    pub source: ProjectId,
    pub target: ProjectId,
    pub kind: EdgeKind,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeKind {
    RestCall,
    MessageBroker,
    SharedDb,
    ConfigReference,
}

impl std::fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RestCall => write!(f, "rest-call"),
            Self::MessageBroker => write!(f, "message-broker"),
            Self::SharedDb => write!(f, "shared-db"),
            Self::ConfigReference => write!(f, "config-reference"),
        }
    }
}

/// Which inference produced a piece of evidence
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceSource {
    UrlHost,
    UrlPort,
    UrlPath,
    EndpointPath,
    ConfigToken,
    SharedTopic,
    SharedDatabase,
    DeclaredDependency,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeEvidence {
    pub source: EvidenceSource,
    /// The matched value (URL, topic, service name...)
    pub detail: String,
    /// Relative file the evidence came from, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// How the call is made, for request-response evidence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<CommunicationStyle>,
}

impl EdgeEvidence {
    pub fn new(source: EvidenceSource, detail: impl Into<String>) -> Self {
        Self {
            source,
            detail: detail.into(),
            file: None,
            protocol: None,
        }
    }

    pub fn in_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn with_protocol(mut self, protocol: CommunicationStyle) -> Self {
        self.protocol = Some(protocol);
        self
    }
}
